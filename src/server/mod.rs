//! HTTP server for the GraphQL bridge
//!
//! This module provides:
//! - the [`ExecutionEngine`] seam and its default [`SchemaEngine`]
//! - [`StatusDecider`] policies mapping results to HTTP statuses
//! - the HTTP exposure (request decoding, response formatting, routing)
//! - a [`ServerBuilder`] wiring it all together

pub mod builder;
pub mod engine;
pub mod exposure;
pub mod status;

pub use builder::ServerBuilder;
pub use engine::{ExecutionEngine, ExecutionOutcome, SchemaEngine, TransportRequest};
pub use exposure::{DecodedRequest, GraphQLController, GraphQLExposure, GraphQLResponse};
pub use status::{FixedStatusDecider, HttpCodeDecider, StatusDecider};
