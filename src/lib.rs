//! # gqlbridge
//!
//! An HTTP to GraphQL execution bridge with declarative, field-addressable
//! argument validation.
//!
//! ## Features
//!
//! - **Single POST endpoint**: JSON, form and query-string requests, single or batched
//! - **Status policies**: the HTTP status is derived from execution errors, or injected
//! - **Argument validation**: `"email"`, `"gt:42"`, `"starts_with:192|ipv4"` style rules
//!   declared per argument and reported as one GraphQL error per failure
//! - **Configuration-Based**: endpoint, debug output and status policy via YAML or env
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gqlbridge::prelude::*;
//!
//! let schema = SchemaBuilder::new()
//!     .query(
//!         FieldDefinition::new("testValidator", TypeRef::named_nn(TypeRef::STRING))
//!             .argument(Argument::input("foo", TypeRef::named_nn(TypeRef::STRING)))
//!             .argument(Argument::input("bar", TypeRef::named_nn(TypeRef::INT)))
//!             .validate("foo", "email")
//!             .validate("bar", "gt:42")
//!             .resolve(|_args| async { Ok(Value::from("success")) }),
//!     )
//!     .build()?;
//!
//! ServerBuilder::new()
//!     .with_schema(schema)
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod schema;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AggregateValidationError, BridgeError, FieldError, FieldResult, GraphQLException,
        ParameterAnnotations, RequestContext, RuleSpec, ValidationFailure,
        parameter::{InputParameter, Parameter, ParameterHandler, ParameterMiddleware},
        validation::{RuleEngine, RuleEvaluator, ValidateFieldMiddleware},
    };

    // === Schema ===
    pub use crate::schema::{Argument, FieldDefinition, ResolvedArgs, SchemaBuilder};

    // === Config ===
    pub use crate::config::{BridgeConfig, DebugFlag, StatusPolicy};

    // === Server ===
    pub use crate::server::{
        ExecutionEngine, ExecutionOutcome, FixedStatusDecider, HttpCodeDecider, SchemaEngine,
        ServerBuilder, StatusDecider, TransportRequest,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_graphql::dynamic::{Schema, TypeRef};
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{Router, http::StatusCode};
}
