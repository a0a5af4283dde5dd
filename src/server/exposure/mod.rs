//! API exposure over HTTP

pub mod graphql;

pub use graphql::{DecodedRequest, GraphQLController, GraphQLExposure, GraphQLResponse};
