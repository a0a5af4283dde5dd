//! GraphQL over HTTP
//!
//! One POST route is exposed. Every request is decoded into a
//! [`DecodedRequest`], handed to the [`GraphQLController`] and answered with
//! either a [`GraphQLResponse`] or a [`BridgeError`](crate::core::error::BridgeError).

mod controller;
mod request;
mod response;

pub use controller::GraphQLController;
pub use request::DecodedRequest;
pub use response::{GraphQLResponse, INTERNAL_ERROR_MESSAGE, format_error, format_response};

use crate::core::error::BridgeError;
use anyhow::Result;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use std::sync::Arc;

/// GraphQL API exposure
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the router serving `controller` on `uri`
    ///
    /// Methods other than POST on `uri` get 405 from the router.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let controller = Arc::new(GraphQLController::with_engine(engine));
    /// let app = GraphQLExposure::build_router(controller, "/graphql")?;
    /// ```
    pub fn build_router(controller: Arc<GraphQLController>, uri: &str) -> Result<Router> {
        if !uri.starts_with('/') {
            anyhow::bail!("GraphQL route '{}' must start with '/'", uri);
        }

        let router = Router::new()
            .route(uri, post(graphql_handler))
            .with_state(controller);

        Ok(router)
    }
}

async fn graphql_handler(
    State(controller): State<Arc<GraphQLController>>,
    request: DecodedRequest,
) -> Result<GraphQLResponse, BridgeError> {
    controller.index(request).await
}
