//! The single POST endpoint: decode, execute, pick a status, serialize

use super::request::DecodedRequest;
use super::response::{GraphQLResponse, format_response};
use crate::config::DebugFlag;
use crate::core::error::{BridgeError, EngineError, RequestError};
use crate::server::engine::{ExecutionEngine, ExecutionOutcome};
use crate::server::status::{HttpCodeDecider, StatusDecider};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// Drives one HTTP request through the execution engine
///
/// Holds no per-request state; one controller serves every request.
pub struct GraphQLController {
    engine: Arc<dyn ExecutionEngine>,
    decider: Arc<dyn StatusDecider>,
    debug: DebugFlag,
}

impl GraphQLController {
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        decider: Arc<dyn StatusDecider>,
        debug: DebugFlag,
    ) -> Self {
        Self {
            engine,
            decider,
            debug,
        }
    }

    /// A controller with the default status policy and no debug output
    pub fn with_engine(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self::new(engine, Arc::new(HttpCodeDecider), DebugFlag::None)
    }

    pub fn debug(&self) -> DebugFlag {
        self.debug
    }

    pub async fn index(&self, request: DecodedRequest) -> Result<GraphQLResponse, BridgeError> {
        if request.is_empty() {
            return Err(RequestError::EmptyBody.into());
        }
        if request.has_uploads() {
            tracing::debug!(uploads = request.uploads, "Rejecting request with file uploads");
            return Err(RequestError::UploadsUnsupported.into());
        }

        match self.engine.execute(request.into_transport()).await {
            ExecutionOutcome::Single(response) => {
                let status = self.decider.decide(&response);
                Ok(GraphQLResponse::new(
                    status,
                    format_response(&response, self.debug),
                ))
            }
            ExecutionOutcome::Batch(responses) => {
                tracing::debug!(size = responses.len(), "Serving batch response");
                let status = responses
                    .iter()
                    .map(|response| self.decider.decide(response))
                    .max()
                    .unwrap_or(StatusCode::OK);
                let body = responses
                    .iter()
                    .map(|response| format_response(response, self.debug))
                    .collect();
                Ok(GraphQLResponse::new(status, Value::Array(body)))
            }
            ExecutionOutcome::Deferred(_) => {
                tracing::error!("Execution engine returned a deferred result");
                Err(EngineError::UnsupportedOutcome.into())
            }
        }
    }
}
