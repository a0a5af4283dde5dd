//! Serialization of execution results into HTTP responses

use crate::config::DebugFlag;
use crate::core::error::{AggregateValidationError, GraphQLException};
use async_graphql::{Response, ServerError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Map, Value, json};

/// Message that replaces the text of every internal error
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// A finished bridge response
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl GraphQLResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for GraphQLResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Render one execution result in the standard `{errors, data, extensions}` shape
///
/// `data` is omitted when null, `errors` and `extensions` when empty.
pub fn format_response(response: &Response, debug: DebugFlag) -> Value {
    let mut body = Map::new();

    if !response.errors.is_empty() {
        let errors = response
            .errors
            .iter()
            .map(|error| format_error(error, debug))
            .collect();
        body.insert("errors".to_string(), Value::Array(errors));
    }

    let data = serde_json::to_value(&response.data).unwrap_or(Value::Null);
    if !data.is_null() {
        body.insert("data".to_string(), data);
    }

    if !response.extensions.is_empty() {
        let extensions = serde_json::to_value(&response.extensions).unwrap_or(Value::Null);
        body.insert("extensions".to_string(), extensions);
    }

    Value::Object(body)
}

/// Errors whose message may be shown to clients as is
fn is_client_safe(error: &ServerError) -> bool {
    error.path.is_empty()
        || error.source::<GraphQLException>().is_some()
        || error.source::<AggregateValidationError>().is_some()
}

pub fn format_error(error: &ServerError, debug: DebugFlag) -> Value {
    let mut formatted = match serde_json::to_value(error) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    if is_client_safe(error) {
        formatted.insert("message".to_string(), json!(error.message));
        return Value::Object(formatted);
    }

    tracing::warn!(error = %error.message, path = ?error.path, "Resolver failed");
    formatted.insert("message".to_string(), json!(INTERNAL_ERROR_MESSAGE));

    if debug.includes_debug_message() {
        let extensions = formatted
            .entry("extensions")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(extensions) = extensions {
            extensions.insert("debugMessage".to_string(), json!(error.message));
        }
    }

    Value::Object(formatted)
}
