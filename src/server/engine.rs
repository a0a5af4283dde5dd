//! Execution engine seam
//!
//! The bridge hands a [`TransportRequest`] to an [`ExecutionEngine`] and gets
//! back an [`ExecutionOutcome`]. [`SchemaEngine`] is the default engine over
//! a dynamic async-graphql schema.

use crate::core::error::{AggregateValidationError, GraphQLException};
use crate::core::parameter::RequestContext;
use async_graphql::dynamic::Schema;
use async_graphql::parser::parse_query;
use async_graphql::parser::types::{DocumentOperations, OperationType};
use async_graphql::{Request, Response, ServerError};
use async_trait::async_trait;
use axum::http::{HeaderMap, Method};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A decoded HTTP request in transport-neutral form
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub query_string: Option<String>,
    /// Request parameters: an object for one operation, an array for a batch
    pub body: Value,
}

impl TransportRequest {
    pub fn new(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            query_string: None,
            body,
        }
    }

    pub fn context(&self) -> RequestContext {
        RequestContext::new(
            self.method.clone(),
            self.headers.clone(),
            self.query_string.clone(),
        )
    }
}

/// What the engine produced for one request
pub enum ExecutionOutcome {
    Single(Response),
    Batch(Vec<Response>),
    /// A streamed result; the bridge refuses these
    Deferred(BoxStream<'static, Response>),
}

impl fmt::Debug for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Single(response) => f.debug_tuple("Single").field(response).finish(),
            ExecutionOutcome::Batch(responses) => f.debug_tuple("Batch").field(responses).finish(),
            ExecutionOutcome::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Executes GraphQL requests
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> ExecutionOutcome;
}

/// Default engine over a compiled dynamic schema
///
/// Batch entries run sequentially, in request order.
#[derive(Clone)]
pub struct SchemaEngine {
    schema: Schema,
}

impl SchemaEngine {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn execute_one(&self, request: Request) -> Response {
        expand_aggregate_errors(self.schema.execute(request).await)
    }
}

#[async_trait]
impl ExecutionEngine for SchemaEngine {
    async fn execute(&self, request: TransportRequest) -> ExecutionOutcome {
        let context = request.context();

        match parse_body(request.body) {
            Err(message) => {
                tracing::debug!(error = %message, "Unparseable GraphQL request body");
                ExecutionOutcome::Single(invalid_request(message))
            }
            Ok(ParsedBody::Single(request)) => {
                let request = request.data(context);
                if is_subscription(&request) {
                    return ExecutionOutcome::Deferred(self.schema.execute_stream(request).boxed());
                }
                ExecutionOutcome::Single(self.execute_one(request).await)
            }
            Ok(ParsedBody::Batch(entries)) => {
                tracing::debug!(size = entries.len(), "Executing batch request");

                if entries.iter().flatten().any(is_subscription) {
                    let schema = self.schema.clone();
                    let streams = stream::iter(entries).flat_map(move |entry| match entry {
                        Ok(request) => schema.execute_stream(request.data(context.clone())).boxed(),
                        Err(message) => stream::once(async move { invalid_request(message) }).boxed(),
                    });
                    return ExecutionOutcome::Deferred(streams.boxed());
                }

                let mut responses = Vec::with_capacity(entries.len());
                for entry in entries {
                    let response = match entry {
                        Ok(request) => self.execute_one(request.data(context.clone())).await,
                        Err(message) => {
                            tracing::debug!(error = %message, "Unparseable batch entry");
                            invalid_request(message)
                        }
                    };
                    responses.push(response);
                }
                ExecutionOutcome::Batch(responses)
            }
        }
    }
}

/// Request parameters after decoding
///
/// Batch entries are parsed one by one, so a malformed entry only fails
/// its own slot.
#[derive(Debug)]
pub enum ParsedBody {
    Single(Request),
    Batch(Vec<Result<Request, String>>),
}

/// Parse request parameters into one or many GraphQL requests
///
/// Form and query-string bodies carry `variables` and `extensions` as JSON
/// strings; those are decoded first.
pub fn parse_body(body: Value) -> Result<ParsedBody, String> {
    match body {
        Value::Array(items) => Ok(ParsedBody::Batch(items.into_iter().map(parse_request).collect())),
        other => parse_request(other).map(ParsedBody::Single),
    }
}

fn parse_request(value: Value) -> Result<Request, String> {
    serde_json::from_value::<Request>(decode_embedded_json(value))
        .map_err(|e| format!("Invalid GraphQL request: {}", e))
}

fn invalid_request(message: String) -> Response {
    Response::from_errors(vec![ServerError::new(message, None)])
}

fn decode_embedded_json(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    for key in ["variables", "extensions"] {
        let raw = match map.get(key) {
            Some(Value::String(raw)) => raw.trim().to_string(),
            _ => continue,
        };
        if raw.is_empty() {
            map.remove(key);
        } else if let Ok(decoded) = serde_json::from_str::<Value>(&raw) {
            map.insert(key.to_string(), decoded);
        }
    }
    Value::Object(map)
}

fn is_subscription(request: &Request) -> bool {
    let Ok(document) = parse_query(&request.query) else {
        return false;
    };
    let operation = match &document.operations {
        DocumentOperations::Single(operation) => Some(operation),
        DocumentOperations::Multiple(operations) => match &request.operation_name {
            Some(name) => operations.get(name.as_str()),
            None if operations.len() == 1 => operations.values().next(),
            None => None,
        },
    };
    operation.is_some_and(|op| op.node.ty == OperationType::Subscription)
}

/// Replace every error carrying an [`AggregateValidationError`] with one
/// error per failure, each with `extensions: { argument, category }`
pub fn expand_aggregate_errors(mut response: Response) -> Response {
    if !response
        .errors
        .iter()
        .any(|e| e.source::<AggregateValidationError>().is_some())
    {
        return response;
    }

    let errors = std::mem::take(&mut response.errors);
    response.errors = errors.into_iter().flat_map(expand_error).collect();
    response
}

fn expand_error(error: ServerError) -> Vec<ServerError> {
    let Some(aggregate) = error.source::<AggregateValidationError>() else {
        return vec![error];
    };

    aggregate
        .failures()
        .iter()
        .map(|failure| {
            let exception = GraphQLException::from(failure.clone());
            let mut expanded = ServerError::new(failure.message.clone(), None);
            expanded.locations = error.locations.clone();
            expanded.path = error.path.clone();
            expanded.extensions = Some(exception.extension_values());
            expanded.source = Some(Arc::new(exception));
            expanded
        })
        .collect()
}
