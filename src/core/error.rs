//! Typed error handling for the bridge
//!
//! Errors are split by the phase in which they can happen:
//!
//! - [`RequestError`]: the inbound HTTP request is unusable (empty body,
//!   file uploads, undecodable payload). Answered directly by the bridge.
//! - [`EngineError`]: the execution engine produced something the bridge
//!   cannot serve. Always a misconfiguration.
//! - [`SchemaError`]: raised while the schema is built, never per request.
//! - [`ConfigError`]: configuration parsing and validation.
//!
//! [`BridgeError`] wraps all of them and renders the fixed
//! `{ "errors": [ { "message": ... } ] }` shape used for responses that never
//! reached the execution engine.
//!
//! Resolver-level failures live on a separate axis: [`FieldError`] is what a
//! parameter or a field resolver returns, and it is converted into an
//! `async_graphql::Error` that keeps its typed source so the engine's error
//! handler and the status decider can inspect it later.

use async_graphql::ErrorExtensionValues;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Fixed message for a request that carries no fields at all
pub const EMPTY_BODY_MESSAGE: &str = "POST body is empty";

/// Fixed message for a request that carries file parts
pub const UPLOADS_UNSUPPORTED_MESSAGE: &str =
    "File uploads are not supported by this endpoint. Send a JSON or form encoded GraphQL request instead.";

/// Fixed message for an engine outcome the bridge cannot serve
pub const UNSUPPORTED_OUTCOME_MESSAGE: &str = "Only synchronous execution results are supported";

/// Error category attached to every argument validation failure
pub const VALIDATE_CATEGORY: &str = "Validate";

/// The main error type of the bridge
#[derive(Debug)]
pub enum BridgeError {
    /// The HTTP request was rejected before execution
    Request(RequestError),

    /// The execution engine returned an unsupported outcome
    Engine(EngineError),

    /// Schema construction failed
    Schema(SchemaError),

    /// Configuration errors
    Config(ConfigError),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Request(e) => write!(f, "{}", e),
            BridgeError::Engine(e) => write!(f, "{}", e),
            BridgeError::Schema(e) => write!(f, "{}", e),
            BridgeError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Request(e) => Some(e),
            BridgeError::Engine(e) => Some(e),
            BridgeError::Schema(e) => Some(e),
            BridgeError::Config(e) => Some(e),
        }
    }
}

impl BridgeError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Request(e) => e.status_code(),
            BridgeError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::Request(e) => e.error_code(),
            BridgeError::Engine(_) => "UNSUPPORTED_ENGINE_RESULT",
            BridgeError::Schema(_) => "SCHEMA_ERROR",
            BridgeError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// The GraphQL-shaped body sent back for this error
    pub fn to_body(&self) -> serde_json::Value {
        json!({
            "errors": [
                { "message": self.to_string() }
            ]
        })
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to the inbound HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The decoded body carries no fields
    EmptyBody,

    /// The request carries file parts
    UploadsUnsupported,

    /// The body is not valid JSON
    InvalidJson { message: String },

    /// The multipart body could not be read
    InvalidMultipart { message: String },

    /// The body could not be read at all
    InvalidBody { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::EmptyBody => f.write_str(EMPTY_BODY_MESSAGE),
            RequestError::UploadsUnsupported => f.write_str(UPLOADS_UNSUPPORTED_MESSAGE),
            RequestError::InvalidJson { message } => write!(f, "Invalid JSON body: {}", message),
            RequestError::InvalidMultipart { message } => {
                write!(f, "Invalid multipart body: {}", message)
            }
            RequestError::InvalidBody { message } => write!(f, "Invalid request body: {}", message),
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::EmptyBody => "EMPTY_BODY",
            RequestError::UploadsUnsupported => "UPLOADS_UNSUPPORTED",
            RequestError::InvalidJson { .. } => "INVALID_JSON",
            RequestError::InvalidMultipart { .. } => "INVALID_MULTIPART",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

impl From<RequestError> for BridgeError {
    fn from(err: RequestError) -> Self {
        BridgeError::Request(err)
    }
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors related to what the execution engine hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine returned a deferred (streamed) result
    UnsupportedOutcome,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnsupportedOutcome => f.write_str(UNSUPPORTED_OUTCOME_MESSAGE),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for BridgeError {
    fn from(err: EngineError) -> Self {
        BridgeError::Engine(err)
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors raised while mapping parameters and compiling the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A validation rule targets an argument the field does not declare
    UnknownValidationTarget { field: String, target: String },

    /// A validation rule targets a parameter that carries no input value
    CannotValidateParameter { field: String, parameter: String },

    /// A rule expression could not be parsed
    InvalidRule {
        field: String,
        argument: String,
        message: String,
    },

    /// Two fields with the same name on one type
    DuplicateField { type_name: String, field: String },

    /// Two arguments with the same name on one field
    DuplicateArgument { field: String, argument: String },

    /// A field was declared without a resolver
    MissingResolver { field: String },

    /// The execution engine rejected the compiled schema
    Build { message: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnknownValidationTarget { field, target } => write!(
                f,
                "Validation rule on field '{}' targets unknown argument '{}'",
                field, target
            ),
            SchemaError::CannotValidateParameter { field, parameter } => write!(
                f,
                "Cannot validate parameter '{}' of field '{}': only GraphQL input arguments can be validated",
                parameter, field
            ),
            SchemaError::InvalidRule {
                field,
                argument,
                message,
            } => write!(
                f,
                "Invalid validation rule for argument '{}' of field '{}': {}",
                argument, field, message
            ),
            SchemaError::DuplicateField { type_name, field } => {
                write!(f, "Field '{}' is declared twice on type '{}'", field, type_name)
            }
            SchemaError::DuplicateArgument { field, argument } => write!(
                f,
                "Argument '{}' is declared twice on field '{}'",
                argument, field
            ),
            SchemaError::MissingResolver { field } => {
                write!(f, "Field '{}' has no resolver", field)
            }
            SchemaError::Build { message } => write!(f, "Failed to build schema: {}", message),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<SchemaError> for BridgeError {
    fn from(err: SchemaError) -> Self {
        BridgeError::Schema(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => write!(
                f,
                "Invalid value '{}' for field '{}': {}",
                value, field, message
            ),
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        BridgeError::Config(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Field Errors
// =============================================================================

/// One violated rule for one argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Declared name of the offending argument
    pub argument: String,
    /// Human-readable message produced by the rule engine
    pub message: String,
}

impl ValidationFailure {
    pub fn new(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        VALIDATE_CATEGORY
    }
}

/// Every validation failure collected for one field, in argument then rule order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateValidationError {
    failures: Vec<ValidationFailure>,
}

impl AggregateValidationError {
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Append the failures of another aggregate, keeping their order
    pub fn extend(&mut self, other: AggregateValidationError) {
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for AggregateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.failures.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl std::error::Error for AggregateValidationError {}

/// A client-safe error carrying its own HTTP status and category
///
/// This is the only resolver error type whose message reaches clients
/// verbatim. Anything else is reported as an internal error.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLException {
    message: String,
    code: u16,
    category: String,
    extensions: IndexMap<String, serde_json::Value>,
}

impl GraphQLException {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
            category: "Exception".to_string(),
            extensions: IndexMap::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn extensions(&self) -> &IndexMap<String, serde_json::Value> {
        &self.extensions
    }

    /// Extension values as rendered in the GraphQL error: custom keys, then `category`
    pub fn extension_values(&self) -> ErrorExtensionValues {
        let mut values = ErrorExtensionValues::default();
        for (key, value) in &self.extensions {
            values.set(
                key,
                async_graphql::Value::from_json(value.clone()).unwrap_or(async_graphql::Value::Null),
            );
        }
        values.set("category", self.category.clone());
        values
    }
}

impl fmt::Display for GraphQLException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GraphQLException {}

impl From<ValidationFailure> for GraphQLException {
    fn from(failure: ValidationFailure) -> Self {
        GraphQLException::new(failure.message, 400)
            .with_extension("argument", serde_json::Value::String(failure.argument))
            .with_category(VALIDATE_CATEGORY)
    }
}

/// Failure raised while resolving a parameter or a field
#[derive(Debug)]
pub enum FieldError {
    /// One or more arguments failed their declared rules
    Validation(AggregateValidationError),

    /// A client-safe error with its own status
    Client(GraphQLException),

    /// Anything else; its message is hidden from clients unless debugging
    Internal(String),
}

impl FieldError {
    pub fn internal(message: impl Into<String>) -> Self {
        FieldError::Internal(message.into())
    }

    /// Convert into the engine's error type, keeping the typed source
    pub fn into_graphql_error(self) -> async_graphql::Error {
        match self {
            FieldError::Validation(aggregate) => async_graphql::Error::new_with_source(aggregate),
            FieldError::Client(exception) => {
                let extensions = exception.extension_values();
                let mut error = async_graphql::Error::new_with_source(exception);
                error.extensions = Some(extensions);
                error
            }
            FieldError::Internal(message) => async_graphql::Error::new(message),
        }
    }
}

impl From<AggregateValidationError> for FieldError {
    fn from(err: AggregateValidationError) -> Self {
        FieldError::Validation(err)
    }
}

impl From<GraphQLException> for FieldError {
    fn from(err: GraphQLException) -> Self {
        FieldError::Client(err)
    }
}

impl From<anyhow::Error> for FieldError {
    fn from(err: anyhow::Error) -> Self {
        FieldError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::Internal(err.to_string())
    }
}

/// A specialized Result type for field resolution
pub type FieldResult<T> = Result<T, FieldError>;

// =============================================================================
// Tests
// =============================================================================
