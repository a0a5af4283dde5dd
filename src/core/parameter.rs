//! Parameter contracts for resolver arguments
//!
//! Every argument of a field is mapped, once, at schema build time, into a
//! [`MappedParameter`]. At request time the mapped parameter turns the raw
//! argument map into the value handed to the field resolver.
//!
//! Mapping goes through a chain of [`ParameterMiddleware`]s ending in a
//! base [`ParameterHandler`]. A middleware calls `next` to obtain the mapped
//! parameter and may wrap it before returning it, so decorators compose.

use crate::core::annotations::ParameterAnnotations;
use crate::core::error::{FieldError, SchemaError};
use async_graphql::dynamic::TypeRef;
use axum::http::{HeaderMap, Method};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Raw argument values of one field, keyed by argument name
pub type ArgumentMap = IndexMap<String, Value>;

/// Closure computing an injected parameter from the request context
pub type InjectFn =
    Arc<dyn Fn(&RequestContext, &FieldInfo) -> Result<Value, FieldError> + Send + Sync>;

/// Per-request execution context made available to parameters
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    method: Method,
    headers: HeaderMap,
    query_string: Option<String>,
}

impl RequestContext {
    pub fn new(method: Method, headers: HeaderMap, query_string: Option<String>) -> Self {
        Self {
            method,
            headers,
            query_string,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of a header, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }
}

/// Metadata about the field being resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub parent_type: String,
    pub field_name: String,
}

impl FieldInfo {
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            parent_type: parent_type.into(),
            field_name: field_name.into(),
        }
    }
}

/// A resolver parameter
pub trait Parameter: Send + Sync {
    /// Compute the value handed to the field resolver
    fn resolve(
        &self,
        source: Option<&Value>,
        args: &ArgumentMap,
        context: &RequestContext,
        info: &FieldInfo,
    ) -> Result<Value, FieldError>;

    /// Declared name of the parameter
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;
}

/// A parameter backed by a GraphQL input argument
pub trait InputParameter: Parameter {
    /// GraphQL input type of the argument
    fn type_ref(&self) -> &TypeRef;

    fn has_default_value(&self) -> bool;

    fn default_value(&self) -> Option<&Value>;
}

/// Result of mapping one declared argument
///
/// Only `Input` parameters carry a typed input value and can be decorated
/// by value-inspecting middlewares such as validation.
#[derive(Clone)]
pub enum MappedParameter {
    Input(Arc<dyn InputParameter>),
    Injected(Arc<dyn Parameter>),
}

impl MappedParameter {
    pub fn name(&self) -> &str {
        match self {
            MappedParameter::Input(p) => p.name(),
            MappedParameter::Injected(p) => p.name(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            MappedParameter::Input(p) => p.description(),
            MappedParameter::Injected(p) => p.description(),
        }
    }

    pub fn resolve(
        &self,
        source: Option<&Value>,
        args: &ArgumentMap,
        context: &RequestContext,
        info: &FieldInfo,
    ) -> Result<Value, FieldError> {
        match self {
            MappedParameter::Input(p) => p.resolve(source, args, context, info),
            MappedParameter::Injected(p) => p.resolve(source, args, context, info),
        }
    }

    pub fn as_input(&self) -> Option<&Arc<dyn InputParameter>> {
        match self {
            MappedParameter::Input(p) => Some(p),
            MappedParameter::Injected(_) => None,
        }
    }
}

impl fmt::Debug for MappedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedParameter::Input(p) => f
                .debug_struct("Input")
                .field("name", &p.name())
                .field("type", &p.type_ref().to_string())
                .finish(),
            MappedParameter::Injected(p) => {
                f.debug_struct("Injected").field("name", &p.name()).finish()
            }
        }
    }
}

/// How a declared argument obtains its value
#[derive(Clone)]
pub enum ArgumentKind {
    /// A GraphQL input argument
    Input {
        type_ref: TypeRef,
        default: Option<Value>,
    },
    /// A value computed from the request context, hidden from the schema
    Injected(InjectFn),
}

impl fmt::Debug for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentKind::Input { type_ref, default } => f
                .debug_struct("Input")
                .field("type_ref", &type_ref.to_string())
                .field("default", default)
                .finish(),
            ArgumentKind::Injected(_) => f.write_str("Injected"),
        }
    }
}

/// The raw description of a declared argument, as seen by the mapping chain
#[derive(Debug, Clone)]
pub struct ArgumentDescriptor {
    /// Name of the field declaring the argument
    pub field: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: ArgumentKind,
}

/// A step of the parameter-mapping chain
pub trait ParameterHandler: Send + Sync {
    fn map_parameter(
        &self,
        argument: &ArgumentDescriptor,
        annotations: &ParameterAnnotations,
    ) -> Result<MappedParameter, SchemaError>;
}

/// A decorator over the rest of the parameter-mapping chain
pub trait ParameterMiddleware: Send + Sync {
    fn map_parameter(
        &self,
        argument: &ArgumentDescriptor,
        annotations: &ParameterAnnotations,
        next: &dyn ParameterHandler,
    ) -> Result<MappedParameter, SchemaError>;
}

/// Base input parameter: the raw argument value, or the declared default
pub struct InputTypeParameter {
    name: String,
    description: Option<String>,
    type_ref: TypeRef,
    default: Option<Value>,
}

impl InputTypeParameter {
    pub fn new(
        name: impl Into<String>,
        type_ref: TypeRef,
        default: Option<Value>,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            type_ref,
            default,
        }
    }
}

impl Parameter for InputTypeParameter {
    fn resolve(
        &self,
        _source: Option<&Value>,
        args: &ArgumentMap,
        _context: &RequestContext,
        _info: &FieldInfo,
    ) -> Result<Value, FieldError> {
        match args.get(&self.name) {
            Some(value) => Ok(value.clone()),
            None => Ok(self.default.clone().unwrap_or(Value::Null)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl InputParameter for InputTypeParameter {
    fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    fn has_default_value(&self) -> bool {
        self.default.is_some()
    }

    fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Parameter computed from the request context
pub struct InjectedParameter {
    name: String,
    description: Option<String>,
    inject: InjectFn,
}

impl InjectedParameter {
    pub fn new(name: impl Into<String>, inject: InjectFn, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            inject,
        }
    }
}

impl Parameter for InjectedParameter {
    fn resolve(
        &self,
        _source: Option<&Value>,
        _args: &ArgumentMap,
        context: &RequestContext,
        info: &FieldInfo,
    ) -> Result<Value, FieldError> {
        (self.inject)(context, info)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Terminal handler of the chain: maps a descriptor to its plain parameter
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseParameterHandler;

impl ParameterHandler for BaseParameterHandler {
    fn map_parameter(
        &self,
        argument: &ArgumentDescriptor,
        _annotations: &ParameterAnnotations,
    ) -> Result<MappedParameter, SchemaError> {
        let parameter = match &argument.kind {
            ArgumentKind::Input { type_ref, default } => {
                MappedParameter::Input(Arc::new(InputTypeParameter::new(
                    argument.name.clone(),
                    type_ref.clone(),
                    default.clone(),
                    argument.description.clone(),
                )))
            }
            ArgumentKind::Injected(inject) => MappedParameter::Injected(Arc::new(
                InjectedParameter::new(
                    argument.name.clone(),
                    inject.clone(),
                    argument.description.clone(),
                ),
            )),
        };
        Ok(parameter)
    }
}
