//! Core module containing the error taxonomy, parameter contracts and validation

pub mod annotations;
pub mod error;
pub mod parameter;
pub mod validation;

pub use annotations::{ParameterAnnotations, RuleSpec};
pub use error::{
    AggregateValidationError, BridgeError, FieldError, FieldResult, GraphQLException,
    ValidationFailure,
};
pub use parameter::{
    ArgumentDescriptor, ArgumentKind, ArgumentMap, BaseParameterHandler, FieldInfo, InjectFn,
    InjectedParameter, InputParameter, InputTypeParameter, MappedParameter, Parameter,
    ParameterHandler, ParameterMiddleware, RequestContext,
};
pub use validation::{ParameterValidator, RuleEngine, RuleEvaluator, ValidateFieldMiddleware};
