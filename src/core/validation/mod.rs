//! Declarative argument validation
//!
//! Rules are declared per argument with [`RuleSpec`](crate::core::annotations::RuleSpec)
//! annotations. At schema build time [`ValidateFieldMiddleware`] wraps each
//! annotated argument in a [`ParameterValidator`], which checks the resolved
//! value with a [`RuleEvaluator`] on every request.

pub mod engine;
pub mod middleware;
pub mod parameter_validator;
pub mod rules;

pub use engine::{RuleEngine, RuleEvaluator, ValidationErrors};
pub use middleware::ValidateFieldMiddleware;
pub use parameter_validator::ParameterValidator;
pub use rules::{Rule, RuleError, RuleSet, join_rules};
