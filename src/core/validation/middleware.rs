//! Parameter middleware that attaches validation to annotated arguments

use super::engine::{RuleEngine, RuleEvaluator};
use super::parameter_validator::ParameterValidator;
use super::rules::join_rules;
use crate::core::annotations::{ParameterAnnotations, RuleSpec};
use crate::core::error::SchemaError;
use crate::core::parameter::{
    ArgumentDescriptor, MappedParameter, ParameterHandler, ParameterMiddleware,
};
use std::sync::Arc;

/// Wraps every argument carrying [`RuleSpec`] annotations in a
/// [`ParameterValidator`]
///
/// Arguments without rules come back from the chain untouched.
#[derive(Clone)]
pub struct ValidateFieldMiddleware {
    evaluator: Arc<dyn RuleEvaluator>,
}

impl ValidateFieldMiddleware {
    pub fn new(evaluator: Arc<dyn RuleEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl Default for ValidateFieldMiddleware {
    fn default() -> Self {
        Self::new(Arc::new(RuleEngine::new()))
    }
}

impl ParameterMiddleware for ValidateFieldMiddleware {
    fn map_parameter(
        &self,
        argument: &ArgumentDescriptor,
        annotations: &ParameterAnnotations,
        next: &dyn ParameterHandler,
    ) -> Result<MappedParameter, SchemaError> {
        let mapped = next.map_parameter(argument, annotations)?;

        let specs: Vec<&RuleSpec> = annotations
            .of_type::<RuleSpec>()
            .filter(|spec| spec.target == argument.name)
            .collect();
        if specs.is_empty() {
            return Ok(mapped);
        }

        let inner = match mapped {
            MappedParameter::Input(inner) => inner,
            MappedParameter::Injected(_) => {
                return Err(SchemaError::CannotValidateParameter {
                    field: argument.field.clone(),
                    parameter: argument.name.clone(),
                });
            }
        };

        let rules = join_rules(specs.iter().map(|spec| spec.rule.as_str()));
        self.evaluator
            .check(&rules)
            .map_err(|e| SchemaError::InvalidRule {
                field: argument.field.clone(),
                argument: argument.name.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            field = %argument.field,
            argument = %argument.name,
            rules = %rules,
            "Validating argument"
        );

        Ok(MappedParameter::Input(Arc::new(ParameterValidator::new(
            inner,
            argument.name.clone(),
            rules,
            self.evaluator.clone(),
        ))))
    }
}
