//! Validating decorator over an input parameter

use super::engine::RuleEvaluator;
use crate::core::error::{AggregateValidationError, FieldError, ValidationFailure};
use crate::core::parameter::{ArgumentMap, FieldInfo, InputParameter, Parameter, RequestContext};
use async_graphql::dynamic::TypeRef;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Wraps an [`InputParameter`] and checks its resolved value against a rule
/// expression
///
/// The resolved value is returned unchanged when every rule passes. Otherwise
/// resolution fails with an [`AggregateValidationError`] holding one
/// [`ValidationFailure`] per failing rule. Every other method delegates to
/// the wrapped parameter.
pub struct ParameterValidator {
    inner: Arc<dyn InputParameter>,
    argument: String,
    rules: String,
    evaluator: Arc<dyn RuleEvaluator>,
}

impl ParameterValidator {
    pub fn new(
        inner: Arc<dyn InputParameter>,
        argument: impl Into<String>,
        rules: impl Into<String>,
        evaluator: Arc<dyn RuleEvaluator>,
    ) -> Self {
        Self {
            inner,
            argument: argument.into(),
            rules: rules.into(),
            evaluator,
        }
    }

    /// The joined rule expression checked on resolution
    pub fn rules(&self) -> &str {
        &self.rules
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }
}

impl Parameter for ParameterValidator {
    fn resolve(
        &self,
        source: Option<&Value>,
        args: &ArgumentMap,
        context: &RequestContext,
        info: &FieldInfo,
    ) -> Result<Value, FieldError> {
        let value = self.inner.resolve(source, args, context, info)?;

        let data = IndexMap::from([(self.argument.clone(), value.clone())]);
        let rules = IndexMap::from([(self.argument.clone(), self.rules.clone())]);
        let errors = self.evaluator.evaluate(&data, &rules);

        if errors.is_empty() {
            return Ok(value);
        }

        let failures: Vec<ValidationFailure> = errors
            .into_iter()
            .flat_map(|(_, messages)| {
                messages
                    .into_iter()
                    .map(|message| ValidationFailure::new(self.argument.clone(), message))
            })
            .collect();

        tracing::debug!(
            field = %info.field_name,
            argument = %self.argument,
            failures = failures.len(),
            "Argument failed validation"
        );

        Err(FieldError::Validation(AggregateValidationError::new(failures)))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> Option<&str> {
        self.inner.description()
    }
}

impl InputParameter for ParameterValidator {
    fn type_ref(&self) -> &TypeRef {
        self.inner.type_ref()
    }

    fn has_default_value(&self) -> bool {
        self.inner.has_default_value()
    }

    fn default_value(&self) -> Option<&Value> {
        self.inner.default_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameter::InputTypeParameter;
    use crate::core::validation::RuleEngine;
    use serde_json::json;

    fn validator(rules: &str) -> ParameterValidator {
        let inner = Arc::new(InputTypeParameter::new(
            "foo",
            TypeRef::named_nn(TypeRef::STRING),
            Some(json!("192.168.0.1")),
            Some("an address".to_string()),
        ));
        ParameterValidator::new(inner, "foo", rules, Arc::new(RuleEngine::new()))
    }

    fn resolve(validator: &ParameterValidator, value: Value) -> Result<Value, FieldError> {
        let args = ArgumentMap::from([("foo".to_string(), value)]);
        validator.resolve(
            None,
            &args,
            &RequestContext::default(),
            &FieldInfo::new("Query", "testValidatorMultiple"),
        )
    }

    #[test]
    fn test_valid_value_is_returned_unchanged() {
        let v = validator("starts_with:192|ipv4");
        assert_eq!(resolve(&v, json!("192.168.1.1")).unwrap(), json!("192.168.1.1"));
    }

    #[test]
    fn test_all_failing_rules_are_aggregated() {
        let v = validator("starts_with:192|ipv4");
        match resolve(&v, json!("255.255.255.256")) {
            Err(FieldError::Validation(aggregate)) => {
                let failures = aggregate.failures();
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().all(|f| f.argument == "foo"));
                assert!(failures.iter().all(|f| f.category() == "Validate"));
                assert_eq!(
                    failures[0].message,
                    "The foo must start with one of the following: 192."
                );
                assert_eq!(failures[1].message, "The foo must be a valid IPv4 address.");
            }
            other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_metadata_passes_through() {
        let v = validator("ipv4");
        assert_eq!(v.name(), "foo");
        assert_eq!(v.description(), Some("an address"));
        assert_eq!(v.type_ref().to_string(), "String!");
        assert!(v.has_default_value());
        assert_eq!(v.default_value(), Some(&json!("192.168.0.1")));
        assert_eq!(v.rules(), "ipv4");
        assert_eq!(v.argument(), "foo");
    }

    #[test]
    fn test_default_value_is_validated_too() {
        let v = validator("starts_with:10");
        let result = v.resolve(
            None,
            &ArgumentMap::new(),
            &RequestContext::default(),
            &FieldInfo::new("Query", "test"),
        );
        assert!(matches!(result, Err(FieldError::Validation(_))));
    }
}
