//! Field declarations
//!
//! A [`FieldDefinition`] describes one root field: its output type, its
//! ordered arguments, the annotations attached to those arguments and the
//! async resolver receiving the resolved argument values.

use crate::core::annotations::{ParameterAnnotations, RuleSpec};
use crate::core::error::{FieldError, FieldResult};
use crate::core::parameter::{ArgumentDescriptor, ArgumentKind, FieldInfo, RequestContext};
use async_graphql::dynamic::TypeRef;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// Async resolver of a field
pub type FieldResolverFn =
    Arc<dyn Fn(ResolvedArgs) -> BoxFuture<'static, FieldResult<Value>> + Send + Sync>;

/// One declared argument of a field
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    description: Option<String>,
    kind: ArgumentKind,
}

impl Argument {
    /// A GraphQL input argument
    pub fn input(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: ArgumentKind::Input {
                type_ref,
                default: None,
            },
        }
    }

    /// A value computed from the request context, not exposed in the schema
    pub fn injected<F>(name: impl Into<String>, inject: F) -> Self
    where
        F: Fn(&RequestContext, &FieldInfo) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            kind: ArgumentKind::Injected(Arc::new(inject)),
        }
    }

    /// Default value of an input argument; ignored for injected ones
    pub fn default_value(mut self, value: Value) -> Self {
        if let ArgumentKind::Input { default, .. } = &mut self.kind {
            *default = Some(value);
        }
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    pub(crate) fn descriptor(&self, field: &str) -> ArgumentDescriptor {
        ArgumentDescriptor {
            field: field.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// Argument values handed to a field resolver, keyed by argument name
#[derive(Debug, Clone, Default)]
pub struct ResolvedArgs {
    values: IndexMap<String, Value>,
}

impl ResolvedArgs {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Deserialize one argument into `T`
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> FieldResult<T> {
        let value = self.values.get(name).cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

/// Declaration of one root field
#[derive(Clone)]
pub struct FieldDefinition {
    name: String,
    type_ref: TypeRef,
    description: Option<String>,
    arguments: Vec<Argument>,
    annotations: IndexMap<String, ParameterAnnotations>,
    resolver: Option<FieldResolverFn>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            description: None,
            arguments: Vec::new(),
            annotations: IndexMap::new(),
            resolver: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Declare a validation rule for the argument named `target`
    ///
    /// Several rules may target the same argument; they are combined in
    /// declaration order.
    pub fn validate(self, target: impl Into<String>, rule: impl Into<String>) -> Self {
        let target = target.into();
        let spec = RuleSpec::new(target.clone(), rule);
        self.annotate(target, spec)
    }

    /// Attach an arbitrary annotation to the argument named `target`
    pub fn annotate<A: Any + Send + Sync>(mut self, target: impl Into<String>, annotation: A) -> Self {
        self.annotations
            .entry(target.into())
            .or_default()
            .push(annotation);
        self
    }

    pub fn resolve<F, Fut>(mut self, resolver: F) -> Self
    where
        F: Fn(ResolvedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult<Value>> + Send + 'static,
    {
        self.resolver = Some(Arc::new(move |args| resolver(args).boxed()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn field_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Annotations declared for one argument
    pub fn annotations_for(&self, argument: &str) -> ParameterAnnotations {
        self.annotations.get(argument).cloned().unwrap_or_default()
    }

    /// Names of every argument that carries annotations
    pub fn annotated_targets(&self) -> impl Iterator<Item = &str> {
        self.annotations.keys().map(String::as_str)
    }

    pub fn resolver(&self) -> Option<&FieldResolverFn> {
        self.resolver.as_ref()
    }
}

impl std::fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("type", &self.type_ref.to_string())
            .field("arguments", &self.arguments)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_validate_collects_rules_per_target() {
        let field = FieldDefinition::new("testValidatorMultiple", TypeRef::named_nn(TypeRef::STRING))
            .argument(Argument::input("foo", TypeRef::named_nn(TypeRef::STRING)))
            .validate("foo", "starts_with:192")
            .validate("foo", "ipv4");

        let rules: Vec<String> = field
            .annotations_for("foo")
            .of_type::<RuleSpec>()
            .map(|r| r.rule.clone())
            .collect();
        assert_eq!(rules, vec!["starts_with:192", "ipv4"]);
        assert!(field.annotations_for("bar").is_empty());
        assert_eq!(field.annotated_targets().collect::<Vec<_>>(), vec!["foo"]);
    }

    #[test]
    fn test_default_value_only_applies_to_inputs() {
        let input = Argument::input("limit", TypeRef::named(TypeRef::INT)).default_value(json!(10));
        match input.kind() {
            ArgumentKind::Input { default, .. } => assert_eq!(default, &Some(json!(10))),
            other => panic!("unexpected kind {:?}", other),
        }

        let injected = Argument::injected("user", |_: &RequestContext, _: &FieldInfo| Ok(Value::Null))
            .default_value(json!(10));
        assert!(matches!(injected.kind(), ArgumentKind::Injected(_)));
    }

    #[test]
    fn test_resolved_args_accessors() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Range {
            from: i64,
            to: i64,
        }

        let args = ResolvedArgs::new(IndexMap::from([
            ("name".to_string(), json!("foo")),
            ("count".to_string(), json!(3)),
            ("range".to_string(), json!({ "from": 1, "to": 5 })),
            ("missing".to_string(), Value::Null),
        ]));

        assert_eq!(args.get_str("name"), Some("foo"));
        assert_eq!(args.get_i64("count"), Some(3));
        assert!(args.get("missing").is_none());
        assert_eq!(args.parse::<Range>("range").unwrap(), Range { from: 1, to: 5 });
        assert!(args.parse::<Range>("name").is_err());
    }

    #[tokio::test]
    async fn test_resolver_is_boxed() {
        let field = FieldDefinition::new("testInt", TypeRef::named_nn(TypeRef::INT))
            .resolve(|_| async { Ok(json!(42)) });
        let resolver = field.resolver().unwrap();
        assert_eq!(resolver(ResolvedArgs::default()).await.unwrap(), json!(42));
    }
}
