//! Schema build phase
//!
//! [`SchemaBuilder`] collects root field declarations, maps every argument
//! once through the parameter-middleware chain and compiles the result into
//! an `async_graphql::dynamic::Schema`.

pub mod field;
pub mod mapper;

pub use field::{Argument, FieldDefinition, FieldResolverFn, ResolvedArgs};
pub use mapper::ParameterMapper;

use crate::core::annotations::RuleSpec;
use crate::core::error::{AggregateValidationError, FieldError, SchemaError};
use crate::core::parameter::{
    ArgumentMap, FieldInfo, MappedParameter, ParameterMiddleware, RequestContext,
};
use crate::core::validation::{RuleEngine, RuleEvaluator, ValidateFieldMiddleware};
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Schema, Type,
};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

pub const QUERY_TYPE: &str = "Query";
pub const MUTATION_TYPE: &str = "Mutation";

/// Builder for the executable schema
///
/// Validation is installed by default: arguments annotated with rules are
/// wrapped by [`ValidateFieldMiddleware`] using a [`RuleEngine`], unless
/// another evaluator is supplied.
pub struct SchemaBuilder {
    query: Vec<FieldDefinition>,
    mutation: Vec<FieldDefinition>,
    types: Vec<Type>,
    evaluator: Arc<dyn RuleEvaluator>,
    middlewares: Vec<Arc<dyn ParameterMiddleware>>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            query: Vec::new(),
            mutation: Vec::new(),
            types: Vec::new(),
            evaluator: Arc::new(RuleEngine::new()),
            middlewares: Vec::new(),
        }
    }

    /// Replace the rule evaluator used by the validation middleware
    pub fn with_rule_evaluator(mut self, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Add a parameter middleware, running inside the validation middleware
    pub fn with_parameter_middleware(mut self, middleware: Arc<dyn ParameterMiddleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn query(mut self, field: FieldDefinition) -> Self {
        self.query.push(field);
        self
    }

    pub fn mutation(mut self, field: FieldDefinition) -> Self {
        self.mutation.push(field);
        self
    }

    /// Register an additional type (enum, input object, scalar...)
    pub fn register_type(mut self, ty: impl Into<Type>) -> Self {
        self.types.push(ty.into());
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut mapper = ParameterMapper::new().with_middleware(Arc::new(
            ValidateFieldMiddleware::new(self.evaluator.clone()),
        ));
        for middleware in self.middlewares {
            mapper.push(middleware);
        }

        let query = compile_object(QUERY_TYPE, &self.query, &mapper)?;
        let mutation = if self.mutation.is_empty() {
            None
        } else {
            Some(compile_object(MUTATION_TYPE, &self.mutation, &mapper)?)
        };

        let mut builder = Schema::build(
            QUERY_TYPE,
            mutation.as_ref().map(|_| MUTATION_TYPE),
            None,
        )
        .register(query);
        if let Some(mutation) = mutation {
            builder = builder.register(mutation);
        }
        for ty in self.types {
            builder = builder.register(ty);
        }

        let schema = builder.finish().map_err(|e| SchemaError::Build {
            message: e.to_string(),
        })?;

        tracing::info!(
            query_fields = self.query.len(),
            mutation_fields = self.mutation.len(),
            "GraphQL schema built"
        );

        Ok(schema)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_object(
    type_name: &str,
    fields: &[FieldDefinition],
    mapper: &ParameterMapper,
) -> Result<Object, SchemaError> {
    let mut object = Object::new(type_name);
    let mut seen = HashSet::new();

    for definition in fields {
        if !seen.insert(definition.name()) {
            return Err(SchemaError::DuplicateField {
                type_name: type_name.to_string(),
                field: definition.name().to_string(),
            });
        }
        object = object.field(compile_field(type_name, definition, mapper)?);
    }

    Ok(object)
}

fn compile_field(
    type_name: &str,
    definition: &FieldDefinition,
    mapper: &ParameterMapper,
) -> Result<Field, SchemaError> {
    let field_name = definition.name();
    let resolver = definition
        .resolver()
        .cloned()
        .ok_or_else(|| SchemaError::MissingResolver {
            field: field_name.to_string(),
        })?;

    let mut names = HashSet::new();
    for argument in definition.arguments() {
        if !names.insert(argument.name()) {
            return Err(SchemaError::DuplicateArgument {
                field: field_name.to_string(),
                argument: argument.name().to_string(),
            });
        }
    }
    for target in definition.annotated_targets() {
        if !names.contains(target) {
            return Err(SchemaError::UnknownValidationTarget {
                field: field_name.to_string(),
                target: target.to_string(),
            });
        }
        // a rule filed under one argument but naming another would never run
        let annotations = definition.annotations_for(target);
        if let Some(spec) = annotations
            .of_type::<RuleSpec>()
            .find(|spec| spec.target != target)
        {
            return Err(SchemaError::UnknownValidationTarget {
                field: field_name.to_string(),
                target: spec.target.clone(),
            });
        }
    }

    let parameters = definition
        .arguments()
        .iter()
        .map(|argument| {
            mapper.map(
                &argument.descriptor(field_name),
                &definition.annotations_for(argument.name()),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut inputs = Vec::new();
    for parameter in &parameters {
        if let MappedParameter::Input(input) = parameter {
            let mut value = InputValue::new(input.name(), input.type_ref().clone());
            if let Some(default) = input.default_value() {
                let default = async_graphql::Value::from_json(default.clone()).map_err(|e| {
                    SchemaError::Build {
                        message: format!(
                            "default value of '{}.{}' is not a GraphQL value: {}",
                            field_name,
                            input.name(),
                            e
                        ),
                    }
                })?;
                value = value.default_value(default);
            }
            if let Some(description) = input.description() {
                value = value.description(description);
            }
            inputs.push(value);
        }
    }

    let resolved = Arc::new(ResolvedField {
        info: FieldInfo::new(type_name, field_name),
        parameters,
        resolver,
    });

    let mut field = Field::new(field_name, definition.type_ref().clone(), move |ctx| {
        let resolved = resolved.clone();
        FieldFuture::new(async move { resolved.resolve(ctx).await })
    });
    if let Some(description) = definition.field_description() {
        field = field.description(description);
    }
    for input in inputs {
        field = field.argument(input);
    }

    Ok(field)
}

/// Runtime state of one compiled field
struct ResolvedField {
    info: FieldInfo,
    parameters: Vec<MappedParameter>,
    resolver: FieldResolverFn,
}

impl ResolvedField {
    /// Resolve every parameter, then call the resolver
    ///
    /// Validation failures from all arguments are merged into one aggregate
    /// before failing; any other parameter error fails immediately.
    async fn resolve<'a>(
        &self,
        ctx: ResolverContext<'a>,
    ) -> async_graphql::Result<Option<FieldValue<'a>>> {
        let mut args = ArgumentMap::new();
        for (name, value) in ctx.args.as_index_map() {
            args.insert(name.to_string(), value.clone().into_json()?);
        }

        let fallback = RequestContext::default();
        let context = ctx.ctx.data_opt::<RequestContext>().unwrap_or(&fallback);

        let mut values = IndexMap::new();
        let mut failures = AggregateValidationError::new(Vec::new());
        for parameter in &self.parameters {
            match parameter.resolve(None, &args, context, &self.info) {
                Ok(value) => {
                    values.insert(parameter.name().to_string(), value);
                }
                Err(FieldError::Validation(aggregate)) => failures.extend(aggregate),
                Err(other) => return Err(other.into_graphql_error()),
            }
        }
        if !failures.is_empty() {
            return Err(FieldError::Validation(failures).into_graphql_error());
        }

        let result = (self.resolver)(ResolvedArgs::new(values))
            .await
            .map_err(FieldError::into_graphql_error)?;
        if result.is_null() {
            return Ok(None);
        }

        Ok(Some(FieldValue::value(async_graphql::Value::from_json(
            result,
        )?)))
    }
}
