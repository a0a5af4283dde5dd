//! Validated GraphQL API example
//!
//! Run with `cargo run --example validated_api`, then:
//!
//! ```text
//! curl -s localhost:3000/graphql -H 'content-type: application/json' \
//!   -d '{"query":"{ testValidator(foo: \"a\", bar: 0) }"}'
//! ```
//!
//! Set `GRAPHQL_DEBUG=true` to see internal error messages, or
//! `GRAPHQL_HTTP_CODE_DECIDER=fixed:200` to always answer 200.

use async_graphql::dynamic::Scalar;
use gqlbridge::prelude::*;
use tracing_subscriber::EnvFilter;

fn string_field(name: &str) -> FieldDefinition {
    FieldDefinition::new(name, TypeRef::named(TypeRef::STRING))
}

fn build_schema() -> Result<Schema> {
    let schema = SchemaBuilder::new()
        .query(string_field("test").resolve(|_| async { Ok(json!("foo")) }))
        .query(
            FieldDefinition::new("testInt", TypeRef::named(TypeRef::INT))
                .resolve(|_| async { Ok(json!(42)) }),
        )
        .query(
            string_field("testValidator")
                .description("Requires an email address and a number above 42")
                .argument(Argument::input("foo", TypeRef::named_nn(TypeRef::STRING)))
                .argument(Argument::input("bar", TypeRef::named_nn(TypeRef::INT)))
                .validate("foo", "email")
                .validate("bar", "gt:42")
                .resolve(|_| async { Ok(json!("success")) }),
        )
        .query(
            string_field("testValidatorMultiple")
                .argument(Argument::input("foo", TypeRef::named_nn(TypeRef::STRING)))
                .validate("foo", "starts_with:192|ipv4")
                .resolve(|_| async { Ok(json!("success")) }),
        )
        .query(
            string_field("whoami")
                .argument(Argument::injected("user", |context, _info| {
                    Ok(context.header("x-user").map(|v| json!(v)).unwrap_or(Value::Null))
                }))
                .resolve(|args| async move {
                    Ok(json!(args.get_str("user").unwrap_or("anonymous")))
                }),
        )
        .mutation(
            string_field("uploadFile")
                .argument(Argument::input("file", TypeRef::named("Upload")))
                .validate("file", "file")
                .resolve(|_| async { Ok(json!("success")) }),
        )
        .register_type(Scalar::new("Upload"))
        .build()?;

    Ok(schema)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BridgeConfig::default().with_env_overrides()?;

    ServerBuilder::new()
        .with_config(config)
        .with_schema(build_schema()?)
        .serve("127.0.0.1:3000")
        .await
}
