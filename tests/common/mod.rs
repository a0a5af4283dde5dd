//! Shared fixtures for the HTTP integration tests

#![allow(dead_code)]

use async_graphql::dynamic::Scalar;
use axum_test::TestServer;
use gqlbridge::prelude::*;

pub const X_USER: &str = "x-user";

fn string_field(name: &str) -> FieldDefinition {
    FieldDefinition::new(name, TypeRef::named(TypeRef::STRING))
}

/// The fixture schema used across the HTTP tests
pub fn fixture_schema() -> Schema {
    SchemaBuilder::new()
        .query(string_field("test").resolve(|_| async { Ok(json!("foo")) }))
        .query(
            FieldDefinition::new("testInt", TypeRef::named(TypeRef::INT))
                .resolve(|_| async { Ok(json!(42)) }),
        )
        .query(
            string_field("testValidator")
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
                    Ok(context.header(X_USER).map(|v| json!(v)).unwrap_or(Value::Null))
                }))
                .resolve(|args| async move {
                    Ok(json!(args.get_str("user").unwrap_or("anonymous")))
                }),
        )
        .query(string_field("broken").resolve(|_| async {
            Err(FieldError::internal("connection to the user store refused"))
        }))
        .query(string_field("missing").resolve(|_| async {
            Err(FieldError::from(GraphQLException::new("Nothing here", 404)))
        }))
        .mutation(
            string_field("uploadFile")
                .argument(Argument::input("file", TypeRef::named("Upload")))
                .validate("file", "file")
                .resolve(|_| async { Ok(json!("success")) }),
        )
        .register_type(Scalar::new("Upload"))
        .build()
        .expect("fixture schema should build")
}

pub fn fixture_builder() -> ServerBuilder {
    ServerBuilder::new().with_schema(fixture_schema())
}

pub fn test_server(builder: ServerBuilder) -> TestServer {
    let app = builder.build().expect("Failed to build app");
    TestServer::try_new(app).expect("Failed to create test server")
}

pub fn fixture_server() -> TestServer {
    test_server(fixture_builder())
}
