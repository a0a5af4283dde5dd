//! End-to-end tests of the GraphQL HTTP endpoint
//!
//! These tests verify that:
//! - Single and batched requests are executed and serialized
//! - The HTTP status follows the errors of the execution result
//! - Argument validation failures are reported one error per failure
//! - Empty, upload and malformed requests are rejected before execution

mod common;

use async_graphql::Response;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use common::{X_USER, fixture_builder, fixture_server, test_server};
use gqlbridge::core::error::{UNSUPPORTED_OUTCOME_MESSAGE, UPLOADS_UNSUPPORTED_MESSAGE};
use gqlbridge::prelude::*;

fn query(q: &str) -> Value {
    json!({ "query": q })
}

// =============================================================================
// Single Execution
// =============================================================================

mod single_tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_query() {
        let server = fixture_server();

        let response = server.post("/graphql").json(&query("{ test }")).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body, json!({ "data": { "test": "foo" } }));
    }

    #[tokio::test]
    async fn test_int_query() {
        let server = fixture_server();

        let response = server.post("/graphql").json(&query("{ testInt }")).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"]["testInt"], 42);
    }

    #[tokio::test]
    async fn test_same_request_gives_same_response() {
        let server = fixture_server();

        let first = server.post("/graphql").json(&query("{ test testInt }")).await;
        let second = server.post("/graphql").json(&query("{ test testInt }")).await;

        assert_eq!(first.status_code(), second.status_code());
        assert_eq!(first.json::<Value>(), second.json::<Value>());
    }

    #[tokio::test]
    async fn test_form_encoded_request() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .form(&[("query", "{ test }")])
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"]["test"], "foo");
    }

    #[tokio::test]
    async fn test_query_string_request() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .add_query_param("query", "{ testInt }")
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"]["testInt"], 42);
    }

    #[tokio::test]
    async fn test_variables_are_forwarded() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .json(&json!({
                "query": "query Check($foo: String!, $bar: Int!) { testValidator(foo: $foo, bar: $bar) }",
                "variables": { "foo": "john@example.com", "bar": 43 },
                "operationName": "Check"
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"]["testValidator"], "success");
    }

    #[tokio::test]
    async fn test_request_headers_reach_injected_parameters() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .add_header(
                HeaderName::from_static(X_USER),
                HeaderValue::from_static("alice"),
            )
            .json(&query("{ whoami }"))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["whoami"], "alice");

        let response = server.post("/graphql").json(&query("{ whoami }")).await;
        assert_eq!(response.json::<Value>()["data"]["whoami"], "anonymous");
    }
}

// =============================================================================
// Status Codes
// =============================================================================

mod status_tests {
    use super::*;

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        let server = fixture_server();

        let response = server.post("/graphql").json(&query("{ test")).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert!(body["errors"][0]["message"].as_str().is_some());
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_unknown_field_is_bad_request() {
        let server = fixture_server();

        let response = server.post("/graphql").json(&query("{ nope }")).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_client_exception_code_is_used() {
        let server = fixture_server();

        let response = server.post("/graphql").json(&query("{ missing }")).await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Value = response.json();
        assert_eq!(body["errors"][0]["message"], "Nothing here");
        assert_eq!(body["errors"][0]["path"], json!(["missing"]));
    }

    #[tokio::test]
    async fn test_internal_error_is_masked() {
        let server = fixture_server();

        let response = server.post("/graphql").json(&query("{ broken }")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json();
        assert_eq!(body["errors"][0]["message"], "Internal server error");
        assert!(body["errors"][0].get("extensions").is_none());
    }

    #[tokio::test]
    async fn test_debug_flag_exposes_internal_message() {
        let config = BridgeConfig {
            debug: DebugFlag::IncludeDebugMessage,
            ..BridgeConfig::default()
        };
        let server = test_server(fixture_builder().with_config(config));

        let response = server.post("/graphql").json(&query("{ broken }")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json();
        assert_eq!(body["errors"][0]["message"], "Internal server error");
        assert_eq!(
            body["errors"][0]["extensions"]["debugMessage"],
            "connection to the user store refused"
        );
    }

    #[tokio::test]
    async fn test_custom_status_decider() {
        let server = test_server(
            fixture_builder().with_status_decider(|_: &Response| StatusCode::IM_A_TEAPOT),
        );

        let response = server.post("/graphql").json(&query("{ test }")).await;
        response.assert_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(response.json::<Value>()["data"]["test"], "foo");
    }

    #[tokio::test]
    async fn test_configured_fixed_status() {
        let config = BridgeConfig {
            http_code_decider: StatusPolicy::Fixed(StatusCode::ACCEPTED),
            ..BridgeConfig::default()
        };
        let server = test_server(fixture_builder().with_config(config));

        let response = server.post("/graphql").json(&query("{ broken }")).await;
        response.assert_status(StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let server = fixture_server();

        let response = server.get("/graphql").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_custom_uri() {
        let config = BridgeConfig {
            uri: "/api/graphql".to_string(),
            ..BridgeConfig::default()
        };
        let server = test_server(fixture_builder().with_config(config));

        server
            .post("/api/graphql")
            .json(&query("{ test }"))
            .await
            .assert_status_ok();
        server
            .post("/graphql")
            .json(&query("{ test }"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Batch Execution
// =============================================================================

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_returns_array_in_order() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .json(&json!([query("{ test }"), query("{ testInt }")]))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(
            body,
            json!([
                { "data": { "test": "foo" } },
                { "data": { "testInt": 42 } }
            ])
        );
    }

    #[tokio::test]
    async fn test_batch_status_is_the_highest() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .json(&json!([
                query("{ test }"),
                query("{ missing }"),
                query(r#"{ testValidator(foo: "a", bar: 0) }"#)
            ]))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 3);
        assert!(body[0].get("errors").is_none());
        assert_eq!(body[1]["errors"][0]["message"], "Nothing here");
        assert_eq!(body[2]["errors"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_malformed_entry_keeps_batch_shape() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .json(&json!([query("{ test }"), 5]))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0], json!({ "data": { "test": "foo" } }));
        let message = body[1]["errors"][0]["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid GraphQL request"), "{}", message);
    }
}

// =============================================================================
// Argument Validation
// =============================================================================

mod validation_tests {
    use super::*;

    fn messages(body: &Value) -> Vec<String> {
        body["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e["message"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_every_failure_is_reported() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .json(&query(r#"{ testValidator(foo: "a", bar: 0) }"#))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(
            messages(&body),
            vec![
                "The foo must be a valid email address.",
                "The bar must be greater than 42."
            ]
        );
        assert_eq!(body["errors"][0]["extensions"]["argument"], "foo");
        assert_eq!(body["errors"][0]["extensions"]["category"], "Validate");
        assert_eq!(body["errors"][1]["extensions"]["argument"], "bar");
        assert_eq!(body["errors"][1]["path"], json!(["testValidator"]));
        assert_eq!(body["data"]["testValidator"], Value::Null);
    }

    #[tokio::test]
    async fn test_valid_arguments_pass() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .json(&query(r#"{ testValidator(foo: "john@example.com", bar: 43) }"#))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["testValidator"], "success");
    }

    #[tokio::test]
    async fn test_joined_rules_are_all_checked() {
        let server = fixture_server();

        let cases = [
            (
                "191.168.1",
                vec![
                    "The foo must start with one of the following: 192.",
                    "The foo must be a valid IPv4 address.",
                ],
            ),
            ("192.168.1", vec!["The foo must be a valid IPv4 address."]),
            (
                "191.168.1.1",
                vec!["The foo must start with one of the following: 192."],
            ),
        ];

        for (foo, expected) in cases {
            let response = server
                .post("/graphql")
                .json(&query(&format!(
                    r#"{{ testValidatorMultiple(foo: "{}") }}"#,
                    foo
                )))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(messages(&response.json::<Value>()), expected, "foo = {}", foo);
        }

        let response = server
            .post("/graphql")
            .json(&query(r#"{ testValidatorMultiple(foo: "192.168.1.1") }"#))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>()["data"]["testValidatorMultiple"],
            "success"
        );
    }
}

// =============================================================================
// Rejected Requests
// =============================================================================

mod rejection_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_body() {
        let server = fixture_server();

        let response = server.post("/graphql").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({ "errors": [{ "message": "POST body is empty" }] })
        );

        let response = server.post("/graphql").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["errors"][0]["message"],
            "POST body is empty"
        );
    }

    #[tokio::test]
    async fn test_uploads_are_rejected() {
        let server = fixture_server();

        let form = MultipartForm::new()
            .add_text("query", "mutation { uploadFile }")
            .add_part(
                "file",
                Part::bytes("hello".as_bytes())
                    .file_name("hello.txt")
                    .mime_type("text/plain"),
            );

        let response = server.post("/graphql").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({ "errors": [{ "message": UPLOADS_UNSUPPORTED_MESSAGE }] })
        );
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = fixture_server();

        let response = server
            .post("/graphql")
            .bytes(Bytes::from_static(b"{ not json"))
            .content_type("application/json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        let message = body["errors"][0]["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("Invalid JSON body"), "got {}", message);
    }
}

// =============================================================================
// Engine Outcomes
// =============================================================================

mod engine_tests {
    use super::*;
    use futures::{StreamExt, stream};

    struct StreamingEngine;

    #[async_trait]
    impl ExecutionEngine for StreamingEngine {
        async fn execute(&self, _request: TransportRequest) -> ExecutionOutcome {
            ExecutionOutcome::Deferred(stream::empty::<Response>().boxed())
        }
    }

    #[tokio::test]
    async fn test_deferred_result_is_an_error() {
        let server = test_server(ServerBuilder::new().with_engine(StreamingEngine));

        let response = server.post("/graphql").json(&query("{ test }")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<Value>(),
            json!({ "errors": [{ "message": UNSUPPORTED_OUTCOME_MESSAGE }] })
        );
    }

    #[tokio::test]
    async fn test_schema_engine_serves_custom_routes_too() {
        let health = Router::new().route("/health", axum::routing::get(|| async { "ok" }));
        let server = test_server(fixture_builder().with_custom_routes(health));

        server.get("/health").await.assert_status_ok();
        server
            .post("/graphql")
            .json(&query("{ test }"))
            .await
            .assert_status_ok();
    }
}
