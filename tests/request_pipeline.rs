//! Request pipeline integration tests against a live mock server.

use mockito::Matcher;
use reqkit::prelude::*;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

type Recorded<T> = Arc<Mutex<Vec<T>>>;

fn global_recorder() -> (Handlers, Recorded<String>) {
    let seen: Recorded<String> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handlers = Handlers::new().on_global_message(move |m| sink.lock().unwrap().push(m.to_string()));
    (handlers, seen)
}

fn full_recorder() -> (Handlers, Recorded<String>, Recorded<(i64, String)>) {
    let global: Recorded<String> = Arc::new(Mutex::new(Vec::new()));
    let backend: Recorded<(i64, String)> = Arc::new(Mutex::new(Vec::new()));
    let g = global.clone();
    let b = backend.clone();
    let handlers = Handlers::new()
        .on_global_message(move |m| g.lock().unwrap().push(m.to_string()))
        .on_backend_error(move |code, m| b.lock().unwrap().push((code, m.to_string())));
    (handlers, global, backend)
}

fn client(base_url: &str, handlers: Handlers) -> ApiClient {
    ApiClient::builder(base_url)
        .handlers(handlers)
        .build()
        .unwrap()
}

#[tokio::test]
async fn success_resolves_with_unwrapped_data_and_fires_no_hooks() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/items/7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":10000,"message":"ok","data":{"id":7,"name":"widget"}}"#)
        .create_async()
        .await;

    let (handlers, global, backend) = full_recorder();
    let api = client(&server.url(), handlers);

    let value: serde_json::Value = api.get("/items/7").await.unwrap();
    assert_eq!(value["id"], 7);
    assert_eq!(value["name"], "widget");
    assert!(global.lock().unwrap().is_empty());
    assert!(backend.lock().unwrap().is_empty());
}

#[tokio::test]
async fn success_deserializes_into_typed_data() {
    #[derive(Deserialize)]
    struct Item {
        id: u32,
        name: String,
    }

    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/items")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":{"id":1,"name":"a"}}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Handlers::new());
    let item: Item = api.post("/items", serde_json::json!({"name": "a"})).await.unwrap();
    assert_eq!(item.id, 1);
    assert_eq!(item.name, "a");
}

#[tokio::test]
async fn business_failure_prefers_backend_error_hook() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/quota")
        .with_status(200)
        .with_body(r#"{"code":40001,"message":"quota exceeded","data":null}"#)
        .create_async()
        .await;

    let (handlers, global, backend) = full_recorder();
    let api = client(&server.url(), handlers);

    let err = api.get::<serde_json::Value>("/quota").await.expect_err("business failure");
    assert!(matches!(err, Error::Business { code: 40001, .. }));
    assert_eq!(
        *backend.lock().unwrap(),
        vec![(40001, "quota exceeded".to_string())]
    );
    assert!(global.lock().unwrap().is_empty(), "global hook must not fire");
}

#[tokio::test]
async fn business_failure_falls_back_to_global_message() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/quota")
        .with_status(200)
        .with_body(r#"{"code":40001,"message":"quota exceeded","data":null}"#)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let api = client(&server.url(), handlers);

    let err = api.get::<serde_json::Value>("/quota").await.expect_err("business failure");
    assert!(matches!(err, Error::Business { .. }));
    assert_eq!(*global.lock().unwrap(), vec!["quota exceeded".to_string()]);
}

#[tokio::test]
async fn business_failure_without_message_uses_code_fallback() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/quota")
        .with_status(200)
        .with_body(r#"{"code":40001,"message":"","data":null}"#)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let api = client(&server.url(), handlers);

    api.get::<serde_json::Value>("/quota").await.expect_err("business failure");
    assert_eq!(
        *global.lock().unwrap(),
        vec!["Request failed, business code: 40001".to_string()]
    );
}

#[tokio::test]
async fn show_global_message_false_suppresses_the_hook() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/quota")
        .with_status(200)
        .with_body(r#"{"code":40001,"message":"quota exceeded","data":null}"#)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let api = client(&server.url(), handlers);

    let err = api
        .request::<serde_json::Value>(RequestConfig::get("/quota").show_global_message(false))
        .await
        .expect_err("business failure");
    assert!(matches!(err, Error::Business { .. }));
    assert!(global.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disabled_code_check_treats_any_code_as_success() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/legacy")
        .with_status(200)
        .with_body(r#"{"code":1,"message":"whatever","data":"payload"}"#)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let api = client(&server.url(), handlers);

    let value: String = api
        .request(RequestConfig::get("/legacy").enable_code_check(false))
        .await
        .unwrap();
    assert_eq!(value, "payload");
    assert!(global.lock().unwrap().is_empty());
}

#[tokio::test]
async fn client_level_success_code_override() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/zero")
        .with_status(200)
        .with_body(r#"{"code":0,"message":"ok","data":42}"#)
        .create_async()
        .await;

    let api = ApiClient::builder(server.url())
        .success_code(0)
        .build()
        .unwrap();
    let value: i64 = api.get("/zero").await.unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn per_call_success_code_wins_over_client_default() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/alt")
        .with_status(200)
        .with_body(r#"{"code":200,"message":"ok","data":true}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Handlers::new());
    let value: bool = api
        .request(RequestConfig::get("/alt").success_code(200))
        .await
        .unwrap();
    assert!(value);
}

#[tokio::test]
async fn http_status_messages_match_fixed_table() {
    let cases = [
        (401, "unauthorized, please re-login"),
        (403, "access denied"),
        (500, "internal server error"),
        (418, "HTTP error: 418"),
    ];

    for (status, expected) in cases {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/fail")
            .with_status(status)
            .with_body("nope")
            .create_async()
            .await;

        let (handlers, global) = global_recorder();
        let api = client(&server.url(), handlers);

        let err = api.get::<serde_json::Value>("/fail").await.expect_err("http failure");
        assert_eq!(err.status(), Some(status as u16));
        assert_eq!(err.user_message(), expected);
        assert_eq!(*global.lock().unwrap(), vec![expected.to_string()]);
    }
}

#[tokio::test]
async fn not_found_message_includes_the_url() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let api = client(&server.url(), handlers);

    api.get::<serde_json::Value>("/missing").await.expect_err("404");
    let expected = format!("resource not found: {}/missing", server.url());
    assert_eq!(*global.lock().unwrap(), vec![expected]);
}

#[tokio::test]
async fn unreachable_server_maps_to_network_message() {
    let (handlers, global) = global_recorder();
    let api = client("http://127.0.0.1:9", handlers);

    let err = api.get::<serde_json::Value>("/x").await.expect_err("network failure");
    assert!(matches!(err, Error::Network(_)));
    assert_eq!(
        *global.lock().unwrap(),
        vec!["network error, unable to reach server".to_string()]
    );
}

#[tokio::test]
async fn pre_cancelled_token_rejects_with_cancelled() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/slow")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":null}"#)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let api = client(&server.url(), handlers);

    let token = CancellationToken::new();
    token.cancel();
    let err = api
        .request::<serde_json::Value>(RequestConfig::get("/slow").cancel_token(token))
        .await
        .expect_err("cancelled");
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(*global.lock().unwrap(), vec!["request cancelled".to_string()]);
}

#[tokio::test]
async fn request_header_handler_injects_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/secure")
        .match_header("authorization", "Bearer token-1")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":null}"#)
        .create_async()
        .await;

    let handlers =
        Handlers::new().on_request_header(|config| Ok(config.header("authorization", "Bearer token-1")));
    let api = client(&server.url(), handlers);

    api.get::<serde_json::Value>("/secure").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn query_parameters_are_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/items")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":[]}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Handlers::new());
    api.request::<serde_json::Value>(RequestConfig::get("/items").query("page", "2"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn put_and_delete_helpers_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("PUT", "/items/1")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":"updated"}"#)
        .create_async()
        .await;
    let _m = server
        .mock("DELETE", "/items/1")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":"deleted"}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Handlers::new());
    let updated: String = api.put("/items/1", serde_json::json!({"name": "b"})).await.unwrap();
    assert_eq!(updated, "updated");
    let deleted: String = api.delete("/items/1").await.unwrap();
    assert_eq!(deleted, "deleted");
}

#[tokio::test]
async fn custom_request_interceptor_replaces_the_default_stage() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/marked")
        .match_header("x-marker", "custom")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":null}"#)
        .create_async()
        .await;

    let handler_called = Arc::new(Mutex::new(false));
    let flag = handler_called.clone();
    let handlers = Handlers::new().on_request_header(move |config| {
        *flag.lock().unwrap() = true;
        Ok(config)
    });
    let interceptors = Interceptors::new()
        .request_on_fulfilled(|config| Ok(config.header("x-marker", "custom")));

    let api = ApiClient::builder(server.url())
        .handlers(handlers)
        .interceptors(interceptors)
        .build()
        .unwrap();

    api.get::<serde_json::Value>("/marked").await.unwrap();
    mock.assert_async().await;
    assert!(
        !*handler_called.lock().unwrap(),
        "override must fully replace the default request stage"
    );
}

#[tokio::test]
async fn custom_response_interceptor_replaces_the_code_check() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/raw")
        .with_status(200)
        .with_body(r#"{"code":40001,"message":"nope","data":null}"#)
        .create_async()
        .await;

    let (handlers, global, backend) = full_recorder();
    let interceptors = Interceptors::new().response_on_fulfilled(|ctx| Ok(ctx.body));

    let api = ApiClient::builder(server.url())
        .handlers(handlers)
        .interceptors(interceptors)
        .build()
        .unwrap();

    // The override resolves with the full envelope, code check never runs.
    let envelope: ApiResponse<serde_json::Value> = api.get("/raw").await.unwrap();
    assert_eq!(envelope.code, 40001);
    assert_eq!(envelope.message, "nope");
    assert!(envelope.data.is_null());
    assert!(global.lock().unwrap().is_empty());
    assert!(backend.lock().unwrap().is_empty());
}

#[tokio::test]
async fn custom_response_rejected_interceptor_replaces_classification() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/fail")
        .with_status(500)
        .create_async()
        .await;

    let (handlers, global) = global_recorder();
    let interceptors = Interceptors::new()
        .response_on_rejected(|_| Error::Unknown("overridden".into()));

    let api = ApiClient::builder(server.url())
        .handlers(handlers)
        .interceptors(interceptors)
        .build()
        .unwrap();

    let err = api.get::<serde_json::Value>("/fail").await.expect_err("http failure");
    assert!(matches!(err, Error::Unknown(_)));
    assert!(
        global.lock().unwrap().is_empty(),
        "override must fully replace the default rejection path"
    );
}

#[tokio::test]
async fn request_rejected_hook_observes_setup_errors() {
    let handlers =
        Handlers::new().on_request_header(|_| Err(Error::Configuration("no token".into())));
    let interceptors = Interceptors::new()
        .request_on_rejected(|err| Error::Unknown(format!("mapped: {err}")));

    let api = ApiClient::builder("http://127.0.0.1:9")
        .handlers(handlers)
        .interceptors(interceptors)
        .build()
        .unwrap();

    let err = api.get::<serde_json::Value>("/x").await.expect_err("setup failure");
    match err {
        Error::Unknown(message) => assert!(message.starts_with("mapped: ")),
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn sequential_identical_calls_are_idempotent() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/stable")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":{"n":1}}"#)
        .expect(2)
        .create_async()
        .await;
    let _m = server
        .mock("GET", "/broken")
        .with_status(200)
        .with_body(r#"{"code":40001,"message":"nope","data":null}"#)
        .expect(2)
        .create_async()
        .await;

    let (handlers, global, backend) = full_recorder();
    let api = client(&server.url(), handlers);

    let first: serde_json::Value = api.get("/stable").await.unwrap();
    let second: serde_json::Value = api.get("/stable").await.unwrap();
    assert_eq!(first, second);
    assert!(global.lock().unwrap().is_empty());

    api.get::<serde_json::Value>("/broken").await.expect_err("business");
    api.get::<serde_json::Value>("/broken").await.expect_err("business");
    assert_eq!(backend.lock().unwrap().len(), 2);
    assert!(global.lock().unwrap().is_empty());
    ok.assert_async().await;
}

#[tokio::test]
async fn non_envelope_body_rejects_with_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/plain")
        .with_status(200)
        .with_body(r#"{"unexpected":true}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Handlers::new());
    let err = api.get::<serde_json::Value>("/plain").await.expect_err("parse failure");
    assert!(matches!(err, Error::Parse(_)));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn pipeline_emits_tracing_events() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/traced")
        .with_status(200)
        .with_body(r#"{"code":10000,"message":"ok","data":null}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Handlers::new());
    api.get::<serde_json::Value>("/traced").await.unwrap();

    assert!(logs_contain("sending request"));
    assert!(logs_contain("response received"));
}
