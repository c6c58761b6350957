//! Per-request dispatch tests: decoding, invocation, callbacks, error
//! translation, and wire format.

use jsonfn::handler::CONTENT_TYPE_JSON;
use jsonfn::prelude::*;
use serde::{Deserialize, Serialize};

fn post(body: &str) -> Request {
    Request::new(Method::Post, "/").body(body.to_string())
}

#[tokio::test]
async fn test_hello_world() {
    let handler = Handler::new(
        |_cx: Context, name: String| async move { Json(format!("hello {}", name)) },
    );

    let response = handler.serve(post(r#""world""#)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text_body(), Some(r#""hello world""#.to_string()));
    assert_eq!(response.headers.get("content-type"), Some(CONTENT_TYPE_JSON));
}

#[tokio::test]
async fn test_struct_payload_round_trip() {
    #[derive(Deserialize)]
    struct Payload {
        name: String,
        age: u32,
    }

    #[derive(Serialize)]
    struct Reply {
        greeting: String,
        age: u32,
    }

    let handler = Handler::new(|_cx: Context, payload: Payload| async move {
        Ok::<_, HandlerError>(Json(Reply {
            greeting: payload.name,
            age: payload.age,
        }))
    });

    let response = handler
        .serve(post(r#"{"name": "Marcus", "age": 32}"#))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["greeting"], "Marcus");
    assert_eq!(body["age"], 32);
}

#[tokio::test]
async fn test_callback_overrides_status() {
    let handler = Handler::new(|_cx: Context| async {
        (
            Json("ok"),
            Callbacks::new().with(|parts| {
                parts.status = StatusCode::CREATED;
            }),
        )
    });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.text_body(), Some(r#""ok""#.to_string()));
}

#[tokio::test]
async fn test_typed_error_sets_status_and_body() {
    let handler = Handler::new(|_cx: Context| async {
        Err::<Json<()>, HandlerError>(HandlerError::new(502, "Bad gateway"))
    });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["error"], "Bad gateway");
    assert_eq!(response.headers.get("content-type"), Some(CONTENT_TYPE_JSON));
}

/// An error that only carries a `HandlerError` in its source chain.
#[derive(Debug)]
struct Wrapper(HandlerError);

impl std::fmt::Display for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wrapped: {}", self.0)
    }
}

impl std::error::Error for Wrapper {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[tokio::test]
async fn test_typed_error_found_through_source_chain() {
    let handler = Handler::new(|_cx: Context| async {
        Err::<Json<()>, Wrapper>(Wrapper(HandlerError::not_found("missing")))
    });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["error"], "missing");
}

#[derive(Debug)]
struct PlainError;

impl std::fmt::Display for PlainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for PlainError {}

#[tokio::test]
async fn test_untyped_error_defaults_to_500() {
    let handler =
        Handler::new(|_cx: Context| async { Err::<Json<()>, PlainError>(PlainError) });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    assert_eq!(body["error"], "boom");
}

#[tokio::test]
async fn test_decode_failure_yields_400() {
    let handler =
        Handler::new(|_cx: Context, name: String| async move { Json(name) });

    let response = handler.serve(post("this is not json")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json_body().unwrap().unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Bad request:"), "got: {}", message);
}

#[tokio::test]
async fn test_no_returns_yields_bare_200() {
    let handler = Handler::new(|_cx: Context| async {});

    let response = handler.serve(post("ignored")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
    assert_eq!(response.headers.get("content-type"), None);
}

#[tokio::test]
async fn test_declared_error_success_encodes_null() {
    let handler = Handler::new(|_cx: Context| async { Ok::<(), HandlerError>(()) });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text_body(), Some("null".to_string()));
    assert_eq!(response.headers.get("content-type"), Some(CONTENT_TYPE_JSON));
}

#[tokio::test]
async fn test_callbacks_only_shape_short_circuits_to_200() {
    // Neither payload nor error role declared: the dispatcher answers
    // with a bare 200 and never applies the callbacks.
    let handler = Handler::new(|_cx: Context| async {
        Callbacks::new().with(|parts| {
            parts.status = StatusCode::CREATED;
        })
    });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_callback_queues_cookies() {
    let handler = Handler::new(|_cx: Context| async {
        (
            Json("ok"),
            Callbacks::new().with(|parts| {
                parts.set_cookie(Cookie::new("session", "abc123").http_only(true));
                parts.set_cookie(Cookie::new("theme", "dark"));
            }),
        )
    });

    let response = handler.serve(post("")).await;

    let cookies = response.headers.get_all("set-cookie");
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies[0], "session=abc123; HttpOnly");
    assert_eq!(cookies[1], "theme=dark");
}

#[tokio::test]
async fn test_content_type_cannot_be_overridden_by_callback() {
    let handler = Handler::new(|_cx: Context| async {
        (
            Json("ok"),
            Callbacks::new().with(|parts| {
                parts.headers_mut().set("content-type", "text/evil");
            }),
        )
    });

    let response = handler.serve(post("")).await;

    assert_eq!(response.headers.get("content-type"), Some(CONTENT_TYPE_JSON));
}

struct Broken;

impl Serialize for Broken {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot encode"))
    }
}

#[tokio::test]
async fn test_encode_failure_yields_fixed_500() {
    let handler =
        Handler::new(|_cx: Context| async { Ok::<_, HandlerError>(Json(Broken)) });

    let response = handler.serve(post("")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text_body(),
        Some("Internal error: Encoding response failed".to_string())
    );
    assert_eq!(
        response.headers.get("content-type"),
        Some("text/plain; charset=utf-8")
    );
}

#[tokio::test]
async fn test_dispatch_is_idempotent() {
    #[derive(Serialize)]
    struct Reply {
        doubled: u32,
    }

    let handler = Handler::new(|_cx: Context, n: u32| async move {
        Ok::<_, HandlerError>(Json(Reply { doubled: n * 2 }))
    });

    let first = handler.serve(post("21")).await;
    let second = handler.serve(post("21")).await;

    assert_eq!(first, second);
    assert_eq!(first.status, StatusCode::OK);
}

#[tokio::test]
async fn test_pretty_printed_wire_format() {
    #[derive(Serialize)]
    struct Reply {
        a: u32,
        b: String,
    }

    let handler = Handler::new(|_cx: Context| async {
        Json(Reply {
            a: 1,
            b: "x".to_string(),
        })
    });

    let response = handler.serve(post("")).await;

    assert_eq!(
        response.text_body(),
        Some("{\n  \"a\": 1,\n  \"b\": \"x\"\n}".to_string())
    );
}

#[tokio::test]
async fn test_wire_format_round_trips() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        name: String,
        owners: Vec<String>,
        age: u32,
    }

    let original = Payload {
        name: "Solfrid".to_string(),
        owners: vec!["Marcus".to_string(), "Hanna".to_string()],
        age: 4,
    };

    let encoded = serde_json::to_string_pretty(&original).unwrap();
    let decoded: Payload = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, original);
}

#[tokio::test]
async fn test_raw_request_available_even_with_payload() {
    // The body is buffered, so the context's raw request stays readable
    // after the payload has been decoded from it.
    let handler = Handler::new(|cx: Context, name: String| async move {
        assert_eq!(cx.request().text(), Some(r#""world""#.to_string()));
        assert_eq!(cx.request().method, Method::Post);
        Json(name)
    });

    let response = handler.serve(post(r#""world""#)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_raw_request_available_without_payload() {
    let handler = Handler::new(|cx: Context| async move {
        Json(cx.request().text().unwrap_or_default())
    });

    let response = handler.serve(post("raw bytes")).await;
    assert_eq!(response.text_body(), Some(r#""raw bytes""#.to_string()));
}
