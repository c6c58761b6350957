//! jsonfn demo server.
//!
//! Registers a few sample handlers covering the allowed shapes and runs
//! the host server.

use jsonfn::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct Greet {
    name: String,
}

#[derive(Serialize)]
struct Greeting {
    message: String,
    request_id: String,
}

/// Payload in, payload out.
async fn hello(cx: Context, payload: Greet) -> Result<Json<Greeting>, HandlerError> {
    Ok(Json(Greeting {
        message: format!("Hello, {}!", payload.name),
        request_id: cx.request_id().to_string(),
    }))
}

/// No payload parameter; reads the raw request through the context.
async fn echo(cx: Context) -> Json<serde_json::Value> {
    let request = cx.request();
    Json(serde_json::json!({
        "method": request.method.to_string(),
        "url": request.url,
        "body": request.text().unwrap_or_default(),
    }))
}

/// Callback shape: overrides the status code and queues a cookie.
async fn created(_cx: Context) -> (Json<&'static str>, Callbacks) {
    (
        Json("created"),
        Callbacks::new().with(|parts| {
            parts.status = StatusCode::CREATED;
            parts.set_cookie(Cookie::new("session", "abc123").http_only(true));
        }),
    )
}

/// Always fails with a typed error.
async fn teapot(_cx: Context) -> Result<Json<()>, HandlerError> {
    Err(HandlerError::new(418, "I'm a teapot"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting jsonfn demo server...");

    let config = ServerConfig::new().host("0.0.0.0").port(8080);
    let server = Server::new(config);

    // Counter with shared state captured by the closure.
    let counter = Arc::new(AtomicU64::new(0));
    let count = Handler::new(move |_cx: Context| {
        let counter = counter.clone();
        async move {
            let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Json(serde_json::json!({ "count": count }))
        }
    });

    server.route("/hello", Handler::new(hello)).await?;
    server.route("/echo", Handler::new(echo)).await?;
    server.route("/created", Handler::new(created)).await?;
    server.route("/teapot", Handler::new(teapot)).await?;
    server.route("/count", count).await?;

    tracing::info!("Try: curl -X POST -d '{{\"name\": \"world\"}}' http://localhost:8080/hello");
    tracing::info!("Try: curl -X POST -d 'anything' http://localhost:8080/echo");
    tracing::info!("Try: curl http://localhost:8080/count");
    tracing::info!("Health check: curl http://localhost:8080/_health");

    server.run().await
}
