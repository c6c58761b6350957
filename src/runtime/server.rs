//! Host HTTP server.
//!
//! The server is a collaborator of the handler core, not part of it: it
//! owns the sockets, buffers request bodies, maps exact paths to
//! registered [`Handler`]s, and converts between hyper's types and the
//! crate's request/response values.

use crate::handler::{Handler, HandlerError};
use crate::http::request::{Method, Request};
use crate::http::response::{Headers, Response, StatusCode};
use crate::runtime::ServerConfig;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// HTTP server routing requests to registered handlers by exact path.
pub struct Server {
    config: ServerConfig,
    routes: Arc<RwLock<HashMap<String, Handler>>>,
}

impl Server {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new server with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Register a handler for an exact path.
    pub async fn route(
        &self,
        path: impl Into<String>,
        handler: Handler,
    ) -> Result<(), HandlerError> {
        let path = path.into();
        let mut routes = self.routes.write().await;
        if routes.contains_key(&path) {
            return Err(HandlerError::internal(format!(
                "a handler is already registered for '{}'",
                path
            )));
        }
        info!("registered handler for {}", path);
        routes.insert(path, handler);
        Ok(())
    }

    /// Start the HTTP server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("jsonfn server listening on {}", addr);

        let routes = self.routes.clone();
        let config = self.config.clone();

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let routes = routes.clone();
            let config = config.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let routes = routes.clone();
                    let config = config.clone();
                    async move { handle_request(req, routes, config, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Handle one incoming HTTP request.
async fn handle_request(
    req: hyper::Request<Incoming>,
    routes: Arc<RwLock<HashMap<String, Handler>>>,
    config: ServerConfig,
    remote_addr: SocketAddr,
) -> Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    debug!("Handling request: {} {} from {}", method, path, remote_addr);

    if config.enable_health && path == "/_health" {
        return Ok(into_hyper(Response::text("OK")));
    }

    let handler = { routes.read().await.get(&path).cloned() };
    let Some(handler) = handler else {
        return Ok(into_hyper(Response::error(
            StatusCode::NOT_FOUND,
            format!("no handler registered for {}", path),
        )));
    };

    let request = match convert_request(req, &config).await {
        Ok(request) => request,
        Err(e) => {
            warn!("Failed to convert request: {}", e);
            return Ok(into_hyper(Response::error(
                StatusCode::BAD_REQUEST,
                e.to_string(),
            )));
        }
    };

    Ok(into_hyper(handler.serve(request).await))
}

/// Convert a hyper request into the crate's buffered request value.
async fn convert_request(
    req: hyper::Request<Incoming>,
    config: &ServerConfig,
) -> Result<Request, Box<dyn std::error::Error + Send + Sync>> {
    let method = Method::from(req.method());
    let url = req.uri().to_string();

    let mut headers = Headers::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.append(name.as_str(), v);
        }
    }

    let body = req.collect().await?.to_bytes();
    if body.len() > config.max_body_size {
        return Err("Request body too large".into());
    }

    Ok(Request {
        method,
        url,
        headers,
        body,
    })
}

/// Build a hyper response from the crate's response value.
fn into_hyper(response: Response) -> hyper::Response<Full<Bytes>> {
    let status = hyper::StatusCode::from_u16(response.status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            response.status
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = hyper::Response::builder().status(status);
    for (name, values) in response.headers.iter() {
        for value in values {
            builder = builder.header(name, value);
        }
    }

    builder
        .body(Full::new(response.body))
        .unwrap_or_else(|err| {
            error!("Failed to assemble response: {}", err);
            let mut fallback =
                hyper::Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}
