//! Typed handler adapters and the per-request dispatcher.
//!
//! [`HandlerFn`] is the closed set of adapter variants, one blanket impl
//! per allowed parameter shape; the marker type parameter lets the
//! compiler pick the variant once at registration. [`Handler::new`] runs
//! the signature validator before the handler can serve anything;
//! [`Handler::serve`] is the per-request dispatcher.

use crate::handler::error::{translate, HandlerError};
use crate::handler::reply::{Reply, ReturnValue};
use crate::handler::signature::{Descriptor, ParamKind, Signature};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseParts, StatusCode};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Content type set on every JSON response, after callbacks run.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

const ENCODE_FAILURE_MESSAGE: &str = "Internal error: Encoding response failed";

/// Per-request execution context handed to wrapped functions.
///
/// Carries a generated request id and the raw inbound request. The body
/// is buffered, so the raw request is always consumable, whether or not
/// the handler also declared a payload parameter.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: String,
    request: Arc<Request>,
}

impl Context {
    /// Create a context for one request, generating a fresh request id.
    pub fn new(request: Request) -> Self {
        Self {
            request_id: generate_request_id(),
            request: Arc::new(request),
        }
    }

    /// The raw inbound request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Request id for tracing.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// Generate a unique request ID.
fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}", nanos)
}

/// A function with one of the allowed handler shapes.
///
/// Implemented for `Fn(Context) -> Fut` and `Fn(Context, P) -> Fut` where
/// `P: DeserializeOwned` and `Fut::Output` is a [`Reply`]. The `Args`
/// marker carries the inferred types so the two blanket impls stay
/// coherent; it never appears in user code.
#[async_trait]
pub trait HandlerFn<Args>: Send + Sync + 'static {
    /// The parameter/return shape fed to the signature validator.
    fn signature(&self) -> Signature;

    /// Decode the payload (if declared) and invoke the function. `Err`
    /// is a body-decode failure.
    async fn invoke(&self, cx: Context, body: Bytes) -> Result<Vec<ReturnValue>, serde_json::Error>;
}

#[async_trait]
impl<F, Fut, R> HandlerFn<(Fut, R)> for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply,
{
    fn signature(&self) -> Signature {
        Signature::new(vec![ParamKind::Context], R::roles())
    }

    async fn invoke(&self, cx: Context, _body: Bytes) -> Result<Vec<ReturnValue>, serde_json::Error> {
        Ok((self)(cx).await.into_values())
    }
}

#[async_trait]
impl<F, Fut, R, P> HandlerFn<(Fut, R, P)> for F
where
    F: Fn(Context, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply,
    P: DeserializeOwned + Send + 'static,
{
    fn signature(&self) -> Signature {
        Signature::new(vec![ParamKind::Context, ParamKind::Payload], R::roles())
    }

    async fn invoke(&self, cx: Context, body: Bytes) -> Result<Vec<ReturnValue>, serde_json::Error> {
        let payload: P = serde_json::from_slice(&body)?;
        Ok((self)(cx, payload).await.into_values())
    }
}

/// Object-safe view of a [`HandlerFn`], erasing the marker types.
#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn invoke(&self, cx: Context, body: Bytes) -> Result<Vec<ReturnValue>, serde_json::Error>;
}

struct Erased<F, Args> {
    f: F,
    _args: PhantomData<fn(Args)>,
}

#[async_trait]
impl<F, Args> ErasedHandler for Erased<F, Args>
where
    F: HandlerFn<Args>,
    Args: 'static,
{
    async fn invoke(&self, cx: Context, body: Bytes) -> Result<Vec<ReturnValue>, serde_json::Error> {
        self.f.invoke(cx, body).await
    }
}

/// A request handler built from a wrapped function.
///
/// Cheap to clone; the wrapped function and its descriptor are shared
/// read-only across all concurrent requests.
///
/// The allowed shapes are `Fn(Context) -> Fut` and
/// `Fn(Context, P) -> Fut` with `P: DeserializeOwned`, where the future
/// resolves to one of:
///
/// - `()`
/// - `Json<T>`
/// - `Callbacks`
/// - `(Json<T>, Callbacks)`
/// - `Result<R, E>` for any of the above `R` and `E: Error + Send + Sync`
#[derive(Clone)]
pub struct Handler {
    inner: Arc<dyn ErasedHandler>,
    descriptor: Descriptor,
}

impl Handler {
    /// Wrap a function, validating its signature.
    ///
    /// # Panics
    ///
    /// Panics if the signature violates a validation rule. An invalid
    /// handler is unrecoverable misconfiguration and must never reach
    /// request-serving state, so registration aborts instead of
    /// returning an error.
    pub fn new<F, Args>(f: F) -> Self
    where
        F: HandlerFn<Args>,
        Args: 'static,
    {
        let descriptor = match f.signature().validate() {
            Ok(descriptor) => descriptor,
            Err(err) => panic!("invalid handler signature: {}", err),
        };
        Self {
            inner: Arc::new(Erased {
                f,
                _args: PhantomData,
            }),
            descriptor,
        }
    }

    /// The descriptor extracted at construction.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Serve one request, producing exactly one response.
    ///
    /// Decode failures yield 400, errors returned by the function are
    /// translated via their status code (500 by default), and encode
    /// failures of a successful payload yield a fixed 500. No failure
    /// path escapes as an `Err` or panic.
    pub async fn serve(&self, request: Request) -> Response {
        let body = request.body.clone();
        let cx = Context::new(request);
        debug!(request_id = %cx.request_id(), "dispatching request");

        let values = match self.inner.invoke(cx, body).await {
            Ok(values) => values,
            Err(err) => {
                warn!("request body failed to decode: {}", err);
                return error_response(&HandlerError::new(400, format!("Bad request: {}", err)));
            }
        };

        let descriptor = &self.descriptor;
        if descriptor.payload_out().is_none() && descriptor.error_out().is_none() {
            // Nothing usable to encode; callbacks, if any, are not applied.
            return Response::new(StatusCode::OK);
        }

        let mut payload = None;
        let mut callbacks = Vec::new();
        let mut failure = None;
        for (pos, value) in values.into_iter().enumerate() {
            match value {
                ReturnValue::Payload(p) if descriptor.payload_out() == Some(pos) => {
                    payload = Some(p);
                }
                ReturnValue::Callbacks(c) if descriptor.callbacks_out() == Some(pos) => {
                    callbacks = c;
                }
                ReturnValue::Error(e) if descriptor.error_out() == Some(pos) => {
                    failure = e;
                }
                _ => {}
            }
        }

        if let Some(err) = failure {
            debug!("handler returned error: {}", err);
            let err: &(dyn std::error::Error + 'static) = err.as_ref();
            return error_response(err);
        }

        // A declared-but-absent payload role encodes as JSON null.
        let value = match payload.unwrap_or(Ok(Value::Null)) {
            Ok(value) => value,
            Err(err) => {
                error!("encoding response payload failed: {}", err);
                return Response::error(StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILURE_MESSAGE);
            }
        };
        let encoded = match serde_json::to_string_pretty(&value) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!("encoding response payload failed: {}", err);
                return Response::error(StatusCode::INTERNAL_SERVER_ERROR, ENCODE_FAILURE_MESSAGE);
            }
        };

        let mut parts = ResponseParts::new();
        for callback in callbacks {
            callback(&mut parts);
        }
        // The content type is fixed; it is set after the callbacks so
        // they cannot override it.
        parts.headers_mut().set("content-type", CONTENT_TYPE_JSON);

        let ResponseParts {
            status,
            mut headers,
            cookies,
        } = parts;
        for cookie in cookies {
            headers.append("set-cookie", cookie.header_value());
        }

        Response {
            status,
            headers,
            body: Bytes::from(encoded),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Write the `{"error": <message>}` document for any failure path.
fn error_response(err: &(dyn std::error::Error + 'static)) -> Response {
    let (code, message) = translate(err);
    let body = serde_json::to_string_pretty(&ErrorBody { error: message })
        .unwrap_or_else(|_| String::from("{\n  \"error\": \"internal error\"\n}"));
    Response::new(code)
        .header("content-type", CONTENT_TYPE_JSON)
        .body(body)
}
