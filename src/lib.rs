//! # jsonfn - plain functions as JSON request handlers
//!
//! jsonfn turns an arbitrary async function with a constrained signature
//! into an HTTP request handler: the request body is decoded as JSON into
//! the function's declared payload type, the function is invoked, and its
//! result (or error) is serialized as a pretty-printed JSON response.
//!
//! ## Handler shapes
//!
//! A handler function takes a [`Context`] and optionally one payload
//! parameter (any `DeserializeOwned` type), and returns one of:
//!
//! ```text
//! ()                              nothing; bare 200
//! Json<T>                         payload
//! Callbacks                       response mutators
//! (Json<T>, Callbacks)            payload + response mutators
//! Result<R, E>                    any of the above, or an error
//! ```
//!
//! The shape is validated when [`Handler::new`] runs, before a single
//! request is served; a function that does not fit panics at registration
//! rather than misbehaving later.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use jsonfn::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct Greet {
//!     name: String,
//! }
//!
//! #[derive(Serialize)]
//! struct Greeting {
//!     message: String,
//! }
//!
//! async fn greet(_cx: Context, payload: Greet) -> Result<Json<Greeting>, HandlerError> {
//!     Ok(Json(Greeting {
//!         message: format!("hello {}", payload.name),
//!     }))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::with_defaults();
//!     server.route("/greet", Handler::new(greet)).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Error semantics
//!
//! - A body that fails to decode yields `400` with
//!   `{"error": "Bad request: <cause>"}`.
//! - An error returned by the function yields its [`HandlerError`] status
//!   code (found directly or through the error's source chain), or `500`
//!   with the error's display string otherwise. The body is always
//!   `{"error": "<message>"}`.
//! - A successful payload that fails to encode yields a fixed plain-text
//!   `500`.

pub mod handler;
pub mod http;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::handler::{
        Callbacks, Context, Handler, HandlerError, HandlerFn, Json, Signature, SignatureError,
    };
    pub use crate::http::{
        Cookie, Headers, Method, Request, Response, ResponseFunc, ResponseParts, StatusCode,
    };
    pub use crate::runtime::{Server, ServerConfig};
}

// Re-export for convenience
pub use handler::{Callbacks, Context, Handler, HandlerError, Json};
pub use http::{Request, Response};
pub use runtime::{Server, ServerConfig};
