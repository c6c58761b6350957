//! Handler construction and per-request dispatch.

pub mod dispatch;
pub mod error;
pub mod reply;
pub mod signature;

pub use dispatch::{Context, Handler, HandlerFn, CONTENT_TYPE_JSON};
pub use error::{translate, HandlerError};
pub use reply::{Callbacks, Json, Reply, ReturnValue};
pub use signature::{Descriptor, ParamKind, ReturnRole, Signature, SignatureError};
