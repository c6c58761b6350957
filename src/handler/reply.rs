//! Role tagging for handler return values.
//!
//! Instead of inferring roles from return shapes, each position is tagged
//! explicitly: [`Json`] marks the payload, [`Callbacks`] the response
//! mutators, and the `Err` arm of a `Result` the error. The closed set of
//! [`Reply`] implementations below is the complete list of allowed return
//! shapes; everything else fails to satisfy the trait bound at the
//! registration call site.

use crate::handler::signature::ReturnRole;
use crate::http::response::{ResponseFunc, ResponseParts};
use serde::Serialize;
use serde_json::Value;

/// Payload-role wrapper: the success value serialized into the response
/// body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// Callback-role wrapper: an ordered list of response mutators applied
/// after the payload is encoded and before the status is committed.
#[derive(Default)]
pub struct Callbacks(Vec<ResponseFunc>);

impl Callbacks {
    /// Create an empty callback list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback, builder style.
    pub fn with(mut self, f: impl FnOnce(&mut ResponseParts) + Send + 'static) -> Self {
        self.0.push(Box::new(f));
        self
    }

    /// Append a callback.
    pub fn push(&mut self, f: impl FnOnce(&mut ResponseParts) + Send + 'static) {
        self.0.push(Box::new(f));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ResponseFunc>> for Callbacks {
    fn from(funcs: Vec<ResponseFunc>) -> Self {
        Self(funcs)
    }
}

/// One positional return value produced by an invocation, tagged with its
/// role. The dispatcher picks values out by the positions recorded in the
/// handler descriptor.
pub enum ReturnValue {
    /// Encoded payload, or the capture of an encode failure.
    Payload(Result<Value, serde_json::Error>),
    /// Response mutators, applied in order.
    Callbacks(Vec<ResponseFunc>),
    /// `None` means the error position was declared but the invocation
    /// succeeded.
    Error(Option<Box<dyn std::error::Error + Send + Sync>>),
}

/// A value a wrapped function is allowed to return.
pub trait Reply: Send + 'static {
    /// Role of each return position, in declaration order.
    fn roles() -> Vec<ReturnRole>;

    /// Split into positional return values. The result has the same
    /// length and order as [`Reply::roles`].
    fn into_values(self) -> Vec<ReturnValue>;
}

impl Reply for () {
    fn roles() -> Vec<ReturnRole> {
        Vec::new()
    }

    fn into_values(self) -> Vec<ReturnValue> {
        Vec::new()
    }
}

impl<T> Reply for Json<T>
where
    T: Serialize + Send + 'static,
{
    fn roles() -> Vec<ReturnRole> {
        vec![ReturnRole::Payload]
    }

    fn into_values(self) -> Vec<ReturnValue> {
        vec![ReturnValue::Payload(serde_json::to_value(self.0))]
    }
}

impl Reply for Callbacks {
    fn roles() -> Vec<ReturnRole> {
        vec![ReturnRole::Callbacks]
    }

    fn into_values(self) -> Vec<ReturnValue> {
        vec![ReturnValue::Callbacks(self.0)]
    }
}

impl<T> Reply for (Json<T>, Callbacks)
where
    T: Serialize + Send + 'static,
{
    fn roles() -> Vec<ReturnRole> {
        vec![ReturnRole::Payload, ReturnRole::Callbacks]
    }

    fn into_values(self) -> Vec<ReturnValue> {
        let (json, callbacks) = self;
        vec![
            ReturnValue::Payload(serde_json::to_value(json.0)),
            ReturnValue::Callbacks(callbacks.0),
        ]
    }
}

impl<R, E> Reply for Result<R, E>
where
    R: Reply,
    E: std::error::Error + Send + Sync + 'static,
{
    fn roles() -> Vec<ReturnRole> {
        let mut roles = R::roles();
        roles.push(ReturnRole::Error);
        roles
    }

    fn into_values(self) -> Vec<ReturnValue> {
        match self {
            Ok(value) => {
                let mut values = value.into_values();
                values.push(ReturnValue::Error(None));
                values
            }
            Err(err) => {
                // Positions before the error still exist on the failure
                // path; the dispatcher ignores them once it sees the error.
                let mut values: Vec<ReturnValue> =
                    R::roles().into_iter().map(placeholder).collect();
                values.push(ReturnValue::Error(Some(Box::new(err))));
                values
            }
        }
    }
}

fn placeholder(role: ReturnRole) -> ReturnValue {
    match role {
        ReturnRole::Payload => ReturnValue::Payload(Ok(Value::Null)),
        ReturnRole::Callbacks => ReturnValue::Callbacks(Vec::new()),
        ReturnRole::Error => ReturnValue::Error(None),
    }
}
