//! Construction-time signature validation.
//!
//! A [`Signature`] is the plain-data description of a wrapped function's
//! parameter and return shape. The typed adapter layer derives one from
//! the static shape of the registered function; [`Signature::validate`]
//! either produces the immutable [`Descriptor`] consumed by the
//! dispatcher or rejects the shape with the violated rule.

use std::error::Error;
use std::fmt;

/// Kind of one input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The per-request execution context. Must come first.
    Context,
    /// The decoded request payload. At most one.
    Payload,
}

/// Role of one return position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnRole {
    /// The success value to serialize. Must be first.
    Payload,
    /// An ordered list of response-mutating callbacks.
    Callbacks,
    /// A failure indicator. Must be last.
    Error,
}

impl fmt::Display for ReturnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnRole::Payload => write!(f, "payload"),
            ReturnRole::Callbacks => write!(f, "callbacks"),
            ReturnRole::Error => write!(f, "error"),
        }
    }
}

/// Parameter and return shape of a candidate handler function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Input parameters in declaration order.
    pub params: Vec<ParamKind>,
    /// Return positions in declaration order.
    pub returns: Vec<ReturnRole>,
}

impl Signature {
    pub fn new(params: Vec<ParamKind>, returns: Vec<ReturnRole>) -> Self {
        Self { params, returns }
    }

    /// Validate the shape and extract role positions.
    ///
    /// Rules, in order: the first parameter must be a context; at most one
    /// payload parameter; at most three return positions; each role
    /// claimed by at most one position; an error among two or more
    /// returns must be last; a payload return must be first.
    pub fn validate(&self) -> Result<Descriptor, SignatureError> {
        match self.params.first() {
            Some(ParamKind::Context) => {}
            _ => return Err(SignatureError::MissingContext),
        }
        let extra = self.params.len() - 1;
        if extra > 1 {
            return Err(SignatureError::TooManyParams(extra));
        }

        if self.returns.len() > 3 {
            return Err(SignatureError::TooManyReturns(self.returns.len()));
        }

        let mut descriptor = Descriptor {
            takes_payload: extra == 1,
            payload_out: None,
            callbacks_out: None,
            error_out: None,
        };
        for (pos, role) in self.returns.iter().enumerate() {
            let slot = match role {
                ReturnRole::Payload => &mut descriptor.payload_out,
                ReturnRole::Callbacks => &mut descriptor.callbacks_out,
                ReturnRole::Error => &mut descriptor.error_out,
            };
            if slot.is_some() {
                return Err(SignatureError::DuplicateRole(*role));
            }
            *slot = Some(pos);
        }

        if let Some(pos) = descriptor.error_out {
            if self.returns.len() > 1 && pos != self.returns.len() - 1 {
                return Err(SignatureError::ErrorNotLast);
            }
        }
        if let Some(pos) = descriptor.payload_out {
            if pos != 0 {
                return Err(SignatureError::PayloadNotFirst);
            }
        }

        Ok(descriptor)
    }
}

/// A violated signature rule. Construction-time only; a handler that
/// fails validation never reaches request-serving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    MissingContext,
    TooManyParams(usize),
    TooManyReturns(usize),
    DuplicateRole(ReturnRole),
    ErrorNotLast,
    PayloadNotFirst,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::MissingContext => {
                write!(f, "handler must take a Context as its first argument")
            }
            SignatureError::TooManyParams(n) => {
                write!(f, "handler takes at most one payload argument, found {}", n)
            }
            SignatureError::TooManyReturns(n) => {
                write!(f, "too many return values: {}", n)
            }
            SignatureError::DuplicateRole(role) => {
                write!(f, "duplicate {} return value", role)
            }
            SignatureError::ErrorNotLast => {
                write!(f, "error must be the last return value")
            }
            SignatureError::PayloadNotFirst => {
                write!(f, "the payload must be the first return value")
            }
        }
    }
}

impl Error for SignatureError {}

/// Immutable metadata describing how to invoke a wrapped function and
/// interpret its return positions. Built once per handler, shared
/// read-only across all requests served by that handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    takes_payload: bool,
    payload_out: Option<usize>,
    callbacks_out: Option<usize>,
    error_out: Option<usize>,
}

impl Descriptor {
    /// Whether the function declares a payload parameter.
    pub fn takes_payload(&self) -> bool {
        self.takes_payload
    }

    /// Output position of the payload-role return, if declared.
    pub fn payload_out(&self) -> Option<usize> {
        self.payload_out
    }

    /// Output position of the callback-role return, if declared.
    pub fn callbacks_out(&self) -> Option<usize> {
        self.callbacks_out
    }

    /// Output position of the error-role return, if declared.
    pub fn error_out(&self) -> Option<usize> {
        self.error_out
    }
}
