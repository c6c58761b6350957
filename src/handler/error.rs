//! Typed handler error and error translation.

use std::error::Error;

/// Error type carrying a user-chosen HTTP status code.
///
/// Returning a `HandlerError` (or any error whose source chain contains
/// one) from a wrapped function sets the response status to the embedded
/// code instead of the default 500.
#[derive(Debug)]
pub struct HandlerError {
    code: u16,
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl HandlerError {
    /// Create a new error with the given status code and message.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error wrapping an underlying cause.
    pub fn with_source(
        code: u16,
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// The HTTP status code carried by this error.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The display message carried by this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn Error + 'static))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(400, err.to_string(), err)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(500, err.to_string(), err)
    }
}

/// Map an error returned by a wrapped function to a status code and
/// message.
///
/// The error's source chain is walked front to back; the first
/// [`HandlerError`] found supplies the code and message. Any other error
/// maps to 500 with its display string.
pub fn translate(err: &(dyn Error + 'static)) -> (u16, String) {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(handler_err) = e.downcast_ref::<HandlerError>() {
            return (handler_err.code, handler_err.message.clone());
        }
        current = e.source();
    }
    (500, err.to_string())
}
