//! HTTP request/response value types.

pub mod request;
pub mod response;

pub use request::{Method, Request};
pub use response::{Cookie, Headers, Response, ResponseFunc, ResponseParts, StatusCode};
