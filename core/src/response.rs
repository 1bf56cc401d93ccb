//! Result model: success/failure envelopes and the aggregation result.
//!
//! - [`ResponseError`]: one structured error (code, message, property name)
//! - [`Response`]: success/failure envelope, optionally carrying a value
//! - [`Unit`]: value type for responses that carry nothing meaningful
//! - [`HttpError`]: failure factory mapping to standard HTTP status semantics
//! - [`Responses`]: the `{main, other}` pair produced by aggregation
//!
//! # Invariants
//!
//! A successful response never carries errors, and a response without an
//! explicit status code reports 200 on success and 400 on failure. The fields
//! are private so the constructors are the only way to build a response, and
//! deserialization rejects a successful response that carries errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code reported by a successful response without an explicit code
pub const DEFAULT_SUCCESS_STATUS: u16 = 200;

/// Status code reported by a failed response without an explicit code
pub const DEFAULT_FAILURE_STATUS: u16 = 400;

/// Marker value for responses that carry no meaningful value.
///
/// Lets value-less and value-bearing dispatch share one generic
/// implementation: `Response` is `Response<Unit>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit;

/// A single structured error attached to a failed [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseError {
    /// Machine-readable error code
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Name of the request property the error refers to
    pub property_name: Option<String>,
}

impl ResponseError {
    /// Create an error with only a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            property_name: None,
        }
    }

    /// Create an error attached to a request property
    #[must_use]
    pub fn for_property(property_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(message).with_property(property_name)
    }

    /// Set the machine-readable code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the property name
    #[must_use]
    pub fn with_property(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = Some(property_name.into());
        self
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "[{code}] ")?;
        }
        if let Some(property) = &self.property_name {
            write!(f, "{property}: ")?;
        }
        f.write_str(&self.message)
    }
}

/// Success/failure envelope returned by handlers and by the bus.
///
/// # Example
///
/// ```
/// use courier_core::{Response, ResponseError};
///
/// let ok = Response::success(42);
/// assert!(ok.is_succeed());
/// assert_eq!(ok.status_code(), 200);
///
/// let failed: Response<i32> = Response::failure(vec![
///     ResponseError::for_property("Name", "Name is required."),
/// ]);
/// assert!(!failed.is_succeed());
/// assert_eq!(failed.status_code(), 400);
/// assert_eq!(failed.value(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ResponseRepr<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Response<T = Unit> {
    is_succeed: bool,
    status_code: Option<u16>,
    status_reason: Option<String>,
    errors: Vec<ResponseError>,
    value: Option<T>,
}

/// Wire shape of a [`Response`], checked before it becomes one
#[derive(Deserialize)]
struct ResponseRepr<T> {
    is_succeed: bool,
    status_code: Option<u16>,
    status_reason: Option<String>,
    #[serde(default)]
    errors: Vec<ResponseError>,
    value: Option<T>,
}

/// Rejection of a serialized response that breaks the envelope invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("successful response carries {0} error(s)")]
pub struct InvalidResponse(usize);

impl<T> TryFrom<ResponseRepr<T>> for Response<T> {
    type Error = InvalidResponse;

    fn try_from(repr: ResponseRepr<T>) -> Result<Self, Self::Error> {
        if repr.is_succeed && !repr.errors.is_empty() {
            return Err(InvalidResponse(repr.errors.len()));
        }
        Ok(Self {
            is_succeed: repr.is_succeed,
            status_code: repr.status_code,
            status_reason: repr.status_reason,
            errors: repr.errors,
            value: repr.value,
        })
    }
}

impl Response<Unit> {
    /// Successful response carrying no value
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            is_succeed: true,
            status_code: None,
            status_reason: None,
            errors: Vec::new(),
            value: Some(Unit),
        }
    }
}

impl<T> Response<T> {
    /// Successful response carrying `value`
    #[must_use]
    pub const fn success(value: T) -> Self {
        Self {
            is_succeed: true,
            status_code: None,
            status_reason: None,
            errors: Vec::new(),
            value: Some(value),
        }
    }

    /// Failed response carrying `errors` and the default failure status
    #[must_use]
    pub const fn failure(errors: Vec<ResponseError>) -> Self {
        Self {
            is_succeed: false,
            status_code: None,
            status_reason: None,
            errors,
            value: None,
        }
    }

    /// Failed response with no errors and the default failure status
    #[must_use]
    pub const fn failed() -> Self {
        Self::failure(Vec::new())
    }

    /// Failed response carrying a single error with `message`
    #[must_use]
    pub fn failure_message(message: impl Into<String>) -> Self {
        Self::failure(vec![ResponseError::new(message)])
    }

    /// Set an explicit status code
    #[must_use]
    pub const fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Set the status reason phrase
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = Some(reason.into());
        self
    }

    /// Whether the response represents success
    #[must_use]
    pub const fn is_succeed(&self) -> bool {
        self.is_succeed
    }

    /// Effective status code: the explicit one, or 200/400 by outcome
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.status_code {
            Some(code) => code,
            None if self.is_succeed => DEFAULT_SUCCESS_STATUS,
            None => DEFAULT_FAILURE_STATUS,
        }
    }

    /// Status reason phrase, if one was set
    #[must_use]
    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    /// Errors attached to a failed response, in order
    #[must_use]
    pub fn errors(&self) -> &[ResponseError] {
        &self.errors
    }

    /// Borrow the carried value, if any
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Take the carried value, if any
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Transform the carried value, keeping outcome, status and errors
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            is_succeed: self.is_succeed,
            status_code: self.status_code,
            status_reason: self.status_reason,
            errors: self.errors,
            value: self.value.map(f),
        }
    }

    /// Drop the carried value, keeping outcome, status and errors
    #[must_use]
    pub fn without_value(self) -> Response<Unit> {
        self.map(|_| Unit)
    }
}

/// Failure factory mapping to standard HTTP status semantics.
///
/// Every constructor yields a failed [`Response`] whose status code and
/// reason phrase match the named status, carrying one error with `message`.
///
/// # Example
///
/// ```
/// use courier_core::{HttpError, Response};
///
/// let missing: Response<String> = HttpError::not_found("Order 42 does not exist");
/// assert_eq!(missing.status_code(), 404);
/// assert_eq!(missing.status_reason(), Some("Not Found"));
/// assert_eq!(missing.errors()[0].message, "Order 42 does not exist");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HttpError;

impl HttpError {
    /// 400 Bad Request
    #[must_use]
    pub fn bad_request<T>(message: impl Into<String>) -> Response<T> {
        Self::status(400, message)
    }

    /// 401 Unauthorized
    #[must_use]
    pub fn unauthorized<T>(message: impl Into<String>) -> Response<T> {
        Self::status(401, message)
    }

    /// 403 Forbidden
    #[must_use]
    pub fn forbidden<T>(message: impl Into<String>) -> Response<T> {
        Self::status(403, message)
    }

    /// 404 Not Found
    #[must_use]
    pub fn not_found<T>(message: impl Into<String>) -> Response<T> {
        Self::status(404, message)
    }

    /// 409 Conflict
    #[must_use]
    pub fn conflict<T>(message: impl Into<String>) -> Response<T> {
        Self::status(409, message)
    }

    /// 422 Unprocessable Entity
    #[must_use]
    pub fn unprocessable<T>(message: impl Into<String>) -> Response<T> {
        Self::status(422, message)
    }

    /// 500 Internal Server Error
    #[must_use]
    pub fn internal<T>(message: impl Into<String>) -> Response<T> {
        Self::status(500, message)
    }

    /// Failure with an arbitrary status code.
    ///
    /// The reason phrase is set when the code is one of the well-known ones.
    #[must_use]
    pub fn status<T>(status_code: u16, message: impl Into<String>) -> Response<T> {
        let response = Response::failure_message(message).with_status(status_code);
        match canonical_reason(status_code) {
            Some(reason) => response.with_reason(reason),
            None => response,
        }
    }
}

/// Canonical reason phrase for the status codes the factory knows about
#[must_use]
pub const fn canonical_reason(status_code: u16) -> Option<&'static str> {
    match status_code {
        200 => Some("OK"),
        201 => Some("Created"),
        202 => Some("Accepted"),
        204 => Some("No Content"),
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        409 => Some("Conflict"),
        422 => Some("Unprocessable Entity"),
        429 => Some("Too Many Requests"),
        500 => Some("Internal Server Error"),
        502 => Some("Bad Gateway"),
        503 => Some("Service Unavailable"),
        _ => None,
    }
}

/// Aggregation result: the designated main response plus every other response.
///
/// Filters receive this by mutable reference and may append or replace
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responses<T = Unit> {
    /// Response of the handler tagged `Main`, or the validation failure
    pub main: Option<Response<T>>,
    /// Responses of every other handler, in execution-bucket order
    pub other: Vec<Response<T>>,
}

impl<T> Default for Responses<T> {
    fn default() -> Self {
        Self {
            main: None,
            other: Vec::new(),
        }
    }
}

impl<T> Responses<T> {
    /// Empty aggregation result
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregation result holding only `main`
    #[must_use]
    pub const fn from_main(main: Response<T>) -> Self {
        Self {
            main: Some(main),
            other: Vec::new(),
        }
    }

    /// Append a response to `other`
    pub fn push(&mut self, response: Response<T>) {
        self.other.push(response);
    }

    /// Total number of responses, main included
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.main.is_some()) + self.other.len()
    }

    /// Whether neither main nor other holds a response
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.other.is_empty()
    }

    /// Iterate over every response, main first
    pub fn iter(&self) -> impl Iterator<Item = &Response<T>> {
        self.main.iter().chain(self.other.iter())
    }

    /// Whether every response succeeded (vacuously true when empty)
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.iter().all(Response::is_succeed)
    }

    /// Whether a main response is present and failed
    #[must_use]
    pub fn main_failed(&self) -> bool {
        self.main.as_ref().is_some_and(|main| !main.is_succeed())
    }
}
