//! Pre-dispatch validators.
//!
//! Applicable validators run in descending [`priority`](Validator::priority)
//! order. The first one that reports errors stops the pipeline and its errors
//! become the failure response; validators with equal priority keep their
//! registration order.

use crate::context::Context;
use crate::response::ResponseError;
use crate::{BoxError, BoxFuture};

/// Synchronous request validator.
///
/// # Example
///
/// ```
/// use courier_core::{BoxError, Context, ResponseError, Validator};
///
/// struct CreateUser {
///     name: String,
/// }
///
/// struct NameRequired;
///
/// impl Validator<CreateUser> for NameRequired {
///     fn priority(&self) -> i32 {
///         10
///     }
///
///     fn validate(
///         &self,
///         _context: &Context,
///         request: &CreateUser,
///     ) -> Result<Vec<ResponseError>, BoxError> {
///         if request.name.is_empty() {
///             return Ok(vec![ResponseError::for_property("Name", "Name is required.")]);
///         }
///         Ok(Vec::new())
///     }
/// }
///
/// let errors = NameRequired
///     .validate(&Context::new(), &CreateUser { name: String::new() })
///     .unwrap_or_default();
/// assert_eq!(errors.len(), 1);
/// ```
pub trait Validator<Req>: Send + Sync {
    /// Whether this validator applies to `request` in `context`
    fn is_applicable(&self, _context: &Context, _request: &Req) -> bool {
        true
    }

    /// Ordering key; higher runs first
    fn priority(&self) -> i32 {
        0
    }

    /// Validate the request, returning an empty vector when it passes.
    ///
    /// # Errors
    ///
    /// Any error the validator's logic raises. This is distinct from
    /// reporting validation errors, which is done through the `Ok` value.
    fn validate(&self, context: &Context, request: &Req) -> Result<Vec<ResponseError>, BoxError>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Asynchronous request validator.
///
/// Asynchronous validators are awaited one at a time, in the same order and
/// with the same short-circuit rule as synchronous ones.
pub trait AsyncValidator<Req>: Send + Sync {
    /// Whether this validator applies to `request` in `context`
    fn is_applicable(&self, _context: &Context, _request: &Req) -> bool {
        true
    }

    /// Ordering key; higher runs first
    fn priority(&self) -> i32 {
        0
    }

    /// Validate the request, resolving to an empty vector when it passes
    fn validate<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
    ) -> BoxFuture<'a, Result<Vec<ResponseError>, BoxError>>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
