//! Post-aggregation filters.
//!
//! Filters run in registration order once every handler of an aggregation
//! has finished. Each one sees the result as left by the previous filter and
//! may append or replace entries; filters never re-trigger validation or
//! handler execution.

use crate::context::Context;
use crate::response::Responses;
use crate::{BoxError, BoxFuture};

/// Synchronous aggregation filter.
///
/// # Example
///
/// ```
/// use courier_core::{BoxError, Context, Filter, Response, Responses};
///
/// struct AuditTrail;
///
/// impl Filter<String, u32> for AuditTrail {
///     fn apply(
///         &self,
///         _context: &Context,
///         _request: &String,
///         responses: &mut Responses<u32>,
///     ) -> Result<(), BoxError> {
///         let total = u32::try_from(responses.len())?;
///         responses.push(Response::success(total));
///         Ok(())
///     }
/// }
/// ```
pub trait Filter<Req, Res>: Send + Sync {
    /// Whether this filter applies to `request` in `context`
    fn is_applicable(&self, _context: &Context, _request: &Req) -> bool {
        true
    }

    /// Mutate the aggregation result in place.
    ///
    /// # Errors
    ///
    /// Any error the filter's logic raises; it propagates to the caller.
    fn apply(
        &self,
        context: &Context,
        request: &Req,
        responses: &mut Responses<Res>,
    ) -> Result<(), BoxError>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Asynchronous aggregation filter.
pub trait AsyncFilter<Req, Res>: Send + Sync {
    /// Whether this filter applies to `request` in `context`
    fn is_applicable(&self, _context: &Context, _request: &Req) -> bool {
        true
    }

    /// Mutate the aggregation result in place
    fn apply<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
        responses: &'a mut Responses<Res>,
    ) -> BoxFuture<'a, Result<(), BoxError>>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
