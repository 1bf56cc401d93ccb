//! Request handlers and execution-priority tags.
//!
//! A handler is registered against a `(request, result)` type pair. Several
//! handlers may be registered for the same pair; single dispatch picks the
//! first applicable one, aggregation runs all applicable ones according to
//! their [`ExecutionPriority`].

use crate::context::Context;
use crate::response::Response;
use crate::{BoxError, BoxFuture};
use serde::{Deserialize, Serialize};

/// Outcome of one handler invocation.
///
/// - `Ok(Some(response))`: the handler produced a response
/// - `Ok(None)`: the handler produced nothing; aggregation excludes it
/// - `Err(error)`: the handler failed; the runtime either propagates or isolates it
pub type HandlerResult<Res> = Result<Option<Response<Res>>, BoxError>;

/// Role of a handler within multi-handler aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionPriority {
    /// Runs after the main gate; failures are isolated
    #[default]
    None,

    /// Runs in the first batch alongside the main handler; failures are isolated
    Independent,

    /// Gates the aggregation: a failed main response aborts it, an error propagates
    Main,
}

impl ExecutionPriority {
    /// Whether this is the `Main` tag
    #[must_use]
    pub const fn is_main(self) -> bool {
        matches!(self, Self::Main)
    }
}

/// Synchronous request handler.
///
/// # Example
///
/// ```
/// use courier_core::{Context, ExecutionPriority, Handler, HandlerResult, Response};
///
/// struct ReserveStock;
///
/// impl Handler<u32, bool> for ReserveStock {
///     fn is_applicable(&self, _context: &Context, quantity: &u32) -> bool {
///         *quantity > 0
///     }
///
///     fn execution_priority(&self) -> ExecutionPriority {
///         ExecutionPriority::Main
///     }
///
///     fn handle(&self, _context: &Context, quantity: &u32) -> HandlerResult<bool> {
///         Ok(Response::success(*quantity <= 10).into())
///     }
/// }
/// ```
pub trait Handler<Req, Res>: Send + Sync {
    /// Whether this handler applies to `request` in `context`
    fn is_applicable(&self, _context: &Context, _request: &Req) -> bool {
        true
    }

    /// Role of this handler within aggregation (ignored by single dispatch)
    fn execution_priority(&self) -> ExecutionPriority {
        ExecutionPriority::None
    }

    /// Handle the request.
    ///
    /// # Errors
    ///
    /// Any error the handler's logic raises.
    fn handle(&self, context: &Context, request: &Req) -> HandlerResult<Res>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Asynchronous request handler.
///
/// Mirrors [`Handler`] with an asynchronous `handle`. Applicability stays
/// synchronous: it is evaluated before any task is launched.
pub trait AsyncHandler<Req, Res>: Send + Sync {
    /// Whether this handler applies to `request` in `context`
    fn is_applicable(&self, _context: &Context, _request: &Req) -> bool {
        true
    }

    /// Role of this handler within aggregation (ignored by single dispatch)
    fn execution_priority(&self) -> ExecutionPriority {
        ExecutionPriority::None
    }

    /// Handle the request.
    ///
    /// The returned future resolves to `Err` for any error the handler's
    /// logic raises.
    fn handle<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
    ) -> BoxFuture<'a, HandlerResult<Res>>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
