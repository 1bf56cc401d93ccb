//! Adapter from the synchronous capability traits to the asynchronous ones.
//!
//! Wrapping a synchronous handler, validator, filter or subscriber in
//! [`Immediate`] lets it take part in the asynchronous call family. The
//! wrapped call runs when the returned future is first polled and completes
//! without yielding.
//!
//! ```
//! use courier_core::{AsyncHandler, Context, Handler, HandlerResult, Immediate, Response};
//!
//! struct Double;
//!
//! impl Handler<u32, u32> for Double {
//!     fn handle(&self, _context: &Context, request: &u32) -> HandlerResult<u32> {
//!         Ok(Response::success(request * 2).into())
//!     }
//! }
//!
//! let handler = Immediate(Double);
//! let context = Context::new();
//! let result = futures::executor::block_on(AsyncHandler::handle(&handler, &context, &21));
//! assert_eq!(result.ok().flatten().and_then(Response::into_value), Some(42));
//! ```

use crate::context::Context;
use crate::event::{AsyncEventHandler, EventHandler};
use crate::filter::{AsyncFilter, Filter};
use crate::handler::{AsyncHandler, ExecutionPriority, Handler, HandlerResult};
use crate::response::{ResponseError, Responses};
use crate::validator::{AsyncValidator, Validator};
use crate::{BoxError, BoxFuture};

/// Runs a synchronous capability inside the asynchronous call family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate<T>(pub T);

impl<T> Immediate<T> {
    /// Unwrap the adapted capability
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<Req, Res, H> AsyncHandler<Req, Res> for Immediate<H>
where
    H: Handler<Req, Res>,
    Req: Sync,
    Res: Send + 'static,
{
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        self.0.is_applicable(context, request)
    }

    fn execution_priority(&self) -> ExecutionPriority {
        self.0.execution_priority()
    }

    fn handle<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
    ) -> BoxFuture<'a, HandlerResult<Res>> {
        Box::pin(async move { self.0.handle(context, request) })
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl<Req, V> AsyncValidator<Req> for Immediate<V>
where
    V: Validator<Req>,
    Req: Sync,
{
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        self.0.is_applicable(context, request)
    }

    fn priority(&self) -> i32 {
        self.0.priority()
    }

    fn validate<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
    ) -> BoxFuture<'a, Result<Vec<ResponseError>, BoxError>> {
        Box::pin(async move { self.0.validate(context, request) })
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl<Req, Res, F> AsyncFilter<Req, Res> for Immediate<F>
where
    F: Filter<Req, Res>,
    Req: Sync,
    Res: Send + 'static,
{
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        self.0.is_applicable(context, request)
    }

    fn apply<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
        responses: &'a mut Responses<Res>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async move { self.0.apply(context, request, responses) })
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl<E, H> AsyncEventHandler<E> for Immediate<H>
where
    H: EventHandler<E>,
    E: Sync,
{
    fn is_applicable(&self, context: &Context, event: &E) -> bool {
        self.0.is_applicable(context, event)
    }

    fn handle<'a>(&'a self, context: &'a Context, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async move { self.0.handle(context, event) })
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }
}
