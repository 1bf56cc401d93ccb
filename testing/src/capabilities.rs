//! Closure-backed capabilities.
//!
//! Each type wraps a closure and implements both the synchronous and the
//! asynchronous capability trait, so one definition can be registered in
//! either call family. The asynchronous implementations run the closure
//! eagerly and return a ready future.

use courier_core::{
    AsyncEventHandler, AsyncFilter, AsyncHandler, AsyncValidator, BoxError, BoxFuture, Context,
    EventHandler, ExecutionPriority, Filter, Handler, HandlerResult, ResponseError, Responses,
    Validator,
};
use futures::future::ready;

type Predicate<T> = Box<dyn Fn(&Context, &T) -> bool + Send + Sync>;

fn always<T>() -> Predicate<T> {
    Box::new(|_, _| true)
}

/// Request handler backed by a closure.
///
/// # Example
///
/// ```
/// use courier_core::{Context, ExecutionPriority, Handler, Response};
/// use courier_testing::FnHandler;
///
/// let handler = FnHandler::new(|_, n: &u32| Ok(Some(Response::success(n * 2))))
///     .named("double")
///     .with_priority(ExecutionPriority::Main);
///
/// let response = handler.handle(&Context::new(), &21).ok().flatten();
/// assert_eq!(response.and_then(Response::into_value), Some(42));
/// assert_eq!(handler.name(), "double");
/// ```
pub struct FnHandler<Req, Res> {
    name: &'static str,
    priority: ExecutionPriority,
    applicable: Predicate<Req>,
    handle: Box<dyn Fn(&Context, &Req) -> HandlerResult<Res> + Send + Sync>,
}

impl<Req, Res> FnHandler<Req, Res> {
    /// Wrap `handle`; the handler is untagged and always applicable
    #[must_use]
    pub fn new<F>(handle: F) -> Self
    where
        F: Fn(&Context, &Req) -> HandlerResult<Res> + Send + Sync + 'static,
    {
        Self {
            name: "FnHandler",
            priority: ExecutionPriority::None,
            applicable: always(),
            handle: Box::new(handle),
        }
    }

    /// Set the name reported in logs and errors
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Set the execution priority tag
    #[must_use]
    pub const fn with_priority(mut self, priority: ExecutionPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict applicability to requests matching `predicate`
    #[must_use]
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Context, &Req) -> bool + Send + Sync + 'static,
    {
        self.applicable = Box::new(predicate);
        self
    }
}

impl<Req, Res> Handler<Req, Res> for FnHandler<Req, Res> {
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        (self.applicable)(context, request)
    }

    fn execution_priority(&self) -> ExecutionPriority {
        self.priority
    }

    fn handle(&self, context: &Context, request: &Req) -> HandlerResult<Res> {
        (self.handle)(context, request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<Req, Res: Send + 'static> AsyncHandler<Req, Res> for FnHandler<Req, Res> {
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        (self.applicable)(context, request)
    }

    fn execution_priority(&self) -> ExecutionPriority {
        self.priority
    }

    fn handle<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
    ) -> BoxFuture<'a, HandlerResult<Res>> {
        Box::pin(ready((self.handle)(context, request)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Validator backed by a closure.
pub struct FnValidator<Req> {
    name: &'static str,
    priority: i32,
    applicable: Predicate<Req>,
    validate: Box<dyn Fn(&Context, &Req) -> Result<Vec<ResponseError>, BoxError> + Send + Sync>,
}

impl<Req> FnValidator<Req> {
    /// Wrap `validate`; the validator has priority 0 and is always applicable
    #[must_use]
    pub fn new<F>(validate: F) -> Self
    where
        F: Fn(&Context, &Req) -> Result<Vec<ResponseError>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: "FnValidator",
            priority: 0,
            applicable: always(),
            validate: Box::new(validate),
        }
    }

    /// Set the name reported in logs and errors
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Set the priority; higher runs first
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict applicability to requests matching `predicate`
    #[must_use]
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Context, &Req) -> bool + Send + Sync + 'static,
    {
        self.applicable = Box::new(predicate);
        self
    }
}

impl<Req> Validator<Req> for FnValidator<Req> {
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        (self.applicable)(context, request)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn validate(&self, context: &Context, request: &Req) -> Result<Vec<ResponseError>, BoxError> {
        (self.validate)(context, request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<Req> AsyncValidator<Req> for FnValidator<Req> {
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        (self.applicable)(context, request)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn validate<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
    ) -> BoxFuture<'a, Result<Vec<ResponseError>, BoxError>> {
        Box::pin(ready((self.validate)(context, request)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

type ApplyFn<Req, Res> =
    Box<dyn Fn(&Context, &Req, &mut Responses<Res>) -> Result<(), BoxError> + Send + Sync>;

/// Aggregation filter backed by a closure.
pub struct FnFilter<Req, Res> {
    name: &'static str,
    applicable: Predicate<Req>,
    apply: ApplyFn<Req, Res>,
}

impl<Req, Res> FnFilter<Req, Res> {
    /// Wrap `apply`; the filter is always applicable
    #[must_use]
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(&Context, &Req, &mut Responses<Res>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: "FnFilter",
            applicable: always(),
            apply: Box::new(apply),
        }
    }

    /// Set the name reported in logs and errors
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Restrict applicability to requests matching `predicate`
    #[must_use]
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Context, &Req) -> bool + Send + Sync + 'static,
    {
        self.applicable = Box::new(predicate);
        self
    }
}

impl<Req, Res> Filter<Req, Res> for FnFilter<Req, Res> {
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        (self.applicable)(context, request)
    }

    fn apply(
        &self,
        context: &Context,
        request: &Req,
        responses: &mut Responses<Res>,
    ) -> Result<(), BoxError> {
        (self.apply)(context, request, responses)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<Req, Res> AsyncFilter<Req, Res> for FnFilter<Req, Res> {
    fn is_applicable(&self, context: &Context, request: &Req) -> bool {
        (self.applicable)(context, request)
    }

    fn apply<'a>(
        &'a self,
        context: &'a Context,
        request: &'a Req,
        responses: &'a mut Responses<Res>,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(ready((self.apply)(context, request, responses)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Event subscriber backed by a closure.
///
/// # Example
///
/// ```
/// use courier_core::{Context, EventHandler};
/// use courier_testing::{FnSubscriber, Spy};
///
/// let spy = Spy::new();
/// let seen = spy.clone();
/// let subscriber = FnSubscriber::new(move |_, event: &&str| {
///     seen.record(*event);
///     Ok(())
/// })
/// .when(|_, event| !event.is_empty());
///
/// let context = Context::new();
/// assert!(subscriber.is_applicable(&context, &"placed"));
/// assert!(!subscriber.is_applicable(&context, &""));
/// subscriber.handle(&context, &"placed").ok();
/// assert_eq!(spy.calls(), vec!["placed"]);
/// ```
pub struct FnSubscriber<E> {
    name: &'static str,
    applicable: Predicate<E>,
    handle: Box<dyn Fn(&Context, &E) -> Result<(), BoxError> + Send + Sync>,
}

impl<E> FnSubscriber<E> {
    /// Wrap `handle`; the subscriber is always applicable
    #[must_use]
    pub fn new<F>(handle: F) -> Self
    where
        F: Fn(&Context, &E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: "FnSubscriber",
            applicable: always(),
            handle: Box::new(handle),
        }
    }

    /// Set the name reported in logs and errors
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Restrict applicability to events matching `predicate`
    #[must_use]
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Context, &E) -> bool + Send + Sync + 'static,
    {
        self.applicable = Box::new(predicate);
        self
    }
}

impl<E> EventHandler<E> for FnSubscriber<E> {
    fn is_applicable(&self, context: &Context, event: &E) -> bool {
        (self.applicable)(context, event)
    }

    fn handle(&self, context: &Context, event: &E) -> Result<(), BoxError> {
        (self.handle)(context, event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<E> AsyncEventHandler<E> for FnSubscriber<E> {
    fn is_applicable(&self, context: &Context, event: &E) -> bool {
        (self.applicable)(context, event)
    }

    fn handle<'a>(&'a self, context: &'a Context, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(ready((self.handle)(context, event)))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
