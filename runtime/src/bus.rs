//! The dispatch bus.
//!
//! A [`Bus`] serves one logical operation (a request scope, a job, a test).
//! It owns the [`Context`] for that scope, built on the first dispatch by the
//! registry's context writers and reused by every later call on the same bus.
//!
//! # Dispatch flow
//!
//! ```text
//! caller ──► context (built once) ──► validators ──► handler(s) ──► filters ──► caller
//!                                         │                         (aggregation only)
//!                                         └── first rejection: failure response
//! ```
//!
//! # Failure policy
//!
//! | Source | Single dispatch | Aggregation | Publish |
//! |--------|-----------------|-------------|---------|
//! | Validator rejects | failure response | failure as `main` | n/a |
//! | No applicable handler | [`BusError::NoHandler`] (`send`) / failure (`try_send`) | empty result | no-op |
//! | Handler returns `Err` | propagates | `Main`: propagates, others: logged and dropped | propagates unless isolated by config |
//!
//! # Concurrency
//!
//! Asynchronous calls run handlers of one batch concurrently on the calling
//! task; nothing is spawned and nothing is cancelled. Every handler of a batch
//! shares the same context without extra locking, so handlers writing the same
//! key race with each other.

use crate::aggregate::{Aggregation, ExecutionPlan};
use crate::config::{BusConfig, MainExecution};
use crate::error::BusError;
use crate::metrics::{self, kind};
use crate::pipeline;
use crate::registry::Registry;
use courier_core::{
    AsyncEventHandler, AsyncHandler, BoxError, Context, EventHandler, Handler, Response, Responses,
    Unit,
};
use futures::future::{OptionFuture, join_all};
use smallvec::SmallVec;
use std::any::type_name;
use std::sync::{Arc, OnceLock};

/// Whether a missing handler is fatal for single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    Strict,
    Lenient,
}

impl Strictness {
    const fn kind(self) -> &'static str {
        match self {
            Self::Strict => kind::SEND,
            Self::Lenient => kind::TRY_SEND,
        }
    }
}

/// Entry point for dispatching requests and publishing events within one scope.
///
/// # Example
///
/// ```
/// use courier_core::{Context, ContextWriter, ExecutionPriority, Handler, HandlerResult, Response};
/// use courier_runtime::{Bus, Registry};
/// use std::sync::Arc;
///
/// struct Tenant;
///
/// impl ContextWriter for Tenant {
///     fn write(&self, context: &Context) {
///         context.set("tenant", "acme".to_string());
///     }
/// }
///
/// struct Quote;
///
/// impl Handler<u32, String> for Quote {
///     fn execution_priority(&self) -> ExecutionPriority {
///         ExecutionPriority::Main
///     }
///
///     fn handle(&self, context: &Context, amount: &u32) -> HandlerResult<String> {
///         let tenant = context.get_or_default::<String>("tenant");
///         Ok(Response::success(format!("{tenant}: {amount}")).into())
///     }
/// }
///
/// let registry = Arc::new(Registry::new().with_context_writer(Tenant).with_handler(Quote));
/// let bus = Bus::new(registry);
///
/// let responses = bus.responses::<u32, String>(&12)?;
/// assert_eq!(responses.main.and_then(Response::into_value).as_deref(), Some("acme: 12"));
/// # Ok::<(), courier_runtime::BusError>(())
/// ```
pub struct Bus {
    registry: Arc<Registry>,
    config: BusConfig,
    context: OnceLock<Context>,
}

impl Bus {
    /// Create a bus over `registry` with the default configuration
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, BusConfig::default())
    }

    /// Create a bus over `registry` with `config`
    #[must_use]
    pub const fn with_config(registry: Arc<Registry>, config: BusConfig) -> Self {
        Self {
            registry,
            config,
            context: OnceLock::new(),
        }
    }

    /// The registry this bus resolves capabilities from
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The configuration of this bus
    #[must_use]
    pub const fn config(&self) -> &BusConfig {
        &self.config
    }

    /// The context of this bus, building it on first access.
    ///
    /// Every context writer runs exactly once, in registration order, the
    /// first time the context is needed.
    pub fn context(&self) -> &Context {
        self.context.get_or_init(|| {
            let context = Context::new();
            let writers = self.registry.context_writers();
            for writer in writers {
                writer.write(&context);
            }
            tracing::debug!(writers = writers.len(), keys = context.len(), "Context built");
            context
        })
    }

    // ------------------------------------------------------------------
    // Single dispatch
    // ------------------------------------------------------------------

    /// Dispatch `request` to the first applicable handler.
    ///
    /// A validation failure is returned as a failed response without
    /// resolving any handler. A handler that produces no response yields a
    /// generic failure.
    ///
    /// # Errors
    ///
    /// - [`BusError::NoHandler`] if no handler for `(Req, Res)` is applicable
    /// - [`BusError::Handler`] if the handler returns an error
    /// - [`BusError::Validator`] if a validator returns an error
    #[tracing::instrument(skip_all, name = "bus_send", fields(request = type_name::<Req>()))]
    pub fn send<Req: 'static, Res: 'static>(&self, request: &Req) -> Result<Response<Res>, BusError> {
        self.dispatch(request, Strictness::Strict)
    }

    /// Dispatch `request` to the first applicable handler, reporting a
    /// missing handler as a failed response.
    ///
    /// # Errors
    ///
    /// - [`BusError::Handler`] if the handler returns an error
    /// - [`BusError::Validator`] if a validator returns an error
    #[tracing::instrument(skip_all, name = "bus_try_send", fields(request = type_name::<Req>()))]
    pub fn try_send<Req: 'static, Res: 'static>(
        &self,
        request: &Req,
    ) -> Result<Response<Res>, BusError> {
        self.dispatch(request, Strictness::Lenient)
    }

    fn dispatch<Req: 'static, Res: 'static>(
        &self,
        request: &Req,
        strictness: Strictness,
    ) -> Result<Response<Res>, BusError> {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => strictness.kind()).increment(1);
        let context = self.context();

        if let Some(errors) =
            pipeline::first_rejection(context, self.registry.validators::<Req>(), request)?
        {
            return Ok(Response::failure(errors));
        }

        let Some(handler) = self
            .registry
            .handlers::<Req, Res>()
            .iter()
            .find(|handler| handler.is_applicable(context, request))
        else {
            return no_handler::<dyn Handler<Req, Res>, Res>(strictness);
        };

        tracing::trace!(handler = handler.name(), "Resolved handler");
        let response = handler
            .handle(context, request)
            .map_err(|source| BusError::Handler {
                handler: handler.name(),
                source,
            })?;
        Ok(response.unwrap_or_else(Response::failed))
    }

    /// Asynchronous [`send`](Self::send).
    ///
    /// Validators are awaited one at a time, then the first applicable
    /// asynchronous handler is awaited.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    #[tracing::instrument(skip_all, name = "bus_send_async", fields(request = type_name::<Req>()))]
    pub async fn send_async<Req, Res>(&self, request: &Req) -> Result<Response<Res>, BusError>
    where
        Req: Send + Sync + 'static,
        Res: Send + 'static,
    {
        self.dispatch_async(request, Strictness::Strict).await
    }

    /// Asynchronous [`try_send`](Self::try_send).
    ///
    /// # Errors
    ///
    /// Same as [`try_send`](Self::try_send).
    #[tracing::instrument(skip_all, name = "bus_try_send_async", fields(request = type_name::<Req>()))]
    pub async fn try_send_async<Req, Res>(&self, request: &Req) -> Result<Response<Res>, BusError>
    where
        Req: Send + Sync + 'static,
        Res: Send + 'static,
    {
        self.dispatch_async(request, Strictness::Lenient).await
    }

    async fn dispatch_async<Req, Res>(
        &self,
        request: &Req,
        strictness: Strictness,
    ) -> Result<Response<Res>, BusError>
    where
        Req: Send + Sync + 'static,
        Res: Send + 'static,
    {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => strictness.kind()).increment(1);
        let context = self.context();

        if let Some(errors) =
            pipeline::first_rejection_async(context, self.registry.async_validators::<Req>(), request)
                .await?
        {
            return Ok(Response::failure(errors));
        }

        let Some(handler) = self
            .registry
            .async_handlers::<Req, Res>()
            .iter()
            .find(|handler| handler.is_applicable(context, request))
        else {
            return no_handler::<dyn AsyncHandler<Req, Res>, Res>(strictness);
        };

        tracing::trace!(handler = handler.name(), "Resolved handler");
        let response = handler
            .handle(context, request)
            .await
            .map_err(|source| BusError::Handler {
                handler: handler.name(),
                source,
            })?;
        Ok(response.unwrap_or_else(Response::failed))
    }

    // ------------------------------------------------------------------
    // Aggregation
    // ------------------------------------------------------------------

    /// Run every applicable handler for `request` and aggregate their responses.
    ///
    /// The `Main` handler runs first and alone; a failed main response aborts
    /// the aggregation with only that failure. `Independent` handlers then run
    /// in registration order, followed by untagged ones. Errors from non-main
    /// handlers are logged and their contribution is dropped. Filters run last.
    ///
    /// # Errors
    ///
    /// - [`BusError::Handler`] if the `Main` handler returns an error
    /// - [`BusError::Validator`] if a validator returns an error
    /// - [`BusError::Filter`] if a filter returns an error
    #[tracing::instrument(skip_all, name = "bus_responses", fields(request = type_name::<Req>()))]
    pub fn responses<Req: 'static, Res: 'static>(
        &self,
        request: &Req,
    ) -> Result<Responses<Res>, BusError> {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => kind::RESPONSES).increment(1);
        let context = self.context();

        if let Some(errors) =
            pipeline::first_rejection(context, self.registry.validators::<Req>(), request)?
        {
            return self.aborted(context, request, Responses::from_main(Response::failure(errors)));
        }

        self.aggregate(context, request)
    }

    /// Aggregate every handler registered for `(Unit, Res)`.
    ///
    /// This is the request-less form of [`responses`](Self::responses); it
    /// skips validation.
    ///
    /// # Errors
    ///
    /// - [`BusError::Handler`] if the `Main` handler returns an error
    /// - [`BusError::Filter`] if a filter returns an error
    #[tracing::instrument(skip_all, name = "bus_all_responses", fields(result = type_name::<Res>()))]
    pub fn all_responses<Res: 'static>(&self) -> Result<Responses<Res>, BusError> {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => kind::RESPONSES).increment(1);
        self.aggregate(self.context(), &Unit)
    }

    fn aggregate<Req: 'static, Res: 'static>(
        &self,
        context: &Context,
        request: &Req,
    ) -> Result<Responses<Res>, BusError> {
        let plan = ExecutionPlan::partition(
            self.registry
                .handlers::<Req, Res>()
                .iter()
                .map(|handler| &**handler)
                .filter(|handler| handler.is_applicable(context, request)),
            |handler| handler.execution_priority(),
            |handler| handler.name(),
        );
        tracing::debug!(handlers = plan.len(), "Aggregating responses");

        let mut aggregation = Aggregation::new();

        if let Some(main) = plan.main {
            let response = main
                .handle(context, request)
                .map_err(|source| BusError::Handler {
                    handler: main.name(),
                    source,
                })?;
            if aggregation.admit_main(response).is_break() {
                return self.aborted(context, request, aggregation.finish());
            }
        }

        for handler in plan.independent.iter().chain(plan.unprioritized.iter()) {
            aggregation.absorb(handler.name(), handler.handle(context, request));
        }

        let mut responses = aggregation.finish();
        pipeline::apply_filters(context, self.registry.filters::<Req, Res>(), request, &mut responses)?;
        Ok(responses)
    }

    fn aborted<Req: 'static, Res: 'static>(
        &self,
        context: &Context,
        request: &Req,
        mut responses: Responses<Res>,
    ) -> Result<Responses<Res>, BusError> {
        if self.config.run_filters_on_abort {
            pipeline::apply_filters(context, self.registry.filters::<Req, Res>(), request, &mut responses)?;
        }
        Ok(responses)
    }

    /// Asynchronous [`responses`](Self::responses).
    ///
    /// `Main` and `Independent` handlers form the first batch and untagged
    /// handlers the second; handlers within a batch run concurrently. With
    /// [`MainExecution::Concurrent`] (the default) `Main` is launched in the
    /// first batch, so `Independent` handlers may run even when the main
    /// response later aborts the aggregation; their results are then
    /// discarded. With [`MainExecution::Exclusive`] `Main` runs alone first,
    /// as in the synchronous model. The main response is always checked
    /// before the second batch starts.
    ///
    /// # Errors
    ///
    /// Same as [`responses`](Self::responses).
    #[tracing::instrument(skip_all, name = "bus_responses_async", fields(request = type_name::<Req>()))]
    pub async fn responses_async<Req, Res>(&self, request: &Req) -> Result<Responses<Res>, BusError>
    where
        Req: Send + Sync + 'static,
        Res: Send + 'static,
    {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => kind::RESPONSES).increment(1);
        let context = self.context();

        if let Some(errors) =
            pipeline::first_rejection_async(context, self.registry.async_validators::<Req>(), request)
                .await?
        {
            let responses = Responses::from_main(Response::failure(errors));
            return self.aborted_async(context, request, responses).await;
        }

        self.aggregate_async(context, request).await
    }

    /// Asynchronous [`all_responses`](Self::all_responses).
    ///
    /// # Errors
    ///
    /// Same as [`all_responses`](Self::all_responses).
    #[tracing::instrument(skip_all, name = "bus_all_responses_async", fields(result = type_name::<Res>()))]
    pub async fn all_responses_async<Res>(&self) -> Result<Responses<Res>, BusError>
    where
        Res: Send + 'static,
    {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => kind::RESPONSES).increment(1);
        self.aggregate_async(self.context(), &Unit).await
    }

    async fn aggregate_async<Req, Res>(
        &self,
        context: &Context,
        request: &Req,
    ) -> Result<Responses<Res>, BusError>
    where
        Req: Send + Sync + 'static,
        Res: Send + 'static,
    {
        let plan = ExecutionPlan::partition(
            self.registry
                .async_handlers::<Req, Res>()
                .iter()
                .map(|handler| &**handler)
                .filter(|handler| handler.is_applicable(context, request)),
            |handler| handler.execution_priority(),
            |handler| handler.name(),
        );
        tracing::debug!(handlers = plan.len(), "Aggregating responses");

        let mut aggregation = Aggregation::new();
        let independent = || join_all(plan.independent.iter().map(|h| h.handle(context, request)));

        let (main_result, first_batch) = match (plan.main, self.config.main_execution) {
            (Some(main), MainExecution::Exclusive) => {
                let main_result = main.handle(context, request).await;
                let gate_open = main_result
                    .as_ref()
                    .is_ok_and(|response| response.as_ref().is_none_or(Response::is_succeed));
                let batch = if gate_open { independent().await } else { Vec::new() };
                (Some(main_result), batch)
            },
            (main, _) => {
                let main_future = OptionFuture::from(main.map(|h| h.handle(context, request)));
                futures::join!(main_future, independent())
            },
        };

        if let (Some(main), Some(result)) = (plan.main, main_result) {
            let response = result.map_err(|source| BusError::Handler {
                handler: main.name(),
                source,
            })?;
            if aggregation.admit_main(response).is_break() {
                return self.aborted_async(context, request, aggregation.finish()).await;
            }
        }

        for (handler, result) in plan.independent.iter().zip(first_batch) {
            aggregation.absorb(handler.name(), result);
        }

        let second_batch =
            join_all(plan.unprioritized.iter().map(|h| h.handle(context, request))).await;
        for (handler, result) in plan.unprioritized.iter().zip(second_batch) {
            aggregation.absorb(handler.name(), result);
        }

        let mut responses = aggregation.finish();
        pipeline::apply_filters_async(
            context,
            self.registry.async_filters::<Req, Res>(),
            request,
            &mut responses,
        )
        .await?;
        Ok(responses)
    }

    async fn aborted_async<Req, Res>(
        &self,
        context: &Context,
        request: &Req,
        mut responses: Responses<Res>,
    ) -> Result<Responses<Res>, BusError>
    where
        Req: Send + Sync + 'static,
        Res: Send + 'static,
    {
        if self.config.run_filters_on_abort {
            pipeline::apply_filters_async(
                context,
                self.registry.async_filters::<Req, Res>(),
                request,
                &mut responses,
            )
            .await?;
        }
        Ok(responses)
    }

    // ------------------------------------------------------------------
    // Event fan-out
    // ------------------------------------------------------------------

    /// Invoke every applicable subscriber of `E`, in registration order.
    ///
    /// # Errors
    ///
    /// [`BusError::Subscriber`] for the first subscriber that returns an
    /// error; later subscribers do not run. With
    /// [`BusConfig::isolate_subscriber_errors`] errors are logged instead and
    /// every subscriber runs.
    #[tracing::instrument(skip_all, name = "bus_publish", fields(event = type_name::<E>()))]
    pub fn publish<E: 'static>(&self, event: &E) -> Result<(), BusError> {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => kind::PUBLISH).increment(1);
        let context = self.context();

        let subscribers: SmallVec<[&dyn EventHandler<E>; 4]> = self
            .registry
            .event_handlers::<E>()
            .iter()
            .map(|subscriber| &**subscriber)
            .filter(|subscriber| subscriber.is_applicable(context, event))
            .collect();
        tracing::debug!(subscribers = subscribers.len(), "Publishing event");

        for subscriber in subscribers {
            if let Err(source) = subscriber.handle(context, event) {
                self.subscriber_failed(subscriber.name(), source)?;
            }
        }
        Ok(())
    }

    /// Asynchronous [`publish`](Self::publish).
    ///
    /// Every applicable subscriber is launched concurrently and the whole
    /// batch is awaited before any error is reported, so a failing subscriber
    /// never cancels the others.
    ///
    /// # Errors
    ///
    /// [`BusError::Subscriber`] for the first failing subscriber in
    /// registration order, unless subscriber errors are isolated.
    #[tracing::instrument(skip_all, name = "bus_publish_async", fields(event = type_name::<E>()))]
    pub async fn publish_async<E>(&self, event: &E) -> Result<(), BusError>
    where
        E: Send + Sync + 'static,
    {
        metrics::counter!(metrics::DISPATCH_TOTAL, "kind" => kind::PUBLISH).increment(1);
        let context = self.context();

        let subscribers: SmallVec<[&dyn AsyncEventHandler<E>; 4]> = self
            .registry
            .async_event_handlers::<E>()
            .iter()
            .map(|subscriber| &**subscriber)
            .filter(|subscriber| subscriber.is_applicable(context, event))
            .collect();
        tracing::debug!(subscribers = subscribers.len(), "Publishing event");

        let results = join_all(subscribers.iter().map(|s| s.handle(context, event))).await;
        for (subscriber, result) in subscribers.iter().zip(results) {
            if let Err(source) = result {
                self.subscriber_failed(subscriber.name(), source)?;
            }
        }
        Ok(())
    }

    fn subscriber_failed(&self, subscriber: &'static str, source: BoxError) -> Result<(), BusError> {
        if !self.config.isolate_subscriber_errors {
            return Err(BusError::Subscriber { subscriber, source });
        }
        metrics::counter!(metrics::SUBSCRIBER_ISOLATED_FAILURES_TOTAL).increment(1);
        tracing::warn!(subscriber, error = %source, "Subscriber failed; continuing publish");
        Ok(())
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("context", &self.context.get())
            .finish()
    }
}

fn no_handler<C: ?Sized, Res>(strictness: Strictness) -> Result<Response<Res>, BusError> {
    metrics::counter!(metrics::NO_HANDLER_TOTAL).increment(1);
    let contract = type_name::<C>();
    match strictness {
        Strictness::Strict => Err(BusError::NoHandler { contract }),
        Strictness::Lenient => {
            tracing::debug!(contract, "No applicable handler; returning failure");
            Ok(Response::failed())
        },
    }
}
