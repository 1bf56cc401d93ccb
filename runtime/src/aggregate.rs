//! Main-gated multi-handler execution.
//!
//! Aggregation is a small state machine shared by both call families:
//!
//! ```text
//! collect applicable ──► partition by tag ──► main gate ──► Independent ──► None ──► filters
//!                                               │
//!                                               └── failed main response: abort, main only
//! ```
//!
//! The bus drives it with a sequential loop (sync) or concurrent joins
//! (async). [`ExecutionPlan`] holds the partition and [`Aggregation`]
//! accumulates results and applies the gate and isolation rules, so the two
//! strategies only differ in how they invoke handlers.

use crate::metrics;
use courier_core::{ExecutionPriority, HandlerResult, Response, Responses};
use smallvec::SmallVec;
use std::ops::ControlFlow;

/// Applicable handlers of one aggregation, partitioned by execution priority.
///
/// Registration order is preserved within each bucket.
pub(crate) struct ExecutionPlan<'a, H: ?Sized> {
    pub(crate) main: Option<&'a H>,
    pub(crate) independent: SmallVec<[&'a H; 4]>,
    pub(crate) unprioritized: SmallVec<[&'a H; 4]>,
}

impl<'a, H: ?Sized> ExecutionPlan<'a, H> {
    /// Partition `handlers` by the tag `priority` reports.
    ///
    /// Only the first `Main` handler gates the aggregation; any later one is
    /// demoted to `Independent`.
    pub(crate) fn partition<I, P, N>(handlers: I, priority: P, name: N) -> Self
    where
        I: IntoIterator<Item = &'a H>,
        P: Fn(&H) -> ExecutionPriority,
        N: Fn(&H) -> &'static str,
    {
        let mut plan = Self {
            main: None,
            independent: SmallVec::new(),
            unprioritized: SmallVec::new(),
        };

        for handler in handlers {
            match priority(handler) {
                ExecutionPriority::Main if plan.main.is_none() => plan.main = Some(handler),
                ExecutionPriority::Main => {
                    tracing::warn!(
                        handler = name(handler),
                        "More than one Main handler is applicable; treating it as Independent"
                    );
                    plan.independent.push(handler);
                },
                ExecutionPriority::Independent => plan.independent.push(handler),
                ExecutionPriority::None => plan.unprioritized.push(handler),
            }
        }

        plan
    }

    /// Number of handlers in the plan
    pub(crate) fn len(&self) -> usize {
        usize::from(self.main.is_some()) + self.independent.len() + self.unprioritized.len()
    }
}

/// Accumulates the responses of one aggregation.
pub(crate) struct Aggregation<T> {
    responses: Responses<T>,
}

impl<T> Aggregation<T> {
    pub(crate) fn new() -> Self {
        Self {
            responses: Responses::new(),
        }
    }

    /// Record the `Main` handler's response.
    ///
    /// A failed response breaks: the aggregation must stop with main only.
    pub(crate) fn admit_main(&mut self, response: Option<Response<T>>) -> ControlFlow<()> {
        let failed = response.as_ref().is_some_and(|main| !main.is_succeed());
        self.responses.main = response;

        if failed {
            metrics::counter!(metrics::AGGREGATION_ABORTED_TOTAL).increment(1);
            tracing::debug!("Main handler failed; aborting aggregation");
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Record the outcome of a non-main handler.
    ///
    /// Errors are logged and dropped; an empty result is skipped.
    pub(crate) fn absorb(&mut self, handler: &'static str, result: HandlerResult<T>) {
        match result {
            Ok(Some(response)) => self.responses.push(response),
            Ok(None) => tracing::trace!(handler, "Handler produced no response"),
            Err(error) => {
                metrics::counter!(metrics::HANDLER_ISOLATED_FAILURES_TOTAL).increment(1);
                tracing::warn!(
                    handler,
                    error = %error,
                    "Handler failed; its response is excluded from the aggregate"
                );
            },
        }
    }

    pub(crate) fn finish(self) -> Responses<T> {
        self.responses
    }
}
