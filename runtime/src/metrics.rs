//! Metric names and descriptions for the dispatch bus.
//!
//! The bus records counters through the [`metrics`](::metrics) facade. No
//! recorder or exporter is installed here: the host application chooses one
//! and may call [`describe_metrics`] once at startup so the counters carry
//! descriptions.
//!
//! | Metric | Labels | Meaning |
//! |--------|--------|---------|
//! | `courier_dispatch_total` | `kind` | Dispatch calls, by call kind |
//! | `courier_validation_rejected_total` | | Requests rejected by a validator |
//! | `courier_handler_isolated_failures_total` | | Non-main handler errors dropped from an aggregate |
//! | `courier_subscriber_isolated_failures_total` | | Subscriber errors dropped during publish |
//! | `courier_no_handler_total` | | Single dispatches that found no applicable handler |
//! | `courier_aggregation_aborted_total` | | Aggregations aborted by a failed main response |

use metrics::describe_counter;

// Re-export metrics macros for use in other modules
pub use metrics::counter;

/// Dispatch calls, labelled by `kind`
pub const DISPATCH_TOTAL: &str = "courier_dispatch_total";

/// Requests rejected by a validator
pub const VALIDATION_REJECTED_TOTAL: &str = "courier_validation_rejected_total";

/// Non-main handler errors dropped from an aggregate
pub const HANDLER_ISOLATED_FAILURES_TOTAL: &str = "courier_handler_isolated_failures_total";

/// Subscriber errors dropped during publish
pub const SUBSCRIBER_ISOLATED_FAILURES_TOTAL: &str = "courier_subscriber_isolated_failures_total";

/// Single dispatches that found no applicable handler
pub const NO_HANDLER_TOTAL: &str = "courier_no_handler_total";

/// Aggregations aborted by a failed main response
pub const AGGREGATION_ABORTED_TOTAL: &str = "courier_aggregation_aborted_total";

/// Register descriptions for every bus metric with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Total number of dispatch calls by kind");
    describe_counter!(
        VALIDATION_REJECTED_TOTAL,
        "Total number of requests rejected by a validator"
    );
    describe_counter!(
        HANDLER_ISOLATED_FAILURES_TOTAL,
        "Total number of non-main handler errors excluded from an aggregate"
    );
    describe_counter!(
        SUBSCRIBER_ISOLATED_FAILURES_TOTAL,
        "Total number of subscriber errors dropped during publish"
    );
    describe_counter!(
        NO_HANDLER_TOTAL,
        "Total number of single dispatches without an applicable handler"
    );
    describe_counter!(
        AGGREGATION_ABORTED_TOTAL,
        "Total number of aggregations aborted by a failed main response"
    );
}

/// Call kinds used as the `kind` label of [`DISPATCH_TOTAL`]
pub mod kind {
    /// Strict single dispatch
    pub const SEND: &str = "send";
    /// Lenient single dispatch
    pub const TRY_SEND: &str = "try_send";
    /// Multi-handler aggregation
    pub const RESPONSES: &str = "responses";
    /// Event fan-out
    pub const PUBLISH: &str = "publish";
}
