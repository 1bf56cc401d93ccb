//! # Courier Runtime
//!
//! Registry and dispatch bus for the Courier in-process dispatch core.
//!
//! ## Core Components
//!
//! - **Registry**: Capability-tagged lookup of handlers, validators, filters,
//!   subscribers and context writers, keyed by request/result/event type
//! - **Bus**: Entry point for one logical operation; builds the context once
//!   and routes every call
//! - **Pipelines**: Ordered validation before dispatch, filters after aggregation
//! - **Aggregation**: Main-gated multi-handler execution with failure isolation
//!
//! ## Call families
//!
//! | Call | Handlers run | No applicable handler |
//! |------|--------------|-----------------------|
//! | [`Bus::send`] | first applicable | [`BusError::NoHandler`] |
//! | [`Bus::try_send`] | first applicable | failed [`Response`](courier_core::Response) |
//! | [`Bus::responses`] | all applicable, by execution priority | empty [`Responses`](courier_core::Responses) |
//! | [`Bus::publish`] | all applicable subscribers | nothing happens |
//!
//! Each call has an `_async` counterpart that uses the asynchronous
//! capability traits.
//!
//! ## Example
//!
//! ```
//! use courier_core::{Context, Handler, HandlerResult, Response};
//! use courier_runtime::{Bus, Registry};
//! use std::sync::Arc;
//!
//! struct Ping;
//!
//! impl Handler<String, String> for Ping {
//!     fn handle(&self, _context: &Context, request: &String) -> HandlerResult<String> {
//!         Ok(Response::success(format!("pong: {request}")).into())
//!     }
//! }
//!
//! let registry = Arc::new(Registry::new().with_handler(Ping));
//! let bus = Bus::new(registry);
//!
//! let response = bus.send::<String, String>(&"hi".to_string())?;
//! assert_eq!(response.value().map(String::as_str), Some("pong: hi"));
//! # Ok::<(), courier_runtime::BusError>(())
//! ```

/// Main-gated multi-handler execution
mod aggregate;

/// Bus entry point: send, responses, publish
pub mod bus;

/// Runtime configuration
pub mod config;

/// Metric names and descriptions
pub mod metrics;

/// Validation and filter pipelines
mod pipeline;

/// Capability-tagged registry
pub mod registry;

pub use bus::Bus;
pub use config::{BusConfig, MainExecution};
pub use error::BusError;
pub use registry::Registry;

/// Error types for the bus
pub mod error {
    use courier_core::BoxError;
    use thiserror::Error;

    /// Fatal conditions surfaced by a dispatch.
    ///
    /// Recoverable outcomes (validation failures, a failed main response,
    /// isolated handler errors) are reported through the returned response
    /// instead.
    #[derive(Error, Debug)]
    pub enum BusError {
        /// Strict single dispatch found no applicable handler
        ///
        /// `contract` is the type name of the expected handler trait object.
        #[error("No handler available for {contract}")]
        NoHandler {
            /// Handler contract that had no applicable implementation
            contract: &'static str,
        },

        /// A handler whose failure is not isolated returned an error
        ///
        /// Raised by the single-dispatch handler and by the `Main` handler of
        /// an aggregation.
        #[error("Handler {handler} failed: {source}")]
        Handler {
            /// Name of the failing handler
            handler: &'static str,
            /// Error returned by the handler
            source: BoxError,
        },

        /// A validator returned an error instead of a verdict
        #[error("Validator {validator} failed: {source}")]
        Validator {
            /// Name of the failing validator
            validator: &'static str,
            /// Error returned by the validator
            source: BoxError,
        },

        /// A filter returned an error while mutating the aggregation result
        #[error("Filter {filter} failed: {source}")]
        Filter {
            /// Name of the failing filter
            filter: &'static str,
            /// Error returned by the filter
            source: BoxError,
        },

        /// An event subscriber returned an error and isolation is disabled
        #[error("Event subscriber {subscriber} failed: {source}")]
        Subscriber {
            /// Name of the failing subscriber
            subscriber: &'static str,
            /// Error returned by the subscriber
            source: BoxError,
        },
    }

    impl BusError {
        /// Whether this is the no-handler condition
        #[must_use]
        pub const fn is_no_handler(&self) -> bool {
            matches!(self, Self::NoHandler { .. })
        }

        /// Name of the capability that failed, if any
        #[must_use]
        pub const fn failed_capability(&self) -> Option<&'static str> {
            match self {
                Self::NoHandler { .. } => None,
                Self::Handler { handler: name, .. }
                | Self::Validator { validator: name, .. }
                | Self::Filter { filter: name, .. }
                | Self::Subscriber {
                    subscriber: name, ..
                } => Some(*name),
            }
        }
    }
}
