//! Runtime configuration for [`Bus`](crate::Bus).
//!
//! Configuration is plain data: build it with the `with_*` methods or bind it
//! from any serde source (missing fields take their defaults).
//!
//! # Example
//!
//! ```
//! use courier_runtime::{BusConfig, MainExecution};
//!
//! let config = BusConfig::default()
//!     .with_main_execution(MainExecution::Exclusive)
//!     .with_isolated_subscriber_errors(true);
//!
//! assert_eq!(config.main_execution, MainExecution::Exclusive);
//! assert!(!config.run_filters_on_abort);
//! ```

use serde::{Deserialize, Serialize};

/// How the asynchronous aggregation schedules the `Main` handler.
///
/// The synchronous aggregation always behaves as [`Exclusive`](Self::Exclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainExecution {
    /// `Main` is launched in the same batch as the `Independent` handlers.
    ///
    /// Its result is still checked before the `None` batch starts, but the
    /// `Independent` handlers may already have run when `Main` fails.
    #[default]
    Concurrent,

    /// `Main` runs alone first; `Independent` handlers start only after it succeeded.
    Exclusive,
}

/// Configuration for a [`Bus`](crate::Bus).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Scheduling of the `Main` handler in asynchronous aggregation
    pub main_execution: MainExecution,

    /// Log and drop subscriber errors during publish instead of failing the call
    pub isolate_subscriber_errors: bool,

    /// Run filters on an aggregation that aborted on validation or `Main` failure
    pub run_filters_on_abort: bool,
}

impl BusConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how the asynchronous aggregation schedules the `Main` handler
    #[must_use]
    pub const fn with_main_execution(mut self, main_execution: MainExecution) -> Self {
        self.main_execution = main_execution;
        self
    }

    /// Set whether subscriber errors are isolated during publish
    #[must_use]
    pub const fn with_isolated_subscriber_errors(mut self, isolate: bool) -> Self {
        self.isolate_subscriber_errors = isolate;
        self
    }

    /// Set whether filters run on aborted aggregations
    #[must_use]
    pub const fn with_filters_on_abort(mut self, run: bool) -> Self {
        self.run_filters_on_abort = run;
        self
    }
}
