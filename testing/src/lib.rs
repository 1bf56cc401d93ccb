//! # Courier Testing
//!
//! Testing utilities and helpers for the Courier dispatch bus.
//!
//! This crate provides:
//! - Closure-backed handlers, validators, filters and subscribers
//! - A call recorder for asserting invocation order
//! - A Given-When-Then harness for dispatch
//! - Assertion helpers for responses
//!
//! The registry resolves capabilities by request *and* result type, so the
//! `Res` a harness or bus call names selects the slot. Naming the wrong
//! result type does not fail: it aggregates an empty slot. Spell both types
//! out with a turbofish, e.g. `DispatchTest::<PlaceOrder, Receipt>::new`.
//!
//! ## Example
//!
//! ```
//! use courier_core::Response;
//! use courier_runtime::{Bus, Registry};
//! use courier_testing::{FnHandler, Spy};
//! use std::sync::Arc;
//!
//! let spy = Spy::new();
//! let seen = spy.clone();
//! let registry = Registry::new().with_handler(FnHandler::new(move |_, name: &String| {
//!     seen.record(name.clone());
//!     Ok(Some(Response::success(name.len())))
//! }));
//!
//! let bus = Bus::new(Arc::new(registry));
//! let response = bus.send::<String, usize>(&"order".to_string())?;
//! assert_eq!(response.value(), Some(&5));
//! assert_eq!(spy.calls(), vec!["order"]);
//! # Ok::<(), courier_runtime::BusError>(())
//! ```

mod capabilities;
mod spy;

pub use capabilities::{FnFilter, FnHandler, FnSubscriber, FnValidator};
pub use dispatch_test::{DispatchTest, assertions};
pub use spy::Spy;

/// Install a test-friendly tracing subscriber.
///
/// Output goes through the test harness writer and honours `RUST_LOG`.
/// Calling it more than once is harmless.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
