//! # Courier Core
//!
//! Core types and capability traits for the Courier in-process dispatch bus.
//!
//! This crate defines *what* can be dispatched and *who* can take part in a
//! dispatch. The runtime crate decides *how*: handler resolution, validation
//! ordering, aggregation and fan-out.
//!
//! ## Core Concepts
//!
//! - **Context**: Per-bus key/value scratch space, populated once by [`ContextWriter`]s
//! - **Response**: Success/failure envelope, optionally carrying a value
//! - **Handler**: Produces a response for a request (single dispatch or aggregation)
//! - **Validator**: Rejects a request with structured errors before any handler runs
//! - **Filter**: Mutates the aggregation result after every handler has run
//! - **Event handler**: Subscriber invoked for a published event
//!
//! Every capability comes in a synchronous and an asynchronous flavour. The
//! [`Immediate`] adapter lifts a synchronous implementation into the
//! asynchronous family so it only has to be written once.
//!
//! ## Example
//!
//! ```
//! use courier_core::{Context, Handler, HandlerResult, Response};
//!
//! struct Greet;
//!
//! impl Handler<String, String> for Greet {
//!     fn handle(&self, _context: &Context, request: &String) -> HandlerResult<String> {
//!         Ok(Response::success(format!("hello, {request}")).into())
//!     }
//! }
//!
//! let context = Context::new();
//! let response = Greet.handle(&context, &"world".to_string()).ok().flatten();
//! assert_eq!(response.and_then(Response::into_value).as_deref(), Some("hello, world"));
//! ```

use std::future::Future;
use std::pin::Pin;

/// Lifts synchronous capabilities into the asynchronous family
pub mod adapter;

/// Per-dispatch key/value scratch space
pub mod context;

/// Event subscribers
pub mod event;

/// Post-aggregation filters
pub mod filter;

/// Request handlers and execution-priority tags
pub mod handler;

/// Result model: responses, errors, status factories
pub mod response;

/// Pre-dispatch validators
pub mod validator;

pub use adapter::Immediate;
pub use context::{Context, ContextWriter};
pub use event::{AsyncEventHandler, EventHandler};
pub use filter::{AsyncFilter, Filter};
pub use handler::{AsyncHandler, ExecutionPriority, Handler, HandlerResult};
pub use response::{HttpError, InvalidResponse, Response, ResponseError, Responses, Unit};
pub use validator::{AsyncValidator, Validator};

/// Error type returned by capability implementations.
///
/// Returning `Err` from a handler, validator, filter or subscriber is the
/// equivalent of throwing: the runtime decides whether it propagates or is
/// isolated.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed future returned by asynchronous capabilities.
///
/// Explicit `Pin<Box<dyn Future>>` returns keep the traits dyn-compatible so
/// the registry can hold `Arc<dyn AsyncHandler<..>>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
