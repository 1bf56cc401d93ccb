//! Event subscribers.
//!
//! Publishing invokes every applicable subscriber of the event type. There is
//! no execution-priority tag and no result aggregation.

use crate::context::Context;
use crate::{BoxError, BoxFuture};

/// Synchronous event subscriber.
///
/// # Example
///
/// ```
/// use courier_core::{BoxError, Context, EventHandler};
///
/// struct OrderPlaced {
///     order_id: u64,
/// }
///
/// struct SendConfirmation;
///
/// impl EventHandler<OrderPlaced> for SendConfirmation {
///     fn handle(&self, context: &Context, event: &OrderPlaced) -> Result<(), BoxError> {
///         context.set("confirmed", event.order_id);
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler<E>: Send + Sync {
    /// Whether this subscriber applies to `event` in `context`
    fn is_applicable(&self, _context: &Context, _event: &E) -> bool {
        true
    }

    /// React to the event.
    ///
    /// # Errors
    ///
    /// Any error the subscriber's logic raises.
    fn handle(&self, context: &Context, event: &E) -> Result<(), BoxError>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Asynchronous event subscriber.
pub trait AsyncEventHandler<E>: Send + Sync {
    /// Whether this subscriber applies to `event` in `context`
    fn is_applicable(&self, _context: &Context, _event: &E) -> bool {
        true
    }

    /// React to the event
    fn handle<'a>(&'a self, context: &'a Context, event: &'a E) -> BoxFuture<'a, Result<(), BoxError>>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
