//! Capability-tagged registry.
//!
//! Every capability list is stored under the [`TypeId`] of its trait object,
//! so `dyn Handler<CreateOrder, OrderId>` and `dyn Handler<CreateOrder, Unit>`
//! live in separate slots: the trait object type already encodes the
//! request and result types. Lookup is a hash probe plus a downcast; no
//! reflection is involved.
//!
//! Lists keep registration order. The registry is built once and then shared
//! (usually behind an [`Arc`]) by every [`Bus`](crate::Bus) created from it.
//!
//! # Example
//!
//! ```
//! use courier_core::{BoxError, Context, EventHandler};
//! use courier_runtime::Registry;
//!
//! struct OrderPlaced;
//! struct Audit;
//!
//! impl EventHandler<OrderPlaced> for Audit {
//!     fn handle(&self, _context: &Context, _event: &OrderPlaced) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::new().with_event_handler(Audit).with_event_handler(Audit);
//! assert_eq!(registry.event_handlers::<OrderPlaced>().len(), 2);
//! ```

use courier_core::{
    AsyncEventHandler, AsyncFilter, AsyncHandler, AsyncValidator, ContextWriter, EventHandler,
    Filter, Handler, Validator,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Slot = Box<dyn Any + Send + Sync>;

/// Ordered lists of handlers, validators, filters, subscribers and context writers.
#[derive(Default)]
pub struct Registry {
    slots: HashMap<TypeId, Slot>,
    slot_names: Vec<&'static str>,
    writers: Vec<Arc<dyn ContextWriter>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous request handler
    #[must_use]
    pub fn with_handler<Req, Res, H>(mut self, handler: H) -> Self
    where
        H: Handler<Req, Res> + 'static,
        Req: 'static,
        Res: 'static,
    {
        let handler: Arc<dyn Handler<Req, Res>> = Arc::new(handler);
        self.push(handler);
        self
    }

    /// Register an asynchronous request handler
    #[must_use]
    pub fn with_async_handler<Req, Res, H>(mut self, handler: H) -> Self
    where
        H: AsyncHandler<Req, Res> + 'static,
        Req: 'static,
        Res: 'static,
    {
        let handler: Arc<dyn AsyncHandler<Req, Res>> = Arc::new(handler);
        self.push(handler);
        self
    }

    /// Register a synchronous validator
    #[must_use]
    pub fn with_validator<Req, V>(mut self, validator: V) -> Self
    where
        V: Validator<Req> + 'static,
        Req: 'static,
    {
        let validator: Arc<dyn Validator<Req>> = Arc::new(validator);
        self.push(validator);
        self
    }

    /// Register an asynchronous validator
    #[must_use]
    pub fn with_async_validator<Req, V>(mut self, validator: V) -> Self
    where
        V: AsyncValidator<Req> + 'static,
        Req: 'static,
    {
        let validator: Arc<dyn AsyncValidator<Req>> = Arc::new(validator);
        self.push(validator);
        self
    }

    /// Register a synchronous aggregation filter
    #[must_use]
    pub fn with_filter<Req, Res, F>(mut self, filter: F) -> Self
    where
        F: Filter<Req, Res> + 'static,
        Req: 'static,
        Res: 'static,
    {
        let filter: Arc<dyn Filter<Req, Res>> = Arc::new(filter);
        self.push(filter);
        self
    }

    /// Register an asynchronous aggregation filter
    #[must_use]
    pub fn with_async_filter<Req, Res, F>(mut self, filter: F) -> Self
    where
        F: AsyncFilter<Req, Res> + 'static,
        Req: 'static,
        Res: 'static,
    {
        let filter: Arc<dyn AsyncFilter<Req, Res>> = Arc::new(filter);
        self.push(filter);
        self
    }

    /// Register a synchronous event subscriber
    #[must_use]
    pub fn with_event_handler<E, H>(mut self, handler: H) -> Self
    where
        H: EventHandler<E> + 'static,
        E: 'static,
    {
        let handler: Arc<dyn EventHandler<E>> = Arc::new(handler);
        self.push(handler);
        self
    }

    /// Register an asynchronous event subscriber
    #[must_use]
    pub fn with_async_event_handler<E, H>(mut self, handler: H) -> Self
    where
        H: AsyncEventHandler<E> + 'static,
        E: 'static,
    {
        let handler: Arc<dyn AsyncEventHandler<E>> = Arc::new(handler);
        self.push(handler);
        self
    }

    /// Register a context writer; writers run in registration order
    #[must_use]
    pub fn with_context_writer<W>(mut self, writer: W) -> Self
    where
        W: ContextWriter + 'static,
    {
        self.writers.push(Arc::new(writer));
        self
    }

    /// Synchronous handlers for `(Req, Res)`, in registration order
    #[must_use]
    pub fn handlers<Req: 'static, Res: 'static>(&self) -> &[Arc<dyn Handler<Req, Res>>] {
        self.slot()
    }

    /// Asynchronous handlers for `(Req, Res)`, in registration order
    #[must_use]
    pub fn async_handlers<Req: 'static, Res: 'static>(&self) -> &[Arc<dyn AsyncHandler<Req, Res>>] {
        self.slot()
    }

    /// Synchronous validators for `Req`, in registration order
    #[must_use]
    pub fn validators<Req: 'static>(&self) -> &[Arc<dyn Validator<Req>>] {
        self.slot()
    }

    /// Asynchronous validators for `Req`, in registration order
    #[must_use]
    pub fn async_validators<Req: 'static>(&self) -> &[Arc<dyn AsyncValidator<Req>>] {
        self.slot()
    }

    /// Synchronous filters for `(Req, Res)`, in registration order
    #[must_use]
    pub fn filters<Req: 'static, Res: 'static>(&self) -> &[Arc<dyn Filter<Req, Res>>] {
        self.slot()
    }

    /// Asynchronous filters for `(Req, Res)`, in registration order
    #[must_use]
    pub fn async_filters<Req: 'static, Res: 'static>(&self) -> &[Arc<dyn AsyncFilter<Req, Res>>] {
        self.slot()
    }

    /// Synchronous subscribers for `E`, in registration order
    #[must_use]
    pub fn event_handlers<E: 'static>(&self) -> &[Arc<dyn EventHandler<E>>] {
        self.slot()
    }

    /// Asynchronous subscribers for `E`, in registration order
    #[must_use]
    pub fn async_event_handlers<E: 'static>(&self) -> &[Arc<dyn AsyncEventHandler<E>>] {
        self.slot()
    }

    /// Context writers, in registration order
    #[must_use]
    pub fn context_writers(&self) -> &[Arc<dyn ContextWriter>] {
        &self.writers
    }

    fn push<C>(&mut self, capability: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let slot = self.slots.entry(TypeId::of::<Arc<C>>()).or_insert_with(|| {
            self.slot_names.push(std::any::type_name::<C>());
            Box::new(Vec::<Arc<C>>::new())
        });
        if let Some(list) = slot.downcast_mut::<Vec<Arc<C>>>() {
            list.push(capability);
        }
    }

    fn slot<C>(&self) -> &[Arc<C>]
    where
        C: ?Sized + 'static,
    {
        self.slots
            .get(&TypeId::of::<Arc<C>>())
            .and_then(|slot| slot.downcast_ref::<Vec<Arc<C>>>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("capabilities", &self.slot_names)
            .field("context_writers", &self.writers.len())
            .finish()
    }
}
