//! Per-dispatch key/value scratch space.
//!
//! A [`Context`] is created lazily by the bus on its first dispatch and filled
//! by every registered [`ContextWriter`], in registration order, exactly once.
//! After that it is shared by reference with every handler, validator, filter
//! and subscriber the bus invokes.
//!
//! # Concurrency
//!
//! The context guards its map with a lock so it can be shared across
//! concurrently running handlers, but the bus imposes no ordering between
//! them: two handlers that read and write the same key in one asynchronous
//! batch race with each other. Writers are likewise not isolated from each
//! other; a writer that depends on a key set by an earlier writer relies on
//! registration order.
//!
//! # Example
//!
//! ```
//! use courier_core::Context;
//!
//! let context = Context::new();
//! context.set("tenant", "acme".to_string());
//! context.set("attempt", 3_u32);
//!
//! assert!(context.exists("tenant"));
//! assert_eq!(context.get_or_default::<String>("tenant"), "acme");
//! assert_eq!(context.get_or_default::<u32>("attempt"), 3);
//!
//! // Missing keys and type mismatches fall back to the default value
//! assert_eq!(context.get_or_default::<u32>("missing"), 0);
//! assert_eq!(context.get_or_default::<u64>("attempt"), 0);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Value = Box<dyn Any + Send + Sync>;

/// Mutable key/value scratch space shared by everything invoked during a dispatch.
#[derive(Default)]
pub struct Context {
    values: RwLock<HashMap<String, Value>>,
}

impl Context {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, overwriting any previous value unconditionally.
    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.write().insert(key.into(), Box::new(value));
    }

    /// Read the value stored under `key` as `T`.
    ///
    /// Returns `None` if the key is absent or holds a value of another type.
    #[must_use]
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Clone,
    {
        self.read()
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Read the value stored under `key` as `T`, or `T::default()`.
    ///
    /// A type mismatch is not an error at this layer: callers are expected to
    /// use one type per key, and a mismatch reads as the default value.
    #[must_use]
    pub fn get_or_default<T>(&self, key: &str) -> T
    where
        T: Any + Clone + Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Whether a value is stored under `key`, regardless of its type
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Remove the value stored under `key`, returning whether one was present
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the context holds no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the stored keys, in no particular order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    // A panicking handler must not make the context unusable for the rest of the scope.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.keys();
        keys.sort();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

/// Populates a [`Context`] before the first dispatch on a bus.
///
/// Writers run once per bus instance, in registration order. They see each
/// other's mutations, so a writer may read keys set by earlier writers.
///
/// # Example
///
/// ```
/// use courier_core::{Context, ContextWriter};
///
/// struct TenantWriter;
///
/// impl ContextWriter for TenantWriter {
///     fn write(&self, context: &Context) {
///         context.set("tenant", "acme".to_string());
///     }
/// }
///
/// let context = Context::new();
/// TenantWriter.write(&context);
/// assert!(context.exists("tenant"));
/// ```
pub trait ContextWriter: Send + Sync {
    /// Write values into the context
    fn write(&self, context: &Context);
}
