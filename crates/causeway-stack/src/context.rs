//! Typed context keys and the context table.
//!
//! A [`ContextKey<T>`] names one concept (for example "the player who placed
//! this block") and fixes the type of value stored under it. The table itself
//! is type-erased; every read checks the stored type against the key and
//! reports [`StackError::TypeMismatch`] rather than handing back the wrong
//! type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::StackError;

// ---------------------------------------------------------------------------
// ContextKey
// ---------------------------------------------------------------------------

/// Identifier for a context value of type `T`.
///
/// Keys are compared by `id`. Declare each key once, usually as a `const`:
///
/// ```
/// use causeway_stack::context::ContextKey;
///
/// const OWNER: ContextKey<u64> = ContextKey::new("owner");
/// assert_eq!(OWNER.id(), "owner");
/// ```
pub struct ContextKey<T> {
    id: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    /// Create a key with a globally unique id.
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The key's id.
    pub const fn id(&self) -> &'static str {
        self.id
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContextKey<T> {}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey<{}>({})", std::any::type_name::<T>(), self.id)
    }
}

// ---------------------------------------------------------------------------
// ContextValue
// ---------------------------------------------------------------------------

/// A type-erased context value with enough metadata to check reads.
#[derive(Clone)]
pub(crate) struct ContextValue {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ContextValue {
    pub(crate) fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Check that this value was stored as a `T` under `key`.
    pub(crate) fn check<T: Any>(&self, key: &'static str) -> Result<(), StackError> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(StackError::TypeMismatch {
                key,
                expected: std::any::type_name::<T>(),
                found: self.type_name,
            })
        }
    }

    /// Read the value back as a `T`.
    pub(crate) fn read<T: Any + Clone>(&self, key: &'static str) -> Result<T, StackError> {
        self.check::<T>(key)?;
        (*self.value)
            .downcast_ref::<T>()
            .cloned()
            .ok_or(StackError::TypeMismatch {
                key,
                expected: std::any::type_name::<T>(),
                found: self.type_name,
            })
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextValue({})", self.type_name)
    }
}

// ---------------------------------------------------------------------------
// EventContext
// ---------------------------------------------------------------------------

/// A table of typed context values.
///
/// The live table lives inside the cause stack; [`Cause`](crate::cause::Cause)
/// snapshots carry a copy. Values are shared, not deep-cloned.
#[derive(Clone, Debug, Default)]
pub struct EventContext {
    entries: HashMap<&'static str, ContextValue>,
}

impl EventContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The value stored under `key`, if any.
    pub fn get<T>(&self, key: &ContextKey<T>) -> Result<Option<T>, StackError>
    where
        T: Any + Clone + Send + Sync,
    {
        self.entries
            .get(key.id())
            .map(|value| value.read::<T>(key.id()))
            .transpose()
    }

    /// The value stored under `key`, failing with
    /// [`StackError::MissingContext`] when absent.
    pub fn require<T>(&self, key: &ContextKey<T>) -> Result<T, StackError>
    where
        T: Any + Clone + Send + Sync,
    {
        self.get(key)?
            .ok_or(StackError::MissingContext { key: key.id() })
    }

    /// Whether anything is stored under `key`, regardless of type.
    pub fn contains<T>(&self, key: &ContextKey<T>) -> bool {
        self.entries.contains_key(key.id())
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored key ids, sorted.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    // -- raw access for the stack ------------------------------------------

    pub(crate) fn raw(&self, id: &'static str) -> Option<&ContextValue> {
        self.entries.get(id)
    }

    pub(crate) fn insert_raw(
        &mut self,
        id: &'static str,
        value: ContextValue,
    ) -> Option<ContextValue> {
        self.entries.insert(id, value)
    }

    pub(crate) fn remove_raw(&mut self, id: &'static str) -> Option<ContextValue> {
        self.entries.remove(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
