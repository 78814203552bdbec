//! Cause snapshots.
//!
//! A [`Cause`] is an immutable view of the cause stack at the moment it was
//! taken: the pushed objects in most-recent-first order plus a copy of the
//! live [`EventContext`]. Snapshots share the underlying objects through
//! `Arc`, so taking one is cheap and the result can be sent to other threads.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::EventContext;

// ---------------------------------------------------------------------------
// CauseEntry
// ---------------------------------------------------------------------------

/// One object on the cause stack.
///
/// The object itself is opaque to the stack. Callers recover it by type with
/// [`downcast_ref`](Self::downcast_ref).
#[derive(Clone)]
pub struct CauseEntry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CauseEntry {
    /// Wrap a value as a cause entry.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without cloning it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The wrapped object as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    /// Whether the wrapped object is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        (*self.value).is::<T>()
    }

    /// The Rust type name of the wrapped object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both entries point at the same object (identity, not equality).
    pub fn same_object(&self, other: &CauseEntry) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for CauseEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CauseEntry({})", self.type_name)
    }
}

// ---------------------------------------------------------------------------
// Cause
// ---------------------------------------------------------------------------

/// Immutable snapshot of who is responsible for an in-flight action.
///
/// Iteration order is most-recent-first: index 0 is the last object pushed,
/// and the final entry is the root (the oldest entry still on the stack).
#[derive(Clone, Debug)]
pub struct Cause {
    entries: Arc<[CauseEntry]>,
    context: EventContext,
}

impl Cause {
    /// Build a snapshot from stack entries in push order (oldest first).
    pub(crate) fn from_stack(stack: &[CauseEntry], context: EventContext) -> Self {
        Self {
            entries: stack.iter().rev().cloned().collect(),
            context,
        }
    }

    /// Build a cause directly from entries, most-recent-first.
    pub fn of(entries: Vec<CauseEntry>, context: EventContext) -> Self {
        Self {
            entries: entries.into(),
            context,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, most-recent-first.
    pub fn entries(&self) -> &[CauseEntry] {
        &self.entries
    }

    /// Iterate entries, most-recent-first.
    pub fn iter(&self) -> std::slice::Iter<'_, CauseEntry> {
        self.entries.iter()
    }

    /// The entry at `index` (0 = most recent).
    pub fn get(&self, index: usize) -> Option<&CauseEntry> {
        self.entries.get(index)
    }

    /// The most recently pushed entry.
    pub fn top(&self) -> Option<&CauseEntry> {
        self.entries.first()
    }

    /// The oldest entry, i.e. the root cause when the stack was rooted.
    pub fn root(&self) -> Option<&CauseEntry> {
        self.entries.last()
    }

    /// The most recent object of type `T`.
    pub fn first<T: Any>(&self) -> Option<&T> {
        self.entries.iter().find_map(CauseEntry::downcast_ref::<T>)
    }

    /// The oldest object of type `T`.
    pub fn last<T: Any>(&self) -> Option<&T> {
        self.entries.iter().rev().find_map(CauseEntry::downcast_ref::<T>)
    }

    /// Every object of type `T`, most-recent-first.
    pub fn all_of<T: Any>(&self) -> Vec<&T> {
        self.entries
            .iter()
            .filter_map(CauseEntry::downcast_ref::<T>)
            .collect()
    }

    /// Whether any entry is a `T`.
    pub fn contains<T: Any>(&self) -> bool {
        self.entries.iter().any(CauseEntry::is::<T>)
    }

    /// The entry pushed just before the most recent `T`.
    pub fn before<T: Any>(&self) -> Option<&CauseEntry> {
        let index = self.entries.iter().position(CauseEntry::is::<T>)?;
        self.entries.get(index + 1)
    }

    /// The entry pushed just after the most recent `T`.
    pub fn after<T: Any>(&self) -> Option<&CauseEntry> {
        let index = self.entries.iter().position(CauseEntry::is::<T>)?;
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Context captured alongside the entries.
    pub fn context(&self) -> &EventContext {
        &self.context
    }
}

impl<'a> IntoIterator for &'a Cause {
    type Item = &'a CauseEntry;
    type IntoIter = std::slice::Iter<'a, CauseEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
