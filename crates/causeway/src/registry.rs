//! Id-keyed registries handed to components that need them.
//!
//! A [`Registry`] maps string ids (`"zombie"`, `"minecraft:chest"`) to shared
//! values. There is no global instance: whoever needs lookups is given an
//! `Arc<Registry<T>>` at construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::RegistryError;

/// Registry mapping string ids to values, in registration order.
#[derive(Debug)]
pub struct Registry<T> {
    /// Human-readable name used in errors and logs.
    name: &'static str,
    /// Id -> index into `entries`.
    by_id: HashMap<String, usize>,
    entries: Vec<(String, Arc<T>)>,
}

impl<T> Registry<T> {
    /// Create an empty registry.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            by_id: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register `value` under `id`. Ids are unique.
    pub fn register(&mut self, id: impl Into<String>, value: T) -> Result<Arc<T>, RegistryError> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateId {
                registry: self.name,
                id,
            });
        }
        let value = Arc::new(value);
        self.by_id.insert(id.clone(), self.entries.len());
        self.entries.push((id, Arc::clone(&value)));
        Ok(value)
    }

    /// Look up `id`.
    pub fn get(&self, id: &str) -> Result<&Arc<T>, RegistryError> {
        self.by_id
            .get(id)
            .map(|&index| &self.entries[index].1)
            .ok_or_else(|| RegistryError::UnknownId {
                registry: self.name,
                id: id.to_owned(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Freeze into a shareable handle.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
