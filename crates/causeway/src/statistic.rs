//! Statistics bound to an entity type.
//!
//! An [`EntityStatistic`] names a counter such as "killed" for one entity
//! type. The entity type is resolved once, through the registry handle passed
//! in, when the statistic is created.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::Registry;
use crate::RegistryError;

/// A registered kind of entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    /// Registry id, e.g. `"zombie"`.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl EntityType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A statistic about one entity type, e.g. `killed:zombie`.
#[derive(Debug, Clone)]
pub struct EntityStatistic<T = EntityType> {
    category: String,
    entity_type_id: String,
    entity_type: Arc<T>,
}

impl<T> EntityStatistic<T> {
    /// Bind `category` to the entity type registered as `entity_type_id`.
    pub fn new(
        category: impl Into<String>,
        entity_type_id: &str,
        registry: &Registry<T>,
    ) -> Result<Self, RegistryError> {
        let entity_type = Arc::clone(registry.get(entity_type_id)?);
        Ok(Self {
            category: category.into(),
            entity_type_id: entity_type_id.to_owned(),
            entity_type,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn entity_type_id(&self) -> &str {
        &self.entity_type_id
    }

    /// The resolved entity type.
    pub fn entity_type(&self) -> &T {
        &self.entity_type
    }

    /// Stable key, `category:entity_type_id`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.category, self.entity_type_id)
    }
}

impl<T> fmt::Display for EntityStatistic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.entity_type_id)
    }
}
