use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::item::Item;
use crate::schema::Schema;

/// The set of item types known to a store, keyed by type name.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema`, replacing any schema of the same name.
    pub fn register(&mut self, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);
        debug!(item_type = %schema.name(), "item type registered");
        self.schemas
            .insert(schema.name().to_string(), Arc::clone(&schema));
        schema
    }

    pub fn get(&self, item_type: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(item_type)
    }

    pub fn contains(&self, item_type: &str) -> bool {
        self.schemas.contains_key(item_type)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Returns `true` if any registered type declares a field called `name`.
    pub fn declares_field(&self, name: &str) -> bool {
        self.schemas.values().any(|s| s.has_field(name))
    }

    /// A blank item of `item_type`, or `None` if the type is unknown.
    pub fn instantiate(&self, item_type: &str, source: &str) -> Option<Item> {
        self.get(item_type)
            .map(|schema| Item::new(Arc::clone(schema), source))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }
}
