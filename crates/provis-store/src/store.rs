//! The store facade.
//!
//! [`Store`] ties a [`Registry`] of item types to a set of named backends
//! ("sources"). It allocates identities for new items, rebuilds items from
//! stored records, validates before persisting and normalizes queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use provis_schema::{Item, ItemResolver, Registry};
use provis_types::{generate_uid, now_timestamp, Record, Value, TYPE_FIELD, UID_FIELD};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{Backend, Criteria, Row};

/// Source used when a caller does not name one.
pub const DEFAULT_SOURCE: &str = "base";

// ---------------------------------------------------------------------------
// StoreBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Store`].
pub struct StoreBuilder {
    registry: Registry,
    sources: Vec<(String, Arc<dyn Backend>)>,
    default_source: String,
}

impl StoreBuilder {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            sources: Vec::new(),
            default_source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Register `backend` under `name`, replacing any earlier one.
    pub fn source(mut self, name: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        let name = name.into();
        self.sources.retain(|(n, _)| *n != name);
        self.sources.push((name, backend));
        self
    }

    pub fn default_source(mut self, name: impl Into<String>) -> Self {
        self.default_source = name.into();
        self
    }

    /// Boot every source and build the store.
    pub fn build(self) -> StoreResult<Store> {
        if !self.sources.iter().any(|(n, _)| *n == self.default_source) {
            return Err(StoreError::InvalidSource(self.default_source));
        }
        let mut sources = BTreeMap::new();
        for (name, backend) in self.sources {
            if !backend.boot()? {
                return Err(StoreError::BootFailed(name));
            }
            debug!(source = %name, "source booted");
            sources.insert(name, backend);
        }
        info!(
            types = self.registry.len(),
            sources = sources.len(),
            default_source = %self.default_source,
            "store ready"
        );
        Ok(Store {
            registry: Arc::new(self.registry),
            sources,
            default_source: self.default_source,
        })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Item store over one or more named backends.
///
/// Every operation taking `source: Option<&str>` uses the default source
/// when given `None`.
pub struct Store {
    registry: Arc<Registry>,
    sources: BTreeMap<String, Arc<dyn Backend>>,
    default_source: String,
}

impl Store {
    pub fn builder(registry: Registry) -> StoreBuilder {
        StoreBuilder::new(registry)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn default_source(&self) -> &str {
        &self.default_source
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    /// Registered item type names, sorted.
    pub fn get_types(&self) -> Vec<String> {
        self.registry.type_names()
    }

    fn source_name<'a>(&'a self, source: Option<&'a str>) -> &'a str {
        source.unwrap_or(&self.default_source)
    }

    pub fn backend(&self, source: Option<&str>) -> StoreResult<&Arc<dyn Backend>> {
        let name = self.source_name(source);
        self.sources
            .get(name)
            .ok_or_else(|| StoreError::InvalidSource(name.to_string()))
    }

    /// A fresh item of `item_type` with a new identity, registered with its
    /// backend as active but not yet stored.
    pub fn new_item(&self, item_type: &str, source: Option<&str>) -> StoreResult<Item> {
        let schema = self
            .registry
            .get(item_type)
            .ok_or_else(|| StoreError::UnknownType(item_type.to_string()))?;
        let backend = self.backend(source)?;
        let source = self.source_name(source);

        let ctime = now_timestamp();
        let uid = generate_uid(ctime);
        let mut item = Item::new(Arc::clone(schema), source);
        item.assign_identity(&uid, ctime)?;
        backend.register(&uid)?;
        debug!(item_type = %item_type, uid = %uid, source = %source, "item created");
        Ok(item)
    }

    /// The stored item `uid`, rebuilt as its recorded type.
    pub fn get(&self, uid: &str, source: Option<&str>) -> StoreResult<Item> {
        let backend = self.backend(source)?;
        let record = backend.load(uid)?;
        self.inflate(&record, self.source_name(source))
    }

    fn inflate(&self, record: &Record, source: &str) -> StoreResult<Item> {
        let item_type = record
            .type_name()
            .ok_or_else(|| StoreError::InvalidRecord(format!("record has no {TYPE_FIELD}")))?;
        let mut item = self
            .registry
            .instantiate(item_type, source)
            .ok_or_else(|| StoreError::UnknownType(item_type.to_string()))?;
        item.inflate(record)?;
        Ok(item)
    }

    /// Validate `item` and persist it if valid.
    ///
    /// Returns `Ok(false)` without persisting when validation fails; the
    /// failures stay on the item. Otherwise stores the item with a refreshed
    /// modification time and returns the backend's result; the new time is
    /// kept on `item` only if the backend stored it.
    pub fn set(&self, item: &mut Item) -> StoreResult<bool> {
        let source = item.source().to_string();
        let backend = self.backend(Some(&source))?;
        if !item.validate(&self.resolver(Some(&source))) {
            debug!(
                item_type = %item.type_name(),
                uid = item.uid().unwrap_or_default(),
                errors = item.errors().len(),
                "item failed validation"
            );
            return Ok(false);
        }
        let mut touched = item.clone();
        touched.touch()?;
        let stored = backend.store(&touched.deflate())?;
        debug!(item_type = %item.type_name(), uid = item.uid().unwrap_or_default(), stored, "item stored");
        if stored {
            *item = touched;
        }
        Ok(stored)
    }

    /// Rows of `[uid, projection...]` for every item matching `criteria`.
    ///
    /// The projection is normalized first: duplicates, the uid itself and
    /// names no registered type declares are dropped.
    pub fn find<S: AsRef<str>>(
        &self,
        criteria: &Criteria,
        projection: &[S],
        source: Option<&str>,
    ) -> StoreResult<Vec<Row>> {
        let backend = self.backend(source)?;
        let projection = self.normalize_projection(projection);
        backend.find(criteria, &projection)
    }

    fn normalize_projection<S: AsRef<str>>(&self, projection: &[S]) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(projection.len());
        for name in projection.iter().map(AsRef::as_ref) {
            if name == UID_FIELD || names.iter().any(|n| n == name) {
                continue;
            }
            if !self.registry.declares_field(name) {
                debug!(field = %name, "dropping unknown projection field");
                continue;
            }
            names.push(name.to_string());
        }
        names
    }

    /// Every item matching `criteria`, fully loaded.
    pub fn find_items(&self, criteria: &Criteria, source: Option<&str>) -> StoreResult<Vec<Item>> {
        let rows = self.find::<&str>(criteria, &[], source)?;
        rows.iter()
            .filter_map(|row| row.first().and_then(Value::as_str))
            .map(|uid| self.get(uid, source))
            .collect()
    }

    /// The item of `item_type` named `name`, if any.
    pub fn find_one_by_name(
        &self,
        item_type: &str,
        name: &str,
        source: Option<&str>,
    ) -> StoreResult<Option<Item>> {
        let criteria: Criteria = [
            (TYPE_FIELD.to_string(), Value::from(item_type)),
            ("name".to_string(), Value::from(name)),
        ]
        .into_iter()
        .collect();
        let rows = self.find::<&str>(&criteria, &[], source)?;
        match rows.first().and_then(|row| row.first()).and_then(Value::as_str) {
            Some(uid) => self.get(uid, source).map(Some),
            None => Ok(None),
        }
    }

    /// Deactivate `uid` and purge its record.
    pub fn remove(&self, uid: &str, source: Option<&str>) -> StoreResult<bool> {
        let removed = self.backend(source)?.remove(uid)?;
        debug!(uid = %uid, removed, "item removed");
        Ok(removed)
    }

    /// The stored item `uid` with inheritance resolved.
    pub fn get_rendered(&self, uid: &str, source: Option<&str>) -> StoreResult<Record> {
        let item = self.get(uid, source)?;
        Ok(item.render(&self.resolver(source)))
    }

    /// A resolver that looks items up by name in `source`.
    pub fn resolver<'a>(&'a self, source: Option<&'a str>) -> SourceResolver<'a> {
        SourceResolver {
            store: self,
            source: self.source_name(source),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("types", &self.registry.type_names())
            .field("sources", &self.source_names())
            .field("default_source", &self.default_source)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SourceResolver
// ---------------------------------------------------------------------------

/// [`ItemResolver`] over one source of a [`Store`].
///
/// Lookup failures are logged and treated as "no such item".
#[derive(Clone, Copy)]
pub struct SourceResolver<'a> {
    store: &'a Store,
    source: &'a str,
}

impl ItemResolver for SourceResolver<'_> {
    fn resolve(&self, item_type: &str, name: &str) -> Option<Item> {
        match self
            .store
            .find_one_by_name(item_type, name, Some(self.source))
        {
            Ok(item) => item,
            Err(e) => {
                warn!(item_type = %item_type, name = %name, error = %e, "reference lookup failed");
                None
            }
        }
    }

    fn exists(&self, item_type: &str, name: &str) -> bool {
        let criteria: Criteria = [
            (TYPE_FIELD.to_string(), Value::from(item_type)),
            ("name".to_string(), Value::from(name)),
        ]
        .into_iter()
        .collect();
        match self.store.find::<&str>(&criteria, &[], Some(self.source)) {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                warn!(item_type = %item_type, name = %name, error = %e, "reference lookup failed");
                false
            }
        }
    }
}
