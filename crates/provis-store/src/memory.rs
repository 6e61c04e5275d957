use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use provis_types::Record;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{project, Backend, Criteria, Row};

#[derive(Default)]
struct Tables {
    records: BTreeMap<String, Record>,
    active: BTreeSet<String>,
}

/// In-memory backend.
///
/// Records and the active uid set live behind one `RwLock`, so every
/// operation is atomic. Records are cloned on read and write.
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.tables.read().expect("lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().expect("lock poisoned").records.is_empty()
    }

    pub fn is_active(&self, uid: &str) -> bool {
        self.tables.read().expect("lock poisoned").active.contains(uid)
    }

    /// Forget every record and active uid.
    pub fn flush(&self) {
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.records.clear();
        tables.active.clear();
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn boot(&self) -> StoreResult<bool> {
        Ok(true)
    }

    fn find(&self, criteria: &Criteria, projection: &[String]) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .records
            .iter()
            .filter(|(_, record)| record.matches(criteria))
            .map(|(uid, record)| project(uid, record, projection))
            .collect())
    }

    fn load(&self, uid: &str) -> StoreResult<Record> {
        let tables = self.tables.read().expect("lock poisoned");
        tables
            .records
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::ItemNotFound(uid.to_string()))
    }

    fn store(&self, record: &Record) -> StoreResult<bool> {
        let uid = record
            .uid()
            .ok_or_else(|| StoreError::InvalidRecord("record has no uid".into()))?;
        let mut tables = self.tables.write().expect("lock poisoned");
        if !tables.active.contains(uid) {
            debug!(uid = %uid, "store skipped for inactive uid");
            return Ok(true);
        }
        tables.records.insert(uid.to_string(), record.clone());
        Ok(true)
    }

    fn register(&self, uid: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().expect("lock poisoned");
        Ok(tables.active.insert(uid.to_string()))
    }

    fn remove(&self, uid: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.records.remove(uid);
        Ok(tables.active.remove(uid))
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read().expect("lock poisoned");
        f.debug_struct("MemoryBackend")
            .field("record_count", &tables.records.len())
            .field("active_count", &tables.active.len())
            .finish()
    }
}
