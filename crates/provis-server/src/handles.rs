use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use provis_schema::Item;
use tracing::debug;
use uuid::Uuid;

struct Entry {
    item: Item,
    touched: Instant,
}

/// In-flight items that have been created or checked out but not saved.
///
/// Every access goes through one lock, so two requests on the same handle
/// never interleave their edits. Entries idle for longer than the TTL are
/// dropped on the next access.
pub struct HandleCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl HandleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Park `item` and return its new handle.
    pub fn insert(&self, item: Item) -> String {
        let handle = Uuid::now_v7().to_string();
        let mut entries = self.entries.lock().expect("lock poisoned");
        self.purge(&mut entries);
        debug!(handle = %handle, item_type = %item.type_name(), "handle issued");
        entries.insert(
            handle.clone(),
            Entry {
                item,
                touched: Instant::now(),
            },
        );
        handle
    }

    /// Run `f` against the item behind `handle`, refreshing its TTL.
    pub fn with_item<R>(&self, handle: &str, f: impl FnOnce(&mut Item) -> R) -> Option<R> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        self.purge(&mut entries);
        let entry = entries.get_mut(handle)?;
        entry.touched = Instant::now();
        Some(f(&mut entry.item))
    }

    /// Drop `handle`, returning its item.
    pub fn remove(&self, handle: &str) -> Option<Item> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        self.purge(&mut entries);
        entries.remove(handle).map(|e| e.item)
    }

    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().expect("lock poisoned");
        self.purge(&mut entries);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(&self, entries: &mut HashMap<String, Entry>) {
        let before = entries.len();
        entries.retain(|_, e| e.touched.elapsed() < self.ttl);
        let expired = before - entries.len();
        if expired > 0 {
            debug!(expired, "expired item handles dropped");
        }
    }
}

impl std::fmt::Debug for HandleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}
