//! An isolated backend for test suites.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use provis_types::Record;

use crate::error::StoreResult;
use crate::memory::MemoryBackend;
use crate::traits::{Backend, Criteria, Row};

/// One call made against a [`TestBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    Boot,
    Find,
    Load(String),
    Store(String),
    Register(String),
    Remove(String),
}

/// A [`MemoryBackend`] that journals every call and can be told to fail
/// stores.
///
/// Each instance owns its tables; nothing is shared between instances.
#[derive(Debug, Default)]
pub struct TestBackend {
    inner: MemoryBackend,
    calls: Mutex<Vec<BackendCall>>,
    fail_stores: AtomicBool,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `store` report failure without persisting.
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// Calls made since creation or the last [`TestBackend::flush`].
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Forget all records, active uids and journaled calls.
    pub fn flush(&self) {
        self.inner.flush();
        self.calls.lock().expect("lock poisoned").clear();
        self.fail_stores(false);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_active(&self, uid: &str) -> bool {
        self.inner.is_active(uid)
    }

    fn journal(&self, call: BackendCall) {
        self.calls.lock().expect("lock poisoned").push(call);
    }
}

impl Backend for TestBackend {
    fn boot(&self) -> StoreResult<bool> {
        self.journal(BackendCall::Boot);
        self.inner.boot()
    }

    fn find(&self, criteria: &Criteria, projection: &[String]) -> StoreResult<Vec<Row>> {
        self.journal(BackendCall::Find);
        self.inner.find(criteria, projection)
    }

    fn load(&self, uid: &str) -> StoreResult<Record> {
        self.journal(BackendCall::Load(uid.to_string()));
        self.inner.load(uid)
    }

    fn store(&self, record: &Record) -> StoreResult<bool> {
        self.journal(BackendCall::Store(
            record.uid().unwrap_or_default().to_string(),
        ));
        if self.fail_stores.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.store(record)
    }

    fn register(&self, uid: &str) -> StoreResult<bool> {
        self.journal(BackendCall::Register(uid.to_string()));
        self.inner.register(uid)
    }

    fn remove(&self, uid: &str) -> StoreResult<bool> {
        self.journal(BackendCall::Remove(uid.to_string()));
        self.inner.remove(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provis_types::{Slot, UID_FIELD};

    fn record(uid: &str) -> Record {
        let mut record = Record::new();
        record.insert(UID_FIELD, Slot::set(uid));
        record
    }

    #[test]
    fn journals_calls_in_order() {
        let backend = TestBackend::new();
        backend.boot().unwrap();
        backend.register("u1").unwrap();
        backend.store(&record("u1")).unwrap();
        backend.load("u1").unwrap();
        backend.find(&Criteria::new(), &[]).unwrap();
        backend.remove("u1").unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Boot,
                BackendCall::Register("u1".into()),
                BackendCall::Store("u1".into()),
                BackendCall::Load("u1".into()),
                BackendCall::Find,
                BackendCall::Remove("u1".into()),
            ]
        );
    }

    #[test]
    fn injected_store_failure_does_not_persist() {
        let backend = TestBackend::new();
        backend.register("u1").unwrap();
        backend.fail_stores(true);
        assert!(!backend.store(&record("u1")).unwrap());
        assert!(backend.is_empty());

        backend.fail_stores(false);
        assert!(backend.store(&record("u1")).unwrap());
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn instances_are_isolated_and_flushable() {
        let a = TestBackend::new();
        let b = TestBackend::new();
        a.register("u1").unwrap();
        a.store(&record("u1")).unwrap();
        assert!(b.is_empty());

        a.flush();
        assert!(a.is_empty());
        assert!(!a.is_active("u1"));
        assert!(a.calls().is_empty());
    }
}
