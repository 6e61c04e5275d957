use std::collections::BTreeMap;

use provis_types::{Record, Value};

use crate::error::StoreResult;

/// Field name to required value; every pair must match.
pub type Criteria = BTreeMap<String, Value>;

/// One `find` result: the uid followed by the projected values.
pub type Row = Vec<Value>;

/// A pluggable persistence and query backend, identified by source name.
///
/// All implementations must satisfy these invariants:
/// - Each call is atomic with respect to every other call on the backend.
/// - A record is only persisted for a uid that has been [`Backend::register`]ed
///   and not since [`Backend::remove`]d. Storing anything else is a silent
///   no-op that reports success.
/// - `find` is an exact-match AND over the criteria; no wildcards.
pub trait Backend: Send + Sync {
    /// One-time initialization. Returns `false` if the backend is unusable.
    fn boot(&self) -> StoreResult<bool>;

    /// Every stored record matching `criteria`, projected to
    /// `[uid, projection...]`, ordered by uid.
    ///
    /// Fields a record lacks project as null.
    fn find(&self, criteria: &Criteria, projection: &[String]) -> StoreResult<Vec<Row>>;

    /// The stored record for `uid`.
    ///
    /// Returns `StoreError::ItemNotFound` if nothing is stored under it.
    fn load(&self, uid: &str) -> StoreResult<Record>;

    /// Persist `record` if its uid is active.
    fn store(&self, record: &Record) -> StoreResult<bool>;

    /// Mark `uid` as active. Returns `false` if it already was.
    fn register(&self, uid: &str) -> StoreResult<bool>;

    /// Deactivate `uid` and purge its record. Returns `false` if it was not active.
    fn remove(&self, uid: &str) -> StoreResult<bool>;
}

/// Build the `find` row for `record`.
pub fn project(uid: &str, record: &Record, projection: &[String]) -> Row {
    std::iter::once(Value::from(uid))
        .chain(
            projection
                .iter()
                .map(|name| record.value(name).cloned().unwrap_or(Value::Null)),
        )
        .collect()
}
