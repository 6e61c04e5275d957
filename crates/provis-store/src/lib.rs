//! Persistence for provis items.
//!
//! Items are persisted through pluggable backends ("sources") that all
//! implement the [`Backend`] trait, and are reached through the [`Store`]
//! facade, which owns the item type [`provis_schema::Registry`].
//!
//! # Backends
//!
//! - [`MemoryBackend`] -- in-process tables, for embedding and tests
//! - [`TestBackend`] -- an isolated, flushable memory backend with a call
//!   journal and store-failure injection
//! - [`FileBackend`] -- one JSON document per item in a directory
//!
//! # Design Rules
//!
//! 1. A uid must be registered before its record can be stored; storing an
//!    unregistered uid is a silent no-op, so removed items never come back.
//! 2. `find` is an exact-match AND over record fields; rows always start
//!    with the uid.
//! 3. Validation failures are reported by `Store::set` returning `false`,
//!    never as errors.

pub mod error;
pub mod file;
pub mod memory;
pub mod store;
pub mod testing;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use store::{SourceResolver, Store, StoreBuilder, DEFAULT_SOURCE};
pub use testing::{BackendCall, TestBackend};
pub use traits::{project, Backend, Criteria, Row};
