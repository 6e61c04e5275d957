//! HTTP server for provis items.
//!
//! Exposes the [`provis_store::Store`] operations as a JSON API under `/v1`.
//! Items being created or edited live in a [`HandleCache`] until they are
//! saved; persisted changes are reported to a [`ChangeHook`].

pub mod config;
pub mod error;
pub mod handler;
pub mod handles;
pub mod hooks;
pub mod message;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handles::HandleCache;
pub use hooks::{ChangeEvent, ChangeHook, LoggingHook, NoOpHook};
pub use router::build_router;
pub use server::ProvisServer;
pub use state::AppState;
