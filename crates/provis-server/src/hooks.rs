use async_trait::async_trait;
use tracing::info;

use crate::error::ServerResult;

/// An item that was just saved or removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub item_type: String,
    pub uid: String,
    pub name: String,
}

/// Trigger run after an item change has been persisted.
///
/// Hook failures are logged by the caller and never undo the change.
#[async_trait]
pub trait ChangeHook: Send + Sync {
    async fn on_saved(&self, event: &ChangeEvent) -> ServerResult<()>;
    async fn on_removed(&self, event: &ChangeEvent) -> ServerResult<()>;
}

pub struct NoOpHook;

#[async_trait]
impl ChangeHook for NoOpHook {
    async fn on_saved(&self, _event: &ChangeEvent) -> ServerResult<()> {
        Ok(())
    }

    async fn on_removed(&self, _event: &ChangeEvent) -> ServerResult<()> {
        Ok(())
    }
}

/// Logs every change at info level.
pub struct LoggingHook;

#[async_trait]
impl ChangeHook for LoggingHook {
    async fn on_saved(&self, event: &ChangeEvent) -> ServerResult<()> {
        info!(item_type = %event.item_type, uid = %event.uid, name = %event.name, "item saved");
        Ok(())
    }

    async fn on_removed(&self, event: &ChangeEvent) -> ServerResult<()> {
        info!(item_type = %event.item_type, uid = %event.uid, name = %event.name, "item removed");
        Ok(())
    }
}
