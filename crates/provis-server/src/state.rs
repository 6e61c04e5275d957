use std::sync::Arc;
use std::time::Duration;

use provis_store::Store;

use crate::handles::HandleCache;
use crate::hooks::{ChangeEvent, ChangeHook, NoOpHook};

/// Shared state behind every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub handles: Arc<HandleCache>,
    pub hook: Arc<dyn ChangeHook>,
}

impl AppState {
    pub fn new(store: Store, handle_ttl: Duration) -> Self {
        Self {
            store: Arc::new(store),
            handles: Arc::new(HandleCache::new(handle_ttl)),
            hook: Arc::new(NoOpHook),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ChangeHook>) -> Self {
        self.hook = hook;
        self
    }

    pub(crate) async fn notify_saved(&self, event: ChangeEvent) {
        if let Err(e) = self.hook.on_saved(&event).await {
            tracing::warn!(uid = %event.uid, error = %e, "on_saved hook failed");
        }
    }

    pub(crate) async fn notify_removed(&self, event: ChangeEvent) {
        if let Err(e) = self.hook.on_removed(&event).await {
            tracing::warn!(uid = %event.uid, error = %e, "on_removed hook failed");
        }
    }
}
