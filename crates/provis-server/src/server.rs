use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::hooks::{ChangeHook, LoggingHook};
use crate::router::build_router;
use crate::state::AppState;

/// provis item server.
pub struct ProvisServer {
    config: ServerConfig,
    hook: Arc<dyn ChangeHook>,
}

impl ProvisServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            hook: Arc::new(LoggingHook),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ChangeHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the store and shared state from the configuration.
    pub fn state(&self) -> ServerResult<AppState> {
        let store = self.config.build_store()?;
        let ttl = Duration::from_secs(self.config.handle_ttl_secs);
        Ok(AppState::new(store, ttl).with_hook(Arc::clone(&self.hook)))
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        Ok(build_router(self.state()?))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            data_dir = ?self.config.data_dir,
            "provis server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
