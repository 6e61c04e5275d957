use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use provis_schema::{standard_registry, CatalogSettings};
use provis_store::{Backend, FileBackend, MemoryBackend, Store, DEFAULT_SOURCE};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory for the file backend. The memory backend is used when unset.
    pub data_dir: Option<PathBuf>,
    pub default_source: String,
    /// Seconds an unsaved item handle survives without being touched.
    pub handle_ttl_secs: u64,
    pub catalog: CatalogSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 25151)),
            data_dir: None,
            default_source: DEFAULT_SOURCE.to_string(),
            handle_ttl_secs: 3600,
            catalog: CatalogSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Build the store this configuration describes.
    pub fn build_store(&self) -> ServerResult<Store> {
        let registry = standard_registry(&self.catalog)?;
        let backend: Arc<dyn Backend> = match &self.data_dir {
            Some(dir) => Arc::new(FileBackend::new(dir)),
            None => Arc::new(MemoryBackend::new()),
        };
        Ok(Store::builder(registry)
            .source(self.default_source.clone(), backend)
            .default_source(self.default_source.clone())
            .build()?)
    }
}
