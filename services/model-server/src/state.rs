use std::sync::Arc;

use modelops::Registry;

use crate::config::ServeConfig;
use crate::metrics::ServingMetrics;
use crate::runtime::ModelRuntime;

pub type SharedState = Arc<AppState>;

/// Everything a request handler needs; one per server instance.
pub struct AppState {
    pub cfg: ServeConfig,
    pub registry: Registry,
    pub runtime: ModelRuntime,
    pub metrics: ServingMetrics,
    /// Serialises loads so two reloads never race on the download path.
    pub load_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(cfg: ServeConfig, registry: Registry) -> anyhow::Result<Self> {
        Ok(Self {
            cfg,
            registry,
            runtime: ModelRuntime::new(),
            metrics: ServingMetrics::new()?,
            load_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
