use std::sync::Arc;

use arc_swap::ArcSwapOption;
use modelops::Model;
use parking_lot::Mutex;
use serde::Serialize;

pub const UNKNOWN_VERSION: &str = "unknown";

/// An artifact deserialised into memory. Never mutated after construction.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: Model,
    pub loaded_at: u64,
}

impl LoadedModel {
    pub fn new(model: Model) -> Self {
        Self { model, loaded_at: ModelRuntime::now() }
    }

    pub fn version(&self) -> &str {
        &self.model.version
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase")]
pub enum RuntimeStatus {
    Empty,
    Loading { started_at: u64 },
    Ready { loaded_at: u64 },
    Failed { error: String, failed_at: u64 },
}

/// Holds the live model.
///
/// Readers load the `Arc` without locking; installing a model swaps the
/// whole `Arc`, so an in-flight request keeps the model it started with.
pub struct ModelRuntime {
    current: ArcSwapOption<LoadedModel>,
    status: Mutex<RuntimeStatus>,
}

impl Default for ModelRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRuntime {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            status: Mutex::new(RuntimeStatus::Empty),
        }
    }

    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.current.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn version(&self) -> String {
        self.current()
            .map(|m| m.version().to_string())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    pub fn status(&self) -> RuntimeStatus {
        self.status.lock().clone()
    }

    pub fn mark_loading(&self) {
        *self.status.lock() = RuntimeStatus::Loading { started_at: Self::now() };
    }

    /// A failed load keeps whatever model is already live.
    pub fn mark_failed(&self, error: String) {
        let mut status = self.status.lock();
        *status = match self.current() {
            Some(live) => RuntimeStatus::Ready { loaded_at: live.loaded_at },
            None => RuntimeStatus::Failed { error, failed_at: Self::now() },
        };
    }

    /// Swap in a new model, returning the one it replaced.
    pub fn install(&self, model: LoadedModel) -> Option<Arc<LoadedModel>> {
        let loaded_at = model.loaded_at;
        let previous = self.current.swap(Some(Arc::new(model)));
        *self.status.lock() = RuntimeStatus::Ready { loaded_at };
        previous
    }

    pub fn now() -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(version: &str) -> LoadedModel {
        let mut m: Model = Model::default();
        m.version = version.to_string();
        LoadedModel::new(m)
    }

    #[test]
    fn test_empty_runtime() {
        let rt = ModelRuntime::new();
        assert!(!rt.is_ready());
        assert_eq!(rt.version(), "unknown");
        assert!(matches!(rt.status(), RuntimeStatus::Empty));
    }

    #[test]
    fn test_install_swaps_whole_handle() {
        let rt = ModelRuntime::new();
        assert!(rt.install(model("v1")).is_none());
        let held = rt.current().unwrap();

        let prev = rt.install(model("v2")).unwrap();
        assert_eq!(prev.version(), "v1");
        // a reader that grabbed the handle earlier still sees the old artifact
        assert_eq!(held.version(), "v1");
        assert_eq!(rt.version(), "v2");
    }

    #[test]
    fn test_failed_reload_keeps_ready() {
        let rt = ModelRuntime::new();
        rt.mark_failed("boom".into());
        assert!(matches!(rt.status(), RuntimeStatus::Failed { .. }));

        rt.install(model("v1"));
        rt.mark_loading();
        rt.mark_failed("boom".into());
        assert!(matches!(rt.status(), RuntimeStatus::Ready { .. }));
        assert!(rt.is_ready());
    }
}
