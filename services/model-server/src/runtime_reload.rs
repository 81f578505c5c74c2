use std::path::{Path, PathBuf};

use modelops::{resolve, Model, ModelOpsError, RandomForest, Registry};
use tracing::{info, warn};

use crate::config::ServeConfig;
use crate::runtime::LoadedModel;
use crate::state::SharedState;

/// What a load does when the requested version cannot be fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Warn and serve whatever is already at the model path (startup).
    LocalFile,
    /// Report the failure (operator-requested reload).
    Fail,
}

/// Sibling of the model path that receives downloads until they verify.
pub fn staging_path(model_path: &Path) -> PathBuf {
    let name = model_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    model_path.with_file_name(format!("{name}.incoming"))
}

async fn read_model(path: &Path) -> Result<Model, ModelOpsError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || Model::<RandomForest>::load(&owned))
        .await
        .map_err(|e| std::io::Error::other(format!("model load task failed: {e}")))?
        .map_err(|e| match e {
            ModelOpsError::NotFound(_) => ModelOpsError::ModelNotFound(path.display().to_string()),
            other => other,
        })
}

/// Download `version` to the staging path and check it deserialises and
/// carries the version it was published under.
async fn fetch_version(
    cfg: &ServeConfig,
    registry: &Registry,
    version: &str,
    staging: &Path,
) -> Result<Model, ModelOpsError> {
    let remote = resolve(version, &cfg.registry);
    registry.download(&remote, staging).await?;
    let model = read_model(staging).await?;
    if model.version != version {
        return Err(ModelOpsError::VersionMismatch { expected: version.to_string(), found: model.version });
    }
    Ok(model)
}

/// Loading step. Without a version, deserialise the model path. With one,
/// fetch it from the registry into a staging file; only a verified artifact
/// replaces the model path, so a bad download never damages the file the
/// process restarts from.
pub async fn load_model(
    cfg: &ServeConfig,
    registry: &Registry,
    version: Option<&str>,
    fallback: Fallback,
) -> Result<LoadedModel, ModelOpsError> {
    let model_path = &cfg.model_path;
    let Some(version) = version else {
        let model = read_model(model_path).await?;
        info!(version = %model.version, path = %model_path.display(), "model loaded");
        return Ok(LoadedModel::new(model));
    };

    let staging = staging_path(model_path);
    match fetch_version(cfg, registry, version, &staging).await {
        Ok(model) => {
            tokio::fs::rename(&staging, model_path).await?;
            info!(%version, path = %model_path.display(), "model loaded from registry");
            Ok(LoadedModel::new(model))
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&staging).await;
            if fallback == Fallback::Fail {
                return Err(e);
            }
            warn!(
                %version,
                error = %e,
                path = %model_path.display(),
                "could not fetch from registry, using local model"
            );
            let model = read_model(model_path).await?;
            if model.version != version {
                warn!(requested = %version, loaded = %model.version, "local model does not match requested version");
            }
            Ok(LoadedModel::new(model))
        }
    }
}

/// Run a load and install the result. On failure the live model (if any)
/// stays in place. Returns `(previous_version, new_version)`.
pub async fn reload(
    state: &SharedState,
    version: Option<&str>,
    fallback: Fallback,
) -> Result<(Option<String>, String), ModelOpsError> {
    let _guard = state.load_lock.lock().await;

    state.runtime.mark_loading();
    match load_model(&state.cfg, &state.registry, version, fallback).await {
        Ok(loaded) => {
            let new_version = loaded.version().to_string();
            let previous = state.runtime.install(loaded).map(|p| p.version().to_string());
            info!(previous = ?previous, current = %new_version, "model installed");
            Ok((previous, new_version))
        }
        Err(e) => {
            state.runtime.mark_failed(e.to_string());
            Err(e)
        }
    }
}

/// Startup load of `MODEL_VERSION`; the caller treats an error as fatal.
pub async fn startup_load(state: &SharedState) -> Result<String, ModelOpsError> {
    let version = state.cfg.model_version.clone();
    reload(state, version.as_deref(), Fallback::LocalFile).await.map(|(_, v)| v)
}
