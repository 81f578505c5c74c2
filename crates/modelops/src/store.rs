use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, ObjectStore, PutMode, PutPayload};

use crate::gcs::GcsStore;
use crate::registry::{Location, RegistryPath};
use crate::s3::S3Store;
use crate::{ModelOpsError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Whole-file transfer between the local filesystem and one backend.
/// Calls complete (or fail) before returning; there is no retry.
///
/// `put` publishes: it never replaces an object that already exists.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn put(&self, local: &Path, remote: &Location) -> Result<()>;
    async fn get(&self, remote: &Location, local: &Path) -> Result<()>;
}

pub(crate) fn wrong_backend(store: &str, remote: &Location) -> ModelOpsError {
    ModelOpsError::UnsupportedBackend(format!("{store} store cannot address {remote:?}"))
}

/// Read a source file, reporting a missing file as `NotFound`.
pub(crate) async fn read_source(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(b) => Ok(b),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ModelOpsError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let name = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    dest.with_file_name(format!(".{name}.partial"))
}

fn parent_dir(dest: &Path) -> &Path {
    dest.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
}

async fn ensure_parent(dest: &Path) -> Result<()> {
    tokio::fs::create_dir_all(parent_dir(dest)).await?;
    Ok(())
}

/// Write `bytes` next to `dest` and rename into place, so readers never see
/// a truncated file. Replaces whatever was at `dest`.
pub(crate) async fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(dest).await?;
    let tmp = partial_path(dest);
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    tokio::fs::rename(&tmp, dest).await?;
    Ok(())
}

/// Create `dest` with `bytes`, failing with `AlreadyExists` if it is already
/// there. The file appears complete or not at all.
pub(crate) fn write_new_blocking(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(dest);
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(dest).map_err(|e| match e.error.kind() {
        std::io::ErrorKind::AlreadyExists => ModelOpsError::AlreadyExists(dest.display().to_string()),
        _ => ModelOpsError::Io(e.error),
    })?;
    Ok(())
}

pub(crate) async fn write_new(dest: &Path, bytes: Vec<u8>) -> Result<()> {
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || write_new_blocking(&dest, &bytes))
        .await
        .map_err(|e| std::io::Error::other(format!("write task failed: {e}")))?
}

pub(crate) fn map_object_error(err: object_store::Error, uri: &str) -> ModelOpsError {
    match err {
        object_store::Error::NotFound { .. } => ModelOpsError::NotFound(uri.to_string()),
        object_store::Error::AlreadyExists { .. } | object_store::Error::Precondition { .. } => {
            ModelOpsError::AlreadyExists(uri.to_string())
        }
        other => ModelOpsError::StoreUnavailable(format!("{uri}: {other}")),
    }
}

/// Create-only upload of a local file to an object store.
pub(crate) async fn put_object(store: &dyn ObjectStore, key: &str, local: &Path, uri: &str) -> Result<()> {
    let body = read_source(local).await?;
    store
        .put_opts(&ObjectPath::from(key), PutPayload::from(body), PutMode::Create.into())
        .await
        .map_err(|e| map_object_error(e, uri))?;
    Ok(())
}

pub(crate) async fn get_object(store: &dyn ObjectStore, key: &str, local: &Path, uri: &str) -> Result<()> {
    let bytes = store
        .get(&ObjectPath::from(key))
        .await
        .map_err(|e| map_object_error(e, uri))?
        .bytes()
        .await
        .map_err(|e| map_object_error(e, uri))?;
    write_atomically(local, &bytes).await
}

/// Plain filesystem copy.
#[derive(Clone, Debug, Default)]
pub struct LocalStore;

#[async_trait]
impl ArtifactStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, local: &Path, remote: &Location) -> Result<()> {
        let Location::Local(dest) = remote else { return Err(wrong_backend(self.name(), remote)) };
        let bytes = read_source(local).await?;
        write_new(dest, bytes).await
    }

    async fn get(&self, remote: &Location, local: &Path) -> Result<()> {
        let Location::Local(src) = remote else { return Err(wrong_backend(self.name(), remote)) };
        let bytes = read_source(src).await?;
        write_atomically(local, &bytes).await
    }
}

/// Dispatches registry paths to the matching backend.
pub struct Registry {
    local: LocalStore,
    s3: Option<S3Store>,
    gcs: Option<GcsStore>,
}

impl Registry {
    pub fn new(s3: Option<S3Store>, gcs: Option<GcsStore>) -> Self {
        Self { local: LocalStore, s3, gcs }
    }

    /// Filesystem paths only; remote locations report `StoreUnavailable`.
    pub fn local_only() -> Self {
        Self::new(None, None)
    }

    /// Remote backends pick up credentials through the provider default
    /// chains; `REGISTRY_TIMEOUT_SECS` bounds every remote request.
    pub fn from_env() -> Self {
        let timeout = std::env::var("REGISTRY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let options = ClientOptions::new().with_timeout(Duration::from_secs(timeout));
        Self::new(Some(S3Store::from_env(options.clone())), Some(GcsStore::from_env(options)))
    }

    fn backend(&self, loc: &Location) -> Result<&dyn ArtifactStore> {
        let unconfigured = |name: &str| ModelOpsError::StoreUnavailable(format!("no {name} backend configured"));
        Ok(match loc {
            Location::Local(_) => &self.local,
            Location::S3 { .. } => self.s3.as_ref().ok_or_else(|| unconfigured("s3"))?,
            Location::Gcs { .. } => self.gcs.as_ref().ok_or_else(|| unconfigured("gcs"))?,
        })
    }

    pub async fn upload(&self, local: &Path, remote: &RegistryPath) -> Result<()> {
        let loc = remote.location()?;
        let store = self.backend(&loc)?;
        store.put(local, &loc).await?;
        tracing::info!(backend = store.name(), from = %local.display(), to = %remote, "uploaded artifact");
        Ok(())
    }

    pub async fn download(&self, remote: &RegistryPath, local: &Path) -> Result<()> {
        let loc = remote.location()?;
        let store = self.backend(&loc)?;
        store.get(&loc, local).await?;
        tracing::info!(backend = store.name(), from = %remote, to = %local.display(), "downloaded artifact");
        Ok(())
    }
}
