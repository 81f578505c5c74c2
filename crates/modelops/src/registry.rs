//! Registry naming: which backend a deployment publishes to, and where a
//! given version lives inside it.
//!
//! Resolution is pure: the same version and configuration always produce
//! the same [`RegistryPath`].

use std::fmt;
use std::path::PathBuf;

use crate::{ModelOpsError, Result};

pub const ARTIFACT_NAME: &str = "model.blob";
const METRICS_SUFFIX: &str = "-metrics.json";
const DEFAULT_BASE_PATH: &str = "models";
const DEFAULT_BUCKET: &str = "mlops-models";

/// Backend selected once, when configuration is parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryKind {
    Local { base_path: String },
    S3 { bucket: String },
    Gcs { bucket: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    pub kind: RegistryKind,
}

impl RegistryConfig {
    pub fn local(base_path: impl Into<String>) -> Self {
        Self { kind: RegistryKind::Local { base_path: base_path.into() } }
    }

    /// Build from `MODEL_REGISTRY_TYPE`, `MODEL_REGISTRY_PATH`, `S3_BUCKET`, `GCS_BUCKET`.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok();
        Self::from_parts(
            var("MODEL_REGISTRY_TYPE").as_deref(),
            var("MODEL_REGISTRY_PATH"),
            var("S3_BUCKET"),
            var("GCS_BUCKET"),
        )
    }

    /// An unrecognised registry type selects the local backend so existing
    /// deployments keep working; the fallback is logged, never silent.
    pub fn from_parts(
        registry_type: Option<&str>,
        base_path: Option<String>,
        s3_bucket: Option<String>,
        gcs_bucket: Option<String>,
    ) -> Self {
        let bucket = |b: Option<String>| b.unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let local = |p: Option<String>| RegistryKind::Local {
            base_path: p.unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
        };

        let kind = match registry_type.map(str::trim) {
            None | Some("") | Some("local") => local(base_path),
            Some("s3") => RegistryKind::S3 { bucket: bucket(s3_bucket) },
            Some("gcs") => RegistryKind::Gcs { bucket: bucket(gcs_bucket) },
            Some(other) => {
                tracing::warn!(
                    registry_type = other,
                    "unknown MODEL_REGISTRY_TYPE, falling back to local registry"
                );
                local(base_path)
            }
        };
        Self { kind }
    }
}

/// Parsed form of a [`RegistryPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    S3 { bucket: String, key: String },
    Gcs { bucket: String, object: String },
}

/// URI-like registry address: `s3://`, `gs://`, or a plain filesystem path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistryPath(String);

impl RegistryPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sidecar location for the metrics file: `.../model.blob` -> `.../model-metrics.json`.
    pub fn metrics_sidecar(&self) -> RegistryPath {
        let base = self.0.strip_suffix(".blob").unwrap_or(&self.0);
        RegistryPath(format!("{base}{METRICS_SUFFIX}"))
    }

    pub fn location(&self) -> Result<Location> {
        let raw = self.0.as_str();
        let Some((scheme, rest)) = raw.split_once("://") else {
            if raw.is_empty() {
                return Err(ModelOpsError::InvalidPath("empty path".into()));
            }
            return Ok(Location::Local(PathBuf::from(raw)));
        };

        let split = |rest: &str| -> Result<(String, String)> {
            match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                    Ok((bucket.to_string(), key.to_string()))
                }
                _ => Err(ModelOpsError::InvalidPath(raw.to_string())),
            }
        };

        match scheme {
            "s3" => {
                let (bucket, key) = split(rest)?;
                Ok(Location::S3 { bucket, key })
            }
            "gs" => {
                let (bucket, object) = split(rest)?;
                Ok(Location::Gcs { bucket, object })
            }
            "file" => Ok(Location::Local(PathBuf::from(rest))),
            other => Err(ModelOpsError::UnsupportedBackend(format!("{other}://"))),
        }
    }
}

impl fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A version names exactly one path segment under the registry base and
/// the output directory: non-empty, no separators, no `..`, no whitespace
/// padding or control characters.
pub fn validate_version(version: &str) -> Result<()> {
    let valid = !version.is_empty()
        && version.trim() == version
        && !version.contains(['/', '\\'])
        && !version.contains("..")
        && !version.chars().any(char::is_control);
    if valid {
        Ok(())
    } else {
        Err(ModelOpsError::InvalidInput(format!("invalid model version {version:?}")))
    }
}

/// Map a version to its registry location.
pub fn resolve(version: &str, cfg: &RegistryConfig) -> RegistryPath {
    match &cfg.kind {
        RegistryKind::S3 { bucket } => {
            RegistryPath(format!("s3://{bucket}/models/{version}/{ARTIFACT_NAME}"))
        }
        RegistryKind::Gcs { bucket } => {
            RegistryPath(format!("gs://{bucket}/models/{version}/{ARTIFACT_NAME}"))
        }
        RegistryKind::Local { base_path } => {
            let base = base_path.trim_end_matches('/');
            RegistryPath(format!("{base}/{version}/{ARTIFACT_NAME}"))
        }
    }
}
