use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use modelops::RegistryConfig;

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    /// Version to pull from the registry at startup; local file only when unset.
    pub model_version: Option<String>,
    pub registry: RegistryConfig,
}

impl ServeConfig {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().with_context(|| format!("PORT is not a valid port: {raw}"))?,
            Err(_) => 8000,
        };
        let model_path = std::env::var("MODEL_PATH").unwrap_or_else(|_| "./models/model.blob".to_string());
        let model_version = std::env::var("MODEL_VERSION")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        // fail fast, fail loud
        if host.trim().is_empty() {
            bail!("HOST must not be empty");
        }
        if model_path.trim().is_empty() {
            bail!("MODEL_PATH must not be empty");
        }
        if let Some(v) = model_version.as_deref() {
            modelops::validate_version(v).context("MODEL_VERSION")?;
        }

        Ok(Self {
            host,
            port,
            model_path: PathBuf::from(model_path),
            model_version,
            registry: RegistryConfig::from_env(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
