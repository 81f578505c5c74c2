//! Training run: generate data, fit, tag, persist, optionally publish.

use std::path::PathBuf;

use crate::artifact::Model;
use crate::dataset::generate_sample_data;
use crate::forest::RandomForest;
use crate::registry::{resolve, validate_version, RegistryConfig, RegistryPath};
use crate::schema::{artifact_file_name, metrics_file_name, TrainingMetrics, DEFAULT_FEATURES, DEFAULT_SAMPLES};
use crate::store::{write_new, Registry};
use crate::{ModelOpsError, Result};

#[derive(Clone, Debug)]
pub struct TrainOptions {
    pub output_dir: PathBuf,
    pub version: Option<String>,
    pub n_samples: usize,
    pub n_features: usize,
    pub upload: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./models"),
            version: None,
            n_samples: DEFAULT_SAMPLES,
            n_features: DEFAULT_FEATURES,
            upload: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrainOutcome {
    pub metrics: TrainingMetrics,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    pub registry_path: Option<RegistryPath>,
}

impl TrainOutcome {
    /// Held-out score is under the rollout threshold; the caller decides what to do.
    pub fn below_threshold(&self) -> bool {
        self.metrics.below_threshold()
    }
}

/// `v<YYYYmmdd-HHMMSS>` in UTC.
pub fn synthesize_version(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("v{}", now.format("%Y%m%d-%H%M%S"))
}

/// Any failure is reported as `TrainingFailed` wrapping the cause.
pub async fn train_and_publish(
    opts: &TrainOptions,
    registry: &Registry,
    registry_cfg: &RegistryConfig,
) -> Result<TrainOutcome> {
    run(opts, registry, registry_cfg).await.map_err(ModelOpsError::training)
}

async fn run(opts: &TrainOptions, registry: &Registry, registry_cfg: &RegistryConfig) -> Result<TrainOutcome> {
    let version = match opts.version.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => synthesize_version(chrono::Utc::now()),
    };
    validate_version(&version)?;

    let model_path = opts.output_dir.join(artifact_file_name(&version));
    let metrics_path = opts.output_dir.join(metrics_file_name(&version));
    // `save` re-checks atomically
    if tokio::fs::try_exists(&model_path).await? {
        return Err(ModelOpsError::AlreadyExists(model_path.display().to_string()));
    }

    tracing::info!(samples = opts.n_samples, features = opts.n_features, %version, "generating training data");
    let (x, y) = generate_sample_data(opts.n_samples, opts.n_features);

    // fitting and the artifact write are blocking; keep them off the async workers
    let report = {
        let version = version.clone();
        let model_path = model_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut model: Model<RandomForest> = Model::default();
            let report = model.train(&x, &y)?;
            model.version = version;
            model.save(&model_path)?;
            Ok::<_, ModelOpsError>(report)
        })
        .await
        .map_err(|e| std::io::Error::other(format!("training task failed: {e}")))??
    };
    tracing::info!(path = %model_path.display(), %version, "saved model artifact");

    let metrics = TrainingMetrics::new(report, &version, chrono::Utc::now());
    write_new(&metrics_path, serde_json::to_vec_pretty(&metrics)?).await?;
    tracing::info!(
        train_score = metrics.train_score,
        test_score = metrics.test_score,
        accuracy = metrics.accuracy,
        path = %metrics_path.display(),
        "training completed"
    );

    let registry_path = if opts.upload {
        let dest = resolve(&version, registry_cfg);
        registry.upload(&model_path, &dest).await?;
        registry.upload(&metrics_path, &dest.metrics_sidecar()).await?;
        tracing::info!(registry_path = %dest, "model published");
        Some(dest)
    } else {
        None
    };

    Ok(TrainOutcome { metrics, model_path, metrics_path, registry_path })
}
