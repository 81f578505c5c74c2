use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use modelops::{Registry, RegistryConfig, TrainOptions, DEFAULT_FEATURES, QUALITY_THRESHOLD};

/// Train a classifier, write the artifact and metrics, optionally publish them.
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Cli {
    /// Output directory for model artifacts
    #[arg(long, env = "MODEL_OUTPUT_DIR", default_value = "./models")]
    output_dir: PathBuf,

    /// Model version tag (default: v<UTC timestamp>)
    #[arg(long = "version", value_parser = parse_version)]
    model_version: Option<String>,

    /// Number of training samples
    #[arg(long, env = "TRAINING_SAMPLES", default_value_t = 1000)]
    samples: usize,

    /// Number of features per sample
    #[arg(long, default_value_t = DEFAULT_FEATURES)]
    features: usize,

    /// Upload model and metrics to the configured registry
    #[arg(long)]
    upload: bool,
}

fn parse_version(raw: &str) -> Result<String, String> {
    modelops::validate_version(raw).map_err(|e| e.to_string())?;
    Ok(raw.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("training failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Returns whether the model cleared the quality gate.
async fn run(cli: Cli) -> Result<bool> {
    let registry_cfg = RegistryConfig::from_env();
    let registry = Registry::from_env();

    let opts = TrainOptions {
        output_dir: cli.output_dir,
        version: cli.model_version,
        n_samples: cli.samples,
        n_features: cli.features,
        upload: cli.upload,
    };

    info!(?opts, "starting model training");
    let outcome = modelops::train_and_publish(&opts, &registry, &registry_cfg).await?;

    info!(
        version = %outcome.metrics.version,
        model = %outcome.model_path.display(),
        metrics = %outcome.metrics_path.display(),
        "{}",
        summary(&outcome.metrics)
    );

    if outcome.below_threshold() {
        warn!(
            test_score = outcome.metrics.test_score,
            threshold = QUALITY_THRESHOLD,
            "model performance is below threshold"
        );
        return Ok(false);
    }
    Ok(true)
}

fn summary(m: &modelops::TrainingMetrics) -> String {
    format!(
        "train_score={:.4} test_score={:.4} accuracy={:.4} n_samples={} n_features={}",
        m.train_score, m.test_score, m.accuracy, m.n_samples, m.n_features
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "trainer", "--output-dir", "/tmp/out", "--version", "v7", "--samples", "250", "--upload",
        ])
        .unwrap();
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.model_version.as_deref(), Some("v7"));
        assert_eq!(cli.samples, 250);
        assert_eq!(cli.features, DEFAULT_FEATURES);
        assert!(cli.upload);
    }

    #[test]
    fn test_cli_rejects_bad_samples() {
        assert!(Cli::try_parse_from(["trainer", "--samples", "many"]).is_err());
    }

    #[test]
    fn test_cli_rejects_path_like_version() {
        for bad in ["../x", "a/b", "..", ""] {
            assert!(Cli::try_parse_from(["trainer", "--version", bad]).is_err(), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn test_run_passes_gate() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            output_dir: dir.path().to_path_buf(),
            model_version: Some("v-gate".into()),
            samples: 200,
            features: 6,
            upload: false,
        };
        assert!(run(cli).await.unwrap());
        assert!(dir.path().join("model-v-gate.blob").exists());
        assert!(dir.path().join("metrics-v-gate.json").exists());
    }
}
