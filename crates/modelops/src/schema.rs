use serde::{Deserialize, Serialize};

/// Version carried by a model that has not been tagged by a training run.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Held-out score below which a run is reported as below threshold.
pub const QUALITY_THRESHOLD: f64 = 0.5;

pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_FEATURES: usize = 20;

/// Scores produced by `Classifier::train`, before the run is tagged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub train_score: f64,
    pub test_score: f64,
    pub accuracy: f64,
    pub n_samples: usize,
    pub n_features: usize,
}

/// Metrics sidecar written next to every artifact: metrics-<version>.json
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_score: f64,
    pub test_score: f64,
    pub accuracy: f64,
    pub n_samples: usize,
    pub n_features: usize,
    pub version: String,
    pub timestamp: String,          // RFC 3339, UTC
}

impl TrainingMetrics {
    pub fn new(report: FitReport, version: &str, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            train_score: report.train_score,
            test_score: report.test_score,
            accuracy: report.accuracy,
            n_samples: report.n_samples,
            n_features: report.n_features,
            version: version.to_string(),
            timestamp: timestamp.to_rfc3339(),
        }
    }

    pub fn below_threshold(&self) -> bool {
        self.test_score < QUALITY_THRESHOLD
    }
}

/// Artifact file name inside a training output directory.
pub fn artifact_file_name(version: &str) -> String {
    format!("model-{version}.blob")
}

/// Metrics file name inside a training output directory.
pub fn metrics_file_name(version: &str) -> String {
    format!("metrics-{version}.json")
}
