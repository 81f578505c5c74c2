use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelOpsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),
    #[error("invalid registry path: {0}")]
    InvalidPath(String),
    #[error("model not found at {0}")]
    ModelNotFound(String),
    #[error("artifact already exists: {0}")]
    AlreadyExists(String),
    #[error("artifact version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },
    #[error("training failed: {0}")]
    TrainingFailed(#[source] Box<ModelOpsError>),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("model has not been trained")]
    NotTrained,
    #[error("corrupt artifact: {0}")]
    Corrupt(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Ser(String),
}

pub type Result<T> = std::result::Result<T, ModelOpsError>;

impl ModelOpsError {
    /// Wrap any failure of a training run. Already-wrapped errors pass through.
    pub fn training(err: ModelOpsError) -> Self {
        match err {
            e @ ModelOpsError::TrainingFailed(_) => e,
            e => ModelOpsError::TrainingFailed(Box::new(e)),
        }
    }
}

impl From<bincode::Error> for ModelOpsError {
    fn from(e: bincode::Error) -> Self {
        ModelOpsError::Ser(e.to_string())
    }
}

impl From<serde_json::Error> for ModelOpsError {
    fn from(e: serde_json::Error) -> Self {
        ModelOpsError::Ser(e.to_string())
    }
}
