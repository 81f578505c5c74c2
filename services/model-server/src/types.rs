use axum::{http::StatusCode, Json};
use modelops::ModelOpsError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: msg.into() }))
}

pub fn not_loaded() -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::SERVICE_UNAVAILABLE, "Model not loaded")
}

/// Status for a failed model load.
pub fn load_error_status(err: &ModelOpsError) -> StatusCode {
    match err {
        ModelOpsError::NotFound(_) | ModelOpsError::ModelNotFound(_) => StatusCode::NOT_FOUND,
        ModelOpsError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ModelOpsError::VersionMismatch { .. } => StatusCode::CONFLICT,
        ModelOpsError::InvalidInput(_) | ModelOpsError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub features: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u32,
    pub probabilities: Vec<f64>,
    pub model_version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReloadRequest {
    pub version: Option<String>,
}
