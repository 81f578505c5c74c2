use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::runtime_reload::Fallback;
use crate::state::SharedState;
use crate::types::{api_error, load_error_status, not_loaded, ApiResult, ReloadRequest};

pub async fn root(State(st): State<SharedState>) -> Json<Value> {
    Json(json!({
        "name": "MLOps Model Serving API",
        "version": env!("CARGO_PKG_VERSION"),
        "model_version": st.runtime.version(),
        "endpoints": {
            "health": "/health",
            "ready": "/ready",
            "predict": "/predict",
            "metrics": "/metrics",
            "reload": "/reload",
        }
    }))
}

/// Liveness: always 200.
pub async fn health(State(st): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_version": st.runtime.version(),
        "model_loaded": st.runtime.is_ready(),
        "runtime": st.runtime.status(),
    }))
}

/// Readiness: 503 until a model is installed.
pub async fn ready(State(st): State<SharedState>) -> ApiResult<Json<Value>> {
    let live = st.runtime.current().ok_or_else(not_loaded)?;
    Ok(Json(json!({ "status": "ready", "model_version": live.version() })))
}

pub async fn metrics(State(st): State<SharedState>) -> Response {
    match st.metrics.render() {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response(),
    }
}

/// Re-run the load and swap the live model. Without a body the configured
/// `MODEL_VERSION` is used. A requested version must come from the registry;
/// there is no fallback to the local file.
pub async fn reload(
    State(st): State<SharedState>,
    body: Option<Json<ReloadRequest>>,
) -> ApiResult<Json<Value>> {
    let requested = body
        .and_then(|Json(r)| r.version)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| st.cfg.model_version.clone());

    if let Some(v) = requested.as_deref() {
        modelops::validate_version(v).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    }

    match crate::runtime_reload::reload(&st, requested.as_deref(), Fallback::Fail).await {
        Ok((previous, current)) => Ok(Json(json!({
            "status": "reloaded",
            "previous_version": previous,
            "model_version": current,
        }))),
        Err(e) => {
            let status = load_error_status(&e);
            tracing::error!(error = %e, %status, "model reload failed");
            Err(api_error(status, e.to_string()))
        }
    }
}
