use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};

use crate::state::SharedState;
use crate::types::{api_error, not_loaded, ApiResult, PredictionRequest, PredictionResponse};

pub async fn predict(
    State(st): State<SharedState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    // pin the model for the whole request; a concurrent reload does not affect it
    let live = st.runtime.current().ok_or_else(not_loaded)?;
    let version = live.version().to_string();

    st.metrics.requests_total.with_label_values(&[version.as_str()]).inc();
    let _timer = st.metrics.request_duration.with_label_values(&[version.as_str()]).start_timer();

    let Json(req) = payload
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e.body_text())))?;

    let rows = vec![req.features];
    let bad_input = |e: modelops::ModelOpsError| api_error(StatusCode::BAD_REQUEST, format!("Prediction error: {e}"));

    let prediction = live.model.predict(&rows).map_err(bad_input)?[0];
    let probabilities = live.model.predict_proba(&rows).map_err(bad_input)?.swap_remove(0);

    st.metrics
        .predictions_total
        .with_label_values(&[version.as_str(), prediction.to_string().as_str()])
        .inc();

    Ok(Json(PredictionResponse { prediction, probabilities, model_version: version }))
}
