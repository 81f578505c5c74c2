pub mod config;
pub mod metrics;
pub mod runtime;
pub mod runtime_reload;
pub mod routes_predict;
pub mod routes_runtime;
pub mod state;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::ServeConfig;
pub use state::{AppState, SharedState};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes_runtime::root))
        .route("/health", get(routes_runtime::health))
        .route("/ready", get(routes_runtime::ready))
        .route("/metrics", get(routes_runtime::metrics))
        .route("/predict", post(routes_predict::predict))
        .route("/reload", post(routes_runtime::reload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
