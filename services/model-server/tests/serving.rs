use std::path::{Path, PathBuf};

use model_server::types::PredictionResponse;
use model_server::{router, runtime_reload, AppState, ServeConfig, SharedState};
use modelops::{
    generate_sample_data, resolve, ForestParams, Model, ModelOpsError, RandomForest, Registry,
    RegistryConfig,
};
use serde_json::{json, Value};

const N_FEATURES: usize = 10;

fn offline_registry() -> Registry {
    Registry::local_only()
}

fn write_model(path: &Path, version: &str) {
    let (x, y) = generate_sample_data(100, N_FEATURES);
    let mut model = Model::new(RandomForest::new(ForestParams { n_estimators: 20, ..Default::default() }));
    model.train(&x, &y).unwrap();
    model.version = version.to_string();
    model.save(path).unwrap();
}

fn state_for(dir: &Path, model_version: Option<&str>) -> SharedState {
    let cfg = ServeConfig {
        host: "127.0.0.1".into(),
        port: 0,
        model_path: dir.join("serve/model.blob"),
        model_version: model_version.map(str::to_string),
        registry: RegistryConfig::local(dir.join("registry").to_string_lossy()),
    };
    AppState::new(cfg, offline_registry()).unwrap().shared()
}

async fn spawn(state: SharedState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn features() -> Value {
    json!({ "features": vec![0.5_f64; N_FEATURES] })
}

#[tokio::test]
async fn test_not_ready_before_load() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    let base = spawn(state.clone()).await;
    let client = reqwest::Client::new();

    let health: Value = client.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_version"], "unknown");
    assert_eq!(health["model_loaded"], false);

    let ready = client.get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 503);

    let predict = client.post(format!("{base}/predict")).json(&features()).send().await.unwrap();
    assert_eq!(predict.status(), 503);
    let body: Value = predict.json().await.unwrap();
    assert_eq!(body["error"], "Model not loaded");

    // still serving after the rejected calls
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();
    let ready = client.get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 200);
}

#[tokio::test]
async fn test_predict_contract() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();
    let base = spawn(state).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base}/predict")).json(&features()).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: PredictionResponse = resp.json().await.unwrap();
    assert!(body.prediction == 0 || body.prediction == 1);
    assert_eq!(body.probabilities.len(), 2);
    assert!((body.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert_eq!(body.model_version, "v1");

    let info: Value = client.get(format!("{base}/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(info["model_version"], "v1");
    assert_eq!(info["endpoints"]["predict"], "/predict");
}

#[tokio::test]
async fn test_bad_input_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();
    let base = spawn(state.clone()).await;
    let client = reqwest::Client::new();

    let cases = [
        json!({ "features": [1.0, 2.0] }),
        json!({ "features": ["a", "b"] }),
        json!({ "values": [1.0] }),
    ];
    for body in cases {
        let resp = client.post(format!("{base}/predict")).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 400, "{body}");
        let err: Value = resp.json().await.unwrap();
        assert!(err["error"].is_string());
    }

    let resp = client
        .post(format!("{base}/predict"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // the live model is untouched
    assert_eq!(state.runtime.version(), "v1");
    let resp = client.post(format!("{base}/predict")).json(&features()).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_concurrent_requests_are_all_counted() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();
    let base = spawn(state.clone()).await;
    let client = reqwest::Client::new();

    const N: u64 = 32;
    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let client = client.clone();
            let url = format!("{base}/predict");
            tokio::spawn(async move {
                let row = vec![i as f64 / N as f64 - 0.5; N_FEATURES];
                client.post(url).json(&json!({ "features": row })).send().await.unwrap().status()
            })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap(), 200);
    }

    assert_eq!(state.metrics.requests_total.with_label_values(&["v1"]).get(), N);
    let predicted: u64 = ["0", "1"]
        .iter()
        .map(|c| state.metrics.predictions_total.with_label_values(&["v1", c]).get())
        .sum();
    assert_eq!(predicted, N);

    let text = client.get(format!("{base}/metrics")).send().await.unwrap().text().await.unwrap();
    assert!(text.contains(&format!("ml_requests_total{{model_version=\"v1\"}} {N}")));
    assert!(text.contains("ml_request_duration_seconds_count{model_version=\"v1\"} 32"));
}

#[tokio::test]
async fn test_startup_without_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    let err = runtime_reload::startup_load(&state).await.unwrap_err();
    assert!(matches!(err, ModelOpsError::ModelNotFound(_)));
    assert!(!state.runtime.is_ready());
}

#[tokio::test]
async fn test_registry_miss_falls_back_to_local() {
    let dir = tempfile::tempdir().unwrap();
    // v9 was never published; the local file is used instead
    let state = state_for(dir.path(), Some("v9"));
    write_model(&state.cfg.model_path, "v-local");
    let version = runtime_reload::startup_load(&state).await.unwrap();
    assert_eq!(version, "v-local");
}

#[tokio::test]
async fn test_startup_pulls_version_from_registry() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), Some("v3"));
    let published: PathBuf = resolve("v3", &state.cfg.registry).as_str().into();
    write_model(&published, "v3");

    let version = runtime_reload::startup_load(&state).await.unwrap();
    assert_eq!(version, "v3");
    assert!(state.cfg.model_path.exists());
}

#[tokio::test]
async fn test_reload_swaps_model() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();

    let published: PathBuf = resolve("v2", &state.cfg.registry).as_str().into();
    write_model(&published, "v2");

    let held = state.runtime.current().unwrap();
    let base = spawn(state.clone()).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base}/reload")).json(&json!({ "version": "v2" })).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["previous_version"], "v1");
    assert_eq!(body["model_version"], "v2");

    // handle taken before the swap still points at the old artifact
    assert_eq!(held.version(), "v1");

    let pred: PredictionResponse =
        client.post(format!("{base}/predict")).json(&features()).send().await.unwrap().json().await.unwrap();
    assert_eq!(pred.model_version, "v2");
}

#[tokio::test]
async fn test_failed_reload_keeps_live_model() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_for(dir.path(), None);
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();
    std::fs::remove_file(&state.cfg.model_path).unwrap();

    let base = spawn(state.clone()).await;
    let resp = reqwest::Client::new().post(format!("{base}/reload")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(state.runtime.version(), "v1");
    assert!(state.runtime.is_ready());
}

fn published(state: &SharedState, version: &str) -> PathBuf {
    resolve(version, &state.cfg.registry).as_str().into()
}

async fn serving_v1(dir: &Path) -> (SharedState, String) {
    let state = state_for(dir, None);
    write_model(&state.cfg.model_path, "v1");
    runtime_reload::startup_load(&state).await.unwrap();
    let base = spawn(state.clone()).await;
    (state, base)
}

async fn post_reload(base: &str, version: &str) -> (reqwest::StatusCode, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/reload"))
        .json(&json!({ "version": version }))
        .send()
        .await
        .unwrap();
    (resp.status(), resp.json().await.unwrap())
}

fn assert_model_file_is(state: &SharedState, version: &str) {
    let on_disk = Model::<RandomForest>::load(&state.cfg.model_path).unwrap();
    assert_eq!(on_disk.version, version);
    assert!(!runtime_reload::staging_path(&state.cfg.model_path).exists());
}

#[tokio::test]
async fn test_reload_of_unpublished_version_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (state, base) = serving_v1(dir.path()).await;

    let (status, body) = post_reload(&base, "v2").await;
    assert_eq!(status, 404);
    assert!(body["error"].is_string());
    assert_eq!(state.runtime.version(), "v1");
    assert_model_file_is(&state, "v1");
}

#[tokio::test]
async fn test_corrupt_reload_leaves_model_file_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let (state, base) = serving_v1(dir.path()).await;

    let bad = published(&state, "v2");
    std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
    std::fs::write(&bad, b"not an artifact").unwrap();

    let (status, _) = post_reload(&base, "v2").await;
    assert_eq!(status, 500);
    assert_eq!(state.runtime.version(), "v1");
    assert_model_file_is(&state, "v1");

    // a restart from the same model path still comes up
    let restarted = state_for(dir.path(), None);
    assert_eq!(runtime_reload::startup_load(&restarted).await.unwrap(), "v1");
}

#[tokio::test]
async fn test_reload_rejects_mislabelled_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (state, base) = serving_v1(dir.path()).await;
    write_model(&published(&state, "v2"), "v7");

    let (status, body) = post_reload(&base, "v2").await;
    assert_eq!(status, 409);
    assert!(body["error"].as_str().unwrap().contains("v7"));
    assert_eq!(state.runtime.version(), "v1");
    assert_model_file_is(&state, "v1");
}

#[tokio::test]
async fn test_reload_rejects_path_like_version() {
    let dir = tempfile::tempdir().unwrap();
    let (state, base) = serving_v1(dir.path()).await;

    let (status, _) = post_reload(&base, "../../etc").await;
    assert_eq!(status, 400);
    assert_eq!(state.runtime.version(), "v1");
}

#[tokio::test]
async fn test_reload_promotes_verified_download() {
    let dir = tempfile::tempdir().unwrap();
    let (state, base) = serving_v1(dir.path()).await;
    write_model(&published(&state, "v2"), "v2");

    let (status, _) = post_reload(&base, "v2").await;
    assert_eq!(status, 200);
    assert_model_file_is(&state, "v2");
}
