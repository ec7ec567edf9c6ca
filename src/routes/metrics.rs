use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::simulator::SimulatorService;

use super::{auth::AuthService, utils, utils::ErrorResponse};

async fn get_metrics(
    headers: HeaderMap,
    State((simulator, service)): State<(SimulatorService, Arc<AuthService>)>,
) -> Result<impl IntoResponse, ErrorResponse> {
    utils::validate_auth(&headers, &service)?;
    Ok((StatusCode::OK, Json(simulator.metrics().await)))
}

async fn reset_demo(
    headers: HeaderMap,
    State((simulator, service)): State<(SimulatorService, Arc<AuthService>)>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let user = utils::validate_auth(&headers, &service)?;

    simulator.reset().await;
    tracing::info!("Demo data reset by {}", user);
    Ok((StatusCode::OK, Json(json!({ "status": "reset" }))))
}

pub fn metrics_routes(simulator: SimulatorService, service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/demo/reset", post(reset_demo))
        .with_state((simulator, service))
}
