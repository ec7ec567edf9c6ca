use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::db::ChargeRequest;
use crate::simulator::SimulatorService;

use super::{auth::AuthService, utils, utils::ErrorResponse};

// Accepts the charge and answers with it still pending; clients poll
// GET /charges/:id for the outcome.
async fn create_charge(
    headers: HeaderMap,
    State((simulator, service)): State<(SimulatorService, Arc<AuthService>)>,
    Json(mut request): Json<ChargeRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    tracing::info!("Starting charge creation for card {}", request.card_id);

    let user = utils::validate_auth(&headers, &service)?;
    utils::check_amount(&request.amount)?;
    request.currency = utils::normalize_currency(&request.currency)?;

    match simulator.create_charge(request).await {
        Ok(charge) => {
            tracing::info!("Charge {} accepted for {}", charge.id, user);
            Ok((StatusCode::OK, Json(charge)))
        }
        Err(err) => {
            tracing::warn!("Charge rejected: {err}");
            Err(err.into())
        }
    }
}

async fn get_charge(
    headers: HeaderMap,
    State((simulator, service)): State<(SimulatorService, Arc<AuthService>)>,
    Path(charge_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    utils::validate_auth(&headers, &service)?;

    match simulator.get_charge(&charge_id).await {
        Ok(charge) => Ok((StatusCode::OK, Json(charge))),
        Err(err) => {
            tracing::warn!("Failed to retrieve charge: {err}");
            Err(err.into())
        }
    }
}

pub fn charge_routes(simulator: SimulatorService, service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/charges", post(create_charge))
        .route("/charges/:id", get(get_charge))
        .with_state((simulator, service))
}
