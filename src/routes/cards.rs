use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::db::CardRequest;
use crate::simulator::SimulatorService;

use super::{auth::AuthService, utils, utils::ErrorResponse};

async fn create_card(
    headers: HeaderMap,
    State((simulator, service)): State<(SimulatorService, Arc<AuthService>)>,
    Json(mut request): Json<CardRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let user = utils::validate_auth(&headers, &service)?;

    utils::check_amount(&request.amount)?;
    request.currency = utils::normalize_currency(&request.currency)?;

    let card = simulator.issue_card(request).await;
    tracing::info!("Card {} issued by {}", card.id, user);
    Ok((StatusCode::OK, Json(card)))
}

async fn get_card(
    headers: HeaderMap,
    State((simulator, service)): State<(SimulatorService, Arc<AuthService>)>,
    Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    utils::validate_auth(&headers, &service)?;

    match simulator.get_card(&card_id).await {
        Ok(card) => Ok((StatusCode::OK, Json(card))),
        Err(err) => {
            tracing::warn!("Failed to retrieve card: {err}");
            Err(err.into())
        }
    }
}

pub fn card_routes(simulator: SimulatorService, service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/cards", post(create_card))
        .route("/cards/:id", get(get_card))
        .with_state((simulator, service))
}
