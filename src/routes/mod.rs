pub mod auth;
pub mod cards;
pub mod charges;
pub mod metrics;
pub mod notifications;
pub mod utils;

use std::sync::Arc;

use axum::Router;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, validate_request::ValidateRequestHeaderLayer};

use crate::simulator::{BroadcastNotifier, SimulatorService};

use auth::AuthService;

pub fn build_router(
    simulator: SimulatorService,
    service: Arc<AuthService>,
    notifier: Arc<BroadcastNotifier>,
) -> Router {
    let auth_routes = auth::auth_routes(service.clone());
    let card_routes = cards::card_routes(simulator.clone(), service.clone())
        .route_layer(ValidateRequestHeaderLayer::accept("application/json"));
    let charge_routes = charges::charge_routes(simulator.clone(), service.clone())
        .route_layer(ValidateRequestHeaderLayer::accept("application/json"));
    let metrics_routes = metrics::metrics_routes(simulator, service)
        .route_layer(CompressionLayer::new().gzip(true));
    let notification_routes = notifications::notification_routes(notifier);

    let api = Router::new()
        .merge(auth_routes)
        .merge(card_routes)
        .merge(charge_routes)
        .merge(metrics_routes)
        .merge(notification_routes);

    Router::new()
        .nest("/v1", api)
        .layer(RequestBodyLimitLayer::new(64 * 1024)) // 64KB limit
}
