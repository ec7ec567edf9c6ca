use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::utils::ErrorResponse;

// Shared password for every demo account
pub const DEMO_PASSWORD: &str = "ghostpay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Merchant,
    User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoUser {
    pub id: &'static str,
    pub username: &'static str,
    pub role: Role,
    pub api_key: &'static str,
}

static DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        id: "admin-1",
        username: "admin",
        role: Role::Admin,
        api_key: "gp_live_admin_9a8b7c6d5e4f3g2h1i",
    },
    DemoUser {
        id: "merchant-1",
        username: "merchant",
        role: Role::Merchant,
        api_key: "gp_live_merchant_1a2b3c4d5e6f7g8h9i",
    },
    DemoUser {
        id: "user-1",
        username: "user",
        role: Role::User,
        api_key: "gp_live_user_a1b2c3d4e5f6g7h8i9j",
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing API key")]
    MissingApiKey,
    #[error("Invalid API key")]
    InvalidApiKey,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingApiKey => "missing_api_key",
            AuthError::InvalidApiKey => "invalid_api_key",
        }
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        ErrorResponse::new(StatusCode::UNAUTHORIZED, err.code(), err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

// Hardcoded demo accounts, no real security
pub struct AuthService {
    require_api_key: bool,
}

impl AuthService {
    pub fn new(require_api_key: bool) -> Self {
        Self { require_api_key }
    }

    pub fn requires_api_key(&self) -> bool {
        self.require_api_key
    }

    pub fn login(&self, username: &str, password: &str) -> Result<&'static DemoUser, AuthError> {
        tracing::info!("Attempting to log in demo user: {}", username);

        let user = DEMO_USERS
            .iter()
            .find(|user| user.username == username)
            .ok_or(AuthError::InvalidCredentials)?;

        if password != DEMO_PASSWORD {
            tracing::warn!("Invalid credentials for user: {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    pub fn verify_api_key(&self, api_key: &str) -> Result<&'static DemoUser, AuthError> {
        DEMO_USERS
            .iter()
            .find(|user| user.api_key == api_key)
            .ok_or(AuthError::InvalidApiKey)
    }
}

// Route for exchanging demo credentials for an API key
pub async fn login_handler(
    State(service): State<Arc<AuthService>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let user = service.login(&req.username, &req.password)?;
    tracing::info!("Logged in as {}", user.username);
    Ok((StatusCode::OK, Json(user)))
}

pub fn auth_routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/login", post(login_handler))
        .with_state(service)
}
