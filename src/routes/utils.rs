use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::simulator::SimulatorError;

use super::auth::{AuthError, AuthService, DemoUser};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// JSON error returned by every route: `{"code": ..., "message": ...}`.
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    body: ErrorBody,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<SimulatorError> for ErrorResponse {
    fn from(err: SimulatorError) -> Self {
        let status = match err {
            SimulatorError::CardNotFound(_) | SimulatorError::ChargeNotFound(_) => StatusCode::NOT_FOUND,
            SimulatorError::CardNotActive { .. } | SimulatorError::CardBusy(_) => StatusCode::CONFLICT,
        };
        ErrorResponse::new(status, err.code(), err.to_string())
    }
}

/// Resolves the caller's demo account from `Authorization: Bearer <key>`.
/// Returns `None` when API keys are not enforced.
#[inline]
pub fn validate_api_key(
    headers: &HeaderMap,
    service: &AuthService,
) -> Result<Option<&'static DemoUser>, ErrorResponse> {
    if !service.requires_api_key() {
        return Ok(None);
    }

    let api_key = match headers.get(header::AUTHORIZATION).map(|value| value.to_str()) {
        Some(Ok(value)) => value.strip_prefix("Bearer ").unwrap_or(value).trim(),
        _ => {
            return Err(AuthError::MissingApiKey.into());
        }
    };

    match service.verify_api_key(api_key) {
        Ok(user) => Ok(Some(user)),
        Err(err) => {
            tracing::warn!("Rejected API key: {err}");
            Err(err.into())
        }
    }
}

/// Like [`validate_api_key`], reduced to the caller's name for logging.
#[inline]
pub fn validate_auth(headers: &HeaderMap, service: &AuthService) -> Result<&'static str, ErrorResponse> {
    Ok(validate_api_key(headers, service)?
        .map(|user| user.username)
        .unwrap_or("anonymous"))
}

#[inline]
pub fn check_amount(amount: &Decimal) -> Result<(), ErrorResponse> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(ErrorResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_amount",
            "Amount must be greater than zero",
        ));
    }
    Ok(())
}

/// Accepts three-letter ISO style codes and returns them upper-cased.
#[inline]
pub fn normalize_currency(currency: &str) -> Result<String, ErrorResponse> {
    let currency = currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ErrorResponse::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_currency",
            format!("Unsupported currency code: {currency}"),
        ));
    }
    Ok(currency.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn amount_must_be_positive() {
        assert!(check_amount(&Decimal::new(1, 2)).is_ok());
        assert_eq!(check_amount(&Decimal::ZERO).unwrap_err().status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(check_amount(&Decimal::new(-5, 0)).is_err());
    }

    #[test]
    fn currency_codes_are_normalized() {
        assert_eq!(normalize_currency(" usd ").unwrap(), "USD");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("U$D").is_err());
    }

    #[test]
    fn api_key_accepts_bearer_and_raw_forms() {
        let service = AuthService::new(true);
        let mut headers = HeaderMap::new();

        assert_eq!(
            validate_api_key(&headers, &service).unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer gp_live_user_a1b2c3d4e5f6g7h8i9j"),
        );
        assert_eq!(validate_api_key(&headers, &service).unwrap().unwrap().username, "user");

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("gp_live_admin_9a8b7c6d5e4f3g2h1i"),
        );
        assert_eq!(validate_api_key(&headers, &service).unwrap().unwrap().username, "admin");
    }

    #[test]
    fn keys_are_optional_when_not_enforced() {
        let service = AuthService::new(false);
        assert!(validate_api_key(&HeaderMap::new(), &service).unwrap().is_none());
    }

    #[test]
    fn simulator_errors_map_to_http_statuses() {
        let not_found: ErrorResponse = SimulatorError::CardNotFound("card_x".to_string()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let busy: ErrorResponse = SimulatorError::CardBusy("card_x".to_string()).into();
        assert_eq!(busy.status(), StatusCode::CONFLICT);
    }
}
