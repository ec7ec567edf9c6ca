use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CHARGE_ID_PREFIX: &str = "ch_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: String,
    pub card_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Pending,
    Completed,
    Failed,
}

impl ChargeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChargeStatus::Pending)
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeStatus::Pending => write!(f, "pending"),
            ChargeStatus::Completed => write!(f, "completed"),
            ChargeStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub card_id: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Outcome drawn for a pending charge once its settlement delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved,
    Declined,
}

impl Charge {
    pub fn pending(id: String, request: ChargeRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            card_id: request.card_id,
            amount: request.amount,
            currency: request.currency,
            status: ChargeStatus::Pending,
            created_at: now,
            completed_at: None,
            metadata: request.metadata,
        }
    }

    /// Moves a pending charge to its terminal state. A charge that already
    /// settled is left as is and `false` is returned.
    pub fn settle(&mut self, outcome: ChargeOutcome, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match outcome {
            ChargeOutcome::Approved => {
                self.status = ChargeStatus::Completed;
                self.completed_at = Some(at);
            }
            ChargeOutcome::Declined => {
                self.status = ChargeStatus::Failed;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn charge() -> Charge {
        let request = ChargeRequest {
            card_id: "card_abc".to_string(),
            amount: Decimal::new(5000, 2),
            currency: "USD".to_string(),
            metadata: None,
        };
        Charge::pending(
            "ch_abc".to_string(),
            request,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn approved_charge_completes_with_timestamp() {
        let mut charge = charge();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 2).unwrap();

        assert!(charge.settle(ChargeOutcome::Approved, at));
        assert_eq!(charge.status, ChargeStatus::Completed);
        assert_eq!(charge.completed_at, Some(at));
    }

    #[test]
    fn declined_charge_fails_without_completion_time() {
        let mut charge = charge();

        assert!(charge.settle(ChargeOutcome::Declined, Utc::now()));
        assert_eq!(charge.status, ChargeStatus::Failed);
        assert!(charge.completed_at.is_none());
    }

    #[test]
    fn settled_charge_never_reverts() {
        let mut charge = charge();
        charge.settle(ChargeOutcome::Declined, Utc::now());

        assert!(!charge.settle(ChargeOutcome::Approved, Utc::now()));
        assert_eq!(charge.status, ChargeStatus::Failed);
    }

    #[test]
    fn request_accepts_numeric_amounts() {
        let request: ChargeRequest =
            serde_json::from_str(r#"{"cardId":"card_x","amount":50,"currency":"USD"}"#).unwrap();
        assert_eq!(request.amount, Decimal::new(50, 0));
        assert!(request.metadata.is_none());
    }
}
