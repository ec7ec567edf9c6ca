use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::utils;

pub const CARD_ID_PREFIX: &str = "card_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub card_number: String,
    pub masked_number: String,
    pub expiry_date: String,
    pub expires_at: DateTime<Utc>,
    pub cvv: String,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(rename = "meta", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Used,
    Expired,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardStatus::Active => write!(f, "active"),
            CardStatus::Used => write!(f, "used"),
            CardStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRequest {
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Fabricated card details, produced by the entropy source.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub card_number: String,
    pub cvv: String,
}

impl Card {
    pub fn issue(
        id: String,
        details: CardDetails,
        metadata: Option<HashMap<String, serde_json::Value>>,
        now: DateTime<Utc>,
    ) -> Self {
        // one month out, clamped to the last day of the month when needed
        let expires_at = now.checked_add_months(Months::new(1)).unwrap_or(now);

        Self {
            id,
            masked_number: utils::mask_card_number(&details.card_number),
            card_number: details.card_number,
            expiry_date: utils::format_expiry(expires_at),
            expires_at,
            cvv: details.cvv,
            status: CardStatus::Active,
            created_at: now,
            used_at: None,
            metadata,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }

    /// Flips an active card to `expired` once its expiry instant has passed.
    /// Returns true when the status changed.
    pub fn refresh_expiry(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == CardStatus::Active && now >= self.expires_at {
            self.status = CardStatus::Expired;
            return true;
        }
        false
    }

    pub fn mark_used(&mut self, at: DateTime<Utc>) {
        self.status = CardStatus::Used;
        self.used_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn details() -> CardDetails {
        CardDetails {
            card_number: "4242123456789012".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn issued_card_is_active_with_expiry_one_month_out() {
        let now = Utc.with_ymd_and_hms(2024, 12, 15, 10, 0, 0).unwrap();
        let card = Card::issue("card_abc".to_string(), details(), None, now);

        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.expiry_date, "01/25");
        assert_eq!(card.masked_number, "4242 **** **** 9012");
        assert!(card.used_at.is_none());
    }

    #[test]
    fn expiry_clamps_to_end_of_short_month() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let card = Card::issue("card_abc".to_string(), details(), None, now);

        assert_eq!(card.expires_at, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(card.expiry_date, "02/25");
    }

    #[test]
    fn refresh_expiry_only_touches_active_cards() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut card = Card::issue("card_abc".to_string(), details(), None, now);

        assert!(!card.refresh_expiry(now));
        assert!(card.refresh_expiry(card.expires_at));
        assert_eq!(card.status, CardStatus::Expired);

        let mut used = Card::issue("card_def".to_string(), details(), None, now);
        used.mark_used(now);
        assert!(!used.refresh_expiry(used.expires_at));
        assert_eq!(used.status, CardStatus::Used);
    }

    #[test]
    fn metadata_serializes_under_meta() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut metadata = HashMap::new();
        metadata.insert("order".to_string(), serde_json::json!("A-17"));
        let card = Card::issue("card_abc".to_string(), details(), Some(metadata), now);

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["meta"]["order"], "A-17");
        assert_eq!(value["status"], "active");
        assert!(value.get("usedAt").is_none());
    }
}
