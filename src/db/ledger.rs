use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::activity::{ActivityEntry, ActivityLog};
use super::card::Card;
use super::charge::{Charge, ChargeOutcome, ChargeStatus};

// In-memory store for cards, charges and the activity log.
// Callers are expected to wrap it in a mutex.
#[derive(Debug, Default)]
pub struct Ledger {
    cards: HashMap<String, Card>,
    charges: HashMap<String, Charge>,
    activity: ActivityLog,
    completed_charges: u64,
    failed_charges: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_card(&self, card_id: &str) -> bool {
        self.cards.contains_key(card_id)
    }

    pub fn contains_charge(&self, charge_id: &str) -> bool {
        self.charges.contains_key(charge_id)
    }

    pub fn insert_card(&mut self, card: Card) {
        self.cards.insert(card.id.clone(), card);
    }

    pub fn insert_charge(&mut self, charge: Charge) {
        self.charges.insert(charge.id.clone(), charge);
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.get(card_id)
    }

    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.get_mut(card_id)
    }

    pub fn charge(&self, charge_id: &str) -> Option<&Charge> {
        self.charges.get(charge_id)
    }

    pub fn has_pending_charge(&self, card_id: &str) -> bool {
        self.charges
            .values()
            .any(|charge| charge.card_id == card_id && charge.status == ChargeStatus::Pending)
    }

    /// Settles a pending charge and, when approved, marks its card as used.
    /// Returns the settled charge, or `None` if the charge is unknown or
    /// already terminal.
    pub fn settle_charge(
        &mut self,
        charge_id: &str,
        outcome: ChargeOutcome,
        at: DateTime<Utc>,
    ) -> Option<Charge> {
        let charge = self.charges.get_mut(charge_id)?;
        if !charge.settle(outcome, at) {
            return None;
        }
        let settled = charge.clone();

        match outcome {
            ChargeOutcome::Approved => {
                self.completed_charges += 1;
                if let Some(card) = self.cards.get_mut(&settled.card_id) {
                    card.mark_used(at);
                }
            }
            ChargeOutcome::Declined => self.failed_charges += 1,
        }

        Some(settled)
    }

    pub fn record_activity(&mut self, at: DateTime<Utc>, action: &str, details: String) {
        self.activity.record(at, action, details);
    }

    pub fn recent_activity(&self) -> Vec<ActivityEntry> {
        self.activity.snapshot()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn charge_count(&self) -> usize {
        self.charges.len()
    }

    pub fn pending_count(&self) -> usize {
        self.charges
            .values()
            .filter(|charge| charge.status == ChargeStatus::Pending)
            .count()
    }

    pub fn resolved_count(&self) -> u64 {
        self.completed_charges + self.failed_charges
    }

    /// Percentage of resolved charges that completed, rounded to one decimal.
    /// Falls back to `baseline` before anything has resolved.
    pub fn success_rate(&self, baseline: f64) -> f64 {
        let resolved = self.resolved_count();
        if resolved == 0 {
            return baseline;
        }
        let rate = self.completed_charges as f64 / resolved as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.charges.clear();
        self.activity.clear();
        self.completed_charges = 0;
        self.failed_charges = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::card::{CardDetails, CardStatus};
    use crate::db::charge::ChargeRequest;
    use rust_decimal::Decimal;

    fn ledger_with_card() -> Ledger {
        let mut ledger = Ledger::new();
        let details = CardDetails {
            card_number: "4242000011112222".to_string(),
            cvv: "321".to_string(),
        };
        ledger.insert_card(Card::issue("card_1".to_string(), details, None, Utc::now()));
        ledger
    }

    fn add_charge(ledger: &mut Ledger, id: &str) {
        let request = ChargeRequest {
            card_id: "card_1".to_string(),
            amount: Decimal::new(50, 0),
            currency: "USD".to_string(),
            metadata: None,
        };
        ledger.insert_charge(Charge::pending(id.to_string(), request, Utc::now()));
    }

    #[test]
    fn approved_settlement_marks_card_used() {
        let mut ledger = ledger_with_card();
        add_charge(&mut ledger, "ch_1");
        assert!(ledger.has_pending_charge("card_1"));

        let at = Utc::now();
        let charge = ledger.settle_charge("ch_1", ChargeOutcome::Approved, at).unwrap();

        assert_eq!(charge.status, ChargeStatus::Completed);
        let card = ledger.card("card_1").unwrap();
        assert_eq!(card.status, CardStatus::Used);
        assert_eq!(card.used_at, Some(at));
        assert!(!ledger.has_pending_charge("card_1"));
    }

    #[test]
    fn declined_settlement_leaves_card_untouched() {
        let mut ledger = ledger_with_card();
        add_charge(&mut ledger, "ch_1");

        let charge = ledger.settle_charge("ch_1", ChargeOutcome::Declined, Utc::now()).unwrap();

        assert_eq!(charge.status, ChargeStatus::Failed);
        let card = ledger.card("card_1").unwrap();
        assert_eq!(card.status, CardStatus::Active);
        assert!(card.used_at.is_none());
    }

    #[test]
    fn charge_settles_only_once() {
        let mut ledger = ledger_with_card();
        add_charge(&mut ledger, "ch_1");

        assert!(ledger.settle_charge("ch_1", ChargeOutcome::Declined, Utc::now()).is_some());
        assert!(ledger.settle_charge("ch_1", ChargeOutcome::Approved, Utc::now()).is_none());
        assert!(ledger.settle_charge("ch_missing", ChargeOutcome::Approved, Utc::now()).is_none());
        assert_eq!(ledger.resolved_count(), 1);
    }

    #[test]
    fn success_rate_uses_baseline_until_resolution() {
        let mut ledger = ledger_with_card();
        assert_eq!(ledger.success_rate(97.8), 97.8);

        for id in ["ch_1", "ch_2", "ch_3"] {
            add_charge(&mut ledger, id);
        }
        ledger.settle_charge("ch_1", ChargeOutcome::Approved, Utc::now());
        ledger.settle_charge("ch_2", ChargeOutcome::Declined, Utc::now());
        ledger.settle_charge("ch_3", ChargeOutcome::Declined, Utc::now());

        assert_eq!(ledger.success_rate(97.8), 33.3);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn clear_drops_everything() {
        let mut ledger = ledger_with_card();
        add_charge(&mut ledger, "ch_1");
        ledger.settle_charge("ch_1", ChargeOutcome::Approved, Utc::now());
        ledger.record_activity(Utc::now(), "Charge Completed", "ch_1".to_string());

        ledger.clear();

        assert_eq!(ledger.card_count(), 0);
        assert_eq!(ledger.charge_count(), 0);
        assert_eq!(ledger.resolved_count(), 0);
        assert!(ledger.recent_activity().is_empty());
        assert!(!ledger.contains_card("card_1"));
        assert!(!ledger.contains_charge("ch_1"));
    }
}
