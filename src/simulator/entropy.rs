use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::{LatencyRange, SimulatorConfig};
use crate::db::{CardDetails, ChargeOutcome};

/// Simulated operations that carry artificial latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    IssueCard,
    GetCard,
    CreateCharge,
    GetCharge,
}

/// Everything the simulator leaves to chance.
pub trait Entropy: Send + Sync {
    fn latency(&self, operation: Operation) -> Duration;

    fn settlement_delay(&self) -> Duration;

    fn charge_outcome(&self) -> ChargeOutcome;

    /// Alphanumeric token used as the random part of identifiers.
    fn token(&self, len: usize) -> String;

    fn card_details(&self) -> CardDetails;

    /// Synthetic average response time shown on the dashboard.
    fn response_time_ms(&self) -> u32;
}

pub struct RandomEntropy {
    config: SimulatorConfig,
}

impl RandomEntropy {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    fn sample(range: LatencyRange) -> Duration {
        if range.max_ms <= range.min_ms {
            return range.min();
        }
        Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..range.max_ms))
    }
}

impl Entropy for RandomEntropy {
    fn latency(&self, operation: Operation) -> Duration {
        let range = match operation {
            Operation::IssueCard => self.config.issue_latency,
            Operation::CreateCharge => self.config.charge_latency,
            Operation::GetCard | Operation::GetCharge => self.config.lookup_latency,
        };
        Self::sample(range)
    }

    fn settlement_delay(&self) -> Duration {
        Self::sample(self.config.settlement_delay)
    }

    fn charge_outcome(&self) -> ChargeOutcome {
        if rand::thread_rng().gen_bool(self.config.success_rate) {
            ChargeOutcome::Approved
        } else {
            ChargeOutcome::Declined
        }
    }

    fn token(&self, len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn card_details(&self) -> CardDetails {
        let mut rng = rand::thread_rng();
        let card_number = format!(
            "4242{}{}{}",
            rng.gen_range(1000..10000),
            rng.gen_range(1000..10000),
            rng.gen_range(1000..10000)
        );
        let cvv = rng.gen_range(100..1000).to_string();
        CardDetails { card_number, cvv }
    }

    fn response_time_ms(&self) -> u32 {
        rand::thread_rng().gen_range(70..90)
    }
}

/// Deterministic entropy: no delays, sequential identifiers and a queue of
/// predetermined charge outcomes.
pub struct ScriptedEntropy {
    outcomes: Mutex<VecDeque<ChargeOutcome>>,
    fallback: ChargeOutcome,
    settlement_delay: Duration,
    counter: AtomicU64,
}

impl ScriptedEntropy {
    pub fn always(outcome: ChargeOutcome) -> Self {
        Self::scripted(Vec::new(), outcome)
    }

    /// Plays `outcomes` in order, then keeps returning `fallback`.
    pub fn scripted(outcomes: Vec<ChargeOutcome>, fallback: ChargeOutcome) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback,
            settlement_delay: Duration::ZERO,
            counter: AtomicU64::new(0),
        }
    }

    pub fn with_settlement_delay(mut self, delay: Duration) -> Self {
        self.settlement_delay = delay;
        self
    }
}

impl Entropy for ScriptedEntropy {
    fn latency(&self, _operation: Operation) -> Duration {
        Duration::ZERO
    }

    fn settlement_delay(&self) -> Duration {
        self.settlement_delay
    }

    fn charge_outcome(&self) -> ChargeOutcome {
        match self.outcomes.lock() {
            Ok(mut outcomes) => outcomes.pop_front().unwrap_or(self.fallback),
            Err(_) => self.fallback,
        }
    }

    fn token(&self, len: usize) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{n:0>len$}")
    }

    fn card_details(&self) -> CardDetails {
        CardDetails {
            card_number: "4242424242424242".to_string(),
            cvv: "424".to_string(),
        }
    }

    fn response_time_ms(&self) -> u32 {
        78
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_values_stay_within_configured_bounds() {
        let config = SimulatorConfig::default();
        let entropy = RandomEntropy::new(config.clone());

        for _ in 0..200 {
            let delay = entropy.settlement_delay();
            assert!(delay >= config.settlement_delay.min() && delay < config.settlement_delay.max());

            let latency = entropy.latency(Operation::IssueCard);
            assert!(latency >= config.issue_latency.min() && latency < config.issue_latency.max());

            let response = entropy.response_time_ms();
            assert!((70..90).contains(&response));
        }
    }

    #[test]
    fn fabricated_card_details_look_like_test_cards() {
        let entropy = RandomEntropy::new(SimulatorConfig::default());
        let details = entropy.card_details();

        assert_eq!(details.card_number.len(), 16);
        assert!(details.card_number.starts_with("4242"));
        assert!(details.card_number.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(details.cvv.len(), 3);
    }

    #[test]
    fn tokens_are_alphanumeric() {
        let entropy = RandomEntropy::new(SimulatorConfig::default());
        let token = entropy.token(16);

        assert_eq!(token.len(), 16);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn zero_width_ranges_do_not_panic() {
        let config = SimulatorConfig {
            settlement_delay: LatencyRange::zero(),
            ..SimulatorConfig::default()
        };
        let entropy = RandomEntropy::new(config);
        assert_eq!(entropy.settlement_delay(), Duration::ZERO);
    }

    #[test]
    fn scripted_outcomes_play_in_order() {
        let entropy = ScriptedEntropy::scripted(
            vec![ChargeOutcome::Declined, ChargeOutcome::Approved],
            ChargeOutcome::Declined,
        );

        assert_eq!(entropy.charge_outcome(), ChargeOutcome::Declined);
        assert_eq!(entropy.charge_outcome(), ChargeOutcome::Approved);
        assert_eq!(entropy.charge_outcome(), ChargeOutcome::Declined);
        assert_ne!(entropy.token(16), entropy.token(16));
    }
}
