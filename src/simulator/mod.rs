pub mod clock;
pub mod entropy;
pub mod error;
pub mod metrics;
pub mod notify;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use crate::config::{ConfigError, SimulatorConfig};
use crate::db::card::CARD_ID_PREFIX;
use crate::db::charge::CHARGE_ID_PREFIX;
use crate::db::{Card, CardRequest, Charge, ChargeOutcome, ChargeRequest, ChargeStatus, Ledger};

pub use clock::{Clock, FixedClock, SystemClock};
pub use entropy::{Entropy, Operation, RandomEntropy, ScriptedEntropy};
pub use error::SimulatorError;
pub use metrics::MetricsSnapshot;
pub use notify::{BroadcastNotifier, Notification, NotificationKind, Notifier};

const ID_TOKEN_LEN: usize = 16;

/// A scheduled charge settlement.
struct Resolution {
    abort: AbortHandle,
    settled: Shared<BoxFuture<'static, Option<ChargeStatus>>>,
}

struct Inner {
    config: SimulatorConfig,
    ledger: Mutex<Ledger>,
    resolutions: Mutex<HashMap<String, Resolution>>,
    entropy: Arc<dyn Entropy>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

/// Handle to the simulator. Cloning is cheap and every clone shares the
/// same cards, charges and activity log.
#[derive(Clone)]
pub struct SimulatorService {
    inner: Arc<Inner>,
}

impl SimulatorService {
    pub fn new(config: SimulatorConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ConfigError> {
        let entropy = Arc::new(RandomEntropy::new(config.clone()));
        Self::with_sources(config, entropy, Arc::new(SystemClock), notifier)
    }

    pub fn with_sources(
        config: SimulatorConfig,
        entropy: Arc<dyn Entropy>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                ledger: Mutex::new(Ledger::new()),
                resolutions: Mutex::new(HashMap::new()),
                entropy,
                clock,
                notifier,
            }),
        })
    }

    pub async fn issue_card(&self, request: CardRequest) -> Card {
        simulate_delay(self.inner.entropy.latency(Operation::IssueCard)).await;

        let details = self.inner.entropy.card_details();
        let mut ledger = self.inner.ledger.lock().await;
        let now = self.inner.clock.now();

        let id = self.fresh_id(CARD_ID_PREFIX, |id| ledger.contains_card(id));
        let card = Card::issue(id, details, request.metadata, now);
        ledger.insert_card(card.clone());
        ledger.record_activity(
            now,
            "Card Created",
            format!("Card {} created for {} {}", card.id, request.amount, request.currency),
        );

        card
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Card, SimulatorError> {
        simulate_delay(self.inner.entropy.latency(Operation::GetCard)).await;

        let mut ledger = self.inner.ledger.lock().await;
        let now = self.inner.clock.now();
        let card = ledger
            .card_mut(card_id)
            .ok_or_else(|| SimulatorError::CardNotFound(card_id.to_string()))?;
        if card.refresh_expiry(now) {
            tracing::info!(card_id, "card expired");
        }

        Ok(card.clone())
    }

    /// Accepts a charge against an active card and returns it while still
    /// `pending`. The outcome is settled later by a background task; poll
    /// [`get_charge`](Self::get_charge) or use
    /// [`wait_for_resolution`](Self::wait_for_resolution) to observe it.
    pub async fn create_charge(&self, request: ChargeRequest) -> Result<Charge, SimulatorError> {
        simulate_delay(self.inner.entropy.latency(Operation::CreateCharge)).await;

        let charge = {
            let mut ledger = self.inner.ledger.lock().await;
            let now = self.inner.clock.now();

            let card = ledger
                .card_mut(&request.card_id)
                .ok_or_else(|| SimulatorError::CardNotFound(request.card_id.clone()))?;
            card.refresh_expiry(now);
            if !card.is_active() {
                let status = card.status;
                tracing::warn!(card_id = %request.card_id, %status, "charge rejected");
                return Err(SimulatorError::CardNotActive {
                    id: request.card_id,
                    status,
                });
            }
            // Without the exclusive policy two charges may both be accepted
            // before either settles; the later approval wins the used_at stamp.
            if self.inner.config.exclusive_charges && ledger.has_pending_charge(&request.card_id) {
                tracing::warn!(card_id = %request.card_id, "charge rejected, another one is in flight");
                return Err(SimulatorError::CardBusy(request.card_id));
            }

            let id = self.fresh_id(CHARGE_ID_PREFIX, |id| ledger.contains_charge(id));
            let charge = Charge::pending(id, request, now);
            ledger.insert_charge(charge.clone());
            ledger.record_activity(
                now,
                "Charge Created",
                format!("Charge {} created for {} {}", charge.id, charge.amount, charge.currency),
            );
            charge
        };

        self.schedule_resolution(&charge.id).await;
        Ok(charge)
    }

    pub async fn get_charge(&self, charge_id: &str) -> Result<Charge, SimulatorError> {
        simulate_delay(self.inner.entropy.latency(Operation::GetCharge)).await;
        self.lookup_charge(charge_id).await
    }

    /// Waits until the charge has settled and returns its final state.
    /// Returns immediately for charges that already settled. A charge whose
    /// settlement task died without settling it is failed here.
    pub async fn wait_for_resolution(&self, charge_id: &str) -> Result<Charge, SimulatorError> {
        let settled = self
            .inner
            .resolutions
            .lock()
            .await
            .get(charge_id)
            .map(|resolution| resolution.settled.clone());

        if let Some(settled) = settled {
            if settled.await.is_none() {
                self.settle_abandoned(charge_id).await;
            }
        }
        self.lookup_charge(charge_id).await
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        let ledger = self.inner.ledger.lock().await;

        MetricsSnapshot {
            success_rate: ledger.success_rate(self.inner.config.baseline_success_rate),
            card_count: ledger.card_count(),
            charge_count: ledger.charge_count(),
            pending_charges: ledger.pending_count(),
            avg_response_time: self.inner.entropy.response_time_ms(),
            recent_activity: ledger.recent_activity(),
        }
    }

    /// Drops every card and charge, clears the activity log and cancels
    /// settlements that have not run yet.
    pub async fn reset(&self) {
        let aborted = {
            let mut resolutions = self.inner.resolutions.lock().await;
            let count = resolutions.len();
            for (_, resolution) in resolutions.drain() {
                resolution.abort.abort();
            }
            count
        };

        self.inner.ledger.lock().await.clear();

        tracing::info!(aborted, "demo data reset");
        self.inner
            .notifier
            .notify(NotificationKind::Success, "Demo data has been reset");
    }

    async fn lookup_charge(&self, charge_id: &str) -> Result<Charge, SimulatorError> {
        self.inner
            .ledger
            .lock()
            .await
            .charge(charge_id)
            .cloned()
            .ok_or_else(|| SimulatorError::ChargeNotFound(charge_id.to_string()))
    }

    async fn settle_abandoned(&self, charge_id: &str) {
        self.inner.resolutions.lock().await.remove(charge_id);

        // after a reset the charge is gone and there is nothing to settle
        if self.inner.settle(charge_id, ChargeOutcome::Declined).await.is_some() {
            tracing::warn!(charge_id, "settlement task ended early, charge failed");
        }
    }

    fn fresh_id(&self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = format!("{prefix}{}", self.inner.entropy.token(ID_TOKEN_LEN));
            if !taken(&id) {
                return id;
            }
        }
    }

    async fn schedule_resolution(&self, charge_id: &str) {
        // Held across the spawn so the task cannot deregister itself before
        // it has been registered.
        let mut resolutions = self.inner.resolutions.lock().await;

        let inner = Arc::clone(&self.inner);
        let id = charge_id.to_string();
        let handle = tokio::spawn(async move { inner.resolve(id).await });

        let abort = handle.abort_handle();
        let settled = handle.map(|joined| joined.ok().flatten()).boxed().shared();
        resolutions.insert(charge_id.to_string(), Resolution { abort, settled });
    }
}

impl Inner {
    async fn resolve(self: Arc<Self>, charge_id: String) -> Option<ChargeStatus> {
        simulate_delay(self.entropy.settlement_delay()).await;
        let outcome = self.entropy.charge_outcome();

        let settled = self.settle(&charge_id, outcome).await;
        if settled.is_none() {
            tracing::debug!(%charge_id, "charge vanished before settlement");
        }

        self.resolutions.lock().await.remove(&charge_id);
        settled
    }

    /// Applies `outcome` to a pending charge, then logs and announces it.
    /// Returns `None` when the charge is gone or already settled.
    async fn settle(&self, charge_id: &str, outcome: ChargeOutcome) -> Option<ChargeStatus> {
        let (action, verb) = match outcome {
            ChargeOutcome::Approved => ("Charge Completed", "completed"),
            ChargeOutcome::Declined => ("Charge Failed", "failed"),
        };

        let charge = {
            let mut ledger = self.ledger.lock().await;
            let now = self.clock.now();
            let charge = ledger.settle_charge(charge_id, outcome, now)?;
            ledger.record_activity(
                now,
                action,
                format!("Charge {} {verb} for {} {}", charge.id, charge.amount, charge.currency),
            );
            charge
        };

        match outcome {
            ChargeOutcome::Approved => self
                .notifier
                .notify(NotificationKind::Success, &format!("Charge {} completed successfully", charge.id)),
            ChargeOutcome::Declined => self
                .notifier
                .notify(NotificationKind::Error, &format!("Charge {} failed", charge.id)),
        }
        Some(charge.status)
    }
}

async fn simulate_delay(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
