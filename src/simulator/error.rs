use thiserror::Error;

use crate::db::CardStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    #[error("Card with ID {0} not found")]
    CardNotFound(String),

    #[error("Card with ID {id} is {status}")]
    CardNotActive { id: String, status: CardStatus },

    #[error("Card with ID {0} already has a charge in flight")]
    CardBusy(String),

    #[error("Charge with ID {0} not found")]
    ChargeNotFound(String),
}

impl SimulatorError {
    /// Machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            SimulatorError::CardNotFound(_) => "card_not_found",
            SimulatorError::CardNotActive { .. } => "card_not_active",
            SimulatorError::CardBusy(_) => "card_busy",
            SimulatorError::ChargeNotFound(_) => "charge_not_found",
        }
    }
}
