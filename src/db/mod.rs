pub mod activity;
pub mod card;
pub mod charge;
pub mod ledger;
pub mod utils;

pub use activity::{ActivityEntry, ActivityLog, ACTIVITY_LOG_CAPACITY};
pub use card::{Card, CardDetails, CardRequest, CardStatus};
pub use charge::{Charge, ChargeOutcome, ChargeRequest, ChargeStatus};
pub use ledger::Ledger;
