use serde::{Deserialize, Serialize};

use crate::db::ActivityEntry;

/// Point-in-time view of the simulator for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub success_rate: f64,
    pub card_count: usize,
    pub charge_count: usize,
    pub pending_charges: usize,
    pub avg_response_time: u32,
    pub recent_activity: Vec<ActivityEntry>,
}
