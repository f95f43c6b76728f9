//! History models
//!
//! History entries are synthesized client-side from contiguous runs of
//! check-ins; they are recomputed on every history load and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed-route session reconstructed from grouped check-ins.
///
/// Invariant: `checkpoints` is non-empty and time-ordered, and
/// `started_at <= visit.checked_at <= completed_at` for every member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub route_id: String,
    pub route_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub checkpoints: Vec<CheckpointVisit>,
}

/// One checkpoint visit within a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointVisit {
    pub checkpoint_id: Option<String>,
    pub checked_at: DateTime<Utc>,
}
