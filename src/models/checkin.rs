//! Check-in model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user-at-checkpoint event recorded server-side.
///
/// Immutable once created; the client only appends new check-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    pub route_id: String,
    /// Absent when the backend recorded the event without a checkpoint
    pub checkpoint_id: Option<String>,
    pub username: String,
    pub checked_at: DateTime<Utc>,
}
