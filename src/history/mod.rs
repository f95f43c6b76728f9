//! History reconstruction
//!
//! The backend stores check-ins as a flat stream of timestamped events. This
//! module rebuilds discrete completed-route sessions from that stream with a
//! single-pass, gap-based segmentation: consecutive events on one route
//! belong to the same session while the gap between them stays within
//! [`SESSION_GAP_MINUTES`]. This is run-length segmentation, not clustering;
//! a pace slower than the gap always splits a session, even mid-route.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::api::{ApiClient, Outcome};
use crate::models::{CheckIn, CheckpointVisit, HistoryEntry, Route};

/// Maximum gap between consecutive check-ins of one session, in minutes.
/// Inclusive: a gap of exactly this many minutes still extends the session.
pub const SESSION_GAP_MINUTES: i64 = 15;

/// Reconstructs history entries for one user across all routes.
pub struct HistoryBuilder {
    api: Arc<ApiClient>,
    gap: Duration,
}

impl HistoryBuilder {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            gap: Duration::minutes(SESSION_GAP_MINUTES),
        }
    }

    /// Override the session gap. Exists for callers that tune the heuristic;
    /// the default is [`SESSION_GAP_MINUTES`].
    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    /// Build the user's history: fetch every route's check-ins, group each
    /// route's events into sessions and merge the results, newest first.
    ///
    /// Fetches run sequentially, one route at a time. An unauthorized
    /// response from any fetch aborts the whole reconstruction; there is no
    /// partial history. A failed (non-auth) fetch skips that route only.
    pub async fn build(&self, username: &str) -> Outcome<Vec<HistoryEntry>> {
        let routes = match self.api.list_routes().await {
            Outcome::Data(routes) => routes,
            Outcome::Unauthorized => return Outcome::Unauthorized,
            Outcome::Failure => return Outcome::Failure,
        };

        let mut entries = Vec::new();
        for route in &routes {
            let check_ins = match self.api.list_check_ins(&route.id, username).await {
                Outcome::Data(check_ins) => check_ins,
                Outcome::Unauthorized => return Outcome::Unauthorized,
                Outcome::Failure => {
                    tracing::warn!(route_id = %route.id, "skipping route with failed check-in fetch");
                    continue;
                }
            };

            if check_ins.is_empty() {
                continue;
            }

            entries.extend(
                group_check_ins(check_ins, self.gap)
                    .into_iter()
                    .filter_map(|group| entry_from_group(group, route)),
            );
        }

        entries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Outcome::Data(entries)
    }
}

/// Segment one route's check-ins into sessions.
///
/// Events are sorted ascending by timestamp and walked once; an event joins
/// the open group when its distance to the group's last member is within
/// `gap`, otherwise it opens a new group. Every returned group is non-empty
/// and time-ordered. Deterministic and idempotent: regrouping a group's
/// members yields the group back.
pub fn group_check_ins(mut check_ins: Vec<CheckIn>, gap: Duration) -> Vec<Vec<CheckIn>> {
    check_ins.sort_by_key(|check_in| check_in.checked_at);

    let mut groups: Vec<Vec<CheckIn>> = Vec::new();
    for check_in in check_ins {
        if let Some(group) = groups.last_mut() {
            if let Some(last) = group.last() {
                if check_in.checked_at - last.checked_at <= gap {
                    group.push(check_in);
                    continue;
                }
            }
        }
        groups.push(vec![check_in]);
    }
    groups
}

/// Turn one closed group into a history entry. The entry id is derived from
/// the route, user and first timestamp, so it is stable across reloads.
fn entry_from_group(group: Vec<CheckIn>, route: &Route) -> Option<HistoryEntry> {
    let first = group.first()?;
    let last = group.last()?;

    let id = format!(
        "{}-{}-{}",
        route.id,
        first.username,
        first.checked_at.timestamp_millis()
    );
    let started_at = first.checked_at;
    let completed_at = last.checked_at;
    let checkpoints = group
        .iter()
        .map(|check_in| CheckpointVisit {
            checkpoint_id: check_in.checkpoint_id.clone(),
            checked_at: check_in.checked_at,
        })
        .collect();

    Some(HistoryEntry {
        id,
        route_id: route.id.clone(),
        route_name: route.name.clone(),
        started_at,
        completed_at,
        checkpoints,
    })
}

/// Render the span between two timestamps for display.
///
/// Whole minutes, rounded: under one minute is `"<1 min"`, under an hour
/// `"N min"`, otherwise hours with the minute remainder appended only when
/// non-zero.
pub fn format_duration(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> String {
    let millis = (completed_at - started_at).num_milliseconds();
    let minutes = (millis as f64 / 60_000.0).round() as i64;

    if minutes < 1 {
        return "<1 min".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min");
    }

    let hours = minutes / 60;
    let remainder = minutes % 60;
    if remainder == 0 {
        format!("{hours} h")
    } else {
        format!("{hours} h {remainder} min")
    }
}
