//! Data models
//!
//! Value types shared across the client core:
//! - Backend entities (User, Route, Checkpoint, CheckIn)
//! - Derived, client-only types (HistoryEntry)

mod checkin;
mod history;
mod route;
mod user;

pub use checkin::CheckIn;
pub use history::{CheckpointVisit, HistoryEntry};
pub use route::{Checkpoint, Route};
pub use user::User;
