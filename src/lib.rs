//! Trailcheck - client core for a route check-in app
//!
//! This library implements the session and history layer of a route-based
//! check-in client: authenticated API access with token persistence,
//! tolerant normalization of backend payloads, and reconstruction of
//! completed-route sessions from raw check-in events.

pub mod api;
pub mod config;
pub mod history;
pub mod models;
pub mod normalize;
pub mod session;
pub mod storage;
pub mod viewstate;
