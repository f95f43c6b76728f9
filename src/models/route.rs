//! Route and checkpoint models

use serde::{Deserialize, Serialize};

/// A geo-located route fetched from the backend.
///
/// Immutable on the client; the checkpoint order is the backend's insertion
/// order and defines the traversal order of the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub description: String,
    pub distance_km: f64,
    pub checkpoints: Vec<Checkpoint>,
}

/// A fixed geographic waypoint belonging to a route.
///
/// Identity is the (route, id) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}
