//! Shared application state

use crate::db::Gate;

/// Shared application state
///
/// Holds no per-request data; every request is independent.
#[derive(Clone)]
pub struct AppState {
    /// Policy gate in front of the database
    pub gate: Gate,
}

impl AppState {
    pub fn new(gate: Gate) -> Self {
        Self { gate }
    }
}
