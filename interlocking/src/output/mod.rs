//! Simulation history and persisted state.

pub mod history;
pub mod json;
pub mod snapshot;
