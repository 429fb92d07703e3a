//! Cooperative tick scheduler.

pub mod simulation;

pub use self::simulation::{Process, ProcessId, ProcessState, Scheduler, Simulation, Tick};
