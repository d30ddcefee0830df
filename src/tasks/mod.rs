//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache instance.
//!
//! # Tasks
//! - Template sweep: evicts templates loaded longer ago than the maximum duration

mod sweep;

pub use sweep::{spawn_sweep_task, sweep_once, SweepSchedule};
