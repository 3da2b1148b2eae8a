//! Background Tasks Module
//!
//! Contains the periodic task abstraction used for background housekeeping.
//!
//! # Tasks
//! - Cache monitor: logs statistics and sweeps expired entries of registered caches
//! - Typed cache sweep: removes expired entries from the typed caches

mod periodic;

pub use periodic::{spawn_periodic, PeriodicTask};
