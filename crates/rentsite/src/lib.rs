//! Time-limited rental microsites.
//!
//! Tenants submit a business profile and a duration, an administrator approves
//! or rejects it, and approved sites stay reachable by slug until they expire.

pub mod checks;
pub mod config;
pub mod error;
pub mod rentals;
pub mod store;
pub mod telemetry;
