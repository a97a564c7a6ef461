//! Dealgate Core - Domain entities, engines, services, and traits.
//!
//! This crate contains the deal gate and monetization engine: the league
//! classifier, the per-journey gate registry and readiness checklists, the
//! wallet ledger contract, and the purchase orchestrator.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod catalog;
pub mod constants;
pub mod deals;
pub mod deliverables;
pub mod errors;
pub mod gates;
pub mod league;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the types every caller touches
pub use deals::{Deal, Facts};
pub use gates::{Gate, Journey};
pub use league::{League, LeagueInfo};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
