//! SQLite storage implementation for Dealgate.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `dealgate-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for deals, wallets and deliverables
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! The core crate is database-agnostic and works with traits.
//!
//! ```text
//!          core (domain, services)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```
//!
//! Every write goes through a single writer actor ([`WriteHandle`]) that runs
//! each job in a `BEGIN IMMEDIATE` transaction. Multi-step operations such as
//! "debit the wallet and insert the deliverable" are one job, so they commit
//! or roll back together.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod deals;
pub mod deliverables;
pub mod wallet;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export repositories
pub use deals::DealRepository;
pub use deliverables::DeliverableRepository;
pub use wallet::WalletRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from dealgate-core for convenience
pub use dealgate_core::errors::{DatabaseError, Error, Result};
