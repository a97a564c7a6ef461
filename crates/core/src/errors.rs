//! Core error types for the Dealgate engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use thiserror::Error;

use crate::wallet::WalletError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the deal engine.
///
/// Domain failures the presentation layer reacts to (insufficient balance,
/// stale gate transitions) are typed variants. Storage failures are wrapped in
/// string form to keep this type database-agnostic.
///
/// Missing readiness fields are not errors: they travel in
/// [`crate::gates::ReadinessReport`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Wallet operation failed: {0}")]
    Wallet(#[from] WalletError),

    /// A gate id outside the registry was referenced.
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// The caller's view of the deal's current gate is stale.
    #[error("Deal {deal_id} cannot advance from {expected}: current gate is {actual}")]
    InvalidGateTransition {
        deal_id: i64,
        expected: String,
        actual: String,
    },

    #[error("Deal {0} not found")]
    DealNotFound(i64),

    #[error("Deliverable {0} not found")]
    DeliverableNotFound(i64),

    #[error("Catalog item '{0}' not found")]
    CatalogItemNotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Amount must be positive, got {0} cents")]
    NonPositiveAmount(i64),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

impl Error {
    /// Shorthand for an [`ValidationError::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::InvalidInput(message.into()))
    }

    /// True when the error is a domain-level rejection the caller can show to
    /// the user, as opposed to an infrastructure failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Wallet(_)
                | Error::InvalidGateTransition { .. }
                | Error::CatalogItemNotFound(_)
        )
    }
}
