use thiserror::Error;

/// Ledger rejections callers are expected to handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Insufficient balance: {required} cents required, {available} available")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Debit transaction {0} not found")]
    TransactionNotFound(i64),

    #[error("Transaction {0} has already been refunded")]
    AlreadyRefunded(i64),

    #[error("No wallet for user {0}")]
    WalletNotFound(i64),
}
