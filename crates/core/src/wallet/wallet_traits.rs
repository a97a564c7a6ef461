//! Wallet repository and service traits.

use async_trait::async_trait;

use super::wallet_model::{
    CreditReceipt, DebitReceipt, DebitRequest, LedgerAudit, NewCredit, RefundReceipt, Wallet,
    WalletTransaction,
};
use crate::errors::Result;

/// Persistence contract for the ledger.
///
/// Every mutating call is atomic: the balance change and its ledger row are
/// written together or not at all.
#[async_trait]
pub trait WalletRepositoryTrait: Send + Sync {
    fn get_wallet(&self, user_id: i64) -> Result<Option<Wallet>>;

    /// Returns the user's wallet, creating a zero-balance one if needed.
    async fn get_or_create(&self, user_id: i64) -> Result<Wallet>;

    /// Adds funds. A credit whose external ref is already recorded returns the
    /// existing row with `duplicate = true` and changes nothing. The same ref
    /// on another user's credit is an `Error::ConstraintViolation`.
    async fn credit(&self, credit: NewCredit) -> Result<CreditReceipt>;

    /// Conditional debit. Fails with `WalletError::InsufficientBalance` when
    /// the balance does not cover the amount at write time.
    async fn debit(&self, request: DebitRequest) -> Result<DebitReceipt>;

    /// Reverses a debit at most once.
    async fn refund(&self, transaction_id: i64) -> Result<RefundReceipt>;

    fn get_transaction(&self, transaction_id: i64) -> Result<Option<WalletTransaction>>;

    /// Newest first. `limit = None` returns the whole ledger.
    fn list_transactions(&self, user_id: i64, limit: Option<i64>)
        -> Result<Vec<WalletTransaction>>;
}

#[async_trait]
pub trait WalletServiceTrait: Send + Sync {
    async fn get_or_create_wallet(&self, user_id: i64) -> Result<Wallet>;

    async fn credit(
        &self,
        user_id: i64,
        amount_cents: i64,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<CreditReceipt>;

    async fn debit(&self, request: DebitRequest) -> Result<DebitReceipt>;

    async fn refund(&self, transaction_id: i64) -> Result<RefundReceipt>;

    fn history(&self, user_id: i64, limit: Option<i64>) -> Result<Vec<WalletTransaction>>;

    /// Checks that the balance equals the signed sum of the ledger.
    async fn verify_ledger(&self, user_id: i64) -> Result<LedgerAudit>;
}
