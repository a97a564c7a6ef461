use log::{debug, info, warn};
use std::sync::Arc;

use super::wallet_model::{
    CreditReceipt, DebitReceipt, DebitRequest, LedgerAudit, NewCredit,
    RefundReceipt, Wallet, WalletTransaction,
};
use super::wallet_traits::{WalletRepositoryTrait, WalletServiceTrait};
use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::errors::{Error, Result};

/// Service over the wallet ledger.
pub struct WalletService {
    repository: Arc<dyn WalletRepositoryTrait>,
}

impl WalletService {
    pub fn new(repository: Arc<dyn WalletRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl WalletServiceTrait for WalletService {
    async fn get_or_create_wallet(&self, user_id: i64) -> Result<Wallet> {
        self.repository.get_or_create(user_id).await
    }

    async fn credit(
        &self,
        user_id: i64,
        amount_cents: i64,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<CreditReceipt> {
        let credit = NewCredit {
            user_id,
            amount_cents,
            description: description.to_string(),
            external_ref: external_ref.map(str::to_string),
        };
        credit.validate()?;

        let receipt = self.repository.credit(credit).await?;
        if receipt.duplicate {
            info!(
                "Ignoring duplicate credit for user {} (transaction {})",
                user_id, receipt.transaction.id
            );
        } else {
            debug!(
                "Credited {} cents to user {}; balance {}",
                amount_cents, user_id, receipt.wallet.balance_cents
            );
        }
        Ok(receipt)
    }

    async fn debit(&self, request: DebitRequest) -> Result<DebitReceipt> {
        request.validate()?;
        let receipt = self.repository.debit(request).await?;
        debug!(
            "Debited {} cents from user {}; balance {}",
            receipt.transaction.amount_cents, receipt.wallet.user_id, receipt.wallet.balance_cents
        );
        Ok(receipt)
    }

    async fn refund(&self, transaction_id: i64) -> Result<RefundReceipt> {
        let receipt = self.repository.refund(transaction_id).await?;
        info!(
            "Refunded transaction {} ({} cents) to user {}",
            transaction_id, receipt.refund.amount_cents, receipt.wallet.user_id
        );
        Ok(receipt)
    }

    fn history(&self, user_id: i64, limit: Option<i64>) -> Result<Vec<WalletTransaction>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit <= 0 {
            return Err(Error::invalid_input("history limit must be positive"));
        }
        self.repository.list_transactions(user_id, Some(limit))
    }

    async fn verify_ledger(&self, user_id: i64) -> Result<LedgerAudit> {
        let wallet = self.repository.get_or_create(user_id).await?;
        let transactions = self.repository.list_transactions(user_id, None)?;
        let audit = LedgerAudit::from_ledger(&wallet, &transactions);
        if !audit.consistent {
            warn!(
                "Ledger drift for user {}: balance {} vs ledger {}",
                user_id, audit.balance_cents, audit.ledger_sum_cents
            );
        }
        Ok(audit)
    }
}
