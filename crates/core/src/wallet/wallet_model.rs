//! Wallet domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result, ValidationError};

/// Prepaid balance of one user. Balance never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: i64,
    pub balance_cents: i64,
    pub total_deposited_cents: i64,
    pub total_spent_cents: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
    Refund,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
            TransactionKind::Refund => "refund",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            "refund" => Ok(TransactionKind::Refund),
            other => Err(Error::invalid_input(format!(
                "Unknown transaction kind '{}'",
                other
            ))),
        }
    }
}

/// Immutable ledger row. `amount_cents` is always positive; the kind carries
/// the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub description: String,
    /// Payment-processor id for credits; unique per kind.
    pub external_ref: Option<String>,
    pub deal_id: Option<i64>,
    pub item_ref: Option<String>,
    /// Debit this refund reverses.
    pub refunded_transaction_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl WalletTransaction {
    /// Effect of this row on the balance.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            TransactionKind::Credit | TransactionKind::Refund => self.amount_cents,
            TransactionKind::Debit => -self.amount_cents,
        }
    }
}

/// Input model for a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredit {
    pub user_id: i64,
    pub amount_cents: i64,
    pub description: String,
    pub external_ref: Option<String>,
}

impl NewCredit {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount_cents)?;
        if self
            .external_ref
            .as_deref()
            .is_some_and(|r| r.trim().is_empty())
        {
            return Err(Error::invalid_input("external ref cannot be blank"));
        }
        Ok(())
    }
}

/// Input model for a debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitRequest {
    pub user_id: i64,
    pub amount_cents: i64,
    pub description: String,
    pub deal_id: Option<i64>,
    pub item_ref: Option<String>,
}

impl DebitRequest {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount_cents)
    }
}

pub(crate) fn validate_amount(amount_cents: i64) -> Result<()> {
    if amount_cents <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount_cents).into());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditReceipt {
    pub wallet: Wallet,
    pub transaction: WalletTransaction,
    /// True when the external ref was already recorded and nothing changed.
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitReceipt {
    pub wallet: Wallet,
    pub transaction: WalletTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundReceipt {
    pub wallet: Wallet,
    pub refund: WalletTransaction,
}

/// Balance versus the sum of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAudit {
    pub user_id: i64,
    pub balance_cents: i64,
    pub ledger_sum_cents: i64,
    pub transaction_count: usize,
    pub consistent: bool,
}

impl LedgerAudit {
    pub fn from_ledger(wallet: &Wallet, transactions: &[WalletTransaction]) -> Self {
        let ledger_sum_cents = transactions.iter().map(|t| t.signed_amount()).sum();
        Self {
            user_id: wallet.user_id,
            balance_cents: wallet.balance_cents,
            ledger_sum_cents,
            transaction_count: transactions.len(),
            consistent: ledger_sum_cents == wallet.balance_cents,
        }
    }
}
