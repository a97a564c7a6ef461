//! Database models for wallets.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use dealgate_core::errors::{Error, Result};
use dealgate_core::wallet::{TransactionKind, Wallet, WalletTransaction};

use crate::errors::corrupt;

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::wallets)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletDB {
    pub user_id: i64,
    pub balance_cents: i64,
    pub total_deposited_cents: i64,
    pub total_spent_cents: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::wallets)]
pub struct NewWalletDB {
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::wallet_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletTransactionDB {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub amount_cents: i64,
    pub description: String,
    pub external_ref: Option<String>,
    pub deal_id: Option<i64>,
    pub item_ref: Option<String>,
    pub refunded_transaction_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::wallet_transactions)]
pub struct NewWalletTransactionDB {
    pub user_id: i64,
    pub kind: String,
    pub amount_cents: i64,
    pub description: String,
    pub external_ref: Option<String>,
    pub deal_id: Option<i64>,
    pub item_ref: Option<String>,
    pub refunded_transaction_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl NewWalletTransactionDB {
    pub fn new(
        user_id: i64,
        kind: TransactionKind,
        amount_cents: i64,
        description: String,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            user_id,
            kind: kind.as_str().to_string(),
            amount_cents,
            description,
            external_ref: None,
            deal_id: None,
            item_ref: None,
            refunded_transaction_id: None,
            created_at,
        }
    }
}

impl From<WalletDB> for Wallet {
    fn from(db: WalletDB) -> Self {
        Self {
            user_id: db.user_id,
            balance_cents: db.balance_cents,
            total_deposited_cents: db.total_deposited_cents,
            total_spent_cents: db.total_spent_cents,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl TryFrom<WalletTransactionDB> for WalletTransaction {
    type Error = Error;

    fn try_from(db: WalletTransactionDB) -> Result<Self> {
        Ok(Self {
            id: db.id,
            user_id: db.user_id,
            kind: db
                .kind
                .parse()
                .map_err(|e| corrupt("wallet_transactions", "kind", e))?,
            amount_cents: db.amount_cents,
            description: db.description,
            external_ref: db.external_ref,
            deal_id: db.deal_id,
            item_ref: db.item_ref,
            refunded_transaction_id: db.refunded_transaction_id,
            created_at: db.created_at,
        })
    }
}
