use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;

use dealgate_core::errors::{Error, Result};
use dealgate_core::wallet::{
    CreditReceipt, DebitReceipt, DebitRequest, NewCredit, RefundReceipt, TransactionKind, Wallet,
    WalletError, WalletRepositoryTrait, WalletTransaction,
};

use super::model::{NewWalletDB, NewWalletTransactionDB, WalletDB, WalletTransactionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{wallet_transactions, wallets};

pub struct WalletRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl WalletRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        WalletRepository { pool, writer }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn find_wallet(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<Wallet>> {
    Ok(wallets::table
        .find(user_id)
        .select(WalletDB::as_select())
        .first::<WalletDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Wallet::from))
}

fn ensure_wallet(conn: &mut SqliteConnection, user_id: i64) -> Result<Wallet> {
    let ts = now();
    diesel::insert_or_ignore_into(wallets::table)
        .values(&NewWalletDB {
            user_id,
            created_at: ts,
            updated_at: ts,
        })
        .execute(conn)
        .map_err(StorageError::from)?;
    find_wallet(conn, user_id)?.ok_or_else(|| WalletError::WalletNotFound(user_id).into())
}

fn insert_transaction(
    conn: &mut SqliteConnection,
    row: &NewWalletTransactionDB,
) -> Result<WalletTransaction> {
    diesel::insert_into(wallet_transactions::table)
        .values(row)
        .returning(WalletTransactionDB::as_returning())
        .get_result(conn)
        .map_err(StorageError::from)?
        .try_into()
}

fn find_transaction(
    conn: &mut SqliteConnection,
    transaction_id: i64,
) -> Result<Option<WalletTransaction>> {
    wallet_transactions::table
        .find(transaction_id)
        .select(WalletTransactionDB::as_select())
        .first::<WalletTransactionDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(WalletTransaction::try_from)
        .transpose()
}

/// Conditional debit for use inside a write job.
///
/// The balance check and the decrement are a single
/// `UPDATE ... WHERE balance_cents >= amount`, so the check cannot go stale
/// between read and write. Zero affected rows means the wallet could not
/// cover the amount.
pub(crate) fn debit_in_tx(
    conn: &mut SqliteConnection,
    request: &DebitRequest,
) -> Result<(Wallet, WalletTransaction)> {
    request.validate()?;
    ensure_wallet(conn, request.user_id)?;
    let ts = now();

    let affected = diesel::update(
        wallets::table
            .find(request.user_id)
            .filter(wallets::balance_cents.ge(request.amount_cents)),
    )
    .set((
        wallets::balance_cents.eq(wallets::balance_cents - request.amount_cents),
        wallets::total_spent_cents.eq(wallets::total_spent_cents + request.amount_cents),
        wallets::updated_at.eq(ts),
    ))
    .execute(conn)
    .map_err(StorageError::from)?;

    if affected == 0 {
        let available = find_wallet(conn, request.user_id)?.map_or(0, |w| w.balance_cents);
        debug!(
            "Debit of {} cents refused for user {}: {} available",
            request.amount_cents, request.user_id, available
        );
        return Err(WalletError::InsufficientBalance {
            required: request.amount_cents,
            available,
        }
        .into());
    }

    let mut row = NewWalletTransactionDB::new(
        request.user_id,
        TransactionKind::Debit,
        request.amount_cents,
        request.description.clone(),
        ts,
    );
    row.deal_id = request.deal_id;
    row.item_ref = request.item_ref.clone();
    let transaction = insert_transaction(conn, &row)?;
    let wallet = ensure_wallet(conn, request.user_id)?;
    Ok((wallet, transaction))
}

#[async_trait]
impl WalletRepositoryTrait for WalletRepository {
    fn get_wallet(&self, user_id: i64) -> Result<Option<Wallet>> {
        let mut conn = get_connection(&self.pool)?;
        find_wallet(&mut conn, user_id)
    }

    async fn get_or_create(&self, user_id: i64) -> Result<Wallet> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Wallet> {
                ensure_wallet(conn, user_id)
            })
            .await
    }

    async fn credit(&self, credit: NewCredit) -> Result<CreditReceipt> {
        credit.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CreditReceipt> {
                ensure_wallet(conn, credit.user_id)?;

                if let Some(external_ref) = credit.external_ref.as_deref() {
                    let existing = wallet_transactions::table
                        .filter(wallet_transactions::kind.eq(TransactionKind::Credit.as_str()))
                        .filter(wallet_transactions::external_ref.eq(external_ref))
                        .select(WalletTransactionDB::as_select())
                        .first::<WalletTransactionDB>(conn)
                        .optional()
                        .map_err(StorageError::from)?;
                    if let Some(existing) = existing {
                        // Payment references are unique across users.
                        if existing.user_id != credit.user_id {
                            return Err(Error::ConstraintViolation(format!(
                                "Payment reference '{}' already credited another user",
                                external_ref
                            )));
                        }
                        warn!(
                            "Ignoring duplicate credit '{}' for user {}",
                            external_ref, credit.user_id
                        );
                        let wallet = ensure_wallet(conn, credit.user_id)?;
                        return Ok(CreditReceipt {
                            wallet,
                            transaction: existing.try_into()?,
                            duplicate: true,
                        });
                    }
                }

                let ts = now();
                diesel::update(wallets::table.find(credit.user_id))
                    .set((
                        wallets::balance_cents.eq(wallets::balance_cents + credit.amount_cents),
                        wallets::total_deposited_cents
                            .eq(wallets::total_deposited_cents + credit.amount_cents),
                        wallets::updated_at.eq(ts),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let mut row = NewWalletTransactionDB::new(
                    credit.user_id,
                    TransactionKind::Credit,
                    credit.amount_cents,
                    credit.description,
                    ts,
                );
                row.external_ref = credit.external_ref;
                let transaction = insert_transaction(conn, &row)?;

                Ok(CreditReceipt {
                    wallet: ensure_wallet(conn, credit.user_id)?,
                    transaction,
                    duplicate: false,
                })
            })
            .await
    }

    async fn debit(&self, request: DebitRequest) -> Result<DebitReceipt> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<DebitReceipt> {
                let (wallet, transaction) = debit_in_tx(conn, &request)?;
                Ok(DebitReceipt {
                    wallet,
                    transaction,
                })
            })
            .await
    }

    async fn refund(&self, transaction_id: i64) -> Result<RefundReceipt> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<RefundReceipt> {
                let original = find_transaction(conn, transaction_id)?
                    .filter(|t| t.kind == TransactionKind::Debit)
                    .ok_or(WalletError::TransactionNotFound(transaction_id))?;

                let already = wallet_transactions::table
                    .filter(wallet_transactions::refunded_transaction_id.eq(transaction_id))
                    .count()
                    .get_result::<i64>(conn)
                    .map_err(StorageError::from)?;
                if already > 0 {
                    return Err(WalletError::AlreadyRefunded(transaction_id).into());
                }

                let ts = now();
                diesel::update(wallets::table.find(original.user_id))
                    .set((
                        wallets::balance_cents.eq(wallets::balance_cents + original.amount_cents),
                        wallets::total_spent_cents
                            .eq(wallets::total_spent_cents - original.amount_cents),
                        wallets::updated_at.eq(ts),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let mut row = NewWalletTransactionDB::new(
                    original.user_id,
                    TransactionKind::Refund,
                    original.amount_cents,
                    format!("Refund: {}", original.description),
                    ts,
                );
                row.deal_id = original.deal_id;
                row.item_ref = original.item_ref.clone();
                row.refunded_transaction_id = Some(transaction_id);
                let refund = insert_transaction(conn, &row)?;

                Ok(RefundReceipt {
                    wallet: ensure_wallet(conn, original.user_id)?,
                    refund,
                })
            })
            .await
    }

    fn get_transaction(&self, transaction_id: i64) -> Result<Option<WalletTransaction>> {
        let mut conn = get_connection(&self.pool)?;
        find_transaction(&mut conn, transaction_id)
    }

    fn list_transactions(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = wallet_transactions::table
            .filter(wallet_transactions::user_id.eq(user_id))
            .order(wallet_transactions::id.desc())
            .select(WalletTransactionDB::as_select())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        query
            .load::<WalletTransactionDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(WalletTransaction::try_from)
            .collect()
    }
}
