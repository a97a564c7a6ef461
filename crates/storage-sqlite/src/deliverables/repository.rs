use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use log::debug;

use dealgate_core::deals::Facts;
use dealgate_core::deliverables::{
    ChargeOutcome, Deliverable, DeliverableRepositoryTrait, DeliverableStatus, NewDeliverable,
    StaleRelease,
};
use dealgate_core::errors::{Error, Result};
use dealgate_core::wallet::DebitRequest;

use super::model::{DeliverableDB, NewDeliverableDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::deals::{load_deal, merge_financials_in_tx};
use crate::errors::StorageError;
use crate::schema::deliverables;
use crate::wallet::debit_in_tx;

pub struct DeliverableRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl DeliverableRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        DeliverableRepository { pool, writer }
    }
}

const GENERATION_TIMED_OUT: &str = "generation timed out";

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn load_deliverable(conn: &mut SqliteConnection, deliverable_id: i64) -> Result<Deliverable> {
    deliverables::table
        .find(deliverable_id)
        .select(DeliverableDB::as_select())
        .first::<DeliverableDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or(Error::DeliverableNotFound(deliverable_id))
        .and_then(Deliverable::try_from)
}

/// Result of a guarded status update: the fresh row when it moved, `None`
/// when the row exists but was in another state.
fn settle(
    conn: &mut SqliteConnection,
    deliverable_id: i64,
    affected: usize,
) -> Result<Option<Deliverable>> {
    let row = load_deliverable(conn, deliverable_id)?;
    Ok((affected > 0).then_some(row))
}

/// Any deliverable of `item_ref` already on the deal, whatever its state.
fn find_item(
    conn: &mut SqliteConnection,
    deal_id: i64,
    item_ref: &str,
) -> Result<Option<Deliverable>> {
    deliverables::table
        .filter(deliverables::deal_id.eq(deal_id))
        .filter(deliverables::item_ref.eq(item_ref))
        .order(deliverables::id.asc())
        .select(DeliverableDB::as_select())
        .first::<DeliverableDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Deliverable::try_from)
        .transpose()
}

fn decode_all(rows: Vec<DeliverableDB>) -> Result<Vec<Deliverable>> {
    rows.into_iter().map(Deliverable::try_from).collect()
}

#[async_trait]
impl DeliverableRepositoryTrait for DeliverableRepository {
    async fn create_with_charge(
        &self,
        new_deliverable: NewDeliverable,
        charge: Option<DebitRequest>,
    ) -> Result<ChargeOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ChargeOutcome> {
                if let Some(from) = new_deliverable.paywall_from {
                    let deal = load_deal(conn, new_deliverable.deal_id)?;
                    if deal.current_gate != from {
                        return Err(Error::InvalidGateTransition {
                            deal_id: deal.id,
                            expected: from.to_string(),
                            actual: deal.current_gate.to_string(),
                        });
                    }
                    if let Some(existing) =
                        find_item(conn, new_deliverable.deal_id, &new_deliverable.item_ref)?
                    {
                        debug!(
                            "Deal {} already owns {}, not charging",
                            existing.deal_id, existing.item_ref
                        );
                        return Ok(ChargeOutcome {
                            deliverable: existing,
                            transaction: None,
                            already_owned: true,
                        });
                    }
                }

                let transaction = match &charge {
                    Some(request) => Some(debit_in_tx(conn, request)?.1),
                    None => None,
                };

                let row = NewDeliverableDB::queued(
                    new_deliverable,
                    transaction.as_ref().map(|t| t.id),
                    now(),
                );
                let deliverable = diesel::insert_into(deliverables::table)
                    .values(&row)
                    .returning(DeliverableDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;

                Ok(ChargeOutcome {
                    deliverable: Deliverable::try_from(deliverable)?,
                    transaction,
                    already_owned: false,
                })
            })
            .await
    }

    fn get_by_id(&self, deliverable_id: i64) -> Result<Deliverable> {
        let mut conn = get_connection(&self.pool)?;
        load_deliverable(&mut conn, deliverable_id)
    }

    fn list_for_deal(&self, deal_id: i64) -> Result<Vec<Deliverable>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = deliverables::table
            .filter(deliverables::deal_id.eq(deal_id))
            .order(deliverables::id.asc())
            .select(DeliverableDB::as_select())
            .load::<DeliverableDB>(&mut conn)
            .map_err(StorageError::from)?;
        decode_all(rows)
    }

    fn list_queued(&self, limit: i64) -> Result<Vec<Deliverable>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = deliverables::table
            .filter(deliverables::status.eq(DeliverableStatus::Queued.as_str()))
            .order(deliverables::id.asc())
            .limit(limit)
            .select(DeliverableDB::as_select())
            .load::<DeliverableDB>(&mut conn)
            .map_err(StorageError::from)?;
        decode_all(rows)
    }

    async fn claim(&self, deliverable_id: i64) -> Result<Option<Deliverable>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Deliverable>> {
                let affected = diesel::update(
                    deliverables::table
                        .find(deliverable_id)
                        .filter(deliverables::status.eq(DeliverableStatus::Queued.as_str())),
                )
                .set((
                    deliverables::status.eq(DeliverableStatus::Generating.as_str()),
                    deliverables::attempts.eq(deliverables::attempts + 1),
                    deliverables::updated_at.eq(now()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                settle(conn, deliverable_id, affected)
            })
            .await
    }

    async fn complete(
        &self,
        deliverable_id: i64,
        content: String,
        completion: Facts,
    ) -> Result<Option<Deliverable>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Deliverable>> {
                let ts = now();
                let affected = diesel::update(
                    deliverables::table
                        .find(deliverable_id)
                        .filter(deliverables::status.eq(DeliverableStatus::Generating.as_str())),
                )
                .set((
                    deliverables::status.eq(DeliverableStatus::Complete.as_str()),
                    deliverables::content.eq(Some(content)),
                    deliverables::completed_at.eq(Some(ts)),
                    deliverables::updated_at.eq(ts),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                let done = settle(conn, deliverable_id, affected)?;
                if let Some(deliverable) = &done {
                    if !completion.is_empty() {
                        merge_financials_in_tx(conn, deliverable.deal_id, completion)?;
                    }
                }
                Ok(done)
            })
            .await
    }

    async fn fail(&self, deliverable_id: i64, message: String) -> Result<Option<Deliverable>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Deliverable>> {
                let open = [
                    DeliverableStatus::Queued.as_str(),
                    DeliverableStatus::Generating.as_str(),
                ];
                let affected = diesel::update(
                    deliverables::table
                        .find(deliverable_id)
                        .filter(deliverables::status.eq_any(open)),
                )
                .set((
                    deliverables::status.eq(DeliverableStatus::Error.as_str()),
                    deliverables::error_message.eq(Some(message)),
                    deliverables::updated_at.eq(now()),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                settle(conn, deliverable_id, affected)
            })
            .await
    }

    async fn release_stale(
        &self,
        cutoff: NaiveDateTime,
        max_attempts: i32,
    ) -> Result<StaleRelease> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<StaleRelease> {
                let ts = now();
                let generating = DeliverableStatus::Generating.as_str();

                let failed = diesel::update(
                    deliverables::table
                        .filter(deliverables::status.eq(generating))
                        .filter(deliverables::updated_at.lt(cutoff))
                        .filter(deliverables::attempts.ge(max_attempts)),
                )
                .set((
                    deliverables::status.eq(DeliverableStatus::Error.as_str()),
                    deliverables::error_message.eq(Some(GENERATION_TIMED_OUT)),
                    deliverables::updated_at.eq(ts),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                let requeued = diesel::update(
                    deliverables::table
                        .filter(deliverables::status.eq(generating))
                        .filter(deliverables::updated_at.lt(cutoff)),
                )
                .set((
                    deliverables::status.eq(DeliverableStatus::Queued.as_str()),
                    deliverables::updated_at.eq(ts),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                Ok(StaleRelease { requeued, failed })
            })
            .await
    }
}
