use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use dealgate_core::deals::{Deal, DealPatch, DealRepositoryTrait, DealStatus, Facts, NewDeal};
use dealgate_core::errors::{Error, Result};
use dealgate_core::gates::{journey_gates, Gate, GateEvent, GateProgress, GateStatus};

use super::model::{DealDB, DealPatchDB, GateEventDB, GateProgressDB, NewDealDB, NewGateEventDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{deals, gate_events, gate_progress};

pub struct DealRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl DealRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        DealRepository { pool, writer }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn load_deal(conn: &mut SqliteConnection, deal_id: i64) -> Result<Deal> {
    deals::table
        .find(deal_id)
        .select(DealDB::as_select())
        .first::<DealDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or(Error::DealNotFound(deal_id))
        .and_then(Deal::try_from)
}

/// Fails with `DealNotFound` when an update touched no row.
fn ensure_touched(affected: usize, deal_id: i64) -> Result<()> {
    if affected == 0 {
        return Err(Error::DealNotFound(deal_id));
    }
    Ok(())
}

/// Classifies the row as stored and writes the league back when it moved.
/// Runs inside the caller's write job, so the cached tier always matches the
/// committed columns.
fn cache_league(conn: &mut SqliteConnection, deal_id: i64) -> Result<Deal> {
    let mut deal = load_deal(conn, deal_id)?;
    let league = deal.classify_league().map(|info| info.league);
    if deal.league != league {
        debug!(
            "Deal {} league {:?} -> {:?}",
            deal_id, deal.league, league
        );
        diesel::update(deals::table.find(deal_id))
            .set(deals::league.eq(league.map(|l| l.as_str().to_string())))
            .execute(conn)
            .map_err(StorageError::from)?;
        deal.league = league;
    }
    Ok(deal)
}

/// Merges `facts` into the stored financials. Callers supply the write
/// transaction.
pub(crate) fn merge_financials_in_tx(
    conn: &mut SqliteConnection,
    deal_id: i64,
    facts: Facts,
) -> Result<Deal> {
    let mut deal = load_deal(conn, deal_id)?;
    deal.financials.merge(facts);
    diesel::update(deals::table.find(deal_id))
        .set((
            deals::financials.eq(deal.financials.to_json()?),
            deals::updated_at.eq(now()),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
    load_deal(conn, deal_id)
}

#[async_trait]
impl DealRepositoryTrait for DealRepository {
    async fn create(&self, new_deal: NewDeal) -> Result<Deal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Deal> {
                let ts = now();
                let journey = new_deal.journey;
                let first_gate = new_deal.first_gate;
                let new_deal_db = NewDealDB::from_domain(new_deal, ts)?;

                let deal_db = diesel::insert_into(deals::table)
                    .values(&new_deal_db)
                    .returning(DealDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;

                let empty = Facts::new().to_json()?;
                let progress: Vec<GateProgressDB> = journey_gates(journey)
                    .iter()
                    .map(|gate| GateProgressDB {
                        deal_id: deal_db.id,
                        gate_id: gate.as_str().to_string(),
                        status: if *gate == first_gate {
                            GateStatus::Active
                        } else {
                            GateStatus::Locked
                        }
                        .as_str()
                        .to_string(),
                        completed_at: None,
                        data: empty.clone(),
                    })
                    .collect();
                diesel::insert_into(gate_progress::table)
                    .values(&progress)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                Deal::try_from(deal_db)
            })
            .await
    }

    fn get_by_id(&self, deal_id: i64) -> Result<Deal> {
        let mut conn = get_connection(&self.pool)?;
        load_deal(&mut conn, deal_id)
    }

    fn list_by_user(&self, user_id: i64) -> Result<Vec<Deal>> {
        let mut conn = get_connection(&self.pool)?;
        deals::table
            .filter(deals::user_id.eq(user_id))
            .order(deals::id.asc())
            .select(DealDB::as_select())
            .load::<DealDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Deal::try_from)
            .collect()
    }

    async fn update_fields(&self, deal_id: i64, patch: DealPatch) -> Result<Deal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Deal> {
                let changes = DealPatchDB::from_domain(patch, now());
                let affected = diesel::update(deals::table.find(deal_id))
                    .set(&changes)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                ensure_touched(affected, deal_id)?;
                cache_league(conn, deal_id)
            })
            .await
    }

    async fn refresh_league(&self, deal_id: i64) -> Result<Deal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Deal> {
                cache_league(conn, deal_id)
            })
            .await
    }

    async fn merge_financials(&self, deal_id: i64, facts: Facts) -> Result<Deal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Deal> {
                merge_financials_in_tx(conn, deal_id, facts)
            })
            .await
    }

    async fn set_status(&self, deal_id: i64, status: DealStatus) -> Result<Deal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Deal> {
                let affected = diesel::update(deals::table.find(deal_id))
                    .set((
                        deals::status.eq(status.as_str()),
                        deals::updated_at.eq(now()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                ensure_touched(affected, deal_id)?;
                load_deal(conn, deal_id)
            })
            .await
    }

    async fn advance_gate(&self, deal_id: i64, from: Gate, to: Gate) -> Result<GateEvent> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<GateEvent> {
                let ts = now();

                // Compare-and-swap on the gate pointer.
                let moved = diesel::update(
                    deals::table
                        .find(deal_id)
                        .filter(deals::current_gate.eq(from.as_str())),
                )
                .set((
                    deals::current_gate.eq(to.as_str()),
                    deals::updated_at.eq(ts),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                if moved == 0 {
                    let current = load_deal(conn, deal_id)?;
                    return Err(Error::InvalidGateTransition {
                        deal_id,
                        expected: from.to_string(),
                        actual: current.current_gate.to_string(),
                    });
                }

                diesel::update(gate_progress::table.find((deal_id, from.as_str())))
                    .set((
                        gate_progress::status.eq(GateStatus::Completed.as_str()),
                        gate_progress::completed_at.eq(Some(ts)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                diesel::update(gate_progress::table.find((deal_id, to.as_str())))
                    .set(gate_progress::status.eq(GateStatus::Active.as_str()))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let event_db = diesel::insert_into(gate_events::table)
                    .values(&NewGateEventDB {
                        deal_id,
                        from_gate: from.as_str().to_string(),
                        to_gate: to.as_str().to_string(),
                        created_at: ts,
                    })
                    .returning(GateEventDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                GateEvent::try_from(event_db)
            })
            .await
    }

    fn list_progress(&self, deal_id: i64) -> Result<Vec<GateProgress>> {
        let mut conn = get_connection(&self.pool)?;
        let mut progress = gate_progress::table
            .filter(gate_progress::deal_id.eq(deal_id))
            .select(GateProgressDB::as_select())
            .load::<GateProgressDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(GateProgress::try_from)
            .collect::<Result<Vec<_>>>()?;
        progress.sort_by_key(|p| p.gate.index());
        Ok(progress)
    }

    fn list_events(&self, deal_id: i64) -> Result<Vec<GateEvent>> {
        let mut conn = get_connection(&self.pool)?;
        gate_events::table
            .filter(gate_events::deal_id.eq(deal_id))
            .order(gate_events::id.asc())
            .select(GateEventDB::as_select())
            .load::<GateEventDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(GateEvent::try_from)
            .collect()
    }
}
