//! Deal repository and service traits.

use async_trait::async_trait;

use super::deals_model::{Deal, DealPatch, DealStatus, GateDwell, NewDeal};
use super::facts::Facts;
use crate::errors::Result;
use crate::gates::{Gate, GateEvent, GateProgress, Journey};
use crate::league::LeagueInfo;

/// Persistence contract for deals, gate progress and the gate event log.
#[async_trait]
pub trait DealRepositoryTrait: Send + Sync {
    /// Inserts the deal and one progress row per journey gate (first active,
    /// rest locked) in one transaction.
    async fn create(&self, new_deal: NewDeal) -> Result<Deal>;

    /// Fails with `Error::DealNotFound` when absent.
    fn get_by_id(&self, deal_id: i64) -> Result<Deal>;

    fn list_by_user(&self, user_id: i64) -> Result<Vec<Deal>>;

    /// Applies the column patch, then classifies the merged row and caches its
    /// league, all in one write.
    async fn update_fields(&self, deal_id: i64, patch: DealPatch) -> Result<Deal>;

    /// Shallow, last-write-wins merge into the financials bag.
    async fn merge_financials(&self, deal_id: i64, facts: Facts) -> Result<Deal>;

    /// Classifies the stored row and caches its league in one write.
    async fn refresh_league(&self, deal_id: i64) -> Result<Deal>;

    async fn set_status(&self, deal_id: i64, status: DealStatus) -> Result<Deal>;

    /// Moves the deal from `from` to `to` if and only if its current gate is
    /// still `from`. Completes the `from` progress row, activates `to`, moves
    /// the pointer and appends the event atomically.
    ///
    /// A stale `from` fails with `Error::InvalidGateTransition` and writes
    /// nothing.
    async fn advance_gate(&self, deal_id: i64, from: Gate, to: Gate) -> Result<GateEvent>;

    /// Progress rows in journey order.
    fn list_progress(&self, deal_id: i64) -> Result<Vec<GateProgress>>;

    /// Events oldest first.
    fn list_events(&self, deal_id: i64) -> Result<Vec<GateEvent>>;
}

#[async_trait]
pub trait DealServiceTrait: Send + Sync {
    /// Opens a deal at its journey's first gate, classifying the league from
    /// whatever fields are supplied.
    async fn create_deal(
        &self,
        user_id: i64,
        journey: Journey,
        fields: Option<DealPatch>,
    ) -> Result<Deal>;

    fn get_deal(&self, deal_id: i64) -> Result<Deal>;

    fn list_deals(&self, user_id: i64) -> Result<Vec<Deal>>;

    /// Advances from `from` to its successor. A terminal `from` is a no-op
    /// returning `None`.
    async fn advance_gate(&self, deal_id: i64, from: Gate) -> Result<Option<Gate>>;

    /// Applies a column patch and re-classifies the league.
    async fn update_fields(&self, deal_id: i64, patch: DealPatch) -> Result<Deal>;

    async fn update_financials(&self, deal_id: i64, facts: Facts) -> Result<Deal>;

    /// Classifies the deal from its current data and caches the result.
    async fn refresh_league(&self, deal_id: i64) -> Result<(Deal, Option<LeagueInfo>)>;

    async fn set_status(&self, deal_id: i64, status: DealStatus) -> Result<Deal>;

    fn gate_progress(&self, deal_id: i64) -> Result<Vec<GateProgress>>;

    fn gate_events(&self, deal_id: i64) -> Result<Vec<GateEvent>>;

    /// Time spent in each visited gate.
    fn gate_velocity(&self, deal_id: i64) -> Result<Vec<GateDwell>>;
}
