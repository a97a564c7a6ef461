use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

use super::deals_model::{Deal, DealPatch, DealStatus, GateDwell, NewDeal};
use super::deals_traits::{DealRepositoryTrait, DealServiceTrait};
use super::facts::Facts;
use super::velocity::compute_velocity;
use crate::errors::{Error, Result};
use crate::gates::registry::{first_gate, next_gate};
use crate::gates::{Gate, GateEvent, GateProgress, Journey};
use crate::league::{classify, LeagueInfo};

/// Service for deal lifecycle and gate movement.
pub struct DealService {
    repository: Arc<dyn DealRepositoryTrait>,
}

impl DealService {
    pub fn new(repository: Arc<dyn DealRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl DealServiceTrait for DealService {
    async fn create_deal(
        &self,
        user_id: i64,
        journey: Journey,
        fields: Option<DealPatch>,
    ) -> Result<Deal> {
        let fields = fields.unwrap_or_default();
        fields.validate()?;

        let first = first_gate(journey);
        let league = classify(&fields.league_inputs(journey)).map(|i| i.league);

        let deal = self
            .repository
            .create(NewDeal {
                user_id,
                journey,
                first_gate: first,
                league,
                fields,
                financials: Facts::new(),
            })
            .await?;
        info!(
            "Created {} deal {} for user {} (league {:?})",
            journey, deal.id, user_id, deal.league
        );
        Ok(deal)
    }

    fn get_deal(&self, deal_id: i64) -> Result<Deal> {
        self.repository.get_by_id(deal_id)
    }

    fn list_deals(&self, user_id: i64) -> Result<Vec<Deal>> {
        self.repository.list_by_user(user_id)
    }

    async fn advance_gate(&self, deal_id: i64, from: Gate) -> Result<Option<Gate>> {
        let deal = self.repository.get_by_id(deal_id)?;
        if from.journey() != deal.journey {
            return Err(Error::invalid_input(format!(
                "Gate {} is not part of the {} journey",
                from, deal.journey
            )));
        }

        let Some(to) = next_gate(from) else {
            if deal.current_gate == from {
                return Ok(None);
            }
            return Err(Error::InvalidGateTransition {
                deal_id,
                expected: from.to_string(),
                actual: deal.current_gate.to_string(),
            });
        };

        if !deal.is_active() {
            return Err(Error::invalid_input(format!(
                "Deal {} is {} and cannot advance",
                deal_id, deal.status
            )));
        }

        let event = self.repository.advance_gate(deal_id, from, to).await?;
        info!(
            "Deal {} advanced {} -> {}",
            deal_id, event.from_gate, event.to_gate
        );
        Ok(Some(to))
    }

    async fn update_fields(&self, deal_id: i64, patch: DealPatch) -> Result<Deal> {
        patch.validate()?;
        if patch.is_empty() {
            return self.repository.get_by_id(deal_id);
        }
        let deal = self.repository.update_fields(deal_id, patch).await?;
        debug!("Deal {} updated (league {:?})", deal_id, deal.league);
        Ok(deal)
    }

    async fn update_financials(&self, deal_id: i64, facts: Facts) -> Result<Deal> {
        if facts.is_empty() {
            return self.repository.get_by_id(deal_id);
        }
        self.repository.merge_financials(deal_id, facts).await
    }

    async fn refresh_league(&self, deal_id: i64) -> Result<(Deal, Option<LeagueInfo>)> {
        let deal = self.repository.refresh_league(deal_id).await?;
        let info = deal.classify_league();
        Ok((deal, info))
    }

    async fn set_status(&self, deal_id: i64, status: DealStatus) -> Result<Deal> {
        let deal = self.repository.set_status(deal_id, status).await?;
        info!("Deal {} is now {}", deal_id, status);
        Ok(deal)
    }

    fn gate_progress(&self, deal_id: i64) -> Result<Vec<GateProgress>> {
        self.repository.list_progress(deal_id)
    }

    fn gate_events(&self, deal_id: i64) -> Result<Vec<GateEvent>> {
        self.repository.list_events(deal_id)
    }

    fn gate_velocity(&self, deal_id: i64) -> Result<Vec<GateDwell>> {
        let deal = self.repository.get_by_id(deal_id)?;
        let events = self.repository.list_events(deal_id)?;
        Ok(compute_velocity(&deal, &events, Utc::now().naive_utc()))
    }
}
