use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::deliverables_model::{GenerationJob, NewDeliverable, PriceQuote, PurchaseReceipt};
use super::deliverables_traits::{
    DeliverableRepositoryTrait, GenerationQueue, PurchaseServiceTrait,
};
use crate::catalog::{get_item, unlock_item_for, CatalogItem};
use crate::deals::{Deal, DealServiceTrait};
use crate::errors::{Error, Result};
use crate::gates::{next_gate, Gate};
use crate::league::{apply_multiplier, LeagueInfo};
use crate::wallet::DebitRequest;

/// Orchestrates league pricing, the wallet charge and the deliverable row.
pub struct PurchaseService {
    deal_service: Arc<dyn DealServiceTrait>,
    repository: Arc<dyn DeliverableRepositoryTrait>,
    queue: Option<Arc<dyn GenerationQueue>>,
}

impl PurchaseService {
    pub fn new(
        deal_service: Arc<dyn DealServiceTrait>,
        repository: Arc<dyn DeliverableRepositoryTrait>,
        queue: Option<Arc<dyn GenerationQueue>>,
    ) -> Self {
        Self {
            deal_service,
            repository,
            queue,
        }
    }

    /// Loads the deal and item and checks they belong together.
    fn resolve(
        &self,
        user_id: i64,
        deal_id: i64,
        item_slug: &str,
    ) -> Result<(Deal, &'static CatalogItem)> {
        let deal = self.deal_service.get_deal(deal_id)?;
        if deal.user_id != user_id {
            return Err(Error::invalid_input(format!(
                "Deal {} does not belong to user {}",
                deal_id, user_id
            )));
        }
        let item = get_item(item_slug)?;
        if item.journey != deal.journey {
            return Err(Error::invalid_input(format!(
                "'{}' is a {} deliverable, deal {} is a {} deal",
                item.slug, item.journey, deal_id, deal.journey
            )));
        }
        Ok((deal, item))
    }

    /// Prices, charges and queues one item. With `paywall_from` the charge is
    /// taken at most once per deal and only while the deal sits at that gate.
    async fn buy(
        &self,
        user_id: i64,
        deal: Deal,
        item: &'static CatalogItem,
        paywall_from: Option<Gate>,
    ) -> Result<PurchaseReceipt> {
        if !deal.is_active() {
            return Err(Error::invalid_input(format!(
                "Deal {} is {}; purchases are disabled",
                deal.id, deal.status
            )));
        }

        // Price from the deal as it is now, not from the cached tier.
        let (deal, league) = self.deal_service.refresh_league(deal.id).await?;
        let price_cents = price_for(item, league.as_ref())?;
        debug!(
            "Pricing {} for deal {}: base {} x {:?} = {}",
            item.slug,
            deal.id,
            item.base_price_cents,
            league.as_ref().map(|l| l.pricing_multiplier),
            price_cents
        );

        let charge = (price_cents > 0).then(|| DebitRequest {
            user_id,
            amount_cents: price_cents,
            description: format!("{} (deal {})", item.name, deal.id),
            deal_id: Some(deal.id),
            item_ref: Some(item.slug.to_string()),
        });

        let outcome = self
            .repository
            .create_with_charge(
                NewDeliverable {
                    deal_id: deal.id,
                    user_id,
                    item_ref: item.slug.to_string(),
                    price_cents,
                    paywall_from,
                },
                charge,
            )
            .await?;
        let deliverable = outcome.deliverable;

        if outcome.already_owned {
            debug!(
                "Deal {} already owns {} (deliverable {})",
                deal.id, item.slug, deliverable.id
            );
        } else {
            info!(
                "User {} bought {} for deal {} at {} cents (deliverable {})",
                user_id, item.slug, deal.id, price_cents, deliverable.id
            );
            if let Some(queue) = &self.queue {
                if let Err(e) = queue.enqueue(GenerationJob::from(&deliverable)).await {
                    warn!(
                        "Failed to enqueue deliverable {}; it stays queued for the next sweep: {}",
                        deliverable.id, e
                    );
                }
            }
        }

        Ok(PurchaseReceipt {
            deliverable_id: deliverable.id,
            item_ref: deliverable.item_ref,
            price_charged_cents: if outcome.already_owned { 0 } else { price_cents },
            status: deliverable.status,
            league: deal.league,
            transaction_id: outcome.transaction.map(|t| t.id),
            already_owned: outcome.already_owned,
        })
    }
}

/// Base price times the league's multiplier. Unclassified deals pay base.
fn price_for(item: &CatalogItem, league: Option<&LeagueInfo>) -> Result<i64> {
    let multiplier = league.map_or(Decimal::ONE, |info| info.pricing_multiplier);
    apply_multiplier(item.base_price_cents, multiplier)
}

#[async_trait::async_trait]
impl PurchaseServiceTrait for PurchaseService {
    async fn quote(&self, user_id: i64, deal_id: i64, item_slug: &str) -> Result<PriceQuote> {
        let (deal, item) = self.resolve(user_id, deal_id, item_slug)?;
        let league = deal.classify_league();
        Ok(PriceQuote {
            item_ref: item.slug.to_string(),
            base_price_cents: item.base_price_cents,
            league: league.as_ref().map(|l| l.league),
            price_cents: price_for(item, league.as_ref())?,
        })
    }

    async fn purchase(
        &self,
        user_id: i64,
        deal_id: i64,
        item_slug: &str,
    ) -> Result<PurchaseReceipt> {
        let (deal, item) = self.resolve(user_id, deal_id, item_slug)?;
        self.buy(user_id, deal, item, None).await
    }

    async fn purchase_unlock(
        &self,
        user_id: i64,
        deal_id: i64,
        from: Gate,
    ) -> Result<PurchaseReceipt> {
        let unlock = next_gate(from).and_then(unlock_item_for).ok_or_else(|| {
            Error::invalid_input(format!("The gate after {} has no paywall", from))
        })?;
        let (deal, item) = self.resolve(user_id, deal_id, unlock.slug)?;
        self.buy(user_id, deal, item, Some(from)).await
    }
}
