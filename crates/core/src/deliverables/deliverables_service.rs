use chrono::{Duration, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;

use super::deliverables_model::{Deliverable, DeliverableStatus, GenerationJob, StaleRelease};
use super::deliverables_traits::{
    DeliverableGenerator, DeliverableRepositoryTrait, DeliverableServiceTrait,
};
use crate::catalog::find_item;
use crate::constants::MAX_GENERATION_ATTEMPTS;
use crate::deals::{DealServiceTrait, Facts};
use crate::errors::{Error, Result};

/// Drives deliverables through `queued -> generating -> complete | error`.
pub struct DeliverableService {
    repository: Arc<dyn DeliverableRepositoryTrait>,
    deal_service: Arc<dyn DealServiceTrait>,
    generator: Arc<dyn DeliverableGenerator>,
}

impl DeliverableService {
    pub fn new(
        repository: Arc<dyn DeliverableRepositoryTrait>,
        deal_service: Arc<dyn DealServiceTrait>,
        generator: Arc<dyn DeliverableGenerator>,
    ) -> Self {
        Self {
            repository,
            deal_service,
            generator,
        }
    }

    fn transition_error(deliverable: &Deliverable, target: DeliverableStatus) -> Error {
        Error::ConstraintViolation(format!(
            "Deliverable {} is {} and cannot become {}",
            deliverable.id, deliverable.status, target
        ))
    }
}

#[async_trait::async_trait]
impl DeliverableServiceTrait for DeliverableService {
    fn get(&self, deliverable_id: i64) -> Result<Deliverable> {
        self.repository.get_by_id(deliverable_id)
    }

    fn list_for_deal(&self, deal_id: i64) -> Result<Vec<Deliverable>> {
        self.repository.list_for_deal(deal_id)
    }

    fn pending(&self, limit: i64) -> Result<Vec<Deliverable>> {
        if limit <= 0 {
            return Err(Error::invalid_input("limit must be positive"));
        }
        self.repository.list_queued(limit)
    }

    async fn claim(&self, deliverable_id: i64) -> Result<Option<Deliverable>> {
        let claimed = self.repository.claim(deliverable_id).await?;
        if claimed.is_none() {
            debug!("Deliverable {} already claimed", deliverable_id);
        }
        Ok(claimed)
    }

    async fn complete(&self, deliverable_id: i64, content: String) -> Result<Deliverable> {
        let current = self.repository.get_by_id(deliverable_id)?;
        let completion = match find_item(&current.item_ref) {
            Some(item) => Facts::new().with(item.completion_fact(), true),
            None => Facts::new(),
        };

        let Some(done) = self
            .repository
            .complete(deliverable_id, content, completion)
            .await?
        else {
            let current = self.repository.get_by_id(deliverable_id)?;
            return Err(Self::transition_error(&current, DeliverableStatus::Complete));
        };
        info!(
            "Deliverable {} ({}) complete for deal {}",
            done.id, done.item_ref, done.deal_id
        );
        Ok(done)
    }

    async fn fail(&self, deliverable_id: i64, message: &str) -> Result<Deliverable> {
        let Some(failed) = self
            .repository
            .fail(deliverable_id, message.to_string())
            .await?
        else {
            let current = self.repository.get_by_id(deliverable_id)?;
            return Err(Self::transition_error(&current, DeliverableStatus::Error));
        };
        error!(
            "Deliverable {} ({}) failed: {}",
            failed.id, failed.item_ref, message
        );
        Ok(failed)
    }

    async fn release_stale(&self, older_than: Duration) -> Result<StaleRelease> {
        if older_than <= Duration::zero() {
            return Err(Error::invalid_input("stale threshold must be positive"));
        }
        let cutoff = Utc::now().naive_utc() - older_than;
        let released = self
            .repository
            .release_stale(cutoff, MAX_GENERATION_ATTEMPTS)
            .await?;
        if released.requeued > 0 || released.failed > 0 {
            warn!(
                "Released stale generations: {} requeued, {} failed",
                released.requeued, released.failed
            );
        }
        Ok(released)
    }

    async fn process(&self, deliverable_id: i64) -> Result<Option<Deliverable>> {
        let Some(claimed) = self.claim(deliverable_id).await? else {
            return Ok(None);
        };

        let job = GenerationJob::from(&claimed);
        let generated = match self.deal_service.get_deal(claimed.deal_id) {
            Ok(deal) => self.generator.generate(&job, &deal).await,
            Err(e) => Err(e),
        };

        let settled = match generated {
            Ok(content) => self.complete(deliverable_id, content).await?,
            Err(e) => self.fail(deliverable_id, &e.to_string()).await?,
        };
        Ok(Some(settled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::facts::keys;
    use crate::deals::{DealService, DealServiceTrait};
    use crate::deliverables::{NewDeliverable, PurchaseService, PurchaseServiceTrait};
    use crate::gates::Journey;
    use crate::testing::{EchoGenerator, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        deals: Arc<DealService>,
        service: DeliverableService,
    }

    fn fixture(generator: EchoGenerator) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let deals = Arc::new(DealService::new(store.clone()));
        let service = DeliverableService::new(store.clone(), deals.clone(), Arc::new(generator));
        Fixture {
            store,
            deals,
            service,
        }
    }

    async fn queued(fx: &Fixture, journey: Journey, item_ref: &str) -> Deliverable {
        let deal = fx.deals.create_deal(1, journey, None).await.unwrap();
        fx.store
            .create_with_charge(
                NewDeliverable {
                    deal_id: deal.id,
                    user_id: 1,
                    item_ref: item_ref.to_string(),
                    price_cents: 0,
                    paywall_from: None,
                },
                None,
            )
            .await
            .unwrap()
            .deliverable
    }

    #[tokio::test]
    async fn processing_completes_and_records_the_fact() {
        let fx = fixture(EchoGenerator::default());
        let d = queued(&fx, Journey::Sell, "valuation_report").await;

        let done = fx.service.process(d.id).await.unwrap().unwrap();

        assert_eq!(done.status, DeliverableStatus::Complete);
        assert_eq!(done.attempts, 1);
        assert!(done.completed_at.is_some());
        assert!(done.content.unwrap().contains("valuation_report"));
        let deal = fx.deals.get_deal(d.deal_id).unwrap();
        assert!(deal.financials.has(keys::VALUATION_REPORT_GENERATED));
    }

    #[tokio::test]
    async fn second_claim_loses() {
        let fx = fixture(EchoGenerator::default());
        let d = queued(&fx, Journey::Buy, "dd_checklist").await;

        assert!(fx.service.claim(d.id).await.unwrap().is_some());
        assert!(fx.service.claim(d.id).await.unwrap().is_none());
        assert!(fx.service.process(d.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_processing_generates_once() {
        let generator = EchoGenerator::default();
        let calls = generator.calls();
        let fx = fixture(generator);
        let d = queued(&fx, Journey::Raise, "pitch_deck").await;

        fx.service.process(d.id).await.unwrap();
        fx.service.process(d.id).await.unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generator_failure_marks_error_without_fact() {
        let fx = fixture(EchoGenerator::failing());
        let d = queued(&fx, Journey::Sell, "cim").await;

        let failed = fx.service.process(d.id).await.unwrap().unwrap();

        assert_eq!(failed.status, DeliverableStatus::Error);
        assert!(failed.error_message.is_some());
        let deal = fx.deals.get_deal(d.deal_id).unwrap();
        assert!(!deal.financials.has(keys::CIM_GENERATED));
        assert!(fx.service.pending(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn completing_unclaimed_deliverable_is_rejected() {
        let fx = fixture(EchoGenerator::default());
        let d = queued(&fx, Journey::Pmi, "integration_plan").await;

        let err = fx.service.complete(d.id, "text".into()).await.unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert_eq!(fx.service.get(d.id).unwrap().status, DeliverableStatus::Queued);
    }

    /// Cutoff that treats every current claim as stale.
    fn just_after_now() -> chrono::NaiveDateTime {
        Utc::now().naive_utc() + Duration::seconds(1)
    }

    #[tokio::test]
    async fn stuck_generation_is_requeued_then_given_up() {
        let fx = fixture(EchoGenerator::default());
        let d = queued(&fx, Journey::Sell, "teaser").await;
        fx.service.claim(d.id).await.unwrap().unwrap();

        // Freshly claimed rows are left alone.
        let fresh = fx.service.release_stale(Duration::hours(1)).await.unwrap();
        assert_eq!(fresh, StaleRelease::default());

        for _ in 1..MAX_GENERATION_ATTEMPTS {
            let released = fx
                .store
                .release_stale(just_after_now(), MAX_GENERATION_ATTEMPTS)
                .await
                .unwrap();
            assert_eq!(released.requeued, 1);
            assert!(fx.service.claim(d.id).await.unwrap().is_some());
        }

        let last = fx
            .store
            .release_stale(just_after_now(), MAX_GENERATION_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(last, StaleRelease { requeued: 0, failed: 1 });
        let dead = fx.service.get(d.id).unwrap();
        assert_eq!(dead.status, DeliverableStatus::Error);
        assert_eq!(dead.attempts, MAX_GENERATION_ATTEMPTS);
        assert!(fx.service.release_stale(Duration::zero()).await.is_err());
    }

    #[tokio::test]
    async fn requeued_generation_completes_on_the_next_pass() {
        let fx = fixture(EchoGenerator::default());
        let d = queued(&fx, Journey::Sell, "valuation_report").await;
        fx.service.claim(d.id).await.unwrap().unwrap();
        fx.store
            .release_stale(just_after_now(), MAX_GENERATION_ATTEMPTS)
            .await
            .unwrap();

        let done = fx.service.process(d.id).await.unwrap().unwrap();
        assert_eq!(done.status, DeliverableStatus::Complete);
        assert_eq!(done.attempts, 2);
        let deal = fx.deals.get_deal(d.deal_id).unwrap();
        assert!(deal.financials.has(keys::VALUATION_REPORT_GENERATED));
    }

    #[tokio::test]
    async fn pending_lists_queued_oldest_first() {
        let fx = fixture(EchoGenerator::default());
        let a = queued(&fx, Journey::Sell, "teaser").await;
        let b = queued(&fx, Journey::Sell, "cim").await;
        fx.service.claim(a.id).await.unwrap();

        let pending = fx.service.pending(10).unwrap();
        assert_eq!(pending.iter().map(|d| d.id).collect::<Vec<_>>(), vec![b.id]);
        assert!(fx.service.pending(0).is_err());
    }

    #[tokio::test]
    async fn purchased_deliverable_flows_to_completion() {
        let fx = fixture(EchoGenerator::default());
        let purchases = PurchaseService::new(fx.deals.clone(), fx.store.clone(), None);
        let deal = fx.deals.create_deal(7, Journey::Pmi, None).await.unwrap();

        let receipt = purchases
            .purchase(7, deal.id, "day_one_checklist")
            .await
            .unwrap();
        fx.service.process(receipt.deliverable_id).await.unwrap();

        let deal = fx.deals.get_deal(deal.id).unwrap();
        assert!(deal.financials.has(keys::DAY_ONE_CHECKLIST_GENERATED));
        assert_eq!(fx.service.list_for_deal(deal.id).unwrap().len(), 1);
    }
}
