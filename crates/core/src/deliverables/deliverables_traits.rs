//! Deliverable repository, service, and generation traits.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};

use super::deliverables_model::{
    ChargeOutcome, Deliverable, GenerationJob, NewDeliverable, PriceQuote, PurchaseReceipt,
    StaleRelease,
};
use crate::deals::{Deal, Facts};
use crate::errors::Result;
use crate::gates::Gate;
use crate::wallet::DebitRequest;

#[async_trait]
pub trait DeliverableRepositoryTrait: Send + Sync {
    /// Debits the wallet (when `charge` is given) and inserts the queued
    /// deliverable in one transaction. An insufficient balance writes nothing.
    ///
    /// With `paywall_from` set, the same transaction first requires the deal
    /// to still be at that gate (`Error::InvalidGateTransition` otherwise),
    /// and an existing deliverable of the item is returned with
    /// `already_owned` instead of charging again.
    async fn create_with_charge(
        &self,
        new_deliverable: NewDeliverable,
        charge: Option<DebitRequest>,
    ) -> Result<ChargeOutcome>;

    /// Fails with `Error::DeliverableNotFound` when absent.
    fn get_by_id(&self, deliverable_id: i64) -> Result<Deliverable>;

    fn list_for_deal(&self, deal_id: i64) -> Result<Vec<Deliverable>>;

    /// Queued deliverables, oldest first.
    fn list_queued(&self, limit: i64) -> Result<Vec<Deliverable>>;

    /// Conditional `queued -> generating`, bumping the attempt counter.
    /// `None` when someone else already claimed it.
    async fn claim(&self, deliverable_id: i64) -> Result<Option<Deliverable>>;

    /// Conditional `generating -> complete`, merging `completion` into the
    /// owning deal's financials in the same transaction. `None` when the row
    /// was not generating.
    async fn complete(
        &self,
        deliverable_id: i64,
        content: String,
        completion: Facts,
    ) -> Result<Option<Deliverable>>;

    /// Marks a non-terminal deliverable as failed. `None` when it was already
    /// terminal.
    async fn fail(&self, deliverable_id: i64, message: String) -> Result<Option<Deliverable>>;

    /// Puts `generating` rows last touched before `cutoff` back to `queued`.
    /// Rows that already used `max_attempts` claims are failed instead.
    async fn release_stale(&self, cutoff: NaiveDateTime, max_attempts: i32)
        -> Result<StaleRelease>;
}

/// Prices and buys catalog items against a deal.
#[async_trait]
pub trait PurchaseServiceTrait: Send + Sync {
    /// Current price of `item_slug` for the deal, without charging.
    async fn quote(&self, user_id: i64, deal_id: i64, item_slug: &str) -> Result<PriceQuote>;

    async fn purchase(&self, user_id: i64, deal_id: i64, item_slug: &str)
        -> Result<PurchaseReceipt>;

    /// Buys the unlock item of the paywalled gate after `from`. Charges at
    /// most once per deal however many callers race, and refuses once the
    /// deal has left `from`.
    async fn purchase_unlock(&self, user_id: i64, deal_id: i64, from: Gate)
        -> Result<PurchaseReceipt>;
}

/// Generation lifecycle used by workers.
#[async_trait]
pub trait DeliverableServiceTrait: Send + Sync {
    fn get(&self, deliverable_id: i64) -> Result<Deliverable>;

    fn list_for_deal(&self, deal_id: i64) -> Result<Vec<Deliverable>>;

    fn pending(&self, limit: i64) -> Result<Vec<Deliverable>>;

    async fn claim(&self, deliverable_id: i64) -> Result<Option<Deliverable>>;

    /// Stores the content and records the item's completion fact on the deal.
    async fn complete(&self, deliverable_id: i64, content: String) -> Result<Deliverable>;

    async fn fail(&self, deliverable_id: i64, message: &str) -> Result<Deliverable>;

    /// Requeues deliverables stuck in `generating` for longer than
    /// `older_than`, e.g. after a worker crash.
    async fn release_stale(&self, older_than: Duration) -> Result<StaleRelease>;

    /// Claims, generates and settles one deliverable. Returns `None` when
    /// another worker holds it.
    async fn process(&self, deliverable_id: i64) -> Result<Option<Deliverable>>;
}

/// Notified after a purchase commits. Delivery is at-least-once.
#[async_trait]
pub trait GenerationQueue: Send + Sync {
    async fn enqueue(&self, job: GenerationJob) -> Result<()>;
}

/// Produces the content of a deliverable.
#[async_trait]
pub trait DeliverableGenerator: Send + Sync {
    async fn generate(&self, job: &GenerationJob, deal: &Deal) -> Result<String>;
}
