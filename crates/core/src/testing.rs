//! In-memory repositories shared by the service tests.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::deals::{Deal, DealPatch, DealRepositoryTrait, DealStatus, Facts, NewDeal};
use crate::deliverables::{
    ChargeOutcome, Deliverable, DeliverableGenerator, DeliverableRepositoryTrait,
    DeliverableStatus, GenerationJob, GenerationQueue, NewDeliverable, StaleRelease,
};
use crate::errors::{Error, Result};
use crate::gates::registry::{first_gate, journey_gates};
use crate::gates::{Gate, GateEvent, GateProgress, GateStatus, Journey};
use crate::league::League;
use crate::wallet::{
    CreditReceipt, DebitReceipt, DebitRequest, NewCredit, RefundReceipt, TransactionKind,
    Wallet, WalletError, WalletRepositoryTrait, WalletTransaction,
};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Unsaved deal at the first gate of `journey` with no data.
pub fn sample_deal(journey: Journey) -> Deal {
    let ts = now();
    Deal {
        id: 1,
        user_id: 1,
        journey,
        current_gate: first_gate(journey),
        league: None,
        industry: None,
        location: None,
        revenue_cents: None,
        sde_cents: None,
        ebitda_cents: None,
        asking_price_cents: None,
        capital_available_cents: None,
        target_deal_size_cents: None,
        financials: Facts::new(),
        status: DealStatus::Active,
        created_at: ts,
        updated_at: ts,
    }
}

#[derive(Default)]
struct State {
    next_id: i64,
    deals: BTreeMap<i64, Deal>,
    progress: BTreeMap<i64, Vec<GateProgress>>,
    events: Vec<GateEvent>,
    wallets: BTreeMap<i64, Wallet>,
    transactions: Vec<WalletTransaction>,
    deliverables: BTreeMap<i64, Deliverable>,
}

impl State {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn deal_mut(&mut self, deal_id: i64) -> Result<&mut Deal> {
        self.deals
            .get_mut(&deal_id)
            .ok_or(Error::DealNotFound(deal_id))
    }

    fn wallet_mut(&mut self, user_id: i64) -> &mut Wallet {
        self.wallets.entry(user_id).or_insert_with(|| {
            let ts = now();
            Wallet {
                user_id,
                balance_cents: 0,
                total_deposited_cents: 0,
                total_spent_cents: 0,
                created_at: ts,
                updated_at: ts,
            }
        })
    }

    fn push_transaction(
        &mut self,
        user_id: i64,
        kind: TransactionKind,
        amount_cents: i64,
        description: String,
    ) -> &mut WalletTransaction {
        let id = self.id();
        self.transactions.push(WalletTransaction {
            id,
            user_id,
            kind,
            amount_cents,
            description,
            external_ref: None,
            deal_id: None,
            item_ref: None,
            refunded_transaction_id: None,
            created_at: now(),
        });
        let last = self.transactions.len() - 1;
        &mut self.transactions[last]
    }

    /// Same contract as the conditional `UPDATE ... WHERE balance >= amount`.
    fn debit(&mut self, request: &DebitRequest) -> Result<(Wallet, WalletTransaction)> {
        let wallet = self.wallet_mut(request.user_id);
        if wallet.balance_cents < request.amount_cents {
            return Err(WalletError::InsufficientBalance {
                required: request.amount_cents,
                available: wallet.balance_cents,
            }
            .into());
        }
        wallet.balance_cents -= request.amount_cents;
        wallet.total_spent_cents += request.amount_cents;
        wallet.updated_at = now();
        let wallet = wallet.clone();

        let tx = self.push_transaction(
            request.user_id,
            TransactionKind::Debit,
            request.amount_cents,
            request.description.clone(),
        );
        tx.deal_id = request.deal_id;
        tx.item_ref = request.item_ref.clone();
        Ok((wallet, tx.clone()))
    }
}

/// One store behind a mutex implementing every repository trait, so
/// multi-step operations are atomic the way a storage transaction is.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Writes a cached league without reclassifying.
    pub fn force_league(&self, deal_id: i64, league: Option<League>) {
        let mut state = self.state.lock().unwrap();
        state.deal_mut(deal_id).unwrap().league = league;
    }
}

#[async_trait]
impl WalletRepositoryTrait for MemoryStore {
    fn get_wallet(&self, user_id: i64) -> Result<Option<Wallet>> {
        Ok(self.state.lock().unwrap().wallets.get(&user_id).cloned())
    }

    async fn get_or_create(&self, user_id: i64) -> Result<Wallet> {
        Ok(self.state.lock().unwrap().wallet_mut(user_id).clone())
    }

    async fn credit(&self, credit: NewCredit) -> Result<CreditReceipt> {
        let mut state = self.state.lock().unwrap();
        let existing = credit.external_ref.as_ref().and_then(|r| {
            state
                .transactions
                .iter()
                .find(|t| t.kind == TransactionKind::Credit && t.external_ref.as_ref() == Some(r))
                .cloned()
        });
        if let Some(existing) = existing {
            if existing.user_id != credit.user_id {
                return Err(Error::ConstraintViolation("payment reference reused".into()));
            }
            let wallet = state.wallet_mut(credit.user_id).clone();
            return Ok(CreditReceipt {
                wallet,
                transaction: existing,
                duplicate: true,
            });
        }

        let wallet = state.wallet_mut(credit.user_id);
        wallet.balance_cents += credit.amount_cents;
        wallet.total_deposited_cents += credit.amount_cents;
        wallet.updated_at = now();
        let wallet = wallet.clone();

        let tx = state.push_transaction(
            credit.user_id,
            TransactionKind::Credit,
            credit.amount_cents,
            credit.description,
        );
        tx.external_ref = credit.external_ref;
        Ok(CreditReceipt {
            wallet,
            transaction: tx.clone(),
            duplicate: false,
        })
    }

    async fn debit(&self, request: DebitRequest) -> Result<DebitReceipt> {
        let (wallet, transaction) = self.state.lock().unwrap().debit(&request)?;
        Ok(DebitReceipt {
            wallet,
            transaction,
        })
    }

    async fn refund(&self, transaction_id: i64) -> Result<RefundReceipt> {
        let mut state = self.state.lock().unwrap();
        let original = state
            .transactions
            .iter()
            .find(|t| t.id == transaction_id && t.kind == TransactionKind::Debit)
            .cloned()
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;
        if state
            .transactions
            .iter()
            .any(|t| t.refunded_transaction_id == Some(transaction_id))
        {
            return Err(WalletError::AlreadyRefunded(transaction_id).into());
        }

        let wallet = state.wallet_mut(original.user_id);
        wallet.balance_cents += original.amount_cents;
        wallet.total_spent_cents -= original.amount_cents;
        wallet.updated_at = now();
        let wallet = wallet.clone();

        let refund = state.push_transaction(
            original.user_id,
            TransactionKind::Refund,
            original.amount_cents,
            format!("Refund: {}", original.description),
        );
        refund.deal_id = original.deal_id;
        refund.item_ref = original.item_ref;
        refund.refunded_transaction_id = Some(transaction_id);
        Ok(RefundReceipt {
            wallet,
            refund: refund.clone(),
        })
    }

    fn get_transaction(&self, transaction_id: i64) -> Result<Option<WalletTransaction>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned())
    }

    fn list_transactions(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>> {
        let state = self.state.lock().unwrap();
        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DealRepositoryTrait for MemoryStore {
    async fn create(&self, new_deal: NewDeal) -> Result<Deal> {
        let mut state = self.state.lock().unwrap();
        let id = state.id();
        let mut deal = sample_deal(new_deal.journey);
        deal.id = id;
        deal.user_id = new_deal.user_id;
        deal.current_gate = new_deal.first_gate;
        deal.league = new_deal.league;
        deal.financials = new_deal.financials;
        new_deal.fields.apply_to(&mut deal);

        let progress = journey_gates(new_deal.journey)
            .iter()
            .map(|gate| GateProgress {
                deal_id: id,
                gate: *gate,
                status: if *gate == new_deal.first_gate {
                    GateStatus::Active
                } else {
                    GateStatus::Locked
                },
                completed_at: None,
                data: Facts::new(),
            })
            .collect();
        state.progress.insert(id, progress);
        state.deals.insert(id, deal.clone());
        Ok(deal)
    }

    fn get_by_id(&self, deal_id: i64) -> Result<Deal> {
        let state = self.state.lock().unwrap();
        state
            .deals
            .get(&deal_id)
            .cloned()
            .ok_or(Error::DealNotFound(deal_id))
    }

    fn list_by_user(&self, user_id: i64) -> Result<Vec<Deal>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .deals
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_fields(&self, deal_id: i64, patch: DealPatch) -> Result<Deal> {
        let mut state = self.state.lock().unwrap();
        let deal = state.deal_mut(deal_id)?;
        patch.apply_to(deal);
        deal.league = deal.classify_league().map(|i| i.league);
        deal.updated_at = now();
        Ok(deal.clone())
    }

    async fn merge_financials(&self, deal_id: i64, facts: Facts) -> Result<Deal> {
        let mut state = self.state.lock().unwrap();
        let deal = state.deal_mut(deal_id)?;
        deal.financials.merge(facts);
        deal.updated_at = now();
        Ok(deal.clone())
    }

    async fn refresh_league(&self, deal_id: i64) -> Result<Deal> {
        let mut state = self.state.lock().unwrap();
        let deal = state.deal_mut(deal_id)?;
        deal.league = deal.classify_league().map(|i| i.league);
        Ok(deal.clone())
    }

    async fn set_status(&self, deal_id: i64, status: DealStatus) -> Result<Deal> {
        let mut state = self.state.lock().unwrap();
        let deal = state.deal_mut(deal_id)?;
        deal.status = status;
        Ok(deal.clone())
    }

    async fn advance_gate(&self, deal_id: i64, from: Gate, to: Gate) -> Result<GateEvent> {
        let mut state = self.state.lock().unwrap();
        let deal = state.deal_mut(deal_id)?;
        if deal.current_gate != from {
            return Err(Error::InvalidGateTransition {
                deal_id,
                expected: from.to_string(),
                actual: deal.current_gate.to_string(),
            });
        }
        let ts = now();
        deal.current_gate = to;
        deal.updated_at = ts;

        for row in state.progress.entry(deal_id).or_default() {
            if row.gate == from {
                row.status = GateStatus::Completed;
                row.completed_at = Some(ts);
            } else if row.gate == to {
                row.status = GateStatus::Active;
            }
        }
        let event = GateEvent {
            id: state.id(),
            deal_id,
            from_gate: from,
            to_gate: to,
            created_at: ts,
        };
        state.events.push(event.clone());
        Ok(event)
    }

    fn list_progress(&self, deal_id: i64) -> Result<Vec<GateProgress>> {
        let state = self.state.lock().unwrap();
        Ok(state.progress.get(&deal_id).cloned().unwrap_or_default())
    }

    fn list_events(&self, deal_id: i64) -> Result<Vec<GateEvent>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|e| e.deal_id == deal_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DeliverableRepositoryTrait for MemoryStore {
    async fn create_with_charge(
        &self,
        new_deliverable: NewDeliverable,
        charge: Option<DebitRequest>,
    ) -> Result<ChargeOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(from) = new_deliverable.paywall_from {
            let deal = state.deal_mut(new_deliverable.deal_id)?;
            if deal.current_gate != from {
                return Err(Error::InvalidGateTransition {
                    deal_id: deal.id,
                    expected: from.to_string(),
                    actual: deal.current_gate.to_string(),
                });
            }
            let existing = state.deliverables.values().find(|d| {
                d.deal_id == new_deliverable.deal_id && d.item_ref == new_deliverable.item_ref
            });
            if let Some(existing) = existing {
                return Ok(ChargeOutcome {
                    deliverable: existing.clone(),
                    transaction: None,
                    already_owned: true,
                });
            }
        }
        let transaction = match &charge {
            Some(request) => Some(state.debit(request)?.1),
            None => None,
        };
        let ts = now();
        let deliverable = Deliverable {
            id: state.id(),
            deal_id: new_deliverable.deal_id,
            user_id: new_deliverable.user_id,
            item_ref: new_deliverable.item_ref,
            status: DeliverableStatus::Queued,
            price_cents: new_deliverable.price_cents,
            transaction_id: transaction.as_ref().map(|t| t.id),
            content: None,
            error_message: None,
            attempts: 0,
            created_at: ts,
            updated_at: ts,
            completed_at: None,
        };
        state.deliverables.insert(deliverable.id, deliverable.clone());
        Ok(ChargeOutcome {
            deliverable,
            transaction,
            already_owned: false,
        })
    }

    fn get_by_id(&self, deliverable_id: i64) -> Result<Deliverable> {
        let state = self.state.lock().unwrap();
        state
            .deliverables
            .get(&deliverable_id)
            .cloned()
            .ok_or(Error::DeliverableNotFound(deliverable_id))
    }

    fn list_for_deal(&self, deal_id: i64) -> Result<Vec<Deliverable>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .deliverables
            .values()
            .filter(|d| d.deal_id == deal_id)
            .cloned()
            .collect())
    }

    fn list_queued(&self, limit: i64) -> Result<Vec<Deliverable>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .deliverables
            .values()
            .filter(|d| d.status == DeliverableStatus::Queued)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn claim(&self, deliverable_id: i64) -> Result<Option<Deliverable>> {
        let mut state = self.state.lock().unwrap();
        let d = state
            .deliverables
            .get_mut(&deliverable_id)
            .ok_or(Error::DeliverableNotFound(deliverable_id))?;
        if d.status != DeliverableStatus::Queued {
            return Ok(None);
        }
        d.status = DeliverableStatus::Generating;
        d.attempts += 1;
        d.updated_at = now();
        Ok(Some(d.clone()))
    }

    async fn complete(
        &self,
        deliverable_id: i64,
        content: String,
        completion: Facts,
    ) -> Result<Option<Deliverable>> {
        let mut state = self.state.lock().unwrap();
        let d = state
            .deliverables
            .get(&deliverable_id)
            .ok_or(Error::DeliverableNotFound(deliverable_id))?;
        if d.status != DeliverableStatus::Generating {
            return Ok(None);
        }
        let deal_id = d.deal_id;
        let ts = now();
        let deal = state.deal_mut(deal_id)?;
        deal.financials.merge(completion);
        deal.updated_at = ts;

        let d = state
            .deliverables
            .get_mut(&deliverable_id)
            .ok_or(Error::DeliverableNotFound(deliverable_id))?;
        d.status = DeliverableStatus::Complete;
        d.content = Some(content);
        d.completed_at = Some(ts);
        d.updated_at = ts;
        Ok(Some(d.clone()))
    }

    async fn fail(&self, deliverable_id: i64, message: String) -> Result<Option<Deliverable>> {
        let mut state = self.state.lock().unwrap();
        let d = state
            .deliverables
            .get_mut(&deliverable_id)
            .ok_or(Error::DeliverableNotFound(deliverable_id))?;
        if d.status.is_terminal() {
            return Ok(None);
        }
        d.status = DeliverableStatus::Error;
        d.error_message = Some(message);
        d.updated_at = now();
        Ok(Some(d.clone()))
    }

    async fn release_stale(
        &self,
        cutoff: NaiveDateTime,
        max_attempts: i32,
    ) -> Result<StaleRelease> {
        let mut state = self.state.lock().unwrap();
        let ts = now();
        let mut release = StaleRelease::default();
        for d in state.deliverables.values_mut() {
            if d.status != DeliverableStatus::Generating || d.updated_at >= cutoff {
                continue;
            }
            if d.attempts >= max_attempts {
                d.status = DeliverableStatus::Error;
                d.error_message = Some("generation timed out".into());
                release.failed += 1;
            } else {
                d.status = DeliverableStatus::Queued;
                release.requeued += 1;
            }
            d.updated_at = ts;
        }
        Ok(release)
    }
}

/// Queue that records jobs, optionally refusing them.
#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<GenerationJob>>,
    fail: bool,
}

impl RecordingQueue {
    pub fn failing() -> Self {
        Self {
            jobs: Mutex::default(),
            fail: true,
        }
    }

    pub fn jobs(&self) -> Vec<GenerationJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationQueue for RecordingQueue {
    async fn enqueue(&self, job: GenerationJob) -> Result<()> {
        if self.fail {
            return Err(Error::Unexpected("queue offline".into()));
        }
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// Generator returning a fixed string that names the item.
#[derive(Default)]
pub struct EchoGenerator {
    calls: Arc<AtomicUsize>,
    fail: AtomicBool,
}

impl EchoGenerator {
    pub fn failing() -> Self {
        Self {
            calls: Arc::default(),
            fail: AtomicBool::new(true),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl DeliverableGenerator for EchoGenerator {
    async fn generate(&self, job: &GenerationJob, deal: &Deal) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Unexpected("model timed out".into()));
        }
        Ok(format!("{} for deal {}", job.item_ref, deal.id))
    }
}
