use log::{debug, info};
use std::sync::Arc;

use super::gates_model::Gate;
use super::gates_traits::{AdvanceOutcome, GateServiceTrait};
use super::readiness::{check_readiness, ReadinessReport};
use crate::catalog::{unlock_item_for, CatalogItem};
use crate::deals::{Deal, DealServiceTrait};
use crate::deliverables::{DeliverableRepositoryTrait, PurchaseServiceTrait};
use crate::errors::{Error, Result};

/// Composes readiness, the paywall check and purchasing into gate movement.
pub struct GateService {
    deal_service: Arc<dyn DealServiceTrait>,
    deliverables: Arc<dyn DeliverableRepositoryTrait>,
    purchases: Arc<dyn PurchaseServiceTrait>,
}

/// What stands between a deal and its next gate.
struct Assessment {
    report: ReadinessReport,
    /// Unlock item of the next gate, when that gate is paywalled and unpaid.
    unpaid: Option<&'static CatalogItem>,
}

impl GateService {
    pub fn new(
        deal_service: Arc<dyn DealServiceTrait>,
        deliverables: Arc<dyn DeliverableRepositoryTrait>,
        purchases: Arc<dyn PurchaseServiceTrait>,
    ) -> Self {
        Self {
            deal_service,
            deliverables,
            purchases,
        }
    }

    fn load(&self, user_id: i64, deal_id: i64, from: Gate) -> Result<Deal> {
        let deal = self.deal_service.get_deal(deal_id)?;
        if deal.user_id != user_id {
            return Err(Error::invalid_input(format!(
                "Deal {} does not belong to user {}",
                deal_id, user_id
            )));
        }
        if deal.current_gate != from {
            return Err(Error::InvalidGateTransition {
                deal_id,
                expected: from.to_string(),
                actual: deal.current_gate.to_string(),
            });
        }
        Ok(deal)
    }

    fn assess(&self, deal: &Deal) -> Result<Assessment> {
        let report = check_readiness(deal.current_gate, deal);
        let unpaid = match report.paywall_gate.and_then(unlock_item_for) {
            Some(item) if !self.owns(deal.id, item)? => Some(item),
            _ => None,
        };
        Ok(Assessment { report, unpaid })
    }

    /// Paywall is satisfied once any deliverable of the unlock item exists for
    /// the deal: the charge has been taken whatever its generation state.
    fn owns(&self, deal_id: i64, item: &CatalogItem) -> Result<bool> {
        Ok(self
            .deliverables
            .list_for_deal(deal_id)?
            .iter()
            .any(|d| d.item_ref == item.slug))
    }

    async fn blocked(
        &self,
        user_id: i64,
        deal: &Deal,
        assessment: Assessment,
    ) -> Result<AdvanceOutcome> {
        let paywall = match assessment.unpaid {
            Some(item) => Some(self.purchases.quote(user_id, deal.id, item.slug).await?),
            None => None,
        };
        debug!(
            "Deal {} blocked at {}: {:?}",
            deal.id, deal.current_gate, assessment.report.missing
        );
        Ok(AdvanceOutcome::Blocked {
            gate: deal.current_gate,
            missing: assessment.report.missing,
            paywall,
        })
    }

    async fn advance(&self, deal: &Deal, from: Gate) -> Result<Option<Gate>> {
        self.deal_service.advance_gate(deal.id, from).await
    }
}

#[async_trait::async_trait]
impl GateServiceTrait for GateService {
    fn readiness(&self, deal_id: i64) -> Result<ReadinessReport> {
        let deal = self.deal_service.get_deal(deal_id)?;
        Ok(check_readiness(deal.current_gate, &deal))
    }

    async fn try_advance(
        &self,
        user_id: i64,
        deal_id: i64,
        from: Gate,
    ) -> Result<AdvanceOutcome> {
        let deal = self.load(user_id, deal_id, from)?;
        let assessment = self.assess(&deal)?;

        if assessment.report.next_gate.is_none() {
            return Ok(AdvanceOutcome::Terminal { gate: from });
        }
        if !assessment.report.ready {
            return self.blocked(user_id, &deal, assessment).await;
        }
        if let (Some(item), Some(gate)) = (assessment.unpaid, assessment.report.paywall_gate) {
            let quote = self.purchases.quote(user_id, deal_id, item.slug).await?;
            return Ok(AdvanceOutcome::PaymentRequired { gate, quote });
        }

        match self.advance(&deal, from).await? {
            Some(to) => Ok(AdvanceOutcome::Advanced {
                from,
                to,
                purchase: None,
            }),
            None => Ok(AdvanceOutcome::Terminal { gate: from }),
        }
    }

    async fn unlock_and_advance(
        &self,
        user_id: i64,
        deal_id: i64,
        from: Gate,
    ) -> Result<AdvanceOutcome> {
        let deal = self.load(user_id, deal_id, from)?;
        let assessment = self.assess(&deal)?;

        if assessment.report.next_gate.is_none() {
            return Ok(AdvanceOutcome::Terminal { gate: from });
        }
        if !assessment.report.ready {
            return self.blocked(user_id, &deal, assessment).await;
        }

        // The charge re-checks the gate and ownership inside its own write,
        // so racing callers pay once and stragglers fail on the stale gate.
        let purchase = match assessment.unpaid {
            Some(item) => {
                let receipt = self.purchases.purchase_unlock(user_id, deal_id, from).await?;
                if !receipt.already_owned {
                    info!(
                        "Deal {} unlocked {:?} with {}",
                        deal_id, assessment.report.paywall_gate, item.slug
                    );
                }
                Some(receipt)
            }
            None => None,
        };

        match self.advance(&deal, from).await? {
            Some(to) => Ok(AdvanceOutcome::Advanced { from, to, purchase }),
            None => Ok(AdvanceOutcome::Terminal { gate: from }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::facts::keys;
    use crate::deals::{DealPatch, DealService, Facts};
    use crate::deliverables::{PurchaseService, PurchaseServiceTrait};
    use crate::gates::Journey;
    use crate::testing::MemoryStore;
    use crate::wallet::{WalletError, WalletService, WalletServiceTrait};

    struct Fixture {
        deals: Arc<DealService>,
        wallet: WalletService,
        purchases: Arc<PurchaseService>,
        gates: GateService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let deals = Arc::new(DealService::new(store.clone()));
        let purchases = Arc::new(PurchaseService::new(deals.clone(), store.clone(), None));
        Fixture {
            gates: GateService::new(deals.clone(), store.clone(), purchases.clone()),
            wallet: WalletService::new(store),
            purchases,
            deals,
        }
    }

    /// Sell deal sitting at S1 with its financial review complete.
    async fn reviewed_sell_deal(fx: &Fixture) -> Deal {
        let deal = fx
            .deals
            .create_deal(
                1,
                Journey::Sell,
                Some(DealPatch {
                    industry: Some("Landscaping".into()),
                    location: Some("Denver, CO".into()),
                    revenue_cents: Some(120_000_000),
                    sde_cents: Some(30_000_000),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        fx.deals
            .update_financials(
                deal.id,
                Facts::new()
                    .with(keys::EXIT_MOTIVATION, "retirement")
                    .with(keys::TIMELINE_PREFERENCE, "12 months")
                    .with(keys::YEARS_IN_BUSINESS, 14i64)
                    .with(keys::EMPLOYEE_COUNT, 9i64)
                    .with(keys::OWNER_INVOLVEMENT, "part-time"),
            )
            .await
            .unwrap();
        let outcome = fx.gates.try_advance(1, deal.id, Gate::S0).await.unwrap();
        assert_eq!(
            outcome,
            AdvanceOutcome::Advanced {
                from: Gate::S0,
                to: Gate::S1,
                purchase: None
            }
        );
        fx.deals.get_deal(deal.id).unwrap()
    }

    #[tokio::test]
    async fn incomplete_checklist_blocks_without_side_effects() {
        let fx = fixture();
        let deal = fx.deals.create_deal(1, Journey::Sell, None).await.unwrap();

        let outcome = fx.gates.try_advance(1, deal.id, Gate::S0).await.unwrap();

        match outcome {
            AdvanceOutcome::Blocked {
                gate,
                missing,
                paywall,
            } => {
                assert_eq!(gate, Gate::S0);
                assert_eq!(missing.len(), 6);
                assert!(paywall.is_none());
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
        assert!(fx.deals.gate_events(deal.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn paywalled_next_gate_requires_payment() {
        let fx = fixture();
        let deal = reviewed_sell_deal(&fx).await;

        let outcome = fx.gates.try_advance(1, deal.id, Gate::S1).await.unwrap();

        match outcome {
            AdvanceOutcome::PaymentRequired { gate, quote } => {
                assert_eq!(gate, Gate::S2);
                assert_eq!(quote.item_ref, "valuation_report");
                assert_eq!(quote.price_cents, 14_900);
            }
            other => panic!("expected PaymentRequired, got {other:?}"),
        }
        assert_eq!(fx.deals.get_deal(deal.id).unwrap().current_gate, Gate::S1);
    }

    #[tokio::test]
    async fn unlock_and_advance_charges_once() {
        let fx = fixture();
        let deal = reviewed_sell_deal(&fx).await;
        fx.wallet.credit(1, 20_000, "top-up", None).await.unwrap();

        let outcome = fx
            .gates
            .unlock_and_advance(1, deal.id, Gate::S1)
            .await
            .unwrap();

        let AdvanceOutcome::Advanced { from, to, purchase } = outcome else {
            panic!("expected Advanced, got {outcome:?}");
        };
        assert_eq!((from, to), (Gate::S1, Gate::S2));
        assert_eq!(purchase.unwrap().price_charged_cents, 14_900);
        assert_eq!(
            fx.wallet.get_or_create_wallet(1).await.unwrap().balance_cents,
            5_100
        );
    }

    #[tokio::test]
    async fn paid_paywall_lets_try_advance_through() {
        let fx = fixture();
        let deal = reviewed_sell_deal(&fx).await;
        fx.wallet.credit(1, 20_000, "top-up", None).await.unwrap();
        // Buy the report directly, then advance without paying again.
        fx.purchases
            .purchase(1, deal.id, "valuation_report")
            .await
            .unwrap();
        let outcome = fx.gates.try_advance(1, deal.id, Gate::S1).await.unwrap();

        assert!(outcome.is_advanced());
        assert_eq!(fx.wallet.history(1, None).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unaffordable_unlock_leaves_deal_in_place() {
        let fx = fixture();
        let deal = reviewed_sell_deal(&fx).await;
        fx.wallet.credit(1, 1_000, "top-up", None).await.unwrap();

        let err = fx
            .gates
            .unlock_and_advance(1, deal.id, Gate::S1)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Wallet(WalletError::InsufficientBalance { .. })
        ));
        assert_eq!(fx.deals.get_deal(deal.id).unwrap().current_gate, Gate::S1);
    }

    #[tokio::test]
    async fn blocked_before_paywall_carries_the_price() {
        let fx = fixture();
        let deal = reviewed_sell_deal(&fx).await;
        fx.deals
            .update_fields(
                deal.id,
                DealPatch {
                    sde_cents: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = fx.gates.try_advance(1, deal.id, Gate::S1).await.unwrap();
        let AdvanceOutcome::Blocked { missing, paywall, .. } = outcome else {
            panic!("expected Blocked, got {outcome:?}");
        };
        assert_eq!(missing, vec!["SDE or EBITDA"]);
        assert_eq!(paywall.unwrap().item_ref, "valuation_report");
    }

    #[tokio::test]
    async fn stale_gate_and_foreign_user_are_rejected() {
        let fx = fixture();
        let deal = reviewed_sell_deal(&fx).await;

        let err = fx.gates.try_advance(1, deal.id, Gate::S0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidGateTransition { .. }));

        let err = fx.gates.try_advance(2, deal.id, Gate::S1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn terminal_gate_reports_terminal() {
        let fx = fixture();
        let deal = fx.deals.create_deal(1, Journey::Pmi, None).await.unwrap();
        for gate in [Gate::Pmi0, Gate::Pmi1, Gate::Pmi2] {
            fx.deals.advance_gate(deal.id, gate).await.unwrap();
        }

        let outcome = fx.gates.try_advance(1, deal.id, Gate::Pmi3).await.unwrap();
        assert_eq!(outcome, AdvanceOutcome::Terminal { gate: Gate::Pmi3 });
        assert!(fx.gates.readiness(deal.id).unwrap().ready);
    }
}
