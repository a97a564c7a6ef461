use async_trait::async_trait;
use serde::Serialize;

use super::gates_model::Gate;
use super::readiness::ReadinessReport;
use crate::deliverables::{PriceQuote, PurchaseReceipt};
use crate::errors::Result;

/// Result of asking a deal to leave its current gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Checklist items are missing. `paywall` carries the price of the next
    /// gate when it is paywalled and not yet paid for.
    Blocked {
        gate: Gate,
        missing: Vec<String>,
        paywall: Option<PriceQuote>,
    },
    /// Data is complete but the next gate has not been paid for.
    PaymentRequired { gate: Gate, quote: PriceQuote },
    Advanced {
        from: Gate,
        to: Gate,
        purchase: Option<PurchaseReceipt>,
    },
    /// Already at the last gate; nothing changed.
    Terminal { gate: Gate },
}

impl AdvanceOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, AdvanceOutcome::Advanced { .. })
    }
}

/// Readiness, paywall and gate movement for one deal.
#[async_trait]
pub trait GateServiceTrait: Send + Sync {
    /// Readiness of the deal's current gate.
    fn readiness(&self, deal_id: i64) -> Result<ReadinessReport>;

    /// Advances when the checklist is complete and any paywall is satisfied.
    /// Never charges the wallet.
    async fn try_advance(&self, user_id: i64, deal_id: i64, from: Gate)
        -> Result<AdvanceOutcome>;

    /// Like [`GateServiceTrait::try_advance`], buying the unlock item first
    /// when the next gate is paywalled and unpaid.
    async fn unlock_and_advance(
        &self,
        user_id: i64,
        deal_id: i64,
        from: Gate,
    ) -> Result<AdvanceOutcome>;
}
