//! Deliverable domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::gates::Gate;
use crate::league::League;
use crate::wallet::WalletTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliverableStatus {
    Queued,
    Generating,
    Complete,
    /// Terminal. A fresh purchase is needed to try again.
    Error,
}

impl DeliverableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliverableStatus::Queued => "queued",
            DeliverableStatus::Generating => "generating",
            DeliverableStatus::Complete => "complete",
            DeliverableStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliverableStatus::Complete | DeliverableStatus::Error)
    }
}

impl fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliverableStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(DeliverableStatus::Queued),
            "generating" => Ok(DeliverableStatus::Generating),
            "complete" => Ok(DeliverableStatus::Complete),
            "error" => Ok(DeliverableStatus::Error),
            other => Err(Error::invalid_input(format!(
                "Unknown deliverable status '{}'",
                other
            ))),
        }
    }
}

/// A purchased artifact and its generation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub id: i64,
    pub deal_id: i64,
    pub user_id: i64,
    /// Catalog slug.
    pub item_ref: String,
    pub status: DeliverableStatus,
    /// Amount actually charged, after the league multiplier.
    pub price_cents: i64,
    /// Debit that paid for it; `None` for free items.
    pub transaction_id: Option<i64>,
    pub content: Option<String>,
    pub error_message: Option<String>,
    pub attempts: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Input model for a deliverable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeliverable {
    pub deal_id: i64,
    pub user_id: i64,
    pub item_ref: String,
    pub price_cents: i64,
    /// Set when the purchase pays a paywall: the gate the deal must still be
    /// at. The deal is then charged at most once for this item.
    pub paywall_from: Option<Gate>,
}

/// What `create_with_charge` committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub deliverable: Deliverable,
    /// Debit taken by this call.
    pub transaction: Option<WalletTransaction>,
    /// The deal already owned the paywall item. `deliverable` is that earlier
    /// row and nothing was written.
    pub already_owned: bool,
}

/// Counts from releasing deliverables a worker stopped reporting on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaleRelease {
    pub requeued: usize,
    /// Out of attempts; marked as error.
    pub failed: usize,
}

/// League-adjusted price for one catalog item on one deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub item_ref: String,
    pub base_price_cents: i64,
    pub league: Option<League>,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub deliverable_id: i64,
    pub item_ref: String,
    pub price_charged_cents: i64,
    pub status: DeliverableStatus,
    pub league: Option<League>,
    pub transaction_id: Option<i64>,
    /// Paywall purchase that found the item already bought; nothing charged.
    pub already_owned: bool,
}

/// Work item handed to a generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub deliverable_id: i64,
    pub deal_id: i64,
    pub item_ref: String,
}

impl From<&Deliverable> for GenerationJob {
    fn from(d: &Deliverable) -> Self {
        Self {
            deliverable_id: d.id,
            deal_id: d.deal_id,
            item_ref: d.item_ref.clone(),
        }
    }
}
