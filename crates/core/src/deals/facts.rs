//! Typed open map of qualitative deal facts.
//!
//! Extraction and conversation layers drop arbitrary keys in here; the
//! readiness checklists only ever read the keys listed in [`keys`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::Result;

/// Version of the known-key set below. Bump when a checklist starts reading a
/// new key.
pub const FACT_KEYS_VERSION: u32 = 1;

/// Known fact keys read by gate checklists.
pub mod keys {
    // Sell
    pub const EXIT_MOTIVATION: &str = "exit_motivation";
    pub const TIMELINE_PREFERENCE: &str = "timeline_preference";
    pub const YEARS_IN_BUSINESS: &str = "years_in_business";
    pub const EMPLOYEE_COUNT: &str = "employee_count";
    pub const OWNER_INVOLVEMENT: &str = "owner_involvement";
    pub const VALUATION_REPORT_GENERATED: &str = "valuation_report_generated";
    pub const CIM_GENERATED: &str = "cim_generated";
    pub const TEASER_GENERATED: &str = "teaser_generated";
    pub const BUYER_LIST_GENERATED: &str = "buyer_list_generated";
    pub const LOI_RECEIVED: &str = "loi_received";

    // Buy
    pub const ACQUISITION_THESIS: &str = "acquisition_thesis";
    pub const TARGET_IDENTIFIED: &str = "target_identified";
    pub const TARGET_FINANCIALS_RECEIVED: &str = "target_financials_received";
    pub const ACQUISITION_VALUATION_GENERATED: &str = "acquisition_valuation_generated";
    pub const DD_CHECKLIST_GENERATED: &str = "dd_checklist_generated";
    pub const FINANCING_PLAN: &str = "financing_plan";
    pub const LOI_DRAFT_GENERATED: &str = "loi_draft_generated";
    pub const LOI_SIGNED: &str = "loi_signed";

    // Raise
    pub const RAISE_AMOUNT: &str = "raise_amount";
    pub const USE_OF_FUNDS: &str = "use_of_funds";
    pub const GROWTH_RATE: &str = "growth_rate";
    pub const FINANCIAL_MODEL_GENERATED: &str = "financial_model_generated";
    pub const PITCH_DECK_GENERATED: &str = "pitch_deck_generated";
    pub const INVESTOR_LIST_GENERATED: &str = "investor_list_generated";
    pub const TERM_SHEET_RECEIVED: &str = "term_sheet_received";

    // PMI
    pub const ACQUISITION_CLOSE_DATE: &str = "acquisition_close_date";
    pub const INTEGRATION_LEAD: &str = "integration_lead";
    pub const DAY_ONE_CHECKLIST_GENERATED: &str = "day_one_checklist_generated";
    pub const KEY_STAFF_RETAINED: &str = "key_staff_retained";
    pub const INTEGRATION_PLAN_GENERATED: &str = "integration_plan_generated";
    pub const SYNERGY_TARGETS: &str = "synergy_targets";
    pub const SYNERGY_TRACKER_GENERATED: &str = "synergy_tracker_generated";
}

/// A primitive fact value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl FactValue {
    /// Whether the value counts as "provided" for a checklist: `false` and
    /// blank text do not.
    pub fn is_present(&self) -> bool {
        match self {
            FactValue::Bool(b) => *b,
            FactValue::Number(_) => true,
            FactValue::Text(s) => !s.trim().is_empty(),
        }
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool(value)
    }
}

impl From<i64> for FactValue {
    fn from(value: i64) -> Self {
        FactValue::Number(value)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::Text(value.to_string())
    }
}

impl From<String> for FactValue {
    fn from(value: String) -> Self {
        FactValue::Text(value)
    }
}

/// String-keyed fact bag stored as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facts(BTreeMap<String, FactValue>);

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FactValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FactValue> {
        self.0.get(key)
    }

    /// True when `key` holds a present value (see [`FactValue::is_present`]).
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(FactValue::is_present)
    }

    /// Shallow merge: keys in `patch` overwrite existing keys.
    pub fn merge(&mut self, patch: Facts) {
        self.0.extend(patch.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactValue)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored bag. Empty strings decode to an empty bag.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Facts::new());
        }
        Ok(serde_json::from_str(raw)?)
    }
}
