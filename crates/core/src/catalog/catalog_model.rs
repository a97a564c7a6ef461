use serde::Serialize;

use crate::gates::{Gate, Journey};

/// A purchasable deliverable. Prices are quoted before the league multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub slug: &'static str,
    pub name: &'static str,
    pub journey: Journey,
    pub base_price_cents: i64,
    /// Paywalled gate this purchase opens.
    pub unlocks_gate: Option<Gate>,
}

impl CatalogItem {
    /// Fact recorded on the deal once the deliverable has been generated.
    pub fn completion_fact(&self) -> String {
        format!("{}_generated", self.slug)
    }

    pub fn is_free(&self) -> bool {
        self.base_price_cents == 0
    }
}
