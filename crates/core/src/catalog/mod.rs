//! Catalog module - the static list of purchasable deliverables.

mod catalog_model;

pub use catalog_model::CatalogItem;

use crate::errors::{Error, Result};
use crate::gates::{Gate, Journey};

const fn item(
    slug: &'static str,
    name: &'static str,
    journey: Journey,
    base_price_cents: i64,
    unlocks_gate: Option<Gate>,
) -> CatalogItem {
    CatalogItem {
        slug,
        name,
        journey,
        base_price_cents,
        unlocks_gate,
    }
}

pub const CATALOG: &[CatalogItem] = &[
    item("valuation_report", "Valuation Report", Journey::Sell, 14_900, Some(Gate::S2)),
    item("cim", "Confidential Information Memorandum", Journey::Sell, 29_900, None),
    item("teaser", "Blind Teaser", Journey::Sell, 4_900, None),
    item("buyer_list", "Qualified Buyer List", Journey::Sell, 9_900, None),
    item(
        "acquisition_valuation",
        "Acquisition Valuation",
        Journey::Buy,
        14_900,
        Some(Gate::B2),
    ),
    item("dd_checklist", "Due Diligence Checklist", Journey::Buy, 9_900, None),
    item("loi_draft", "Letter of Intent Draft", Journey::Buy, 7_900, None),
    item("financial_model", "Financial Model", Journey::Raise, 19_900, Some(Gate::R2)),
    item("pitch_deck", "Investor Pitch Deck", Journey::Raise, 24_900, None),
    item("investor_list", "Targeted Investor List", Journey::Raise, 9_900, None),
    item("day_one_checklist", "Day-One Checklist", Journey::Pmi, 0, None),
    item("integration_plan", "100-Day Integration Plan", Journey::Pmi, 29_900, None),
    item("synergy_tracker", "Synergy Tracker", Journey::Pmi, 14_900, None),
];

pub fn find_item(slug: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|i| i.slug == slug)
}

/// Like [`find_item`], failing with `CatalogItemNotFound`.
pub fn get_item(slug: &str) -> Result<&'static CatalogItem> {
    find_item(slug).ok_or_else(|| Error::CatalogItemNotFound(slug.to_string()))
}

pub fn items_for_journey(journey: Journey) -> impl Iterator<Item = &'static CatalogItem> {
    CATALOG.iter().filter(move |i| i.journey == journey)
}

/// Item whose purchase opens the paywalled `gate`.
pub fn unlock_item_for(gate: Gate) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|i| i.unlocks_gate == Some(gate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::facts::keys;
    use crate::gates::registry::PAYWALL_GATES;
    use std::collections::HashSet;

    #[test]
    fn every_paywall_gate_has_exactly_one_unlock_item() {
        for gate in PAYWALL_GATES {
            let count = CATALOG.iter().filter(|i| i.unlocks_gate == Some(gate)).count();
            assert_eq!(count, 1, "{} unlock items", gate);
            let unlock = unlock_item_for(gate).unwrap();
            assert_eq!(unlock.journey, gate.journey());
        }
        assert!(CATALOG
            .iter()
            .filter_map(|i| i.unlocks_gate)
            .all(|g| PAYWALL_GATES.contains(&g)));
    }

    #[test]
    fn slugs_are_unique() {
        let slugs: HashSet<_> = CATALOG.iter().map(|i| i.slug).collect();
        assert_eq!(slugs.len(), CATALOG.len());
    }

    #[test]
    fn completion_facts_line_up_with_checklist_keys() {
        assert_eq!(
            get_item("valuation_report").unwrap().completion_fact(),
            keys::VALUATION_REPORT_GENERATED
        );
        assert_eq!(
            get_item("financial_model").unwrap().completion_fact(),
            keys::FINANCIAL_MODEL_GENERATED
        );
        assert_eq!(
            get_item("synergy_tracker").unwrap().completion_fact(),
            keys::SYNERGY_TRACKER_GENERATED
        );
    }

    #[test]
    fn unknown_slug_is_not_found() {
        assert!(matches!(
            get_item("crystal_ball"),
            Err(Error::CatalogItemNotFound(ref s)) if s == "crystal_ball"
        ));
    }

    #[test]
    fn prices_are_never_negative() {
        assert!(CATALOG.iter().all(|i| i.base_price_cents >= 0));
        assert!(get_item("day_one_checklist").unwrap().is_free());
        assert_eq!(items_for_journey(Journey::Pmi).count(), 3);
    }
}
