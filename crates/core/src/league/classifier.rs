//! Deterministic deal sizing.
//!
//! `classify` is a pure function of its inputs: no clock, no storage, no
//! cached state. Callers recompute it whenever deal fields change.

use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::league_model::{League, LeagueInfo, LeagueInputs, SignalSource};
use crate::constants::{
    CENTS_PER_UNIT, IMPLIED_EQUITY_PERCENT, ROLLUP_MIN_REVENUE, SDE_MARGIN_BPS,
};
use crate::errors::{Error, Result};
use crate::gates::Journey;

/// Consolidation-prone verticals, matched as lower-case substrings.
const ROLLUP_KEYWORDS: &[&str] = &[
    "veterinar",
    "vet clinic",
    "animal hospital",
    "dental",
    "dentist",
    "orthodont",
    "hvac",
    "heating",
    "air conditioning",
    "managed it",
    "managed service",
    "msp",
    "pest control",
    "exterminat",
];

/// EBITDA ladder (whole dollars). Below the last rung the figure falls to the
/// SDE ladder.
const EBITDA_LADDER: [(i64, League); 4] = [
    (50_000_000, League::L6),
    (10_000_000, League::L5),
    (5_000_000, League::L4),
    (2_000_000, League::L3),
];

const SDE_L2_FLOOR: i64 = 500_000;

/// Buyer ladder over deployable capital (whole dollars).
const BUYER_LADDER: [(i64, League); 5] = [
    (25_000_000, League::L6),
    (5_000_000, League::L5),
    (2_000_000, League::L4),
    (750_000, League::L3),
    (250_000, League::L2),
];

/// Classifies a deal, or returns `None` when there is no usable sizing
/// signal. `None` means "insufficiently specified", not an error.
pub fn classify(inputs: &LeagueInputs) -> Option<LeagueInfo> {
    match inputs.journey {
        Journey::Buy => classify_buyer(inputs),
        Journey::Sell | Journey::Raise | Journey::Pmi => classify_seller(inputs),
    }
}

fn classify_seller(inputs: &LeagueInputs) -> Option<LeagueInfo> {
    let revenue = whole_dollars(inputs.revenue_cents);

    let (signal, earnings) = if let Some(ebitda) = whole_dollars(inputs.ebitda_cents) {
        (SignalSource::Ebitda, ebitda)
    } else if let Some(sde) = whole_dollars(inputs.sde_cents) {
        (SignalSource::Sde, sde)
    } else if let Some(revenue) = revenue {
        (
            SignalSource::RevenueEstimate,
            revenue.saturating_mul(SDE_MARGIN_BPS) / 10_000,
        )
    } else {
        return None;
    };

    let computed = match signal {
        SignalSource::Ebitda => ebitda_tier(earnings).unwrap_or_else(|| sde_tier(earnings)),
        _ => sde_tier(earnings),
    };

    let rollup_applies = computed < League::L3
        && is_rollup_industry(inputs.industry.as_deref())
        && revenue.is_some_and(|r| r > ROLLUP_MIN_REVENUE);

    if rollup_applies {
        Some(LeagueInfo::new(League::L3, signal, true))
    } else {
        Some(LeagueInfo::new(computed, signal, false))
    }
}

fn classify_buyer(inputs: &LeagueInputs) -> Option<LeagueInfo> {
    let (signal, capital) = if let Some(capital) = whole_dollars(inputs.capital_available_cents)
    {
        (SignalSource::CapitalAvailable, capital)
    } else {
        let target = whole_dollars(inputs.target_deal_size_cents)?;
        let equity = target.saturating_mul(IMPLIED_EQUITY_PERCENT) / 100;
        (SignalSource::ImpliedEquity, equity)
    };

    let league = BUYER_LADDER
        .iter()
        .find(|(floor, _)| capital >= *floor)
        .map(|(_, league)| *league)
        .unwrap_or(League::L1);

    Some(LeagueInfo::new(league, signal, false))
}

fn ebitda_tier(ebitda: i64) -> Option<League> {
    EBITDA_LADDER
        .iter()
        .find(|(floor, _)| ebitda >= *floor)
        .map(|(_, league)| *league)
}

fn sde_tier(earnings: i64) -> League {
    if earnings >= SDE_L2_FLOOR {
        League::L2
    } else {
        League::L1
    }
}

/// Cents to whole dollars. Zero, negative and sub-dollar values are absent.
fn whole_dollars(cents: Option<i64>) -> Option<i64> {
    cents.map(|c| c / CENTS_PER_UNIT).filter(|d| *d > 0)
}

/// Case-insensitive substring match against the roll-up vertical list.
pub fn is_rollup_industry(industry: Option<&str>) -> bool {
    let Some(industry) = industry else {
        return false;
    };
    let normalized = industry.to_lowercase();
    ROLLUP_KEYWORDS.iter().any(|kw| normalized.contains(kw))
}

/// Applies a pricing multiplier to a base price in cents, rounding half away
/// from zero to a whole cent.
pub fn apply_multiplier(base_cents: i64, multiplier: Decimal) -> Result<i64> {
    let raw = Decimal::from(base_cents)
        .checked_mul(multiplier)
        .ok_or_else(|| Error::invalid_input("Price overflow"))?;
    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| Error::invalid_input("Price out of range"))
}
