//! League domain models and the tier table.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::gates::Journey;

/// Deal size tier, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum League {
    L1,
    L2,
    L3,
    L4,
    L5,
    L6,
}

impl League {
    pub const ALL: [League; 6] = [
        League::L1,
        League::L2,
        League::L3,
        League::L4,
        League::L5,
        League::L6,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            League::L1 => "L1",
            League::L2 => "L2",
            League::L3 => "L3",
            League::L4 => "L4",
            League::L5 => "L5",
            League::L6 => "L6",
        }
    }

    /// Fixed attributes of this tier.
    pub fn profile(self) -> LeagueProfile {
        league_profile(self)
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for League {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        League::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("Unknown league '{}'", s)))
    }
}

/// Earnings metric a tier is valued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EarningsMetric {
    Sde,
    Ebitda,
}

/// Which input actually sized the deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Ebitda,
    Sde,
    /// Revenue × assumed SDE margin.
    RevenueEstimate,
    CapitalAvailable,
    /// Share of a buyer's target deal size.
    ImpliedEquity,
}

/// Fixed attributes of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeagueProfile {
    pub league: League,
    pub label: &'static str,
    pub metric: EarningsMetric,
    pub multiple_low: Decimal,
    pub multiple_high: Decimal,
    pub pricing_multiplier: Decimal,
}

/// The tier table. Pricing multipliers are applied verbatim to catalog base
/// prices.
///
/// | tier | label               | metric | multiple    | pricing |
/// |------|---------------------|--------|-------------|---------|
/// | L1   | Main Street         | SDE    | 2.0–3.0x    | 1.0     |
/// | L2   | Upper Main Street   | SDE    | 3.0–4.5x    | 1.5     |
/// | L3   | Lower Middle Market | EBITDA | 4.5–6.5x    | 2.0     |
/// | L4   | Middle Market       | EBITDA | 6.0–8.0x    | 3.0     |
/// | L5   | Upper Middle Market | EBITDA | 8.0–11.0x   | 5.0     |
/// | L6   | Large Cap           | EBITDA | 10.0–15.0x  | 7.5     |
pub fn league_profile(league: League) -> LeagueProfile {
    let (label, metric, multiple_low, multiple_high, pricing_multiplier) = match league {
        League::L1 => ("Main Street", EarningsMetric::Sde, dec!(2.0), dec!(3.0), dec!(1.0)),
        League::L2 => (
            "Upper Main Street",
            EarningsMetric::Sde,
            dec!(3.0),
            dec!(4.5),
            dec!(1.5),
        ),
        League::L3 => (
            "Lower Middle Market",
            EarningsMetric::Ebitda,
            dec!(4.5),
            dec!(6.5),
            dec!(2.0),
        ),
        League::L4 => (
            "Middle Market",
            EarningsMetric::Ebitda,
            dec!(6.0),
            dec!(8.0),
            dec!(3.0),
        ),
        League::L5 => (
            "Upper Middle Market",
            EarningsMetric::Ebitda,
            dec!(8.0),
            dec!(11.0),
            dec!(5.0),
        ),
        League::L6 => ("Large Cap", EarningsMetric::Ebitda, dec!(10.0), dec!(15.0), dec!(7.5)),
    };
    LeagueProfile {
        league,
        label,
        metric,
        multiple_low,
        multiple_high,
        pricing_multiplier,
    }
}

/// Inputs to the classifier. Monetary values are cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueInputs {
    pub journey: Journey,
    pub revenue_cents: Option<i64>,
    pub sde_cents: Option<i64>,
    pub ebitda_cents: Option<i64>,
    pub industry: Option<String>,
    pub capital_available_cents: Option<i64>,
    pub target_deal_size_cents: Option<i64>,
}

impl LeagueInputs {
    pub fn new(journey: Journey) -> Self {
        Self {
            journey,
            revenue_cents: None,
            sde_cents: None,
            ebitda_cents: None,
            industry: None,
            capital_available_cents: None,
            target_deal_size_cents: None,
        }
    }
}

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueInfo {
    pub league: League,
    pub label: String,
    pub metric: EarningsMetric,
    pub signal: SignalSource,
    pub multiple_low: Decimal,
    pub multiple_high: Decimal,
    pub pricing_multiplier: Decimal,
    /// Set when the roll-up floor lifted the tier.
    pub rollup_override: bool,
}

impl LeagueInfo {
    pub fn new(league: League, signal: SignalSource, rollup_override: bool) -> Self {
        let profile = league_profile(league);
        Self {
            league,
            label: profile.label.to_string(),
            metric: if rollup_override {
                EarningsMetric::Ebitda
            } else {
                profile.metric
            },
            signal,
            multiple_low: profile.multiple_low,
            multiple_high: profile.multiple_high,
            pricing_multiplier: profile.pricing_multiplier,
            rollup_override,
        }
    }
}
