//! Gate and journey domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::deals::Facts;
use crate::errors::{Error, Result};

/// Top-level deal type. Each journey owns its own gate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Journey {
    Sell,
    Buy,
    Raise,
    /// Post-merger integration.
    Pmi,
}

impl Journey {
    pub const ALL: [Journey; 4] = [Journey::Sell, Journey::Buy, Journey::Raise, Journey::Pmi];

    pub fn as_str(self) -> &'static str {
        match self {
            Journey::Sell => "sell",
            Journey::Buy => "buy",
            Journey::Raise => "raise",
            Journey::Pmi => "pmi",
        }
    }
}

impl fmt::Display for Journey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Journey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Journey::ALL
            .into_iter()
            .find(|j| j.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_input(format!("Unknown journey type '{}'", s)))
    }
}

/// Every gate of every journey.
///
/// Identifiers are prefix-disambiguated (`S`, `B`, `R`, `PMI`) so they are
/// unique across journeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gate {
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    Pmi0,
    Pmi1,
    Pmi2,
    Pmi3,
}

impl Gate {
    pub const ALL: [Gate; 22] = [
        Gate::S0,
        Gate::S1,
        Gate::S2,
        Gate::S3,
        Gate::S4,
        Gate::S5,
        Gate::B0,
        Gate::B1,
        Gate::B2,
        Gate::B3,
        Gate::B4,
        Gate::B5,
        Gate::R0,
        Gate::R1,
        Gate::R2,
        Gate::R3,
        Gate::R4,
        Gate::R5,
        Gate::Pmi0,
        Gate::Pmi1,
        Gate::Pmi2,
        Gate::Pmi3,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Gate::S0 => "S0",
            Gate::S1 => "S1",
            Gate::S2 => "S2",
            Gate::S3 => "S3",
            Gate::S4 => "S4",
            Gate::S5 => "S5",
            Gate::B0 => "B0",
            Gate::B1 => "B1",
            Gate::B2 => "B2",
            Gate::B3 => "B3",
            Gate::B4 => "B4",
            Gate::B5 => "B5",
            Gate::R0 => "R0",
            Gate::R1 => "R1",
            Gate::R2 => "R2",
            Gate::R3 => "R3",
            Gate::R4 => "R4",
            Gate::R5 => "R5",
            Gate::Pmi0 => "PMI0",
            Gate::Pmi1 => "PMI1",
            Gate::Pmi2 => "PMI2",
            Gate::Pmi3 => "PMI3",
        }
    }

    pub fn journey(self) -> Journey {
        match self {
            Gate::S0 | Gate::S1 | Gate::S2 | Gate::S3 | Gate::S4 | Gate::S5 => Journey::Sell,
            Gate::B0 | Gate::B1 | Gate::B2 | Gate::B3 | Gate::B4 | Gate::B5 => Journey::Buy,
            Gate::R0 | Gate::R1 | Gate::R2 | Gate::R3 | Gate::R4 | Gate::R5 => Journey::Raise,
            Gate::Pmi0 | Gate::Pmi1 | Gate::Pmi2 | Gate::Pmi3 => Journey::Pmi,
        }
    }

    /// Zero-based position within the gate's journey.
    pub fn index(self) -> usize {
        match self {
            Gate::S0 | Gate::B0 | Gate::R0 | Gate::Pmi0 => 0,
            Gate::S1 | Gate::B1 | Gate::R1 | Gate::Pmi1 => 1,
            Gate::S2 | Gate::B2 | Gate::R2 | Gate::Pmi2 => 2,
            Gate::S3 | Gate::B3 | Gate::R3 | Gate::Pmi3 => 3,
            Gate::S4 | Gate::B4 | Gate::R4 => 4,
            Gate::S5 | Gate::B5 | Gate::R5 => 5,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Gate::S0 => "Intake",
            Gate::S1 => "Financial Review",
            Gate::S2 => "Valuation",
            Gate::S3 => "Deal Packaging",
            Gate::S4 => "Buyer Outreach",
            Gate::S5 => "Closing",
            Gate::B0 => "Acquisition Thesis",
            Gate::B1 => "Target Sourcing",
            Gate::B2 => "Valuation Model",
            Gate::B3 => "Due Diligence",
            Gate::B4 => "Deal Structuring",
            Gate::B5 => "Closing",
            Gate::R0 => "Intake",
            Gate::R1 => "Financial Review",
            Gate::R2 => "Financial Model",
            Gate::R3 => "Investor Materials",
            Gate::R4 => "Investor Outreach",
            Gate::R5 => "Close",
            Gate::Pmi0 => "Day Zero",
            Gate::Pmi1 => "First 100 Days",
            Gate::Pmi2 => "Synergy Capture",
            Gate::Pmi3 => "Steady State",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Gate::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::UnknownGate(s.to_string()))
    }
}

impl TryFrom<String> for Gate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Gate> for String {
    fn from(gate: Gate) -> Self {
        gate.as_str().to_string()
    }
}

/// Static description of a gate as exposed by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDescriptor {
    pub id: Gate,
    pub journey: Journey,
    pub index: usize,
    pub is_free: bool,
    pub title: &'static str,
}

/// Lifecycle of a gate for one deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Locked,
    Active,
    Completed,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Locked => "locked",
            GateStatus::Active => "active",
            GateStatus::Completed => "completed",
        }
    }
}

impl FromStr for GateStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "locked" => Ok(GateStatus::Locked),
            "active" => Ok(GateStatus::Active),
            "completed" => Ok(GateStatus::Completed),
            other => Err(Error::invalid_input(format!(
                "Unknown gate status '{}'",
                other
            ))),
        }
    }
}

/// Per-deal, per-gate progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateProgress {
    pub deal_id: i64,
    pub gate: Gate,
    pub status: GateStatus,
    pub completed_at: Option<NaiveDateTime>,
    pub data: Facts,
}

/// Append-only record of a gate transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateEvent {
    pub id: i64,
    pub deal_id: i64,
    pub from_gate: Gate,
    pub to_gate: Gate,
    pub created_at: NaiveDateTime,
}
