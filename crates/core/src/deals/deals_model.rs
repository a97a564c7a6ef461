//! Deal domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::facts::Facts;
use crate::errors::{Error, Result};
use crate::gates::{Gate, Journey};
use crate::league::{classify, League, LeagueInfo, LeagueInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    #[default]
    Active,
    Closed,
    Paused,
}

impl DealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::Active => "active",
            DealStatus::Closed => "closed",
            DealStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(DealStatus::Active),
            "closed" => Ok(DealStatus::Closed),
            "paused" => Ok(DealStatus::Paused),
            other => Err(Error::invalid_input(format!(
                "Unknown deal status '{}'",
                other
            ))),
        }
    }
}

/// Domain model representing a deal moving through its journey.
///
/// Monetary fields are minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: i64,
    pub user_id: i64,
    pub journey: Journey,
    pub current_gate: Gate,
    /// Cached league; recomputed from the fields below whenever they change.
    pub league: Option<League>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub revenue_cents: Option<i64>,
    pub sde_cents: Option<i64>,
    pub ebitda_cents: Option<i64>,
    pub asking_price_cents: Option<i64>,
    pub capital_available_cents: Option<i64>,
    pub target_deal_size_cents: Option<i64>,
    pub financials: Facts,
    pub status: DealStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Deal {
    pub fn league_inputs(&self) -> LeagueInputs {
        LeagueInputs {
            journey: self.journey,
            revenue_cents: self.revenue_cents,
            sde_cents: self.sde_cents,
            ebitda_cents: self.ebitda_cents,
            industry: self.industry.clone(),
            capital_available_cents: self.capital_available_cents,
            target_deal_size_cents: self.target_deal_size_cents,
        }
    }

    /// Classifies the deal from its current fields.
    pub fn classify_league(&self) -> Option<LeagueInfo> {
        classify(&self.league_inputs())
    }

    pub fn is_active(&self) -> bool {
        self.status == DealStatus::Active
    }
}

/// Shallow patch over a deal's structured columns. `None` leaves a column
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    pub industry: Option<String>,
    pub location: Option<String>,
    pub revenue_cents: Option<i64>,
    pub sde_cents: Option<i64>,
    pub ebitda_cents: Option<i64>,
    pub asking_price_cents: Option<i64>,
    pub capital_available_cents: Option<i64>,
    pub target_deal_size_cents: Option<i64>,
}

impl DealPatch {
    pub fn is_empty(&self) -> bool {
        *self == DealPatch::default()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("industry", &self.industry), ("location", &self.location)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::invalid_input(format!("{} cannot be blank", name)));
            }
        }
        Ok(())
    }

    /// Classifier inputs for a deal that would hold exactly these fields.
    pub fn league_inputs(&self, journey: Journey) -> LeagueInputs {
        LeagueInputs {
            journey,
            revenue_cents: self.revenue_cents,
            sde_cents: self.sde_cents,
            ebitda_cents: self.ebitda_cents,
            industry: self.industry.clone(),
            capital_available_cents: self.capital_available_cents,
            target_deal_size_cents: self.target_deal_size_cents,
        }
    }

    /// Applies the patch in memory, last write wins per field.
    pub fn apply_to(&self, deal: &mut Deal) {
        if let Some(v) = &self.industry {
            deal.industry = Some(v.trim().to_string());
        }
        if let Some(v) = &self.location {
            deal.location = Some(v.trim().to_string());
        }
        if self.revenue_cents.is_some() {
            deal.revenue_cents = self.revenue_cents;
        }
        if self.sde_cents.is_some() {
            deal.sde_cents = self.sde_cents;
        }
        if self.ebitda_cents.is_some() {
            deal.ebitda_cents = self.ebitda_cents;
        }
        if self.asking_price_cents.is_some() {
            deal.asking_price_cents = self.asking_price_cents;
        }
        if self.capital_available_cents.is_some() {
            deal.capital_available_cents = self.capital_available_cents;
        }
        if self.target_deal_size_cents.is_some() {
            deal.target_deal_size_cents = self.target_deal_size_cents;
        }
    }
}

/// Input model for creating a deal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub user_id: i64,
    pub journey: Journey,
    pub first_gate: Gate,
    pub league: Option<League>,
    pub fields: DealPatch,
    pub financials: Facts,
}

/// Time spent in one gate, derived from the gate event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDwell {
    pub gate: Gate,
    pub entered_at: NaiveDateTime,
    /// `None` while the deal still sits in this gate.
    pub exited_at: Option<NaiveDateTime>,
    pub seconds: i64,
}
