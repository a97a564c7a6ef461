//! Database models for deals.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use dealgate_core::deals::{Deal, DealPatch, Facts, NewDeal};
use dealgate_core::errors::{Error, Result};
use dealgate_core::gates::{GateEvent, GateProgress, GateStatus};

use crate::errors::corrupt;

/// Database model for deals
#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::deals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DealDB {
    pub id: i64,
    pub user_id: i64,
    pub journey: String,
    pub current_gate: String,
    pub league: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub revenue_cents: Option<i64>,
    pub sde_cents: Option<i64>,
    pub ebitda_cents: Option<i64>,
    pub asking_price_cents: Option<i64>,
    pub capital_available_cents: Option<i64>,
    pub target_deal_size_cents: Option<i64>,
    pub financials: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for creating a new deal
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::deals)]
pub struct NewDealDB {
    pub user_id: i64,
    pub journey: String,
    pub current_gate: String,
    pub league: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub revenue_cents: Option<i64>,
    pub sde_cents: Option<i64>,
    pub ebitda_cents: Option<i64>,
    pub asking_price_cents: Option<i64>,
    pub capital_available_cents: Option<i64>,
    pub target_deal_size_cents: Option<i64>,
    pub financials: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial column update. `None` fields are skipped by Diesel.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::deals)]
pub struct DealPatchDB {
    pub industry: Option<String>,
    pub location: Option<String>,
    pub revenue_cents: Option<i64>,
    pub sde_cents: Option<i64>,
    pub ebitda_cents: Option<i64>,
    pub asking_price_cents: Option<i64>,
    pub capital_available_cents: Option<i64>,
    pub target_deal_size_cents: Option<i64>,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::gate_progress)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GateProgressDB {
    pub deal_id: i64,
    pub gate_id: String,
    pub status: String,
    pub completed_at: Option<NaiveDateTime>,
    pub data: String,
}

#[derive(Queryable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::gate_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GateEventDB {
    pub id: i64,
    pub deal_id: i64,
    pub from_gate: String,
    pub to_gate: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::gate_events)]
pub struct NewGateEventDB {
    pub deal_id: i64,
    pub from_gate: String,
    pub to_gate: String,
    pub created_at: NaiveDateTime,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

// Conversion to domain models
impl TryFrom<DealDB> for Deal {
    type Error = Error;

    fn try_from(db: DealDB) -> Result<Self> {
        let decode = |column: &str, err: Error| corrupt("deals", column, err);
        Ok(Self {
            id: db.id,
            user_id: db.user_id,
            journey: db.journey.parse().map_err(|e| decode("journey", e))?,
            current_gate: db
                .current_gate
                .parse()
                .map_err(|e| decode("current_gate", e))?,
            league: db
                .league
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| decode("league", e))?,
            industry: db.industry,
            location: db.location,
            revenue_cents: db.revenue_cents,
            sde_cents: db.sde_cents,
            ebitda_cents: db.ebitda_cents,
            asking_price_cents: db.asking_price_cents,
            capital_available_cents: db.capital_available_cents,
            target_deal_size_cents: db.target_deal_size_cents,
            financials: Facts::from_json(&db.financials).map_err(|e| decode("financials", e))?,
            status: db.status.parse().map_err(|e| decode("status", e))?,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl NewDealDB {
    pub fn from_domain(new_deal: NewDeal, now: NaiveDateTime) -> Result<Self> {
        let fields = new_deal.fields;
        Ok(Self {
            user_id: new_deal.user_id,
            journey: new_deal.journey.as_str().to_string(),
            current_gate: new_deal.first_gate.as_str().to_string(),
            league: new_deal.league.map(|l| l.as_str().to_string()),
            industry: trimmed(fields.industry),
            location: trimmed(fields.location),
            revenue_cents: fields.revenue_cents,
            sde_cents: fields.sde_cents,
            ebitda_cents: fields.ebitda_cents,
            asking_price_cents: fields.asking_price_cents,
            capital_available_cents: fields.capital_available_cents,
            target_deal_size_cents: fields.target_deal_size_cents,
            financials: new_deal.financials.to_json()?,
            status: dealgate_core::deals::DealStatus::Active.as_str().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl DealPatchDB {
    pub fn from_domain(patch: DealPatch, now: NaiveDateTime) -> Self {
        Self {
            industry: trimmed(patch.industry),
            location: trimmed(patch.location),
            revenue_cents: patch.revenue_cents,
            sde_cents: patch.sde_cents,
            ebitda_cents: patch.ebitda_cents,
            asking_price_cents: patch.asking_price_cents,
            capital_available_cents: patch.capital_available_cents,
            target_deal_size_cents: patch.target_deal_size_cents,
            updated_at: now,
        }
    }
}

impl TryFrom<GateProgressDB> for GateProgress {
    type Error = Error;

    fn try_from(db: GateProgressDB) -> Result<Self> {
        let decode = |column: &str, err: Error| corrupt("gate_progress", column, err);
        Ok(Self {
            deal_id: db.deal_id,
            gate: db.gate_id.parse().map_err(|e| decode("gate_id", e))?,
            status: db
                .status
                .parse::<GateStatus>()
                .map_err(|e| decode("status", e))?,
            completed_at: db.completed_at,
            data: Facts::from_json(&db.data).map_err(|e| decode("data", e))?,
        })
    }
}

impl TryFrom<GateEventDB> for GateEvent {
    type Error = Error;

    fn try_from(db: GateEventDB) -> Result<Self> {
        let decode = |column: &str, err: Error| corrupt("gate_events", column, err);
        Ok(Self {
            id: db.id,
            deal_id: db.deal_id,
            from_gate: db.from_gate.parse().map_err(|e| decode("from_gate", e))?,
            to_gate: db.to_gate.parse().map_err(|e| decode("to_gate", e))?,
            created_at: db.created_at,
        })
    }
}
