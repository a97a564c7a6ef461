//! Per-gate data checklists and the readiness evaluator.
//!
//! Each gate's checklist is a static slice of declarative requirements, so the
//! full rule set can be reviewed (and tested) as data. The `checklist` match is
//! exhaustive over [`Gate`]: adding a gate without deciding its checklist does
//! not compile.

use serde::Serialize;

use super::gates_model::Gate;
use super::registry::{next_gate, PAYWALL_GATES};
use crate::deals::facts::keys;
use crate::deals::Deal;
use crate::errors::{Error, Result};

/// Structured deal column a requirement can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealField {
    Industry,
    Location,
    Revenue,
    Sde,
    Ebitda,
    AskingPrice,
    CapitalAvailable,
    TargetDealSize,
}

impl DealField {
    pub fn is_present(self, deal: &Deal) -> bool {
        fn text(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.trim().is_empty())
        }
        fn money(value: Option<i64>) -> bool {
            value.is_some_and(|v| v > 0)
        }
        match self {
            DealField::Industry => text(&deal.industry),
            DealField::Location => text(&deal.location),
            DealField::Revenue => money(deal.revenue_cents),
            DealField::Sde => money(deal.sde_cents),
            DealField::Ebitda => money(deal.ebitda_cents),
            DealField::AskingPrice => money(deal.asking_price_cents),
            DealField::CapitalAvailable => money(deal.capital_available_cents),
            DealField::TargetDealSize => money(deal.target_deal_size_cents),
        }
    }
}

/// Predicate over a deal snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Field(DealField),
    AnyField(&'static [DealField]),
    /// Key in the financials bag holding a present value.
    Fact(&'static str),
    /// Deal has a cached league.
    League,
}

/// One checklist line: a user-facing label and the predicate behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub label: &'static str,
    pub check: Check,
}

impl Requirement {
    const fn new(label: &'static str, check: Check) -> Self {
        Self { label, check }
    }

    pub fn is_met(&self, deal: &Deal) -> bool {
        match self.check {
            Check::Field(field) => field.is_present(deal),
            Check::AnyField(fields) => fields.iter().any(|f| f.is_present(deal)),
            Check::Fact(key) => deal.financials.has(key),
            Check::League => deal.league.is_some(),
        }
    }
}

const EARNINGS: &[DealField] = &[DealField::Sde, DealField::Ebitda];
const BUYER_SIZING: &[DealField] = &[DealField::CapitalAvailable, DealField::TargetDealSize];

const S0_CHECKLIST: &[Requirement] = &[
    Requirement::new("Industry", Check::Field(DealField::Industry)),
    Requirement::new("Business location", Check::Field(DealField::Location)),
    Requirement::new("Annual revenue", Check::Field(DealField::Revenue)),
    Requirement::new("League classification", Check::League),
    Requirement::new("Reason for selling", Check::Fact(keys::EXIT_MOTIVATION)),
    Requirement::new("Preferred exit timeline", Check::Fact(keys::TIMELINE_PREFERENCE)),
];
const S1_CHECKLIST: &[Requirement] = &[
    Requirement::new("SDE or EBITDA", Check::AnyField(EARNINGS)),
    Requirement::new("Years in business", Check::Fact(keys::YEARS_IN_BUSINESS)),
    Requirement::new("Number of employees", Check::Fact(keys::EMPLOYEE_COUNT)),
    Requirement::new("Owner involvement", Check::Fact(keys::OWNER_INVOLVEMENT)),
];
const S2_CHECKLIST: &[Requirement] = &[
    Requirement::new("Valuation report", Check::Fact(keys::VALUATION_REPORT_GENERATED)),
    Requirement::new("Asking price", Check::Field(DealField::AskingPrice)),
];
const S3_CHECKLIST: &[Requirement] = &[
    Requirement::new("Confidential information memorandum", Check::Fact(keys::CIM_GENERATED)),
    Requirement::new("Blind teaser", Check::Fact(keys::TEASER_GENERATED)),
];
const S4_CHECKLIST: &[Requirement] = &[
    Requirement::new("Buyer list", Check::Fact(keys::BUYER_LIST_GENERATED)),
    Requirement::new("Letter of intent received", Check::Fact(keys::LOI_RECEIVED)),
];

const B0_CHECKLIST: &[Requirement] = &[
    Requirement::new("Target industry", Check::Field(DealField::Industry)),
    Requirement::new("Target geography", Check::Field(DealField::Location)),
    Requirement::new("Available capital or target deal size", Check::AnyField(BUYER_SIZING)),
    Requirement::new("League classification", Check::League),
    Requirement::new("Acquisition thesis", Check::Fact(keys::ACQUISITION_THESIS)),
];
const B1_CHECKLIST: &[Requirement] = &[
    Requirement::new("Target company identified", Check::Fact(keys::TARGET_IDENTIFIED)),
    Requirement::new("Target financials received", Check::Fact(keys::TARGET_FINANCIALS_RECEIVED)),
];
const B2_CHECKLIST: &[Requirement] = &[
    Requirement::new("Acquisition valuation", Check::Fact(keys::ACQUISITION_VALUATION_GENERATED)),
    Requirement::new("Target asking price", Check::Field(DealField::AskingPrice)),
];
const B3_CHECKLIST: &[Requirement] = &[
    Requirement::new("Due diligence checklist", Check::Fact(keys::DD_CHECKLIST_GENERATED)),
    Requirement::new("Financing plan", Check::Fact(keys::FINANCING_PLAN)),
];
const B4_CHECKLIST: &[Requirement] = &[
    Requirement::new("Letter of intent draft", Check::Fact(keys::LOI_DRAFT_GENERATED)),
    Requirement::new("Signed letter of intent", Check::Fact(keys::LOI_SIGNED)),
];

const R0_CHECKLIST: &[Requirement] = &[
    Requirement::new("Industry", Check::Field(DealField::Industry)),
    Requirement::new("Annual revenue", Check::Field(DealField::Revenue)),
    Requirement::new("League classification", Check::League),
    Requirement::new("Amount to raise", Check::Fact(keys::RAISE_AMOUNT)),
    Requirement::new("Use of funds", Check::Fact(keys::USE_OF_FUNDS)),
];
const R1_CHECKLIST: &[Requirement] = &[
    Requirement::new("SDE or EBITDA", Check::AnyField(EARNINGS)),
    Requirement::new("Revenue growth rate", Check::Fact(keys::GROWTH_RATE)),
];
const R2_CHECKLIST: &[Requirement] = &[Requirement::new(
    "Financial model",
    Check::Fact(keys::FINANCIAL_MODEL_GENERATED),
)];
const R3_CHECKLIST: &[Requirement] = &[
    Requirement::new("Pitch deck", Check::Fact(keys::PITCH_DECK_GENERATED)),
    Requirement::new("Investor list", Check::Fact(keys::INVESTOR_LIST_GENERATED)),
];
const R4_CHECKLIST: &[Requirement] = &[Requirement::new(
    "Term sheet received",
    Check::Fact(keys::TERM_SHEET_RECEIVED),
)];

const PMI0_CHECKLIST: &[Requirement] = &[
    Requirement::new("Acquisition close date", Check::Fact(keys::ACQUISITION_CLOSE_DATE)),
    Requirement::new("Integration lead", Check::Fact(keys::INTEGRATION_LEAD)),
    Requirement::new("Day-one checklist", Check::Fact(keys::DAY_ONE_CHECKLIST_GENERATED)),
];
const PMI1_CHECKLIST: &[Requirement] = &[
    Requirement::new("Key staff retention confirmed", Check::Fact(keys::KEY_STAFF_RETAINED)),
    Requirement::new("Integration plan", Check::Fact(keys::INTEGRATION_PLAN_GENERATED)),
];
const PMI2_CHECKLIST: &[Requirement] = &[
    Requirement::new("Synergy targets", Check::Fact(keys::SYNERGY_TARGETS)),
    Requirement::new("Synergy tracker", Check::Fact(keys::SYNERGY_TRACKER_GENERATED)),
];

/// Requirements that must hold before a deal may leave `gate`.
///
/// Terminal gates have an empty checklist: finishing them is a manual action.
pub fn checklist(gate: Gate) -> &'static [Requirement] {
    match gate {
        Gate::S0 => S0_CHECKLIST,
        Gate::S1 => S1_CHECKLIST,
        Gate::S2 => S2_CHECKLIST,
        Gate::S3 => S3_CHECKLIST,
        Gate::S4 => S4_CHECKLIST,
        Gate::B0 => B0_CHECKLIST,
        Gate::B1 => B1_CHECKLIST,
        Gate::B2 => B2_CHECKLIST,
        Gate::B3 => B3_CHECKLIST,
        Gate::B4 => B4_CHECKLIST,
        Gate::R0 => R0_CHECKLIST,
        Gate::R1 => R1_CHECKLIST,
        Gate::R2 => R2_CHECKLIST,
        Gate::R3 => R3_CHECKLIST,
        Gate::R4 => R4_CHECKLIST,
        Gate::Pmi0 => PMI0_CHECKLIST,
        Gate::Pmi1 => PMI1_CHECKLIST,
        Gate::Pmi2 => PMI2_CHECKLIST,
        Gate::S5 | Gate::B5 | Gate::R5 | Gate::Pmi3 => &[],
    }
}

/// Outcome of a readiness check. Data readiness and paywall status are
/// independent: a deal can be ready and still need to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub gate: Gate,
    pub ready: bool,
    /// Human-readable labels, in checklist order.
    pub missing: Vec<String>,
    pub paywall_required: bool,
    pub paywall_gate: Option<Gate>,
    pub next_gate: Option<Gate>,
}

/// Evaluates `gate`'s checklist against the deal. `gate` must belong to the
/// deal's journey; [`check_readiness_str`] enforces that for outside input.
pub fn check_readiness(gate: Gate, deal: &Deal) -> ReadinessReport {
    let missing: Vec<String> = checklist(gate)
        .iter()
        .filter(|req| !req.is_met(deal))
        .map(|req| req.label.to_string())
        .collect();

    let next = next_gate(gate);
    let paywall_gate = next.filter(|g| PAYWALL_GATES.contains(g));

    ReadinessReport {
        gate,
        ready: missing.is_empty(),
        missing,
        paywall_required: paywall_gate.is_some(),
        paywall_gate,
        next_gate: next,
    }
}

/// String-level entry point. Unknown gate ids are an error, never "ready",
/// and so is a gate from another journey.
pub fn check_readiness_str(gate_id: &str, deal: &Deal) -> Result<ReadinessReport> {
    let gate: Gate = gate_id.parse()?;
    if gate.journey() != deal.journey {
        return Err(Error::invalid_input(format!(
            "Gate {} is not part of the {} journey",
            gate, deal.journey
        )));
    }
    Ok(check_readiness(gate, deal))
}
