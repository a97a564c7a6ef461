/// Fraction of revenue assumed to be owner earnings when no SDE or EBITDA is
/// known, in basis points (17.5%).
pub const SDE_MARGIN_BPS: i64 = 1_750;

/// Share of a buyer's target deal size assumed to be equity, in percent.
pub const IMPLIED_EQUITY_PERCENT: i64 = 20;

/// Revenue (whole dollars) above which roll-up verticals get the L3 floor.
pub const ROLLUP_MIN_REVENUE: i64 = 1_500_000;

/// Default page size for wallet history queries.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Minor units per whole currency unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Claims a deliverable may use before a stuck generation is failed instead
/// of requeued.
pub const MAX_GENERATION_ATTEMPTS: i32 = 3;
