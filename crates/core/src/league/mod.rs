//! League module - deterministic deal tiering and the pricing multiplier table.

mod classifier;
mod league_model;

pub use classifier::{apply_multiplier, classify, is_rollup_industry};
pub use league_model::{
    league_profile, EarningsMetric, League, LeagueInfo, LeagueInputs, LeagueProfile,
    SignalSource,
};
