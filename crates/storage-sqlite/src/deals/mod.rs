//! SQLite storage implementation for deals, gate progress and gate events.

mod model;
mod repository;

pub use model::{DealDB, DealPatchDB, GateEventDB, GateProgressDB, NewDealDB, NewGateEventDB};
pub use repository::DealRepository;
pub(crate) use repository::{load_deal, merge_financials_in_tx};
