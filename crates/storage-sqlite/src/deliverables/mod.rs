//! SQLite storage implementation for deliverables.

mod model;
mod repository;

pub use model::{DeliverableDB, NewDeliverableDB};
pub use repository::DeliverableRepository;
