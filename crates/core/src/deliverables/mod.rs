//! Deliverables module - pricing, purchase and the generation lifecycle.

mod deliverables_model;
mod deliverables_service;
mod deliverables_traits;
mod purchase_service;

pub use deliverables_model::{
    ChargeOutcome, Deliverable, DeliverableStatus, GenerationJob, NewDeliverable, PriceQuote,
    PurchaseReceipt, StaleRelease,
};
pub use deliverables_service::DeliverableService;
pub use deliverables_traits::{
    DeliverableGenerator, DeliverableRepositoryTrait, DeliverableServiceTrait, GenerationQueue,
    PurchaseServiceTrait,
};
pub use purchase_service::PurchaseService;
