//! Deals module - deal records, gate movement, and the facts bag.

mod deals_model;
mod deals_service;
mod deals_traits;
pub mod facts;
mod velocity;

pub use deals_model::{Deal, DealPatch, DealStatus, GateDwell, NewDeal};
pub use deals_service::DealService;
pub use deals_traits::{DealRepositoryTrait, DealServiceTrait};
pub use facts::{FactValue, Facts};
pub use velocity::compute_velocity;
