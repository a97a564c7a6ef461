//! Gates module - journey sequences, readiness checklists, and gate movement.

mod gates_model;
mod gates_service;
mod gates_traits;
pub mod readiness;
pub mod registry;

pub use gates_model::{Gate, GateDescriptor, GateEvent, GateProgress, GateStatus, Journey};
pub use gates_service::GateService;
pub use gates_traits::{AdvanceOutcome, GateServiceTrait};
pub use readiness::{check_readiness, check_readiness_str, checklist, ReadinessReport, Requirement};
pub use registry::{
    descriptor, first_gate, gate_index, is_free, is_terminal, journey_descriptors, journey_gates,
    next_gate, next_gate_id, PAYWALL_GATES,
};
