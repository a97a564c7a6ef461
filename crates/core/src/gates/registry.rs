//! Static per-journey gate sequences.
//!
//! Pure structural lookups with no side effects. Every other component asks
//! this module what comes next and what is paywalled.

use super::gates_model::{Gate, GateDescriptor, Journey};
use crate::errors::Result;

const SELL_GATES: [Gate; 6] = [Gate::S0, Gate::S1, Gate::S2, Gate::S3, Gate::S4, Gate::S5];
const BUY_GATES: [Gate; 6] = [Gate::B0, Gate::B1, Gate::B2, Gate::B3, Gate::B4, Gate::B5];
const RAISE_GATES: [Gate; 6] = [Gate::R0, Gate::R1, Gate::R2, Gate::R3, Gate::R4, Gate::R5];
const PMI_GATES: [Gate; 4] = [Gate::Pmi0, Gate::Pmi1, Gate::Pmi2, Gate::Pmi3];

/// Gates whose entry requires a wallet debit: the valuation/model gate of the
/// sell, buy and raise journeys.
pub const PAYWALL_GATES: [Gate; 3] = [Gate::S2, Gate::B2, Gate::R2];

/// Ordered gates of a journey.
pub fn journey_gates(journey: Journey) -> &'static [Gate] {
    match journey {
        Journey::Sell => &SELL_GATES,
        Journey::Buy => &BUY_GATES,
        Journey::Raise => &RAISE_GATES,
        Journey::Pmi => &PMI_GATES,
    }
}

pub fn first_gate(journey: Journey) -> Gate {
    journey_gates(journey)[0]
}

/// Successor of `gate`, or `None` when `gate` is terminal.
pub fn next_gate(gate: Gate) -> Option<Gate> {
    journey_gates(gate.journey()).get(gate.index() + 1).copied()
}

/// String-level variant of [`next_gate`] for callers holding raw ids.
pub fn next_gate_id(gate_id: &str) -> Result<Option<Gate>> {
    Ok(next_gate(gate_id.parse()?))
}

/// Zero-based position of `gate` within its journey.
pub fn gate_index(gate: Gate) -> usize {
    gate.index()
}

pub fn is_terminal(gate: Gate) -> bool {
    next_gate(gate).is_none()
}

pub fn is_free(gate: Gate) -> bool {
    !PAYWALL_GATES.contains(&gate)
}

pub fn descriptor(gate: Gate) -> GateDescriptor {
    GateDescriptor {
        id: gate,
        journey: gate.journey(),
        index: gate.index(),
        is_free: is_free(gate),
        title: gate.title(),
    }
}

pub fn journey_descriptors(journey: Journey) -> Vec<GateDescriptor> {
    journey_gates(journey).iter().map(|g| descriptor(*g)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn indices_are_contiguous_per_journey() {
        for journey in Journey::ALL {
            for (position, gate) in journey_gates(journey).iter().enumerate() {
                assert_eq!(gate.index(), position, "{} out of place", gate);
                assert_eq!(gate.journey(), journey);
            }
        }
    }

    #[test]
    fn every_gate_belongs_to_exactly_one_journey() {
        let mut seen = HashSet::new();
        for journey in Journey::ALL {
            for gate in journey_gates(journey) {
                assert!(seen.insert(gate.as_str()), "duplicate gate id {}", gate);
            }
        }
        assert_eq!(seen.len(), Gate::ALL.len());
    }

    #[test]
    fn each_journey_has_exactly_one_terminal_gate() {
        for journey in Journey::ALL {
            let terminals: Vec<_> = journey_gates(journey)
                .iter()
                .filter(|g| is_terminal(**g))
                .collect();
            assert_eq!(terminals.len(), 1);
            assert_eq!(*terminals[0], *journey_gates(journey).last().unwrap());
        }
    }

    #[test]
    fn next_gate_walks_the_chain() {
        assert_eq!(first_gate(Journey::Sell), Gate::S0);
        assert_eq!(next_gate(Gate::S0), Some(Gate::S1));
        assert_eq!(next_gate(Gate::B4), Some(Gate::B5));
        assert_eq!(next_gate(Gate::S5), None);
        assert_eq!(next_gate(Gate::Pmi3), None);
    }

    #[test]
    fn next_gate_id_rejects_unknown_ids() {
        assert_eq!(next_gate_id("R1").unwrap(), Some(Gate::R2));
        assert_eq!(next_gate_id("R5").unwrap(), None);
        assert!(next_gate_id("Z0").is_err());
    }

    #[test]
    fn only_valuation_gates_are_paywalled() {
        let paid: Vec<Gate> = Gate::ALL.into_iter().filter(|g| !is_free(*g)).collect();
        assert_eq!(paid, vec![Gate::S2, Gate::B2, Gate::R2]);
        assert!(journey_descriptors(Journey::Pmi).iter().all(|d| d.is_free));
    }
}
