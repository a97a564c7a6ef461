//! Time-in-gate derived from the gate event log.

use chrono::NaiveDateTime;

use super::deals_model::{Deal, GateDwell};
use crate::gates::GateEvent;

/// Builds one dwell entry per visited gate, oldest first.
///
/// The deal enters its first gate at creation; each event closes the `from`
/// gate and opens the `to` gate. The gate the deal currently sits in is left
/// open and measured up to `now`.
pub fn compute_velocity(deal: &Deal, events: &[GateEvent], now: NaiveDateTime) -> Vec<GateDwell> {
    let mut dwell = Vec::with_capacity(events.len() + 1);
    let mut gate = events.first().map(|e| e.from_gate).unwrap_or(deal.current_gate);
    let mut entered_at = deal.created_at;

    for event in events {
        dwell.push(GateDwell {
            gate,
            entered_at,
            exited_at: Some(event.created_at),
            seconds: seconds_between(entered_at, event.created_at),
        });
        gate = event.to_gate;
        entered_at = event.created_at;
    }

    dwell.push(GateDwell {
        gate,
        entered_at,
        exited_at: None,
        seconds: seconds_between(entered_at, now),
    });
    dwell
}

fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_seconds().max(0)
}
