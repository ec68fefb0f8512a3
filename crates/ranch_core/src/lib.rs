//! `ranch_core`: deterministic extraction stations.
//!
//! Reservoirs, extraction sessions, station controllers and emptying tasks,
//! driven one tick at a time. No IO beyond caller-supplied writers; all
//! randomness via the passed-in Rng.

mod emptying;
mod engine;
mod environment;
mod id;
pub mod metrics;
mod reservoir;
mod rounding;
mod session;
mod snapshot;
mod station;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use emptying::{EmptyingStep, EmptyingTask};
pub use engine::tick;
pub use environment::{split_into_stacks, Candidate, Environment, Herd, ResourceBearer};
pub use id::generate_uuid;
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use reservoir::Reservoir;
pub use rounding::{committed_yield, stochastic_round};
pub use session::{required_ticks, AbortReason, ExtractionSession, SessionPhase};
pub use snapshot::{restore, restore_state, save_state, SnapshotError};
pub use station::{
    AdmissionRejection, AdvanceOutcome, SessionEnd, Station, StationReport, YieldReport,
};
pub use types::*;

/// Bump when a persisted field changes shape.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
