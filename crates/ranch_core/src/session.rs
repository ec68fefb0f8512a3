//! Per-occupant extraction session state machine.
//!
//! `Idle -> Active -> {Completed, Aborted} -> Idle`. The session only tracks
//! progress; crediting the reservoir on completion is the station's job.

use serde::{Deserialize, Serialize};

use crate::{AnimalId, Candidate, Constants};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Active,
    Completed,
    Aborted,
}

/// Why a session stopped short of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// `advance` called while no session was active.
    NotActive,
    /// The animal driving the session is not the occupant.
    OccupantMismatch,
    Unpowered,
    /// Occupant died, was incapacitated, or left the map.
    OccupantIneligible,
    /// The occupant's yield profile produced a negative or NaN amount.
    InvalidYield,
}

/// Result of one tick of session progress, before any completion side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionStep {
    Working,
    ReachedTarget,
    Failed(AbortReason),
}

/// Stored as plain fields; the phase is derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSession {
    pub occupant: Option<AnimalId>,
    pub progress: u64,
    pub required: u64,
    pub starting_fullness: f32,
    pub completed: bool,
    pub aborted: bool,
}

/// Ticks needed to extract an animal at `fullness`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn required_ticks(fullness: f32, constants: &Constants) -> u64 {
    let scaled = f64::from(fullness.clamp(0.0, 1.0)) * constants.ticks_per_fullness_unit as f64;
    constants.minimum_session_ticks.max(scaled.round() as u64)
}

impl ExtractionSession {
    pub fn phase(&self) -> SessionPhase {
        match (&self.occupant, self.aborted, self.completed) {
            (None, _, _) => SessionPhase::Idle,
            (Some(_), true, _) => SessionPhase::Aborted,
            (Some(_), false, true) => SessionPhase::Completed,
            (Some(_), false, false) => SessionPhase::Active,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn is_occupied_by(&self, id: &AnimalId) -> bool {
        self.occupant.as_ref() == Some(id)
    }

    /// Progress toward the target in 0..=1.
    #[allow(clippy::cast_possible_truncation)]
    pub fn progress_fraction(&self) -> f32 {
        if self.required == 0 {
            return 0.0;
        }
        (self.progress as f64 / self.required as f64).min(1.0) as f32
    }

    /// Begin a session for `candidate`. Returns false (and changes nothing)
    /// unless the session is idle and the candidate's fullness is finite.
    pub fn start(&mut self, candidate: &impl Candidate, constants: &Constants) -> bool {
        if !self.is_idle() || !candidate.fullness().is_finite() {
            return false;
        }
        let fullness = candidate.fullness().clamp(0.0, 1.0);
        *self = Self {
            occupant: Some(candidate.id().clone()),
            progress: 0,
            required: required_ticks(fullness, constants),
            starting_fullness: fullness,
            completed: false,
            aborted: false,
        };
        true
    }

    /// Accrue one tick of progress. Environment and eligibility failures mark
    /// the session aborted; misuse (wrong phase or occupant) changes nothing.
    pub(crate) fn step(&mut self, candidate: &impl Candidate, powered: bool) -> SessionStep {
        if self.phase() != SessionPhase::Active {
            return SessionStep::Failed(AbortReason::NotActive);
        }
        if !self.is_occupied_by(candidate.id()) {
            return SessionStep::Failed(AbortReason::OccupantMismatch);
        }
        if !powered {
            self.aborted = true;
            return SessionStep::Failed(AbortReason::Unpowered);
        }
        if !candidate.is_eligible() {
            self.aborted = true;
            return SessionStep::Failed(AbortReason::OccupantIneligible);
        }
        self.progress = (self.progress + 1).min(self.required);
        if self.progress >= self.required {
            SessionStep::ReachedTarget
        } else {
            SessionStep::Working
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
