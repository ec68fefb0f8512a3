//! Extraction station controller.
//!
//! Owns the reservoir and at most one extraction session. Admission, the
//! completion transform, and the auto-empty scheduling signals all live here.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rounding::committed_yield;
use crate::session::{ExtractionSession, SessionPhase, SessionStep};
use crate::{
    AbortReason, AnimalId, Candidate, CellPos, CommodityKind, CommodityMap, Constants,
    Environment, Reservoir, SiteConfig, StationId,
};

/// First admission check a candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionRejection {
    Ineligible,
    NotResourceBearing,
    Occupied,
    ReservoirFull,
    Unpowered,
    Forbidden,
    Unreachable,
    Unreservable,
    BelowMinimumFullness,
}

/// What the completion transform produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YieldReport {
    pub commodity: CommodityKind,
    pub amount: u64,
    pub stored: u64,
    pub spilled: u64,
    /// The credit filled the reservoir and raised an empty request.
    pub requested_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Working,
    Completed(YieldReport),
    Failed(AbortReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Cancelled before completion; progress discarded.
    Cancelled { progress: u64 },
    /// Nothing left to complete, or the yield was rejected; state reset.
    Released,
    /// The session ended uncancelled before being finalized, so the
    /// completion transform ran on release.
    CompletedOnRelease(YieldReport),
    /// Wrong occupant or nothing to end.
    Ignored,
}

/// Inspection summary for schedulers and status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReport {
    pub station_id: StationId,
    pub phase: SessionPhase,
    pub occupant: Option<AnimalId>,
    pub progress_fraction: f32,
    pub stored_total: u64,
    pub capacity: u64,
    pub fill_fraction: f32,
    pub empty_requested: bool,
    pub emptying_in_progress: bool,
    /// Ticks until automatic draining is allowed again; 0 when eligible now.
    pub cooldown_remaining: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    /// Where spilled and drained commodity is placed.
    pub output_cell: CellPos,
    pub reservoir: Reservoir,
    pub session: ExtractionSession,
    pub empty_requested: bool,
    pub emptying_in_progress: bool,
    /// Absolute tick from which automatic draining may trigger again.
    pub next_auto_empty_tick: u64,
}

impl Station {
    pub fn new(id: StationId, output_cell: CellPos, capacity: u64) -> Self {
        Self {
            id,
            output_cell,
            reservoir: Reservoir::new(capacity),
            session: ExtractionSession::default(),
            empty_requested: false,
            emptying_in_progress: false,
            next_auto_empty_tick: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    pub fn admission(
        &self,
        candidate: &impl Candidate,
        env: &impl Environment,
        constants: &Constants,
    ) -> Result<(), AdmissionRejection> {
        let animal = candidate.id();
        if !candidate.is_eligible() {
            return Err(AdmissionRejection::Ineligible);
        }
        if candidate.yield_profile().is_none() {
            return Err(AdmissionRejection::NotResourceBearing);
        }
        if !self.session.is_idle() && !self.session.is_occupied_by(animal) {
            return Err(AdmissionRejection::Occupied);
        }
        if self.reservoir.is_full() {
            return Err(AdmissionRejection::ReservoirFull);
        }
        if !env.is_powered(&self.id) {
            return Err(AdmissionRejection::Unpowered);
        }
        if env.is_forbidden(animal) {
            return Err(AdmissionRejection::Forbidden);
        }
        if !env.is_reachable(&self.id, animal) {
            return Err(AdmissionRejection::Unreachable);
        }
        if !env.is_reservable(animal) {
            return Err(AdmissionRejection::Unreservable);
        }
        let fullness = candidate.fullness();
        if !fullness.is_finite() {
            return Err(AdmissionRejection::Ineligible);
        }
        if fullness < constants.minimum_fullness {
            return Err(AdmissionRejection::BelowMinimumFullness);
        }
        Ok(())
    }

    pub fn can_admit(
        &self,
        candidate: &impl Candidate,
        env: &impl Environment,
        constants: &Constants,
    ) -> bool {
        self.admission(candidate, env, constants).is_ok()
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Start a session. Callers check `can_admit` immediately before.
    pub fn start_session(&mut self, candidate: &impl Candidate, constants: &Constants) -> bool {
        let started = self.session.start(candidate, constants);
        if started {
            tracing::debug!(
                station = %self.id,
                animal = %candidate.id(),
                required = self.session.required,
                fullness = self.session.starting_fullness,
                "extraction session started"
            );
        }
        started
    }

    /// One tick of the active session.
    pub fn advance_session<C: Candidate>(
        &mut self,
        candidate: &mut C,
        env: &mut impl Environment,
        rng: &mut impl Rng,
    ) -> AdvanceOutcome {
        let powered = env.is_powered(&self.id);
        match self.session.step(candidate, powered) {
            SessionStep::Working => AdvanceOutcome::Working,
            SessionStep::ReachedTarget => match self.complete_session(candidate, env, rng) {
                Some(report) => AdvanceOutcome::Completed(report),
                None => {
                    self.session.aborted = true;
                    AdvanceOutcome::Failed(AbortReason::InvalidYield)
                }
            },
            SessionStep::Failed(reason) => {
                tracing::debug!(
                    station = %self.id,
                    animal = %candidate.id(),
                    ?reason,
                    "session failed"
                );
                AdvanceOutcome::Failed(reason)
            }
        }
    }

    /// End the session and return the station to idle.
    ///
    /// Unless the end is a cancellation, a session not yet completed runs the
    /// completion transform here, whatever its progress.
    pub fn end_session<C: Candidate>(
        &mut self,
        candidate: &mut C,
        was_cancelled: bool,
        env: &mut impl Environment,
        rng: &mut impl Rng,
    ) -> SessionEnd {
        if !self.session.is_occupied_by(candidate.id()) {
            return SessionEnd::Ignored;
        }
        let outcome = if !was_cancelled && !self.session.completed {
            match self.complete_session(candidate, env, rng) {
                Some(report) => SessionEnd::CompletedOnRelease(report),
                None => SessionEnd::Released,
            }
        } else if was_cancelled && self.session.phase() == SessionPhase::Active {
            SessionEnd::Cancelled {
                progress: self.session.progress,
            }
        } else {
            SessionEnd::Released
        };
        tracing::debug!(station = %self.id, animal = %candidate.id(), ?outcome, "session ended");
        self.session.reset();
        outcome
    }

    /// Tear down a session whose occupant can no longer be looked up.
    pub fn release_session(&mut self) -> Option<AnimalId> {
        let occupant = self.session.occupant.take();
        self.session.reset();
        occupant
    }

    /// Convert the session's starting fullness into commodity: credit the
    /// reservoir, spill the overflow at the output cell, deplete the animal.
    fn complete_session<C: Candidate>(
        &mut self,
        candidate: &mut C,
        env: &mut impl Environment,
        rng: &mut impl Rng,
    ) -> Option<YieldReport> {
        let profile = candidate.yield_profile()?.clone();
        let starting_fullness = self.session.starting_fullness.clamp(0.0, 1.0);
        let Some(amount) = committed_yield(&profile, starting_fullness, rng) else {
            tracing::warn!(
                station = %self.id,
                animal = %candidate.id(),
                yield_per_full_unit = profile.yield_per_full_unit,
                "rejected invalid yield"
            );
            return None;
        };

        let spilled = self.reservoir.credit_units(&profile.commodity, amount);
        if spilled > 0 {
            env.place_commodity(&profile.commodity, spilled, self.output_cell);
        }
        candidate.reduce_fullness(starting_fullness);
        self.session.completed = true;

        let requested_empty = self.reservoir.is_full() && !self.empty_requested;
        if self.reservoir.is_full() {
            self.empty_requested = true;
        }

        tracing::debug!(
            station = %self.id,
            animal = %candidate.id(),
            commodity = %profile.commodity,
            amount,
            spilled,
            "extraction completed"
        );
        Some(YieldReport {
            commodity: profile.commodity,
            amount,
            stored: amount - spilled,
            spilled,
            requested_empty,
        })
    }

    // -----------------------------------------------------------------------
    // Emptying
    // -----------------------------------------------------------------------

    pub fn needs_emptying(&self, forced: bool, config: &SiteConfig, tick: u64) -> bool {
        if forced || self.reservoir.is_full() || self.empty_requested {
            return true;
        }
        self.reservoir.stored_total() > 0
            && self.reservoir.fill_fraction() >= config.auto_empty_threshold
            && tick >= self.next_auto_empty_tick
    }

    /// Ranking weight for emptying: the fill fraction.
    pub fn priority(&self) -> f32 {
        self.reservoir.fill_fraction()
    }

    /// Manual override. Returns true when a request was raised.
    pub fn request_empty(&mut self) -> bool {
        if self.reservoir.stored_total() == 0 {
            return false;
        }
        self.empty_requested = true;
        true
    }

    /// Claim the emptying lock. Fails if another task holds it.
    pub fn begin_emptying(&mut self) -> bool {
        if self.emptying_in_progress {
            return false;
        }
        self.emptying_in_progress = true;
        true
    }

    /// Release the emptying lock without draining.
    pub fn cancel_emptying(&mut self) {
        self.emptying_in_progress = false;
    }

    /// Drain the reservoir into the world and arm the auto-empty cooldown.
    pub fn finish_emptying(
        &mut self,
        env: &mut impl Environment,
        config: &SiteConfig,
        tick: u64,
    ) -> CommodityMap {
        let drained = self.flush(env);
        self.empty_requested = false;
        self.emptying_in_progress = false;
        self.next_auto_empty_tick = tick.saturating_add(config.empty_cooldown_ticks);
        tracing::info!(
            station = %self.id,
            units = drained.values().sum::<u64>(),
            next_auto_empty_tick = self.next_auto_empty_tick,
            "reservoir drained"
        );
        drained
    }

    /// Station removed from the world. Nothing in the reservoir is lost.
    pub fn demolish(mut self, env: &mut impl Environment) -> CommodityMap {
        let flushed = self.flush(env);
        tracing::info!(
            station = %self.id,
            units = flushed.values().sum::<u64>(),
            "station demolished"
        );
        flushed
    }

    fn flush(&mut self, env: &mut impl Environment) -> CommodityMap {
        let drained = self.reservoir.drain_all();
        for (kind, amount) in &drained {
            env.place_commodity(kind, *amount, self.output_cell);
        }
        drained
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn report(&self, tick: u64) -> StationReport {
        StationReport {
            station_id: self.id.clone(),
            phase: self.session.phase(),
            occupant: self.session.occupant.clone(),
            progress_fraction: self.session.progress_fraction(),
            stored_total: self.reservoir.stored_total(),
            capacity: self.reservoir.capacity,
            fill_fraction: self.reservoir.fill_fraction(),
            empty_requested: self.empty_requested,
            emptying_in_progress: self.emptying_in_progress,
            cooldown_remaining: self.next_auto_empty_tick.saturating_sub(tick),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, make_rng, milk, TestAnimal, TestEnv};

    fn constants() -> Constants {
        base_content().constants
    }

    fn config(threshold: f32, cooldown: u64) -> SiteConfig {
        SiteConfig {
            auto_empty_threshold: threshold,
            empty_cooldown_ticks: cooldown,
        }
    }

    fn station(capacity: u64) -> Station {
        Station::new(
            StationId("station_0001".to_string()),
            CellPos { x: 0, y: 1 },
            capacity,
        )
    }

    /// Run a session for `animal` to completion and return the outcome.
    fn run_to_completion(
        station: &mut Station,
        animal: &mut TestAnimal,
        env: &mut TestEnv,
    ) -> AdvanceOutcome {
        let constants = constants();
        let mut rng = make_rng();
        assert!(station.start_session(animal, &constants));
        loop {
            match station.advance_session(animal, env, &mut rng) {
                AdvanceOutcome::Working => {}
                outcome => return outcome,
            }
        }
    }

    // ── Admission ───────────────────────────────────────────────────────

    #[test]
    fn admits_healthy_full_animal() {
        let station = station(10);
        let animal = TestAnimal::new("a", 0.8);
        assert!(station.can_admit(&animal, &TestEnv::default(), &constants()));
    }

    #[test]
    fn rejects_ineligible_animal() {
        let station = station(10);
        let mut animal = TestAnimal::new("a", 0.8);
        animal.eligible = false;
        assert_eq!(
            station.admission(&animal, &TestEnv::default(), &constants()),
            Err(AdmissionRejection::Ineligible)
        );
    }

    #[test]
    fn rejects_animal_without_yield_profile() {
        let station = station(10);
        let mut animal = TestAnimal::new("a", 0.8);
        animal.profile = None;
        assert_eq!(
            station.admission(&animal, &TestEnv::default(), &constants()),
            Err(AdmissionRejection::NotResourceBearing)
        );
    }

    #[test]
    fn rejects_second_animal_while_occupied() {
        let mut station = station(10);
        let first = TestAnimal::new("a", 0.8);
        station.start_session(&first, &constants());
        let second = TestAnimal::new("b", 0.8);
        assert_eq!(
            station.admission(&second, &TestEnv::default(), &constants()),
            Err(AdmissionRejection::Occupied)
        );
        assert!(station.can_admit(&first, &TestEnv::default(), &constants()));
    }

    #[test]
    fn rejects_when_reservoir_full() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 10);
        assert_eq!(
            station.admission(&TestAnimal::new("a", 0.8), &TestEnv::default(), &constants()),
            Err(AdmissionRejection::ReservoirFull)
        );
    }

    #[test]
    fn rejects_on_environment_checks() {
        let station = station(10);
        let animal = TestAnimal::new("a", 0.8);
        let constants = constants();

        let env = TestEnv {
            powered: false,
            ..TestEnv::default()
        };
        assert_eq!(
            station.admission(&animal, &env, &constants),
            Err(AdmissionRejection::Unpowered)
        );

        let mut env = TestEnv::default();
        env.forbidden.insert(animal.id.clone());
        assert_eq!(
            station.admission(&animal, &env, &constants),
            Err(AdmissionRejection::Forbidden)
        );

        let mut env = TestEnv::default();
        env.unreachable.insert(animal.id.clone());
        assert_eq!(
            station.admission(&animal, &env, &constants),
            Err(AdmissionRejection::Unreachable)
        );

        let mut env = TestEnv::default();
        env.reserved.insert(animal.id.clone());
        assert_eq!(
            station.admission(&animal, &env, &constants),
            Err(AdmissionRejection::Unreservable)
        );
    }

    #[test]
    fn rejects_below_minimum_fullness() {
        let station = station(10);
        let constants = constants();
        let animal = TestAnimal::new("a", constants.minimum_fullness / 2.0);
        assert_eq!(
            station.admission(&animal, &TestEnv::default(), &constants),
            Err(AdmissionRejection::BelowMinimumFullness)
        );
    }

    #[test]
    fn rejects_non_finite_fullness() {
        let station = station(10);
        let constants = constants();
        for fullness in [f32::NAN, f32::INFINITY] {
            let animal = TestAnimal::new("a", fullness);
            assert_eq!(
                station.admission(&animal, &TestEnv::default(), &constants),
                Err(AdmissionRejection::Ineligible)
            );
        }
    }

    // ── Completion ──────────────────────────────────────────────────────

    #[test]
    fn completion_credits_reservoir_and_depletes_animal() {
        let mut station = station(100);
        let mut env = TestEnv::default();
        let mut animal = TestAnimal::new("a", 0.5);
        animal.set_yield(10.0);

        let outcome = run_to_completion(&mut station, &mut animal, &mut env);
        let AdvanceOutcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.amount, 5);
        assert_eq!(report.spilled, 0);
        assert_eq!(station.reservoir.stored(&milk()), 5);
        assert!(animal.fullness.abs() < 1e-6);
        assert!(station.session.completed);
        assert!(env.placed.is_empty());
    }

    #[test]
    fn completion_spills_overflow_at_output_cell() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 8);
        let mut env = TestEnv::default();
        let mut animal = TestAnimal::new("a", 0.5);
        animal.set_yield(10.0);

        let outcome = run_to_completion(&mut station, &mut animal, &mut env);
        let AdvanceOutcome::Completed(report) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(report.stored, 2);
        assert_eq!(report.spilled, 3);
        assert_eq!(env.placed, vec![(milk(), 3, station.output_cell)]);
        assert!(station.empty_requested, "full reservoir requests emptying");
        assert!(report.requested_empty);
    }

    #[test]
    fn zero_capacity_station_spills_whole_yield() {
        let mut station = station(0);
        let mut env = TestEnv::default();
        let mut animal = TestAnimal::new("a", 1.0);
        animal.set_yield(6.0);

        run_to_completion(&mut station, &mut animal, &mut env);
        assert_eq!(env.placed_total(&milk()), 6);
        assert_eq!(env.placed_by_cell().get(&station.output_cell), Some(&6));
        assert_eq!(station.reservoir.stored_total(), 0);
        assert!(!station.empty_requested);
    }

    #[test]
    fn invalid_yield_aborts_instead_of_crediting() {
        let mut station = station(10);
        let mut env = TestEnv::default();
        let mut animal = TestAnimal::new("a", 0.5);
        animal.set_yield(f32::NAN);

        let outcome = run_to_completion(&mut station, &mut animal, &mut env);
        assert_eq!(outcome, AdvanceOutcome::Failed(AbortReason::InvalidYield));
        assert_eq!(station.reservoir.stored_total(), 0);
        assert!((animal.fullness - 0.5).abs() < 1e-6, "fullness untouched");
    }

    // ── End / cancel ────────────────────────────────────────────────────

    #[test]
    fn cancel_discards_progress_and_leaves_reservoir_unchanged() {
        let constants = constants();
        let mut station = station(10);
        station.reservoir.credit(&milk(), 2);
        let before = station.reservoir.clone();
        let mut env = TestEnv::default();
        let mut rng = make_rng();
        let mut animal = TestAnimal::new("a", 0.9);

        station.start_session(&animal, &constants);
        for _ in 0..5 {
            station.advance_session(&mut animal, &mut env, &mut rng);
        }
        let end = station.end_session(&mut animal, true, &mut env, &mut rng);
        assert_eq!(end, SessionEnd::Cancelled { progress: 5 });
        assert_eq!(station.reservoir, before);
        assert_eq!(station.session.phase(), SessionPhase::Idle);
        assert!((animal.fullness - 0.9).abs() < 1e-6);
    }

    #[test]
    fn end_completes_session_that_reached_target() {
        let constants = constants();
        let mut station = station(10);
        let mut env = TestEnv::default();
        let mut rng = make_rng();
        let mut animal = TestAnimal::new("a", 0.5);
        animal.set_yield(4.0);

        station.start_session(&animal, &constants);
        // Driver stopped calling advance exactly at the target.
        station.session.progress = station.session.required;
        let end = station.end_session(&mut animal, false, &mut env, &mut rng);
        let SessionEnd::CompletedOnRelease(report) = end else {
            panic!("expected completion on release, got {end:?}");
        };
        assert_eq!(report.amount, 2);
        assert_eq!(station.reservoir.stored_total(), 2);
        assert!(station.session.is_idle());
    }

    #[test]
    fn uncancelled_end_mid_progress_completes() {
        let constants = constants();
        let mut station = station(100);
        let mut env = TestEnv::default();
        let mut rng = make_rng();
        let mut animal = TestAnimal::new("a", 0.5);
        animal.set_yield(10.0);

        station.start_session(&animal, &constants);
        for _ in 0..10 {
            station.advance_session(&mut animal, &mut env, &mut rng);
        }
        assert!(station.session.progress < station.session.required);
        let end = station.end_session(&mut animal, false, &mut env, &mut rng);
        let SessionEnd::CompletedOnRelease(report) = end else {
            panic!("expected completion on release, got {end:?}");
        };
        assert_eq!(report.amount, 5);
        assert_eq!(station.reservoir.stored_total(), 5);
        assert!(animal.fullness.abs() < 1e-6, "fullness depleted");
        assert!(station.session.is_idle());
    }

    #[test]
    fn end_after_completion_does_not_credit_twice() {
        let mut station = station(100);
        let mut env = TestEnv::default();
        let mut rng = make_rng();
        let mut animal = TestAnimal::new("a", 0.5);
        animal.set_yield(10.0);

        run_to_completion(&mut station, &mut animal, &mut env);
        let end = station.end_session(&mut animal, false, &mut env, &mut rng);
        assert_eq!(end, SessionEnd::Released);
        assert_eq!(station.reservoir.stored_total(), 5);
    }

    #[test]
    fn end_with_wrong_animal_is_ignored() {
        let constants = constants();
        let mut station = station(10);
        let mut env = TestEnv::default();
        let mut rng = make_rng();
        station.start_session(&TestAnimal::new("a", 0.5), &constants);
        let mut other = TestAnimal::new("b", 0.5);
        assert_eq!(
            station.end_session(&mut other, true, &mut env, &mut rng),
            SessionEnd::Ignored
        );
        assert_eq!(station.session.phase(), SessionPhase::Active);
    }

    #[test]
    fn release_session_without_candidate() {
        let constants = constants();
        let mut station = station(10);
        station.start_session(&TestAnimal::new("a", 0.5), &constants);
        assert_eq!(station.release_session(), Some(AnimalId("a".to_string())));
        assert!(station.session.is_idle());
    }

    // ── Emptying signals ────────────────────────────────────────────────

    #[test]
    fn auto_empty_above_threshold() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 8);
        assert!(station.needs_emptying(false, &config(0.75, 100), 0));
    }

    #[test]
    fn no_auto_empty_below_threshold() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 7);
        assert!(!station.needs_emptying(false, &config(0.75, 100), 0));
        assert!(station.needs_emptying(true, &config(0.75, 100), 0));
    }

    #[test]
    fn cooldown_blocks_auto_empty_but_not_requests() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 8);
        station.next_auto_empty_tick = 50;
        let config = config(0.75, 100);
        assert!(!station.needs_emptying(false, &config, 49));
        assert!(station.needs_emptying(false, &config, 50));

        station.request_empty();
        assert!(station.needs_emptying(false, &config, 0));
    }

    #[test]
    fn needs_emptying_is_stable_without_state_change() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 8);
        let config = config(0.75, 0);
        let first = station.needs_emptying(false, &config, 10);
        for _ in 0..5 {
            assert_eq!(station.needs_emptying(false, &config, 10), first);
        }
    }

    #[test]
    fn request_empty_needs_contents() {
        let mut station = station(10);
        assert!(!station.request_empty());
        assert!(!station.empty_requested);
        station.reservoir.credit(&milk(), 1);
        assert!(station.request_empty());
        assert!(station.empty_requested);
    }

    #[test]
    fn priority_is_fill_fraction() {
        let mut partial = station(10);
        partial.reservoir.credit(&milk(), 4);
        assert!((partial.priority() - 0.4).abs() < 1e-6);
        assert!(station(0).priority().abs() < 1e-6);
    }

    #[test]
    fn emptying_lock_is_exclusive() {
        let mut station = station(10);
        assert!(station.begin_emptying());
        assert!(!station.begin_emptying());
        station.cancel_emptying();
        assert!(station.begin_emptying());
    }

    #[test]
    fn finish_emptying_drains_and_arms_cooldown() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 9);
        station.request_empty();
        station.begin_emptying();
        let mut env = TestEnv::default();

        let drained = station.finish_emptying(&mut env, &config(0.75, 300), 1_000);
        assert_eq!(drained.get(&milk()), Some(&9));
        assert_eq!(env.placed_total(&milk()), 9);
        assert_eq!(station.reservoir.stored_total(), 0);
        assert!(!station.empty_requested);
        assert!(!station.emptying_in_progress);
        assert_eq!(station.next_auto_empty_tick, 1_300);
    }

    #[test]
    fn demolish_flushes_contents() {
        let mut station = station(10);
        station.reservoir.credit(&milk(), 6);
        let mut env = TestEnv::default();
        let flushed = station.demolish(&mut env);
        assert_eq!(flushed.get(&milk()), Some(&6));
        assert_eq!(env.placed_total(&milk()), 6);
    }

    #[test]
    fn report_summarizes_state() {
        let constants = constants();
        let mut station = station(10);
        station.reservoir.credit(&milk(), 5);
        station.next_auto_empty_tick = 120;
        station.start_session(&TestAnimal::new("a", 0.5), &constants);

        let report = station.report(100);
        assert_eq!(report.phase, SessionPhase::Active);
        assert_eq!(report.occupant, Some(AnimalId("a".to_string())));
        assert_eq!(report.stored_total, 5);
        assert_eq!(report.cooldown_remaining, 20);
        assert!((report.fill_fraction - 0.5).abs() < 1e-6);
    }
}
