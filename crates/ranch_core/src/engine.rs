use rand::Rng;

use crate::emptying::{EmptyingStep, EmptyingTask};
use crate::{
    AdvanceOutcome, AnimalId, Command, CommandEnvelope, Environment, Event, EventEnvelope,
    GameContent, Herd, SessionEnd, SiteState, StationId,
};

/// Advance the site by one tick.
///
/// Order of operations:
/// 1. Apply commands scheduled for this tick.
/// 2. Advance every active extraction session once.
/// 3. Advance in-flight emptying tasks.
/// 4. Increment tick counter.
///
/// Returns all events produced this tick.
pub fn tick<H: Herd, E: Environment>(
    state: &mut SiteState,
    commands: &[CommandEnvelope],
    herd: &mut H,
    env: &mut E,
    content: &GameContent,
    rng: &mut impl Rng,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();

    apply_commands(state, commands, herd, env, content, rng, &mut events);
    advance_sessions(state, herd, env, rng, &mut events);
    advance_emptying(state, env, &mut events);

    state.meta.tick += 1;
    events
}

fn apply_commands<H: Herd, E: Environment>(
    state: &mut SiteState,
    commands: &[CommandEnvelope],
    herd: &mut H,
    env: &mut E,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;

    for envelope in commands {
        if envelope.execute_at_tick != current_tick {
            continue;
        }
        let event = match &envelope.command {
            Command::StartSession {
                station_id,
                animal_id,
            } => start_session(state, station_id, animal_id, herd, env, content),
            Command::CancelSession { station_id } => {
                cancel_session(state, station_id, herd, env, rng)
            }
            Command::RequestEmpty { station_id } => request_empty(state, station_id),
            Command::DispatchEmptying { station_id, forced } => {
                dispatch_emptying(state, station_id, *forced, content)
            }
            Command::AbandonEmptying { station_id } => abandon_emptying(state, station_id),
            Command::SetAutoEmptyThreshold { fraction } => fraction.is_finite().then(|| {
                state.config.auto_empty_threshold = fraction.clamp(0.0, 1.0);
                config_changed(state)
            }),
            Command::SetEmptyCooldown { ticks } => {
                state.config.empty_cooldown_ticks = *ticks;
                Some(config_changed(state))
            }
            Command::DemolishStation { station_id } => demolish_station(state, station_id, env),
        };
        if let Some(event) = event {
            events.push(crate::emit(&mut state.counters, current_tick, event));
        }
    }
}

/// Admission and start run back-to-back so no other start can slip in
/// between the check and the set.
fn start_session<H: Herd, E: Environment>(
    state: &mut SiteState,
    station_id: &StationId,
    animal_id: &AnimalId,
    herd: &H,
    env: &E,
    content: &GameContent,
) -> Option<Event> {
    let station = state.stations.get_mut(station_id)?;
    let animal = herd.animal(animal_id)?;
    if !station.can_admit(animal, env, &content.constants)
        || !station.start_session(animal, &content.constants)
    {
        return None;
    }
    Some(Event::SessionStarted {
        station_id: station_id.clone(),
        animal_id: animal_id.clone(),
        required_ticks: station.session.required,
        starting_fullness: station.session.starting_fullness,
    })
}

fn cancel_session<H: Herd, E: Environment>(
    state: &mut SiteState,
    station_id: &StationId,
    herd: &mut H,
    env: &mut E,
    rng: &mut impl Rng,
) -> Option<Event> {
    let station = state.stations.get_mut(station_id)?;
    let animal_id = station.session.occupant.clone()?;
    let progress_ticks = station.session.progress;
    match herd.animal_mut(&animal_id) {
        Some(animal) => {
            station.end_session(animal, true, env, rng);
        }
        None => {
            station.release_session();
        }
    }
    state.counters.sessions_cancelled += 1;
    Some(Event::SessionCancelled {
        station_id: station_id.clone(),
        animal_id,
        progress_ticks,
    })
}

fn request_empty(state: &mut SiteState, station_id: &StationId) -> Option<Event> {
    let station = state.stations.get_mut(station_id)?;
    if station.empty_requested || !station.request_empty() {
        return None;
    }
    Some(Event::EmptyRequested {
        station_id: station_id.clone(),
    })
}

fn dispatch_emptying(
    state: &mut SiteState,
    station_id: &StationId,
    forced: bool,
    content: &GameContent,
) -> Option<Event> {
    let station = state.stations.get_mut(station_id)?;
    if !station.needs_emptying(forced, &state.config, state.meta.tick) {
        return None;
    }
    let task = EmptyingTask::claim(station, content.constants.emptying_duration_ticks, forced)?;
    state.emptying.push(task);
    Some(Event::EmptyingStarted {
        station_id: station_id.clone(),
        forced,
    })
}

fn abandon_emptying(state: &mut SiteState, station_id: &StationId) -> Option<Event> {
    let idx = state
        .emptying
        .iter()
        .position(|task| &task.station_id == station_id)?;
    let task = state.emptying.remove(idx);
    if let Some(station) = state.stations.get_mut(station_id) {
        task.abandon(station);
    }
    Some(Event::EmptyingAbandoned {
        station_id: station_id.clone(),
    })
}

fn demolish_station<E: Environment>(
    state: &mut SiteState,
    station_id: &StationId,
    env: &mut E,
) -> Option<Event> {
    let station = state.stations.remove(station_id)?;
    state.emptying.retain(|task| &task.station_id != station_id);
    let flushed = station.demolish(env);
    state.counters.units_drained += flushed.values().sum::<u64>();
    Some(Event::StationDemolished {
        station_id: station_id.clone(),
        flushed,
    })
}

fn config_changed(state: &SiteState) -> Event {
    Event::SiteConfigChanged {
        auto_empty_threshold: state.config.auto_empty_threshold,
        empty_cooldown_ticks: state.config.empty_cooldown_ticks,
    }
}

/// The per-occupant driver: one `advance` per active session, then end the
/// session when it completes or fails.
fn advance_sessions<H: Herd, E: Environment>(
    state: &mut SiteState,
    herd: &mut H,
    env: &mut E,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;
    let active: Vec<StationId> = state
        .stations
        .values()
        .filter(|station| station.session.occupant.is_some())
        .map(|station| station.id.clone())
        .collect();

    for station_id in active {
        let Some(station) = state.stations.get_mut(&station_id) else {
            continue;
        };
        let Some(animal_id) = station.session.occupant.clone() else {
            continue;
        };

        let Some(animal) = herd.animal_mut(&animal_id) else {
            station.release_session();
            state.counters.sessions_aborted += 1;
            events.push(crate::emit(
                &mut state.counters,
                current_tick,
                Event::SessionAborted {
                    station_id,
                    animal_id,
                    reason: crate::AbortReason::OccupantIneligible,
                },
            ));
            continue;
        };

        let event = match station.advance_session(animal, env, rng) {
            AdvanceOutcome::Working => continue,
            AdvanceOutcome::Completed(report) => {
                station.end_session(animal, false, env, rng);
                state.counters.sessions_completed += 1;
                state.counters.units_produced += report.amount;
                state.counters.units_spilled += report.spilled;
                if report.requested_empty {
                    events.push(crate::emit(
                        &mut state.counters,
                        current_tick,
                        Event::EmptyRequested {
                            station_id: station_id.clone(),
                        },
                    ));
                }
                Event::SessionCompleted {
                    station_id,
                    animal_id,
                    commodity: report.commodity,
                    amount: report.amount,
                    stored: report.stored,
                    spilled: report.spilled,
                }
            }
            AdvanceOutcome::Failed(reason) => {
                // Abandon the unit of work: progress is discarded.
                let end = station.end_session(animal, true, env, rng);
                debug_assert!(!matches!(end, SessionEnd::CompletedOnRelease(_)));
                state.counters.sessions_aborted += 1;
                Event::SessionAborted {
                    station_id,
                    animal_id,
                    reason,
                }
            }
        };
        events.push(crate::emit(&mut state.counters, current_tick, event));
    }
}

fn advance_emptying<E: Environment>(
    state: &mut SiteState,
    env: &mut E,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;
    let SiteState {
        config,
        stations,
        emptying,
        counters,
        ..
    } = state;

    let mut finished = Vec::new();
    emptying.retain_mut(|task| {
        let Some(station) = stations.get_mut(&task.station_id) else {
            return false;
        };
        match task.advance(station, env, config, current_tick) {
            EmptyingStep::Working => true,
            EmptyingStep::Finished(contents) => {
                finished.push((
                    task.station_id.clone(),
                    contents,
                    station.next_auto_empty_tick,
                ));
                false
            }
        }
    });

    for (station_id, contents, next_auto_empty_tick) in finished {
        counters.drains_completed += 1;
        counters.units_drained += contents.values().sum::<u64>();
        events.push(crate::emit(
            counters,
            current_tick,
            Event::ReservoirDrained {
                station_id,
                contents,
                next_auto_empty_tick,
            },
        ));
    }
}
