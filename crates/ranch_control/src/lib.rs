use std::collections::HashSet;

use ranch_core::{
    AnimalId, Candidate, Command, CommandEnvelope, CommandId, Environment, GameContent, Herd,
    ResourceBearer, SiteState, Station, StationId,
};
use serde::{Deserialize, Serialize};

pub trait CommandSource {
    fn generate_commands<H: Herd, E: Environment>(
        &mut self,
        state: &SiteState,
        herd: &H,
        env: &E,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

/// Assigns work the way station operators would:
/// 1. Put the fullest admissible animal into every idle station.
/// 2. Send free handlers to the stations that most need emptying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotController {
    /// Workers available for emptying tasks at the same time.
    pub handlers: usize,
}

impl Default for AutopilotController {
    fn default() -> Self {
        Self { handlers: 1 }
    }
}

impl AutopilotController {
    pub fn new(handlers: usize) -> Self {
        Self { handlers }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Allocates a command ID and builds a `CommandEnvelope`.
fn make_cmd(tick: u64, next_id: &mut u64, command: Command) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

/// Animals already occupying a station.
fn collect_busy_animals(state: &SiteState) -> HashSet<AnimalId> {
    state
        .stations
        .values()
        .filter_map(|station| station.session.occupant.clone())
        .collect()
}

/// Fullest admissible animal for `station`, ties broken by id.
fn pick_candidate<H: Herd, E: Environment>(
    station: &Station,
    herd: &H,
    env: &E,
    content: &GameContent,
    taken: &HashSet<AnimalId>,
) -> Option<AnimalId> {
    herd.animal_ids()
        .into_iter()
        .filter(|id| !taken.contains(id))
        .filter_map(|id| herd.animal(&id))
        .filter(|animal| station.can_admit(*animal, env, &content.constants))
        .max_by(|a, b| {
            a.fullness()
                .total_cmp(&b.fullness())
                .then_with(|| b.id().cmp(a.id()))
        })
        .map(|animal| animal.id().clone())
}

/// Stations that need emptying and have no task yet, highest priority first.
fn collect_emptying_candidates(state: &SiteState) -> Vec<StationId> {
    let mut candidates: Vec<&Station> = state
        .stations
        .values()
        .filter(|station| {
            !station.emptying_in_progress
                && station.needs_emptying(false, &state.config, state.meta.tick)
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.priority()
            .total_cmp(&a.priority())
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.into_iter().map(|s| s.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// AutopilotController
// ---------------------------------------------------------------------------

impl CommandSource for AutopilotController {
    fn generate_commands<H: Herd, E: Environment>(
        &mut self,
        state: &SiteState,
        herd: &H,
        env: &E,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let tick = state.meta.tick;
        let mut commands = Vec::new();

        // Priority 1: fill idle stations.
        let mut taken = collect_busy_animals(state);
        for station in state.stations.values().filter(|s| s.session.is_idle()) {
            if let Some(animal_id) = pick_candidate(station, herd, env, content, &taken) {
                taken.insert(animal_id.clone());
                commands.push(make_cmd(
                    tick,
                    next_command_id,
                    Command::StartSession {
                        station_id: station.id.clone(),
                        animal_id,
                    },
                ));
            }
        }

        // Priority 2: empty reservoirs, limited by free handlers.
        let free_handlers = self.handlers.saturating_sub(state.emptying.len());
        for station_id in collect_emptying_candidates(state)
            .into_iter()
            .take(free_handlers)
        {
            commands.push(make_cmd(
                tick,
                next_command_id,
                Command::DispatchEmptying {
                    station_id,
                    forced: false,
                },
            ));
        }

        commands
    }
}
