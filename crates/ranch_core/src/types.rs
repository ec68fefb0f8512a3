//! Type definitions for `ranch_core`.
//!
//! Site state, content, command and event types plus the ID newtypes used by
//! the extraction stations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::emptying::EmptyingTask;
use crate::station::Station;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(AnimalId);
string_id!(StationId);
string_id!(CommodityKind);
string_id!(CommandId);
string_id!(EventId);

/// Commodity quantities keyed by kind. Ordered so drains and spills are
/// placed in a stable order.
pub type CommodityMap = BTreeMap<CommodityKind, u64>;

/// A grid cell in the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What a resource-bearing animal produces and how much per full unit of
/// fullness. Read from the animal kind's content definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldProfile {
    pub commodity: CommodityKind,
    pub yield_per_full_unit: f32,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// One spatial region: its stations, the region-wide emptying configuration,
/// and in-flight emptying work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteState {
    pub meta: MetaState,
    pub config: SiteConfig,
    pub stations: BTreeMap<StationId, Station>,
    /// In-flight emptying work. Not persisted; `snapshot::restore` re-arms a
    /// task for every station saved with `emptying_in_progress`.
    #[serde(skip)]
    pub emptying: Vec<EmptyingTask>,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

/// Region-wide auto-empty policy shared by every station on the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Fill fraction (0..=1) at which automatic draining becomes eligible.
    pub auto_empty_threshold: f32,
    /// Minimum ticks between two automatic drains of the same reservoir.
    pub empty_cooldown_ticks: u64,
}

impl SiteConfig {
    pub fn from_constants(constants: &Constants) -> Self {
        Self {
            auto_empty_threshold: constants.default_auto_empty_threshold.clamp(0.0, 1.0),
            empty_cooldown_ticks: constants.default_empty_cooldown_ticks,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_command_id: u64,
    pub sessions_completed: u64,
    pub sessions_aborted: u64,
    pub sessions_cancelled: u64,
    pub units_produced: u64,
    pub units_spilled: u64,
    pub units_drained: u64,
    pub drains_completed: u64,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    StartSession {
        station_id: StationId,
        animal_id: AnimalId,
    },
    CancelSession {
        station_id: StationId,
    },
    RequestEmpty {
        station_id: StationId,
    },
    DispatchEmptying {
        station_id: StationId,
        forced: bool,
    },
    /// The worker carrying out an emptying task was interrupted.
    AbandonEmptying {
        station_id: StationId,
    },
    SetAutoEmptyThreshold {
        fraction: f32,
    },
    SetEmptyCooldown {
        ticks: u64,
    },
    DemolishStation {
        station_id: StationId,
    },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SessionStarted {
        station_id: StationId,
        animal_id: AnimalId,
        required_ticks: u64,
        starting_fullness: f32,
    },
    SessionCompleted {
        station_id: StationId,
        animal_id: AnimalId,
        commodity: CommodityKind,
        amount: u64,
        stored: u64,
        spilled: u64,
    },
    SessionAborted {
        station_id: StationId,
        animal_id: AnimalId,
        reason: crate::AbortReason,
    },
    SessionCancelled {
        station_id: StationId,
        animal_id: AnimalId,
        progress_ticks: u64,
    },
    EmptyRequested {
        station_id: StationId,
    },
    EmptyingStarted {
        station_id: StationId,
        forced: bool,
    },
    EmptyingAbandoned {
        station_id: StationId,
    },
    ReservoirDrained {
        station_id: StationId,
        contents: CommodityMap,
        next_auto_empty_tick: u64,
    },
    StationDemolished {
        station_id: StationId,
        flushed: CommodityMap,
    },
    SiteConfigChanged {
        auto_empty_threshold: f32,
        empty_cooldown_ticks: u64,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub animal_kinds: Vec<AnimalKindDef>,
    pub constants: Constants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalKindDef {
    pub id: String,
    pub name: String,
    /// `None` for kinds that cannot use an extraction station.
    #[serde(default)]
    pub yield_profile: Option<YieldProfile>,
    /// Fullness regained per tick while not being extracted.
    pub fullness_growth_per_tick: f32,
    /// How many of this kind world generation places on a new site.
    #[serde(default)]
    pub initial_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    /// Floor on session length so near-empty animals still finish promptly.
    pub minimum_session_ticks: u64,
    /// Session length for an animal at fullness 1.0.
    pub ticks_per_fullness_unit: u64,
    /// Animals below this fullness are not admitted.
    pub minimum_fullness: f32,
    /// Reservoir capacity of a new station. 0 spills every yield immediately.
    pub station_reservoir_capacity: u64,
    pub emptying_duration_ticks: u64,
    pub default_auto_empty_threshold: f32,
    pub default_empty_cooldown_ticks: u64,
    pub station_count: u32,
    /// Largest stack the environment places on a single cell.
    pub max_stack_size: u64,
}
