//! Shared test fixtures for `ranch_core` and downstream crates.
//!
//! `base_content()` provides compact content with short sessions suitable for
//! engine-level tests. `TestAnimal`, `TestHerd` and `TestEnv` are in-memory
//! stand-ins for the world side of the station seams.

use crate::{
    AnimalId, AnimalKindDef, Candidate, CellPos, CommodityKind, Constants, Counters, Environment,
    GameContent, Herd, MetaState, ResourceBearer, SiteConfig, SiteState, Station, StationId,
    YieldProfile,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn milk() -> CommodityKind {
    CommodityKind("milk".to_string())
}

/// Compact content: one milk-producing kind, 600/2400 session timing,
/// capacity-10 reservoirs.
pub fn base_content() -> GameContent {
    GameContent {
        content_version: "test".to_string(),
        animal_kinds: vec![AnimalKindDef {
            id: "kind_cow".to_string(),
            name: "Cow".to_string(),
            yield_profile: Some(YieldProfile {
                commodity: milk(),
                yield_per_full_unit: 10.0,
            }),
            fullness_growth_per_tick: 0.0,
            initial_count: 2,
        }],
        constants: Constants {
            minimum_session_ticks: 600,
            ticks_per_fullness_unit: 2400,
            minimum_fullness: 0.1,
            station_reservoir_capacity: 10,
            emptying_duration_ticks: 3,
            default_auto_empty_threshold: 0.75,
            default_empty_cooldown_ticks: 100,
            station_count: 1,
            max_stack_size: 75,
        },
    }
}

/// A site with `content.constants.station_count` stations named
/// `station_0001`, `station_0002`, ...
pub fn base_state(content: &GameContent) -> SiteState {
    let c = &content.constants;
    let stations = (1..=c.station_count)
        .map(|n| {
            let id = StationId(format!("station_{n:04}"));
            let x = i32::try_from(n).unwrap_or(i32::MAX) * 4;
            let station =
                Station::new(id.clone(), CellPos { x, y: 1 }, c.station_reservoir_capacity);
            (id, station)
        })
        .collect();
    SiteState {
        meta: MetaState {
            tick: 0,
            seed: 42,
            schema_version: crate::SCHEMA_VERSION,
            content_version: content.content_version.clone(),
        },
        config: SiteConfig::from_constants(c),
        stations,
        emptying: Vec::new(),
        counters: Counters::default(),
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

#[derive(Debug, Clone)]
pub struct TestAnimal {
    pub id: AnimalId,
    pub fullness: f32,
    pub eligible: bool,
    pub profile: Option<YieldProfile>,
}

impl TestAnimal {
    pub fn new(id: &str, fullness: f32) -> Self {
        Self {
            id: AnimalId(id.to_string()),
            fullness,
            eligible: true,
            profile: Some(YieldProfile {
                commodity: milk(),
                yield_per_full_unit: 10.0,
            }),
        }
    }

    pub fn set_yield(&mut self, yield_per_full_unit: f32) {
        if let Some(profile) = self.profile.as_mut() {
            profile.yield_per_full_unit = yield_per_full_unit;
        }
    }
}

impl ResourceBearer for TestAnimal {
    fn fullness(&self) -> f32 {
        self.fullness
    }

    fn reduce_fullness(&mut self, delta: f32) {
        self.fullness = (self.fullness - delta).max(0.0);
    }
}

impl Candidate for TestAnimal {
    fn id(&self) -> &AnimalId {
        &self.id
    }

    fn is_eligible(&self) -> bool {
        self.eligible
    }

    fn yield_profile(&self) -> Option<&YieldProfile> {
        self.profile.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestHerd {
    pub animals: BTreeMap<AnimalId, TestAnimal>,
}

impl TestHerd {
    pub fn with(animals: impl IntoIterator<Item = TestAnimal>) -> Self {
        Self {
            animals: animals.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    /// Panics if the animal is missing. Test-only convenience.
    pub fn get(&self, id: &str) -> &TestAnimal {
        &self.animals[&AnimalId(id.to_string())]
    }

    pub fn get_mut(&mut self, id: &str) -> &mut TestAnimal {
        self.animals
            .get_mut(&AnimalId(id.to_string()))
            .expect("test animal exists")
    }
}

impl Herd for TestHerd {
    type Animal = TestAnimal;

    fn animal(&self, id: &AnimalId) -> Option<&TestAnimal> {
        self.animals.get(id)
    }

    fn animal_mut(&mut self, id: &AnimalId) -> Option<&mut TestAnimal> {
        self.animals.get_mut(id)
    }

    fn animal_ids(&self) -> Vec<AnimalId> {
        self.animals.keys().cloned().collect()
    }
}

/// Environment that allows everything by default and records placements.
#[derive(Debug, Clone)]
pub struct TestEnv {
    pub powered: bool,
    pub unpowered_stations: HashSet<StationId>,
    pub forbidden: HashSet<AnimalId>,
    pub unreachable: HashSet<AnimalId>,
    pub reserved: HashSet<AnimalId>,
    pub placed: Vec<(CommodityKind, u64, CellPos)>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self {
            powered: true,
            unpowered_stations: HashSet::new(),
            forbidden: HashSet::new(),
            unreachable: HashSet::new(),
            reserved: HashSet::new(),
            placed: Vec::new(),
        }
    }
}

impl TestEnv {
    pub fn placed_total(&self, kind: &CommodityKind) -> u64 {
        self.placed
            .iter()
            .filter(|(k, _, _)| k == kind)
            .map(|(_, amount, _)| amount)
            .sum()
    }

    pub fn placed_by_cell(&self) -> HashMap<CellPos, u64> {
        let mut totals = HashMap::new();
        for (_, amount, cell) in &self.placed {
            *totals.entry(*cell).or_insert(0) += amount;
        }
        totals
    }
}

impl Environment for TestEnv {
    fn is_powered(&self, station: &StationId) -> bool {
        self.powered && !self.unpowered_stations.contains(station)
    }

    fn is_forbidden(&self, animal: &AnimalId) -> bool {
        self.forbidden.contains(animal)
    }

    fn is_reachable(&self, _station: &StationId, animal: &AnimalId) -> bool {
        !self.unreachable.contains(animal)
    }

    fn is_reservable(&self, animal: &AnimalId) -> bool {
        !self.reserved.contains(animal)
    }

    fn place_commodity(&mut self, kind: &CommodityKind, amount: u64, location: CellPos) {
        self.placed.push((kind.clone(), amount, location));
    }
}
