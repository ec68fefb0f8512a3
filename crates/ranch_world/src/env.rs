//! Reference environment: per-station power, animal restrictions and floor
//! stockpiles for spilled and drained commodity.

use std::collections::BTreeSet;

use ranch_core::{split_into_stacks, AnimalId, CellPos, CommodityKind, Environment, StationId};
use serde::{Deserialize, Serialize};

/// One stack of commodity lying on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorStack {
    pub kind: CommodityKind,
    pub amount: u64,
    pub location: CellPos,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldEnv {
    /// Largest stack placed on one cell; 0 means unlimited.
    pub max_stack_size: u64,
    pub unpowered: BTreeSet<StationId>,
    pub forbidden: BTreeSet<AnimalId>,
    pub unreachable: BTreeSet<AnimalId>,
    pub reserved: BTreeSet<AnimalId>,
    pub stockpile: Vec<FloorStack>,
}

impl WorldEnv {
    pub fn new(max_stack_size: u64) -> Self {
        Self {
            max_stack_size,
            ..Self::default()
        }
    }

    pub fn set_powered(&mut self, station: &StationId, powered: bool) {
        if powered {
            self.unpowered.remove(station);
        } else {
            self.unpowered.insert(station.clone());
        }
    }

    pub fn stockpile_total(&self, kind: &CommodityKind) -> u64 {
        self.stockpile
            .iter()
            .filter(|stack| &stack.kind == kind)
            .map(|stack| stack.amount)
            .sum()
    }
}

impl Environment for WorldEnv {
    fn is_powered(&self, station: &StationId) -> bool {
        !self.unpowered.contains(station)
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
        for stack in split_into_stacks(amount, self.max_stack_size) {
            self.stockpile.push(FloorStack {
                kind: kind.clone(),
                amount: stack,
                location,
            });
        }
        tracing::debug!(%kind, amount, %location, "commodity placed");
    }
}
