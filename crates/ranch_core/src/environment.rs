//! Seams between the stations and the surrounding world.
//!
//! The core never owns animals or the map. It reads and depletes fullness
//! through [`ResourceBearer`], checks admission through [`Environment`], and
//! hands spilled or drained commodity back to the world for placement.

use smallvec::SmallVec;

use crate::{AnimalId, CellPos, CommodityKind, StationId, YieldProfile};

/// Capability to read and deplete an entity's extractable resource level.
pub trait ResourceBearer {
    /// Current fullness in 0..=1.
    fn fullness(&self) -> f32;

    /// Lower fullness by `delta`. Implementations clamp at 0.
    fn reduce_fullness(&mut self, delta: f32);
}

/// An animal that may occupy an extraction station.
pub trait Candidate: ResourceBearer {
    fn id(&self) -> &AnimalId;

    /// False once the animal is dead, incapacitated, or no longer on the map.
    fn is_eligible(&self) -> bool;

    /// `None` for animals that produce nothing a station can extract.
    fn yield_profile(&self) -> Option<&YieldProfile>;
}

/// Lookup of candidates by identity. Owned by the world, not by the core.
pub trait Herd {
    type Animal: Candidate;

    fn animal(&self, id: &AnimalId) -> Option<&Self::Animal>;

    fn animal_mut(&mut self, id: &AnimalId) -> Option<&mut Self::Animal>;

    /// All animal ids in a stable order.
    fn animal_ids(&self) -> Vec<AnimalId>;
}

/// World queries and the placement sink used by stations.
pub trait Environment {
    fn is_powered(&self, station: &StationId) -> bool;

    fn is_forbidden(&self, animal: &AnimalId) -> bool;

    fn is_reachable(&self, station: &StationId, animal: &AnimalId) -> bool;

    fn is_reservable(&self, animal: &AnimalId) -> bool;

    /// Deliver `amount` units of `kind` at `location`. Never refuses.
    fn place_commodity(&mut self, kind: &CommodityKind, amount: u64, location: CellPos);
}

/// Split `amount` into stacks of at most `max_stack` units, largest first.
///
/// A `max_stack` of 0 is treated as unlimited.
pub fn split_into_stacks(amount: u64, max_stack: u64) -> SmallVec<[u64; 4]> {
    let mut stacks = SmallVec::new();
    if amount == 0 {
        return stacks;
    }
    if max_stack == 0 {
        stacks.push(amount);
        return stacks;
    }
    let mut remaining = amount;
    while remaining > 0 {
        let stack = remaining.min(max_stack);
        stacks.push(stack);
        remaining -= stack;
    }
    stacks
}
