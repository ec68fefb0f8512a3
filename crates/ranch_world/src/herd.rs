//! Reference animals: fullness that refills over time and a health condition
//! that decides station eligibility.

use std::collections::{BTreeMap, HashSet};

use ranch_core::{AnimalId, Candidate, ResourceBearer, YieldProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimalCondition {
    Healthy,
    Downed,
    Dead,
    /// Left the map.
    Away,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub kind_id: String,
    pub fullness: f32,
    pub growth_per_tick: f32,
    pub yield_profile: Option<YieldProfile>,
    pub condition: AnimalCondition,
}

impl ResourceBearer for Animal {
    fn fullness(&self) -> f32 {
        self.fullness
    }

    fn reduce_fullness(&mut self, delta: f32) {
        self.fullness = (self.fullness - delta).clamp(0.0, 1.0);
    }
}

impl Candidate for Animal {
    fn id(&self) -> &AnimalId {
        &self.id
    }

    fn is_eligible(&self) -> bool {
        self.condition == AnimalCondition::Healthy
    }

    fn yield_profile(&self) -> Option<&YieldProfile> {
        self.yield_profile.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Herd {
    pub animals: BTreeMap<AnimalId, Animal>,
}

impl Herd {
    pub fn insert(&mut self, animal: Animal) {
        self.animals.insert(animal.id.clone(), animal);
    }

    /// Refill every healthy animal that is not currently being extracted.
    pub fn grow(&mut self, in_session: &HashSet<AnimalId>) {
        for animal in self.animals.values_mut() {
            if animal.condition != AnimalCondition::Healthy || in_session.contains(&animal.id) {
                continue;
            }
            animal.fullness = (animal.fullness + animal.growth_per_tick).min(1.0);
        }
    }

    pub fn set_condition(&mut self, id: &AnimalId, condition: AnimalCondition) -> bool {
        match self.animals.get_mut(id) {
            Some(animal) => {
                animal.condition = condition;
                true
            }
            None => false,
        }
    }
}

impl ranch_core::Herd for Herd {
    type Animal = Animal;

    fn animal(&self, id: &AnimalId) -> Option<&Animal> {
        self.animals.get(id)
    }

    fn animal_mut(&mut self, id: &AnimalId) -> Option<&mut Animal> {
        self.animals.get_mut(id)
    }

    fn animal_ids(&self) -> Vec<AnimalId> {
        self.animals.keys().cloned().collect()
    }
}
