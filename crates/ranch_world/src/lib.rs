//! Content loading, world generation and the reference herd/environment
//! shared between `ranch_cli` and `ranch_bench`.

mod env;
mod herd;
mod save;

pub use env::{FloorStack, WorldEnv};
pub use herd::{Animal, AnimalCondition, Herd};
pub use save::{load_game, save_game, SaveGame};

use anyhow::{Context, Result};
use rand::Rng;
use ranch_core::{
    AnimalId, AnimalKindDef, CellPos, Constants, Counters, GameContent, MetaState, SiteConfig,
    SiteState, Station, StationId, SCHEMA_VERSION,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct AnimalKindsFile {
    content_version: String,
    kinds: Vec<AnimalKindDef>,
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches mistakes like: duplicate kind ids, a yield profile with no
/// commodity or a negative yield, or an auto-empty threshold outside 0..=1.
pub fn validate_content(content: &GameContent) {
    let mut kind_ids = HashSet::new();
    for kind in &content.animal_kinds {
        assert!(!kind.id.is_empty(), "animal kind has empty id");
        assert!(
            kind_ids.insert(kind.id.as_str()),
            "animal kind '{}' is defined more than once",
            kind.id,
        );
        assert!(
            kind.fullness_growth_per_tick.is_finite() && kind.fullness_growth_per_tick >= 0.0,
            "animal kind '{}' has invalid fullness growth {}",
            kind.id,
            kind.fullness_growth_per_tick,
        );
        if let Some(profile) = &kind.yield_profile {
            assert!(
                !profile.commodity.0.is_empty(),
                "animal kind '{}' yield profile has empty commodity",
                kind.id,
            );
            assert!(
                profile.yield_per_full_unit.is_finite() && profile.yield_per_full_unit >= 0.0,
                "animal kind '{}' has invalid yield per full unit {}",
                kind.id,
                profile.yield_per_full_unit,
            );
        }
    }

    validate_constants(&content.constants);
}

fn validate_constants(c: &Constants) {
    assert!(
        c.minimum_session_ticks > 0,
        "minimum_session_ticks must be positive"
    );
    assert!(
        (0.0..=1.0).contains(&c.minimum_fullness),
        "minimum_fullness {} is outside 0..=1",
        c.minimum_fullness,
    );
    assert!(
        (0.0..=1.0).contains(&c.default_auto_empty_threshold),
        "default_auto_empty_threshold {} is outside 0..=1",
        c.default_auto_empty_threshold,
    );
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let kinds_file: AnimalKindsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("animal_kinds.json"))
            .context("reading animal_kinds.json")?,
    )
    .context("parsing animal_kinds.json")?;
    let content = GameContent {
        content_version: kinds_file.content_version,
        animal_kinds: kinds_file.kinds,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// A fresh site with `station_count` empty stations, plus the initial herd
/// and an environment with every station powered.
pub fn build_initial_state(
    content: &GameContent,
    seed: u64,
    rng: &mut impl Rng,
) -> (SiteState, Herd, WorldEnv) {
    let c = &content.constants;
    let stations = (1..=c.station_count)
        .map(|n| {
            let id = StationId(format!("station_{n:04}"));
            let x = i32::try_from(n).unwrap_or(i32::MAX).saturating_mul(4);
            let station =
                Station::new(id.clone(), CellPos { x, y: 1 }, c.station_reservoir_capacity);
            (id, station)
        })
        .collect();

    let mut herd = Herd::default();
    for kind in &content.animal_kinds {
        for _ in 0..kind.initial_count {
            let uuid = ranch_core::generate_uuid(rng);
            herd.insert(Animal {
                id: AnimalId(format!("animal_{uuid}")),
                kind_id: kind.id.clone(),
                fullness: rng.gen_range(0.0..=1.0),
                growth_per_tick: kind.fullness_growth_per_tick,
                yield_profile: kind.yield_profile.clone(),
                condition: AnimalCondition::Healthy,
            });
        }
    }

    let site = SiteState {
        meta: MetaState {
            tick: 0,
            seed,
            schema_version: SCHEMA_VERSION,
            content_version: content.content_version.clone(),
        },
        config: SiteConfig::from_constants(c),
        stations,
        emptying: Vec::new(),
        counters: Counters::default(),
    };
    (site, herd, WorldEnv::new(c.max_stack_size))
}
