//! Save games: the site together with the herd and environment it runs
//! against, in one JSON document.

use std::path::Path;

use anyhow::{Context, Result};
use ranch_core::{GameContent, SiteState};
use serde::{Deserialize, Serialize};

use crate::{Herd, WorldEnv};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub site: SiteState,
    pub herd: Herd,
    pub env: WorldEnv,
}

pub fn save_game(path: &Path, game: &SaveGame) -> Result<()> {
    let json = serde_json::to_string_pretty(game).context("serializing save game")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), tick = game.site.meta.tick, "game saved");
    Ok(())
}

/// Load and validate a save. In-flight emptying work is re-armed.
pub fn load_game(path: &Path, content: &GameContent) -> Result<SaveGame> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let game: SaveGame = serde_json::from_str(&json).context("parsing save game")?;
    let site = ranch_core::restore(game.site, content).context("restoring site state")?;

    for station in site.stations.values() {
        if let Some(occupant) = &station.session.occupant {
            if !game.herd.animals.contains_key(occupant) {
                tracing::warn!(
                    station = %station.id,
                    animal = %occupant,
                    "saved occupant missing from herd; session will be aborted"
                );
            }
        }
    }

    Ok(SaveGame {
        site,
        herd: game.herd,
        env: game.env,
    })
}
