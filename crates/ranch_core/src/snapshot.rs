//! Save and restore of `SiteState`.
//!
//! Stations persist their reservoir, session fields, flags and the absolute
//! `next_auto_empty_tick`. Emptying tasks are not persisted; a station saved
//! mid-drain gets a fresh task on restore.

use thiserror::Error;

use crate::emptying::EmptyingTask;
use crate::session::SessionPhase;
use crate::{GameContent, SiteState, StationId, SCHEMA_VERSION};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("schema version mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: u32, actual: u32 },

    #[error("invalid site config: {0}")]
    InvalidConfig(String),

    #[error("station '{station_id}' is inconsistent: {reason}")]
    InvalidStation { station_id: StationId, reason: String },
}

pub fn save_state(state: &SiteState) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn restore_state(json: &str, content: &GameContent) -> Result<SiteState, SnapshotError> {
    let state: SiteState = serde_json::from_str(json)?;
    restore(state, content)
}

/// Validate a deserialized site and rebuild the transient parts.
pub fn restore(mut state: SiteState, content: &GameContent) -> Result<SiteState, SnapshotError> {
    if state.meta.schema_version != SCHEMA_VERSION {
        return Err(SnapshotError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            actual: state.meta.schema_version,
        });
    }
    if state.meta.content_version != content.content_version {
        tracing::warn!(
            saved = %state.meta.content_version,
            loaded = %content.content_version,
            "restoring site saved with different content version"
        );
    }

    let threshold = state.config.auto_empty_threshold;
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(SnapshotError::InvalidConfig(format!(
            "auto_empty_threshold {threshold} outside 0..=1"
        )));
    }

    for (key, station) in &mut state.stations {
        let invalid = |reason: String| SnapshotError::InvalidStation {
            station_id: key.clone(),
            reason,
        };
        if &station.id != key {
            return Err(invalid(format!("stored under key of station '{}'", station.id)));
        }
        let stored = station.reservoir.stored_total();
        if stored > station.reservoir.capacity {
            return Err(invalid(format!(
                "reservoir holds {stored} over capacity {}",
                station.reservoir.capacity
            )));
        }

        let session = &station.session;
        let fullness = session.starting_fullness;
        if !fullness.is_finite() || !(0.0..=1.0).contains(&fullness) {
            return Err(invalid(format!("starting fullness {fullness} outside 0..=1")));
        }
        if session.is_idle() {
            if session.progress != 0 || session.completed || session.aborted {
                return Err(invalid("idle session carries progress or outcome".to_string()));
            }
        } else if session.progress > session.required {
            return Err(invalid(format!(
                "progress {} beyond required {}",
                session.progress, session.required
            )));
        }

        // A finished or aborted session is ended within the tick it finishes
        // in, so one found here was saved by an interrupted driver.
        if matches!(
            station.session.phase(),
            SessionPhase::Completed | SessionPhase::Aborted
        ) {
            tracing::warn!(station = %station.id, "releasing session saved after its outcome");
            station.release_session();
        }
    }

    state.emptying = state
        .stations
        .values()
        .filter(|station| station.emptying_in_progress)
        .map(|station| EmptyingTask::rearm(station, content.constants.emptying_duration_ticks))
        .collect();

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, milk, TestAnimal};
    use crate::AnimalId;

    fn station_id() -> StationId {
        StationId("station_0001".to_string())
    }

    #[test]
    fn round_trip_preserves_cooldown_and_contents() {
        let content = base_content();
        let mut state = base_state(&content);
        {
            let station = state.stations.get_mut(&station_id()).unwrap();
            station.reservoir.credit(&milk(), 6);
            station.next_auto_empty_tick = 4_321;
            station.empty_requested = true;
            station.start_session(&TestAnimal::new("a", 0.5), &content.constants);
            station.session.progress = 17;
        }
        state.meta.tick = 4_000;

        let json = save_state(&state).unwrap();
        let restored = restore_state(&json, &content).unwrap();
        let station = &restored.stations[&station_id()];
        assert_eq!(station.next_auto_empty_tick, 4_321);
        assert_eq!(station.reservoir.stored(&milk()), 6);
        assert!(station.empty_requested);
        assert_eq!(station.session.phase(), SessionPhase::Active);
        assert_eq!(station.session.progress, 17);
        assert!(restored.emptying.is_empty());
    }

    #[test]
    fn emptying_in_progress_is_rearmed() {
        let content = base_content();
        let mut state = base_state(&content);
        {
            let station = state.stations.get_mut(&station_id()).unwrap();
            station.reservoir.credit(&milk(), 9);
            station.begin_emptying();
        }
        let json = save_state(&state).unwrap();
        assert!(!json.contains("elapsed_ticks"), "tasks are not persisted");

        let restored = restore_state(&json, &content).unwrap();
        assert_eq!(restored.emptying.len(), 1);
        let task = &restored.emptying[0];
        assert_eq!(task.station_id, station_id());
        assert_eq!(task.elapsed_ticks, 0);
        assert_eq!(task.duration_ticks, content.constants.emptying_duration_ticks);
        assert!(restored.stations[&station_id()].emptying_in_progress);
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        state.meta.schema_version = SCHEMA_VERSION + 1;
        let err = restore(state, &content).unwrap_err();
        assert!(matches!(err, SnapshotError::SchemaMismatch { .. }));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        state.config.auto_empty_threshold = 1.5;
        assert!(matches!(
            restore(state, &content),
            Err(SnapshotError::InvalidConfig(_))
        ));
    }

    #[test]
    fn overfull_reservoir_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        state
            .stations
            .get_mut(&station_id())
            .unwrap()
            .reservoir
            .contents
            .insert(milk(), 11);
        assert!(matches!(
            restore(state, &content),
            Err(SnapshotError::InvalidStation { .. })
        ));
    }

    #[test]
    fn idle_session_with_progress_is_rejected() {
        let content = base_content();
        let mut state = base_state(&content);
        state.stations.get_mut(&station_id()).unwrap().session.progress = 5;
        let err = restore(state, &content).unwrap_err();
        assert!(err.to_string().contains("station_0001"));
    }

    #[test]
    fn finished_session_is_released_on_restore() {
        let content = base_content();
        let mut state = base_state(&content);
        {
            let session = &mut state.stations.get_mut(&station_id()).unwrap().session;
            session.occupant = Some(AnimalId("a".to_string()));
            session.required = 600;
            session.progress = 600;
            session.starting_fullness = 0.5;
            session.completed = true;
        }
        let restored = restore(state, &content).unwrap();
        assert!(restored.stations[&station_id()].session.is_idle());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = restore_state("{not json", &base_content()).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }
}
