use ranch_core::MetricsSnapshot;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Per-seed result written next to the seed's metrics as `run_result.json`.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub tick_start: u64,
    pub tick_end: u64,
    pub total_ticks: u64,
    pub wall_time_ms: u64,
    pub sim_ticks_per_second: f64,
    pub summary_metrics: Option<SummaryMetrics>,
    pub first_completion_tick: Option<u64>,
    pub first_drain_tick: Option<u64>,
    pub backlog_occurred: bool,
    pub backlog_reason: Option<String>,
    pub metrics_path: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryMetrics {
    pub station_count: u32,
    pub stations_full: u32,
    pub total_stored: u64,
    pub avg_fill_pct: f64,
    pub max_fill_pct: f64,
    pub sessions_completed: u64,
    pub sessions_aborted: u64,
    pub sessions_cancelled: u64,
    pub units_produced: u64,
    pub units_spilled: u64,
    pub units_drained: u64,
    pub drains_completed: u64,
    /// Share of produced units that ended on the floor instead of in a reservoir.
    pub spill_ratio: f64,
}

impl SummaryMetrics {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            station_count: snapshot.station_count,
            stations_full: snapshot.stations_full,
            total_stored: snapshot.total_stored,
            avg_fill_pct: f64::from(snapshot.avg_fill_pct),
            max_fill_pct: f64::from(snapshot.max_fill_pct),
            sessions_completed: snapshot.sessions_completed,
            sessions_aborted: snapshot.sessions_aborted,
            sessions_cancelled: snapshot.sessions_cancelled,
            units_produced: snapshot.units_produced,
            units_spilled: snapshot.units_spilled,
            units_drained: snapshot.units_drained,
            drains_completed: snapshot.drains_completed,
            spill_ratio: spill_ratio(snapshot),
        }
    }
}

pub fn spill_ratio(snapshot: &MetricsSnapshot) -> f64 {
    if snapshot.units_produced == 0 {
        0.0
    } else {
        snapshot.units_spilled as f64 / snapshot.units_produced as f64
    }
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// A site is backlogged when every reservoir is full and none is being
/// emptied: new yields can only spill.
pub fn detect_backlog(snapshot: &MetricsSnapshot) -> (bool, Option<String>) {
    let backlogged = snapshot.station_count > 0
        && snapshot.stations_full == snapshot.station_count
        && snapshot.stations_emptying == 0;
    if backlogged {
        (true, Some("all reservoirs full + no emptying".to_string()))
    } else {
        (false, None)
    }
}

pub fn git_sha() -> String {
    env!("RANCH_GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("RANCH_GIT_DIRTY") == "true"
}

#[cfg(test)]
pub(crate) fn sample_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        tick: 1000,
        metrics_version: 1,
        station_count: 2,
        stations_occupied: 1,
        stations_full: 0,
        stations_empty_requested: 1,
        stations_emptying: 0,
        total_stored: 90,
        total_capacity: 300,
        avg_fill_pct: 0.3,
        max_fill_pct: 0.5,
        sessions_completed: 12,
        sessions_aborted: 1,
        sessions_cancelled: 0,
        units_produced: 200,
        units_spilled: 20,
        units_drained: 90,
        drains_completed: 1,
    }
}
