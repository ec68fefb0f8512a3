//! Snapshot metrics computed from `SiteState`.
//!
//! `compute_metrics(&SiteState) -> MetricsSnapshot` samples the current state
//! for time-series analysis. No state mutation; IO only through the CSV
//! writers below.

use crate::SiteState;
use serde::Serialize;
use std::io::Write;

/// Current schema version. Bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub metrics_version: u32,

    // Stations
    pub station_count: u32,
    pub stations_occupied: u32,
    pub stations_full: u32,
    pub stations_empty_requested: u32,
    pub stations_emptying: u32,

    // Reservoirs
    pub total_stored: u64,
    pub total_capacity: u64,
    pub avg_fill_pct: f32,
    pub max_fill_pct: f32,

    // Cumulative counters
    pub sessions_completed: u64,
    pub sessions_aborted: u64,
    pub sessions_cancelled: u64,
    pub units_produced: u64,
    pub units_spilled: u64,
    pub units_drained: u64,
    pub drains_completed: u64,
}

#[allow(clippy::cast_possible_truncation)]
pub fn compute_metrics(state: &SiteState) -> MetricsSnapshot {
    let mut stations_occupied = 0_u32;
    let mut stations_full = 0_u32;
    let mut stations_empty_requested = 0_u32;
    let mut stations_emptying = 0_u32;
    let mut total_stored = 0_u64;
    let mut total_capacity = 0_u64;
    let mut fill_sum = 0.0_f32;
    let mut max_fill = 0.0_f32;

    for station in state.stations.values() {
        if !station.session.is_idle() {
            stations_occupied += 1;
        }
        if station.reservoir.is_full() {
            stations_full += 1;
        }
        if station.empty_requested {
            stations_empty_requested += 1;
        }
        if station.emptying_in_progress {
            stations_emptying += 1;
        }
        total_stored += station.reservoir.stored_total();
        total_capacity += station.reservoir.capacity;

        let fill = station.reservoir.fill_fraction();
        fill_sum += fill;
        max_fill = max_fill.max(fill);
    }

    let station_count = state.stations.len() as u32;
    let avg_fill_pct = if station_count > 0 {
        fill_sum / station_count as f32
    } else {
        0.0
    };

    let counters = &state.counters;
    MetricsSnapshot {
        tick: state.meta.tick,
        metrics_version: METRICS_VERSION,
        station_count,
        stations_occupied,
        stations_full,
        stations_empty_requested,
        stations_emptying,
        total_stored,
        total_capacity,
        avg_fill_pct,
        max_fill_pct: max_fill,
        sessions_completed: counters.sessions_completed,
        sessions_aborted: counters.sessions_aborted,
        sessions_cancelled: counters.sessions_cancelled,
        units_produced: counters.units_produced,
        units_spilled: counters.units_spilled,
        units_drained: counters.units_drained,
        drains_completed: counters.drains_completed,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "tick,metrics_version,\
         station_count,stations_occupied,stations_full,stations_empty_requested,stations_emptying,\
         total_stored,total_capacity,avg_fill_pct,max_fill_pct,\
         sessions_completed,sessions_aborted,sessions_cancelled,\
         units_produced,units_spilled,units_drained,drains_completed"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.tick,
        snapshot.metrics_version,
        snapshot.station_count,
        snapshot.stations_occupied,
        snapshot.stations_full,
        snapshot.stations_empty_requested,
        snapshot.stations_emptying,
        snapshot.total_stored,
        snapshot.total_capacity,
        snapshot.avg_fill_pct,
        snapshot.max_fill_pct,
        snapshot.sessions_completed,
        snapshot.sessions_aborted,
        snapshot.sessions_cancelled,
        snapshot.units_produced,
        snapshot.units_spilled,
        snapshot.units_drained,
        snapshot.drains_completed,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}
