use crate::run_result::{detect_backlog, spill_ratio};
use crate::runner::SeedResult;
use anyhow::{Context, Result};
use ranch_core::MetricsSnapshot;
use serde::Serialize;
use std::path::Path;

type Extractor = (&'static str, Box<dyn Fn(&MetricsSnapshot) -> f64>);

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub backlogged_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

fn extractors() -> Vec<Extractor> {
    vec![
        ("avg_fill_pct", Box::new(|s| f64::from(s.avg_fill_pct))),
        ("max_fill_pct", Box::new(|s| f64::from(s.max_fill_pct))),
        ("stations_full", Box::new(|s| f64::from(s.stations_full))),
        ("total_stored", Box::new(|s| s.total_stored as f64)),
        (
            "sessions_completed",
            Box::new(|s| s.sessions_completed as f64),
        ),
        ("sessions_aborted", Box::new(|s| s.sessions_aborted as f64)),
        ("units_produced", Box::new(|s| s.units_produced as f64)),
        ("units_spilled", Box::new(|s| s.units_spilled as f64)),
        ("units_drained", Box::new(|s| s.units_drained as f64)),
        ("drains_completed", Box::new(|s| s.drains_completed as f64)),
        ("spill_ratio", Box::new(spill_ratio)),
    ]
}

pub fn compute_summary(snapshots: &[(u64, &MetricsSnapshot)]) -> SummaryStats {
    let backlogged_count = snapshots
        .iter()
        .filter(|(_, s)| detect_backlog(s).0)
        .count();

    let metrics = extractors()
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = snapshots.iter().map(|(_, s)| extract(s)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count: snapshots.len(),
        backlogged_count,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev: variance.sqrt(),
    }
}

/// Keyed form of the summary for `batch_summary.json`:
/// `{ "key": { "mean": ..., "min": ..., "max": ..., "stddev": ... }, ... }`
pub fn build_aggregated_metrics(stats: &SummaryStats) -> serde_json::Value {
    let map = stats
        .metrics
        .iter()
        .map(|m| {
            (
                m.name.clone(),
                serde_json::json!({
                    "mean": m.mean,
                    "min": m.min,
                    "max": m.max,
                    "stddev": m.stddev,
                }),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

pub fn print_summary(scenario_name: &str, ticks: u64, stats: &SummaryStats) {
    println!();
    println!(
        "=== {scenario_name}: {} seeds × {ticks} ticks ===",
        stats.seed_count
    );
    println!(
        "{:<22} {:>12} {:>12} {:>12} {:>12}",
        "metric", "mean", "min", "max", "stddev"
    );
    for m in &stats.metrics {
        println!(
            "{:<22} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            m.name, m.mean, m.min, m.max, m.stddev
        );
    }
    if stats.backlogged_count > 0 {
        println!(
            "\n{} of {} seeds ended backlogged",
            stats.backlogged_count, stats.seed_count
        );
    }
}

#[derive(Debug, Serialize)]
struct SeedRow<'a> {
    seed: u64,
    run_id: &'a str,
    wall_time_ms: u64,
    first_completion_tick: Option<u64>,
    first_drain_tick: Option<u64>,
    sessions_completed: u64,
    sessions_aborted: u64,
    units_produced: u64,
    units_spilled: u64,
    units_drained: u64,
    spill_ratio: f64,
    backlogged: bool,
}

/// One row per seed, in seed order.
pub fn write_seeds_csv(path: &Path, results: &[SeedResult]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let mut sorted: Vec<&SeedResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.seed);
    for result in sorted {
        let s = &result.final_snapshot;
        writer
            .serialize(SeedRow {
                seed: result.seed,
                run_id: &result.run_id,
                wall_time_ms: result.wall_time_ms,
                first_completion_tick: result.first_completion_tick,
                first_drain_tick: result.first_drain_tick,
                sessions_completed: s.sessions_completed,
                sessions_aborted: s.sessions_aborted,
                units_produced: s.units_produced,
                units_spilled: s.units_spilled,
                units_drained: s.units_drained,
                spill_ratio: spill_ratio(s),
                backlogged: detect_backlog(s).0,
            })
            .context("writing seed row")?;
    }
    writer.flush().context("flushing seeds.csv")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_result::sample_snapshot;

    fn snapshot(avg_fill: f32, produced: u64, stations_full: u32) -> MetricsSnapshot {
        let mut s = sample_snapshot();
        s.avg_fill_pct = avg_fill;
        s.units_produced = produced;
        s.stations_full = stations_full;
        s
    }

    #[test]
    fn test_summary_basic_stats() {
        let s1 = snapshot(0.5, 100, 0);
        let s2 = snapshot(0.7, 300, 0);
        let stats = compute_summary(&[(1, &s1), (2, &s2)]);

        assert_eq!(stats.seed_count, 2);
        assert_eq!(stats.backlogged_count, 0);

        let fill = &stats.metrics[0];
        assert_eq!(fill.name, "avg_fill_pct");
        assert!((fill.mean - 0.6).abs() < 1e-5);
        assert!((fill.min - 0.5).abs() < 1e-5);
        assert!((fill.max - 0.7).abs() < 1e-5);

        let produced = stats
            .metrics
            .iter()
            .find(|m| m.name == "units_produced")
            .unwrap();
        assert!((produced.mean - 200.0).abs() < 1e-9);
        assert!((produced.stddev - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_backlog_counted() {
        let backlogged = snapshot(1.0, 100, 2);
        let healthy = snapshot(0.5, 100, 0);
        let stats = compute_summary(&[(1, &backlogged), (2, &healthy)]);
        assert_eq!(stats.backlogged_count, 1);
    }

    #[test]
    fn test_stddev_zero_for_identical() {
        let s1 = snapshot(0.5, 100, 1);
        let s2 = snapshot(0.5, 100, 1);
        let stats = compute_summary(&[(1, &s1), (2, &s2)]);
        for metric in &stats.metrics {
            assert!(
                metric.stddev.abs() < 1e-10,
                "stddev for {} should be 0, got {}",
                metric.name,
                metric.stddev
            );
        }
    }

    #[test]
    fn test_aggregated_metrics_keyed_by_name() {
        let s1 = snapshot(0.5, 100, 0);
        let s2 = snapshot(0.7, 300, 0);
        let stats = compute_summary(&[(1, &s1), (2, &s2)]);
        let agg = build_aggregated_metrics(&stats);

        let obj = agg.as_object().unwrap();
        assert_eq!(obj.len(), stats.metrics.len());
        let produced = &agg["units_produced"];
        assert!((produced["mean"].as_f64().unwrap() - 200.0).abs() < 1e-9);
        assert!((produced["min"].as_f64().unwrap() - 100.0).abs() < 1e-9);
        assert!((produced["max"].as_f64().unwrap() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeds_csv_sorted_by_seed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seeds.csv");
        let results: Vec<SeedResult> = [9_u64, 3]
            .into_iter()
            .map(|seed| SeedResult {
                seed,
                final_snapshot: sample_snapshot(),
                wall_time_ms: 10,
                run_id: format!("run-{seed}"),
                first_completion_tick: Some(640),
                first_drain_tick: None,
            })
            .collect();

        write_seeds_csv(&path, &results).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("seed,run_id,"));
        assert!(lines[1].starts_with("3,run-3,10,640,,"));
        assert!(lines[2].starts_with("9,run-9,"));
    }
}
