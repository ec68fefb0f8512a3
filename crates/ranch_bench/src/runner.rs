use crate::run_result::{self, RunResult, SummaryMetrics};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ranch_control::{AutopilotController, CommandSource};
use ranch_core::{AnimalId, Event, EventEnvelope, GameContent, MetricsSnapshot};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// How a single seed is run. Shared by every seed of a scenario.
pub struct SeedPlan<'a> {
    pub ticks: u64,
    pub metrics_every: u64,
    pub handlers: usize,
    pub scenario_name: &'a str,
    pub scenario_params: &'a serde_json::Value,
}

pub struct SeedResult {
    pub seed: u64,
    pub final_snapshot: MetricsSnapshot,
    pub wall_time_ms: u64,
    pub run_id: String,
    pub first_completion_tick: Option<u64>,
    pub first_drain_tick: Option<u64>,
}

/// First tick at which the site hit each milestone.
#[derive(Default)]
struct Milestones {
    first_completion_tick: Option<u64>,
    first_drain_tick: Option<u64>,
}

impl Milestones {
    fn record(&mut self, events: &[EventEnvelope]) {
        for envelope in events {
            match envelope.event {
                Event::SessionCompleted { .. } if self.first_completion_tick.is_none() => {
                    self.first_completion_tick = Some(envelope.tick);
                }
                Event::ReservoirDrained { .. } if self.first_drain_tick.is_none() => {
                    self.first_drain_tick = Some(envelope.tick);
                }
                _ => {}
            }
        }
    }
}

fn write_run_info(dir: &Path, seed: u64, content: &GameContent, plan: &SeedPlan) -> Result<()> {
    let info = serde_json::json!({
        "run_id": format!("seed_{seed}"),
        "seed": seed,
        "content_version": content.content_version,
        "metrics_every": plan.metrics_every,
        "runner": "ranch_bench",
        "args": {
            "ticks": plan.ticks,
            "handlers": plan.handlers,
        }
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn run_seed(
    content: &GameContent,
    seed: u64,
    plan: &SeedPlan,
    seed_dir: &Path,
) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (mut state, mut herd, mut env) =
        ranch_world::build_initial_state(content, seed, &mut rng);
    let mut autopilot = AutopilotController::new(plan.handlers);
    let mut next_command_id = 0u64;
    let mut milestones = Milestones::default();

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;
    write_run_info(seed_dir, seed, content, plan)?;

    let mut metrics_writer = ranch_core::MetricsFileWriter::new(seed_dir.to_path_buf())
        .with_context(|| format!("opening metrics CSV in {}", seed_dir.display()))?;

    for _ in 0..plan.ticks {
        let commands =
            autopilot.generate_commands(&state, &herd, &env, content, &mut next_command_id);
        state.counters.next_command_id = next_command_id;
        let events =
            ranch_core::tick(&mut state, &commands, &mut herd, &mut env, content, &mut rng);

        milestones.record(&events);

        let in_session: HashSet<AnimalId> = state
            .stations
            .values()
            .filter_map(|s| s.session.occupant.clone())
            .collect();
        herd.grow(&in_session);

        if state.meta.tick % plan.metrics_every == 0 {
            let snapshot = ranch_core::compute_metrics(&state);
            metrics_writer
                .write_row(&snapshot)
                .context("writing metrics row")?;
        }
    }

    // Always capture final snapshot
    let final_snapshot = ranch_core::compute_metrics(&state);
    if state.meta.tick % plan.metrics_every != 0 {
        metrics_writer
            .write_row(&final_snapshot)
            .context("writing final metrics row")?;
    }
    metrics_writer.flush().context("flushing metrics")?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    let sim_ticks_per_second = if wall_time_ms > 0 {
        (plan.ticks as f64) / (wall_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    let (backlog_occurred, backlog_reason) = run_result::detect_backlog(&final_snapshot);
    if backlog_occurred {
        tracing::warn!(seed, tick = final_snapshot.tick, "site ended backlogged");
    }

    let run_result = RunResult {
        run_schema_version: 1,
        run_status: "completed".to_string(),
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: plan.scenario_name.to_string(),
        scenario_params: plan.scenario_params.clone(),
        tick_start: 0,
        tick_end: final_snapshot.tick,
        total_ticks: plan.ticks,
        wall_time_ms,
        sim_ticks_per_second,
        summary_metrics: Some(SummaryMetrics::from_snapshot(&final_snapshot)),
        first_completion_tick: milestones.first_completion_tick,
        first_drain_tick: milestones.first_drain_tick,
        backlog_occurred,
        backlog_reason,
        metrics_path: "metrics_000.csv".to_string(),
        error_message: None,
    };

    run_result
        .write_atomic(&seed_dir.join("run_result.json"))
        .context("writing run_result.json")?;

    Ok(SeedResult {
        seed,
        final_snapshot,
        wall_time_ms,
        run_id,
        first_completion_tick: milestones.first_completion_tick,
        first_drain_tick: milestones.first_drain_tick,
    })
}
