use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ranch_control::{AutopilotController, CommandSource};
use ranch_core::{AnimalId, Event, SiteState};
use ranch_world::{build_initial_state, load_content, load_game, save_game, SaveGame};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "ranch_cli", about = "Extraction station simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the site for a fixed number of ticks.
    Run {
        #[arg(long)]
        ticks: u64,
        /// Generate a fresh site with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Continue from a save file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<PathBuf>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 2500)]
        print_every: u64,
        /// Sample metrics every N ticks.
        #[arg(long, default_value_t = 250)]
        metrics_every: u64,
        /// Disable automatic metrics collection to runs/ directory.
        #[arg(long)]
        no_metrics: bool,
        /// Workers available for emptying reservoirs.
        #[arg(long, default_value_t = 1)]
        handlers: usize,
        /// Write a save file when the run finishes.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print a station report for every station in a save file.
    Inspect {
        path: PathBuf,
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
}

struct RunArgs {
    ticks: u64,
    seed: Option<u64>,
    state_file: Option<PathBuf>,
    content_dir: String,
    print_every: u64,
    metrics_every: u64,
    no_metrics: bool,
    handlers: usize,
    save: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn generate_run_id(seed: u64) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{timestamp}_seed{seed}")
}

fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_run_info(
    dir: &Path,
    run_id: &str,
    args: &RunArgs,
    seed: u64,
    content_version: &str,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "start_time": run_id.split('_').take(2).collect::<Vec<_>>().join("_"),
        "content_version": content_version,
        "metrics_every": args.metrics_every,
        "runner": "ranch_cli",
        "args": {
            "ticks": args.ticks,
            "print_every": args.print_every,
            "handlers": args.handlers,
        }
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn run(args: &RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;

    let (mut game, mut rng) = if let Some(path) = &args.state_file {
        let game = load_game(path, &content)?;
        let rng = ChaCha8Rng::seed_from_u64(game.site.meta.seed ^ game.site.meta.tick);
        (game, rng)
    } else {
        let resolved_seed = args.seed.unwrap_or_else(rand::random);
        let mut new_rng = ChaCha8Rng::seed_from_u64(resolved_seed);
        let (site, herd, env) = build_initial_state(&content, resolved_seed, &mut new_rng);
        (SaveGame { site, herd, env }, new_rng)
    };

    // Set up per-run metrics directory.
    let mut metrics_writer: Option<ranch_core::MetricsFileWriter> = None;
    if !args.no_metrics {
        let run_id = generate_run_id(game.site.meta.seed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(&run_dir, &run_id, args, game.site.meta.seed, &content.content_version)?;
        let writer = ranch_core::MetricsFileWriter::new(run_dir.clone())
            .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
        metrics_writer = Some(writer);
        println!("Run directory: {}", run_dir.display());
    }

    let mut autopilot = AutopilotController::new(args.handlers);
    let mut next_command_id = game.site.counters.next_command_id;

    println!(
        "Starting simulation: ticks={} seed={} stations={} animals={} content_version={}",
        args.ticks,
        game.site.meta.seed,
        game.site.stations.len(),
        game.herd.animals.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    for _ in 0..args.ticks {
        let commands = autopilot.generate_commands(
            &game.site,
            &game.herd,
            &game.env,
            &content,
            &mut next_command_id,
        );
        game.site.counters.next_command_id = next_command_id;

        let events = ranch_core::tick(
            &mut game.site,
            &commands,
            &mut game.herd,
            &mut game.env,
            &content,
            &mut rng,
        );

        // Print notable events regardless of print_every.
        for envelope in &events {
            match &envelope.event {
                Event::ReservoirDrained {
                    station_id,
                    contents,
                    ..
                } => println!(
                    "*** DRAINED {station_id}: {} units at tick={} ***",
                    contents.values().sum::<u64>(),
                    envelope.tick
                ),
                Event::SessionAborted {
                    station_id,
                    animal_id,
                    reason,
                } => tracing::warn!(%station_id, %animal_id, ?reason, "session aborted"),
                _ => {}
            }
        }

        let in_session: HashSet<AnimalId> = game
            .site
            .stations
            .values()
            .filter_map(|s| s.session.occupant.clone())
            .collect();
        game.herd.grow(&in_session);

        if game.site.meta.tick % args.print_every == 0 {
            print_status(&game.site);
        }

        if let Some(ref mut writer) = metrics_writer {
            if game.site.meta.tick % args.metrics_every == 0 {
                let snapshot = ranch_core::compute_metrics(&game.site);
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", game.site.meta.tick);
    print_status(&game.site);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }
    if let Some(path) = &args.save {
        save_game(path, &game)?;
        println!("Saved to {}", path.display());
    }

    Ok(())
}

fn print_status(site: &SiteState) {
    let tick = site.meta.tick;
    let c = &site.counters;
    let stored: u64 = site
        .stations
        .values()
        .map(|s| s.reservoir.stored_total())
        .sum();
    let occupied = site
        .stations
        .values()
        .filter(|s| !s.session.is_idle())
        .count();

    println!(
        "[tick={tick:06}]  occupied={occupied}/{stations}  stored={stored:4}  \
         completed={completed}  aborted={aborted}  produced={produced}  \
         spilled={spilled}  drained={drained}",
        stations = site.stations.len(),
        completed = c.sessions_completed,
        aborted = c.sessions_aborted,
        produced = c.units_produced,
        spilled = c.units_spilled,
        drained = c.units_drained,
    );
}

fn inspect(path: &Path, content_dir: &str) -> Result<()> {
    let content = load_content(content_dir)?;
    let game = load_game(path, &content)?;
    let tick = game.site.meta.tick;
    let reports: Vec<_> = game
        .site
        .stations
        .values()
        .map(|station| station.report(tick))
        .collect();
    let out = serde_json::json!({
        "tick": tick,
        "config": game.site.config,
        "stations": reports,
        "counters": game.site.counters,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            ticks,
            seed,
            state_file,
            content_dir,
            print_every,
            metrics_every,
            no_metrics,
            handlers,
            save,
        } => run(&RunArgs {
            ticks,
            seed,
            state_file,
            content_dir,
            print_every: print_every.max(1),
            metrics_every: metrics_every.max(1),
            no_metrics,
            handlers,
            save,
        })?,
        Commands::Inspect { path, content_dir } => inspect(&path, &content_dir)?,
    }
    Ok(())
}
