use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use serde_toon::to_string_pretty;
use stacker::{
    Agent, AgentConfig, EpisodeReport, Game, Grid, GridSpec, KnowledgeSnapshot, Observation,
    RunRecord, append_run, load_runs, reset_runs, run_episode_with, save_snapshot,
    save_snapshot_turn, snapshot_dir,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod world;

use world::{WorldCommand, run_world};

#[derive(Parser)]
#[command(
    name = "stacker",
    version,
    about = "Autonomous block-stacking agent for the staircase grid puzzle",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one episode against a generated or loaded grid
    Run {
        /// Layout file to load instead of generating a grid
        #[arg(long, value_name = "FILE")]
        map: Option<PathBuf>,
        /// Gold level for --map layouts, or for generated grids
        #[arg(long)]
        gold_level: Option<u32>,
        /// Seed for grid generation and the agent's tie-breaks
        #[arg(long)]
        seed: Option<u64>,
        /// Generated grid width
        #[arg(long, default_value_t = stacker::world::DEFAULT_WIDTH)]
        width: usize,
        /// Generated grid height
        #[arg(long, default_value_t = stacker::world::DEFAULT_HEIGHT)]
        height: usize,
        /// Single-block stacks to scatter on generated grids
        #[arg(long, default_value_t = stacker::world::DEFAULT_BLOCKS)]
        blocks: usize,
        /// Override the agent's turn ceiling
        #[arg(long)]
        max_turns: Option<u64>,
        /// Agent config file (defaults to ./stacker.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Write a knowledge snapshot every N turns
        #[arg(long, value_name = "N")]
        snapshot_every: Option<u64>,
        /// Print the report as TOON instead of plain text
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        toon: bool,
        /// Skip appending the run to .stacker/runs.json
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        no_record: bool,
    },
    /// Serve an external harness: one JSON observation per stdin line, one action per stdout line
    Play {
        /// Agent config file (defaults to ./stacker.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Seed for the agent's tie-breaks
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Grid layouts: generate and inspect
    World {
        #[command(subcommand)]
        command: WorldCommand,
    },
    /// Summarize recorded runs
    Stats {
        /// Clear recorded runs
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        reset: bool,
    },
}

struct RunOptions {
    map: Option<PathBuf>,
    gold_level: Option<u32>,
    seed: Option<u64>,
    width: usize,
    height: usize,
    blocks: usize,
    max_turns: Option<u64>,
    config: Option<PathBuf>,
    snapshot_every: Option<u64>,
    toon: bool,
    record: bool,
}

pub fn run() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Run {
            map,
            gold_level,
            seed,
            width,
            height,
            blocks,
            max_turns,
            config,
            snapshot_every,
            toon,
            no_record,
        } => run_run(RunOptions {
            map,
            gold_level,
            seed,
            width,
            height,
            blocks,
            max_turns,
            config,
            snapshot_every,
            toon,
            record: !no_record,
        }),
        Command::Play { config, seed } => run_play(config.as_deref(), seed),
        Command::World { command } => run_world(command),
        Command::Stats { reset } => run_stats(reset),
    }
}

/// Config file values, with CLI flags layered on top.
fn load_config(
    path: Option<&Path>,
    seed: Option<u64>,
    max_turns: Option<u64>,
) -> Result<AgentConfig, String> {
    let mut config = AgentConfig::load(path).map_err(|e| e.to_string())?;
    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(max) = max_turns {
        config.max_turns = max;
    }
    Ok(config)
}

fn run_run(opts: RunOptions) -> Result<(), String> {
    let config = load_config(opts.config.as_deref(), opts.seed, opts.max_turns)?;

    let (grid, source) = match &opts.map {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("could not read {}: {}", path.display(), e))?;
            let gold_level = opts
                .gold_level
                .ok_or_else(|| "--gold-level is required with --map".to_string())?;
            let grid = Grid::parse(&text, gold_level).map_err(|e| e.to_string())?;
            (grid, path.display().to_string())
        }
        None => {
            let spec = GridSpec {
                width: opts.width,
                height: opts.height,
                gold_level: opts.gold_level.unwrap_or(stacker::world::DEFAULT_GOLD_LEVEL),
                blocks: opts.blocks,
                seed: config.seed,
                ..GridSpec::default()
            };
            (spec.generate().map_err(|e| e.to_string())?, "generated".to_string())
        }
    };

    println!("Grid ({}x{}, gold level {}):", grid.width(), grid.height(), grid.gold_level());
    print!("{}", grid);

    let gold_level = grid.gold_level();
    let max_turns = config.max_turns;
    let seed = config.seed;
    let mut agent = Agent::new(config);
    let mut game = Game::new(grid);
    let dir = snapshot_dir();

    let report = run_episode_with(&mut game, &mut agent, max_turns.saturating_add(1), |_, agent, result| {
        let Some(every) = opts.snapshot_every.filter(|n| *n > 0) else {
            return;
        };
        if result.turn % every == 0 {
            let snapshot = KnowledgeSnapshot::capture(agent);
            if let Err(err) = save_snapshot_turn(&dir, &snapshot) {
                warn!(%err, "failed to write turn snapshot");
            }
        }
    });

    if let Err(err) = save_snapshot(&dir, &KnowledgeSnapshot::capture(&agent)) {
        warn!(%err, "failed to write knowledge snapshot");
    }

    println!();
    println!("Final grid:");
    print!("{}", game.grid().render(game.position()));
    print_report(&report, opts.toon);

    if opts.record {
        let record = RunRecord {
            recorded_at: Utc::now(),
            source,
            seed,
            gold_level,
            outcome: report.outcome,
            turns: report.turns,
            rejections: report.rejections,
            stats: report.stats.clone(),
        };
        if let Err(err) = append_run(record) {
            warn!(%err, "failed to record run");
        }
    }
    Ok(())
}

fn print_report(report: &EpisodeReport, toon: bool) {
    if toon {
        let payload = json!({
            "outcome": report.outcome,
            "turns": report.turns,
            "rejections": report.rejections,
            "final_state": report.final_state,
            "staircase_steps": report.staircase_steps,
            "known_tiles": report.known_tiles,
            "actions": report.stats,
        });
        let rendered = to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        println!("{}", rendered);
        return;
    }

    println!(
        "Outcome: {} after {} turns (state: {}, rejected actions: {})",
        report.outcome, report.turns, report.final_state, report.rejections
    );
    println!(
        "Actions: moves={} pickups={} drops={} idle={}",
        report.stats.move_count,
        report.stats.pickup_count,
        report.stats.drop_count,
        report.stats.idle_count
    );
    println!(
        "Knowledge: {} tiles known, {} staircase steps",
        report.known_tiles, report.staircase_steps
    );
}

fn run_play(config_path: Option<&Path>, seed: Option<u64>) -> Result<(), String> {
    let config = load_config(config_path, seed, None)?;
    let mut agent = Agent::new(config);
    info!("waiting for observations on stdin");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let obs: Observation =
            serde_json::from_str(line).map_err(|e| format!("bad observation: {}", e))?;
        let action = agent.turn(&obs);
        writeln!(stdout, "{}", action).map_err(|e| e.to_string())?;
        stdout.flush().map_err(|e| e.to_string())?;
    }

    info!(turns = agent.turns(), state = %agent.state(), "input closed");
    Ok(())
}

fn run_stats(reset: bool) -> Result<(), String> {
    if reset {
        reset_runs().map_err(|e| e.to_string())?;
        println!("Run history cleared.");
        return Ok(());
    }

    let store = load_runs().map_err(|e| e.to_string())?;
    if store.runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    println!("Runs:");
    for run in &store.runs {
        println!(
            "  {} {:<10} gold={} turns={} moves={} pickups={} drops={} rejected={} ({})",
            run.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            run.outcome.to_string(),
            run.gold_level,
            run.turns,
            run.stats.move_count,
            run.stats.pickup_count,
            run.stats.drop_count,
            run.rejections,
            run.source,
        );
    }
    let mean = store
        .mean_solved_turns()
        .map(|m| format!("{:.1}", m))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "Solved {}/{} runs, mean turns when solved: {}",
        store.solved(),
        store.runs.len(),
        mean
    );
    Ok(())
}
