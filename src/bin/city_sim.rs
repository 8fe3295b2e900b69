//! Headless City Runner
//!
//! Loads archetype content and a scenario, runs a number of turns and prints
//! a per-turn summary or the final building views as JSON.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use lifeon_sim::city::catalog::ArchetypeCatalog;
use lifeon_sim::core::config::SimulationConfig;
use lifeon_sim::core::types::AuraCategory;
use lifeon_sim::simulation::{BuildingView, Scenario, TurnReport};

const DEFAULT_SCENARIO: &str = include_str!("../../data/scenario.toml");

/// Headless City Runner - run a scenario for N turns
#[derive(Parser, Debug)]
#[command(name = "city_sim")]
#[command(about = "Run a city scenario headlessly and report building state")]
struct Args {
    /// Archetype content: a TOML file or a directory of them (bundled content if omitted)
    #[arg(long)]
    content: Option<PathBuf>,

    /// Scenario TOML file (bundled starter town if omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Config TOML file with a [simulation] table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of turns to run
    #[arg(long, default_value_t = 10)]
    turns: u32,

    /// Print the final state as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    /// Log rule failures and level-ups
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult {
    turns: u64,
    network_total: u64,
    level_ups: usize,
    rule_failures: usize,
    buildings: Vec<BuildingView>,
    security_cells: usize,
    beauty_cells: usize,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match &args.content {
        Some(path) if path.is_dir() => ArchetypeCatalog::load_directory(path)?,
        Some(path) => ArchetypeCatalog::load_from_toml(path)?,
        None => ArchetypeCatalog::builtin()?,
    };
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::parse_toml(DEFAULT_SCENARIO)?,
    };

    tracing::info!(
        archetypes = catalog.len(),
        placements = scenario.placements.len(),
        "content loaded"
    );
    let mut sim = scenario.build(catalog, config)?;

    let mut level_ups = 0;
    let mut rule_failures = 0;
    for _ in 0..args.turns {
        let report = sim.advance_turn();
        level_ups += report.level_up_count();
        rule_failures += report.failure_count();
        if !args.json {
            print_turn(&report, sim.city().network().total_quantity());
        }
    }

    let city = sim.city();
    if args.json {
        let result = RunResult {
            turns: sim.current_turn(),
            network_total: city.network().total_quantity(),
            level_ups,
            rule_failures,
            buildings: city.views(),
            security_cells: city.environment().covered_cells(AuraCategory::Security),
            beauty_cells: city.environment().covered_cells(AuraCategory::Beauty),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("=== Final state after turn {} ===", sim.current_turn());
        for view in city.views() {
            let storage = view
                .storage
                .as_ref()
                .map(|s| format!(" storage {}/{}", s.total, s.capacity))
                .unwrap_or_default();
            println!(
                "  {} {:<15} L{} pop {}/{} workers {}/{} exp {}{}",
                view.id,
                view.archetype,
                view.level,
                view.population,
                view.max_population,
                view.workers,
                view.max_jobs,
                view.experience,
                storage
            );
        }
    }

    Ok(())
}

fn print_turn(report: &TurnReport, network_total: u64) {
    let evaluated: u32 = report.phases.iter().map(|p| p.rules_evaluated).sum();
    println!(
        "Turn {:>3}: {} rule(s) evaluated, {} failed, {} level-up(s), network stock {}",
        report.turn,
        evaluated,
        report.failure_count(),
        report.level_up_count(),
        network_total
    );
    for phase in &report.phases {
        for up in &phase.level_ups {
            println!("    {} leveled up {} -> {} ({})", up.building, up.from, up.to, phase.phase);
        }
        for done in &phase.constructions_completed {
            println!("    {} finished construction", done);
        }
    }
}
