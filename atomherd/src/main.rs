//! headless runner, see the library docs for what is being simulated

use std::path::PathBuf;

use anyhow::{Context, Result};
use atomherd::config::{SimConfig, TickCadence};
use atomherd::snapshot::AtomView;
use atomherd::{App, Selection, persist};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "deterministic particle life simulation")]
struct Cli {
    /// JSON file with simulation parameters, missing keys use the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Override the tick cadence
    #[arg(long, value_enum)]
    cadence: Option<TickCadence>,

    /// Override the simulation speed multiplier
    #[arg(long)]
    speed: Option<f64>,

    /// Continue from a saved state instead of building a new world
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the state after the last tick
    #[arg(long)]
    save: Option<PathBuf>,

    /// Append csv statistics to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Ticks between two csv rows
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Print one atom as json at the end
    #[arg(long, value_enum)]
    inspect: Option<Selection>,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(cadence) = cli.cadence {
        config.cadence = cadence;
    }
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }

    let mut app = match &cli.load {
        Some(path) => persist::load(path, config)
            .with_context(|| format!("loading state {}", path.display()))?,
        None => App::new(config).context("building the world")?,
    };

    if let Some(path) = &cli.report {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating report {}", path.display()))?;
        app.report_to(file, cli.report_every)?;
    }

    info!(ticks = cli.ticks, cadence = ?app.config().cadence, "running");
    let total = app.run(cli.ticks);
    info!(
        births = total.births,
        deaths = total.deaths,
        meals = total.meals,
        population = total.population,
        "done"
    );
    app.report();

    if let Some(selection) = cli.inspect {
        let picked = selection
            .select(app.population(), [0.; 2])
            .and_then(|h| app.population().get(h));
        match picked {
            Some(atom) => {
                let view = AtomView::new(atom);
                println!("{}", serde_json::to_string_pretty(&view)?);
                println!(
                    "age: {}, health: {:.2}, hunger: {:.2}, energy: {:.2}, mass: {}",
                    atom.age,
                    atom.health,
                    atom.hunger,
                    atom.energy,
                    atom.mass()
                );
            }
            None => println!("nothing to inspect"),
        }
    }

    if let Some(path) = &cli.save {
        persist::save(&app, path).with_context(|| format!("saving state {}", path.display()))?;
    }
    Ok(())
}
