// src/bin/liftsim.rs
//
// Command-line front end:
//   liftsim generate --users 5000 --seed 1 --out simulated_users.csv
//   liftsim run --input simulated_users.csv --out simulation_results.csv --alpha 1.5
//   liftsim run --input simulated_users.csv --replications 20 --seed 100
//
// Logging goes through tracing; set RUST_LOG=liftsim=debug for per-user decisions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use liftsim::io::{read_users, write_results, write_users};
use liftsim::{
    generate_users, ArmCatalog, InverseMode, Lift, Simulation, SimulationConfig, SyntheticConfig,
};

#[derive(Debug, Parser)]
#[command(name = "liftsim", version, about = "LinUCB promotion bandit vs static baseline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a synthetic user table with hidden preferences.
    Generate {
        #[arg(long, default_value_t = 5000)]
        users: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = "simulated_users.csv")]
        out: PathBuf,
    },
    /// Simulate baseline and bandit over a user table.
    Run {
        #[arg(long, default_value = "simulated_users.csv")]
        input: PathBuf,
        #[arg(long, default_value = "simulation_results.csv")]
        out: PathBuf,
        /// JSON file with `SimulationConfig` fields; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        alpha: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Catalog key of the baseline arm.
        #[arg(long)]
        baseline: Option<String>,
        /// Use the Sherman-Morrison inverse cache instead of exact inversion.
        #[arg(long)]
        sherman_morrison: bool,
        /// Run N independent seeds (seed, seed+1, ...) and print one line per run.
        #[arg(long)]
        replications: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let catalog = ArmCatalog::promotions();

    match cli.command {
        Command::Generate { users, seed, out } => {
            let cfg = SyntheticConfig {
                n_users: users,
                seed,
            };
            let users = generate_users(cfg)?;
            let schema = SimulationConfig::default().features;
            write_users(&out, &users, &schema, &catalog)
                .with_context(|| format!("writing {}", out.display()))?;
            info!(users = users.len(), path = %out.display(), "user table written");
        }
        Command::Run {
            input,
            out,
            config,
            alpha,
            seed,
            baseline,
            sherman_morrison,
            replications,
        } => {
            let mut cfg = match &config {
                Some(path) => SimulationConfig::from_json_file(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => SimulationConfig::default(),
            };
            if let Some(a) = alpha {
                cfg.alpha = a;
            }
            if let Some(s) = seed {
                cfg.seed = s;
            }
            if let Some(b) = baseline {
                cfg.baseline_arm = b;
            }
            if sherman_morrison {
                cfg.inverse = InverseMode::ShermanMorrison;
            }

            let users = read_users(&input, &cfg.features, &catalog)
                .with_context(|| format!("reading {}", input.display()))?;
            let base_seed = cfg.seed;
            let sim = Simulation::new(cfg, catalog)?;

            if let Some(n) = replications {
                let reports = sim.run_replications(&users, n, base_seed)?;
                for (i, rep) in reports.iter().enumerate() {
                    println!(
                        "seed={:<6} control={:.4} bandit={:.4} lift={}",
                        base_seed.wrapping_add(i as u64),
                        rep.baseline_rate,
                        rep.bandit_rate,
                        rep.lift
                    );
                }
                let defined: Vec<f64> = reports.iter().filter_map(|r| r.lift.value()).collect();
                let mean_lift = if defined.is_empty() {
                    Lift::Undefined
                } else {
                    Lift::Defined(defined.iter().sum::<f64>() / defined.len() as f64)
                };
                println!(
                    "\n{} replications, mean lift over {} defined: {}",
                    reports.len(),
                    defined.len(),
                    mean_lift
                );
                return Ok(());
            }

            let run = sim.run_seeded(&users)?;
            let table = run.table(sim.catalog());
            write_results(&out, &table).with_context(|| format!("writing {}", out.display()))?;
            info!(rows = table.rows.len(), path = %out.display(), "results written");

            println!("\n--- Simulation Complete ---");
            println!("{}", run.report(sim.catalog()));
        }
    }
    Ok(())
}
