// simulator/src/main.rs
use clap::{Args, Parser, Subcommand};
use simulator::{format_summary, RunSummary, SimulationConfig, Simulator, Snapshot, SnapshotObserver, Termination};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "powsim")]
#[command(about = "Proof-of-Work network simulator", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run(RunArgs),

    /// Write a configuration file with every default
    Init {
        /// Output path
        #[arg(default_value = "./powsim.toml")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    nodes: Option<usize>,

    #[arg(long)]
    neighbors: Option<usize>,

    #[arg(long)]
    miners: Option<usize>,

    /// Hashrate per miner
    #[arg(long)]
    hashrate: Option<f64>,

    /// Target block time in seconds
    #[arg(long)]
    blocktime: Option<f64>,

    /// Initial difficulty
    #[arg(long)]
    difficulty: Option<f64>,

    /// Block reward in coins
    #[arg(long)]
    reward: Option<f64>,

    /// Blocks between halvings, 0 disables
    #[arg(long)]
    halving: Option<u64>,

    /// Maximum transactions per block
    #[arg(long)]
    blocksize: Option<usize>,

    #[arg(long)]
    wallets: Option<usize>,

    /// Transactions per wallet
    #[arg(long)]
    transactions: Option<u64>,

    /// Seconds between a wallet's transactions
    #[arg(long)]
    interval: Option<f64>,

    /// Stop after this many blocks
    #[arg(long)]
    blocks: Option<u64>,

    /// Stop after this many simulated years
    #[arg(long)]
    years: Option<f64>,

    /// Report every this many blocks
    #[arg(long)]
    print: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Write the final summary as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<(SimulationConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                SimulationConfig::from_file(path)?
            }
            None => SimulationConfig::default(),
        };

        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field { config.$field = value; })*
            };
        }
        apply!(nodes, neighbors, miners, hashrate, blocktime, reward, halving, blocksize, wallets, transactions, interval, print, seed);

        if let Some(difficulty) = self.difficulty {
            config.difficulty = Some(difficulty);
        }
        // An explicit block count alone stops on blocks only
        if let Some(blocks) = self.blocks {
            config.blocks = Some(blocks);
            if self.years.is_none() {
                config.years = None;
            }
        }
        if let Some(years) = self.years {
            config.years = Some(years);
        }

        Ok((config, self.output))
    }
}

/// Prints progress lines to stdout
struct ConsoleObserver;

impl SnapshotObserver for ConsoleObserver {
    fn on_block(&mut self, snapshot: &Snapshot) {
        println!("{}", format_summary(snapshot, false));
    }

    fn on_finish(&mut self, snapshot: &Snapshot, termination: Termination) {
        println!("{}", format_summary(snapshot, true));
        println!("Stopped: {}", termination);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the summaries
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                ["simulator", "mining", "tokenomics", "networking", "workload", "sim_core"]
                    .iter()
                    .map(|target| format!("{}={}", target, log_level))
                    .collect::<Vec<_>>()
                    .join(",")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run(args) => {
            let (config, output) = args.into_config()?;
            run_simulation(config, output).await?;
        }
        Commands::Init { path } => {
            init_config(&path)?;
        }
    }

    Ok(())
}

async fn run_simulation(config: SimulationConfig, output: Option<PathBuf>) -> anyhow::Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));

    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received interrupt, stopping after the current block");
            signal.store(true, Ordering::Relaxed);
        }
    });

    let run_config = config.clone();
    let snapshot = tokio::task::spawn_blocking(move || {
        let mut sim = Simulator::new(run_config)?;
        sim.run_until(&cancel, &mut ConsoleObserver)
    })
    .await??;

    if let Some(path) = output {
        let summary = RunSummary {
            termination: snapshot.termination.unwrap_or(Termination::Cancelled),
            config,
            snapshot,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!("Summary written to {}", path.display());
    }

    Ok(())
}

fn init_config(path: &std::path::Path) -> anyhow::Result<()> {
    SimulationConfig::default().to_file(path)?;
    tracing::info!("Default configuration written to {}", path.display());
    Ok(())
}
