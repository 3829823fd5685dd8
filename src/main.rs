// Command-line entry point for uhg_miner.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use uhg_miner::application::{inspect, BatchRunner};
use uhg_miner::common::EngineConfig;
use uhg_miner::infrastructure::AppLayout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and reduce behaviors for every app directory under ROOT
    Run(RunArgs),
    /// Print reduced behaviors of one app
    Inspect {
        app_dir: PathBuf,
        /// Behavior to show in detail; lists all when omitted
        #[arg(short, long)]
        index: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    root: PathBuf,

    /// TOML config file; CLI flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rebuild uhg_full.json even if it exists
    #[arg(short = 'b', long)]
    rewrite_behavior: bool,

    /// Keep uhg_full.json after reduction
    #[arg(short = 's', long)]
    save_behavior: bool,

    /// Reduce again even if uhg.json exists
    #[arg(short = 'r', long)]
    rewrite_reduce: bool,

    /// Hops allowed past the first API call (-1 = unlimited)
    #[arg(long, allow_negative_numbers = true)]
    hop: Option<i32>,

    /// Worker threads (default: half the cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Follow `find` edges
    #[arg(long)]
    find_edge: bool,

    /// Remove dead-leaf call chains
    #[arg(long)]
    remove_leaf: bool,

    /// Keep only behaviors matching the interest keywords
    #[arg(long)]
    filter: bool,

    /// Expand mundane nodes too
    #[arg(long)]
    no_noise_filter: bool,

    /// Directory with the keyword list files
    #[arg(long)]
    lists: Option<PathBuf>,
}

impl RunArgs {
    fn resolve_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_toml_file(path)
                .with_context(|| format!("cannot load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        config.rewrite_behavior |= self.rewrite_behavior;
        config.save_behavior |= self.save_behavior;
        config.rewrite_reduce |= self.rewrite_reduce;
        config.track_find_edges |= self.find_edge;
        config.remove_leaf |= self.remove_leaf;
        config.use_filter |= self.filter;
        if self.no_noise_filter {
            config.noise_filter = false;
        }
        if let Some(hop) = self.hop {
            config.native_hop = hop;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(lists) = &self.lists {
            config.lists_dir = lists.clone();
        }
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "uhg_miner=debug" } else { "uhg_miner=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &RunArgs) -> Result<ExitCode> {
    let config = args.resolve_config()?;
    let summary = BatchRunner::new(config)?.run(&args.root)?;

    for failure in &summary.failed {
        warn!(app = %failure.app, "failed: {}", failure.message);
    }
    println!(
        "{} apps: {} processed, {} skipped, {} failed in {:.1}s",
        summary.total(),
        summary.processed.len(),
        summary.skipped.len(),
        summary.failed.len(),
        summary.elapsed.as_secs_f64()
    );
    Ok(if summary.all_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Inspect { app_dir, index } => {
            inspect(&AppLayout::new(app_dir), *index).map(|text| {
                print!("{text}");
                ExitCode::SUCCESS
            })
        }
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
