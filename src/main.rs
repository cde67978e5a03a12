// -----------------------------------------------------------------------------
// sxload - randomized load generator for a storage cluster, with
// record/replay of the generated operation timeline
// -----------------------------------------------------------------------------

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::runtime::Builder as RtBuilder;

use sxload::config::Session;
use sxload::constants;
use sxload::runner::{self, Mode};
use sxload::validate::{self, RawSettings};

// -----------------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------------
#[derive(Parser)]
#[command(
    name = "sxload",
    version,
    about = "Generate randomized load on a storage cluster, record it, and replay it later with the original timing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Force colored log output (default: only when printing to a terminal)
    #[arg(short = 'c', long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored log output
    #[arg(short = 'C', long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a continuous stream of randomized operations until
    /// interrupted, then save the recorded session
    ///
    /// Examples:
    ///   sxload record sx://admin@cluster.example.com vol1 vol2
    ///   sxload record @admin vol1 -t 16 --min-size 4K --max-size 2M
    Record {
        /// Cluster to generate load on (sx://user@cluster or @user)
        cluster_url: String,

        /// Volumes the operations are scoped to
        #[arg(required = true)]
        volumes: Vec<String>,

        /// Number of worker threads
        #[arg(short = 't', long, default_value_t = constants::DEFAULT_THREADS)]
        threads: usize,

        /// Minimum synthetic file size
        #[arg(long, default_value = constants::DEFAULT_MIN_SIZE)]
        min_size: String,

        /// Maximum synthetic file size
        #[arg(long, default_value = constants::DEFAULT_MAX_SIZE)]
        max_size: String,

        /// Size of the entropy buffer backing uploads [default: 100 * max-size]
        #[arg(long)]
        entropy_size: Option<String>,

        /// Seed for the entropy buffer, up to 12 hex characters [default: random]
        #[arg(long)]
        entropy_seed: Option<String>,
    },
    /// Replay a previously recorded session with its original timing
    ///
    /// Example:
    ///   sxload replay sxload-2026-08-07-12:00:00.yaml
    Replay {
        /// Session file produced by a record run
        session_file: PathBuf,
    },
}

// -----------------------------------------------------------------------------
// main
// -----------------------------------------------------------------------------
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let rt = RtBuilder::new_multi_thread().enable_all().build()?;
    match cli.command {
        Commands::Record {
            cluster_url,
            volumes,
            threads,
            min_size,
            max_size,
            entropy_size,
            entropy_seed,
        } => {
            let raw = RawSettings {
                cluster_url,
                volumes,
                threads,
                min_size,
                max_size,
                entropy_size,
                entropy_seed,
            };
            let config = match validate::build_config(raw) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("sxload: {err}");
                    std::process::exit(2);
                }
            };
            let session = Session::from_cli(config);
            rt.block_on(runner::run_session(session, Mode::Record))
        }
        Commands::Replay { session_file } => {
            let session = Session::load(&session_file)?;
            rt.block_on(runner::run_session(session, Mode::Replay))
        }
    }
}

fn init_logging(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let use_colors = if cli.no_color {
        false
    } else if cli.color {
        true
    } else {
        std::io::stdout().is_terminal()
    };

    let filter = EnvFilter::new(format!("sxload={level}"));
    fmt()
        .with_env_filter(filter)
        .with_ansi(use_colors)
        .init();
}
