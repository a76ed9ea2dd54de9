mod collect;
mod config;
mod keepers;
mod server;
mod store;

use crate::collect::projections::SystemKind;
use crate::collect::weekly::WeeklyOptions;
use crate::config::{Overrides, Settings};
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fbcw", version)]
#[command(about = "Fantasy Baseball Civil War: static site server and data collectors")]
struct Cli {
    /// Static site root (default: current directory, or FBCW_SITE_DIR)
    #[arg(long, global = true)]
    site_dir: Option<PathBuf>,

    /// Data directory (default: <site-dir>/data, or FBCW_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// League season (default: 2026, or FBCW_SEASON)
    #[arg(long, global = true)]
    season: Option<u16>,

    /// Yahoo OAuth2 credential file (default: oauth2.json, or FBCW_OAUTH_FILE)
    #[arg(long, global = true)]
    oauth_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the site with caching disabled (the default command)
    Serve {
        /// Address to listen on (default: 0.0.0.0:5000, or FBCW_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Fetch preseason projections from Fangraphs
    Projections {
        /// One system to fetch; all systems when omitted
        system: Option<String>,
        /// List the available systems and exit
        #[arg(long)]
        list: bool,
    },
    /// Fetch rest-of-season projections from Fangraphs
    Ros {
        system: Option<String>,
        #[arg(long)]
        list: bool,
    },
    /// Collect weekly team stats from Yahoo Fantasy
    Weekly {
        /// Collect a specific week instead of the last completed one
        #[arg(long, conflicts_with = "all")]
        week: Option<u32>,
        /// Collect every week up to the last completed one
        #[arg(long)]
        all: bool,
    },
    /// Keeper passwords and selections
    Keepers {
        #[command(subcommand)]
        action: Option<KeeperAction>,
    },
    /// Parse every JSON file in the data directory
    Validate,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum KeeperAction {
    /// Write keeper_config.json with hashed team passwords (the default)
    Generate,
    /// Merge exported submissions into the season's keepers file
    Merge,
    /// Print the current selections
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    better_panic::install();

    let cli = Cli::parse();
    init_logging(cli.debug);

    let settings = Settings::load(Overrides {
        site_dir: cli.site_dir,
        data_dir: cli.data_dir,
        bind: match &cli.command {
            Some(Command::Serve { bind }) => bind.clone(),
            _ => None,
        },
        season: cli.season,
        oauth_file: cli.oauth_file,
    });
    debug!("{settings:?}");

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { .. } => server::serve(settings.site_dir.clone(), &settings.bind).await,
        Command::Projections { system, list } => {
            run_projections(&settings, SystemKind::Preseason, system, list).await
        }
        Command::Ros { system, list } => {
            run_projections(&settings, SystemKind::RestOfSeason, system, list).await
        }
        Command::Weekly { week, all } => {
            collect::weekly::run(&settings, WeeklyOptions { week, all }).await
        }
        Command::Keepers { action } => match action.unwrap_or(KeeperAction::Generate) {
            KeeperAction::Generate => keepers::generate(&settings),
            KeeperAction::Merge => keepers::merge(&settings),
            KeeperAction::Status => keepers::status(&settings),
        },
        Command::Validate => validate(&settings),
    }
}

async fn run_projections(
    settings: &Settings,
    kind: SystemKind,
    system: Option<String>,
    list: bool,
) -> anyhow::Result<()> {
    if list {
        println!("Available systems:");
        for s in kind.systems() {
            println!("  - {}", s.name);
        }
        return Ok(());
    }
    collect::projections::run(settings, kind, system.as_deref()).await
}

fn validate(settings: &Settings) -> anyhow::Result<()> {
    let report = store::validate_tree(&settings.data_dir)?;
    for (path, reason) in &report.failures {
        println!("FAIL {}: {reason}", path.display());
    }
    println!(
        "{} JSON files checked, {} failed",
        report.checked,
        report.failures.len()
    );
    if !report.is_ok() {
        anyhow::bail!("{} JSON files failed to parse", report.failures.len());
    }
    Ok(())
}

/// `log` records are bridged into the subscriber, so library and binary
/// logging share one filter. `--debug` wins over `RUST_LOG`.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug,hyper=info,hyper_util=info,reqwest=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
