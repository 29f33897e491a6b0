//! fleetrun CLI - Main entry point

mod cli;
mod playbook;

use clap::{Parser, Subcommand};
use fleet_foundation::{Error, FleetConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// fleetrun - run tasks across a fleet of hosts
#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a playbook
    Run {
        /// Path to the playbook JSON file
        playbook: PathBuf,

        /// Maximum number of hosts running at once
        #[arg(short, long)]
        forks: Option<usize>,

        /// Extra variables as key=value (repeatable)
        #[arg(short = 'e', long = "extra-vars")]
        extra_vars: Vec<String>,

        /// Don't make any changes
        #[arg(short = 'C', long)]
        check: bool,

        /// Directory templates are loaded from
        #[arg(long)]
        resource_dir: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the project directory
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = FleetConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        FleetConfig::default()
    });

    // Initialize logging
    let log_level = if args.debug {
        "debug".to_string()
    } else {
        config.log.level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(config.log.with_target))
        .init();

    match run(args.command, config).await {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<Error>() {
            // 사용자 입력 문제는 짧게 출력
            Some(e) if e.is_user_facing() => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            _ => Err(err),
        },
    }
}

async fn run(command: Command, mut config: FleetConfig) -> anyhow::Result<()> {
    match command {
        Command::Run {
            playbook,
            forks,
            extra_vars,
            check,
            resource_dir,
        } => {
            if let Some(forks) = forks {
                config = config.forks(forks);
            }
            if let Some(dir) = resource_dir {
                config = config.resource_dir(dir);
            }
            config.validate()?;
            tracing::debug!(forks = config.forks, "effective configuration loaded");

            let opts = cli::RunOptions {
                playbook,
                extra_vars,
                check,
            };
            if !cli::run_playbook(&config, &opts).await? {
                std::process::exit(2);
            }
        }
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save_project()?;
                println!("\nSaved to .fleetrun/config.json");
            }
        }
    }

    Ok(())
}
