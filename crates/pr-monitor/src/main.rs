//! pr-monitor - watch open pull requests and re-trigger their CI
//!
//! ## Commands
//!
//! - `list`: show open PRs and their problematic pipelines
//! - `watch`: re-list every polling interval until Ctrl-C
//! - `rerun`: post a `run ...` command on a PR
//! - `rebase`: update a PR branch and post `run buildall`
//! - `commands`: print the command catalog

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use pr_monitor::render::{render_action, render_listing, render_rebase};
use pr_monitor::{PullRequestService, ServiceError};
use pr_monitor_client::{OctocrabCodeHost, COMMAND_CHOICES};
use pr_monitor_config::AppConfig;
use std::path::PathBuf;
use std::time::Duration;

type Service = PullRequestService<OctocrabCodeHost>;

#[derive(Parser)]
#[command(name = "pr-monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monitor open pull requests and re-trigger CI by comment", long_about = None)]
struct Cli {
    /// Path to the config file (default: PR_MONITOR_CONFIG, ./pr-monitor.toml, user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List open pull requests
    List {
        /// Target label (default: every configured target)
        target: Option<String>,

        /// Show every pipeline, not only the ones needing attention
        #[arg(short, long)]
        all: bool,
    },

    /// Re-list all targets every polling interval until Ctrl-C
    Watch {
        #[arg(short, long)]
        all: bool,
    },

    /// Post a CI command as a PR comment
    Rerun {
        target: String,

        /// Repository as owner/name
        repo: String,

        number: u64,

        /// Command words, e.g. `run p0`
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Update the PR branch, then post `run buildall`
    Rebase {
        target: String,
        repo: String,
        number: u64,
    },

    /// Print the available CI commands
    Commands,
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

async fn list(service: &Service, labels: &[String], all: bool, json: bool) -> Result<()> {
    for label in labels {
        let prs = service.list_pull_requests(label).await?;
        if json {
            print_json(&*prs)?;
        } else {
            print!("{}", render_listing(label, &prs, all));
        }
    }
    Ok(())
}

async fn watch(service: &Service, interval_seconds: u64, all: bool, json: bool) -> Result<()> {
    let labels: Vec<String> = service.targets().iter().map(|t| t.label.clone()).collect();
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                return Ok(());
            }
        }

        for label in &labels {
            // Ticks line up with the listing TTL; always fetch fresh
            service.invalidate_listing(label);
            match service.list_pull_requests(label).await {
                Ok(prs) if json => print_json(&*prs)?,
                Ok(prs) => print!("{}", render_listing(label, &prs, all)),
                Err(ServiceError::Remote(e)) if e.is_rate_limited() => {
                    warn!(
                        "Rate limited while listing {}; resets at {}",
                        label,
                        e.reset_at().unwrap_or("unknown")
                    );
                }
                Err(e) => warn!("Failed to list {}: {}", label, e),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Commands::Commands = cli.command {
        if cli.json {
            print_json(&COMMAND_CHOICES)?;
        } else {
            COMMAND_CHOICES.iter().for_each(|c| println!("{}", c));
        }
        return Ok(());
    }

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let host =
        OctocrabCodeHost::from_config(&config.github).context("Failed to create GitHub client")?;
    let service = PullRequestService::from_config(host, &config);

    match cli.command {
        Commands::List { target, all } => {
            let labels = match target {
                Some(label) => vec![label],
                None => config.targets.iter().map(|t| t.label.clone()).collect(),
            };
            list(&service, &labels, all, cli.json).await?;
        }
        Commands::Watch { all } => {
            info!(
                "Watching {} targets every {}s",
                config.targets.len(),
                config.polling.interval_seconds
            );
            watch(&service, config.polling.interval_seconds, all, cli.json).await?;
        }
        Commands::Rerun {
            target,
            repo,
            number,
            command,
        } => {
            service.target(&target)?;
            let result = service
                .trigger_command(&target, &repo, number, &command.join(" "))
                .await?;
            if cli.json {
                print_json(&result)?;
            } else {
                println!("{}", render_action(&result));
            }
        }
        Commands::Rebase {
            target,
            repo,
            number,
        } => {
            service.target(&target)?;
            let result = service.rebase_and_rerun(&target, &repo, number).await?;
            if cli.json {
                print_json(&result)?;
            } else {
                println!("{}", render_rebase(&result));
            }
        }
        Commands::Commands => {}
    }

    Ok(())
}
