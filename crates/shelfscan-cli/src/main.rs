mod audit;
mod classify;
mod investigate;
mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelfscan")]
#[command(about = "Resolve product identifiers to vendor product pages and extract their metadata")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve every row of the configured sites and write the result tables
    Run {
        /// Restrict the run to these sites (by id); repeatable
        #[arg(long = "site")]
        sites: Vec<String>,

        /// Reprocess rows that already resolved in a previous run
        #[arg(long)]
        force: bool,

        /// Only process the first N rows of each sheet
        #[arg(long)]
        limit: Option<usize>,

        /// Resolve without writing images, snapshots or tables
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the page signature of a saved HTML file as JSON
    Classify {
        /// HTML file to classify
        file: PathBuf,
    },
    /// Check the result tables and saved snapshots of previous runs
    Audit {
        /// Restrict the audit to these sites (by id); repeatable
        #[arg(long = "site")]
        sites: Vec<String>,
    },
    /// Run each strategy alone against sample rows and rank them
    Investigate {
        /// Site to investigate (by id)
        #[arg(long)]
        site: String,

        /// Number of leading sheet rows to use as samples
        #[arg(long, default_value_t = 5)]
        samples: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = shelfscan_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run {
            sites,
            force,
            limit,
            dry_run,
        }) => {
            let sites_file = load_sites(&config)?;
            let selected = select_sites(&sites_file, &sites)?;
            let options = run::RunOptions {
                force,
                limit,
                dry_run,
            };
            run::run_sites(&config, &selected, &options).await?;
        }
        Some(Commands::Classify { file }) => classify::run_classify(&file)?,
        Some(Commands::Audit { sites }) => {
            let sites_file = load_sites(&config)?;
            let selected = select_sites(&sites_file, &sites)?;
            audit::run_audit(&config, &selected)?;
        }
        Some(Commands::Investigate { site, samples }) => {
            let sites_file = load_sites(&config)?;
            let site = sites_file
                .find(&site)
                .ok_or_else(|| anyhow::anyhow!("site '{site}' not found"))?;
            investigate::run_investigate(&config, site, samples).await?;
        }
        None => Cli::command().print_help()?,
    }

    Ok(())
}

fn load_sites(config: &shelfscan_core::AppConfig) -> anyhow::Result<shelfscan_core::SitesFile> {
    shelfscan_core::load_sites(&config.sites_path)
        .with_context(|| format!("failed to load {}", config.sites_path.display()))
}

/// Every configured site when `filter` is empty, else exactly the named ones.
fn select_sites(
    sites_file: &shelfscan_core::SitesFile,
    filter: &[String],
) -> anyhow::Result<Vec<shelfscan_core::SiteConfig>> {
    if filter.is_empty() {
        return Ok(sites_file.sites.clone());
    }
    filter
        .iter()
        .map(|id| {
            sites_file
                .find(id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("site '{id}' not found"))
        })
        .collect()
}

#[cfg(test)]
mod tests;
