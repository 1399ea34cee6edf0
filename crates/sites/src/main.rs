//! Static Land - site administration entry point
//!
//! Registers, inspects and removes hosted sites on this host.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use staticland_config::{Config, CONFIG_ENV_VAR};
use staticland_sites::{
    OwnerRequest, RedirectRequest, RegisterRequest, SiteError, SiteRegistry,
};

/// Static Land - static site hosting administration
#[derive(Parser, Debug)]
#[command(name = "staticland")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration and exit
    CheckConfig,

    #[command(flatten)]
    Site(SiteCommand),
}

/// Commands that act on the site registry
#[derive(Subcommand, Debug)]
enum SiteCommand {
    /// Provision and register a site
    Register {
        /// Domain to serve the site on
        domain: String,
        /// Owner of the site (repeatable)
        #[arg(short = 'o', long = "owner", required = true)]
        owners: Vec<String>,
    },
    /// Remove a site record and its directories
    Destroy {
        domain: String,
    },
    /// Print a site record
    Show {
        domain: String,
    },
    /// Add an owner to a site
    AddOwner {
        domain: String,
        owner: String,
    },
    /// Remove an owner from a site
    RemoveOwner {
        domain: String,
        owner: String,
    },
    /// Redirect an extra name to a site
    Redirect {
        /// Name to redirect from
        redirect: String,
        /// Site to redirect to
        #[arg(long = "to")]
        domain: String,
    },
    /// List the sites an owner has
    OwnedBy {
        owner: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(cli.verbose || config.debug);

    match cli.command {
        Commands::CheckConfig => check_config(&config, cli.config.as_deref()),
        Commands::Site(command) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run(config, command))
        }
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Validate the configuration and report warnings
fn check_config(config: &Config, path: Option<&std::path::Path>) -> Result<()> {
    let report = config.validate().context("Configuration validation failed")?;

    for warning in report.warnings() {
        warn!("{}", warning);
    }

    info!("Configuration test successful:");
    info!("  - apex domain {}", config.apex_domain);
    info!("  - {} reserved sub-domain(s)", config.reserved_subdomains.len());
    info!("  - sites in {}", config.sites_dir.display());
    info!("  - vhosts in {}", config.vhosts_dir.display());

    println!(
        "staticland: configuration {} test is successful",
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".to_string())
    );
    Ok(())
}

async fn run(config: Config, command: SiteCommand) -> Result<()> {
    config.validate().context("Configuration validation failed")?;
    let registry = SiteRegistry::from_config(&config).context("Failed to open site registry")?;

    let outcome = match command {
        SiteCommand::Register { domain, owners } => registry
            .register(RegisterRequest { domain, owners })
            .await
            .map(|site| print_json(&site)),
        SiteCommand::Destroy { domain } => registry.destroy(&domain).await.map(|()| {
            println!("destroyed {}", domain);
            Ok(())
        }),
        SiteCommand::Show { domain } => registry
            .find_by_domain(&domain)
            .await
            .map(|site| print_json(&site)),
        SiteCommand::AddOwner { domain, owner } => registry
            .add_owner(OwnerRequest { domain, owner })
            .await
            .map(|site| print_json(&site)),
        SiteCommand::RemoveOwner { domain, owner } => registry
            .remove_owner(OwnerRequest { domain, owner })
            .await
            .map(|site| print_json(&site)),
        SiteCommand::Redirect { redirect, domain } => registry
            .redirect(RedirectRequest {
                domain: domain.clone(),
                redirect: redirect.clone(),
            })
            .await
            .map(|()| {
                println!("redirecting {} to {}", redirect, domain);
                Ok(())
            }),
        SiteCommand::OwnedBy { owner } => registry
            .sites_for_owner(&owner)
            .await
            .map(|sites| print_json(&sites)),
    };

    match outcome {
        Ok(printed) => printed,
        Err(e) => Err(report(e)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(error: SiteError) -> anyhow::Error {
    if error.is_retryable() {
        warn!("Re-running the same command is safe and may succeed");
    }
    anyhow::Error::new(error)
}
