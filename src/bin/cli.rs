//! CLI for inspecting and editing the target topology

use std::path::PathBuf;

use agency_topology::{Communication, Config, HttpAgency};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agency-topo")]
#[command(about = "Read and change the target cluster topology stored in the agency")]
#[command(version)]
struct Cli {
    /// Agency URL (overrides the config file)
    #[arg(long)]
    agency: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use compare-and-swap for pairing changes
    #[arg(long)]
    guarded: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Primary/secondary data servers
    Servers {
        #[command(subcommand)]
        command: ServerCommands,
    },

    /// Coordinator membership
    Coordinators {
        #[command(subcommand)]
        command: CoordinatorCommands,
    },

    /// Logical databases
    Databases {
        #[command(subcommand)]
        command: DatabaseCommands,
    },
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Show every server with its role
    List,

    /// Register an unpaired primary
    AddPrimary { name: String },

    /// Pair a secondary with an existing primary
    AddSecondary { secondary: String, primary: String },

    /// Register a primary together with its secondary
    AddPair { primary: String, secondary: String },

    /// Remove a server, promoting or demoting its partner
    Remove { name: String },

    /// Report pairing inconsistencies
    Audit,
}

#[derive(Subcommand)]
enum CoordinatorCommands {
    /// Show coordinator names
    List,
    /// Add a coordinator
    Add { name: String },
    /// Remove a coordinator
    Remove { name: String },
}

#[derive(Subcommand)]
enum DatabaseCommands {
    /// Show database names
    List,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.agency {
        config.agency.endpoint = endpoint;
    }
    if cli.guarded {
        config.agency.guarded_writes = true;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("using agency at {}", config.agency.endpoint);
    let agency = HttpAgency::new(&config.agency)?;
    let comm = Communication::from_config(agency, &config.agency);
    let target = comm.target();

    match cli.command {
        Commands::Servers { command } => {
            let servers = target.db_servers();
            match command {
                ServerCommands::List => print_json(&servers.get_list().await?)?,
                ServerCommands::AddPrimary { name } => servers.add_primary(&name).await?,
                ServerCommands::AddSecondary { secondary, primary } => {
                    servers.add_secondary(&secondary, &primary).await?
                }
                ServerCommands::AddPair { primary, secondary } => {
                    servers.add_pair(&primary, &secondary).await?
                }
                ServerCommands::Remove { name } => {
                    let outcome = servers.remove_server(&name).await?;
                    print_json(&outcome)?;
                    if !outcome.is_applied() {
                        anyhow::bail!("{} is not part of the target topology", name);
                    }
                }
                ServerCommands::Audit => {
                    let findings = servers.audit().await?;
                    print_json(&findings)?;
                    if !findings.is_empty() {
                        std::process::exit(2);
                    }
                }
            }
        }

        Commands::Coordinators { command } => {
            let coordinators = target.coordinators();
            match command {
                CoordinatorCommands::List => print_json(&coordinators.get_list().await?)?,
                CoordinatorCommands::Add { name } => coordinators.add(&name).await?,
                CoordinatorCommands::Remove { name } => coordinators.remove(&name).await?,
            }
        }

        Commands::Databases { command } => match command {
            DatabaseCommands::List => print_json(&target.databases().get_list().await?)?,
        },
    }

    Ok(())
}
