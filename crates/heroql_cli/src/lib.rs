//! Command-line interface for the HeroQL hero catalogue.
//!
//! # Usage
//!
//! ```bash
//! # List every hero
//! heroql list
//!
//! # Look up and search
//! heroql get 12
//! heroql search ma
//!
//! # Edit the catalogue
//! heroql add "Dr Nice"
//! heroql rename 12 "Narco II"
//! heroql delete 12
//!
//! # Follow the list (or a search) as it changes
//! heroql watch --term ma
//!
//! # Point at another endpoint, or use the built-in catalogue
//! HEROQL_ENDPOINT=http://localhost:4000/graphql heroql list
//! heroql --in-memory list
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::stream::{BoxStream, StreamExt};
use hero_service::{Hero, HeroDraft, HeroResult, HeroService, InMemoryHeroServer};
use heroql_sdk::{ClientConfig, GraphQLClient, MessageLog, DEFAULT_ENDPOINT};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "heroql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// GraphQL endpoint
    #[arg(short, long, global = true, env = "HEROQL_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Use the built-in hero catalogue instead of the endpoint
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print the message log when done
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all heroes
    List,

    /// Show one hero
    Get { id: i64 },

    /// Find heroes whose name contains a term
    Search { term: String },

    /// Add a hero
    Add { name: String },

    /// Rename a hero
    Rename { id: i64, name: String },

    /// Delete a hero
    #[command(alias = "rm")]
    Delete { id: i64 },

    /// Print the hero list (or a search) every time it changes
    Watch {
        /// Watch a search instead of the full list
        #[arg(long)]
        term: Option<String>,

        /// Stop after this many updates
        #[arg(long)]
        count: Option<usize>,
    },
}

/// Runs a command and returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let log = Arc::new(MessageLog::new());
    let service = connect(&cli, log.clone())?;

    let code = match cli.command {
        Commands::List => {
            print_heroes(&service.get_all()?.await);
            0
        }
        Commands::Get { id } => report(service.get_by_id(id)?.await, "Found", id),
        Commands::Search { term } => {
            let heroes = service.search(&term)?.next().await.unwrap_or_default();
            print_heroes(&heroes);
            0
        }
        Commands::Add { name } => {
            let created = service.create(&HeroDraft::new(name))?.await;
            report(created, "Added", "new hero")
        }
        Commands::Rename { id, name } => {
            report(service.update(&Hero::new(id, name))?.await, "Renamed", id)
        }
        Commands::Delete { id } => report(service.delete_by_id(id)?.await, "Deleted", id),
        Commands::Watch { term, count } => {
            let updates = match term {
                Some(term) => service.search(&term)?,
                None => service.watch_all()?,
            };
            watch(updates, count).await;
            0
        }
    };

    if cli.verbose {
        print_messages(&log);
    }
    Ok(code)
}

fn connect(cli: &Cli, log: Arc<MessageLog>) -> HeroResult<HeroService> {
    if cli.in_memory {
        info!("using the built-in hero catalogue");
        return HeroService::in_memory(Arc::new(InMemoryHeroServer::with_seed_data()), log);
    }

    let mut config = ClientConfig::new(cli.endpoint.as_str());
    if let Some(secs) = cli.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    info!(endpoint = %config.endpoint, "connecting");
    let client = GraphQLClient::builder(config).log(log).build()?;
    HeroService::new(client)
}

fn report(hero: Option<Hero>, verb: &str, target: impl std::fmt::Display) -> i32 {
    match hero {
        Some(hero) => {
            println!("{} {}", verb.green(), hero);
            0
        }
        None => {
            eprintln!("{} no hero for {}", "Error".red().bold(), target);
            1
        }
    }
}

fn print_heroes(heroes: &[Hero]) {
    if heroes.is_empty() {
        println!("{}", "No heroes".dimmed());
        return;
    }
    for hero in heroes {
        println!("{}", hero);
    }
}

async fn watch(mut updates: BoxStream<'static, Vec<Hero>>, count: Option<usize>) {
    let mut seen = 0;
    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(heroes) = update else { break };
                seen += 1;
                println!("{} #{}", "Update".blue().bold(), seen);
                print_heroes(&heroes);
                if count.is_some_and(|count| seen >= count) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

fn print_messages(log: &MessageLog) {
    println!();
    println!("{}", "Messages".bold());
    for entry in log.entries() {
        println!(
            "  {} {}",
            entry.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
            entry
        );
    }
}
