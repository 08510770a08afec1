//! Shopbridge CLI
//!
//! Developer tool for discovering schemas, generating mappings, and running
//! pipelines locally.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Shopbridge - sync products and orders between webshops and marketplaces
#[derive(Parser)]
#[command(name = "shopbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory or configuration file path
    #[arg(short, long, env = "SHOPBRIDGE_CONFIG", default_value = "shopbridge.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Shopbridge project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration without running
    Validate,

    /// Discover the schema of a source from sample records
    Discover {
        /// Connector reference, e.g. `file.products`
        source: String,

        /// Entity name (defaults to the connector key)
        #[arg(short, long)]
        entity: Option<String>,

        /// Number of records to inspect (0 inspects all)
        #[arg(long)]
        max_samples: Option<usize>,
    },

    /// Generate a transformer by auto-mapping a source onto a target
    Map {
        /// Source connector reference
        #[arg(long)]
        source: String,

        /// Target connector reference
        #[arg(long)]
        target: String,

        /// Minimum similarity for a mapping
        #[arg(long)]
        threshold: Option<f64>,

        /// Transformer id (defaults to `<source>_to_<target>`)
        #[arg(long)]
        id: Option<String>,
    },

    /// Run connections
    Run {
        /// Run a specific connection only
        #[arg(long, requires = "once")]
        connection: Option<String>,

        /// Run once and exit instead of starting the scheduler
        #[arg(long)]
        once: bool,
    },

    /// Fire an event at subscribed connections
    Trigger {
        /// Source that emitted the event
        #[arg(long)]
        source: String,

        /// Event name, e.g. `order.created`
        #[arg(long)]
        event: String,

        /// JSON payload; omitted means fetch from each connection's source
        #[arg(long)]
        payload: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json = cli.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text = (!cli.json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Discover {
            source,
            entity,
            max_samples,
        } => {
            commands::discover::run(&cli.config, &source, entity.as_deref(), max_samples).await?;
        }
        Commands::Map {
            source,
            target,
            threshold,
            id,
        } => {
            commands::map::run(&cli.config, &source, &target, threshold, id.as_deref()).await?;
        }
        Commands::Run { connection, once } => {
            commands::run::run(&cli.config, connection.as_deref(), once).await?;
        }
        Commands::Trigger {
            source,
            event,
            payload,
        } => {
            commands::trigger::run(&cli.config, &source, &event, payload.as_deref()).await?;
        }
    }

    Ok(())
}
