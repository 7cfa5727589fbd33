use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use repograph::config::{Config, LoggingConfig};

mod cli;

#[derive(Parser)]
#[command(name = "repograph")]
#[command(version)]
#[command(about = "Incremental symbol and dependency index for code repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project directory (shorthand for 'repograph start <project>')
    #[arg(value_name = "PROJECT")]
    project: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index now, then re-index changed files on an interval - default command
    Start {
        /// Project directory to index
        #[arg(default_value = ".")]
        project: String,

        /// Drop the existing index first
        #[arg(short, long)]
        rebuild: bool,
    },

    /// Run a single indexing cycle
    Index {
        /// Project directory to index
        #[arg(default_value = ".")]
        project: String,

        /// Walk the whole tree instead of the git delta
        #[arg(long)]
        full: bool,

        /// Drop the existing index first
        #[arg(short, long)]
        rebuild: bool,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show per-file index status
    Status {
        /// Project directory
        #[arg(default_value = ".")]
        project: String,

        /// One row per file instead of counts
        #[arg(long)]
        detailed: bool,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Query the dependency graph
    Query {
        /// Query type: callers, callees, deps, file
        query_type: String,

        /// Target symbol or file
        target: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Maximum rows for callers/callees
        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        /// For deps: imports, importers, both
        #[arg(long, default_value = "both")]
        direction: String,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Keyword search over indexed chunks
    Search {
        /// Search terms
        query: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Number of results
        #[arg(short, default_value_t = 10)]
        k: usize,

        /// Search symbol names instead of chunks
        #[arg(long)]
        symbols: bool,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List supported languages
    Languages,
}

impl Commands {
    fn project(&self) -> Option<&str> {
        match self {
            Commands::Start { project, .. }
            | Commands::Index { project, .. }
            | Commands::Status { project, .. }
            | Commands::Query { project, .. }
            | Commands::Search { project, .. } => Some(project),
            Commands::Languages => None,
        }
    }
}

/// `RUST_LOG` wins; otherwise the flags, then the configured level
fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle shorthand: repograph <project>
    let command = match (cli.command, cli.project) {
        (Some(cmd), _) => cmd,
        (None, project) => Commands::Start {
            project: project.unwrap_or_else(|| ".".to_string()),
            rebuild: false,
        },
    };

    let logging = command
        .project()
        .map(|project| Config::from_project_dir(project).logging)
        .unwrap_or_default();
    init_logging(cli.debug, cli.verbose, &logging);

    info!("repograph v{} starting", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Start { project, rebuild } => {
            cli::start::start_worker(project, rebuild).await?;
        }

        Commands::Index {
            project,
            full,
            rebuild,
            format,
        } => {
            cli::index::index_project(project, full, rebuild, format).await?;
        }

        Commands::Status {
            project,
            detailed,
            format,
        } => {
            cli::status::show_status(project, detailed, format).await?;
        }

        Commands::Query {
            query_type,
            target,
            project,
            limit,
            direction,
            format,
        } => {
            cli::query::query_index(query_type, target, project, limit, direction, format).await?;
        }

        Commands::Search {
            query,
            project,
            k,
            symbols,
            format,
        } => {
            cli::search::search_index(query, project, k, symbols, format).await?;
        }

        Commands::Languages => {
            cli::languages::list_languages();
        }
    }

    Ok(())
}
