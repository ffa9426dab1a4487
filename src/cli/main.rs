//! CLI binary entry point for dir-to-db

use clap::{Parser, Subcommand};
use dir_to_db::cli::commands::config::{ConfigArgs, handle_config};
use dir_to_db::cli::commands::load::{LoadArgs, handle_load};
use dir_to_db::cli::commands::plan::{PlanArgs, handle_plan};
use dir_to_db::database::config::DatabaseBackendType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dir-to-db")]
#[command(about = "Load every CSV file of a directory into its own database table")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace one table per CSV file of SOURCE_DIR
    Load {
        /// Directory holding the CSV files
        source_dir: PathBuf,
        /// Directory the temporary staging folder is created in
        staging_dir: PathBuf,
        /// Configuration file (default: ./dir-to-db.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Database backend
        #[arg(short, long, value_parser = parse_backend)]
        backend: Option<DatabaseBackendType>,
        /// Database host
        #[arg(long)]
        host: Option<String>,
        /// Database port
        #[arg(long)]
        port: Option<u16>,
        /// Database name
        #[arg(short, long)]
        database: Option<String>,
        /// Database user
        #[arg(short, long)]
        username: Option<String>,
        /// Database password
        #[arg(long, env = "DIR_TO_DB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// DuckDB database file (duckdb backend)
        #[arg(long)]
        duckdb_path: Option<PathBuf>,
        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the table each CSV file would become, without loading
    Plan {
        /// Directory holding the CSV files
        source_dir: PathBuf,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a sample configuration file
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_backend(s: &str) -> Result<DatabaseBackendType, String> {
    s.parse()
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Load {
            source_dir,
            staging_dir,
            config,
            backend,
            host,
            port,
            database,
            username,
            password,
            duckdb_path,
            json,
        } => {
            let args = LoadArgs {
                source_dir,
                staging_dir,
                config,
                backend,
                host,
                port,
                database,
                username,
                password,
                duckdb_path,
                json,
            };
            handle_load(&args)
        }
        Commands::Plan { source_dir, json } => handle_plan(&PlanArgs { source_dir, json }),
        Commands::Config { output, force } => handle_config(&ConfigArgs { output, force }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
