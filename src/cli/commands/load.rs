//! Directory load command
//!
//! Resolves the connection settings (file, then environment, then flags),
//! runs one batch and prints a status line per file.

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::database::config::{CONFIG_FILENAME, DatabaseBackendType, LoaderConfig};
use crate::load::{BatchConfig, BatchReport};

/// Load command arguments
#[derive(Debug, Clone, Default)]
pub struct LoadArgs {
    /// Directory holding the `*.csv` sources
    pub source_dir: PathBuf,
    /// Directory the staging subdirectory is created in
    pub staging_dir: PathBuf,
    /// Configuration file (defaults to `dir-to-db.toml` in the working directory)
    pub config: Option<PathBuf>,
    /// Backend override
    pub backend: Option<DatabaseBackendType>,
    /// Database host override
    pub host: Option<String>,
    /// Database port override
    pub port: Option<u16>,
    /// Database name override
    pub database: Option<String>,
    /// Database user override
    pub username: Option<String>,
    /// Database password override
    pub password: Option<String>,
    /// DuckDB file override
    pub duckdb_path: Option<PathBuf>,
    /// Print the batch report as JSON
    pub json: bool,
}

/// Build the effective configuration for a load
pub fn resolve_config(args: &LoadArgs) -> Result<LoaderConfig, CliError> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));

    if args.config.is_some() && !config_path.exists() {
        return Err(CliError::InvalidArgument(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let mut config = LoaderConfig::load(&config_path)?;
    apply_flags(&mut config, args);
    Ok(config)
}

fn apply_flags(config: &mut LoaderConfig, args: &LoadArgs) {
    if let Some(backend) = args.backend {
        config.database.backend = backend;
    }
    if let Some(path) = &args.duckdb_path {
        config.database.path = path.display().to_string();
    }
    if let Some(host) = &args.host {
        config.postgres.host = host.clone();
    }
    if let Some(port) = args.port {
        config.postgres.port = port;
    }
    if let Some(database) = &args.database {
        config.postgres.database = database.clone();
    }
    if let Some(username) = &args.username {
        config.postgres.username = username.clone();
    }
    if let Some(password) = &args.password {
        config.postgres.password = password.clone();
    }
}

/// Load every CSV file of the source directory
///
/// Returns an error when the batch cannot run or when any file failed.
pub fn handle_load(args: &LoadArgs) -> Result<(), CliError> {
    if !args.source_dir.is_dir() {
        return Err(CliError::DirectoryNotFound(args.source_dir.clone()));
    }
    if !args.staging_dir.is_dir() {
        return Err(CliError::DirectoryNotFound(args.staging_dir.clone()));
    }

    let config = resolve_config(args)?;
    let batch = BatchConfig::new(&args.source_dir, &args.staging_dir)
        .with_staging_dir_name(config.staging.dir_name.clone());

    tracing::info!("Loading into {} backend", config.database.backend);

    let report: BatchReport = match config.database.backend {
        DatabaseBackendType::DuckDB => {
            #[cfg(feature = "duckdb-backend")]
            {
                use crate::database::DuckDBConnector;

                let base = config_base_dir(args);
                run_batch(DuckDBConnector::new(config.get_duckdb_path(&base)), batch)?
            }
            #[cfg(not(feature = "duckdb-backend"))]
            {
                return Err(CliError::InvalidArgument(
                    "DuckDB support not enabled. Enable 'duckdb-backend' feature.".to_string(),
                ));
            }
        }
        DatabaseBackendType::Postgres => {
            #[cfg(feature = "postgres-backend")]
            {
                use crate::database::PostgresConnector;

                run_batch(PostgresConnector::new(config.postgres.clone()), batch)?
            }
            #[cfg(not(feature = "postgres-backend"))]
            {
                return Err(CliError::InvalidArgument(
                    "PostgreSQL support not enabled. Enable 'postgres-backend' feature."
                        .to_string(),
                ));
            }
        }
    };

    print!("{}", render_report(&report, args.json)?);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::LoadFailed {
            failed: report.failed(),
            total: report.files.len(),
        })
    }
}

fn render_report(report: &BatchReport, json: bool) -> Result<String, CliError> {
    if json {
        let output = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::SerializationError(e.to_string()))?;
        return Ok(format!("{}\n", output));
    }

    let mut output = String::new();
    for file in &report.files {
        output.push_str(&format!("{}\n", file));
    }
    output.push_str(&format!(
        "\n{} loaded, {} failed in {:.2}s\n",
        report.succeeded(),
        report.failed(),
        report.duration.as_secs_f64()
    ));
    Ok(output)
}

#[cfg(any(feature = "duckdb-backend", feature = "postgres-backend"))]
fn run_batch<F: crate::database::SessionFactory>(
    sessions: F,
    batch: BatchConfig,
) -> Result<BatchReport, CliError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))?;

    let engine = crate::load::LoadEngine::new(sessions);
    Ok(rt.block_on(engine.run_batch(batch))?)
}

/// Relative DuckDB paths resolve against the configuration file's directory
#[cfg(feature = "duckdb-backend")]
fn config_base_dir(args: &LoadArgs) -> PathBuf {
    args.config
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &config_path,
            "[database]\nbackend = \"postgres\"\n\n[postgres]\nhost = \"file-host\"\nport = 6000\nusername = \"file-user\"\n",
        )
        .unwrap();

        let args = LoadArgs {
            config: Some(config_path),
            host: Some("flag-host".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };

        let config = resolve_config(&args).unwrap();

        assert_eq!(config.database.backend, DatabaseBackendType::Postgres);
        assert_eq!(config.postgres.host, "flag-host");
        assert_eq!(config.postgres.port, 6000);
        assert_eq!(config.postgres.username, "file-user");
        assert_eq!(config.postgres.password, "secret");
    }

    fn mixed_report() -> BatchReport {
        use crate::load::{FileReport, LoadOutcome};

        BatchReport {
            files: vec![
                FileReport {
                    file: "good.csv".to_string(),
                    table: "good".to_string(),
                    outcome: LoadOutcome::Succeeded { rows: 1 },
                },
                FileReport {
                    file: "bad.csv".to_string(),
                    table: "bad".to_string(),
                    outcome: LoadOutcome::Failed {
                        reason: "schema".to_string(),
                    },
                },
            ],
            duration: std::time::Duration::from_secs(2),
        }
    }

    #[test]
    fn test_render_report_text() {
        let output = render_report(&mixed_report(), false).unwrap();
        assert_eq!(
            output,
            "good.csv -> good: loaded 1 rows\nbad.csv -> bad: FAILED (schema)\n\n1 loaded, 1 failed in 2.00s\n"
        );
    }

    #[test]
    fn test_render_report_json() {
        let output = render_report(&mixed_report(), true).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["files"][0]["table"], "good");
        assert_eq!(json["files"][1]["outcome"]["status"], "failed");
        assert_eq!(json["duration_secs"], 2.0);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let args = LoadArgs {
            config: Some(dir.path().join("absent.toml")),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(&args),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[cfg(feature = "duckdb-backend")]
    #[test]
    fn test_config_base_dir() {
        let args = LoadArgs {
            config: Some(PathBuf::from("/etc/dir-to-db/dir-to-db.toml")),
            ..Default::default()
        };
        assert_eq!(config_base_dir(&args), PathBuf::from("/etc/dir-to-db"));

        let args = LoadArgs {
            config: Some(PathBuf::from("dir-to-db.toml")),
            ..Default::default()
        };
        assert_eq!(config_base_dir(&args), PathBuf::from("."));
        assert_eq!(config_base_dir(&LoadArgs::default()), PathBuf::from("."));
    }

    #[cfg(feature = "duckdb-backend")]
    #[test]
    fn test_handle_load_reports_failures() {
        let input = tempdir().unwrap();
        let work = tempdir().unwrap();
        std::fs::write(input.path().join("good.csv"), "a\n1\n").unwrap();
        std::fs::write(input.path().join("bad.csv"), "a,b\n1\n").unwrap();

        let args = LoadArgs {
            source_dir: input.path().to_path_buf(),
            staging_dir: work.path().to_path_buf(),
            config: Some(work.path().join("none.toml")),
            backend: Some(DatabaseBackendType::DuckDB),
            duckdb_path: Some(work.path().join("out.duckdb")),
            ..Default::default()
        };
        std::fs::write(work.path().join("none.toml"), "").unwrap();

        match handle_load(&args) {
            Err(CliError::LoadFailed { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
            }
            other => panic!("expected a partial failure, got {:?}", other),
        }
        assert!(!work.path().join("files_to_process").exists());
    }
}
