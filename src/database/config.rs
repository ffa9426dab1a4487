//! Loader configuration file support
//!
//! Handles parsing of `dir-to-db.toml` configuration files and
//! environment variable overrides. Command-line flags are applied on top by
//! the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{DatabaseError, DatabaseResult};
use crate::staging::validate_dir_name;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "dir-to-db.toml";

/// Default database filename for DuckDB
pub const DEFAULT_DUCKDB_FILENAME: &str = "dir-to-db.duckdb";

/// Name of the staging subdirectory created under the staging root
pub const DEFAULT_STAGING_DIR_NAME: &str = "files_to_process";

/// Default PostgreSQL port
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Environment variable for database backend
pub const ENV_DB_BACKEND: &str = "DIR_TO_DB_BACKEND";

/// Environment variable for DuckDB path
pub const ENV_DUCKDB_PATH: &str = "DIR_TO_DB_DUCKDB_PATH";

/// Environment variable for the database host
pub const ENV_HOST: &str = "DIR_TO_DB_HOST";

/// Environment variable for the database port
pub const ENV_PORT: &str = "DIR_TO_DB_PORT";

/// Environment variable for the database name
pub const ENV_DATABASE: &str = "DIR_TO_DB_DATABASE";

/// Environment variable for the database user
pub const ENV_USER: &str = "DIR_TO_DB_USER";

/// Environment variable for the database password
pub const ENV_PASSWORD: &str = "DIR_TO_DB_PASSWORD";

/// Database backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackendType {
    /// PostgreSQL server (default)
    #[default]
    Postgres,
    /// DuckDB embedded database file
    DuckDB,
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duckdb" => Ok(DatabaseBackendType::DuckDB),
            "postgres" | "postgresql" => Ok(DatabaseBackendType::Postgres),
            _ => Err(format!(
                "Unknown database backend: {}. Use 'postgres' or 'duckdb'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::DuckDB => write!(f, "duckdb"),
            DatabaseBackendType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Connection parameters for a database server
///
/// The password is never printed: `Debug` and `Display` mask it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name
    #[serde(default = "default_database")]
    pub database: String,

    /// User name
    #[serde(default = "default_username")]
    pub username: String,

    /// Password
    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_POSTGRES_PORT
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_username() -> String {
    "postgres".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: default_username(),
            password: String::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create connection parameters from the five front-end values
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build a tokio-postgres configuration without going through a URL string
    #[cfg(feature = "postgres-backend")]
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.username)
            .application_name("dir-to-db");
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:****@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Database backend type
    #[serde(default)]
    pub backend: DatabaseBackendType,

    /// Path to DuckDB database file (relative to the config directory)
    #[serde(default = "default_duckdb_path")]
    pub path: String,
}

fn default_duckdb_path() -> String {
    DEFAULT_DUCKDB_FILENAME.to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: DatabaseBackendType::default(),
            path: default_duckdb_path(),
        }
    }
}

/// Staging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingSection {
    /// Name of the subdirectory created under the staging root
    #[serde(default = "default_staging_dir_name")]
    pub dir_name: String,
}

fn default_staging_dir_name() -> String {
    DEFAULT_STAGING_DIR_NAME.to_string()
}

impl Default for StagingSection {
    fn default() -> Self {
        Self {
            dir_name: default_staging_dir_name(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `dir-to-db.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoaderConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseSection,

    /// PostgreSQL connection parameters
    #[serde(default)]
    pub postgres: ConnectionConfig,

    /// Staging configuration
    #[serde(default)]
    pub staging: StagingSection,
}

impl LoaderConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a PostgreSQL configuration
    pub fn postgres(connection: ConnectionConfig) -> Self {
        Self {
            database: DatabaseSection {
                backend: DatabaseBackendType::Postgres,
                path: String::new(),
            },
            postgres: connection,
            ..Default::default()
        }
    }

    /// Create a DuckDB configuration
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseSection {
                backend: DatabaseBackendType::DuckDB,
                path: path.into(),
            },
            ..Default::default()
        }
    }

    /// Load configuration from a file, falling back to defaults when it is absent.
    ///
    /// Environment variable overrides are applied afterwards.
    pub fn load(config_path: &Path) -> DatabaseResult<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| DatabaseError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> DatabaseResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DatabaseError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot be used safely
    pub fn validate(&self) -> DatabaseResult<()> {
        validate_dir_name(&self.staging.dir_name)
            .map_err(|e| DatabaseError::ConfigError(e.to_string()))
    }

    /// Save configuration to a file
    pub fn save(&self, config_path: &Path) -> DatabaseResult<()> {
        let content = self.to_toml()?;

        std::fs::write(config_path, content)
            .map_err(|e| DatabaseError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> DatabaseResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            DatabaseError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> DatabaseResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> DatabaseResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(ENV_DB_BACKEND) {
            self.database.backend = backend.parse().map_err(DatabaseError::ConfigError)?;
        }

        if let Some(path) = lookup(ENV_DUCKDB_PATH) {
            self.database.path = path;
        }

        if let Some(host) = lookup(ENV_HOST) {
            self.postgres.host = host;
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.postgres.port = port.parse().map_err(|_| {
                DatabaseError::ConfigError(format!("{} is not a valid port: {}", ENV_PORT, port))
            })?;
        }

        if let Some(database) = lookup(ENV_DATABASE) {
            self.postgres.database = database;
        }

        if let Some(user) = lookup(ENV_USER) {
            self.postgres.username = user;
        }

        if let Some(password) = lookup(ENV_PASSWORD) {
            self.postgres.password = password;
        }

        Ok(())
    }

    /// Get the DuckDB database path, resolving relative paths against `base_dir`
    pub fn get_duckdb_path(&self, base_dir: &Path) -> PathBuf {
        if self.database.path.is_empty() {
            base_dir.join(DEFAULT_DUCKDB_FILENAME)
        } else if Path::new(&self.database.path).is_absolute() {
            PathBuf::from(&self.database.path)
        } else {
            base_dir.join(&self.database.path)
        }
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# dir-to-db configuration
# Flags on the command line override these values, and DIR_TO_DB_* environment
# variables override the file.

[database]
# Database backend: "postgres" (default) or "duckdb"
backend = "postgres"

# Path to DuckDB database file (used when backend = "duckdb")
path = "dir-to-db.duckdb"

[postgres]
host = "localhost"
port = 5432
database = "postgres"
username = "postgres"
# Prefer DIR_TO_DB_PASSWORD over storing the password here
# password = ""

[staging]
# Subdirectory created (and removed again) under the staging root
dir_name = "files_to_process"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::new();
        assert_eq!(config.database.backend, DatabaseBackendType::Postgres);
        assert_eq!(config.postgres.port, DEFAULT_POSTGRES_PORT);
        assert_eq!(config.postgres.host, "localhost");
        assert_eq!(config.staging.dir_name, DEFAULT_STAGING_DIR_NAME);
    }

    #[test]
    fn test_parse_postgres_config() {
        let toml = r#"
[database]
backend = "postgres"

[postgres]
host = "db.internal"
port = 6543
database = "warehouse"
username = "loader"
password = "secret"
"#;
        let config = LoaderConfig::parse(toml).unwrap();
        assert_eq!(config.database.backend, DatabaseBackendType::Postgres);
        assert_eq!(
            config.postgres,
            ConnectionConfig::new("db.internal", 6543, "warehouse", "loader", "secret")
        );
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let toml = r#"
[postgres]
host = "example.org"
"#;
        let config = LoaderConfig::parse(toml).unwrap();
        assert_eq!(config.postgres.host, "example.org");
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.postgres.username, "postgres");
        assert_eq!(config.staging.dir_name, "files_to_process");
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(matches!(
            LoaderConfig::parse("[postgres]\nport = \"not a number\""),
            Err(DatabaseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let config = LoaderConfig::duckdb("my-db.duckdb");

        config.save(&path).unwrap();
        assert!(path.exists());

        let loaded = LoaderConfig::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.database.backend, DatabaseBackendType::DuckDB);
        assert_eq!(loaded.database.path, "my-db.duckdb");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join(CONFIG_FILENAME);

        let config = LoaderConfig::load(&missing).unwrap();
        assert!(!missing.exists());
        assert_eq!(config.staging.dir_name, DEFAULT_STAGING_DIR_NAME);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[staging]\ndir_name = \"incoming_stage\"\n").unwrap();

        let config = LoaderConfig::load(&path).unwrap();
        assert_eq!(config.staging.dir_name, "incoming_stage");
    }

    #[test]
    fn test_staging_dir_name_must_be_one_component() {
        for name in ["", ".", "..", "/abs", "a/b"] {
            let toml = format!("[staging]\ndir_name = {:?}\n", name);
            assert!(
                matches!(LoaderConfig::parse(&toml), Err(DatabaseError::ConfigError(_))),
                "{:?} should be rejected",
                name
            );
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[staging]\ndir_name = \".\"\n").unwrap();
        assert!(matches!(
            LoaderConfig::load(&path),
            Err(DatabaseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_BACKEND, "duckdb"),
            (ENV_DUCKDB_PATH, "/data/load.duckdb"),
            (ENV_HOST, "10.0.0.5"),
            (ENV_PORT, "5433"),
            (ENV_DATABASE, "analytics"),
            (ENV_USER, "etl"),
            (ENV_PASSWORD, "hunter2"),
        ]);

        let mut config = LoaderConfig::new();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.backend, DatabaseBackendType::DuckDB);
        assert_eq!(config.database.path, "/data/load.duckdb");
        assert_eq!(
            config.postgres,
            ConnectionConfig::new("10.0.0.5", 5433, "analytics", "etl", "hunter2")
        );
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = LoaderConfig::new();
        let result = config.apply_overrides_from(|key| {
            (key == ENV_PORT).then(|| "seventy".to_string())
        });
        assert!(matches!(result, Err(DatabaseError::ConfigError(_))));
    }

    #[test]
    fn test_password_is_masked() {
        let conn = ConnectionConfig::new("localhost", 5432, "db", "me", "hunter2");
        assert!(!format!("{:?}", conn).contains("hunter2"));
        assert!(!conn.to_string().contains("hunter2"));
        assert_eq!(conn.to_string(), "me:****@localhost:5432/db");
    }

    #[test]
    fn test_get_duckdb_path() {
        let config = LoaderConfig::duckdb("relative.duckdb");
        let base = Path::new("/workspace");
        assert_eq!(
            config.get_duckdb_path(base),
            PathBuf::from("/workspace/relative.duckdb")
        );

        let config = LoaderConfig::duckdb("/abs/file.duckdb");
        assert_eq!(
            config.get_duckdb_path(base),
            PathBuf::from("/abs/file.duckdb")
        );
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!(
            "duckdb".parse::<DatabaseBackendType>().unwrap(),
            DatabaseBackendType::DuckDB
        );
        assert_eq!(
            "PostgreSQL".parse::<DatabaseBackendType>().unwrap(),
            DatabaseBackendType::Postgres
        );
        assert!("sqlite".parse::<DatabaseBackendType>().is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = LoaderConfig::parse(sample_config()).unwrap();
        assert_eq!(config.database.backend, DatabaseBackendType::Postgres);
        assert_eq!(config.staging.dir_name, DEFAULT_STAGING_DIR_NAME);
    }
}
