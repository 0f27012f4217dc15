use clap::{Parser, Subcommand, ValueEnum};

// ============================================
// Environment variable name constants
// ============================================
pub mod env {
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const STORAGE_PATH: &str = "STORAGE_PATH";
    pub const DATABASE_FILE: &str = "DATABASE_FILE";
}

/// In-memory database sentinel understood by SQLite
pub const IN_MEMORY_DB: &str = ":memory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Compact human-readable lines
    Pretty,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show version information
    Version,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vulnboard",
    version,
    about = "Vulnerability scan ingestion and query service",
    long_about = "Receives batches of container scan results over HTTP, stores them in SQLite and serves filtered listings, statistics and trends for dashboards."
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log format: json or pretty
    #[arg(long, env = env::LOG_FORMAT, value_enum, default_value = "json")]
    pub log_format: LogFormat,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = env::LOG_LEVEL, default_value = "info")]
    pub log_level: String,

    /// API server port
    #[arg(long, env = env::SERVER_PORT, default_value = "8000")]
    pub server_port: u16,

    /// Directory holding the SQLite database file
    #[arg(long, env = env::STORAGE_PATH, default_value = "/data")]
    pub storage_path: String,

    /// SQLite database file name (":memory:" keeps everything in RAM)
    #[arg(long, env = env::DATABASE_FILE, default_value = "vulnboard.db")]
    pub database_file: String,
}

impl Config {
    pub fn from_args() -> Self {
        Config::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server_port == 0 {
            return Err(format!("{} must be a non-zero port", env::SERVER_PORT));
        }
        if self.database_file.trim().is_empty() {
            return Err(format!("{} must not be empty", env::DATABASE_FILE));
        }
        Ok(())
    }

    /// Get SQLite database path
    pub fn get_db_path(&self) -> String {
        if self.database_file == IN_MEMORY_DB {
            return IN_MEMORY_DB.to_string();
        }
        format!(
            "{}/{}",
            self.storage_path.trim_end_matches('/'),
            self.database_file
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> Config {
        Config {
            command: None,
            log_format: LogFormat::Json,
            log_level: "info".to_string(),
            server_port: 8000,
            storage_path: "/data".to_string(),
            database_file: "vulnboard.db".to_string(),
        }
    }

    #[test]
    fn test_validate_defaults() {
        assert!(default_config().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = default_config();
        config.server_port = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            "SERVER_PORT must be a non-zero port"
        );
    }

    #[test]
    fn test_validate_empty_database_file() {
        let mut config = default_config();
        config.database_file = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_db_path() {
        assert_eq!(default_config().get_db_path(), "/data/vulnboard.db");
    }

    #[test]
    fn test_get_db_path_trailing_slash() {
        let mut config = default_config();
        config.storage_path = "/tmp/custom/".to_string();
        assert_eq!(config.get_db_path(), "/tmp/custom/vulnboard.db");
    }

    #[test]
    fn test_get_db_path_in_memory() {
        let mut config = default_config();
        config.database_file = IN_MEMORY_DB.to_string();
        assert_eq!(config.get_db_path(), ":memory:");
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "vulnboard",
            "--log-format",
            "pretty",
            "--server-port",
            "9000",
        ])
        .expect("args should parse");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.server_port, 9000);
    }

    #[test]
    fn test_log_format_display() {
        assert_eq!(LogFormat::Json.to_string(), "json");
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }
}
