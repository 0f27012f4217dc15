//! Database connection and lifecycle management

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

use super::schema::init_schema;
use crate::error::ScanError;

/// Shared SQLite handle injected into the ingestor and the query service.
///
/// Every clone shares one connection; statements serialize on its lock.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Database {
    /// Open (or create) the database and ensure the schema exists
    pub fn new(db_path: &str) -> Result<Self> {
        info!(path = %db_path, "Initializing database");

        if Path::new(db_path).exists() {
            let (_, size) = Self::file_size(db_path);
            info!(path = %db_path, size = %size, "Found existing database file");
        } else {
            info!(path = %db_path, "Creating new database file");
        }

        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!(directory = %parent.display(), "Creating database directory");
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        debug!(path = %db_path, "Opening SQLite connection");
        let conn = Connection::open(db_path)
            .map_err(|e| {
                error!(path = %db_path, error = %e, "Failed to open SQLite database");
                e
            })
            .context("Failed to open SQLite database")?;

        let sqlite_version: String = conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .unwrap_or_else(|_| "unknown".to_string());

        init_schema(&conn)?;

        let scan_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM scan_results", [], |row| row.get(0))
            .unwrap_or(0);

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_string(),
        };

        let (size_bytes, size_human) = db.get_db_size();
        info!(
            path = %db_path,
            size = %size_human,
            size_bytes = size_bytes,
            scans = scan_count,
            sqlite_version = %sqlite_version,
            "Database initialized successfully"
        );

        Ok(db)
    }

    /// Acquire the shared connection
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, ScanError> {
        self.conn.lock().map_err(|_| ScanError::LockPoisoned)
    }

    /// Round-trip a trivial statement to confirm the backend answers
    pub fn ping(&self) -> Result<(), ScanError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|source| ScanError::Persistence {
                context: "failed to ping database",
                source,
            })?;
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Get database file size
    pub fn get_db_size(&self) -> (u64, String) {
        Self::file_size(&self.db_path)
    }

    fn file_size(path: &str) -> (u64, String) {
        match std::fs::metadata(path) {
            Ok(metadata) => {
                let size = metadata.len();
                (size, Self::format_bytes(size))
            }
            Err(_) => (0, "0 B".to_string()),
        }
    }

    /// Format bytes into human-readable string
    pub(super) fn format_bytes(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }
}
