//! SQLite connection management and the shared database handle.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use dossier_core::config::{DatabaseConfig, DossierConfig};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

use crate::error::DbError;
use crate::migrations::Migrator;

/// A handle on one SQLite connection.
///
/// Every model operation takes a `&Database`. A handle is `Send` but not
/// `Sync`; threads that write concurrently each open their own handle on the
/// same file and rely on SQLite's locking (plus the busy timeout) to
/// serialize writers.
pub struct Database {
    conn: Connection,
    depth: Cell<u32>,
    config: DatabaseConfig,
}

impl Database {
    /// Open (or create) the database described by `config`.
    pub fn open(config: &DatabaseConfig) -> Result<Self, DbError> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            let path = Path::new(&config.path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DbError::Migration(format!(
                        "failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            Connection::open(path)?
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if config.journal_wal && !config.is_in_memory() {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        let db = Self {
            conn,
            depth: Cell::new(0),
            config: config.clone(),
        };

        if config.auto_migrate {
            let applied = db.migrator().migrate()?;
            if applied > 0 {
                tracing::info!(path = %config.path, applied, "Applied pending migrations");
            }
        }

        tracing::info!(path = %config.path, "Opened Dossier database");
        Ok(db)
    }

    /// Open a private, fully migrated in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open(&DatabaseConfig::in_memory())
    }

    /// Open a database file with default settings.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, DbError> {
        Self::open(&DatabaseConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            ..Default::default()
        })
    }

    /// Load `dossier.toml` / `DOSSIER__*` settings and open the database.
    pub fn open_configured(file_prefix: &str) -> Result<Self, DbError> {
        let config = DossierConfig::load(file_prefix)?;
        Self::open(&config.database)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// The underlying rusqlite connection, for statements the models do not
    /// cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn migrator(&self) -> Migrator<'_> {
        Migrator::new(self)
    }

    /// Run `f` atomically.
    ///
    /// The outermost call opens an immediate transaction so the write lock is
    /// taken up front; nested calls open savepoints. An `Err` from `f` rolls
    /// back everything `f` wrote, and so does a panic unwinding out of `f`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let depth = self.depth.get();

        if depth == 0 {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
        } else {
            self.conn.execute_batch(&format!("SAVEPOINT {}", savepoint(depth)))?;
        }
        self.depth.set(depth + 1);

        let mut scope = TransactionScope {
            db: self,
            depth,
            returned: false,
        };
        let result = f(self);
        scope.returned = true;
        drop(scope);

        match result {
            Ok(value) => {
                if depth == 0 {
                    self.conn.execute_batch("COMMIT")?;
                } else {
                    self.conn.execute_batch(&format!("RELEASE {}", savepoint(depth)))?;
                }
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(error = %err, depth, "Rolling back transaction");
                self.roll_back(depth);
                Err(err)
            }
        }
    }

    fn roll_back(&self, depth: u32) {
        let rollback = if depth == 0 {
            self.conn.execute_batch("ROLLBACK")
        } else {
            let savepoint = savepoint(depth);
            self.conn
                .execute_batch(&format!("ROLLBACK TO {savepoint}; RELEASE {savepoint}"))
        };
        if let Err(e) = rollback {
            tracing::warn!(error = %e, depth, "Rollback failed");
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.depth.get() > 0
    }

    /// Execute one statement with positional parameters.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, DbError> {
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    /// Map every row of a query.
    pub fn query_rows<T>(
        &self,
        sql: &str,
        params: &[Value],
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, DbError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), map)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Map the first row of a query, if any.
    pub fn query_one<T>(
        &self,
        sql: &str,
        params: &[Value],
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, DbError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt
            .query_row(params_from_iter(params.iter()), map)
            .optional()?)
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }
}

/// Current time in the stored timestamp format.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 text, so that lexical order is chronological order.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn savepoint(depth: u32) -> String {
    format!("dossier_sp_{depth}")
}

/// Restores the nesting depth when a [`Database::transaction`] body ends.
/// If the body never returned it is unwinding, so its writes are rolled back
/// here.
struct TransactionScope<'a> {
    db: &'a Database,
    depth: u32,
    returned: bool,
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        self.db.depth.set(self.depth);
        if !self.returned {
            tracing::warn!(depth = self.depth, "Rolling back transaction after panic");
            self.db.roll_back(self.depth);
        }
    }
}
