//! Versioned schema migrations.
//!
//! The applied version lives in `PRAGMA user_version`. Each step runs in its
//! own transaction, so a failing step leaves the schema at the previous
//! version.

use crate::client::Database;
use crate::error::DbError;
use crate::schema;

/// One reversible schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Every migration, in version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_name_pools",
        up: schema::NAME_POOLS_UP,
        down: schema::NAME_POOLS_DOWN,
    },
    Migration {
        version: 2,
        name: "create_network_and_certs",
        up: schema::NETWORK_UP,
        down: schema::NETWORK_DOWN,
    },
    Migration {
        version: 3,
        name: "create_credentials_urls_and_http",
        up: schema::WEB_UP,
        down: schema::WEB_DOWN,
    },
    Migration {
        version: 4,
        name: "create_people_and_organizations",
        up: schema::PEOPLE_UP,
        down: schema::PEOPLE_DOWN,
    },
    Migration {
        version: 5,
        name: "create_advisories_vulns_and_notes",
        up: schema::FINDINGS_UP,
        down: schema::FINDINGS_DOWN,
    },
];

pub struct Migrator<'a> {
    db: &'a Database,
    migrations: &'static [Migration],
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            migrations: MIGRATIONS,
        }
    }

    pub fn current_version(&self) -> Result<u32, DbError> {
        let version: i64 = self
            .db
            .connection()
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version as u32)
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, |m| m.version)
    }

    pub fn needs_migration(&self) -> Result<bool, DbError> {
        Ok(self.current_version()? < self.latest_version())
    }

    pub fn migrations(&self) -> &'static [Migration] {
        self.migrations
    }

    /// Apply every pending migration. Returns how many were applied.
    pub fn migrate(&self) -> Result<usize, DbError> {
        self.up(self.latest_version())
    }

    /// Apply pending migrations up to and including `target`.
    pub fn up(&self, target: u32) -> Result<usize, DbError> {
        if target > self.latest_version() {
            return Err(DbError::Migration(format!(
                "unknown target version {target} (latest is {})",
                self.latest_version()
            )));
        }

        let current = self.current_version()?;
        let mut applied = 0;
        for migration in self
            .migrations
            .iter()
            .filter(|m| m.version > current && m.version <= target)
        {
            if self.apply(migration, Direction::Up)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Revert applied migrations until the schema is at `target`.
    pub fn down(&self, target: u32) -> Result<usize, DbError> {
        let current = self.current_version()?;
        let mut reverted = 0;
        for migration in self
            .migrations
            .iter()
            .rev()
            .filter(|m| m.version <= current && m.version > target)
        {
            if self.apply(migration, Direction::Down)? {
                reverted += 1;
            }
        }
        Ok(reverted)
    }

    /// Revert the last `steps` applied migrations.
    pub fn rollback(&self, steps: u32) -> Result<usize, DbError> {
        let current = self.current_version()?;
        self.down(current.saturating_sub(steps))
    }

    /// Run one step in its own write transaction. The version is re-read
    /// after the write lock is taken, so a step another handle already ran is
    /// skipped. Returns whether the step ran.
    fn apply(&self, migration: &Migration, direction: Direction) -> Result<bool, DbError> {
        let (sql, from, to) = match direction {
            Direction::Up => (migration.up, migration.version - 1, migration.version),
            Direction::Down => (migration.down, migration.version, migration.version - 1),
        };
        let ran = self
            .db
            .transaction(|db| {
                if Migrator::new(db).current_version()? != from {
                    return Ok(false);
                }
                db.connection().execute_batch(sql)?;
                db.connection().pragma_update(None, "user_version", to)?;
                Ok(true)
            })
            .map_err(|e| {
                DbError::Migration(format!("{} {}: {e}", direction.as_str(), migration.name))
            })?;

        if ran {
            tracing::info!(
                migration = migration.name,
                direction = direction.as_str(),
                version = to,
                "Applied migration"
            );
        } else {
            tracing::debug!(
                migration = migration.name,
                direction = direction.as_str(),
                "Migration already applied by another connection"
            );
        }
        Ok(ran)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_core::config::DatabaseConfig;

    fn unmigrated() -> Database {
        Database::open(&DatabaseConfig {
            auto_migrate: false,
            ..DatabaseConfig::in_memory()
        })
        .unwrap()
    }

    fn table_exists(db: &Database, name: &str) -> bool {
        db.query_one(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[name.to_string().into()],
            |_| Ok(()),
        )
        .unwrap()
        .is_some()
    }

    #[test]
    fn test_versions_are_sequential() {
        for (i, m) in MIGRATIONS.iter().enumerate() {
            assert_eq!(m.version as usize, i + 1);
        }
    }

    #[test]
    fn test_migrate_from_empty() {
        let db = unmigrated();
        let migrator = db.migrator();
        assert_eq!(migrator.current_version().unwrap(), 0);
        assert!(migrator.needs_migration().unwrap());

        assert_eq!(migrator.migrate().unwrap(), MIGRATIONS.len());
        assert_eq!(migrator.current_version().unwrap(), migrator.latest_version());
        assert!(!migrator.needs_migration().unwrap());
        assert!(table_exists(&db, "dossier_notes"));

        assert_eq!(migrator.migrate().unwrap(), 0);
    }

    #[test]
    fn test_up_down_and_rollback() {
        let db = unmigrated();
        let migrator = db.migrator();

        assert_eq!(migrator.up(2).unwrap(), 2);
        assert!(table_exists(&db, "dossier_ip_addresses"));
        assert!(!table_exists(&db, "dossier_urls"));

        migrator.migrate().unwrap();
        assert_eq!(migrator.rollback(2).unwrap(), 2);
        assert_eq!(migrator.current_version().unwrap(), 3);
        assert!(!table_exists(&db, "dossier_notes"));
        assert!(!table_exists(&db, "dossier_people"));
        assert!(table_exists(&db, "dossier_urls"));

        assert_eq!(migrator.down(0).unwrap(), 3);
        assert_eq!(migrator.current_version().unwrap(), 0);
        assert!(!table_exists(&db, "dossier_user_names"));
    }

    #[test]
    fn test_step_applied_elsewhere_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("dossier.db").to_string_lossy().into_owned(),
            auto_migrate: false,
            ..Default::default()
        };
        let first = Database::open(&config).unwrap();
        let second = Database::open(&config).unwrap();

        // Both handles see an empty schema before either migrates.
        assert_eq!(second.migrator().current_version().unwrap(), 0);
        assert_eq!(first.migrator().migrate().unwrap(), MIGRATIONS.len());

        let migrator = second.migrator();
        assert!(!migrator.apply(&MIGRATIONS[0], Direction::Up).unwrap());
        assert_eq!(migrator.migrate().unwrap(), 0);
        assert_eq!(migrator.current_version().unwrap(), migrator.latest_version());
    }

    #[test]
    fn test_unknown_target_rejected() {
        let db = unmigrated();
        let err = db.migrator().up(99).unwrap_err();
        assert!(matches!(err, DbError::Migration(_)));
    }
}
