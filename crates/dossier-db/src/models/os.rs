//! Operating systems and per-address OS guesses.

use chrono::{DateTime, Utc};
use dossier_core::types::OsFlavor;
use dossier_core::validate::require_present;
use dossier_core::ValidationErrors;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::ip_address::IpAddress;
use crate::query::{int, text, Query};
use crate::record::{
    enum_text, find_or_create, get_opt_enum, get_time, opt_enum_text, validated, Importable, Record,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Os {
    pub id: i64,
    pub name: String,
    pub flavor: Option<OsFlavor>,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOs {
    pub name: String,
    pub flavor: Option<OsFlavor>,
    pub version: String,
}

impl NewOs {
    pub fn new(name: impl Into<String>, flavor: Option<OsFlavor>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flavor,
            version: version.into(),
        }
    }
}

impl Record for Os {
    const TABLE: &'static str = "dossier_oses";
    const COLUMNS: &'static [&'static str] = &["id", "name", "flavor", "version", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            flavor: get_opt_enum(row, "flavor", "os flavor")?,
            version: row.get("version")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Identified by name and version. The flavor of an existing row is kept.
impl Importable for Os {
    type Key = NewOs;

    fn lookup(db: &Database, key: &NewOs) -> Result<Option<Self>, DbError> {
        Self::query()
            .with_name(key.name.trim())
            .with_version(key.version.trim())
            .first(db)
    }

    fn import(db: &Database, key: &NewOs) -> Result<Self, DbError> {
        let name = key.name.trim();
        let version = key.version.trim();
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "name", name);
        require_present(&mut errors, "version", version);
        validated(errors)?;

        find_or_create(
            db,
            Self::TABLE,
            &[
                ("name", text(name)),
                ("flavor", opt_enum_text(key.flavor.as_ref())),
                ("version", text(version)),
            ],
            Self::query().with_name(name).with_version(version),
        )
    }
}

impl Os {
    pub fn linux(db: &Database, version: &str) -> Result<Self, DbError> {
        Self::import(db, &NewOs::new("Linux", Some(OsFlavor::Linux), version))
    }

    pub fn freebsd(db: &Database, version: &str) -> Result<Self, DbError> {
        Self::import(db, &NewOs::new("FreeBSD", Some(OsFlavor::Bsd), version))
    }

    pub fn openbsd(db: &Database, version: &str) -> Result<Self, DbError> {
        Self::import(db, &NewOs::new("OpenBSD", Some(OsFlavor::Bsd), version))
    }

    pub fn netbsd(db: &Database, version: &str) -> Result<Self, DbError> {
        Self::import(db, &NewOs::new("NetBSD", Some(OsFlavor::Bsd), version))
    }

    pub fn windows(db: &Database, version: &str) -> Result<Self, DbError> {
        Self::import(db, &NewOs::new("Windows", None, version))
    }

    pub fn is_linux(&self) -> bool {
        self.flavor == Some(OsFlavor::Linux)
    }

    pub fn is_bsd(&self) -> bool {
        self.flavor == Some(OsFlavor::Bsd)
    }

    /// Addresses guessed to run this OS.
    pub fn ip_addresses(&self, db: &Database) -> Result<Vec<IpAddress>, DbError> {
        IpAddress::query()
            .filter(
                "dossier_ip_addresses.id IN (SELECT ip_address_id FROM dossier_os_guesses WHERE os_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

impl Query<Os> {
    pub fn with_name(self, name: &str) -> Self {
        self.where_eq("name", text(name))
    }

    pub fn with_version(self, version: &str) -> Self {
        self.where_eq("version", text(version))
    }

    pub fn with_flavor(self, flavor: OsFlavor) -> Self {
        self.where_eq("flavor", enum_text(&flavor))
    }
}

link_record!(
    /// An OS fingerprint match for an IP address.
    OsGuess,
    "dossier_os_guesses",
    ip_address_id,
    os_id
);

impl OsGuess {
    pub fn os(&self, db: &Database) -> Result<Os, DbError> {
        Os::get(db, self.os_id)
    }

    pub fn ip_address(&self, db: &Database) -> Result<IpAddress, DbError> {
        IpAddress::get(db, self.ip_address_id)
    }
}
