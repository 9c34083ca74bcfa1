use chrono::{DateTime, Utc};
use dossier_core::validate::require_present;
use dossier_core::ValidationErrors;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::name_pools::SoftwareVendor;
use crate::models::open_port::OpenPort;
use crate::query::{text, Query};
use crate::record::{find_or_create, get_time, opt_int, validated, Importable, Record};

/// A named, versioned software product, optionally tied to a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub vendor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSoftware {
    pub vendor: Option<String>,
    pub name: String,
    pub version: String,
}

impl NewSoftware {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            vendor: None,
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }
}

impl Record for Software {
    const TABLE: &'static str = "dossier_softwares";
    const COLUMNS: &'static [&'static str] = &["id", "name", "version", "vendor_id", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            version: row.get("version")?,
            vendor_id: row.get("vendor_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

fn key_query(name: &str, version: &str, vendor_id: Option<i64>) -> Query<Software> {
    Software::query()
        .with_name(name)
        .with_version(version)
        .where_eq_nullable("vendor_id", opt_int(vendor_id))
}

impl Importable for Software {
    type Key = NewSoftware;

    fn lookup(db: &Database, key: &NewSoftware) -> Result<Option<Self>, DbError> {
        let vendor_id = match key.vendor.as_deref() {
            Some(vendor) => match SoftwareVendor::lookup(db, vendor)? {
                Some(vendor) => Some(vendor.id),
                None => return Ok(None),
            },
            None => None,
        };
        key_query(key.name.trim(), key.version.trim(), vendor_id).first(db)
    }

    fn import(db: &Database, key: &NewSoftware) -> Result<Self, DbError> {
        let name = key.name.trim();
        let version = key.version.trim();
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "name", name);
        require_present(&mut errors, "version", version);
        if key.vendor.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.add("vendor", "must not be blank");
        }
        validated(errors)?;

        db.transaction(|db| {
            let vendor_id = match key.vendor.as_deref() {
                Some(vendor) => Some(SoftwareVendor::import(db, vendor)?.id),
                None => None,
            };
            find_or_create(
                db,
                Self::TABLE,
                &[
                    ("name", text(name)),
                    ("version", text(version)),
                    ("vendor_id", opt_int(vendor_id)),
                ],
                key_query(name, version, vendor_id),
            )
        })
    }
}

impl Software {
    pub fn vendor(&self, db: &Database) -> Result<Option<SoftwareVendor>, DbError> {
        match self.vendor_id {
            Some(id) => SoftwareVendor::find(db, id),
            None => Ok(None),
        }
    }

    pub fn open_ports(&self, db: &Database) -> Result<Vec<OpenPort>, DbError> {
        OpenPort::query().where_eq("software_id", self.id).all(db)
    }

    /// Vendor, name, and version joined by spaces, e.g. `Apache httpd 2.4.57`.
    pub fn full_name(&self, db: &Database) -> Result<String, DbError> {
        Ok(match self.vendor(db)? {
            Some(vendor) => format!("{vendor} {self}"),
            None => self.to_string(),
        })
    }
}

/// Name and version; see [`Software::full_name`] for the vendor-qualified form.
impl std::fmt::Display for Software {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

impl Query<Software> {
    pub fn with_name(self, name: &str) -> Self {
        self.where_eq("name", text(name))
    }

    pub fn with_version(self, version: &str) -> Self {
        self.where_eq("version", text(version))
    }

    pub fn with_vendor_name(self, vendor: &str) -> Self {
        self.filter(
            "dossier_softwares.vendor_id IN (SELECT id FROM dossier_software_vendors WHERE name = ?)",
            [text(vendor.trim())],
        )
    }
}
