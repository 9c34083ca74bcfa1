//! Advisories known to affect a recorded asset.

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::advisory::Advisory;
use crate::models::host_name::HostName;
use crate::models::ip_address::IpAddress;
use crate::models::open_port::OpenPort;
use crate::models::software::Software;
use crate::models::url::Url;
use crate::query::{text, Query};
use crate::record::{find_or_create, get_time, Importable, Record};

const ASSET_COLUMNS: [&str; 5] = [
    "ip_address_id",
    "host_name_id",
    "open_port_id",
    "url_id",
    "software_id",
];

/// The one asset a [`Vulnerability`] is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VulnerableAsset {
    IpAddress(i64),
    HostName(i64),
    OpenPort(i64),
    Url(i64),
    Software(i64),
}

impl VulnerableAsset {
    pub fn column(&self) -> &'static str {
        match self {
            VulnerableAsset::IpAddress(_) => "ip_address_id",
            VulnerableAsset::HostName(_) => "host_name_id",
            VulnerableAsset::OpenPort(_) => "open_port_id",
            VulnerableAsset::Url(_) => "url_id",
            VulnerableAsset::Software(_) => "software_id",
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            VulnerableAsset::IpAddress(id)
            | VulnerableAsset::HostName(id)
            | VulnerableAsset::OpenPort(id)
            | VulnerableAsset::Url(id)
            | VulnerableAsset::Software(id) => id,
        }
    }

    fn from_column(column: &str, id: i64) -> Option<Self> {
        Some(match column {
            "ip_address_id" => VulnerableAsset::IpAddress(id),
            "host_name_id" => VulnerableAsset::HostName(id),
            "open_port_id" => VulnerableAsset::OpenPort(id),
            "url_id" => VulnerableAsset::Url(id),
            "software_id" => VulnerableAsset::Software(id),
            _ => return None,
        })
    }

    /// Column values for the five asset columns, exactly one of them set.
    fn values(&self) -> [(&'static str, Value); 5] {
        ASSET_COLUMNS.map(|column| {
            let value = if column == self.column() {
                Value::Integer(self.id())
            } else {
                Value::Null
            };
            (column, value)
        })
    }
}

macro_rules! vulnerable_asset_from {
    ($($record:ident),* $(,)?) => {
        $(
            impl From<&$record> for VulnerableAsset {
                fn from(record: &$record) -> Self {
                    VulnerableAsset::$record(record.id)
                }
            }

            impl $record {
                /// Advisories recorded against this asset.
                pub fn vulnerabilities(&self, db: &Database) -> Result<Vec<Vulnerability>, DbError> {
                    Vulnerability::query().for_asset(VulnerableAsset::from(self)).all(db)
                }
            }
        )*
    };
}

vulnerable_asset_from!(IpAddress, HostName, OpenPort, Url, Software);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: i64,
    pub advisory_id: String,
    pub asset: VulnerableAsset,
    pub created_at: DateTime<Utc>,
}

impl Record for Vulnerability {
    const TABLE: &'static str = "dossier_vulnerabilities";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "advisory_id",
        "ip_address_id",
        "host_name_id",
        "open_port_id",
        "url_id",
        "software_id",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut asset = None;
        for column in ASSET_COLUMNS {
            if let Some(id) = row.get::<_, Option<i64>>(column)? {
                asset = VulnerableAsset::from_column(column, id);
                break;
            }
        }
        let asset = asset.ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(2, "ip_address_id".to_string(), Type::Null)
        })?;
        Ok(Self {
            id: row.get("id")?,
            advisory_id: row.get("advisory_id")?,
            asset,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Vulnerability {
    /// Record that the advisory `advisory_id` affects `asset`, importing the
    /// advisory if needed.
    pub fn record(
        db: &Database,
        advisory_id: &str,
        asset: impl Into<VulnerableAsset>,
    ) -> Result<Self, DbError> {
        let asset = asset.into();
        db.transaction(|db| {
            let advisory = Advisory::import(db, advisory_id)?;
            Self::link(db, &advisory, asset)
        })
    }

    pub fn link(db: &Database, advisory: &Advisory, asset: VulnerableAsset) -> Result<Self, DbError> {
        let mut values = vec![("advisory_id", text(advisory.id.as_str()))];
        values.extend(asset.values());
        find_or_create(
            db,
            Self::TABLE,
            &values,
            Self::query().for_advisory(&advisory.id).for_asset(asset),
        )
    }

    pub fn advisory(&self, db: &Database) -> Result<Advisory, DbError> {
        Advisory::get(db, self.advisory_id.clone())
    }
}

impl Query<Vulnerability> {
    pub fn for_advisory(self, advisory_id: &str) -> Self {
        self.where_eq("advisory_id", text(advisory_id.trim()))
    }

    pub fn for_asset(self, asset: VulnerableAsset) -> Self {
        self.where_eq(asset.column(), asset.id())
    }

    pub fn with_advisory_prefix(self, prefix: &str) -> Self {
        self.filter(
            "dossier_vulnerabilities.advisory_id IN (SELECT id FROM dossier_advisories WHERE prefix = ?)",
            [text(prefix)],
        )
    }
}

impl Advisory {
    pub fn vulnerabilities(&self, db: &Database) -> Result<Vec<Vulnerability>, DbError> {
        Vulnerability::query().for_advisory(&self.id).all(db)
    }
}
