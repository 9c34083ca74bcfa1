//! DNS host names.

use chrono::{DateTime, Utc};
use dossier_core::validate::{is_host_name, MAX_HOST_NAME_LEN};
use dossier_core::ValidationErrors;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::address::AddressRecord;
use crate::models::email_address::EmailAddress;
use crate::models::ip_address::IpAddress;
use crate::models::url::Url;
use crate::query::{int, like_escape, text, Query};
use crate::record::{
    find_or_create, get_opt_time, get_time, validated, Importable, LastScannedAt, Record,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostName {
    pub id: i64,
    pub name: String,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for HostName {
    const TABLE: &'static str = "dossier_host_names";
    const COLUMNS: &'static [&'static str] = &["id", "name", "last_scanned_at", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            last_scanned_at: get_opt_time(row, "last_scanned_at")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl LastScannedAt for HostName {
    fn last_scanned_at(&self) -> Option<DateTime<Utc>> {
        self.last_scanned_at
    }

    fn set_last_scanned_at(&mut self, at: DateTime<Utc>) {
        self.last_scanned_at = Some(at);
    }
}

impl Importable for HostName {
    type Key = str;

    fn lookup(db: &Database, name: &str) -> Result<Option<Self>, DbError> {
        Self::query()
            .where_eq("name", text(Self::canonicalize(name)))
            .first(db)
    }

    fn import(db: &Database, name: &str) -> Result<Self, DbError> {
        let name = Self::canonicalize(name);
        Self::validate(&name)?;
        find_or_create(
            db,
            Self::TABLE,
            &[("name", text(name.clone()))],
            Self::query().where_eq("name", text(name)),
        )
    }
}

impl HostName {
    /// Host names compare case-insensitively and a fully qualified spelling
    /// names the same host, so store them lowercase without the root dot.
    pub fn canonicalize(name: &str) -> String {
        let name = name.trim();
        name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
    }

    /// Check a name already passed through [`canonicalize`](Self::canonicalize).
    pub fn validate(name: &str) -> Result<(), DbError> {
        let mut errors = ValidationErrors::new();
        if name.is_empty() {
            errors.add("name", "must be present");
        } else if name.len() > MAX_HOST_NAME_LEN {
            errors.add(
                "name",
                format!("must be at most {MAX_HOST_NAME_LEN} characters"),
            );
        } else if name.ends_with('.') || !is_host_name(name) {
            errors.add("name", "must be a valid host name");
        }
        validated(errors)
    }

    /// The last label, without a trailing dot.
    pub fn tld(&self) -> &str {
        let name = self.name.trim_end_matches('.');
        name.rsplit('.').next().unwrap_or(name)
    }

    pub fn ip_addresses(&self, db: &Database) -> Result<Vec<IpAddress>, DbError> {
        IpAddress::query().with_host_name_id(self.id).all(db)
    }

    /// The IP address linked most recently.
    pub fn recent_ip_address(&self, db: &Database) -> Result<Option<IpAddress>, DbError> {
        let link = HostNameIpAddress::query()
            .where_eq("host_name_id", self.id)
            .newest_first()
            .first(db)?;
        match link {
            Some(link) => IpAddress::find(db, link.ip_address_id),
            None => Ok(None),
        }
    }

    pub fn urls(&self, db: &Database) -> Result<Vec<Url>, DbError> {
        Url::query().where_eq("host_name_id", self.id).all(db)
    }

    pub fn email_addresses(&self, db: &Database) -> Result<Vec<EmailAddress>, DbError> {
        EmailAddress::query().where_eq("host_name_id", self.id).all(db)
    }

    pub fn add_ip_address(&self, db: &Database, address: &str) -> Result<IpAddress, DbError> {
        db.transaction(|db| {
            let ip = IpAddress::import(db, address)?;
            HostNameIpAddress::link(db, self.id, ip.id)?;
            Ok(ip)
        })
    }
}

impl std::fmt::Display for HostName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Query<HostName> {
    pub fn with_name(self, name: &str) -> Self {
        self.where_eq("name", text(HostName::canonicalize(name)))
    }

    /// Names ending in `.tld`.
    pub fn with_tld(self, tld: &str) -> Self {
        let tld = HostName::canonicalize(tld);
        let tld = tld.trim_start_matches('.');
        self.filter(
            "dossier_host_names.name LIKE ? ESCAPE '\\'",
            [text(format!("%.{}", like_escape(tld)))],
        )
    }

    /// The domain itself or any name beneath it.
    pub fn with_domain(self, domain: &str) -> Self {
        let domain = HostName::canonicalize(domain);
        let domain = domain.trim_start_matches('.');
        self.filter(
            "dossier_host_names.name = ? OR dossier_host_names.name LIKE ? ESCAPE '\\'",
            [
                text(domain),
                text(format!("%.{}", like_escape(domain))),
            ],
        )
    }

    pub fn with_ip_address(self, address: &str) -> Self {
        self.filter(
            "dossier_host_names.id IN (
                SELECT l.host_name_id FROM dossier_host_name_ip_addresses l
                JOIN dossier_ip_addresses ip ON ip.id = l.ip_address_id
                WHERE ip.address = ?)",
            [text(IpAddress::canonicalize(address))],
        )
    }

    pub(crate) fn with_ip_address_id(self, ip_address_id: i64) -> Self {
        self.filter(
            "dossier_host_names.id IN (
                SELECT host_name_id FROM dossier_host_name_ip_addresses WHERE ip_address_id = ?)",
            [int(ip_address_id)],
        )
    }

    /// Names resolving to an address with an open port of the given number.
    pub fn with_port_number(self, number: u16) -> Self {
        self.filter(
            "dossier_host_names.id IN (
                SELECT l.host_name_id FROM dossier_host_name_ip_addresses l
                JOIN dossier_open_ports o ON o.ip_address_id = l.ip_address_id
                JOIN dossier_ports p ON p.id = o.port_id
                WHERE p.number = ?)",
            [int(number)],
        )
    }
}

link_record!(
    /// A host name observed resolving to an IP address.
    HostNameIpAddress,
    "dossier_host_name_ip_addresses",
    host_name_id,
    ip_address_id
);
