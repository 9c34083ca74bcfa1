use chrono::{DateTime, Utc};
use dossier_core::parse::EmailParts;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::address::{lookup_by_address, AddressRecord};
use crate::models::host_name::HostName;
use crate::models::ip_address::IpAddress;
use crate::models::name_pools::UserName;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, Importable, Record};

/// A `user@host` mailbox. Importing one also imports its user name and
/// host name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub id: i64,
    pub address: String,
    pub user_name_id: i64,
    pub host_name_id: i64,
    pub ip_address_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for EmailAddress {
    const TABLE: &'static str = "dossier_email_addresses";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "address",
        "user_name_id",
        "host_name_id",
        "ip_address_id",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            address: row.get("address")?,
            user_name_id: row.get("user_name_id")?,
            host_name_id: row.get("host_name_id")?,
            ip_address_id: row.get("ip_address_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl AddressRecord for EmailAddress {
    fn address_text(&self) -> String {
        self.address.clone()
    }

    fn canonicalize(address: &str) -> String {
        match EmailParts::parse(address) {
            Ok(parts) => parts.address,
            Err(_) => address.trim().to_string(),
        }
    }
}

impl Importable for EmailAddress {
    type Key = str;

    fn lookup(db: &Database, address: &str) -> Result<Option<Self>, DbError> {
        lookup_by_address(db, address)
    }

    fn import(db: &Database, address: &str) -> Result<Self, DbError> {
        let parts = EmailParts::parse(address)?;
        HostName::validate(&HostName::canonicalize(&parts.host))?;

        db.transaction(|db| {
            let user = UserName::import(db, &parts.user)?;
            let host = HostName::import(db, &parts.host)?;
            find_or_create(
                db,
                Self::TABLE,
                &[
                    ("address", text(parts.address.as_str())),
                    ("user_name_id", int(user.id)),
                    ("host_name_id", int(host.id)),
                ],
                Self::query().where_eq("address", text(parts.address.as_str())),
            )
        })
    }
}

impl EmailAddress {
    pub fn user_name(&self, db: &Database) -> Result<UserName, DbError> {
        UserName::get(db, self.user_name_id)
    }

    pub fn host_name(&self, db: &Database) -> Result<HostName, DbError> {
        HostName::get(db, self.host_name_id)
    }

    /// The mail server address, when known.
    pub fn ip_address(&self, db: &Database) -> Result<Option<IpAddress>, DbError> {
        match self.ip_address_id {
            Some(id) => IpAddress::find(db, id),
            None => Ok(None),
        }
    }

    pub fn set_ip_address(&mut self, db: &Database, address: &str) -> Result<IpAddress, DbError> {
        db.transaction(|db| {
            let ip = IpAddress::import(db, address)?;
            db.execute(
                "UPDATE dossier_email_addresses SET ip_address_id = ? WHERE id = ?",
                &[int(ip.id), int(self.id)],
            )?;
            self.ip_address_id = Some(ip.id);
            Ok(ip)
        })
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

impl Query<EmailAddress> {
    pub fn with_user_name(self, user: &str) -> Self {
        self.filter(
            "dossier_email_addresses.user_name_id IN (SELECT id FROM dossier_user_names WHERE name = ?)",
            [text(user.trim())],
        )
    }

    pub fn with_host_name(self, host: &str) -> Self {
        self.filter(
            "dossier_email_addresses.host_name_id IN (SELECT id FROM dossier_host_names WHERE name = ?)",
            [text(HostName::canonicalize(host))],
        )
    }
}
