use chrono::{DateTime, Utc};
use dossier_core::net::mac_to_u64;
use dossier_core::validate::{check, is_mac_address};
use dossier_core::ValidationErrors;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::address::{lookup_by_address, validate_address, AddressRecord};
use crate::models::ip_address::IpAddress;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, validated, Importable, Record};

/// A six-octet hardware address, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacAddress {
    pub id: i64,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Record for MacAddress {
    const TABLE: &'static str = "dossier_mac_addresses";
    const COLUMNS: &'static [&'static str] = &["id", "address", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            address: row.get("address")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl AddressRecord for MacAddress {
    fn address_text(&self) -> String {
        self.address.clone()
    }

    fn canonicalize(address: &str) -> String {
        address.trim().to_ascii_lowercase()
    }
}

impl Importable for MacAddress {
    type Key = str;

    fn lookup(db: &Database, address: &str) -> Result<Option<Self>, DbError> {
        lookup_by_address(db, address)
    }

    fn import(db: &Database, address: &str) -> Result<Self, DbError> {
        let address = Self::canonicalize(address);
        let mut errors = ValidationErrors::new();
        validate_address(&mut errors, &address);
        if !address.is_empty() {
            check(
                &mut errors,
                "address",
                &address,
                is_mac_address,
                "must be a valid MAC address",
            );
        }
        validated(errors)?;

        find_or_create(
            db,
            Self::TABLE,
            &[("address", text(address.clone()))],
            Self::query().where_eq("address", text(address)),
        )
    }
}

impl MacAddress {
    /// The address as a big-endian integer of its six octets.
    pub fn to_i(&self) -> u64 {
        mac_to_u64(&self.address).unwrap_or_default()
    }

    pub fn ip_addresses(&self, db: &Database) -> Result<Vec<IpAddress>, DbError> {
        IpAddress::query().with_mac_address_id(self.id).all(db)
    }

    /// The IP address linked most recently.
    pub fn recent_ip_address(&self, db: &Database) -> Result<Option<IpAddress>, DbError> {
        let link = IpAddressMacAddress::query()
            .where_eq("mac_address_id", self.id)
            .newest_first()
            .first(db)?;
        match link {
            Some(link) => IpAddress::find(db, link.ip_address_id),
            None => Ok(None),
        }
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

impl Query<MacAddress> {
    pub fn with_ip_address(self, address: &str) -> Self {
        self.filter(
            "dossier_mac_addresses.id IN (
                SELECT l.mac_address_id FROM dossier_ip_address_mac_addresses l
                JOIN dossier_ip_addresses ip ON ip.id = l.ip_address_id
                WHERE ip.address = ?)",
            [text(IpAddress::canonicalize(address))],
        )
    }

    pub(crate) fn with_ip_address_id(self, ip_address_id: i64) -> Self {
        self.filter(
            "dossier_mac_addresses.id IN (
                SELECT mac_address_id FROM dossier_ip_address_mac_addresses WHERE ip_address_id = ?)",
            [int(ip_address_id)],
        )
    }
}

link_record!(
    /// An IP address observed with a MAC address.
    IpAddressMacAddress,
    "dossier_ip_address_mac_addresses",
    ip_address_id,
    mac_address_id
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_integer_value() {
        let db = Database::open_in_memory().unwrap();
        let mac = MacAddress::import(&db, "00:00:00:00:01:02").unwrap();
        assert_eq!(mac.to_i(), 0x0102);
        let found = MacAddress::lookup(&db, "00:00:00:00:01:02").unwrap().unwrap();
        assert_eq!(found, mac);
        assert_eq!(
            MacAddress::import(&db, "AA:BB:CC:DD:EE:FF").unwrap().to_i(),
            0xaabb_ccdd_eeff
        );
    }

    #[test]
    fn test_case_insensitive_identity() {
        let db = Database::open_in_memory().unwrap();
        let lower = MacAddress::import(&db, "aa:bb:cc:dd:ee:ff").unwrap();
        let upper = MacAddress::import(&db, "AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(lower.id, upper.id);
        assert_eq!(MacAddress::count(&db).unwrap(), 1);
    }

    #[test]
    fn test_rejects_bad_octets() {
        let db = Database::open_in_memory().unwrap();
        for bad in ["", "00-11-22-33-44-55", "00:11:22:33:44", "zz:11:22:33:44:55"] {
            let err = MacAddress::import(&db, bad).unwrap_err();
            assert!(err.validation_errors().unwrap().has("address"), "{bad}");
        }
        assert_eq!(MacAddress::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_ip_links() {
        let db = Database::open_in_memory().unwrap();
        let a = IpAddress::import(&db, "10.0.0.1").unwrap();
        let b = IpAddress::import(&db, "10.0.0.2").unwrap();
        let mac = a.add_mac_address(&db, "00:11:22:33:44:55").unwrap();
        b.add_mac_address(&db, "00:11:22:33:44:55").unwrap();

        assert_eq!(mac.ip_addresses(&db).unwrap(), vec![a, b.clone()]);
        assert_eq!(mac.recent_ip_address(&db).unwrap(), Some(b));
        assert_eq!(
            MacAddress::query()
                .with_ip_address("10.0.0.1")
                .all(&db)
                .unwrap(),
            vec![mac]
        );
    }
}
