//! Autonomous system number allocations over an address range.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use dossier_core::net::{hton, ip_version};
use dossier_core::validate::{check_optional, is_country_code};
use dossier_core::ValidationErrors;
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::ip_address::IpAddress;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, opt_text, validated, Importable, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asn {
    pub id: i64,
    pub version: u8,
    pub range_start: IpAddr,
    pub range_end: IpAddr,
    pub range_start_hton: Vec<u8>,
    pub range_end_hton: Vec<u8>,
    pub number: u32,
    pub country_code: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The natural key of an allocation plus its optional registry details.
/// Lookups match on range and number only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsn {
    pub range_start: IpAddr,
    pub range_end: IpAddr,
    pub number: u32,
    pub country_code: Option<String>,
    pub name: Option<String>,
}

impl NewAsn {
    pub fn new(range_start: IpAddr, range_end: IpAddr, number: u32) -> Self {
        Self {
            range_start,
            range_end,
            number,
            country_code: None,
            name: None,
        }
    }

    pub fn country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.range_start.is_ipv4() != self.range_end.is_ipv4() {
            errors.add("range_end", "must be in the same address family as range_start");
        } else if hton(&self.range_start) > hton(&self.range_end) {
            errors.add("range_end", "must not precede range_start");
        }
        check_optional(
            &mut errors,
            "country_code",
            self.country_code.as_deref(),
            is_country_code,
            "must be two uppercase letters",
        );
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.add("name", "must not be blank");
        }
        errors.into_result()
    }
}

fn get_ip(row: &Row<'_>, column: &str) -> rusqlite::Result<IpAddr> {
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e| {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

impl Record for Asn {
    const TABLE: &'static str = "dossier_asns";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "version",
        "range_start",
        "range_end",
        "range_start_hton",
        "range_end_hton",
        "number",
        "country_code",
        "name",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            version: row.get("version")?,
            range_start: get_ip(row, "range_start")?,
            range_end: get_ip(row, "range_end")?,
            range_start_hton: row.get("range_start_hton")?,
            range_end_hton: row.get("range_end_hton")?,
            number: row.get("number")?,
            country_code: row.get("country_code")?,
            name: row.get("name")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Importable for Asn {
    type Key = NewAsn;

    fn lookup(db: &Database, key: &NewAsn) -> Result<Option<Self>, DbError> {
        Self::query()
            .where_eq("range_start", text(key.range_start.to_string()))
            .where_eq("range_end", text(key.range_end.to_string()))
            .with_number(key.number)
            .first(db)
    }

    fn import(db: &Database, key: &NewAsn) -> Result<Self, DbError> {
        key.validate()?;
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("version", int(ip_version(&key.range_start))),
                ("range_start", text(key.range_start.to_string())),
                ("range_end", text(key.range_end.to_string())),
                ("range_start_hton", Value::Blob(hton(&key.range_start))),
                ("range_end_hton", Value::Blob(hton(&key.range_end))),
                ("number", int(key.number)),
                ("country_code", opt_text(key.country_code.as_deref())),
                ("name", opt_text(key.name.as_deref().map(str::trim))),
            ],
            Self::query()
                .where_eq("range_start", text(key.range_start.to_string()))
                .where_eq("range_end", text(key.range_end.to_string()))
                .with_number(key.number),
        )
    }
}

impl Asn {
    pub fn range(&self) -> (IpAddr, IpAddr) {
        (self.range_start, self.range_end)
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        if ip_version(&ip) != self.version {
            return false;
        }
        let encoded = hton(&ip);
        self.range_start_hton <= encoded && encoded <= self.range_end_hton
    }

    /// Stored addresses inside this range.
    pub fn ip_addresses(&self, db: &Database) -> Result<Vec<IpAddress>, DbError> {
        IpAddress::query()
            .between(self.range_start, self.range_end)
            .all(db)
    }
}

impl std::fmt::Display for Asn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AS{}", self.number)
    }
}

impl Query<Asn> {
    pub fn v4(self) -> Self {
        self.where_eq("version", 4)
    }

    pub fn v6(self) -> Self {
        self.where_eq("version", 6)
    }

    pub fn with_number(self, number: u32) -> Self {
        self.where_eq("number", int(number))
    }

    pub fn with_country_code(self, code: &str) -> Self {
        self.where_eq("country_code", text(code))
    }

    pub fn with_name(self, name: &str) -> Self {
        self.where_eq("name", text(name))
    }

    pub fn containing_ip(self, ip: IpAddr) -> Self {
        let encoded = hton(&ip);
        self.filter(
            "dossier_asns.version = ? AND dossier_asns.range_start_hton <= ? \
             AND dossier_asns.range_end_hton >= ?",
            [
                int(ip_version(&ip)),
                Value::Blob(encoded.clone()),
                Value::Blob(encoded),
            ],
        )
    }

    /// Narrowest allocation first: the greatest range start wins.
    pub fn most_specific(self) -> Self {
        self.order_by("dossier_asns.range_start_hton DESC")
            .order_by("dossier_asns.range_end_hton ASC")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_import_and_containment() {
        let db = Database::open_in_memory().unwrap();
        let key = NewAsn::new(ip("10.0.0.0"), ip("10.255.255.255"), 64_512)
            .country_code("US")
            .name("Example Transit");
        let asn = Asn::import(&db, &key).unwrap();
        assert_eq!(Asn::import(&db, &key).unwrap(), asn);
        assert_eq!(asn.to_string(), "AS64512");
        assert!(asn.contains(ip("10.0.0.9")));
        assert!(!asn.contains(ip("11.0.0.0")));
        assert!(!asn.contains(ip("::1")));
        assert_eq!(asn.range(), (ip("10.0.0.0"), ip("10.255.255.255")));
    }

    #[test]
    fn test_validation() {
        let db = Database::open_in_memory().unwrap();
        let reversed = NewAsn::new(ip("10.0.0.9"), ip("10.0.0.1"), 1);
        assert!(Asn::import(&db, &reversed)
            .unwrap_err()
            .validation_errors()
            .unwrap()
            .has("range_end"));

        let mixed = NewAsn::new(ip("10.0.0.1"), ip("::1"), 1);
        assert!(Asn::import(&db, &mixed).unwrap_err().is_validation());

        let bad_country = NewAsn::new(ip("10.0.0.1"), ip("10.0.0.2"), 1).country_code("usa");
        assert!(Asn::import(&db, &bad_country)
            .unwrap_err()
            .validation_errors()
            .unwrap()
            .has("country_code"));
    }

    #[test]
    fn test_ip_address_resolves_most_specific_asn() {
        let db = Database::open_in_memory().unwrap();
        Asn::import(&db, &NewAsn::new(ip("10.0.0.0"), ip("10.255.255.255"), 100)).unwrap();
        let narrow =
            Asn::import(&db, &NewAsn::new(ip("10.0.0.0"), ip("10.0.0.255"), 200)).unwrap();
        let nested =
            Asn::import(&db, &NewAsn::new(ip("10.0.0.128"), ip("10.0.0.255"), 300)).unwrap();

        let inside = IpAddress::import(&db, "10.0.0.200").unwrap();
        assert_eq!(inside.asn(&db).unwrap(), Some(nested));
        let lower = IpAddress::import(&db, "10.0.0.9").unwrap();
        assert_eq!(lower.asn(&db).unwrap(), Some(narrow));
        let outside = IpAddress::import(&db, "192.168.0.1").unwrap();
        assert!(outside.asn(&db).unwrap().is_none());

        assert_eq!(Asn::query().containing_ip(ip("10.1.0.0")).count(&db).unwrap(), 1);
        assert_eq!(Asn::query().v4().with_number(200).count(&db).unwrap(), 1);
    }
}
