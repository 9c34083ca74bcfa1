//! IPv4 and IPv6 addresses.
//!
//! Each row carries the network-byte-order encoding of its address (`hton`),
//! so range scopes compare addresses numerically within a family.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use dossier_core::net::{hton, ip_to_u128, ip_version, net_bounds};
use dossier_core::types::Protocol;
use ipnet::IpNet;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::address::AddressRecord;
use crate::models::asn::Asn;
use crate::models::host_name::{HostName, HostNameIpAddress};
use crate::models::mac_address::{IpAddressMacAddress, MacAddress};
use crate::models::open_port::OpenPort;
use crate::models::os::{Os, OsGuess};
use crate::models::port::Port;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_opt_time, get_time, Importable, LastScannedAt, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: i64,
    pub address: IpAddr,
    pub version: u8,
    pub hton: Vec<u8>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for IpAddress {
    const TABLE: &'static str = "dossier_ip_addresses";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "address",
        "version",
        "hton",
        "last_scanned_at",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw: String = row.get("address")?;
        let address = raw.parse::<IpAddr>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get("id")?,
            address,
            version: row.get("version")?,
            hton: row.get("hton")?,
            last_scanned_at: get_opt_time(row, "last_scanned_at")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl AddressRecord for IpAddress {
    fn address_text(&self) -> String {
        self.address.to_string()
    }

    fn canonicalize(address: &str) -> String {
        let address = address.trim();
        address
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| address.to_string())
    }
}

impl LastScannedAt for IpAddress {
    fn last_scanned_at(&self) -> Option<DateTime<Utc>> {
        self.last_scanned_at
    }

    fn set_last_scanned_at(&mut self, at: DateTime<Utc>) {
        self.last_scanned_at = Some(at);
    }
}

fn parse_ip(address: &str) -> Result<IpAddr, DbError> {
    address
        .trim()
        .parse()
        .map_err(|_| DbError::invalid("address", "is not a valid IP address"))
}

impl Importable for IpAddress {
    type Key = str;

    fn lookup(db: &Database, address: &str) -> Result<Option<Self>, DbError> {
        match address.trim().parse::<IpAddr>() {
            Ok(ip) => Self::lookup_ip(db, ip),
            Err(_) => Ok(None),
        }
    }

    fn import(db: &Database, address: &str) -> Result<Self, DbError> {
        Self::import_ip(db, parse_ip(address)?)
    }
}

impl IpAddress {
    pub fn lookup_ip(db: &Database, ip: IpAddr) -> Result<Option<Self>, DbError> {
        Self::query().where_eq("address", text(ip.to_string())).first(db)
    }

    pub fn import_ip(db: &Database, ip: IpAddr) -> Result<Self, DbError> {
        let address = ip.to_string();
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("address", text(address.clone())),
                ("version", int(ip_version(&ip))),
                ("hton", Value::Blob(hton(&ip))),
            ],
            Self::query().where_eq("address", text(address)),
        )
    }

    pub fn to_ip(&self) -> IpAddr {
        self.address
    }

    /// The address as an unsigned integer.
    pub fn to_i(&self) -> u128 {
        ip_to_u128(&self.address)
    }

    pub fn is_v4(&self) -> bool {
        self.address.is_ipv4()
    }

    pub fn is_v6(&self) -> bool {
        self.address.is_ipv6()
    }

    pub fn mac_addresses(&self, db: &Database) -> Result<Vec<MacAddress>, DbError> {
        MacAddress::query().with_ip_address_id(self.id).all(db)
    }

    pub fn host_names(&self, db: &Database) -> Result<Vec<HostName>, DbError> {
        HostName::query().with_ip_address_id(self.id).all(db)
    }

    pub fn open_ports(&self, db: &Database) -> Result<Vec<OpenPort>, DbError> {
        OpenPort::query().where_eq("ip_address_id", self.id).all(db)
    }

    pub fn ports(&self, db: &Database) -> Result<Vec<Port>, DbError> {
        Port::query()
            .filter(
                "dossier_ports.id IN (SELECT port_id FROM dossier_open_ports WHERE ip_address_id = ?)",
                [int(self.id)],
            )
            .order_by("dossier_ports.number")
            .all(db)
    }

    pub fn os_guesses(&self, db: &Database) -> Result<Vec<OsGuess>, DbError> {
        OsGuess::query().where_eq("ip_address_id", self.id).all(db)
    }

    /// The MAC address linked most recently.
    pub fn recent_mac_address(&self, db: &Database) -> Result<Option<MacAddress>, DbError> {
        let link = IpAddressMacAddress::query()
            .where_eq("ip_address_id", self.id)
            .newest_first()
            .first(db)?;
        match link {
            Some(link) => MacAddress::find(db, link.mac_address_id),
            None => Ok(None),
        }
    }

    /// The host name linked most recently.
    pub fn recent_host_name(&self, db: &Database) -> Result<Option<HostName>, DbError> {
        let link = HostNameIpAddress::query()
            .where_eq("ip_address_id", self.id)
            .newest_first()
            .first(db)?;
        match link {
            Some(link) => HostName::find(db, link.host_name_id),
            None => Ok(None),
        }
    }

    /// The operating system guessed most recently.
    pub fn recent_os_guess(&self, db: &Database) -> Result<Option<Os>, DbError> {
        let guess = OsGuess::query()
            .where_eq("ip_address_id", self.id)
            .newest_first()
            .first(db)?;
        match guess {
            Some(guess) => Os::find(db, guess.os_id),
            None => Ok(None),
        }
    }

    /// The most specific ASN range containing this address.
    pub fn asn(&self, db: &Database) -> Result<Option<Asn>, DbError> {
        Asn::query().containing_ip(self.address).most_specific().first(db)
    }

    pub fn add_mac_address(&self, db: &Database, address: &str) -> Result<MacAddress, DbError> {
        db.transaction(|db| {
            let mac = MacAddress::import(db, address)?;
            IpAddressMacAddress::link(db, self.id, mac.id)?;
            Ok(mac)
        })
    }

    pub fn add_host_name(&self, db: &Database, name: &str) -> Result<HostName, DbError> {
        db.transaction(|db| {
            let host = HostName::import(db, name)?;
            HostNameIpAddress::link(db, host.id, self.id)?;
            Ok(host)
        })
    }

    pub fn add_os_guess(&self, db: &Database, os: &Os) -> Result<OsGuess, DbError> {
        OsGuess::link(db, self.id, os.id)
    }
}

impl std::fmt::Display for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl Query<IpAddress> {
    pub fn v4(self) -> Self {
        self.where_eq("version", 4)
    }

    pub fn v6(self) -> Self {
        self.where_eq("version", 6)
    }

    /// Addresses from `first` to `last` inclusive, compared in network byte
    /// order. Bounds of different families match nothing.
    pub fn between(self, first: IpAddr, last: IpAddr) -> Self {
        if first.is_ipv4() != last.is_ipv4() {
            return self.filter("0", []);
        }
        self.filter(
            "dossier_ip_addresses.version = ? AND dossier_ip_addresses.hton BETWEEN ? AND ?",
            [
                int(ip_version(&first)),
                Value::Blob(hton(&first)),
                Value::Blob(hton(&last)),
            ],
        )
    }

    /// Addresses inside a network, e.g. `10.0.0.0/24`.
    pub fn in_range(self, net: &IpNet) -> Self {
        let (first, last) = net_bounds(net);
        self.between(first, last)
    }

    pub fn with_mac_address(self, address: &str) -> Self {
        self.filter(
            "dossier_ip_addresses.id IN (
                SELECT l.ip_address_id FROM dossier_ip_address_mac_addresses l
                JOIN dossier_mac_addresses m ON m.id = l.mac_address_id
                WHERE m.address = ?)",
            [text(MacAddress::canonicalize(address))],
        )
    }

    pub fn with_host_name(self, name: &str) -> Self {
        self.join(
            "JOIN dossier_host_name_ip_addresses \
             ON dossier_host_name_ip_addresses.ip_address_id = dossier_ip_addresses.id",
        )
        .join(
            "JOIN dossier_host_names \
             ON dossier_host_names.id = dossier_host_name_ip_addresses.host_name_id",
        )
        .filter("dossier_host_names.name = ?", [text(HostName::canonicalize(name))])
    }

    pub(crate) fn with_host_name_id(self, host_name_id: i64) -> Self {
        self.filter(
            "dossier_ip_addresses.id IN (
                SELECT ip_address_id FROM dossier_host_name_ip_addresses WHERE host_name_id = ?)",
            [int(host_name_id)],
        )
    }

    pub(crate) fn with_mac_address_id(self, mac_address_id: i64) -> Self {
        self.filter(
            "dossier_ip_addresses.id IN (
                SELECT ip_address_id FROM dossier_ip_address_mac_addresses WHERE mac_address_id = ?)",
            [int(mac_address_id)],
        )
    }

    /// Addresses with an open port of the given number.
    pub fn with_port_number(self, number: u16) -> Self {
        self.filter(
            "dossier_ip_addresses.id IN (
                SELECT o.ip_address_id FROM dossier_open_ports o
                JOIN dossier_ports p ON p.id = o.port_id
                WHERE p.number = ?)",
            [int(number)],
        )
    }

    /// Addresses with an open port of the given protocol.
    pub fn with_protocol(self, protocol: Protocol) -> Self {
        self.filter(
            "dossier_ip_addresses.id IN (
                SELECT o.ip_address_id FROM dossier_open_ports o
                JOIN dossier_ports p ON p.id = o.port_id
                WHERE p.protocol = ?)",
            [text(protocol.as_ref())],
        )
    }

    /// Addresses with an OS guess of the given name.
    pub fn with_os_name(self, name: &str) -> Self {
        self.filter(
            "dossier_ip_addresses.id IN (
                SELECT g.ip_address_id FROM dossier_os_guesses g
                JOIN dossier_oses os ON os.id = g.os_id
                WHERE os.name = ?)",
            [text(name)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_import_derives_version_and_hton() {
        let db = db();
        let v4 = IpAddress::import(&db, "10.0.0.9").unwrap();
        assert_eq!(v4.version, 4);
        assert_eq!(v4.hton, vec![10, 0, 0, 9]);
        assert!(v4.is_v4());
        assert_eq!(v4.to_i(), 0x0A00_0009);

        let v6 = IpAddress::import(&db, "2001:DB8::1").unwrap();
        assert_eq!(v6.version, 6);
        assert_eq!(v6.hton.len(), 16);
        assert_eq!(v6.to_string(), "2001:db8::1");
        assert_eq!(
            IpAddress::lookup(&db, "2001:db8:0::1").unwrap().unwrap().id,
            v6.id
        );
    }

    #[test]
    fn test_invalid_literal_is_validation_error() {
        let db = db();
        let err = IpAddress::import(&db, "10.0.0.256").unwrap_err();
        assert!(err.validation_errors().unwrap().has("address"));
        assert!(IpAddress::lookup(&db, "10.0.0.256").unwrap().is_none());
    }

    #[test]
    fn test_between_compares_numerically() {
        let db = db();
        for addr in ["10.0.0.1", "10.0.0.9", "10.0.0.10", "10.0.0.255", "10.0.1.1", "::1"] {
            IpAddress::import(&db, addr).unwrap();
        }
        let found: Vec<String> = IpAddress::query()
            .between("10.0.0.1".parse().unwrap(), "10.0.0.255".parse().unwrap())
            .all(&db)
            .unwrap()
            .iter()
            .map(|ip| ip.to_string())
            .collect();
        assert_eq!(found, vec!["10.0.0.1", "10.0.0.9", "10.0.0.10", "10.0.0.255"]);

        let net: IpNet = "10.0.0.8/29".parse().unwrap();
        assert_eq!(IpAddress::query().in_range(&net).count(&db).unwrap(), 1);
        assert_eq!(IpAddress::query().v6().count(&db).unwrap(), 1);
        assert_eq!(
            IpAddress::query()
                .between("10.0.0.1".parse().unwrap(), "::1".parse().unwrap())
                .count(&db)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_host_name_links_and_scopes() {
        let db = db();
        let ip = IpAddress::import(&db, "93.184.216.34").unwrap();
        ip.add_host_name(&db, "example.com").unwrap();
        ip.add_host_name(&db, "www.example.com").unwrap();
        ip.add_host_name(&db, "example.com").unwrap();

        assert_eq!(ip.host_names(&db).unwrap().len(), 2);
        let found = IpAddress::query()
            .v4()
            .with_host_name("www.example.com")
            .all(&db)
            .unwrap();
        assert_eq!(found, vec![ip.clone()]);
        assert_eq!(
            ip.recent_host_name(&db).unwrap().unwrap().name,
            "www.example.com"
        );
    }

    #[test]
    fn test_recent_mac_address_prefers_latest_link() {
        let db = db();
        let ip = IpAddress::import(&db, "192.168.1.10").unwrap();
        assert!(ip.recent_mac_address(&db).unwrap().is_none());
        ip.add_mac_address(&db, "00:11:22:33:44:55").unwrap();
        ip.add_mac_address(&db, "66:77:88:99:AA:BB").unwrap();
        assert_eq!(
            ip.recent_mac_address(&db).unwrap().unwrap().address,
            "66:77:88:99:aa:bb"
        );
        assert_eq!(
            IpAddress::query()
                .with_mac_address("00:11:22:33:44:55")
                .count(&db)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_touch_scanned() {
        let db = db();
        let mut ip = IpAddress::import(&db, "10.1.1.1").unwrap();
        IpAddress::import(&db, "10.1.1.2").unwrap();
        assert_eq!(IpAddress::query().never_scanned().count(&db).unwrap(), 2);

        let before = Utc::now() - chrono::Duration::seconds(5);
        ip.touch_scanned(&db).unwrap();
        assert!(ip.last_scanned_at.is_some());
        assert_eq!(ip.reload(&db).unwrap().last_scanned_at, ip.last_scanned_at);
        assert_eq!(
            IpAddress::query().scanned_since(before).all(&db).unwrap(),
            vec![ip]
        );
        assert_eq!(IpAddress::query().scanned_before(before).count(&db).unwrap(), 0);
    }
}
