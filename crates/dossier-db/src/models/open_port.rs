//! A port observed open on an IP address, with what was found listening.

use chrono::{DateTime, Utc};
use dossier_core::net::socket_string;
use dossier_core::types::Protocol;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::address::AddressRecord;
use crate::models::cert::Cert;
use crate::models::ip_address::IpAddress;
use crate::models::name_pools::Service;
use crate::models::port::Port;
use crate::models::software::Software;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_opt_time, get_time, Importable, LastScannedAt, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    pub id: i64,
    pub ip_address_id: i64,
    pub port_id: i64,
    pub service_id: Option<i64>,
    pub software_id: Option<i64>,
    pub cert_id: Option<i64>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for OpenPort {
    const TABLE: &'static str = "dossier_open_ports";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "ip_address_id",
        "port_id",
        "service_id",
        "software_id",
        "cert_id",
        "last_scanned_at",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ip_address_id: row.get("ip_address_id")?,
            port_id: row.get("port_id")?,
            service_id: row.get("service_id")?,
            software_id: row.get("software_id")?,
            cert_id: row.get("cert_id")?,
            last_scanned_at: get_opt_time(row, "last_scanned_at")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl LastScannedAt for OpenPort {
    fn last_scanned_at(&self) -> Option<DateTime<Utc>> {
        self.last_scanned_at
    }

    fn set_last_scanned_at(&mut self, at: DateTime<Utc>) {
        self.last_scanned_at = Some(at);
    }
}

/// Identified by `(ip_address_id, port_id)`.
impl Importable for OpenPort {
    type Key = (i64, i64);

    fn lookup(db: &Database, &(ip_address_id, port_id): &(i64, i64)) -> Result<Option<Self>, DbError> {
        Self::query()
            .where_eq("ip_address_id", ip_address_id)
            .where_eq("port_id", port_id)
            .first(db)
    }

    fn import(db: &Database, &(ip_address_id, port_id): &(i64, i64)) -> Result<Self, DbError> {
        db.transaction(|db| {
            IpAddress::get(db, ip_address_id)?;
            Port::get(db, port_id)?;
            find_or_create(
                db,
                Self::TABLE,
                &[
                    ("ip_address_id", int(ip_address_id)),
                    ("port_id", int(port_id)),
                ],
                Self::query()
                    .where_eq("ip_address_id", ip_address_id)
                    .where_eq("port_id", port_id),
            )
        })
    }
}

impl OpenPort {
    /// Record `protocol/number` open on `address`, importing both sides.
    pub fn open(
        db: &Database,
        address: &str,
        protocol: Protocol,
        number: u16,
    ) -> Result<Self, DbError> {
        db.transaction(|db| {
            let ip = IpAddress::import(db, address)?;
            let port = Port::import(db, &(protocol, number))?;
            Self::import(db, &(ip.id, port.id))
        })
    }

    pub fn ip_address(&self, db: &Database) -> Result<IpAddress, DbError> {
        IpAddress::get(db, self.ip_address_id)
    }

    pub fn port(&self, db: &Database) -> Result<Port, DbError> {
        Port::get(db, self.port_id)
    }

    pub fn service(&self, db: &Database) -> Result<Option<Service>, DbError> {
        match self.service_id {
            Some(id) => Service::find(db, id),
            None => Ok(None),
        }
    }

    pub fn software(&self, db: &Database) -> Result<Option<Software>, DbError> {
        match self.software_id {
            Some(id) => Software::find(db, id),
            None => Ok(None),
        }
    }

    pub fn cert(&self, db: &Database) -> Result<Option<Cert>, DbError> {
        match self.cert_id {
            Some(id) => Cert::find(db, id),
            None => Ok(None),
        }
    }

    /// Name the service listening here, importing the name.
    pub fn set_service(&mut self, db: &Database, name: &str) -> Result<Service, DbError> {
        db.transaction(|db| {
            let service = Service::import(db, name)?;
            self.update(db, "service_id", service.id)?;
            self.service_id = Some(service.id);
            Ok(service)
        })
    }

    pub fn set_software(&mut self, db: &Database, software: &Software) -> Result<(), DbError> {
        self.update(db, "software_id", software.id)?;
        self.software_id = Some(software.id);
        Ok(())
    }

    pub fn set_cert(&mut self, db: &Database, cert: &Cert) -> Result<(), DbError> {
        self.update(db, "cert_id", cert.id)?;
        self.cert_id = Some(cert.id);
        Ok(())
    }

    fn update(&self, db: &Database, column: &str, value: i64) -> Result<(), DbError> {
        let sql = format!("UPDATE {} SET {column} = ? WHERE id = ?", Self::TABLE);
        let updated = db.execute(&sql, &[int(value), int(self.id)])?;
        if updated == 0 {
            return Err(DbError::not_found(Self::TABLE, self.id));
        }
        Ok(())
    }

    /// `address:number`, with IPv6 addresses bracketed (`[::1]:443`).
    pub fn socket_string(&self, db: &Database) -> Result<String, DbError> {
        let ip = self.ip_address(db)?;
        let port = self.port(db)?;
        Ok(socket_string(&ip.address_text(), port.number))
    }
}

impl Query<OpenPort> {
    pub fn with_ip_address(self, address: &str) -> Self {
        self.filter(
            "dossier_open_ports.ip_address_id IN (
                SELECT id FROM dossier_ip_addresses WHERE address = ?)",
            [text(IpAddress::canonicalize(address))],
        )
    }

    pub fn with_port_number(self, number: u16) -> Self {
        self.filter(
            "dossier_open_ports.port_id IN (SELECT id FROM dossier_ports WHERE number = ?)",
            [int(number)],
        )
    }

    pub fn with_protocol(self, protocol: Protocol) -> Self {
        self.filter(
            "dossier_open_ports.port_id IN (SELECT id FROM dossier_ports WHERE protocol = ?)",
            [text(protocol.as_ref())],
        )
    }

    pub fn with_service_name(self, name: &str) -> Self {
        self.filter(
            "dossier_open_ports.service_id IN (SELECT id FROM dossier_services WHERE name = ?)",
            [text(name)],
        )
    }

    pub fn with_software_name(self, name: &str) -> Self {
        self.filter(
            "dossier_open_ports.software_id IN (SELECT id FROM dossier_softwares WHERE name = ?)",
            [text(name)],
        )
    }

    pub fn with_cert(self, cert: &Cert) -> Self {
        self.where_eq("cert_id", cert.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = OpenPort::open(&db, "10.0.0.1", Protocol::Tcp, 80).unwrap();
        let again = OpenPort::open(&db, "10.0.0.1", Protocol::Tcp, 80).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.socket_string(&db).unwrap(), "10.0.0.1:80");

        let v6 = OpenPort::open(&db, "::1", Protocol::Tcp, 443).unwrap();
        assert_eq!(v6.socket_string(&db).unwrap(), "[::1]:443");
    }

    #[test]
    fn test_import_requires_existing_rows() {
        let db = Database::open_in_memory().unwrap();
        let port = Port::tcp(&db, 22).unwrap();
        let err = OpenPort::import(&db, &(42, port.id)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_service_and_scopes() {
        let db = Database::open_in_memory().unwrap();
        let mut ssh = OpenPort::open(&db, "10.0.0.1", Protocol::Tcp, 22).unwrap();
        ssh.set_service(&db, "ssh").unwrap();
        OpenPort::open(&db, "10.0.0.2", Protocol::Udp, 53).unwrap();

        assert_eq!(ssh.service(&db).unwrap().unwrap().name, "ssh");
        assert_eq!(ssh.reload(&db).unwrap().service_id, ssh.service_id);
        assert_eq!(
            OpenPort::query().with_service_name("ssh").all(&db).unwrap(),
            vec![ssh.clone()]
        );
        assert_eq!(
            OpenPort::query()
                .with_ip_address("10.0.0.1")
                .with_port_number(22)
                .with_protocol(Protocol::Tcp)
                .count(&db)
                .unwrap(),
            1
        );
        assert_eq!(OpenPort::query().with_protocol(Protocol::Udp).count(&db).unwrap(), 1);
    }

    #[test]
    fn test_deleting_service_detaches_it() {
        let db = Database::open_in_memory().unwrap();
        let mut open = OpenPort::open(&db, "10.0.0.3", Protocol::Tcp, 25).unwrap();
        let service = open.set_service(&db, "smtp").unwrap();
        service.destroy(&db).unwrap();
        assert_eq!(open.reload(&db).unwrap().service_id, None);
    }
}
