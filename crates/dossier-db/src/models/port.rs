use chrono::{DateTime, Utc};
use dossier_core::types::Protocol;
use dossier_core::validate::{is_port_number, MAX_PORT, MIN_PORT};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::ip_address::IpAddress;
use crate::query::{int, text, Query};
use crate::record::{enum_text, find_or_create, get_enum, get_time, Importable, Record};

/// A transport-layer port, e.g. `80/tcp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: i64,
    pub protocol: Protocol,
    pub number: u16,
    pub created_at: DateTime<Utc>,
}

impl Record for Port {
    const TABLE: &'static str = "dossier_ports";
    const COLUMNS: &'static [&'static str] = &["id", "protocol", "number", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            protocol: get_enum(row, "protocol", "protocol")?,
            number: row.get("number")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Importable for Port {
    type Key = (Protocol, u16);

    fn lookup(db: &Database, &(protocol, number): &(Protocol, u16)) -> Result<Option<Self>, DbError> {
        Self::query()
            .with_protocol(protocol)
            .with_number(number)
            .first(db)
    }

    fn import(db: &Database, &(protocol, number): &(Protocol, u16)) -> Result<Self, DbError> {
        if !is_port_number(u32::from(number)) {
            return Err(DbError::invalid(
                "number",
                format!("must be between {MIN_PORT} and {MAX_PORT}"),
            ));
        }
        find_or_create(
            db,
            Self::TABLE,
            &[("protocol", enum_text(&protocol)), ("number", int(number))],
            Self::query().with_protocol(protocol).with_number(number),
        )
    }
}

impl Port {
    pub fn tcp(db: &Database, number: u16) -> Result<Self, DbError> {
        Self::import(db, &(Protocol::Tcp, number))
    }

    pub fn udp(db: &Database, number: u16) -> Result<Self, DbError> {
        Self::import(db, &(Protocol::Udp, number))
    }

    pub fn is_tcp(&self) -> bool {
        self.protocol == Protocol::Tcp
    }

    pub fn is_udp(&self) -> bool {
        self.protocol == Protocol::Udp
    }

    /// Addresses with this port open.
    pub fn ip_addresses(&self, db: &Database) -> Result<Vec<IpAddress>, DbError> {
        IpAddress::query()
            .filter(
                "dossier_ip_addresses.id IN (SELECT ip_address_id FROM dossier_open_ports WHERE port_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.number, self.protocol)
    }
}

impl Query<Port> {
    pub fn with_number(self, number: u16) -> Self {
        self.where_eq("number", int(number))
    }

    pub fn with_protocol(self, protocol: Protocol) -> Self {
        self.where_eq("protocol", text(protocol.as_ref()))
    }

    pub fn tcp(self) -> Self {
        self.with_protocol(Protocol::Tcp)
    }

    pub fn udp(self) -> Self {
        self.with_protocol(Protocol::Udp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_identity() {
        let db = Database::open_in_memory().unwrap();
        let http = Port::tcp(&db, 80).unwrap();
        assert_eq!(http.to_string(), "80/tcp");
        assert_eq!(Port::tcp(&db, 80).unwrap(), http);

        let dns = Port::udp(&db, 53).unwrap();
        assert_ne!(dns.id, http.id);
        assert!(dns.is_udp());
        assert_eq!(
            Port::lookup(&db, &(Protocol::Udp, 53)).unwrap(),
            Some(dns)
        );
        assert!(Port::lookup(&db, &(Protocol::Udp, 80)).unwrap().is_none());
    }

    #[test]
    fn test_port_zero_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = Port::tcp(&db, 0).unwrap_err();
        assert!(err.validation_errors().unwrap().has("number"));
        assert!(Port::tcp(&db, 65_535).is_ok());
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        Port::tcp(&db, 22).unwrap();
        Port::tcp(&db, 53).unwrap();
        Port::udp(&db, 53).unwrap();
        assert_eq!(Port::query().with_number(53).count(&db).unwrap(), 2);
        assert_eq!(Port::query().tcp().count(&db).unwrap(), 2);
        assert_eq!(Port::query().udp().with_number(53).count(&db).unwrap(), 1);
    }
}
