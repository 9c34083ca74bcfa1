//! dossier-db: SQLite store for the Dossier reconnaissance data model.
//!
//! Every recorded artifact (hosts, ports, certificates, URLs, people,
//! organizations, advisories) is a row in one relational schema. Records are
//! imported by natural key, so importing the same artifact twice returns the
//! existing row, and links between records are unique per pair.
//!
//! ```no_run
//! use dossier_db::prelude::*;
//!
//! # fn main() -> Result<(), DbError> {
//! let db = Database::open_in_memory()?;
//! let ip = IpAddress::import(&db, "93.184.216.34")?;
//! let host = HostName::import(&db, "www.example.com")?;
//! host.add_ip_address(&db, "93.184.216.34")?;
//! assert_eq!(host.ip_addresses(&db)?, vec![ip]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod migrations;
pub mod models;
pub mod query;
pub mod record;
pub mod schema;

pub use client::Database;
pub use error::DbError;
pub use migrations::{Migration, Migrator};
pub use query::Query;
pub use record::{HasUniqueName, Importable, LastScannedAt, Record};

/// The store, the record traits, and every record type.
pub mod prelude {
    pub use crate::client::Database;
    pub use crate::error::DbError;
    pub use crate::models::address::AddressRecord;
    pub use crate::models::advisory::Advisory;
    pub use crate::models::arch::Arch;
    pub use crate::models::asn::{Asn, NewAsn};
    pub use crate::models::cert::{Cert, CertSubjectAltName};
    pub use crate::models::cert_org::{CertIssuer, CertSubject};
    pub use crate::models::credential::{Credential, CredentialKey};
    pub use crate::models::email_address::EmailAddress;
    pub use crate::models::host_name::HostName;
    pub use crate::models::http::{
        HttpRequest, HttpResponse, NewHttpRequest, NewHttpResponse,
    };
    pub use crate::models::ip_address::IpAddress;
    pub use crate::models::mac_address::MacAddress;
    pub use crate::models::name_pools::*;
    pub use crate::models::note::{NewNote, Note, NoteTarget};
    pub use crate::models::open_port::OpenPort;
    pub use crate::models::organization::{
        Customer, NewMember, Organization, OrganizationDepartment, OrganizationMember,
    };
    pub use crate::models::os::{NewOs, Os};
    pub use crate::models::password::Password;
    pub use crate::models::person::Person;
    pub use crate::models::phone_number::PhoneNumber;
    pub use crate::models::port::Port;
    pub use crate::models::software::{NewSoftware, Software};
    pub use crate::models::street_address::{NewStreetAddress, StreetAddress};
    pub use crate::models::url::{Url, UrlQueryParam};
    pub use crate::models::vulnerability::{Vulnerability, VulnerableAsset};
    pub use crate::models::web_vuln::{NewWebVuln, WebVuln, WebVulnDetails};
    pub use crate::query::Query;
    pub use crate::record::{HasUniqueName, Importable, LastScannedAt, Record};
}
