//! X.509 certificates.
//!
//! Certificates are identified by fingerprint. Importing one also imports
//! its subject, its issuer (unless self-signed), and its subjectAltNames.

use chrono::{DateTime, Utc};
use dossier_core::parse::cert::{der_from_bytes, pem_to_der, sha256_fingerprint};
use dossier_core::parse::{parse_subject_alt_names, CertInfo, DnAttributes};
use dossier_core::types::PublicKeyAlgorithm;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::{format_time, now, Database};
use crate::error::DbError;
use crate::models::cert_org::{CertIssuer, CertSubject};
use crate::models::name_pools::CertName;
use crate::models::open_port::OpenPort;
use crate::query::{int, text, Query};
use crate::record::{
    enum_text, find_or_create, get_enum, get_time, opt_int, Importable, Record,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cert {
    pub id: i64,
    pub serial: String,
    pub version: u8,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// `None` only for self-signed certificates.
    pub issuer_id: Option<i64>,
    pub subject_id: i64,
    pub public_key_algorithm: PublicKeyAlgorithm,
    pub public_key_size: u32,
    pub signing_algorithm: String,
    pub sha1_fingerprint: String,
    pub sha256_fingerprint: String,
    pub pem: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Cert {
    const TABLE: &'static str = "dossier_certs";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "serial",
        "version",
        "not_before",
        "not_after",
        "issuer_id",
        "subject_id",
        "public_key_algorithm",
        "public_key_size",
        "signing_algorithm",
        "sha1_fingerprint",
        "sha256_fingerprint",
        "pem",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            serial: row.get("serial")?,
            version: row.get("version")?,
            not_before: get_time(row, "not_before")?,
            not_after: get_time(row, "not_after")?,
            issuer_id: row.get("issuer_id")?,
            subject_id: row.get("subject_id")?,
            public_key_algorithm: get_enum(row, "public_key_algorithm", "public key algorithm")?,
            public_key_size: row.get("public_key_size")?,
            signing_algorithm: row.get("signing_algorithm")?,
            sha1_fingerprint: row.get("sha1_fingerprint")?,
            sha256_fingerprint: row.get("sha256_fingerprint")?,
            pem: row.get("pem")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Keyed by the certificate encoding, PEM text or DER bytes.
impl Importable for Cert {
    type Key = [u8];

    fn lookup(db: &Database, bytes: &[u8]) -> Result<Option<Self>, DbError> {
        let der = der_from_bytes(bytes)?;
        Self::lookup_by_fingerprint(db, &sha256_fingerprint(&der))
    }

    fn import(db: &Database, bytes: &[u8]) -> Result<Self, DbError> {
        Self::import_info(db, &CertInfo::from_bytes(bytes)?)
    }
}

impl Cert {
    pub fn import_pem(db: &Database, pem: &str) -> Result<Self, DbError> {
        Self::import_info(db, &CertInfo::from_pem(pem)?)
    }

    pub fn import_der(db: &Database, der: &[u8]) -> Result<Self, DbError> {
        Self::import_info(db, &CertInfo::from_der(der)?)
    }

    /// Import an already decoded certificate.
    pub fn import_info(db: &Database, info: &CertInfo) -> Result<Self, DbError> {
        if !(1..=3).contains(&info.version) {
            return Err(DbError::invalid("version", "must be between 1 and 3"));
        }

        db.transaction(|db| {
            let subject = CertSubject::import(db, &info.subject)?;
            let issuer_id = if info.self_signed {
                None
            } else {
                Some(CertIssuer::import(db, &info.issuer)?.id)
            };

            let cert = find_or_create(
                db,
                Self::TABLE,
                &[
                    ("serial", text(info.serial.as_str())),
                    ("version", int(info.version)),
                    ("not_before", text(format_time(&info.not_before))),
                    ("not_after", text(format_time(&info.not_after))),
                    ("issuer_id", opt_int(issuer_id)),
                    ("subject_id", int(subject.id)),
                    ("public_key_algorithm", enum_text(&info.public_key_algorithm)),
                    ("public_key_size", int(info.public_key_size)),
                    ("signing_algorithm", text(info.signing_algorithm.as_str())),
                    ("sha1_fingerprint", text(info.sha1_fingerprint.as_str())),
                    ("sha256_fingerprint", text(info.sha256_fingerprint.as_str())),
                    ("pem", text(info.to_pem())),
                ],
                Self::query().where_eq("sha256_fingerprint", text(info.sha256_fingerprint.as_str())),
            )?;

            for name in &info.subject_alt_names {
                cert.add_subject_alt_name(db, name)?;
            }
            Ok(cert)
        })
    }

    /// Look a certificate up by its SHA-1 or SHA-256 fingerprint, in hex
    /// with or without colons.
    pub fn lookup_by_fingerprint(db: &Database, fingerprint: &str) -> Result<Option<Self>, DbError> {
        let fingerprint = fingerprint.replace(':', "").to_ascii_lowercase();
        let column = match fingerprint.len() {
            40 => "sha1_fingerprint",
            64 => "sha256_fingerprint",
            _ => return Ok(None),
        };
        Self::query().where_eq(column, text(fingerprint)).first(db)
    }

    /// The issuing CA's name. Self-signed certificates have none.
    pub fn issuer(&self, db: &Database) -> Result<Option<CertIssuer>, DbError> {
        match self.issuer_id {
            Some(id) => CertIssuer::find(db, id),
            None => Ok(None),
        }
    }

    /// The issuer's attributes, which for a self-signed certificate are its
    /// subject's.
    pub fn issuer_attributes(&self, db: &Database) -> Result<DnAttributes, DbError> {
        match self.issuer(db)? {
            Some(issuer) => Ok(issuer.attributes()),
            None => self.subject(db)?.attributes(db),
        }
    }

    pub fn subject(&self, db: &Database) -> Result<CertSubject, DbError> {
        CertSubject::get(db, self.subject_id)
    }

    pub fn common_name(&self, db: &Database) -> Result<Option<String>, DbError> {
        Ok(self.subject(db)?.common_name(db)?.map(|name| name.name))
    }

    pub fn subject_alt_names(&self, db: &Database) -> Result<Vec<CertName>, DbError> {
        CertName::query()
            .filter(
                "dossier_cert_names.id IN (
                    SELECT name_id FROM dossier_cert_subject_alt_names WHERE cert_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_subject_alt_name(&self, db: &Database, name: &str) -> Result<CertSubjectAltName, DbError> {
        db.transaction(|db| {
            let name = CertName::import(db, name)?;
            CertSubjectAltName::link(db, name.id, self.id)
        })
    }

    /// Open ports observed presenting this certificate.
    pub fn open_ports(&self, db: &Database) -> Result<Vec<OpenPort>, DbError> {
        OpenPort::query().with_cert(self).all(db)
    }

    pub fn to_pem(&self) -> &str {
        &self.pem
    }

    pub fn to_der(&self) -> Result<Vec<u8>, DbError> {
        Ok(pem_to_der(&self.pem)?)
    }

    pub fn is_self_signed(&self) -> bool {
        self.issuer_id.is_none()
    }

    pub fn is_expired(&self) -> bool {
        self.not_after < now()
    }

    /// Whether `at` falls inside the validity period.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

link_record!(
    /// A name listed in a certificate's subjectAltName extension.
    CertSubjectAltName,
    "dossier_cert_subject_alt_names",
    name_id,
    cert_id
);

impl CertSubjectAltName {
    pub fn name(&self, db: &Database) -> Result<CertName, DbError> {
        CertName::get(db, self.name_id)
    }

    pub fn cert(&self, db: &Database) -> Result<Cert, DbError> {
        Cert::get(db, self.cert_id)
    }

    /// Split a textual subjectAltName value (`DNS:a, IP Address:b`) into
    /// bare names. The type tags are dropped.
    pub fn parse(value: &str) -> Vec<String> {
        parse_subject_alt_names(value)
    }
}

impl std::fmt::Display for Cert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sha256_fingerprint)
    }
}

impl Query<Cert> {
    pub fn expired(self) -> Self {
        self.filter("dossier_certs.not_after < ?", [text(format_time(&now()))])
    }

    pub fn active(self) -> Self {
        let now = format_time(&now());
        self.filter(
            "dossier_certs.not_before <= ? AND dossier_certs.not_after >= ?",
            [text(now.as_str()), text(now.as_str())],
        )
    }

    pub fn not_yet_valid(self) -> Self {
        self.filter("dossier_certs.not_before > ?", [text(format_time(&now()))])
    }

    pub fn self_signed(self) -> Self {
        self.where_null("issuer_id")
    }

    pub fn with_common_name(self, name: &str) -> Self {
        self.filter(
            "dossier_certs.subject_id IN (
                SELECT s.id FROM dossier_cert_subjects s
                JOIN dossier_cert_names n ON n.id = s.common_name_id
                WHERE n.name = ?)",
            [text(name.trim())],
        )
    }

    pub fn with_subject_alt_name(self, name: &str) -> Self {
        self.filter(
            "dossier_certs.id IN (
                SELECT san.cert_id FROM dossier_cert_subject_alt_names san
                JOIN dossier_cert_names n ON n.id = san.name_id
                WHERE n.name = ?)",
            [text(name.trim())],
        )
    }

    /// Certificates issued by a CA with this common name. A self-signed
    /// certificate is its own issuer.
    pub fn with_issuer_common_name(self, name: &str) -> Self {
        let name = name.trim();
        self.filter(
            "dossier_certs.issuer_id IN (
                SELECT id FROM dossier_cert_issuers WHERE common_name = ?)
             OR (dossier_certs.issuer_id IS NULL AND dossier_certs.subject_id IN (
                SELECT s.id FROM dossier_cert_subjects s
                JOIN dossier_cert_names n ON n.id = s.common_name_id
                WHERE n.name = ?))",
            [text(name), text(name)],
        )
    }

    fn with_subject_field(self, column: &str, value: &str) -> Self {
        self.filter(
            format!(
                "dossier_certs.subject_id IN (SELECT id FROM dossier_cert_subjects WHERE {column} = ?)"
            ),
            [text(value)],
        )
    }

    pub fn with_organization(self, organization: &str) -> Self {
        self.with_subject_field("organization", organization)
    }

    pub fn with_organizational_unit(self, unit: &str) -> Self {
        self.with_subject_field("organizational_unit", unit)
    }

    pub fn with_locality(self, locality: &str) -> Self {
        self.with_subject_field("locality", locality)
    }

    pub fn with_state(self, state: &str) -> Self {
        self.with_subject_field("state", state)
    }

    pub fn with_country(self, country: &str) -> Self {
        self.with_subject_field("country", country)
    }

    pub fn with_public_key_algorithm(self, algorithm: PublicKeyAlgorithm) -> Self {
        self.where_eq("public_key_algorithm", enum_text(&algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LEAF_PEM: &str = include_str!("../../tests/fixtures/leaf.pem");
    const CA_PEM: &str = include_str!("../../tests/fixtures/ca.pem");

    #[test]
    fn test_import_leaf() {
        let db = Database::open_in_memory().unwrap();
        let cert = Cert::import(&db, LEAF_PEM.as_bytes()).unwrap();
        assert_eq!(cert.version, 3);
        assert_eq!(cert.serial, "463ba39df8daae597eca96838e3ef2c377ed9b23");
        assert_eq!(cert.public_key_algorithm, PublicKeyAlgorithm::Ec);
        assert_eq!(cert.public_key_size, 256);
        assert_eq!(cert.signing_algorithm, "sha256WithRSAEncryption");
        assert_eq!(
            cert.sha256_fingerprint,
            "ea00aac66a6d8860185bed7f8a8f119e2430a9298edfab6573ba5dee6fa4c9e6"
        );
        assert!(!cert.is_self_signed());
        assert_eq!(cert.common_name(&db).unwrap().as_deref(), Some("www.example.com"));
        assert_eq!(
            cert.issuer(&db).unwrap().unwrap().common_name.as_deref(),
            Some("Example Root CA")
        );

        let sans: Vec<String> = cert
            .subject_alt_names(&db)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(sans, vec!["www.example.com", "example.com", "93.184.216.34"]);

        assert_eq!(Cert::import_pem(&db, LEAF_PEM).unwrap(), cert);
        let der = cert.to_der().unwrap();
        assert_eq!(Cert::lookup(&db, &der).unwrap(), Some(cert.clone()));
        assert_eq!(
            Cert::lookup_by_fingerprint(&db, "43:4F:22:20:FF:8C:29:28:22:69:C1:00:90:60:5E:6E:04:64:44:A3")
                .unwrap(),
            Some(cert)
        );
    }

    #[test]
    fn test_self_signed_has_no_issuer() {
        let db = Database::open_in_memory().unwrap();
        let ca = Cert::import(&db, CA_PEM.as_bytes()).unwrap();
        assert!(ca.is_self_signed());
        assert_eq!(ca.public_key_algorithm, PublicKeyAlgorithm::Rsa);
        assert_eq!(ca.public_key_size, 2048);
        assert_eq!(
            ca.issuer_attributes(&db).unwrap().organization.as_deref(),
            Some("Example CA Inc")
        );
        assert_eq!(Cert::query().self_signed().all(&db).unwrap(), vec![ca]);
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        let leaf = Cert::import_pem(&db, LEAF_PEM).unwrap();
        let ca = Cert::import_pem(&db, CA_PEM).unwrap();

        assert_eq!(Cert::query().active().count(&db).unwrap(), 2);
        assert_eq!(Cert::query().expired().count(&db).unwrap(), 0);
        assert_eq!(Cert::query().not_yet_valid().count(&db).unwrap(), 0);
        assert_eq!(
            Cert::query().with_subject_alt_name("example.com").all(&db).unwrap(),
            vec![leaf.clone()]
        );
        assert_eq!(
            Cert::query().with_issuer_common_name("Example Root CA").count(&db).unwrap(),
            2
        );
        assert_eq!(
            Cert::query().with_locality("Brooklyn").all(&db).unwrap(),
            vec![leaf.clone()]
        );
        assert_eq!(
            Cert::query()
                .with_public_key_algorithm(PublicKeyAlgorithm::Rsa)
                .all(&db)
                .unwrap(),
            vec![ca]
        );
        assert_eq!(
            Cert::query()
                .with_common_name("www.example.com")
                .with_organization("Example Corp")
                .with_country("US")
                .all(&db)
                .unwrap(),
            vec![leaf.clone()]
        );

        let mid = Utc.with_ymd_and_hms(2070, 6, 1, 0, 0, 0).unwrap();
        assert!(leaf.is_valid_at(mid));
        assert!(!leaf.is_expired());
    }

    #[test]
    fn test_subject_alt_name_links() {
        let db = Database::open_in_memory().unwrap();
        let cert = Cert::import_pem(&db, LEAF_PEM).unwrap();
        assert_eq!(
            CertSubjectAltName::parse("DNS:mail.example.com, IP Address:10.0.0.1"),
            vec!["mail.example.com", "10.0.0.1"]
        );

        let link = cert.add_subject_alt_name(&db, "mail.example.com").unwrap();
        assert_eq!(link.cert(&db).unwrap(), cert);
        assert_eq!(link.name(&db).unwrap().name, "mail.example.com");
        assert_eq!(cert.add_subject_alt_name(&db, "mail.example.com").unwrap(), link);
        assert_eq!(cert.subject_alt_names(&db).unwrap().len(), 4);

        cert.destroy(&db).unwrap();
        assert_eq!(CertSubjectAltName::count(&db).unwrap(), 0);
        assert!(CertName::lookup(&db, "example.com").unwrap().is_some());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let db = Database::open_in_memory().unwrap();
        assert!(Cert::import(&db, b"not a certificate").unwrap_err().is_malformed());
        assert_eq!(CertSubject::count(&db).unwrap(), 0);
    }
}
