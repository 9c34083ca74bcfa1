//! Certificate issuer and subject names.
//!
//! Both carry the same organization field set (organization, unit,
//! locality, state, country) plus an email address. An issuer keeps its
//! common name as text; a subject points into the shared [`CertName`]
//! pool so subject names and subjectAltNames can be searched together.

use chrono::{DateTime, Utc};
use dossier_core::parse::DnAttributes;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::name_pools::CertName;
use crate::query::{text, Query};
use crate::record::{find_or_create, get_time, opt_int, opt_text, Importable, Record};

/// Records holding the organization field set.
pub trait OrganizationFields: Record<Id = i64> {
    fn organization(&self) -> Option<&str>;
    fn organizational_unit(&self) -> Option<&str>;
    fn locality(&self) -> Option<&str>;
    fn state(&self) -> Option<&str>;
    fn country(&self) -> Option<&str>;
}

const ORG_COLUMNS: [&str; 6] = [
    "email_address",
    "organization",
    "organizational_unit",
    "locality",
    "state",
    "country",
];

fn org_values(attrs: &DnAttributes) -> [Value; 6] {
    [
        opt_text(attrs.email_address.as_deref()),
        opt_text(attrs.organization.as_deref()),
        opt_text(attrs.organizational_unit.as_deref()),
        opt_text(attrs.locality.as_deref()),
        opt_text(attrs.state.as_deref()),
        opt_text(attrs.country.as_deref()),
    ]
}

/// Every attribute must match, NULL included.
fn org_key<R: Record>(mut query: Query<R>, attrs: &DnAttributes) -> Query<R> {
    for (column, value) in ORG_COLUMNS.iter().zip(org_values(attrs)) {
        query = query.where_eq_nullable(column, value);
    }
    query
}

impl<R: OrganizationFields> Query<R> {
    pub fn with_organization(self, organization: &str) -> Self {
        self.where_eq("organization", text(organization))
    }

    pub fn with_organizational_unit(self, unit: &str) -> Self {
        self.where_eq("organizational_unit", text(unit))
    }

    pub fn with_locality(self, locality: &str) -> Self {
        self.where_eq("locality", text(locality))
    }

    pub fn with_state(self, state: &str) -> Self {
        self.where_eq("state", text(state))
    }

    pub fn with_country(self, country: &str) -> Self {
        self.where_eq("country", text(country))
    }
}

macro_rules! organization_fields {
    ($name:ident) => {
        impl OrganizationFields for $name {
            fn organization(&self) -> Option<&str> {
                self.organization.as_deref()
            }

            fn organizational_unit(&self) -> Option<&str> {
                self.organizational_unit.as_deref()
            }

            fn locality(&self) -> Option<&str> {
                self.locality.as_deref()
            }

            fn state(&self) -> Option<&str> {
                self.state.as_deref()
            }

            fn country(&self) -> Option<&str> {
                self.country.as_deref()
            }
        }
    };
}

// ── Issuer ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertIssuer {
    pub id: i64,
    pub common_name: Option<String>,
    pub email_address: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

organization_fields!(CertIssuer);

impl Record for CertIssuer {
    const TABLE: &'static str = "dossier_cert_issuers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "common_name",
        "email_address",
        "organization",
        "organizational_unit",
        "locality",
        "state",
        "country",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            common_name: row.get("common_name")?,
            email_address: row.get("email_address")?,
            organization: row.get("organization")?,
            organizational_unit: row.get("organizational_unit")?,
            locality: row.get("locality")?,
            state: row.get("state")?,
            country: row.get("country")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

fn issuer_key(attrs: &DnAttributes) -> Query<CertIssuer> {
    org_key(
        CertIssuer::query()
            .where_eq_nullable("common_name", opt_text(attrs.common_name.as_deref())),
        attrs,
    )
}

impl Importable for CertIssuer {
    type Key = DnAttributes;

    fn lookup(db: &Database, attrs: &DnAttributes) -> Result<Option<Self>, DbError> {
        issuer_key(attrs).first(db)
    }

    fn import(db: &Database, attrs: &DnAttributes) -> Result<Self, DbError> {
        let mut values = vec![("common_name", opt_text(attrs.common_name.as_deref()))];
        values.extend(ORG_COLUMNS.into_iter().zip(org_values(attrs)));
        find_or_create(db, Self::TABLE, &values, issuer_key(attrs))
    }
}

impl CertIssuer {
    /// Parse and import an issuer written as `CN=a, O=b` or `/CN=a/O=b`.
    pub fn import_str(db: &Database, name: &str) -> Result<Self, DbError> {
        Self::import(db, &name.parse::<DnAttributes>()?)
    }

    pub fn attributes(&self) -> DnAttributes {
        DnAttributes {
            common_name: self.common_name.clone(),
            email_address: self.email_address.clone(),
            organization: self.organization.clone(),
            organizational_unit: self.organizational_unit.clone(),
            locality: self.locality.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
        }
    }
}

impl std::fmt::Display for CertIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.attributes())
    }
}

impl Query<CertIssuer> {
    pub fn with_common_name(self, common_name: &str) -> Self {
        self.where_eq("common_name", text(common_name))
    }
}

// ── Subject ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertSubject {
    pub id: i64,
    pub common_name_id: Option<i64>,
    pub email_address: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

organization_fields!(CertSubject);

impl Record for CertSubject {
    const TABLE: &'static str = "dossier_cert_subjects";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "common_name_id",
        "email_address",
        "organization",
        "organizational_unit",
        "locality",
        "state",
        "country",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            common_name_id: row.get("common_name_id")?,
            email_address: row.get("email_address")?,
            organization: row.get("organization")?,
            organizational_unit: row.get("organizational_unit")?,
            locality: row.get("locality")?,
            state: row.get("state")?,
            country: row.get("country")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

fn subject_key(common_name_id: Option<i64>, attrs: &DnAttributes) -> Query<CertSubject> {
    org_key(
        CertSubject::query().where_eq_nullable("common_name_id", opt_int(common_name_id)),
        attrs,
    )
}

impl Importable for CertSubject {
    type Key = DnAttributes;

    fn lookup(db: &Database, attrs: &DnAttributes) -> Result<Option<Self>, DbError> {
        let common_name_id = match attrs.common_name.as_deref() {
            Some(cn) => match CertName::lookup(db, cn)? {
                Some(name) => Some(name.id),
                None => return Ok(None),
            },
            None => None,
        };
        subject_key(common_name_id, attrs).first(db)
    }

    fn import(db: &Database, attrs: &DnAttributes) -> Result<Self, DbError> {
        db.transaction(|db| {
            let common_name_id = match attrs.common_name.as_deref() {
                Some(cn) => Some(CertName::import(db, cn)?.id),
                None => None,
            };
            let mut values = vec![("common_name_id", opt_int(common_name_id))];
            values.extend(ORG_COLUMNS.into_iter().zip(org_values(attrs)));
            find_or_create(db, Self::TABLE, &values, subject_key(common_name_id, attrs))
        })
    }
}

impl CertSubject {
    /// Parse and import a subject written as `CN=a, O=b` or `/CN=a/O=b`.
    pub fn import_str(db: &Database, name: &str) -> Result<Self, DbError> {
        Self::import(db, &name.parse::<DnAttributes>()?)
    }

    pub fn common_name(&self, db: &Database) -> Result<Option<CertName>, DbError> {
        match self.common_name_id {
            Some(id) => CertName::find(db, id),
            None => Ok(None),
        }
    }

    pub fn attributes(&self, db: &Database) -> Result<DnAttributes, DbError> {
        Ok(DnAttributes {
            common_name: self.common_name(db)?.map(|n| n.name),
            email_address: self.email_address.clone(),
            organization: self.organization.clone(),
            organizational_unit: self.organizational_unit.clone(),
            locality: self.locality.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
        })
    }
}

impl Query<CertSubject> {
    pub fn with_common_name(self, common_name: &str) -> Self {
        self.filter(
            "dossier_cert_subjects.common_name_id IN (SELECT id FROM dossier_cert_names WHERE name = ?)",
            [text(common_name.trim())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_identity_includes_nulls() {
        let db = Database::open_in_memory().unwrap();
        let full = CertIssuer::import_str(&db, "CN=Example CA, O=Example, C=US").unwrap();
        let no_country = CertIssuer::import_str(&db, "/CN=Example CA/O=Example").unwrap();
        assert_ne!(full.id, no_country.id);
        assert_eq!(
            CertIssuer::import_str(&db, "/C=US/O=Example/CN=Example CA").unwrap(),
            full
        );
        assert_eq!(full.to_string(), "C=US, O=Example, CN=Example CA");
        assert_eq!(CertIssuer::query().with_country("US").all(&db).unwrap(), vec![full]);
        assert_eq!(CertIssuer::count(&db).unwrap(), 2);
    }

    #[test]
    fn test_subject_shares_name_pool() {
        let db = Database::open_in_memory().unwrap();
        let attrs: DnAttributes = "CN=www.example.com, O=Example Corp, OU=Web".parse().unwrap();
        let subject = CertSubject::import(&db, &attrs).unwrap();
        assert_eq!(CertSubject::import(&db, &attrs).unwrap(), subject);
        assert_eq!(CertSubject::lookup(&db, &attrs).unwrap(), Some(subject.clone()));
        assert_eq!(subject.attributes(&db).unwrap(), attrs);
        assert_eq!(
            CertName::lookup(&db, "www.example.com").unwrap().map(|n| n.id),
            subject.common_name_id
        );
        assert_eq!(
            CertSubject::query()
                .with_common_name("www.example.com")
                .with_organizational_unit("Web")
                .count(&db)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_malformed_component() {
        let db = Database::open_in_memory().unwrap();
        assert!(CertSubject::import_str(&db, "CN=ok, garbage").unwrap_err().is_malformed());
        assert!(CertSubject::lookup(&db, &DnAttributes::default()).unwrap().is_none());
    }
}
