//! Free-text notes attached to exactly one record.

use chrono::{DateTime, Utc};
use dossier_core::ValidationErrors;
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{format_time, now, Database};
use crate::error::DbError;
use crate::models::advisory::Advisory;
use crate::models::asn::Asn;
use crate::models::cert::Cert;
use crate::models::credential::Credential;
use crate::models::email_address::EmailAddress;
use crate::models::host_name::HostName;
use crate::models::ip_address::IpAddress;
use crate::models::mac_address::MacAddress;
use crate::models::name_pools::{Service, UserName};
use crate::models::open_port::OpenPort;
use crate::models::organization::Organization;
use crate::models::os::Os;
use crate::models::password::Password;
use crate::models::person::Person;
use crate::models::phone_number::PhoneNumber;
use crate::models::port::Port;
use crate::models::software::Software;
use crate::models::street_address::StreetAddress;
use crate::models::url::Url;
use crate::models::web_vuln::WebVuln;
use crate::query::{like_escape, text, Query};
use crate::record::{get_time, insert, validated, Record};

macro_rules! note_targets {
    ($($variant:ident($id:ty) => $column:literal),* $(,)?) => {
        /// The record a [`Note`] is attached to.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "id", rename_all = "snake_case")]
        pub enum NoteTarget {
            $($variant($id),)*
        }

        const TARGET_COLUMNS: &[&str] = &[$($column),*];

        impl NoteTarget {
            pub fn column(&self) -> &'static str {
                match self {
                    $(NoteTarget::$variant(_) => $column,)*
                }
            }

            fn value(&self) -> Value {
                match self {
                    $(NoteTarget::$variant(id) => Value::from(id.clone()),)*
                }
            }

            fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
                $(
                    if let Some(id) = row.get::<_, Option<$id>>($column)? {
                        return Ok(NoteTarget::$variant(id));
                    }
                )*
                Err(rusqlite::Error::InvalidColumnType(
                    2,
                    TARGET_COLUMNS[0].to_string(),
                    Type::Null,
                ))
            }
        }

        $(
            impl From<&$variant> for NoteTarget {
                fn from(record: &$variant) -> Self {
                    NoteTarget::$variant(record.id())
                }
            }

            impl $variant {
                pub fn notes(&self, db: &Database) -> Result<Vec<Note>, DbError> {
                    Note::query().attached_to(&NoteTarget::from(self)).all(db)
                }

                pub fn add_note(&self, db: &Database, body: &str) -> Result<Note, DbError> {
                    Note::create(db, &NewNote::new(body).target(self))
                }
            }
        )*
    };
}

note_targets! {
    MacAddress(i64) => "mac_address_id",
    IpAddress(i64) => "ip_address_id",
    HostName(i64) => "host_name_id",
    Port(i64) => "port_id",
    Service(i64) => "service_id",
    OpenPort(i64) => "open_port_id",
    Software(i64) => "software_id",
    Os(i64) => "os_id",
    Asn(i64) => "asn_id",
    Cert(i64) => "cert_id",
    Url(i64) => "url_id",
    UserName(i64) => "user_name_id",
    EmailAddress(i64) => "email_address_id",
    Password(i64) => "password_id",
    Credential(i64) => "credential_id",
    Advisory(String) => "advisory_id",
    PhoneNumber(i64) => "phone_number_id",
    StreetAddress(i64) => "street_address_id",
    Person(i64) => "person_id",
    Organization(i64) => "organization_id",
    WebVuln(i64) => "web_vuln_id",
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub body: String,
    pub target: NoteTarget,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Record for Note {
    const TABLE: &'static str = "dossier_notes";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "body",
        "mac_address_id",
        "ip_address_id",
        "host_name_id",
        "port_id",
        "service_id",
        "open_port_id",
        "software_id",
        "os_id",
        "asn_id",
        "cert_id",
        "url_id",
        "user_name_id",
        "email_address_id",
        "password_id",
        "credential_id",
        "advisory_id",
        "phone_number_id",
        "street_address_id",
        "person_id",
        "organization_id",
        "web_vuln_id",
        "updated_at",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            body: row.get("body")?,
            target: NoteTarget::from_row(row)?,
            updated_at: get_time(row, "updated_at")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub body: String,
    pub target: Option<NoteTarget>,
}

impl NewNote {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            target: None,
        }
    }

    pub fn target(mut self, target: impl Into<NoteTarget>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let mut errors = ValidationErrors::new();
        if self.body.trim().is_empty() {
            errors.add("body", "must not be blank");
        }
        if self.target.is_none() {
            errors.add("target", "must be attached to a record");
        }
        validated(errors)
    }
}

impl Note {
    pub fn create(db: &Database, new: &NewNote) -> Result<Self, DbError> {
        new.validate()?;
        let Some(target) = &new.target else {
            return Err(DbError::invalid("target", "must be attached to a record"));
        };
        let id = insert(
            db,
            Self::TABLE,
            &[
                ("body", text(new.body.as_str())),
                (target.column(), target.value()),
                ("updated_at", text(format_time(&now()))),
            ],
        )?;
        Self::get(db, id)
    }

    /// Replace the note's body and bump `updated_at`.
    pub fn update_body(&mut self, db: &Database, body: &str) -> Result<(), DbError> {
        if body.trim().is_empty() {
            return Err(DbError::invalid("body", "must not be blank"));
        }
        let at = now();
        let updated = db.execute(
            "UPDATE dossier_notes SET body = ?, updated_at = ? WHERE id = ?",
            &[text(body), text(format_time(&at)), self.id.into()],
        )?;
        if updated == 0 {
            return Err(DbError::not_found(Self::TABLE, self.id));
        }
        debug!(id = self.id, "Updated note");
        self.body = body.to_string();
        self.updated_at = at;
        Ok(())
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.body)
    }
}

impl Query<Note> {
    pub fn attached_to(self, target: &NoteTarget) -> Self {
        self.where_eq(target.column(), target.value())
    }

    /// Notes whose body contains `fragment`.
    pub fn containing(self, fragment: &str) -> Self {
        self.filter(
            "dossier_notes.body LIKE ? ESCAPE '\\'",
            [text(format!("%{}%", like_escape(fragment)))],
        )
    }
}
