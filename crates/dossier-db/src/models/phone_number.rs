use chrono::{DateTime, Utc};
use dossier_core::parse::PhoneParts;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::query::{text, Query};
use crate::record::{find_or_create, get_time, opt_text, Importable, Record};

/// A phone number as it was written, with its parsed components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: i64,
    pub number: String,
    pub country_code: Option<String>,
    pub area_code: Option<String>,
    pub prefix: String,
    pub line_number: String,
    pub created_at: DateTime<Utc>,
}

impl Record for PhoneNumber {
    const TABLE: &'static str = "dossier_phone_numbers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "number",
        "country_code",
        "area_code",
        "prefix",
        "line_number",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            number: row.get("number")?,
            country_code: row.get("country_code")?,
            area_code: row.get("area_code")?,
            prefix: row.get("prefix")?,
            line_number: row.get("line_number")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Importable for PhoneNumber {
    type Key = str;

    fn lookup(db: &Database, number: &str) -> Result<Option<Self>, DbError> {
        Self::query().where_eq("number", text(number.trim())).first(db)
    }

    fn import(db: &Database, number: &str) -> Result<Self, DbError> {
        let parts = PhoneParts::parse(number)?;
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("number", text(parts.number.as_str())),
                ("country_code", opt_text(parts.country_code.as_deref())),
                ("area_code", opt_text(parts.area_code.as_deref())),
                ("prefix", text(parts.prefix.as_str())),
                ("line_number", text(parts.line_number.as_str())),
            ],
            Self::query().where_eq("number", text(parts.number.as_str())),
        )
    }
}

impl PhoneNumber {
    pub fn parts(&self) -> PhoneParts {
        PhoneParts {
            number: self.number.clone(),
            country_code: self.country_code.clone(),
            area_code: self.area_code.clone(),
            prefix: self.prefix.clone(),
            line_number: self.line_number.clone(),
        }
    }

    /// Digits only, `+` prefixed when the country code is known.
    pub fn digits(&self) -> String {
        self.parts().digits()
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.number)
    }
}

impl Query<PhoneNumber> {
    pub fn with_country_code(self, code: &str) -> Self {
        self.where_eq("country_code", text(code.trim_start_matches('+')))
    }

    pub fn with_area_code(self, code: &str) -> Self {
        self.where_eq("area_code", text(code))
    }

    pub fn with_prefix(self, prefix: &str) -> Self {
        self.where_eq("prefix", text(prefix))
    }

    pub fn with_line_number(self, line_number: &str) -> Self {
        self.where_eq("line_number", text(line_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let phone = PhoneNumber::import(&db, "+1 (555) 123-4567").unwrap();
        assert_eq!(phone.country_code.as_deref(), Some("1"));
        assert_eq!(phone.area_code.as_deref(), Some("555"));
        assert_eq!(phone.prefix, "123");
        assert_eq!(phone.line_number, "4567");
        assert_eq!(phone.digits(), "+15551234567");
        assert_eq!(PhoneNumber::import(&db, " +1 (555) 123-4567 ").unwrap(), phone);
        assert_eq!(PhoneNumber::count(&db).unwrap(), 1);
    }

    #[test]
    fn test_malformed() {
        let db = Database::open_in_memory().unwrap();
        assert!(PhoneNumber::import(&db, "call me maybe").unwrap_err().is_malformed());
        assert!(PhoneNumber::lookup(&db, "call me maybe").unwrap().is_none());
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        for number in ["+1 (555) 123-4567", "555.123.9999", "1-212-555-0100", "123-4567"] {
            PhoneNumber::import(&db, number).unwrap();
        }
        assert_eq!(PhoneNumber::query().with_country_code("+1").count(&db).unwrap(), 2);
        assert_eq!(PhoneNumber::query().with_area_code("555").count(&db).unwrap(), 2);
        assert_eq!(PhoneNumber::query().with_prefix("123").count(&db).unwrap(), 3);
        assert_eq!(PhoneNumber::query().with_line_number("4567").count(&db).unwrap(), 2);
    }
}
