use chrono::{DateTime, Utc};
use dossier_core::digest::{digest, DigestAlgorithm};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, Importable, Record};

/// A recovered plain-text password. Stored verbatim: surrounding
/// whitespace is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Password {
    pub id: i64,
    pub plain_text: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Password {
    const TABLE: &'static str = "dossier_passwords";
    const COLUMNS: &'static [&'static str] = &["id", "plain_text", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            plain_text: row.get("plain_text")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Importable for Password {
    type Key = str;

    fn lookup(db: &Database, plain_text: &str) -> Result<Option<Self>, DbError> {
        Self::query().with_plain_text(plain_text).first(db)
    }

    fn import(db: &Database, plain_text: &str) -> Result<Self, DbError> {
        if plain_text.is_empty() {
            return Err(DbError::invalid("plain_text", "must be present"));
        }
        find_or_create(
            db,
            Self::TABLE,
            &[("plain_text", text(plain_text))],
            Self::query().with_plain_text(plain_text),
        )
    }
}

impl Password {
    /// Lowercase hex digest of the salted password.
    pub fn digest(
        &self,
        algorithm: DigestAlgorithm,
        prepend_salt: Option<&str>,
        append_salt: Option<&str>,
    ) -> String {
        digest(&self.plain_text, algorithm, prepend_salt, append_salt)
    }

    pub fn len(&self) -> usize {
        self.plain_text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.plain_text.is_empty()
    }
}

impl std::fmt::Display for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.plain_text)
    }
}

impl Query<Password> {
    pub fn with_plain_text(self, plain_text: &str) -> Self {
        self.where_eq("plain_text", text(plain_text))
    }

    /// Passwords longer than `min` bytes.
    pub fn longer_than(self, min: usize) -> Self {
        self.filter(
            "LENGTH(CAST(dossier_passwords.plain_text AS BLOB)) > ?",
            [int(min as i64)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_keeps_whitespace() {
        let db = Database::open_in_memory().unwrap();
        let padded = Password::import(&db, " hunter2 ").unwrap();
        let bare = Password::import(&db, "hunter2").unwrap();
        assert_ne!(padded.id, bare.id);
        assert_eq!(Password::import(&db, "hunter2").unwrap(), bare);
        assert!(Password::import(&db, "").unwrap_err().is_validation());
    }

    #[test]
    fn test_digest() {
        let db = Database::open_in_memory().unwrap();
        let password = Password::import(&db, "password").unwrap();
        assert_eq!(
            password.digest(DigestAlgorithm::Sha256, None, None),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert_eq!(
            password.digest(DigestAlgorithm::Sha256, Some("pass"), None),
            digest("password", DigestAlgorithm::Sha256, Some("pass"), None)
        );
        assert_eq!(password.digest(DigestAlgorithm::Sha512, None, Some("s")).len(), 128);
        assert_eq!(password.digest(DigestAlgorithm::Blake3, None, None).len(), 64);
    }

    #[test]
    fn test_length_scope() {
        let db = Database::open_in_memory().unwrap();
        for p in ["a", "abcd", "abcdefgh"] {
            Password::import(&db, p).unwrap();
        }
        assert_eq!(Password::query().longer_than(3).count(&db).unwrap(), 2);
    }
}
