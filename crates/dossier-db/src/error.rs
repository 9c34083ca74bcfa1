use dossier_core::{ConfigError, ParseError, ValidationErrors};
use rusqlite::ErrorCode;

/// Errors from store operations.
///
/// Callers tell the three caller-facing failure kinds apart with
/// [`is_validation`](Self::is_validation), [`is_malformed`](Self::is_malformed),
/// [`is_conflict`](Self::is_conflict) and [`is_not_found`](Self::is_not_found).
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A candidate record broke one or more write-time rules.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A natural key could not be parsed at all.
    #[error(transparent)]
    Malformed(#[from] ParseError),

    /// A uniqueness, foreign-key, or check constraint rejected the write.
    #[error("Integrity conflict: {message}")]
    Conflict { message: String },

    /// An operation required a row that does not exist.
    #[error("Record not found: {table} with id {id}")]
    NotFound { table: &'static str, id: String },

    #[error("Migration error: {0}")]
    Migration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl DbError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Validation(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, DbError::Malformed(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }

    /// The validation failures, when this is a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            DbError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub(crate) fn not_found(table: &'static str, id: impl ToString) -> Self {
        DbError::NotFound {
            table,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        DbError::Validation(ValidationErrors::single(field, message))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, message)
                if e.code == ErrorCode::ConstraintViolation =>
            {
                DbError::Conflict {
                    message: message.clone().unwrap_or_else(|| e.to_string()),
                }
            }
            _ => DbError::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violations_become_conflicts() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT NOT NULL UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: DbError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[test]
    fn other_sqlite_errors_pass_through() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: DbError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn kind_predicates() {
        let err = DbError::invalid("address", "is invalid");
        assert!(err.is_validation());
        assert!(err.validation_errors().unwrap().has("address"));

        let err: DbError = ParseError::InvalidPhoneNumber("x".into()).into();
        assert!(err.is_malformed());

        assert!(DbError::not_found("dossier_ports", 7).is_not_found());
    }
}
