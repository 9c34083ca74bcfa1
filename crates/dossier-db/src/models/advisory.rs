use chrono::{DateTime, Utc};
use dossier_core::parse::AdvisoryId;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, opt_int, Importable, Record};

/// A published security advisory, keyed by its identifier
/// (`CVE-2021-1234`, `MS08-067`, `GHSA-xxxx-xxxx-xxxx`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub id: String,
    pub prefix: String,
    pub year: Option<i32>,
    pub identifier: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Advisory {
    const TABLE: &'static str = "dossier_advisories";
    const COLUMNS: &'static [&'static str] = &["id", "prefix", "year", "identifier", "created_at"];
    type Id = String;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            prefix: row.get("prefix")?,
            year: row.get("year")?,
            identifier: row.get("identifier")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Importable for Advisory {
    type Key = str;

    fn lookup(db: &Database, id: &str) -> Result<Option<Self>, DbError> {
        Self::find(db, id.trim().to_string())
    }

    fn import(db: &Database, id: &str) -> Result<Self, DbError> {
        let parsed = AdvisoryId::parse(id)?;
        parsed.validate()?;
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("id", text(parsed.id.as_str())),
                ("prefix", text(parsed.prefix.as_str())),
                ("year", opt_int(parsed.year.map(i64::from))),
                ("identifier", text(parsed.identifier.as_str())),
            ],
            Self::query().with_id(parsed.id.clone()),
        )
    }
}

impl Advisory {
    pub fn parsed(&self) -> AdvisoryId {
        AdvisoryId {
            id: self.id.clone(),
            prefix: self.prefix.clone(),
            year: self.year,
            identifier: self.identifier.clone(),
        }
    }

    /// The publisher's page for this advisory, when it has a known one.
    pub fn url(&self) -> Option<String> {
        self.parsed().url()
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl Query<Advisory> {
    pub fn with_prefix(self, prefix: &str) -> Self {
        self.where_eq("prefix", text(prefix))
    }

    pub fn with_year(self, year: i32) -> Self {
        self.where_eq("year", int(year))
    }

    pub fn cves(self) -> Self {
        self.with_prefix("CVE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_cve() {
        let db = Database::open_in_memory().unwrap();
        let cve = Advisory::import(&db, "CVE-2021-1234").unwrap();
        assert_eq!(cve.id, "CVE-2021-1234");
        assert_eq!(cve.prefix, "CVE");
        assert_eq!(cve.year, Some(2021));
        assert_eq!(cve.identifier, "1234");
        assert_eq!(
            cve.url().as_deref(),
            Some("https://nvd.nist.gov/vuln/detail/CVE-2021-1234")
        );
        assert_eq!(Advisory::import(&db, " CVE-2021-1234 ").unwrap(), cve);
        assert_eq!(Advisory::lookup(&db, "CVE-2021-1234").unwrap(), Some(cve.clone()));
        assert_eq!(Advisory::get(&db, "CVE-2021-1234".to_string()).unwrap(), cve);
    }

    #[test]
    fn test_import_microsoft_bulletin() {
        let db = Database::open_in_memory().unwrap();
        let ms = Advisory::import(&db, "MS08-067").unwrap();
        assert_eq!(ms.prefix, "MS");
        assert_eq!(ms.year, Some(2008));
        assert_eq!(ms.identifier, "067");
    }

    #[test]
    fn test_rejections() {
        let db = Database::open_in_memory().unwrap();
        assert!(Advisory::import(&db, "not-a-valid-id!!").unwrap_err().is_malformed());
        let err = Advisory::import(&db, "CVE-1989-0001").unwrap_err();
        assert!(err.validation_errors().unwrap().has("year"));
        assert!(Advisory::lookup(&db, "CVE-1989-0001").unwrap().is_none());
        assert!(Advisory::get(&db, "CVE-1989-0001".to_string()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        for id in ["CVE-2021-1234", "CVE-2014-0160", "GHSA-abcd-1234-wxyz", "MS08-067"] {
            Advisory::import(&db, id).unwrap();
        }
        assert_eq!(Advisory::query().cves().count(&db).unwrap(), 2);
        assert_eq!(Advisory::query().with_prefix("GHSA").count(&db).unwrap(), 1);
        assert_eq!(Advisory::query().with_year(2008).count(&db).unwrap(), 1);
    }
}
