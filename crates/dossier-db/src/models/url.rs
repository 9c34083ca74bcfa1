//! Normalized URLs.
//!
//! A URL is stored as scheme, host name, effective port, path, query and
//! fragment. Its query string is also broken out into [`UrlQueryParam`]
//! rows so URLs can be searched by parameter.

use chrono::{DateTime, Utc};
use dossier_core::parse::UrlParts;
use dossier_core::types::Protocol;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::host_name::HostName;
use crate::models::name_pools::{UrlQueryParamName, UrlScheme};
use crate::models::port::Port;
use crate::query::{int, like_escape, text, Query};
use crate::record::{
    find_or_create, get_opt_time, get_time, opt_int, opt_text, Importable, LastScannedAt, Record,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    pub id: i64,
    pub scheme_id: i64,
    pub host_name_id: i64,
    pub port_id: Option<i64>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for Url {
    const TABLE: &'static str = "dossier_urls";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "scheme_id",
        "host_name_id",
        "port_id",
        "path",
        "query",
        "fragment",
        "last_scanned_at",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            scheme_id: row.get("scheme_id")?,
            host_name_id: row.get("host_name_id")?,
            port_id: row.get("port_id")?,
            path: row.get("path")?,
            query: row.get("query")?,
            fragment: row.get("fragment")?,
            last_scanned_at: get_opt_time(row, "last_scanned_at")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl LastScannedAt for Url {
    fn last_scanned_at(&self) -> Option<DateTime<Utc>> {
        self.last_scanned_at
    }

    fn set_last_scanned_at(&mut self, at: DateTime<Utc>) {
        self.last_scanned_at = Some(at);
    }
}

fn url_key(
    scheme_id: i64,
    host_name_id: i64,
    port_id: Option<i64>,
    parts: &UrlParts,
) -> Query<Url> {
    Url::query()
        .where_eq("scheme_id", scheme_id)
        .where_eq("host_name_id", host_name_id)
        .where_eq_nullable("port_id", opt_int(port_id))
        .where_eq("path", text(parts.path.as_str()))
        .where_eq_nullable("query", opt_text(parts.query.as_deref()))
        .where_eq_nullable("fragment", opt_text(parts.fragment.as_deref()))
}

impl Importable for Url {
    type Key = str;

    fn lookup(db: &Database, url: &str) -> Result<Option<Self>, DbError> {
        let Ok(parts) = UrlParts::parse(url) else {
            return Ok(None);
        };
        let Some(scheme) = UrlScheme::lookup(db, &parts.scheme)? else {
            return Ok(None);
        };
        let Some(host) = HostName::lookup(db, &parts.host)? else {
            return Ok(None);
        };
        let port_id = match parts.port {
            Some(number) => match Port::lookup(db, &(Protocol::Tcp, number))? {
                Some(port) => Some(port.id),
                None => return Ok(None),
            },
            None => None,
        };
        url_key(scheme.id, host.id, port_id, &parts).first(db)
    }

    fn import(db: &Database, url: &str) -> Result<Self, DbError> {
        Self::import_parts(db, &UrlParts::parse(url)?)
    }
}

impl Url {
    /// Import an already decomposed URL, along with its scheme, host name,
    /// port and query parameters.
    pub fn import_parts(db: &Database, parts: &UrlParts) -> Result<Self, DbError> {
        db.transaction(|db| {
            let scheme = UrlScheme::import(db, &parts.scheme)?;
            let host = HostName::import(db, &parts.host)?;
            let port_id = match parts.port {
                Some(number) => Some(Port::import(db, &(Protocol::Tcp, number))?.id),
                None => None,
            };

            let url = find_or_create(
                db,
                Self::TABLE,
                &[
                    ("scheme_id", int(scheme.id)),
                    ("host_name_id", int(host.id)),
                    ("port_id", opt_int(port_id)),
                    ("path", text(parts.path.as_str())),
                    ("query", opt_text(parts.query.as_deref())),
                    ("fragment", opt_text(parts.fragment.as_deref())),
                ],
                url_key(scheme.id, host.id, port_id, parts),
            )?;

            for (name, value) in &parts.query_params {
                if name.trim().is_empty() {
                    continue;
                }
                UrlQueryParam::add(db, &url, name, value)?;
            }
            Ok(url)
        })
    }

    pub fn scheme(&self, db: &Database) -> Result<UrlScheme, DbError> {
        UrlScheme::get(db, self.scheme_id)
    }

    pub fn host_name(&self, db: &Database) -> Result<HostName, DbError> {
        HostName::get(db, self.host_name_id)
    }

    pub fn port(&self, db: &Database) -> Result<Option<Port>, DbError> {
        match self.port_id {
            Some(id) => Port::find(db, id),
            None => Ok(None),
        }
    }

    pub fn query_params(&self, db: &Database) -> Result<Vec<UrlQueryParam>, DbError> {
        UrlQueryParam::query().where_eq("url_id", self.id).all(db)
    }

    /// Query parameters as `(name, value)` pairs in insertion order.
    pub fn query_param_pairs(&self, db: &Database) -> Result<Vec<(String, String)>, DbError> {
        let sql = "SELECT n.name, p.value FROM dossier_url_query_params p
                   JOIN dossier_url_query_param_names n ON n.id = p.name_id
                   WHERE p.url_id = ? ORDER BY p.id";
        db.query_rows(sql, &[int(self.id)], |row| Ok((row.get(0)?, row.get(1)?)))
    }

    /// Reassemble the stored columns into a [`UrlParts`].
    pub fn parts(&self, db: &Database) -> Result<UrlParts, DbError> {
        Ok(UrlParts {
            scheme: self.scheme(db)?.name,
            host: self.host_name(db)?.name,
            port: self.port(db)?.map(|p| p.number),
            path: self.path.clone(),
            query: self.query.clone(),
            fragment: self.fragment.clone(),
            query_params: self.query_param_pairs(db)?,
        })
    }

    /// The URL as text. A port equal to the scheme default is left out.
    pub fn to_uri(&self, db: &Database) -> Result<String, DbError> {
        Ok(self.parts(db)?.to_uri())
    }

    /// The last path segment.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Extension of the last path segment, without the dot.
    pub fn file_ext(&self) -> Option<&str> {
        let basename = self.basename();
        match basename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

impl Query<Url> {
    pub fn with_scheme(self, scheme: &str) -> Self {
        self.filter(
            "dossier_urls.scheme_id IN (SELECT id FROM dossier_url_schemes WHERE name = ?)",
            [text(scheme.trim().to_ascii_lowercase())],
        )
    }

    pub fn http(self) -> Self {
        self.with_scheme("http")
    }

    pub fn https(self) -> Self {
        self.with_scheme("https")
    }

    pub fn with_host_name(self, name: &str) -> Self {
        self.filter(
            "dossier_urls.host_name_id IN (SELECT id FROM dossier_host_names WHERE name = ?)",
            [text(HostName::canonicalize(name))],
        )
    }

    pub fn with_port_number(self, number: u16) -> Self {
        self.filter(
            "dossier_urls.port_id IN (SELECT id FROM dossier_ports WHERE number = ?)",
            [int(number)],
        )
    }

    pub fn with_path(self, path: &str) -> Self {
        self.where_eq("path", text(path))
    }

    /// URLs at or below the directory `dir`.
    pub fn with_directory(self, dir: &str) -> Self {
        let dir = dir.trim_end_matches('/');
        self.filter(
            "dossier_urls.path = ? OR dossier_urls.path LIKE ? ESCAPE '\\'",
            [
                text(if dir.is_empty() { "/" } else { dir }),
                text(format!("{}/%", like_escape(dir))),
            ],
        )
    }

    /// URLs whose last path segment is `basename`.
    pub fn with_basename(self, basename: &str) -> Self {
        self.filter(
            "dossier_urls.path LIKE ? ESCAPE '\\'",
            [text(format!("%/{}", like_escape(basename)))],
        )
    }

    pub fn with_file_ext(self, ext: &str) -> Self {
        let ext = ext.trim_start_matches('.');
        self.filter(
            "dossier_urls.path LIKE ? ESCAPE '\\'",
            [text(format!("%.{}", like_escape(ext)))],
        )
    }

    pub fn with_query_param(self, name: &str) -> Self {
        self.filter(
            "dossier_urls.id IN (
                SELECT p.url_id FROM dossier_url_query_params p
                JOIN dossier_url_query_param_names n ON n.id = p.name_id
                WHERE n.name = ?)",
            [text(name.trim())],
        )
    }

    pub fn with_query_param_value(self, value: &str) -> Self {
        self.filter(
            "dossier_urls.id IN (SELECT url_id FROM dossier_url_query_params WHERE value = ?)",
            [text(value)],
        )
    }

    pub fn with_fragment(self, fragment: &str) -> Self {
        self.where_eq("fragment", text(fragment))
    }
}

/// One `name=value` pair of a URL's query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlQueryParam {
    pub id: i64,
    pub name_id: i64,
    pub url_id: i64,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

impl Record for UrlQueryParam {
    const TABLE: &'static str = "dossier_url_query_params";
    const COLUMNS: &'static [&'static str] = &["id", "name_id", "url_id", "value", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name_id: row.get("name_id")?,
            url_id: row.get("url_id")?,
            value: row.get("value")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl UrlQueryParam {
    /// Record a parameter on `url`. A name already present keeps its first
    /// value.
    pub fn add(db: &Database, url: &Url, name: &str, value: &str) -> Result<Self, DbError> {
        db.transaction(|db| {
            let name = UrlQueryParamName::import(db, name)?;
            find_or_create(
                db,
                Self::TABLE,
                &[
                    ("name_id", int(name.id)),
                    ("url_id", int(url.id)),
                    ("value", text(value)),
                ],
                Self::query()
                    .where_eq("url_id", url.id)
                    .where_eq("name_id", name.id),
            )
        })
    }

    pub fn name(&self, db: &Database) -> Result<UrlQueryParamName, DbError> {
        UrlQueryParamName::get(db, self.name_id)
    }

    pub fn url(&self, db: &Database) -> Result<Url, DbError> {
        Url::get(db, self.url_id)
    }
}
