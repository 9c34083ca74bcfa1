//! Captured HTTP exchanges: a request, its headers and query parameters,
//! and at most one response with its own headers.

use chrono::{DateTime, Utc};
use dossier_core::parse::parse_query_string;
use dossier_core::types::{HttpMethod, HttpVersion};
use dossier_core::ValidationErrors;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::name_pools::{HttpHeaderName, HttpQueryParamName};
use crate::query::{int, text, Query};
use crate::record::{enum_text, get_enum, get_time, insert, opt_text, validated, Importable, Record};

// ── Requests ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub id: i64,
    pub version: HttpVersion,
    pub request_method: HttpMethod,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for HttpRequest {
    const TABLE: &'static str = "dossier_http_requests";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "version",
        "request_method",
        "path",
        "query",
        "body",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            version: get_enum(row, "version", "HTTP version")?,
            request_method: get_enum(row, "request_method", "HTTP method")?,
            path: row.get("path")?,
            query: row.get("query")?,
            body: row.get("body")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// A request to record, with its headers in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHttpRequest {
    pub version: HttpVersion,
    pub request_method: HttpMethod,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl NewHttpRequest {
    /// An HTTP/1.1 request without headers or body.
    pub fn new(request_method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            version: HttpVersion::Http11,
            request_method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let mut errors = ValidationErrors::new();
        if self.path.is_empty() {
            errors.add("path", "must be present");
        }
        for (name, _) in &self.headers {
            if name.trim().is_empty() {
                errors.add("headers", "header names must be present");
                break;
            }
        }
        validated(errors)
    }
}

impl HttpRequest {
    /// Record a request along with its headers and the parameters of its
    /// query string.
    pub fn create(db: &Database, new: &NewHttpRequest) -> Result<Self, DbError> {
        new.validate()?;
        let query = new
            .query
            .as_deref()
            .map(|q| q.trim_start_matches('?'))
            .filter(|q| !q.is_empty());

        db.transaction(|db| {
            let id = insert(
                db,
                Self::TABLE,
                &[
                    ("version", enum_text(&new.version)),
                    ("request_method", enum_text(&new.request_method)),
                    ("path", text(new.path.as_str())),
                    ("query", opt_text(query)),
                    ("body", opt_text(new.body.as_deref())),
                ],
            )?;

            for (name, value) in &new.headers {
                let name = HttpHeaderName::import(db, name)?;
                insert(
                    db,
                    HttpRequestHeader::TABLE,
                    &[
                        ("name_id", int(name.id)),
                        ("value", text(value.as_str())),
                        ("request_id", int(id)),
                    ],
                )?;
            }

            for (name, value) in query.map(parse_query_string).unwrap_or_default() {
                if name.trim().is_empty() {
                    continue;
                }
                let name = HttpQueryParamName::import(db, &name)?;
                insert(
                    db,
                    HttpQueryParam::TABLE,
                    &[
                        ("name_id", int(name.id)),
                        ("value", text(value)),
                        ("request_id", int(id)),
                    ],
                )?;
            }

            Self::get(db, id)
        })
    }

    pub fn headers(&self, db: &Database) -> Result<Vec<HttpRequestHeader>, DbError> {
        HttpRequestHeader::query().where_eq("request_id", self.id).all(db)
    }

    /// Values of every header with this name, compared case-insensitively.
    pub fn header_values(&self, db: &Database, name: &str) -> Result<Vec<String>, DbError> {
        let sql = "SELECT h.value FROM dossier_http_request_headers h
                   JOIN dossier_http_header_names n ON n.id = h.name_id
                   WHERE h.request_id = ? AND n.name = ? COLLATE NOCASE ORDER BY h.id";
        db.query_rows(sql, &[int(self.id), text(name.trim())], |row| row.get(0))
    }

    pub fn query_params(&self, db: &Database) -> Result<Vec<HttpQueryParam>, DbError> {
        HttpQueryParam::query().where_eq("request_id", self.id).all(db)
    }

    pub fn response(&self, db: &Database) -> Result<Option<HttpResponse>, DbError> {
        HttpResponse::query().where_eq("request_id", self.id).first(db)
    }

    /// Record the response to this request. A request has at most one; a
    /// second response is a conflict.
    pub fn respond(&self, db: &Database, new: &NewHttpResponse) -> Result<HttpResponse, DbError> {
        HttpResponse::create(db, self, new)
    }
}

impl Query<HttpRequest> {
    pub fn with_request_method(self, method: HttpMethod) -> Self {
        self.where_eq("request_method", enum_text(&method))
    }

    pub fn with_version(self, version: HttpVersion) -> Self {
        self.where_eq("version", enum_text(&version))
    }

    pub fn with_path(self, path: &str) -> Self {
        self.where_eq("path", text(path))
    }

    pub fn with_header_name(self, name: &str) -> Self {
        self.filter(
            "dossier_http_requests.id IN (
                SELECT h.request_id FROM dossier_http_request_headers h
                JOIN dossier_http_header_names n ON n.id = h.name_id
                WHERE n.name = ? COLLATE NOCASE)",
            [text(name.trim())],
        )
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        self.filter(
            "dossier_http_requests.id IN (
                SELECT h.request_id FROM dossier_http_request_headers h
                JOIN dossier_http_header_names n ON n.id = h.name_id
                WHERE n.name = ? COLLATE NOCASE AND h.value = ?)",
            [text(name.trim()), text(value)],
        )
    }

    pub fn with_query_param(self, name: &str) -> Self {
        self.filter(
            "dossier_http_requests.id IN (
                SELECT p.request_id FROM dossier_http_query_params p
                JOIN dossier_http_query_param_names n ON n.id = p.name_id
                WHERE n.name = ?)",
            [text(name.trim())],
        )
    }

    pub fn with_query_param_value(self, value: &str) -> Self {
        self.filter(
            "dossier_http_requests.id IN (
                SELECT request_id FROM dossier_http_query_params WHERE value = ?)",
            [text(value)],
        )
    }

    pub fn with_response_status(self, status: u16) -> Self {
        self.filter(
            "dossier_http_requests.id IN (
                SELECT request_id FROM dossier_http_responses WHERE status = ?)",
            [int(status)],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestHeader {
    pub id: i64,
    pub name_id: i64,
    pub value: String,
    pub request_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for HttpRequestHeader {
    const TABLE: &'static str = "dossier_http_request_headers";
    const COLUMNS: &'static [&'static str] = &["id", "name_id", "value", "request_id", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name_id: row.get("name_id")?,
            value: row.get("value")?,
            request_id: row.get("request_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl HttpRequestHeader {
    pub fn name(&self, db: &Database) -> Result<HttpHeaderName, DbError> {
        HttpHeaderName::get(db, self.name_id)
    }

    pub fn request(&self, db: &Database) -> Result<HttpRequest, DbError> {
        HttpRequest::get(db, self.request_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpQueryParam {
    pub id: i64,
    pub name_id: i64,
    pub value: String,
    pub request_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for HttpQueryParam {
    const TABLE: &'static str = "dossier_http_query_params";
    const COLUMNS: &'static [&'static str] = &["id", "name_id", "value", "request_id", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name_id: row.get("name_id")?,
            value: row.get("value")?,
            request_id: row.get("request_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl HttpQueryParam {
    pub fn name(&self, db: &Database) -> Result<HttpQueryParamName, DbError> {
        HttpQueryParamName::get(db, self.name_id)
    }

    pub fn request(&self, db: &Database) -> Result<HttpRequest, DbError> {
        HttpRequest::get(db, self.request_id)
    }
}

// ── Responses ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub id: i64,
    pub status: u16,
    pub body: Option<String>,
    pub request_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for HttpResponse {
    const TABLE: &'static str = "dossier_http_responses";
    const COLUMNS: &'static [&'static str] = &["id", "status", "body", "request_id", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            status: row.get("status")?,
            body: row.get("body")?,
            request_id: row.get("request_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl NewHttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let mut errors = ValidationErrors::new();
        if !(100..=599).contains(&self.status) {
            errors.add("status", "must be between 100 and 599");
        }
        if self.headers.iter().any(|(name, _)| name.trim().is_empty()) {
            errors.add("headers", "header names must be present");
        }
        validated(errors)
    }
}

impl HttpResponse {
    pub fn create(db: &Database, request: &HttpRequest, new: &NewHttpResponse) -> Result<Self, DbError> {
        new.validate()?;
        db.transaction(|db| {
            let id = insert(
                db,
                Self::TABLE,
                &[
                    ("status", int(new.status)),
                    ("body", opt_text(new.body.as_deref())),
                    ("request_id", int(request.id)),
                ],
            )?;
            for (name, value) in &new.headers {
                let name = HttpHeaderName::import(db, name)?;
                insert(
                    db,
                    HttpResponseHeader::TABLE,
                    &[
                        ("name_id", int(name.id)),
                        ("value", text(value.as_str())),
                        ("response_id", int(id)),
                    ],
                )?;
            }
            Self::get(db, id)
        })
    }

    pub fn request(&self, db: &Database) -> Result<HttpRequest, DbError> {
        HttpRequest::get(db, self.request_id)
    }

    pub fn headers(&self, db: &Database) -> Result<Vec<HttpResponseHeader>, DbError> {
        HttpResponseHeader::query().where_eq("response_id", self.id).all(db)
    }

    pub fn header_values(&self, db: &Database, name: &str) -> Result<Vec<String>, DbError> {
        let sql = "SELECT h.value FROM dossier_http_response_headers h
                   JOIN dossier_http_header_names n ON n.id = h.name_id
                   WHERE h.response_id = ? AND n.name = ? COLLATE NOCASE ORDER BY h.id";
        db.query_rows(sql, &[int(self.id), text(name.trim())], |row| row.get(0))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

impl Query<HttpResponse> {
    pub fn with_status(self, status: u16) -> Self {
        self.where_eq("status", int(status))
    }

    pub fn with_header_name(self, name: &str) -> Self {
        self.filter(
            "dossier_http_responses.id IN (
                SELECT h.response_id FROM dossier_http_response_headers h
                JOIN dossier_http_header_names n ON n.id = h.name_id
                WHERE n.name = ? COLLATE NOCASE)",
            [text(name.trim())],
        )
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        self.filter(
            "dossier_http_responses.id IN (
                SELECT h.response_id FROM dossier_http_response_headers h
                JOIN dossier_http_header_names n ON n.id = h.name_id
                WHERE n.name = ? COLLATE NOCASE AND h.value = ?)",
            [text(name.trim()), text(value)],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseHeader {
    pub id: i64,
    pub name_id: i64,
    pub value: String,
    pub response_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for HttpResponseHeader {
    const TABLE: &'static str = "dossier_http_response_headers";
    const COLUMNS: &'static [&'static str] = &["id", "name_id", "value", "response_id", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name_id: row.get("name_id")?,
            value: row.get("value")?,
            response_id: row.get("response_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl HttpResponseHeader {
    pub fn name(&self, db: &Database) -> Result<HttpHeaderName, DbError> {
        HttpHeaderName::get(db, self.name_id)
    }

    pub fn response(&self, db: &Database) -> Result<HttpResponse, DbError> {
        HttpResponse::get(db, self.response_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_request() -> NewHttpRequest {
        NewHttpRequest::new(HttpMethod::Post, "/login")
            .query("?next=%2Fadmin&lang=en")
            .header("Host", "example.com")
            .header("User-Agent", "curl/8.0")
            .body("user=admin&pass=admin")
    }

    #[test]
    fn test_create_request() {
        let db = Database::open_in_memory().unwrap();
        let request = HttpRequest::create(&db, &login_request()).unwrap();
        assert_eq!(request.version, HttpVersion::Http11);
        assert_eq!(request.request_method, HttpMethod::Post);
        assert_eq!(request.query.as_deref(), Some("next=%2Fadmin&lang=en"));

        let headers = request.headers(&db).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].name(&db).unwrap().name, "Host");
        assert_eq!(headers[1].request(&db).unwrap(), request);
        assert_eq!(request.header_values(&db, "user-agent").unwrap(), vec!["curl/8.0"]);

        let params = request.query_params(&db).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name(&db).unwrap().name, "next");
        assert_eq!(params[0].value, "/admin");

        // Each capture is its own row.
        let again = HttpRequest::create(&db, &login_request()).unwrap();
        assert_ne!(again.id, request.id);
        assert_eq!(HttpHeaderName::count(&db).unwrap(), 2);
    }

    #[test]
    fn test_validation() {
        let db = Database::open_in_memory().unwrap();
        let err = HttpRequest::create(&db, &NewHttpRequest::new(HttpMethod::Get, "")).unwrap_err();
        assert!(err.validation_errors().unwrap().has("path"));

        let request = HttpRequest::create(&db, &NewHttpRequest::new(HttpMethod::Get, "/")).unwrap();
        let err = request.respond(&db, &NewHttpResponse::new(99)).unwrap_err();
        assert!(err.validation_errors().unwrap().has("status"));
        assert!(request.respond(&db, &NewHttpResponse::new(600)).is_err());
        assert_eq!(HttpResponse::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_one_response_per_request() {
        let db = Database::open_in_memory().unwrap();
        let request = HttpRequest::create(&db, &login_request()).unwrap();
        let response = request
            .respond(
                &db,
                &NewHttpResponse::new(302)
                    .header("Location", "/admin")
                    .header("Set-Cookie", "session=abc"),
            )
            .unwrap();
        assert!(response.is_redirect());
        assert_eq!(request.response(&db).unwrap(), Some(response.clone()));
        assert_eq!(response.request(&db).unwrap(), request);
        assert_eq!(response.header_values(&db, "location").unwrap(), vec!["/admin"]);
        assert_eq!(response.headers(&db).unwrap()[1].response(&db).unwrap(), response);

        let err = request.respond(&db, &NewHttpResponse::new(200)).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(HttpResponseHeader::count(&db).unwrap(), 2);

        request.destroy(&db).unwrap();
        assert_eq!(HttpResponse::count(&db).unwrap(), 0);
        assert_eq!(HttpResponseHeader::count(&db).unwrap(), 0);
        assert_eq!(HttpRequestHeader::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        let login = HttpRequest::create(&db, &login_request()).unwrap();
        let home = HttpRequest::create(
            &db,
            &NewHttpRequest::new(HttpMethod::Get, "/")
                .version(HttpVersion::Http20)
                .header("Host", "example.com")
                .header("Accept", "*/*"),
        )
        .unwrap();
        login
            .respond(&db, &NewHttpResponse::new(302).header("Location", "/admin"))
            .unwrap();
        home.respond(&db, &NewHttpResponse::new(200).body("<html></html>"))
            .unwrap();

        let requests = HttpRequest::query();
        assert_eq!(
            requests.clone().with_request_method(HttpMethod::Get).all(&db).unwrap(),
            vec![home.clone()]
        );
        assert_eq!(requests.clone().with_version(HttpVersion::Http20).count(&db).unwrap(), 1);
        assert_eq!(requests.clone().with_path("/login").all(&db).unwrap(), vec![login.clone()]);
        assert_eq!(requests.clone().with_header_name("host").count(&db).unwrap(), 2);
        assert_eq!(requests.clone().with_header("Accept", "*/*").all(&db).unwrap(), vec![home]);
        assert_eq!(requests.clone().with_query_param("lang").count(&db).unwrap(), 1);
        assert_eq!(requests.clone().with_query_param_value("en").count(&db).unwrap(), 1);
        assert_eq!(requests.with_response_status(302).all(&db).unwrap(), vec![login]);

        let responses = HttpResponse::query();
        assert_eq!(responses.clone().with_status(200).count(&db).unwrap(), 1);
        assert_eq!(responses.clone().with_header_name("LOCATION").count(&db).unwrap(), 1);
        assert_eq!(responses.with_header("Location", "/admin").count(&db).unwrap(), 1);
    }
}
