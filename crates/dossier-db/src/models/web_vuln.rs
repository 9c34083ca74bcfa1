//! Web application vulnerabilities found in a specific request parameter.
//!
//! Each vulnerability type carries its own set of exploitation details, so
//! the details are modelled as an enum and the stored `type` always agrees
//! with them.

use chrono::{DateTime, Utc};
use dossier_core::types::{
    HttpMethod, LfiFilterBypass, LfiOs, RfiFilterBypass, RfiScriptLang, SstiEscapeType,
    WebVulnType,
};
use dossier_core::ValidationErrors;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::host_name::HostName;
use crate::models::url::Url;
use crate::query::{int, text, Query};
use crate::record::{
    enum_text, find_or_create, get_enum, get_opt_enum, get_time, opt_enum_text, opt_text,
    validated, Record,
};

/// Type-specific exploitation details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebVulnDetails {
    Lfi {
        os: Option<LfiOs>,
        depth: Option<u32>,
        filter_bypass: Option<LfiFilterBypass>,
    },
    Rfi {
        script_lang: Option<RfiScriptLang>,
        filter_bypass: Option<RfiFilterBypass>,
    },
    Sqli {
        escape_quote: bool,
        escape_parens: bool,
        terminate: bool,
    },
    Ssti {
        escape_type: Option<SstiEscapeType>,
    },
    OpenRedirect,
    ReflectedXss,
    CommandInjection {
        escape_operator: Option<String>,
        terminator: Option<String>,
    },
}

impl WebVulnDetails {
    pub fn kind(&self) -> WebVulnType {
        match self {
            WebVulnDetails::Lfi { .. } => WebVulnType::Lfi,
            WebVulnDetails::Rfi { .. } => WebVulnType::Rfi,
            WebVulnDetails::Sqli { .. } => WebVulnType::Sqli,
            WebVulnDetails::Ssti { .. } => WebVulnType::Ssti,
            WebVulnDetails::OpenRedirect => WebVulnType::OpenRedirect,
            WebVulnDetails::ReflectedXss => WebVulnType::ReflectedXss,
            WebVulnDetails::CommandInjection { .. } => WebVulnType::CommandInjection,
        }
    }

    /// Values for every detail column. Columns belonging to other types are
    /// NULL.
    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut values: Vec<(&'static str, Value)> = DETAIL_COLUMNS
            .iter()
            .map(|column| (*column, Value::Null))
            .collect();
        let mut set = |column: &str, value: Value| {
            if let Some(slot) = values.iter_mut().find(|(c, _)| *c == column) {
                slot.1 = value;
            }
        };

        match self {
            WebVulnDetails::Lfi {
                os,
                depth,
                filter_bypass,
            } => {
                set("lfi_os", opt_enum_text(os.as_ref()));
                set("lfi_depth", depth.map_or(Value::Null, |d| int(d)));
                set("lfi_filter_bypass", opt_enum_text(filter_bypass.as_ref()));
            }
            WebVulnDetails::Rfi {
                script_lang,
                filter_bypass,
            } => {
                set("rfi_script_lang", opt_enum_text(script_lang.as_ref()));
                set("rfi_filter_bypass", opt_enum_text(filter_bypass.as_ref()));
            }
            WebVulnDetails::Sqli {
                escape_quote,
                escape_parens,
                terminate,
            } => {
                set("sqli_escape_quote", (*escape_quote).into());
                set("sqli_escape_parens", (*escape_parens).into());
                set("sqli_terminate", (*terminate).into());
            }
            WebVulnDetails::Ssti { escape_type } => {
                set("ssti_escape_type", opt_enum_text(escape_type.as_ref()));
            }
            WebVulnDetails::CommandInjection {
                escape_operator,
                terminator,
            } => {
                set(
                    "command_injection_escape_operator",
                    opt_text(escape_operator.as_deref()),
                );
                set("command_injection_terminator", opt_text(terminator.as_deref()));
            }
            WebVulnDetails::OpenRedirect | WebVulnDetails::ReflectedXss => {}
        }
        values
    }

    fn from_row(kind: WebVulnType, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(match kind {
            WebVulnType::Lfi => WebVulnDetails::Lfi {
                os: get_opt_enum(row, "lfi_os", "LFI OS")?,
                depth: row.get("lfi_depth")?,
                filter_bypass: get_opt_enum(row, "lfi_filter_bypass", "LFI filter bypass")?,
            },
            WebVulnType::Rfi => WebVulnDetails::Rfi {
                script_lang: get_opt_enum(row, "rfi_script_lang", "RFI script language")?,
                filter_bypass: get_opt_enum(row, "rfi_filter_bypass", "RFI filter bypass")?,
            },
            WebVulnType::Sqli => WebVulnDetails::Sqli {
                escape_quote: row.get::<_, Option<bool>>("sqli_escape_quote")?.unwrap_or(false),
                escape_parens: row.get::<_, Option<bool>>("sqli_escape_parens")?.unwrap_or(false),
                terminate: row.get::<_, Option<bool>>("sqli_terminate")?.unwrap_or(false),
            },
            WebVulnType::Ssti => WebVulnDetails::Ssti {
                escape_type: get_opt_enum(row, "ssti_escape_type", "SSTI escape type")?,
            },
            WebVulnType::OpenRedirect => WebVulnDetails::OpenRedirect,
            WebVulnType::ReflectedXss => WebVulnDetails::ReflectedXss,
            WebVulnType::CommandInjection => WebVulnDetails::CommandInjection {
                escape_operator: row.get("command_injection_escape_operator")?,
                terminator: row.get("command_injection_terminator")?,
            },
        })
    }
}

const DETAIL_COLUMNS: &[&str] = &[
    "lfi_os",
    "lfi_depth",
    "lfi_filter_bypass",
    "rfi_script_lang",
    "rfi_filter_bypass",
    "ssti_escape_type",
    "sqli_escape_quote",
    "sqli_escape_parens",
    "sqli_terminate",
    "command_injection_escape_operator",
    "command_injection_terminator",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebVuln {
    pub id: i64,
    pub url_id: i64,
    pub request_method: HttpMethod,
    pub query_param: Option<String>,
    pub header_name: Option<String>,
    pub cookie_param: Option<String>,
    pub form_param: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub test_string: Option<String>,
    pub details: WebVulnDetails,
    pub created_at: DateTime<Utc>,
}

impl Record for WebVuln {
    const TABLE: &'static str = "dossier_web_vulns";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "type",
        "url_id",
        "request_method",
        "query_param",
        "header_name",
        "cookie_param",
        "form_param",
        "user_agent",
        "referer",
        "test_string",
        "lfi_os",
        "lfi_depth",
        "lfi_filter_bypass",
        "rfi_script_lang",
        "rfi_filter_bypass",
        "ssti_escape_type",
        "sqli_escape_quote",
        "sqli_escape_parens",
        "sqli_terminate",
        "command_injection_escape_operator",
        "command_injection_terminator",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: WebVulnType = get_enum(row, "type", "web vulnerability type")?;
        Ok(Self {
            id: row.get("id")?,
            url_id: row.get("url_id")?,
            request_method: get_enum(row, "request_method", "HTTP method")?,
            query_param: row.get("query_param")?,
            header_name: row.get("header_name")?,
            cookie_param: row.get("cookie_param")?,
            form_param: row.get("form_param")?,
            user_agent: row.get("user_agent")?,
            referer: row.get("referer")?,
            test_string: row.get("test_string")?,
            details: WebVulnDetails::from_row(kind, row)?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// A finding to record against a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWebVuln {
    pub details: WebVulnDetails,
    pub request_method: HttpMethod,
    pub query_param: Option<String>,
    pub header_name: Option<String>,
    pub cookie_param: Option<String>,
    pub form_param: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub test_string: Option<String>,
}

impl NewWebVuln {
    pub fn new(details: WebVulnDetails, request_method: HttpMethod) -> Self {
        Self {
            details,
            request_method,
            query_param: None,
            header_name: None,
            cookie_param: None,
            form_param: None,
            user_agent: None,
            referer: None,
            test_string: None,
        }
    }

    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = Some(name.into());
        self
    }

    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into());
        self
    }

    pub fn cookie_param(mut self, name: impl Into<String>) -> Self {
        self.cookie_param = Some(name.into());
        self
    }

    pub fn form_param(mut self, name: impl Into<String>) -> Self {
        self.form_param = Some(name.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn test_string(mut self, test_string: impl Into<String>) -> Self {
        self.test_string = Some(test_string.into());
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let mut errors = ValidationErrors::new();
        let params = [
            &self.query_param,
            &self.header_name,
            &self.cookie_param,
            &self.form_param,
        ];
        if params.iter().all(|p| p.is_none()) {
            errors.add(
                "query_param",
                "one of query_param, header_name, cookie_param, or form_param must be set",
            );
        }
        for (field, value) in [
            ("query_param", &self.query_param),
            ("header_name", &self.header_name),
            ("cookie_param", &self.cookie_param),
            ("form_param", &self.form_param),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.add(field, "must not be blank");
            }
        }
        validated(errors)
    }

    fn key(&self, url: &Url) -> Query<WebVuln> {
        WebVuln::query()
            .where_eq("type", enum_text(&self.details.kind()))
            .where_eq("url_id", url.id)
            .where_eq("request_method", enum_text(&self.request_method))
            .where_eq_nullable("query_param", opt_text(self.query_param.as_deref()))
            .where_eq_nullable("header_name", opt_text(self.header_name.as_deref()))
            .where_eq_nullable("cookie_param", opt_text(self.cookie_param.as_deref()))
            .where_eq_nullable("form_param", opt_text(self.form_param.as_deref()))
    }
}

impl WebVuln {
    /// Find or create the finding. A finding already recorded for the same
    /// URL, method, and parameter keeps its original details.
    pub fn import(db: &Database, url: &Url, new: &NewWebVuln) -> Result<Self, DbError> {
        new.validate()?;
        let mut values = vec![
            ("type", enum_text(&new.details.kind())),
            ("url_id", int(url.id)),
            ("request_method", enum_text(&new.request_method)),
            ("query_param", opt_text(new.query_param.as_deref())),
            ("header_name", opt_text(new.header_name.as_deref())),
            ("cookie_param", opt_text(new.cookie_param.as_deref())),
            ("form_param", opt_text(new.form_param.as_deref())),
            ("user_agent", opt_text(new.user_agent.as_deref())),
            ("referer", opt_text(new.referer.as_deref())),
            ("test_string", opt_text(new.test_string.as_deref())),
        ];
        values.extend(new.details.values());
        find_or_create(db, Self::TABLE, &values, new.key(url))
    }

    pub fn lookup(db: &Database, url: &Url, new: &NewWebVuln) -> Result<Option<Self>, DbError> {
        new.key(url).first(db)
    }

    pub fn kind(&self) -> WebVulnType {
        self.details.kind()
    }

    pub fn url(&self, db: &Database) -> Result<Url, DbError> {
        Url::get(db, self.url_id)
    }
}

impl Url {
    pub fn web_vulns(&self, db: &Database) -> Result<Vec<WebVuln>, DbError> {
        WebVuln::query().where_eq("url_id", self.id).all(db)
    }
}

impl Query<WebVuln> {
    pub fn of_type(self, kind: WebVulnType) -> Self {
        self.where_eq("type", enum_text(&kind))
    }

    pub fn lfi(self) -> Self {
        self.of_type(WebVulnType::Lfi)
    }

    pub fn rfi(self) -> Self {
        self.of_type(WebVulnType::Rfi)
    }

    pub fn sqli(self) -> Self {
        self.of_type(WebVulnType::Sqli)
    }

    pub fn ssti(self) -> Self {
        self.of_type(WebVulnType::Ssti)
    }

    pub fn open_redirect(self) -> Self {
        self.of_type(WebVulnType::OpenRedirect)
    }

    pub fn reflected_xss(self) -> Self {
        self.of_type(WebVulnType::ReflectedXss)
    }

    pub fn command_injection(self) -> Self {
        self.of_type(WebVulnType::CommandInjection)
    }

    /// Findings on URLs served by the host `name`.
    pub fn for_host(self, name: &str) -> Self {
        self.filter(
            "dossier_web_vulns.url_id IN (
                SELECT u.id FROM dossier_urls u
                JOIN dossier_host_names h ON h.id = u.host_name_id
                WHERE h.name = ?)",
            [text(HostName::canonicalize(name))],
        )
    }

    pub fn for_url(self, url: &Url) -> Self {
        self.where_eq("url_id", url.id)
    }

    pub fn with_query_param(self, name: &str) -> Self {
        self.where_eq("query_param", text(name))
    }

    pub fn with_header_name(self, name: &str) -> Self {
        self.where_eq("header_name", text(name))
    }

    pub fn with_cookie_param(self, name: &str) -> Self {
        self.where_eq("cookie_param", text(name))
    }

    pub fn with_form_param(self, name: &str) -> Self {
        self.where_eq("form_param", text(name))
    }

    pub fn with_request_method(self, method: HttpMethod) -> Self {
        self.where_eq("request_method", enum_text(&method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Importable;

    fn lfi() -> WebVulnDetails {
        WebVulnDetails::Lfi {
            os: Some(LfiOs::Unix),
            depth: Some(6),
            filter_bypass: Some(LfiFilterBypass::NullByte),
        }
    }

    #[test]
    fn test_details_round_trip_through_columns() {
        let db = Database::open_in_memory().unwrap();
        let url = Url::import(&db, "http://example.com/index.php?page=home").unwrap();
        let new = NewWebVuln::new(lfi(), HttpMethod::Get)
            .query_param("page")
            .test_string("../../../../../../etc/passwd%00");
        let vuln = WebVuln::import(&db, &url, &new).unwrap();
        assert_eq!(vuln.kind(), WebVulnType::Lfi);
        assert_eq!(vuln.details, lfi());
        assert_eq!(vuln.url(&db).unwrap(), url);
        assert_eq!(WebVuln::import(&db, &url, &new).unwrap(), vuln);
        assert_eq!(WebVuln::lookup(&db, &url, &new).unwrap(), Some(vuln.clone()));

        let sqli = NewWebVuln::new(
            WebVulnDetails::Sqli {
                escape_quote: true,
                escape_parens: false,
                terminate: true,
            },
            HttpMethod::Post,
        )
        .form_param("user");
        let sqli = WebVuln::import(&db, &url, &sqli).unwrap();
        assert_eq!(
            sqli.details,
            WebVulnDetails::Sqli {
                escape_quote: true,
                escape_parens: false,
                terminate: true
            }
        );

        let injection = WebVuln::import(
            &db,
            &url,
            &NewWebVuln::new(
                WebVulnDetails::CommandInjection {
                    escape_operator: Some(";".to_string()),
                    terminator: Some("#".to_string()),
                },
                HttpMethod::Get,
            )
            .header_name("X-Forwarded-For"),
        )
        .unwrap();
        assert_eq!(injection.kind(), WebVulnType::CommandInjection);
        assert_eq!(url.web_vulns(&db).unwrap().len(), 3);
    }

    #[test]
    fn test_requires_a_parameter() {
        let db = Database::open_in_memory().unwrap();
        let url = Url::import(&db, "http://example.com/").unwrap();
        let err = WebVuln::import(
            &db,
            &url,
            &NewWebVuln::new(WebVulnDetails::ReflectedXss, HttpMethod::Get),
        )
        .unwrap_err();
        assert!(err.validation_errors().unwrap().has("query_param"));

        let err = WebVuln::import(
            &db,
            &url,
            &NewWebVuln::new(WebVulnDetails::ReflectedXss, HttpMethod::Get).cookie_param(" "),
        )
        .unwrap_err();
        assert!(err.validation_errors().unwrap().has("cookie_param"));
        assert_eq!(WebVuln::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        let a = Url::import(&db, "http://a.example.com/search").unwrap();
        let b = Url::import(&db, "https://b.example.com/login").unwrap();

        WebVuln::import(
            &db,
            &a,
            &NewWebVuln::new(WebVulnDetails::ReflectedXss, HttpMethod::Get).query_param("q"),
        )
        .unwrap();
        WebVuln::import(
            &db,
            &a,
            &NewWebVuln::new(WebVulnDetails::OpenRedirect, HttpMethod::Get).query_param("next"),
        )
        .unwrap();
        WebVuln::import(
            &db,
            &b,
            &NewWebVuln::new(
                WebVulnDetails::Ssti {
                    escape_type: Some(SstiEscapeType::DoubleCurlyBraces),
                },
                HttpMethod::Post,
            )
            .form_param("name"),
        )
        .unwrap();
        WebVuln::import(
            &db,
            &b,
            &NewWebVuln::new(
                WebVulnDetails::Rfi {
                    script_lang: Some(RfiScriptLang::Php),
                    filter_bypass: None,
                },
                HttpMethod::Get,
            )
            .cookie_param("theme"),
        )
        .unwrap();

        let all = WebVuln::query();
        assert_eq!(all.clone().reflected_xss().count(&db).unwrap(), 1);
        assert_eq!(all.clone().open_redirect().count(&db).unwrap(), 1);
        assert_eq!(all.clone().ssti().count(&db).unwrap(), 1);
        assert_eq!(all.clone().rfi().count(&db).unwrap(), 1);
        assert_eq!(all.clone().lfi().count(&db).unwrap(), 0);
        assert_eq!(all.clone().sqli().count(&db).unwrap(), 0);
        assert_eq!(all.clone().command_injection().count(&db).unwrap(), 0);
        assert_eq!(all.clone().for_host("A.example.com").count(&db).unwrap(), 2);
        assert_eq!(all.clone().for_url(&b).count(&db).unwrap(), 2);
        assert_eq!(all.clone().with_query_param("next").count(&db).unwrap(), 1);
        assert_eq!(all.clone().with_form_param("name").count(&db).unwrap(), 1);
        assert_eq!(all.clone().with_cookie_param("theme").count(&db).unwrap(), 1);
        assert_eq!(all.clone().with_header_name("Referer").count(&db).unwrap(), 0);
        assert_eq!(
            all.with_request_method(HttpMethod::Post).count(&db).unwrap(),
            1
        );

        a.destroy(&db).unwrap();
        assert_eq!(WebVuln::count(&db).unwrap(), 2);
    }
}
