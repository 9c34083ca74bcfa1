//! Security advisory identifiers (`CVE-2021-1234`, `MS08-067`, `GHSA-…`).

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ValidationErrors};

/// Earliest advisory year considered plausible (exclusive).
pub const MIN_ADVISORY_YEAR: i32 = 1990;

/// `PREFIX-YYYY-ID`
static DATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[A-Z]+)-(?P<year>\d{4})-(?P<identifier>[A-Za-z0-9]+(?:[-.][A-Za-z0-9]+)*)$")
        .expect("dated advisory pattern")
});

/// `MSYY-NNN`
static MICROSOFT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>MS)(?P<year>\d{2})-(?P<identifier>\d{3,})$")
        .expect("microsoft bulletin pattern")
});

/// `PREFIX-rest`
static GENERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[A-Z]+)-(?P<identifier>[A-Za-z0-9]+(?:[-.:][A-Za-z0-9]+)*)$")
        .expect("generic advisory pattern")
});

/// The components of an advisory identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryId {
    pub id: String,
    pub prefix: String,
    pub year: Option<i32>,
    pub identifier: String,
}

impl AdvisoryId {
    /// Parse an advisory identifier. The three grammars are tried in order
    /// and the first match wins.
    pub fn parse(id: &str) -> Result<Self, ParseError> {
        let id = id.trim();

        if let Some(caps) = DATED_RE.captures(id) {
            return Ok(Self {
                id: id.to_string(),
                prefix: caps["prefix"].to_string(),
                year: caps["year"].parse().ok(),
                identifier: caps["identifier"].to_string(),
            });
        }

        if let Some(caps) = MICROSOFT_RE.captures(id) {
            let yy: i32 = caps["year"]
                .parse()
                .map_err(|_| ParseError::InvalidAdvisoryId(id.to_string()))?;
            return Ok(Self {
                id: id.to_string(),
                prefix: caps["prefix"].to_string(),
                year: Some(2000 + yy),
                identifier: caps["identifier"].to_string(),
            });
        }

        if let Some(caps) = GENERIC_RE.captures(id) {
            return Ok(Self {
                id: id.to_string(),
                prefix: caps["prefix"].to_string(),
                year: None,
                identifier: caps["identifier"].to_string(),
            });
        }

        Err(ParseError::InvalidAdvisoryId(id.to_string()))
    }

    /// Check the year bound: after 1990 and not in the future.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(year) = self.year {
            let current = Utc::now().year();
            if year <= MIN_ADVISORY_YEAR || year > current {
                errors.add(
                    "year",
                    format!("must be greater than {MIN_ADVISORY_YEAR} and at most {current}"),
                );
            }
        }
        if self.prefix.is_empty() {
            errors.add("prefix", "must be present");
        }
        if self.identifier.is_empty() {
            errors.add("identifier", "must be present");
        }
        errors.into_result()
    }

    /// Reference URL for publishers with a stable advisory page.
    pub fn url(&self) -> Option<String> {
        match self.prefix.as_str() {
            "CVE" => Some(format!("https://nvd.nist.gov/vuln/detail/{}", self.id)),
            "GHSA" => Some(format!("https://github.com/advisories/{}", self.id)),
            "RUSTSEC" => Some(format!("https://rustsec.org/advisories/{}.html", self.id)),
            "EDB" => Some(format!(
                "https://www.exploit-db.com/exploits/{}",
                self.identifier
            )),
            "MS" => self.year.map(|year| {
                format!(
                    "https://learn.microsoft.com/en-us/security-updates/securitybulletins/{year}/{}",
                    self.id.to_lowercase()
                )
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cve() {
        let id = AdvisoryId::parse("CVE-2021-1234").unwrap();
        assert_eq!(id.prefix, "CVE");
        assert_eq!(id.year, Some(2021));
        assert_eq!(id.identifier, "1234");
        assert!(id.validate().is_ok());
        assert_eq!(
            id.url().as_deref(),
            Some("https://nvd.nist.gov/vuln/detail/CVE-2021-1234")
        );
    }

    #[test]
    fn parses_microsoft_bulletin() {
        let id = AdvisoryId::parse("MS08-067").unwrap();
        assert_eq!(id.prefix, "MS");
        assert_eq!(id.year, Some(2008));
        assert_eq!(id.identifier, "067");
        assert!(id.url().unwrap().ends_with("/2008/ms08-067"));
    }

    #[test]
    fn parses_generic_prefix() {
        let id = AdvisoryId::parse("GHSA-jfh8-c2jp-5v3q").unwrap();
        assert_eq!(id.prefix, "GHSA");
        assert_eq!(id.year, None);
        assert_eq!(id.identifier, "jfh8-c2jp-5v3q");

        let id = AdvisoryId::parse("RHSA-2021:1234").unwrap();
        assert_eq!(id.prefix, "RHSA");
        assert_eq!(id.year, None);
        assert_eq!(id.identifier, "2021:1234");
    }

    #[test]
    fn dated_grammar_wins_over_generic() {
        let id = AdvisoryId::parse("RUSTSEC-2021-0001").unwrap();
        assert_eq!(id.year, Some(2021));
        assert_eq!(id.identifier, "0001");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["not-a-valid-id!!", "", "CVE", "cve-2021-1234", "CVE-2021-"] {
            assert_eq!(
                AdvisoryId::parse(bad),
                Err(ParseError::InvalidAdvisoryId(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn year_bounds() {
        let early = AdvisoryId::parse("CVE-1990-0001").unwrap();
        assert!(early.validate().unwrap_err().has("year"));

        let future = AdvisoryId::parse("CVE-9999-0001").unwrap();
        assert!(future.validate().unwrap_err().has("year"));

        let ok = AdvisoryId::parse("CVE-1999-0001").unwrap();
        assert!(ok.validate().is_ok());
    }
}
