//! URL decomposition for the normalized URL model.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ParseError;

/// A URL split into the columns the store keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    /// Explicit port, or the scheme's default when none was given.
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    /// Decoded `name=value` pairs of the query string, in order.
    pub query_params: Vec<(String, String)>,
}

/// Well-known port for a scheme.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

/// Decoded `name=value` pairs of a query string, in order.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

impl UrlParts {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        let invalid = |reason: String| ParseError::InvalidUrl {
            input: input.to_string(),
            reason,
        };

        let url = Url::parse(input).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();

        let scheme = url.scheme().to_string();
        let mut path = url.path().to_string();
        if path.is_empty() && matches!(scheme.as_str(), "http" | "https") {
            path.push('/');
        }

        let query_params = url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        Ok(Self {
            port: url.port_or_known_default(),
            query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
            fragment: url.fragment().filter(|f| !f.is_empty()).map(str::to_string),
            scheme,
            host,
            path,
            query_params,
        })
    }

    /// Rebuild the URL text, omitting the port when it is the scheme default.
    pub fn to_uri(&self) -> String {
        let mut uri = format!("{}://", self.scheme);
        if self.host.contains(':') {
            uri.push_str(&format!("[{}]", self.host));
        } else {
            uri.push_str(&self.host);
        }
        if let Some(port) = self.port {
            if default_port(&self.scheme) != Some(port) {
                uri.push_str(&format!(":{port}"));
            }
        }
        uri.push_str(&self.path);
        if let Some(query) = &self.query {
            uri.push('?');
            uri.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            uri.push('#');
            uri.push_str(fragment);
        }
        uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_pairs() {
        assert_eq!(
            parse_query_string("?a=1&b=two%20words&flag"),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
        assert!(parse_query_string("").is_empty());
    }

    #[test]
    fn empty_path_becomes_slash() {
        let bare = UrlParts::parse("http://example.com").unwrap();
        let slash = UrlParts::parse("http://example.com/").unwrap();
        assert_eq!(bare.path, "/");
        assert_eq!(bare, slash);
    }

    #[test]
    fn default_port_is_filled_in() {
        assert_eq!(UrlParts::parse("https://example.com/").unwrap().port, Some(443));
        assert_eq!(
            UrlParts::parse("http://example.com:8080/").unwrap().port,
            Some(8080)
        );
    }

    #[test]
    fn decomposes_query_and_fragment() {
        let parts =
            UrlParts::parse("https://Example.com/search/index.php?q=rust+lang&page=2#results")
                .unwrap();
        assert_eq!(parts.host, "example.com");
        assert_eq!(parts.path, "/search/index.php");
        assert_eq!(parts.query.as_deref(), Some("q=rust+lang&page=2"));
        assert_eq!(parts.fragment.as_deref(), Some("results"));
        assert_eq!(
            parts.query_params,
            vec![
                ("q".to_string(), "rust lang".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn rebuilds_uri() {
        let parts = UrlParts::parse("http://example.com:80/a?b=c#d").unwrap();
        assert_eq!(parts.to_uri(), "http://example.com/a?b=c#d");

        let parts = UrlParts::parse("http://[::1]:8080/").unwrap();
        assert_eq!(parts.host, "::1");
        assert_eq!(parts.to_uri(), "http://[::1]:8080/");
    }

    #[test]
    fn rejects_unparseable_or_hostless() {
        assert!(matches!(
            UrlParts::parse("not a url"),
            Err(ParseError::InvalidUrl { .. })
        ));
        assert!(matches!(
            UrlParts::parse("mailto:someone@example.com"),
            Err(ParseError::InvalidUrl { .. })
        ));
    }
}
