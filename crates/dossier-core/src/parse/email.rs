use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<user>[A-Za-z0-9._%+-]+)@(?P<host>[A-Za-z0-9.-]+\.[A-Za-z]{2,})$")
        .expect("email pattern")
});

/// `user@host` split into its halves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailParts {
    pub address: String,
    pub user: String,
    pub host: String,
}

impl EmailParts {
    pub fn parse(address: &str) -> Result<Self, ParseError> {
        let address = address.trim();
        let caps = EMAIL_RE
            .captures(address)
            .ok_or_else(|| ParseError::InvalidEmailAddress(address.to_string()))?;

        let user = caps["user"].to_string();
        let host = caps["host"].to_lowercase();
        Ok(Self {
            address: format!("{user}@{host}"),
            user,
            host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_user_and_host() {
        let email = EmailParts::parse("john.smith+recon@Example.COM").unwrap();
        assert_eq!(email.user, "john.smith+recon");
        assert_eq!(email.host, "example.com");
        assert_eq!(email.address, "john.smith+recon@example.com");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "no-at-sign", "@example.com", "user@", "user@localhost", "a b@example.com"] {
            assert!(
                matches!(EmailParts::parse(bad), Err(ParseError::InvalidEmailAddress(_))),
                "{bad}"
            );
        }
    }
}
