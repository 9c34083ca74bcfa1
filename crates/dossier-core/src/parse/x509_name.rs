//! Distinguished-name attributes, from a parsed `X509Name` or its string form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use x509_parser::x509::X509Name;

use crate::error::ParseError;

pub const OID_COMMON_NAME: &str = "2.5.4.3";
pub const OID_EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";
pub const OID_ORGANIZATION: &str = "2.5.4.10";
pub const OID_ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
pub const OID_LOCALITY: &str = "2.5.4.7";
pub const OID_STATE: &str = "2.5.4.8";
pub const OID_COUNTRY: &str = "2.5.4.6";

/// The flat attribute map kept for certificate subjects and issuers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnAttributes {
    pub common_name: Option<String>,
    pub email_address: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Copy)]
enum Attr {
    CommonName,
    EmailAddress,
    Organization,
    OrganizationalUnit,
    Locality,
    State,
    Country,
}

impl Attr {
    fn from_oid(oid: &str) -> Option<Self> {
        Some(match oid {
            OID_COMMON_NAME => Attr::CommonName,
            OID_EMAIL_ADDRESS => Attr::EmailAddress,
            OID_ORGANIZATION => Attr::Organization,
            OID_ORGANIZATIONAL_UNIT => Attr::OrganizationalUnit,
            OID_LOCALITY => Attr::Locality,
            OID_STATE => Attr::State,
            OID_COUNTRY => Attr::Country,
            _ => return None,
        })
    }

    fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "CN" => Attr::CommonName,
            "emailAddress" | "EMAILADDRESS" | "E" => Attr::EmailAddress,
            "O" => Attr::Organization,
            "OU" => Attr::OrganizationalUnit,
            "L" => Attr::Locality,
            "ST" => Attr::State,
            "C" => Attr::Country,
            _ => return None,
        })
    }
}

impl DnAttributes {
    /// Collect the known attributes of a parsed name. Unknown OIDs are
    /// dropped; when an attribute repeats, the first value is kept.
    pub fn from_x509_name(name: &X509Name<'_>) -> Result<Self, ParseError> {
        let mut attrs = Self::default();
        for atv in name.iter_attributes() {
            let Some(attr) = Attr::from_oid(&atv.attr_type().to_id_string()) else {
                continue;
            };
            let value = atv
                .as_str()
                .map_err(|e| ParseError::InvalidX509Name(format!("{}: {e}", atv.attr_type())))?;
            attrs.set(attr, value);
        }
        Ok(attrs)
    }

    fn set(&mut self, attr: Attr, value: &str) {
        let slot = match attr {
            Attr::CommonName => &mut self.common_name,
            Attr::EmailAddress => &mut self.email_address,
            Attr::Organization => &mut self.organization,
            Attr::OrganizationalUnit => &mut self.organizational_unit,
            Attr::Locality => &mut self.locality,
            Attr::State => &mut self.state,
            Attr::Country => &mut self.country,
        };
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FromStr for DnAttributes {
    type Err = ParseError;

    /// Accepts `CN=a, O=b` and the slash form `/CN=a/O=b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let components: Vec<&str> = match s.strip_prefix('/') {
            Some(rest) => rest.split('/').collect(),
            None => s.split(',').collect(),
        };

        let mut attrs = Self::default();
        for component in components {
            let component = component.trim();
            if component.is_empty() {
                continue;
            }
            let (key, value) = component
                .split_once('=')
                .ok_or_else(|| ParseError::InvalidX509Name(component.to_string()))?;
            if let Some(attr) = Attr::from_key(key.trim()) {
                attrs.set(attr, value);
            }
        }
        Ok(attrs)
    }
}

impl fmt::Display for DnAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = [
            ("C", &self.country),
            ("ST", &self.state),
            ("L", &self.locality),
            ("O", &self.organization),
            ("OU", &self.organizational_unit),
            ("CN", &self.common_name),
            ("emailAddress", &self.email_address),
        ];
        let mut first = true;
        for (key, value) in pairs {
            if let Some(value) = value {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
                first = false;
            }
        }
        Ok(())
    }
}
