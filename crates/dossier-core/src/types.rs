//! Enumerated column values shared across the Dossier schema.
//!
//! Each enum is stored as its string form (`as_ref()`) and parsed back with
//! `FromStr`; unknown strings surface as [`ParseError::UnknownVariant`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::ParseError;

/// Parse a stored or user-supplied enum value, naming the enum on failure.
pub fn parse_variant<E: FromStr>(kind: &'static str, value: &str) -> Result<E, ParseError> {
    value.parse::<E>().map_err(|_| ParseError::UnknownVariant {
        kind,
        value: value.to_string(),
    })
}

// ── Network ───────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Endian {
    Little,
    Big,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OsFlavor {
    Linux,
    Bsd,
}

// ── Certificates ──────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PublicKeyAlgorithm {
    Rsa,
    Dsa,
    Dh,
    Ec,
}

// ── HTTP ──────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
pub enum HttpVersion {
    #[serde(rename = "1.0")]
    #[strum(serialize = "1.0")]
    Http10,
    #[serde(rename = "1.1")]
    #[strum(serialize = "1.1")]
    Http11,
    #[serde(rename = "2.0")]
    #[strum(serialize = "2.0")]
    Http20,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HttpMethod {
    Copy,
    Delete,
    Get,
    Head,
    Lock,
    Mkcol,
    Move,
    Options,
    Patch,
    Post,
    Propfind,
    Proppatch,
    Put,
    Trace,
    Unlock,
}

// ── Organizations & people ────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrganizationType {
    Company,
    Government,
    Military,
    NonProfit,
    Education,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionType {
    Friend,
    Acquaintance,
    Coworker,
    Parent,
    Child,
    Sibling,
    Spouse,
    Partner,
    Relative,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersonalPhoneType {
    Home,
    Cell,
    Work,
    Fax,
    Voip,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersonalAddressType {
    Home,
    Work,
    Mailing,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrganizationPhoneType {
    Main,
    Fax,
    Support,
    Sales,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrganizationAddressType {
    Headquarters,
    Office,
    Mailing,
}

// ── Web vulnerabilities ───────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WebVulnType {
    Lfi,
    Rfi,
    Sqli,
    Ssti,
    OpenRedirect,
    ReflectedXss,
    CommandInjection,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LfiOs {
    Unix,
    Windows,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
pub enum LfiFilterBypass {
    #[serde(rename = "null_byte")]
    #[strum(serialize = "null_byte")]
    NullByte,
    #[serde(rename = "double_escape")]
    #[strum(serialize = "double_escape")]
    DoubleEscape,
    #[serde(rename = "base64")]
    #[strum(serialize = "base64")]
    Base64,
    #[serde(rename = "rot13")]
    #[strum(serialize = "rot13")]
    Rot13,
    #[serde(rename = "zlib")]
    #[strum(serialize = "zlib")]
    Zlib,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RfiScriptLang {
    Asp,
    AspNet,
    ColdFusion,
    Jsp,
    Php,
    Perl,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RfiFilterBypass {
    DoubleEncode,
    SuffixEscape,
    NullByte,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SstiEscapeType {
    DoubleCurlyBraces,
    DollarCurlyBraces,
    DollarDoubleCurlyBraces,
    PoundCurlyBraces,
    AngleBracketsPercent,
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_round_trips_through_column_form() {
        assert_eq!(Protocol::Tcp.as_ref(), "tcp");
        assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
    }

    #[test]
    fn http_version_uses_dotted_form() {
        assert_eq!(HttpVersion::Http11.to_string(), "1.1");
        assert_eq!(
            parse_variant::<HttpVersion>("http version", "2.0").unwrap(),
            HttpVersion::Http20
        );
    }

    #[test]
    fn http_method_parses_any_case() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::Propfind.as_ref(), "propfind");
    }

    #[test]
    fn multiword_variants_are_snake_case() {
        assert_eq!(OrganizationType::NonProfit.as_ref(), "non_profit");
        assert_eq!(RfiScriptLang::ColdFusion.as_ref(), "cold_fusion");
        assert_eq!(LfiFilterBypass::Base64.as_ref(), "base64");
        assert_eq!(
            serde_json::to_string(&SstiEscapeType::DollarDoubleCurlyBraces).unwrap(),
            "\"dollar_double_curly_braces\""
        );
    }

    #[test]
    fn unknown_variant_names_the_kind() {
        let err = parse_variant::<Protocol>("protocol", "sctp").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownVariant {
                kind: "protocol",
                value: "sctp".to_string()
            }
        );
    }
}
