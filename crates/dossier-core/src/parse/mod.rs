//! Parsers that turn free-text natural keys into structured attributes.
//!
//! Every parser either yields a complete value or a [`ParseError`]; none of
//! them return partial results.
//!
//! [`ParseError`]: crate::error::ParseError

pub mod advisory;
pub mod cert;
pub mod email;
pub mod person_name;
pub mod phone;
pub mod san;
pub mod url;
pub mod x509_name;

pub use self::advisory::AdvisoryId;
pub use self::cert::CertInfo;
pub use self::email::EmailParts;
pub use self::person_name::PersonName;
pub use self::phone::PhoneParts;
pub use self::san::parse_subject_alt_names;
pub use self::url::{default_port, parse_query_string, UrlParts};
pub use self::x509_name::DnAttributes;
