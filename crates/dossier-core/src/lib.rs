//! dossier-core: Shared validation rules, parsers, configuration, and error
//! handling for the Dossier reconnaissance data model.
//!
//! This crate holds everything the store needs that does not touch the
//! database:
//! - Error kinds (validation failures vs. malformed input)
//! - Configuration management
//! - Write-time format rules (host names, MAC addresses, place names)
//! - Natural-key parsers (advisory IDs, personal names, phone numbers,
//!   email addresses, X.509 names, URLs, certificates)
//! - Network-byte-order encodings and password digests

pub mod config;
pub mod digest;
pub mod error;
pub mod net;
pub mod parse;
pub mod types;
pub mod validate;

pub use config::{DatabaseConfig, DossierConfig};
pub use digest::DigestAlgorithm;
pub use error::{ConfigError, FieldError, ParseError, ValidationErrors};
