use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single violated rule on a record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Every rule a candidate record violated. A record carrying validation
/// errors is never written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single-field failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Merge another set of errors, prefixing their fields.
    pub fn merge(&mut self, prefix: &str, other: ValidationErrors) {
        for err in other.errors {
            self.errors.push(FieldError {
                field: format!("{prefix}.{}", err.field),
                message: err.message,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether any error was recorded against `field`.
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Turn the accumulated errors into a `Result`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Input a parser could not interpret at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid advisory ID: {0:?}")]
    InvalidAdvisoryId(String),

    #[error("Invalid personal name: {0:?}")]
    InvalidPersonName(String),

    #[error("Invalid phone number: {0:?}")]
    InvalidPhoneNumber(String),

    #[error("Invalid email address: {0:?}")]
    InvalidEmailAddress(String),

    #[error("Invalid X.509 name component: {0:?}")]
    InvalidX509Name(String),

    #[error("Invalid URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Unsupported public key type: {0}")]
    UnsupportedPublicKey(String),

    #[error("Invalid credential string: {0:?}")]
    InvalidCredential(String),

    #[error("Unknown {kind} value: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Unknown builtin architecture: {0:?}")]
    UnknownArch(String),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("number", "must be between 1 and 65535");
        errors.add("protocol", "must be present");

        assert!(errors.has("number"));
        assert!(!errors.has("name"));
        assert_eq!(
            errors.to_string(),
            "Validation failed: number must be between 1 and 65535, protocol must be present"
        );
    }

    #[test]
    fn merge_prefixes_nested_fields() {
        let mut outer = ValidationErrors::new();
        outer.merge("host_name", ValidationErrors::single("name", "is invalid"));
        assert!(outer.has("host_name.name"));
        assert!(outer.into_result().is_err());
    }
}
