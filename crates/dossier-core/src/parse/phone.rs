//! Phone numbers in common North American punctuation variants.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// The country-code group is lazy so a bare ten-digit number reads as
// area + prefix + line rather than country + seven digits.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\+(?P<cc>\d{1,3})[\s.-]?|(?P<cc2>\d{1,3})[\s.-])??(?:\((?P<area_paren>\d{3})\)|(?P<area>\d{3}))?[\s.-]?(?P<prefix>\d{3})[\s.-]?(?P<line>\d{4})$",
    )
    .expect("phone number pattern")
});

/// Components of a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneParts {
    pub number: String,
    pub country_code: Option<String>,
    pub area_code: Option<String>,
    pub prefix: String,
    pub line_number: String,
}

impl PhoneParts {
    /// Parse `+1 (555) 123-4567`, `555.123.4567`, `1-555-123-4567`,
    /// `5551234567`, `123-4567` and similar.
    pub fn parse(number: &str) -> Result<Self, ParseError> {
        let number = number.trim();
        let caps = PHONE_RE
            .captures(number)
            .ok_or_else(|| ParseError::InvalidPhoneNumber(number.to_string()))?;

        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        Ok(Self {
            number: number.to_string(),
            country_code: text("cc").or_else(|| text("cc2")),
            area_code: text("area_paren").or_else(|| text("area")),
            prefix: text("prefix").unwrap_or_default(),
            line_number: text("line").unwrap_or_default(),
        })
    }

    /// Digits only, with a leading `+` when a country code is present.
    pub fn digits(&self) -> String {
        let mut out = String::new();
        if let Some(cc) = &self.country_code {
            out.push('+');
            out.push_str(cc);
        }
        if let Some(area) = &self.area_code {
            out.push_str(area);
        }
        out.push_str(&self.prefix);
        out.push_str(&self.line_number);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(number: &str) -> (Option<String>, Option<String>, String, String) {
        let p = PhoneParts::parse(number).unwrap();
        (p.country_code, p.area_code, p.prefix, p.line_number)
    }

    #[test]
    fn international_with_parenthesized_area() {
        assert_eq!(
            parts("+1 (555) 123-4567"),
            (Some("1".into()), Some("555".into()), "123".into(), "4567".into())
        );
    }

    #[test]
    fn dotted_and_bare() {
        assert_eq!(
            parts("555.123.4567"),
            (None, Some("555".into()), "123".into(), "4567".into())
        );
        assert_eq!(
            parts("5551234567"),
            (None, Some("555".into()), "123".into(), "4567".into())
        );
    }

    #[test]
    fn country_code_without_plus_needs_separator() {
        assert_eq!(
            parts("1-555-123-4567"),
            (Some("1".into()), Some("555".into()), "123".into(), "4567".into())
        );
    }

    #[test]
    fn seven_digit_local_number() {
        assert_eq!(parts("123-4567"), (None, None, "123".into(), "4567".into()));
    }

    #[test]
    fn digits_form() {
        let p = PhoneParts::parse("+1 (555) 123-4567").unwrap();
        assert_eq!(p.digits(), "+15551234567");
        assert_eq!(p.number, "+1 (555) 123-4567");
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "call me", "12-34", "555-1234-567", "(555 123-4567"] {
            assert!(
                matches!(PhoneParts::parse(bad), Err(ParseError::InvalidPhoneNumber(_))),
                "{bad}"
            );
        }
    }
}
