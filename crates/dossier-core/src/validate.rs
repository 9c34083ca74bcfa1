//! Write-time format rules shared by the record types.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationErrors;

/// Longest legal host name.
pub const MAX_HOST_NAME_LEN: usize = 253;

pub const MIN_PORT: u32 = 1;
pub const MAX_PORT: u32 = 65_535;

static HOST_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?\.)*[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?\.?$",
    )
    .expect("host name pattern")
});

static MAC_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5}$").expect("mac pattern"));

static CAPITALIZED_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Za-z'.-]*(?: [A-Za-z][A-Za-z'.-]*)*$").expect("capitalized pattern")
});

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("country code pattern"));

static ZIPCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 -]{1,9}$").expect("zipcode pattern"));

/// A single capitalized name part: `Jane`, `McDonald`, `O'Brien`, `Smith-Jones`.
pub const NAME_PART: &str = r"[A-Z](?:'[A-Z])?[A-Za-z]+(?:-[A-Za-z]+)*";

static NAME_PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{NAME_PART}$")).expect("name part pattern"));

static INITIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]$").expect("initial pattern"));

pub fn is_host_name(name: &str) -> bool {
    name.len() <= MAX_HOST_NAME_LEN && HOST_NAME_RE.is_match(name)
}

pub fn is_mac_address(address: &str) -> bool {
    MAC_ADDRESS_RE.is_match(address)
}

/// City, state, and country names.
pub fn is_capitalized_name(value: &str) -> bool {
    CAPITALIZED_NAME_RE.is_match(value)
}

/// ISO 3166 alpha-2 style code: exactly two uppercase letters.
pub fn is_country_code(value: &str) -> bool {
    COUNTRY_CODE_RE.is_match(value)
}

pub fn is_zipcode(value: &str) -> bool {
    ZIPCODE_RE.is_match(value)
}

pub fn is_port_number(number: u32) -> bool {
    (MIN_PORT..=MAX_PORT).contains(&number)
}

pub fn is_name_part(value: &str) -> bool {
    NAME_PART_RE.is_match(value)
}

pub fn is_initial(value: &str) -> bool {
    INITIAL_RE.is_match(value)
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ── Accumulating helpers ──────────────────────────────────────────

/// Record `field must be present` when `value` is blank.
pub fn require_present(errors: &mut ValidationErrors, field: &str, value: &str) {
    if is_blank(value) {
        errors.add(field, "must be present");
    }
}

/// Record `message` against `field` when `value` is set and fails `rule`.
pub fn check_optional(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    rule: fn(&str) -> bool,
    message: &str,
) {
    if let Some(v) = value {
        if !rule(v) {
            errors.add(field, message);
        }
    }
}

/// Record `message` against `field` when `value` fails `rule`.
pub fn check(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    rule: fn(&str) -> bool,
    message: &str,
) {
    if !rule(value) {
        errors.add(field, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_names() {
        assert!(is_host_name("example.com"));
        assert!(is_host_name("www.example.com."));
        assert!(is_host_name("_dmarc.example.com"));
        assert!(is_host_name("localhost"));
        assert!(is_host_name("10.0.0.1"));
        assert!(!is_host_name("-bad.example.com"));
        assert!(!is_host_name("bad-.example.com"));
        assert!(!is_host_name("exa mple.com"));
        assert!(!is_host_name("example..com"));
        assert!(!is_host_name(""));
        assert!(!is_host_name(&format!("{}.com", "a".repeat(64))));
        let long = vec!["a".repeat(60); 5].join(".");
        assert!(!is_host_name(&long));
    }

    #[test]
    fn mac_addresses() {
        assert!(is_mac_address("00:11:22:aa:BB:cc"));
        assert!(!is_mac_address("00-11-22-aa-bb-cc"));
        assert!(!is_mac_address("00:11:22:aa:bb"));
        assert!(!is_mac_address("00:11:22:aa:bb:cc:dd"));
        assert!(!is_mac_address("0:11:22:aa:bb:cc"));
    }

    #[test]
    fn capitalized_names() {
        assert!(is_capitalized_name("San Francisco"));
        assert!(is_capitalized_name("Rio de Janeiro"));
        assert!(is_capitalized_name("Winston-Salem"));
        assert!(!is_capitalized_name("new york"));
        assert!(!is_capitalized_name("Paris 2"));
        assert!(!is_capitalized_name(""));
    }

    #[test]
    fn country_codes_are_two_uppercase_letters() {
        assert!(is_country_code("US"));
        assert!(!is_country_code("us"));
        assert!(!is_country_code("USA"));
        assert!(!is_country_code("U"));
    }

    #[test]
    fn port_range_bounds() {
        assert!(!is_port_number(0));
        assert!(is_port_number(1));
        assert!(is_port_number(65_535));
        assert!(!is_port_number(65_536));
    }

    #[test]
    fn name_parts() {
        assert!(is_name_part("Jane"));
        assert!(is_name_part("McDonald"));
        assert!(is_name_part("O'Brien"));
        assert!(is_name_part("Smith-Jones"));
        assert!(!is_name_part("jane"));
        assert!(!is_name_part("J"));
        assert!(is_initial("J"));
        assert!(!is_initial("Jo"));
    }

    #[test]
    fn accumulating_helpers() {
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "name", "  ");
        check(&mut errors, "zipcode", "9", is_zipcode, "is not a valid postal code");
        check_optional(&mut errors, "state", None, is_capitalized_name, "bad");
        assert!(errors.has("name"));
        assert!(errors.has("zipcode"));
        assert!(!errors.has("state"));
    }
}
