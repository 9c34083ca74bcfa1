//! subjectAltName lists.
//!
//! Only the values are kept; the `DNS:`/`IP:`/`email:` type tag is dropped,
//! so a DNS name and an identically spelled value of another type collapse
//! into one entry.

use std::net::IpAddr;

use x509_parser::extensions::GeneralName;

/// Values of a `TYPE:value, TYPE:value` list.
pub fn parse_subject_alt_names(list: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        let value = match entry.split_once(':') {
            Some((_, value)) => value.trim(),
            None => entry,
        };
        if !value.is_empty() && !names.iter().any(|n| n == value) {
            names.push(value.to_string());
        }
    }
    names
}

/// Values of the general names carried by a certificate extension.
/// Directory names and other structured forms have no single string value
/// and are skipped.
pub fn general_name_values(names: &[GeneralName<'_>]) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for name in names {
        let value = match name {
            GeneralName::DNSName(s) | GeneralName::RFC822Name(s) | GeneralName::URI(s) => {
                Some(s.to_string())
            }
            GeneralName::IPAddress(bytes) => ip_from_bytes(bytes).map(|ip| ip.to_string()),
            _ => None,
        };
        if let Some(value) = value {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_type_tags() {
        assert_eq!(
            parse_subject_alt_names("DNS:www.example.com, DNS:example.com, IP:93.184.216.34"),
            vec!["www.example.com", "example.com", "93.184.216.34"]
        );
    }

    #[test]
    fn same_value_with_different_tags_collapses() {
        assert_eq!(
            parse_subject_alt_names("DNS:example.com,email:example.com"),
            vec!["example.com"]
        );
    }

    #[test]
    fn skips_empty_entries() {
        assert_eq!(parse_subject_alt_names(" , DNS:, DNS:a.com,"), vec!["a.com"]);
        assert!(parse_subject_alt_names("").is_empty());
    }

    #[test]
    fn ipv6_value_keeps_its_colons() {
        assert_eq!(parse_subject_alt_names("IP:2001:db8::1"), vec!["2001:db8::1"]);
    }

    #[test]
    fn general_names_to_values() {
        let names = vec![
            GeneralName::DNSName("example.com"),
            GeneralName::IPAddress(&[10, 0, 0, 1]),
            GeneralName::RFC822Name("admin@example.com"),
            GeneralName::DNSName("example.com"),
        ];
        assert_eq!(
            general_name_values(&names),
            vec!["example.com", "10.0.0.1", "admin@example.com"]
        );
    }
}
