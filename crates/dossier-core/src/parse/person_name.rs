//! Personal full names: `[Prefix] First [Middle|M.] [Last][, Suffix]`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::validate::NAME_PART;

/// Honorifics accepted before the first name.
pub const NAME_PREFIXES: &[&str] = &[
    "Mrs", "Mr", "Ms", "Miss", "Mx", "Dr", "Prof", "Rev", "Sir", "Dame", "Hon", "Capt", "Col",
    "Gen", "Lt", "Maj", "Sgt",
];

/// Generational and professional suffixes accepted after the last name.
pub const NAME_SUFFIXES: &[&str] = &[
    "Jr", "Sr", "III", "II", "IV", "V", "PhD", "MD", "DDS", "Esq",
];

static FULL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    let prefixes = NAME_PREFIXES.join("|");
    let suffixes = NAME_SUFFIXES.join("|");
    let pattern = format!(
        r"^(?:(?P<prefix>{prefixes})\.?\s+)?(?P<first>{NAME_PART})(?:(?:\s+(?:(?P<middle_initial>[A-Z])\.?|(?P<middle>{NAME_PART})))??\s+(?P<last>{NAME_PART}))?(?:,?\s+(?P<suffix>{suffixes})\.?)?$"
    );
    Regex::new(&pattern).expect("full name pattern")
});

/// Structured parts of a personal name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub prefix: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub middle_initial: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
}

impl PersonName {
    /// Split a full name into its parts.
    ///
    /// A spelled-out middle name also sets `middle_initial`. Names that fit
    /// the grammar in more than one way resolve to the reading with the fewest
    /// middle parts; names that fit it in none are rejected.
    pub fn parse(full_name: &str) -> Result<Self, ParseError> {
        let normalized = normalize(full_name);
        let caps = FULL_NAME_RE
            .captures(&normalized)
            .ok_or_else(|| ParseError::InvalidPersonName(full_name.to_string()))?;

        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        let middle_name = text("middle");
        let middle_initial = text("middle_initial")
            .or_else(|| middle_name.as_ref().and_then(|m| m.get(..1)).map(str::to_string));

        Ok(Self {
            prefix: text("prefix"),
            first_name: text("first").unwrap_or_default(),
            middle_name,
            middle_initial,
            last_name: text("last"),
            suffix: text("suffix"),
        })
    }

    /// Reassemble the canonical full name.
    pub fn full_name(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(prefix) = &self.prefix {
            parts.push(format!("{prefix}."));
        }
        parts.push(self.first_name.clone());
        match (&self.middle_name, &self.middle_initial) {
            (Some(middle), _) => parts.push(middle.clone()),
            (None, Some(initial)) => parts.push(format!("{initial}.")),
            (None, None) => {}
        }
        if let Some(last) = &self.last_name {
            parts.push(last.clone());
        }
        let mut name = parts.join(" ");
        if let Some(suffix) = &self.suffix {
            name.push(' ');
            name.push_str(suffix);
            if matches!(suffix.as_str(), "Jr" | "Sr") {
                name.push('.');
            }
        }
        name
    }
}

/// Trim and collapse runs of whitespace.
pub fn normalize(full_name: &str) -> String {
    full_name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_part() {
        let name = PersonName::parse("Dr. Jane A. Doe Jr.").unwrap();
        assert_eq!(name.prefix.as_deref(), Some("Dr"));
        assert_eq!(name.first_name, "Jane");
        assert_eq!(name.middle_initial.as_deref(), Some("A"));
        assert_eq!(name.middle_name, None);
        assert_eq!(name.last_name.as_deref(), Some("Doe"));
        assert_eq!(name.suffix.as_deref(), Some("Jr"));
    }

    #[test]
    fn first_and_last_only() {
        let name = PersonName::parse("John Smith").unwrap();
        assert_eq!(name.first_name, "John");
        assert_eq!(name.last_name.as_deref(), Some("Smith"));
        assert_eq!(name.middle_initial, None);
        assert_eq!(name.suffix, None);
    }

    #[test]
    fn suffix_is_not_mistaken_for_last_name() {
        let name = PersonName::parse("John Smith Jr").unwrap();
        assert_eq!(name.last_name.as_deref(), Some("Smith"));
        assert_eq!(name.suffix.as_deref(), Some("Jr"));

        let name = PersonName::parse("Jane Doe, PhD").unwrap();
        assert_eq!(name.last_name.as_deref(), Some("Doe"));
        assert_eq!(name.suffix.as_deref(), Some("PhD"));
    }

    #[test]
    fn spelled_out_middle_name_sets_initial() {
        let name = PersonName::parse("Mary Ann O'Brien-Smith").unwrap();
        assert_eq!(name.first_name, "Mary");
        assert_eq!(name.middle_name.as_deref(), Some("Ann"));
        assert_eq!(name.middle_initial.as_deref(), Some("A"));
        assert_eq!(name.last_name.as_deref(), Some("O'Brien-Smith"));
    }

    #[test]
    fn single_name() {
        let name = PersonName::parse("Madonna").unwrap();
        assert_eq!(name.first_name, "Madonna");
        assert_eq!(name.last_name, None);
    }

    #[test]
    fn collapses_whitespace() {
        let name = PersonName::parse("  Mrs   Ada  Lovelace ").unwrap();
        assert_eq!(name.prefix.as_deref(), Some("Mrs"));
        assert_eq!(name.first_name, "Ada");
        assert_eq!(name.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn rejects_unparseable_names() {
        for bad in ["", "jane doe", "Jane 4 Doe", "J. Doe", "Jane Doe Smith Jones", "Jane Doe!"] {
            assert_eq!(
                PersonName::parse(bad),
                Err(ParseError::InvalidPersonName(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn full_name_reassembles() {
        let name = PersonName::parse("Dr Jane A Doe Jr").unwrap();
        assert_eq!(name.full_name(), "Dr. Jane A. Doe Jr.");
    }
}
