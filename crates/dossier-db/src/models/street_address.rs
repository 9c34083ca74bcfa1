use chrono::{DateTime, Utc};
use dossier_core::validate::{check, check_optional, is_capitalized_name, is_zipcode, require_present};
use dossier_core::ValidationErrors;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::query::{text, Query};
use crate::record::{find_or_create, get_time, opt_text, validated, Importable, Record};

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetAddress {
    pub id: i64,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

impl Record for StreetAddress {
    const TABLE: &'static str = "dossier_street_addresses";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "address",
        "city",
        "state",
        "zipcode",
        "country",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            address: row.get("address")?,
            city: row.get("city")?,
            state: row.get("state")?,
            zipcode: row.get("zipcode")?,
            country: row.get("country")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// The fields of a street address, which together form its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStreetAddress {
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: String,
}

impl NewStreetAddress {
    pub fn new(
        address: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            city: city.into(),
            state: None,
            zipcode: None,
            country: country.into(),
        }
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn zipcode(mut self, zipcode: impl Into<String>) -> Self {
        self.zipcode = Some(zipcode.into());
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "address", &self.address);
        check(&mut errors, "city", &self.city, is_capitalized_name, "is not a valid city name");
        check_optional(
            &mut errors,
            "state",
            self.state.as_deref(),
            is_capitalized_name,
            "is not a valid state name",
        );
        check_optional(
            &mut errors,
            "zipcode",
            self.zipcode.as_deref(),
            is_zipcode,
            "is not a valid zipcode",
        );
        check(
            &mut errors,
            "country",
            &self.country,
            is_capitalized_name,
            "is not a valid country name",
        );
        validated(errors)
    }

    fn key(&self) -> Query<StreetAddress> {
        StreetAddress::query()
            .where_eq("address", text(self.address.trim()))
            .where_eq("city", text(self.city.as_str()))
            .where_eq_nullable("state", opt_text(self.state.as_deref()))
            .where_eq_nullable("zipcode", opt_text(self.zipcode.as_deref()))
            .where_eq("country", text(self.country.as_str()))
    }
}

impl Importable for StreetAddress {
    type Key = NewStreetAddress;

    fn lookup(db: &Database, new: &NewStreetAddress) -> Result<Option<Self>, DbError> {
        new.key().first(db)
    }

    fn import(db: &Database, new: &NewStreetAddress) -> Result<Self, DbError> {
        new.validate()?;
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("address", text(new.address.trim())),
                ("city", text(new.city.as_str())),
                ("state", opt_text(new.state.as_deref())),
                ("zipcode", opt_text(new.zipcode.as_deref())),
                ("country", text(new.country.as_str())),
            ],
            new.key(),
        )
    }
}

impl std::fmt::Display for StreetAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.address, self.city)?;
        match (&self.state, &self.zipcode) {
            (Some(state), Some(zip)) => write!(f, ", {state} {zip}")?,
            (Some(state), None) => write!(f, ", {state}")?,
            (None, Some(zip)) => write!(f, " {zip}")?,
            (None, None) => {}
        }
        write!(f, ", {}", self.country)
    }
}

impl Query<StreetAddress> {
    pub fn with_city(self, city: &str) -> Self {
        self.where_eq("city", text(city))
    }

    pub fn with_state(self, state: &str) -> Self {
        self.where_eq("state", text(state))
    }

    pub fn with_zipcode(self, zipcode: &str) -> Self {
        self.where_eq("zipcode", text(zipcode))
    }

    pub fn with_country(self, country: &str) -> Self {
        self.where_eq("country", text(country))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> NewStreetAddress {
        NewStreetAddress::new("1 Main St", "Springfield", "USA")
            .state("Illinois")
            .zipcode("62701")
    }

    #[test]
    fn test_import_and_display() {
        let db = Database::open_in_memory().unwrap();
        let address = StreetAddress::import(&db, &office()).unwrap();
        assert_eq!(address.to_string(), "1 Main St, Springfield, Illinois 62701, USA");
        assert_eq!(StreetAddress::import(&db, &office()).unwrap(), address);

        let no_zip = NewStreetAddress::new("1 Main St", "Springfield", "USA").state("Illinois");
        assert_ne!(StreetAddress::import(&db, &no_zip).unwrap().id, address.id);
        assert_eq!(StreetAddress::lookup(&db, &office()).unwrap(), Some(address));
    }

    #[test]
    fn test_validation() {
        let db = Database::open_in_memory().unwrap();
        let bad = NewStreetAddress::new(" ", "springfield", "USA").zipcode("!");
        let err = StreetAddress::import(&db, &bad).unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert!(errors.has("address"));
        assert!(errors.has("city"));
        assert!(errors.has("zipcode"));
        assert!(!errors.has("country"));
        assert_eq!(StreetAddress::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        StreetAddress::import(&db, &office()).unwrap();
        StreetAddress::import(
            &db,
            &NewStreetAddress::new("10 Downing Street", "London", "United Kingdom")
                .zipcode("SW1A 2AA"),
        )
        .unwrap();

        assert_eq!(StreetAddress::query().with_city("London").count(&db).unwrap(), 1);
        assert_eq!(StreetAddress::query().with_state("Illinois").count(&db).unwrap(), 1);
        assert_eq!(StreetAddress::query().with_zipcode("SW1A 2AA").count(&db).unwrap(), 1);
        assert_eq!(StreetAddress::query().with_country("USA").count(&db).unwrap(), 1);
    }
}
