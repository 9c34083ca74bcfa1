//! People and the contact details and relationships attached to them.

use chrono::{DateTime, Utc};
use dossier_core::parse::person_name::normalize;
use dossier_core::parse::PersonName;
use dossier_core::types::{ConnectionType, PersonalAddressType, PersonalPhoneType};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::email_address::EmailAddress;
use crate::models::phone_number::PhoneNumber;
use crate::models::street_address::{NewStreetAddress, StreetAddress};
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, opt_text, Importable, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub full_name: String,
    pub prefix: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub middle_initial: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Person {
    const TABLE: &'static str = "dossier_people";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "full_name",
        "prefix",
        "first_name",
        "middle_name",
        "middle_initial",
        "last_name",
        "suffix",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            full_name: row.get("full_name")?,
            prefix: row.get("prefix")?,
            first_name: row.get("first_name")?,
            middle_name: row.get("middle_name")?,
            middle_initial: row.get("middle_initial")?,
            last_name: row.get("last_name")?,
            suffix: row.get("suffix")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Keyed by the full name as written, with whitespace collapsed.
impl Importable for Person {
    type Key = str;

    fn lookup(db: &Database, full_name: &str) -> Result<Option<Self>, DbError> {
        Self::query()
            .where_eq("full_name", text(normalize(full_name)))
            .first(db)
    }

    fn import(db: &Database, full_name: &str) -> Result<Self, DbError> {
        let name = PersonName::parse(full_name)?;
        let full_name = normalize(full_name);
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("full_name", text(full_name.as_str())),
                ("prefix", opt_text(name.prefix.as_deref())),
                ("first_name", text(name.first_name.as_str())),
                ("middle_name", opt_text(name.middle_name.as_deref())),
                ("middle_initial", opt_text(name.middle_initial.as_deref())),
                ("last_name", opt_text(name.last_name.as_deref())),
                ("suffix", opt_text(name.suffix.as_deref())),
            ],
            Self::query().where_eq("full_name", text(full_name)),
        )
    }
}

impl Person {
    pub fn name(&self) -> PersonName {
        PersonName {
            prefix: self.prefix.clone(),
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            middle_initial: self.middle_initial.clone(),
            last_name: self.last_name.clone(),
            suffix: self.suffix.clone(),
        }
    }

    pub fn email_addresses(&self, db: &Database) -> Result<Vec<EmailAddress>, DbError> {
        EmailAddress::query()
            .filter(
                "dossier_email_addresses.id IN (
                    SELECT email_address_id FROM dossier_personal_email_addresses WHERE person_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_email_address(&self, db: &Database, address: &str) -> Result<PersonalEmailAddress, DbError> {
        db.transaction(|db| {
            let email = EmailAddress::import(db, address)?;
            PersonalEmailAddress::link(db, self.id, email.id)
        })
    }

    pub fn phone_numbers(&self, db: &Database) -> Result<Vec<PhoneNumber>, DbError> {
        PhoneNumber::query()
            .filter(
                "dossier_phone_numbers.id IN (
                    SELECT phone_number_id FROM dossier_personal_phone_numbers WHERE person_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_phone_number(
        &self,
        db: &Database,
        number: &str,
        kind: Option<PersonalPhoneType>,
    ) -> Result<PersonalPhoneNumber, DbError> {
        db.transaction(|db| {
            let phone = PhoneNumber::import(db, number)?;
            PersonalPhoneNumber::link(db, self.id, phone.id, kind)
        })
    }

    pub fn street_addresses(&self, db: &Database) -> Result<Vec<StreetAddress>, DbError> {
        StreetAddress::query()
            .filter(
                "dossier_street_addresses.id IN (
                    SELECT street_address_id FROM dossier_personal_street_addresses WHERE person_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_street_address(
        &self,
        db: &Database,
        address: &NewStreetAddress,
        kind: Option<PersonalAddressType>,
    ) -> Result<PersonalStreetAddress, DbError> {
        db.transaction(|db| {
            let address = StreetAddress::import(db, address)?;
            PersonalStreetAddress::link(db, self.id, address.id, kind)
        })
    }

    /// Record a relationship from this person to `other`.
    pub fn connect(
        &self,
        db: &Database,
        other: &Person,
        kind: Option<ConnectionType>,
    ) -> Result<PersonalConnection, DbError> {
        if other.id == self.id {
            return Err(DbError::invalid(
                "destination_person_id",
                "must differ from the source person",
            ));
        }
        PersonalConnection::link(db, self.id, other.id, kind)
    }

    /// Relationships this person is the source of.
    pub fn connections(&self, db: &Database) -> Result<Vec<PersonalConnection>, DbError> {
        PersonalConnection::query()
            .where_eq("source_person_id", self.id)
            .all(db)
    }

    /// People connected to this person in either direction.
    pub fn connected_people(&self, db: &Database) -> Result<Vec<Person>, DbError> {
        Person::query()
            .filter(
                "dossier_people.id IN (
                    SELECT destination_person_id FROM dossier_personal_connections
                    WHERE source_person_id = ?
                    UNION
                    SELECT source_person_id FROM dossier_personal_connections
                    WHERE destination_person_id = ?)",
                [int(self.id), int(self.id)],
            )
            .all(db)
    }
}

impl std::fmt::Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name)
    }
}

impl Query<Person> {
    pub fn with_prefix(self, prefix: &str) -> Self {
        self.where_eq("prefix", text(prefix.trim_end_matches('.')))
    }

    pub fn with_first_name(self, name: &str) -> Self {
        self.where_eq("first_name", text(name))
    }

    pub fn with_middle_name(self, name: &str) -> Self {
        self.where_eq("middle_name", text(name))
    }

    pub fn with_middle_initial(self, initial: &str) -> Self {
        self.where_eq("middle_initial", text(initial.trim_end_matches('.')))
    }

    pub fn with_last_name(self, name: &str) -> Self {
        self.where_eq("last_name", text(name))
    }

    pub fn with_suffix(self, suffix: &str) -> Self {
        self.where_eq("suffix", text(suffix.trim_end_matches('.')))
    }

    pub fn with_email_address(self, address: &str) -> Self {
        self.filter(
            "dossier_people.id IN (
                SELECT l.person_id FROM dossier_personal_email_addresses l
                JOIN dossier_email_addresses e ON e.id = l.email_address_id
                WHERE e.address = ?)",
            [text(address.trim())],
        )
    }

    pub fn with_phone_number(self, number: &str) -> Self {
        self.filter(
            "dossier_people.id IN (
                SELECT l.person_id FROM dossier_personal_phone_numbers l
                JOIN dossier_phone_numbers p ON p.id = l.phone_number_id
                WHERE p.number = ?)",
            [text(number.trim())],
        )
    }
}

link_record!(
    /// A relationship between two distinct people.
    typed ConnectionType,
    "connection type",
    PersonalConnection,
    "dossier_personal_connections",
    source_person_id,
    destination_person_id
);

impl PersonalConnection {
    pub fn source(&self, db: &Database) -> Result<Person, DbError> {
        Person::get(db, self.source_person_id)
    }

    pub fn destination(&self, db: &Database) -> Result<Person, DbError> {
        Person::get(db, self.destination_person_id)
    }
}

link_record!(
    PersonalEmailAddress,
    "dossier_personal_email_addresses",
    person_id,
    email_address_id
);

link_record!(
    typed PersonalPhoneType,
    "personal phone type",
    PersonalPhoneNumber,
    "dossier_personal_phone_numbers",
    person_id,
    phone_number_id
);

link_record!(
    typed PersonalAddressType,
    "personal address type",
    PersonalStreetAddress,
    "dossier_personal_street_addresses",
    person_id,
    street_address_id
);

impl EmailAddress {
    pub fn people(&self, db: &Database) -> Result<Vec<Person>, DbError> {
        Person::query()
            .filter(
                "dossier_people.id IN (
                    SELECT person_id FROM dossier_personal_email_addresses WHERE email_address_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

impl PhoneNumber {
    pub fn people(&self, db: &Database) -> Result<Vec<Person>, DbError> {
        Person::query()
            .filter(
                "dossier_people.id IN (
                    SELECT person_id FROM dossier_personal_phone_numbers WHERE phone_number_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

impl StreetAddress {
    pub fn people(&self, db: &Database) -> Result<Vec<Person>, DbError> {
        Person::query()
            .filter(
                "dossier_people.id IN (
                    SELECT person_id FROM dossier_personal_street_addresses WHERE street_address_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_parses_name() {
        let db = Database::open_in_memory().unwrap();
        let person = Person::import(&db, "Dr. Jane A. Doe Jr.").unwrap();
        assert_eq!(person.prefix.as_deref(), Some("Dr"));
        assert_eq!(person.first_name, "Jane");
        assert_eq!(person.middle_initial.as_deref(), Some("A"));
        assert_eq!(person.last_name.as_deref(), Some("Doe"));
        assert_eq!(person.suffix.as_deref(), Some("Jr"));
        assert_eq!(person.to_string(), "Dr. Jane A. Doe Jr.");
        assert_eq!(person.name().full_name(), "Dr. Jane A. Doe Jr.");

        assert_eq!(Person::import(&db, "Dr.  Jane A. Doe Jr. ").unwrap(), person);
        assert_eq!(Person::count(&db).unwrap(), 1);
        assert!(Person::import(&db, "jane doe").unwrap_err().is_malformed());
    }

    #[test]
    fn test_contacts() {
        let db = Database::open_in_memory().unwrap();
        let person = Person::import(&db, "John Smith").unwrap();
        person.add_email_address(&db, "john@example.com").unwrap();
        let cell = person
            .add_phone_number(&db, "555-123-4567", Some(PersonalPhoneType::Cell))
            .unwrap();
        let home = person
            .add_street_address(
                &db,
                &NewStreetAddress::new("1 Main St", "Springfield", "USA"),
                Some(PersonalAddressType::Home),
            )
            .unwrap();
        assert_eq!(cell.kind, Some(PersonalPhoneType::Cell));
        assert_eq!(home.kind, Some(PersonalAddressType::Home));

        // Relinking keeps the first type.
        let again = person
            .add_phone_number(&db, "555-123-4567", Some(PersonalPhoneType::Work))
            .unwrap();
        assert_eq!(again, cell);

        let email = &person.email_addresses(&db).unwrap()[0];
        assert_eq!(email.address, "john@example.com");
        assert_eq!(email.people(&db).unwrap(), vec![person.clone()]);
        let phone = &person.phone_numbers(&db).unwrap()[0];
        assert_eq!(phone.people(&db).unwrap(), vec![person.clone()]);
        let address = &person.street_addresses(&db).unwrap()[0];
        assert_eq!(address.people(&db).unwrap(), vec![person.clone()]);

        assert_eq!(
            PersonalPhoneNumber::query()
                .of_type(PersonalPhoneType::Cell)
                .count(&db)
                .unwrap(),
            1
        );
        assert_eq!(
            Person::query().with_email_address("john@example.com").all(&db).unwrap(),
            vec![person.clone()]
        );
        assert_eq!(
            Person::query().with_phone_number("555-123-4567").count(&db).unwrap(),
            1
        );

        person.destroy(&db).unwrap();
        assert_eq!(PersonalEmailAddress::count(&db).unwrap(), 0);
        assert_eq!(PhoneNumber::count(&db).unwrap(), 1);
    }

    #[test]
    fn test_connections() {
        let db = Database::open_in_memory().unwrap();
        let alice = Person::import(&db, "Alice Smith").unwrap();
        let bob = Person::import(&db, "Bob Jones").unwrap();
        let carol = Person::import(&db, "Carol White").unwrap();

        let link = alice.connect(&db, &bob, Some(ConnectionType::Coworker)).unwrap();
        assert_eq!(link.source(&db).unwrap(), alice);
        assert_eq!(link.destination(&db).unwrap(), bob);
        carol.connect(&db, &alice, None).unwrap();

        assert_eq!(alice.connections(&db).unwrap(), vec![link]);
        assert_eq!(alice.connected_people(&db).unwrap(), vec![bob, carol]);
        assert!(alice.connect(&db, &alice, None).unwrap_err().is_validation());
    }

    #[test]
    fn test_scopes() {
        let db = Database::open_in_memory().unwrap();
        Person::import(&db, "Dr. Jane A. Doe Jr.").unwrap();
        Person::import(&db, "Mary Ann Doe").unwrap();
        Person::import(&db, "John Smith").unwrap();

        assert_eq!(Person::query().with_prefix("Dr.").count(&db).unwrap(), 1);
        assert_eq!(Person::query().with_first_name("Mary").count(&db).unwrap(), 1);
        assert_eq!(Person::query().with_middle_name("Ann").count(&db).unwrap(), 1);
        assert_eq!(Person::query().with_middle_initial("A").count(&db).unwrap(), 2);
        assert_eq!(Person::query().with_last_name("Doe").count(&db).unwrap(), 2);
        assert_eq!(Person::query().with_suffix("Jr.").count(&db).unwrap(), 1);
    }
}
