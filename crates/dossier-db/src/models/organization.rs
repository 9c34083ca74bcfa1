//! Organizations, their internal structure, and who they serve.
//!
//! Organizations nest through `parent_id` and departments nest through
//! `parent_department_id`. Both hierarchies are kept acyclic at write time.

use chrono::{DateTime, Utc};
use dossier_core::types::{OrganizationAddressType, OrganizationPhoneType, OrganizationType};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Database;
use crate::error::DbError;
use crate::models::email_address::EmailAddress;
use crate::models::person::Person;
use crate::models::phone_number::PhoneNumber;
use crate::models::street_address::{NewStreetAddress, StreetAddress};
use crate::query::{int, text, Query};
use crate::record::{
    enum_text, find_or_create, get_opt_enum, get_time, lookup_by_name, opt_enum_text, opt_int,
    opt_text, HasUniqueName, Importable, Record,
};

/// Whether `start`, or any ancestor reached from it through
/// `parent_column`, is `target`.
fn reaches(
    db: &Database,
    table: &str,
    parent_column: &str,
    start: i64,
    target: i64,
) -> Result<bool, DbError> {
    let sql = format!(
        "WITH RECURSIVE ancestors(id) AS (
            SELECT ?
            UNION
            SELECT t.{parent_column} FROM {table} t JOIN ancestors a ON t.id = a.id
            WHERE t.{parent_column} IS NOT NULL
         )
         SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = ?)"
    );
    let found: Option<bool> = db.query_one(&sql, &[int(start), int(target)], |row| row.get(0))?;
    Ok(found.unwrap_or(false))
}

// ── Organizations ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub kind: Option<OrganizationType>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for Organization {
    const TABLE: &'static str = "dossier_organizations";
    const COLUMNS: &'static [&'static str] = &["id", "name", "type", "parent_id", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: get_opt_enum(row, "type", "organization type")?,
            parent_id: row.get("parent_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl HasUniqueName for Organization {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Importable for Organization {
    type Key = str;

    fn lookup(db: &Database, name: &str) -> Result<Option<Self>, DbError> {
        lookup_by_name(db, name)
    }

    fn import(db: &Database, name: &str) -> Result<Self, DbError> {
        Self::import_typed(db, name, None)
    }
}

impl Organization {
    /// Import by name. An existing organization keeps its recorded type.
    pub fn import_typed(
        db: &Database,
        name: &str,
        kind: Option<OrganizationType>,
    ) -> Result<Self, DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::invalid("name", "must be present"));
        }
        find_or_create(
            db,
            Self::TABLE,
            &[("name", text(name)), ("type", opt_enum_text(kind.as_ref()))],
            Self::query().named(name),
        )
    }

    pub fn set_type(&mut self, db: &Database, kind: Option<OrganizationType>) -> Result<(), DbError> {
        let updated = db.execute(
            "UPDATE dossier_organizations SET type = ? WHERE id = ?",
            &[opt_enum_text(kind.as_ref()), int(self.id)],
        )?;
        if updated == 0 {
            return Err(DbError::not_found(Self::TABLE, self.id));
        }
        self.kind = kind;
        Ok(())
    }

    pub fn parent(&self, db: &Database) -> Result<Option<Organization>, DbError> {
        match self.parent_id {
            Some(id) => Organization::find(db, id),
            None => Ok(None),
        }
    }

    /// Attach this organization under `parent`, or detach it with `None`.
    /// An organization can be neither its own parent nor its own ancestor.
    pub fn set_parent(&mut self, db: &Database, parent: Option<&Organization>) -> Result<(), DbError> {
        db.transaction(|db| {
            if let Some(parent) = parent {
                if reaches(db, Self::TABLE, "parent_id", parent.id, self.id)? {
                    return Err(DbError::invalid(
                        "parent_id",
                        "would make the organization its own ancestor",
                    ));
                }
            }
            let parent_id = parent.map(|p| p.id);
            let updated = db.execute(
                "UPDATE dossier_organizations SET parent_id = ? WHERE id = ?",
                &[opt_int(parent_id), int(self.id)],
            )?;
            if updated == 0 {
                return Err(DbError::not_found(Self::TABLE, self.id));
            }
            debug!(id = self.id, ?parent_id, "Set organization parent");
            self.parent_id = parent_id;
            Ok(())
        })
    }

    pub fn subsidiaries(&self, db: &Database) -> Result<Vec<Organization>, DbError> {
        Organization::query().with_parent(self).all(db)
    }

    pub fn departments(&self, db: &Database) -> Result<Vec<OrganizationDepartment>, DbError> {
        OrganizationDepartment::query()
            .where_eq("organization_id", self.id)
            .all(db)
    }

    /// Find or create a department. A parent department must belong to this
    /// organization.
    pub fn add_department(
        &self,
        db: &Database,
        name: &str,
        parent: Option<&OrganizationDepartment>,
    ) -> Result<OrganizationDepartment, DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::invalid("name", "must be present"));
        }
        if let Some(parent) = parent {
            if parent.organization_id != self.id {
                return Err(DbError::invalid(
                    "parent_department_id",
                    "must belong to the same organization",
                ));
            }
        }
        find_or_create(
            db,
            OrganizationDepartment::TABLE,
            &[
                ("name", text(name)),
                ("organization_id", int(self.id)),
                ("parent_department_id", opt_int(parent.map(|p| p.id))),
            ],
            OrganizationDepartment::query()
                .where_eq("organization_id", self.id)
                .where_eq("name", text(name)),
        )
    }

    pub fn members(&self, db: &Database) -> Result<Vec<OrganizationMember>, DbError> {
        OrganizationMember::query().for_organization(self).all(db)
    }

    /// Find or create the membership of `person`. An existing membership
    /// keeps its recorded details.
    pub fn add_member(
        &self,
        db: &Database,
        person: &Person,
        details: &NewMember,
    ) -> Result<OrganizationMember, DbError> {
        if let Some(department) = &details.department {
            if department.organization_id != self.id {
                return Err(DbError::invalid(
                    "department_id",
                    "must belong to the same organization",
                ));
            }
        }
        find_or_create(
            db,
            OrganizationMember::TABLE,
            &[
                ("organization_id", int(self.id)),
                ("person_id", int(person.id)),
                ("active", details.active.into()),
                ("title", opt_text(details.title.as_deref())),
                ("rank", opt_text(details.rank.as_deref())),
                ("department_id", opt_int(details.department.as_ref().map(|d| d.id))),
            ],
            OrganizationMember::query()
                .where_eq("organization_id", self.id)
                .where_eq("person_id", person.id),
        )
    }

    /// People who are members of this organization.
    pub fn people(&self, db: &Database) -> Result<Vec<Person>, DbError> {
        Person::query()
            .filter(
                "dossier_people.id IN (
                    SELECT person_id FROM dossier_organization_members WHERE organization_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn customers(&self, db: &Database) -> Result<Vec<OrganizationCustomer>, DbError> {
        OrganizationCustomer::query()
            .where_eq("organization_id", self.id)
            .all(db)
    }

    pub fn add_customer(&self, db: &Database, customer: Customer<'_>) -> Result<OrganizationCustomer, DbError> {
        let (org_id, person_id) = match customer {
            Customer::Organization(org) => (Some(org.id), None),
            Customer::Person(person) => (None, Some(person.id)),
        };
        find_or_create(
            db,
            OrganizationCustomer::TABLE,
            &[
                ("organization_id", int(self.id)),
                ("customer_organization_id", opt_int(org_id)),
                ("customer_person_id", opt_int(person_id)),
            ],
            OrganizationCustomer::query()
                .where_eq("organization_id", self.id)
                .where_eq_nullable("customer_organization_id", opt_int(org_id))
                .where_eq_nullable("customer_person_id", opt_int(person_id)),
        )
    }

    pub fn email_addresses(&self, db: &Database) -> Result<Vec<EmailAddress>, DbError> {
        EmailAddress::query()
            .filter(
                "dossier_email_addresses.id IN (
                    SELECT email_address_id FROM dossier_organization_email_addresses
                    WHERE organization_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_email_address(
        &self,
        db: &Database,
        address: &str,
    ) -> Result<OrganizationEmailAddress, DbError> {
        db.transaction(|db| {
            let email = EmailAddress::import(db, address)?;
            OrganizationEmailAddress::link(db, self.id, email.id)
        })
    }

    pub fn phone_numbers(&self, db: &Database) -> Result<Vec<PhoneNumber>, DbError> {
        PhoneNumber::query()
            .filter(
                "dossier_phone_numbers.id IN (
                    SELECT phone_number_id FROM dossier_organization_phone_numbers
                    WHERE organization_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_phone_number(
        &self,
        db: &Database,
        number: &str,
        kind: Option<OrganizationPhoneType>,
    ) -> Result<OrganizationPhoneNumber, DbError> {
        db.transaction(|db| {
            let phone = PhoneNumber::import(db, number)?;
            OrganizationPhoneNumber::link(db, self.id, phone.id, kind)
        })
    }

    pub fn street_addresses(&self, db: &Database) -> Result<Vec<StreetAddress>, DbError> {
        StreetAddress::query()
            .filter(
                "dossier_street_addresses.id IN (
                    SELECT street_address_id FROM dossier_organization_street_addresses
                    WHERE organization_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn add_street_address(
        &self,
        db: &Database,
        address: &NewStreetAddress,
        kind: Option<OrganizationAddressType>,
    ) -> Result<OrganizationStreetAddress, DbError> {
        db.transaction(|db| {
            let address = StreetAddress::import(db, address)?;
            OrganizationStreetAddress::link(db, self.id, address.id, kind)
        })
    }
}

impl std::fmt::Display for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Query<Organization> {
    pub fn of_type(self, kind: OrganizationType) -> Self {
        self.where_eq("type", enum_text(&kind))
    }

    pub fn companies(self) -> Self {
        self.of_type(OrganizationType::Company)
    }

    pub fn governments(self) -> Self {
        self.of_type(OrganizationType::Government)
    }

    pub fn militaries(self) -> Self {
        self.of_type(OrganizationType::Military)
    }

    pub fn non_profits(self) -> Self {
        self.of_type(OrganizationType::NonProfit)
    }

    pub fn educational(self) -> Self {
        self.of_type(OrganizationType::Education)
    }

    pub fn with_parent(self, parent: &Organization) -> Self {
        self.where_eq("parent_id", parent.id)
    }

    pub fn top_level(self) -> Self {
        self.where_null("parent_id")
    }
}

// ── Departments ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDepartment {
    pub id: i64,
    pub name: String,
    pub organization_id: i64,
    pub parent_department_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for OrganizationDepartment {
    const TABLE: &'static str = "dossier_organization_departments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "organization_id",
        "parent_department_id",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            organization_id: row.get("organization_id")?,
            parent_department_id: row.get("parent_department_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl OrganizationDepartment {
    pub fn organization(&self, db: &Database) -> Result<Organization, DbError> {
        Organization::get(db, self.organization_id)
    }

    pub fn parent(&self, db: &Database) -> Result<Option<OrganizationDepartment>, DbError> {
        match self.parent_department_id {
            Some(id) => OrganizationDepartment::find(db, id),
            None => Ok(None),
        }
    }

    /// Move this department under `parent`, which must belong to the same
    /// organization and must not sit below this department.
    pub fn set_parent(
        &mut self,
        db: &Database,
        parent: Option<&OrganizationDepartment>,
    ) -> Result<(), DbError> {
        db.transaction(|db| {
            if let Some(parent) = parent {
                if parent.organization_id != self.organization_id {
                    return Err(DbError::invalid(
                        "parent_department_id",
                        "must belong to the same organization",
                    ));
                }
                if reaches(db, Self::TABLE, "parent_department_id", parent.id, self.id)? {
                    return Err(DbError::invalid(
                        "parent_department_id",
                        "would make the department its own ancestor",
                    ));
                }
            }
            let parent_id = parent.map(|p| p.id);
            let updated = db.execute(
                "UPDATE dossier_organization_departments SET parent_department_id = ? WHERE id = ?",
                &[opt_int(parent_id), int(self.id)],
            )?;
            if updated == 0 {
                return Err(DbError::not_found(Self::TABLE, self.id));
            }
            self.parent_department_id = parent_id;
            Ok(())
        })
    }

    pub fn subdepartments(&self, db: &Database) -> Result<Vec<OrganizationDepartment>, DbError> {
        OrganizationDepartment::query()
            .where_eq("parent_department_id", self.id)
            .all(db)
    }

    pub fn members(&self, db: &Database) -> Result<Vec<OrganizationMember>, DbError> {
        OrganizationMember::query()
            .where_eq("department_id", self.id)
            .all(db)
    }
}

// ── Members ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: i64,
    pub organization_id: i64,
    pub person_id: i64,
    pub active: bool,
    pub title: Option<String>,
    pub rank: Option<String>,
    pub department_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for OrganizationMember {
    const TABLE: &'static str = "dossier_organization_members";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "person_id",
        "active",
        "title",
        "rank",
        "department_id",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            organization_id: row.get("organization_id")?,
            person_id: row.get("person_id")?,
            active: row.get("active")?,
            title: row.get("title")?,
            rank: row.get("rank")?,
            department_id: row.get("department_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Details recorded with a new membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember<'a> {
    pub active: bool,
    pub title: Option<String>,
    pub rank: Option<String>,
    pub department: Option<&'a OrganizationDepartment>,
}

impl Default for NewMember<'_> {
    fn default() -> Self {
        Self {
            active: true,
            title: None,
            rank: None,
            department: None,
        }
    }
}

impl<'a> NewMember<'a> {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = Some(rank.into());
        self
    }

    pub fn department(mut self, department: &'a OrganizationDepartment) -> Self {
        self.department = Some(department);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl OrganizationMember {
    pub fn organization(&self, db: &Database) -> Result<Organization, DbError> {
        Organization::get(db, self.organization_id)
    }

    pub fn person(&self, db: &Database) -> Result<Person, DbError> {
        Person::get(db, self.person_id)
    }

    pub fn department(&self, db: &Database) -> Result<Option<OrganizationDepartment>, DbError> {
        match self.department_id {
            Some(id) => OrganizationDepartment::find(db, id),
            None => Ok(None),
        }
    }

    pub fn set_active(&mut self, db: &Database, active: bool) -> Result<(), DbError> {
        let updated = db.execute(
            "UPDATE dossier_organization_members SET active = ? WHERE id = ?",
            &[active.into(), int(self.id)],
        )?;
        if updated == 0 {
            return Err(DbError::not_found(Self::TABLE, self.id));
        }
        self.active = active;
        Ok(())
    }
}

impl Query<OrganizationMember> {
    pub fn active(self) -> Self {
        self.where_eq("active", true)
    }

    pub fn inactive(self) -> Self {
        self.where_eq("active", false)
    }

    pub fn with_title(self, title: &str) -> Self {
        self.where_eq("title", text(title))
    }

    pub fn with_rank(self, rank: &str) -> Self {
        self.where_eq("rank", text(rank))
    }

    pub fn for_person(self, person: &Person) -> Self {
        self.where_eq("person_id", person.id)
    }

    pub fn for_organization(self, organization: &Organization) -> Self {
        self.where_eq("organization_id", organization.id)
    }
}

// ── Customers ─────────────────────────────────────────────────────

/// The customer side of an [`OrganizationCustomer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Customer<'a> {
    Organization(&'a Organization),
    Person(&'a Person),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationCustomer {
    pub id: i64,
    pub organization_id: i64,
    pub customer_organization_id: Option<i64>,
    pub customer_person_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Record for OrganizationCustomer {
    const TABLE: &'static str = "dossier_organization_customers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "customer_organization_id",
        "customer_person_id",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            organization_id: row.get("organization_id")?,
            customer_organization_id: row.get("customer_organization_id")?,
            customer_person_id: row.get("customer_person_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl OrganizationCustomer {
    pub fn organization(&self, db: &Database) -> Result<Organization, DbError> {
        Organization::get(db, self.organization_id)
    }

    pub fn customer_organization(&self, db: &Database) -> Result<Option<Organization>, DbError> {
        match self.customer_organization_id {
            Some(id) => Organization::find(db, id),
            None => Ok(None),
        }
    }

    pub fn customer_person(&self, db: &Database) -> Result<Option<Person>, DbError> {
        match self.customer_person_id {
            Some(id) => Person::find(db, id),
            None => Ok(None),
        }
    }
}

// ── Contact links ─────────────────────────────────────────────────

link_record!(
    OrganizationEmailAddress,
    "dossier_organization_email_addresses",
    organization_id,
    email_address_id
);

link_record!(
    typed OrganizationPhoneType,
    "organization phone type",
    OrganizationPhoneNumber,
    "dossier_organization_phone_numbers",
    organization_id,
    phone_number_id
);

link_record!(
    typed OrganizationAddressType,
    "organization address type",
    OrganizationStreetAddress,
    "dossier_organization_street_addresses",
    organization_id,
    street_address_id
);

impl Person {
    /// Organizations this person is a member of.
    pub fn organizations(&self, db: &Database) -> Result<Vec<Organization>, DbError> {
        Organization::query()
            .filter(
                "dossier_organizations.id IN (
                    SELECT organization_id FROM dossier_organization_members WHERE person_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn memberships(&self, db: &Database) -> Result<Vec<OrganizationMember>, DbError> {
        OrganizationMember::query().for_person(self).all(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_keeps_first_type() {
        let db = Database::open_in_memory().unwrap();
        let acme = Organization::import_typed(&db, "Acme Corp", Some(OrganizationType::Company)).unwrap();
        let again = Organization::import_typed(&db, " Acme Corp ", Some(OrganizationType::NonProfit))
            .unwrap();
        assert_eq!(again, acme);
        assert_eq!(Organization::import(&db, "Acme Corp").unwrap().kind, Some(OrganizationType::Company));
        assert!(Organization::import(&db, "  ").unwrap_err().is_validation());

        let mut agency = Organization::import(&db, "Agency").unwrap();
        assert_eq!(agency.kind, None);
        agency.set_type(&db, Some(OrganizationType::Government)).unwrap();
        assert_eq!(Organization::query().governments().all(&db).unwrap(), vec![agency]);
        assert_eq!(Organization::query().companies().count(&db).unwrap(), 1);
        assert_eq!(Organization::query().militaries().count(&db).unwrap(), 0);
        assert_eq!(Organization::query().non_profits().count(&db).unwrap(), 0);
    }

    #[test]
    fn test_parent_cycles_refused() {
        let db = Database::open_in_memory().unwrap();
        let mut parent = Organization::import(&db, "Parent Co").unwrap();
        let mut child = Organization::import(&db, "Child Co").unwrap();
        let mut grandchild = Organization::import(&db, "Grandchild Co").unwrap();

        child.set_parent(&db, Some(&parent)).unwrap();
        grandchild.set_parent(&db, Some(&child)).unwrap();
        assert_eq!(parent.subsidiaries(&db).unwrap(), vec![child.clone()]);
        assert_eq!(grandchild.parent(&db).unwrap(), Some(child.clone()));
        assert_eq!(Organization::query().top_level().all(&db).unwrap(), vec![parent.clone()]);

        let snapshot = parent.clone();
        assert!(parent.set_parent(&db, Some(&snapshot)).unwrap_err().is_validation());
        assert!(parent.set_parent(&db, Some(&grandchild)).unwrap_err().is_validation());
        assert_eq!(parent.reload(&db).unwrap().parent_id, None);

        // Deleting a parent orphans its subsidiaries.
        child.destroy(&db).unwrap();
        assert_eq!(grandchild.reload(&db).unwrap().parent_id, None);
    }

    #[test]
    fn test_departments() {
        let db = Database::open_in_memory().unwrap();
        let acme = Organization::import(&db, "Acme").unwrap();
        let other = Organization::import(&db, "Other").unwrap();
        let mut engineering = acme.add_department(&db, "Engineering", None).unwrap();
        let mut security = acme.add_department(&db, "Security", Some(&engineering)).unwrap();
        assert_eq!(acme.add_department(&db, "Security", None).unwrap(), security);
        assert_eq!(engineering.subdepartments(&db).unwrap(), vec![security.clone()]);
        assert_eq!(security.parent(&db).unwrap(), Some(engineering.clone()));
        assert_eq!(security.organization(&db).unwrap(), acme);

        let foreign = other.add_department(&db, "Sales", None).unwrap();
        assert!(acme
            .add_department(&db, "Ops", Some(&foreign))
            .unwrap_err()
            .is_validation());
        assert!(security.set_parent(&db, Some(&foreign)).unwrap_err().is_validation());

        let snapshot = security.clone();
        assert!(engineering.set_parent(&db, Some(&snapshot)).unwrap_err().is_validation());
        security.set_parent(&db, None).unwrap();
        engineering.set_parent(&db, Some(&security)).unwrap();
        assert_eq!(acme.departments(&db).unwrap().len(), 2);
    }

    #[test]
    fn test_members() {
        let db = Database::open_in_memory().unwrap();
        let acme = Organization::import(&db, "Acme").unwrap();
        let engineering = acme.add_department(&db, "Engineering", None).unwrap();
        let jane = Person::import(&db, "Jane Doe").unwrap();
        let john = Person::import(&db, "John Smith").unwrap();

        let member = acme
            .add_member(&db, &jane, &NewMember::default().title("CTO").department(&engineering))
            .unwrap();
        assert!(member.active);
        assert_eq!(member.department(&db).unwrap(), Some(engineering.clone()));
        assert_eq!(
            acme.add_member(&db, &jane, &NewMember::default().title("CEO")).unwrap(),
            member
        );
        let mut former = acme
            .add_member(&db, &john, &NewMember::default().rank("Staff"))
            .unwrap();
        former.set_active(&db, false).unwrap();

        assert_eq!(acme.members(&db).unwrap().len(), 2);
        assert_eq!(acme.people(&db).unwrap(), vec![jane.clone(), john.clone()]);
        assert_eq!(engineering.members(&db).unwrap(), vec![member.clone()]);
        assert_eq!(OrganizationMember::query().active().all(&db).unwrap(), vec![member.clone()]);
        assert_eq!(OrganizationMember::query().inactive().count(&db).unwrap(), 1);
        assert_eq!(OrganizationMember::query().with_title("CTO").count(&db).unwrap(), 1);
        assert_eq!(OrganizationMember::query().with_rank("Staff").count(&db).unwrap(), 1);
        assert_eq!(jane.organizations(&db).unwrap(), vec![acme.clone()]);
        assert_eq!(jane.memberships(&db).unwrap(), vec![member.clone()]);
        assert_eq!(member.person(&db).unwrap(), jane);
        assert_eq!(member.organization(&db).unwrap(), acme);

        let other = Organization::import(&db, "Other").unwrap();
        let err = other
            .add_member(&db, &john, &NewMember::default().department(&engineering))
            .unwrap_err();
        assert!(err.is_validation());

        engineering.destroy(&db).unwrap();
        assert_eq!(member.reload(&db).unwrap().department_id, None);
    }

    #[test]
    fn test_updates_on_deleted_records_fail() {
        let db = Database::open_in_memory().unwrap();
        let acme = Organization::import(&db, "Acme").unwrap();
        let mut gone = Organization::import(&db, "Gone Co").unwrap();
        let mut department = gone.add_department(&db, "Sales", None).unwrap();
        let jane = Person::import(&db, "Jane Doe").unwrap();
        let mut member = gone.add_member(&db, &jane, &NewMember::default()).unwrap();
        gone.clone().destroy(&db).unwrap();

        let err = gone.set_type(&db, Some(OrganizationType::Company)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(gone.kind, None);
        let err = gone.set_parent(&db, Some(&acme)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(gone.parent_id, None);
        assert!(department.set_parent(&db, None).unwrap_err().is_not_found());
        assert!(member.set_active(&db, false).unwrap_err().is_not_found());
        assert!(member.active);
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_customers_and_contacts() {
        let db = Database::open_in_memory().unwrap();
        let acme = Organization::import(&db, "Acme").unwrap();
        let client = Organization::import(&db, "Client Co").unwrap();
        let jane = Person::import(&db, "Jane Doe").unwrap();

        let by_org = acme.add_customer(&db, Customer::Organization(&client)).unwrap();
        let by_person = acme.add_customer(&db, Customer::Person(&jane)).unwrap();
        assert_eq!(acme.add_customer(&db, Customer::Person(&jane)).unwrap(), by_person);
        assert_eq!(by_org.customer_organization(&db).unwrap(), Some(client));
        assert_eq!(by_org.customer_person(&db).unwrap(), None);
        assert_eq!(by_person.customer_person(&db).unwrap(), Some(jane));
        assert_eq!(by_person.organization(&db).unwrap(), acme);
        assert_eq!(acme.customers(&db).unwrap().len(), 2);

        acme.add_email_address(&db, "info@acme.example").unwrap();
        let main = acme
            .add_phone_number(&db, "+1 (555) 000-1111", Some(OrganizationPhoneType::Main))
            .unwrap();
        let hq = acme
            .add_street_address(
                &db,
                &NewStreetAddress::new("1 Acme Way", "Springfield", "USA"),
                Some(OrganizationAddressType::Headquarters),
            )
            .unwrap();
        assert_eq!(main.kind, Some(OrganizationPhoneType::Main));
        assert_eq!(hq.kind, Some(OrganizationAddressType::Headquarters));
        assert_eq!(acme.email_addresses(&db).unwrap()[0].address, "info@acme.example");
        assert_eq!(acme.phone_numbers(&db).unwrap()[0].area_code.as_deref(), Some("555"));
        assert_eq!(acme.street_addresses(&db).unwrap()[0].city, "Springfield");

        acme.destroy(&db).unwrap();
        assert_eq!(OrganizationCustomer::count(&db).unwrap(), 0);
        assert_eq!(OrganizationPhoneNumber::count(&db).unwrap(), 0);
        assert_eq!(PhoneNumber::count(&db).unwrap(), 1);
    }
}
