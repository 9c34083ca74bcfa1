//! Login/password pairs and where they were accepted.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dossier_core::{ParseError, ValidationErrors};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::models::address::AddressRecord;
use crate::models::email_address::EmailAddress;
use crate::models::name_pools::UserName;
use crate::models::open_port::OpenPort;
use crate::models::password::Password;
use crate::models::url::Url;
use crate::query::{int, text, Query};
use crate::record::{find_or_create, get_time, opt_int, validated, Importable, Record};

/// A login and password as typed, e.g. `admin:hunter2`. A login containing
/// `@` is an email address, anything else a user name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialKey {
    pub login: String,
    pub password: String,
}

impl CredentialKey {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn is_email(&self) -> bool {
        self.login.contains('@')
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.login.trim().is_empty() {
            errors.add("login", "must be present");
        }
        if self.password.is_empty() {
            errors.add("password", "must be present");
        }
        errors.into_result()
    }
}

/// Splits on the first `:`; the password may itself contain colons.
impl FromStr for CredentialKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((login, password)) => Ok(Self::new(login, password)),
            None => Err(ParseError::InvalidCredential(s.to_string())),
        }
    }
}

impl std::fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.login, self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub user_name_id: Option<i64>,
    pub email_address_id: Option<i64>,
    pub password_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Record for Credential {
    const TABLE: &'static str = "dossier_credentials";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_name_id",
        "email_address_id",
        "password_id",
        "created_at",
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_name_id: row.get("user_name_id")?,
            email_address_id: row.get("email_address_id")?,
            password_id: row.get("password_id")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

fn key_query(user_name_id: Option<i64>, email_address_id: Option<i64>, password_id: i64) -> Query<Credential> {
    Credential::query()
        .where_eq_nullable("user_name_id", opt_int(user_name_id))
        .where_eq_nullable("email_address_id", opt_int(email_address_id))
        .where_eq("password_id", password_id)
}

impl Importable for Credential {
    type Key = CredentialKey;

    fn lookup(db: &Database, key: &CredentialKey) -> Result<Option<Self>, DbError> {
        let Some(password) = Password::lookup(db, &key.password)? else {
            return Ok(None);
        };
        let (user_name_id, email_address_id) = if key.is_email() {
            match EmailAddress::lookup(db, &key.login)? {
                Some(email) => (None, Some(email.id)),
                None => return Ok(None),
            }
        } else {
            match UserName::lookup(db, &key.login)? {
                Some(user) => (Some(user.id), None),
                None => return Ok(None),
            }
        };
        key_query(user_name_id, email_address_id, password.id).first(db)
    }

    fn import(db: &Database, key: &CredentialKey) -> Result<Self, DbError> {
        key.validate()?;
        db.transaction(|db| {
            let password = Password::import(db, &key.password)?;
            if key.is_email() {
                let email = EmailAddress::import(db, &key.login)?;
                Self::from_parts(db, None, Some(&email), &password)
            } else {
                let user = UserName::import(db, &key.login)?;
                Self::from_parts(db, Some(&user), None, &password)
            }
        })
    }
}

impl Credential {
    /// Find or create the credential for existing rows. Exactly one of
    /// `user_name` and `email_address` must be given.
    pub fn from_parts(
        db: &Database,
        user_name: Option<&UserName>,
        email_address: Option<&EmailAddress>,
        password: &Password,
    ) -> Result<Self, DbError> {
        let mut errors = ValidationErrors::new();
        if user_name.is_some() == email_address.is_some() {
            errors.add("login", "must be exactly one of a user name or an email address");
        }
        validated(errors)?;

        let user_name_id = user_name.map(|u| u.id);
        let email_address_id = email_address.map(|e| e.id);
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("user_name_id", opt_int(user_name_id)),
                ("email_address_id", opt_int(email_address_id)),
                ("password_id", int(password.id)),
            ],
            key_query(user_name_id, email_address_id, password.id),
        )
    }

    pub fn user_name(&self, db: &Database) -> Result<Option<UserName>, DbError> {
        match self.user_name_id {
            Some(id) => UserName::find(db, id),
            None => Ok(None),
        }
    }

    pub fn email_address(&self, db: &Database) -> Result<Option<EmailAddress>, DbError> {
        match self.email_address_id {
            Some(id) => EmailAddress::find(db, id),
            None => Ok(None),
        }
    }

    pub fn password(&self, db: &Database) -> Result<Password, DbError> {
        Password::get(db, self.password_id)
    }

    /// The login and password this credential was imported from.
    pub fn key(&self, db: &Database) -> Result<CredentialKey, DbError> {
        let login = match (self.user_name(db)?, self.email_address(db)?) {
            (Some(user), _) => user.name,
            (None, Some(email)) => email.address_text(),
            (None, None) => return Err(DbError::not_found(UserName::TABLE, self.id)),
        };
        Ok(CredentialKey::new(login, self.password(db)?.plain_text))
    }

    pub fn open_ports(&self, db: &Database) -> Result<Vec<OpenPort>, DbError> {
        OpenPort::query()
            .filter(
                "dossier_open_ports.id IN (
                    SELECT open_port_id FROM dossier_service_credentials WHERE credential_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    pub fn urls(&self, db: &Database) -> Result<Vec<Url>, DbError> {
        Url::query()
            .filter(
                "dossier_urls.id IN (
                    SELECT url_id FROM dossier_web_credentials WHERE credential_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }

    /// Record that this credential was accepted by a network service.
    pub fn add_open_port(&self, db: &Database, open_port: &OpenPort) -> Result<ServiceCredential, DbError> {
        ServiceCredential::link(db, self.id, open_port.id)
    }

    /// Record that this credential was accepted by a web application.
    pub fn add_url(&self, db: &Database, url: &Url) -> Result<WebCredential, DbError> {
        WebCredential::link(db, self.id, url.id)
    }
}

impl OpenPort {
    pub fn credentials(&self, db: &Database) -> Result<Vec<Credential>, DbError> {
        Credential::query()
            .filter(
                "dossier_credentials.id IN (
                    SELECT credential_id FROM dossier_service_credentials WHERE open_port_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

impl Url {
    pub fn credentials(&self, db: &Database) -> Result<Vec<Credential>, DbError> {
        Credential::query()
            .filter(
                "dossier_credentials.id IN (
                    SELECT credential_id FROM dossier_web_credentials WHERE url_id = ?)",
                [int(self.id)],
            )
            .all(db)
    }
}

impl Query<Credential> {
    pub fn for_user(self, user: &str) -> Self {
        self.filter(
            "dossier_credentials.user_name_id IN (SELECT id FROM dossier_user_names WHERE name = ?)",
            [text(user.trim())],
        )
    }

    pub fn with_email_address(self, address: &str) -> Self {
        self.filter(
            "dossier_credentials.email_address_id IN (
                SELECT id FROM dossier_email_addresses WHERE address = ?)",
            [text(EmailAddress::canonicalize(address))],
        )
    }

    pub fn with_password(self, plain_text: &str) -> Self {
        self.filter(
            "dossier_credentials.password_id IN (SELECT id FROM dossier_passwords WHERE plain_text = ?)",
            [text(plain_text)],
        )
    }
}

link_record!(
    /// A credential accepted by the service on an open port.
    ServiceCredential,
    "dossier_service_credentials",
    credential_id,
    open_port_id
);

link_record!(
    /// A credential accepted by a web application at a URL.
    WebCredential,
    "dossier_web_credentials",
    credential_id,
    url_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_core::types::Protocol;

    #[test]
    fn test_key_parsing() {
        let key: CredentialKey = "admin:pa:ss".parse().unwrap();
        assert_eq!(key, CredentialKey::new("admin", "pa:ss"));
        assert!(!key.is_email());
        assert_eq!(key.to_string(), "admin:pa:ss");
        assert!(matches!(
            "no-separator".parse::<CredentialKey>(),
            Err(ParseError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_import_user_and_email_logins() {
        let db = Database::open_in_memory().unwrap();
        let user = Credential::import(&db, &"admin:hunter2".parse().unwrap()).unwrap();
        assert!(user.user_name_id.is_some());
        assert!(user.email_address_id.is_none());
        assert_eq!(
            Credential::import(&db, &CredentialKey::new("admin", "hunter2")).unwrap(),
            user
        );

        let email = Credential::import(&db, &CredentialKey::new("ops@example.com", "hunter2")).unwrap();
        assert!(email.email_address_id.is_some());
        assert_eq!(email.key(&db).unwrap().to_string(), "ops@example.com:hunter2");
        assert_eq!(user.key(&db).unwrap().to_string(), "admin:hunter2");

        assert_eq!(Credential::count(&db).unwrap(), 2);
        assert_eq!(Password::count(&db).unwrap(), 1);
        assert_eq!(
            Credential::lookup(&db, &CredentialKey::new("admin", "hunter2")).unwrap(),
            Some(user)
        );
        assert!(Credential::lookup(&db, &CredentialKey::new("admin", "other"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_exactly_one_login() {
        let db = Database::open_in_memory().unwrap();
        let password = Password::import(&db, "secret").unwrap();
        let err = Credential::from_parts(&db, None, None, &password).unwrap_err();
        assert!(err.validation_errors().unwrap().has("login"));

        let user = UserName::import(&db, "root").unwrap();
        let email = EmailAddress::import(&db, "root@example.com").unwrap();
        assert!(Credential::from_parts(&db, Some(&user), Some(&email), &password)
            .unwrap_err()
            .is_validation());

        let err = Credential::import(&db, &CredentialKey::new(" ", "x")).unwrap_err();
        assert!(err.validation_errors().unwrap().has("login"));
    }

    #[test]
    fn test_scopes_and_service_links() {
        let db = Database::open_in_memory().unwrap();
        let root = Credential::import(&db, &CredentialKey::new("root", "toor")).unwrap();
        Credential::import(&db, &CredentialKey::new("admin", "toor")).unwrap();
        Credential::import(&db, &CredentialKey::new("sam@example.com", "letmein")).unwrap();

        assert_eq!(Credential::query().with_password("toor").count(&db).unwrap(), 2);
        assert_eq!(Credential::query().for_user("root").all(&db).unwrap(), vec![root.clone()]);
        assert_eq!(
            Credential::query()
                .with_email_address("sam@EXAMPLE.com")
                .count(&db)
                .unwrap(),
            1
        );

        let ssh = OpenPort::open(&db, "10.0.0.1", Protocol::Tcp, 22).unwrap();
        let link = root.add_open_port(&db, &ssh).unwrap();
        assert_eq!(root.add_open_port(&db, &ssh).unwrap(), link);
        assert_eq!(ssh.credentials(&db).unwrap(), vec![root.clone()]);
        assert_eq!(root.open_ports(&db).unwrap(), vec![ssh.clone()]);

        ssh.destroy(&db).unwrap();
        assert_eq!(ServiceCredential::count(&db).unwrap(), 0);
        assert!(Credential::find(&db, root.id).unwrap().is_some());
    }
}
