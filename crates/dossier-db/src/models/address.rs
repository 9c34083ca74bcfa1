//! Field set shared by the address-keyed records (IP, MAC, and email
//! addresses): a non-blank, unique `address` column.

use dossier_core::validate::require_present;
use dossier_core::ValidationErrors;

use crate::client::Database;
use crate::error::DbError;
use crate::query::{text, Query};
use crate::record::Record;

pub trait AddressRecord: Record<Id = i64> {
    /// The canonical text stored in the `address` column.
    fn address_text(&self) -> String;

    /// Bring user input into the stored canonical form.
    fn canonicalize(address: &str) -> String {
        address.trim().to_string()
    }
}

/// Accumulate the shared presence rule.
pub(crate) fn validate_address(errors: &mut ValidationErrors, address: &str) {
    require_present(errors, "address", address);
}

/// The row whose address matches `address` after canonicalization.
pub fn lookup_by_address<R: AddressRecord>(
    db: &Database,
    address: &str,
) -> Result<Option<R>, DbError> {
    R::query().with_address(address).first(db)
}

impl<R: AddressRecord> Query<R> {
    pub fn with_address(self, address: &str) -> Self {
        self.where_eq("address", text(R::canonicalize(address)))
    }

    /// Addresses in the given set.
    pub fn with_any_address<'a>(self, addresses: impl IntoIterator<Item = &'a str>) -> Self {
        let values: Vec<_> = addresses
            .into_iter()
            .map(|a| text(R::canonicalize(a)))
            .collect();
        if values.is_empty() {
            return self.filter("0", []);
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let condition = format!("{}.address IN ({placeholders})", R::TABLE);
        self.filter(condition, values)
    }
}
