use chrono::{DateTime, Utc};
use dossier_core::types::Endian;
use dossier_core::{ParseError, ValidationErrors};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::client::Database;
use crate::error::DbError;
use crate::query::{int, text, Query};
use crate::record::{
    enum_text, find_or_create, get_enum, get_time, insert, validated, HasUniqueName, Importable,
    Record,
};

/// Name, byte order, and word size in bytes of every builtin architecture.
pub const BUILTIN_ARCHES: &[(&str, Endian, u8)] = &[
    ("x86", Endian::Little, 4),
    ("x86_64", Endian::Little, 8),
    ("ia64", Endian::Little, 8),
    ("ppc", Endian::Big, 4),
    ("ppc64", Endian::Big, 8),
    ("arm", Endian::Little, 4),
    ("arm_be", Endian::Big, 4),
    ("arm64", Endian::Little, 8),
    ("arm64_be", Endian::Big, 8),
    ("mips", Endian::Big, 4),
    ("mips_le", Endian::Little, 4),
    ("mips64", Endian::Big, 8),
    ("mips64_le", Endian::Little, 8),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arch {
    pub id: i64,
    pub name: String,
    pub endian: Endian,
    pub word_size: u8,
    pub created_at: DateTime<Utc>,
}

impl Record for Arch {
    const TABLE: &'static str = "dossier_arches";
    const COLUMNS: &'static [&'static str] = &["id", "name", "endian", "word_size", "created_at"];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            endian: get_enum(row, "endian", "endian")?,
            word_size: row.get("word_size")?,
            created_at: get_time(row, "created_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl HasUniqueName for Arch {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Imports resolve only builtin names; see [`Arch::create`] for others.
impl Importable for Arch {
    type Key = str;

    fn lookup(db: &Database, name: &str) -> Result<Option<Self>, DbError> {
        Self::query().named(name.trim()).first(db)
    }

    fn import(db: &Database, name: &str) -> Result<Self, DbError> {
        let name = name.trim();
        let (name, endian, word_size) = BUILTIN_ARCHES
            .iter()
            .find(|(builtin, _, _)| *builtin == name)
            .copied()
            .ok_or_else(|| ParseError::UnknownArch(name.to_string()))?;
        find_or_create(
            db,
            Self::TABLE,
            &[
                ("name", text(name)),
                ("endian", enum_text(&endian)),
                ("word_size", int(word_size)),
            ],
            Self::query().named(name),
        )
    }
}

impl Arch {
    /// Define a non-builtin architecture. The name must be unused.
    pub fn create(
        db: &Database,
        name: &str,
        endian: Endian,
        word_size: u8,
    ) -> Result<Self, DbError> {
        let name = name.trim();
        let mut errors = ValidationErrors::new();
        if name.is_empty() {
            errors.add("name", "must be present");
        }
        if !matches!(word_size, 4 | 8) {
            errors.add("word_size", "must be 4 or 8");
        }
        validated(errors)?;

        db.transaction(|db| {
            let id = insert(
                db,
                Self::TABLE,
                &[
                    ("name", text(name)),
                    ("endian", enum_text(&endian)),
                    ("word_size", int(word_size)),
                ],
            )?;
            Self::get(db, id)
        })
    }

    pub fn is_builtin(&self) -> bool {
        BUILTIN_ARCHES.iter().any(|(name, _, _)| *name == self.name)
    }

    /// Word size in bits.
    pub fn bits(&self) -> u32 {
        u32::from(self.word_size) * 8
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Query<Arch> {
    pub fn with_endian(self, endian: Endian) -> Self {
        self.where_eq("endian", enum_text(&endian))
    }

    pub fn with_word_size(self, word_size: u8) -> Self {
        self.where_eq("word_size", int(word_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_import() {
        let db = Database::open_in_memory().unwrap();
        let arch = Arch::import(&db, "x86_64").unwrap();
        assert_eq!(arch.endian, Endian::Little);
        assert_eq!(arch.bits(), 64);
        assert!(arch.is_builtin());
        assert_eq!(Arch::import(&db, "x86_64").unwrap(), arch);

        let be = Arch::import(&db, "mips64").unwrap();
        assert_eq!((be.endian, be.word_size), (Endian::Big, 8));
    }

    #[test]
    fn test_unknown_builtin_is_malformed() {
        let db = Database::open_in_memory().unwrap();
        let err = Arch::import(&db, "vax").unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(Arch::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_custom_arch() {
        let db = Database::open_in_memory().unwrap();
        let riscv = Arch::create(&db, "riscv64", Endian::Little, 8).unwrap();
        assert!(!riscv.is_builtin());
        assert_eq!(Arch::lookup(&db, "riscv64").unwrap(), Some(riscv));
        assert!(Arch::create(&db, "riscv64", Endian::Little, 8)
            .unwrap_err()
            .is_conflict());
        assert!(Arch::create(&db, "pdp", Endian::Little, 2)
            .unwrap_err()
            .validation_errors()
            .unwrap()
            .has("word_size"));

        Arch::import(&db, "ppc").unwrap();
        assert_eq!(Arch::query().with_endian(Endian::Big).count(&db).unwrap(), 1);
        assert_eq!(Arch::query().with_word_size(8).count(&db).unwrap(), 1);
    }
}
