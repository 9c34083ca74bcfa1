//! Generators for the two record shapes that repeat across the schema:
//! unique-name pools and timestamped link rows between two records.

/// A pool of unique, non-blank names (`id`, `name`, `created_at`).
macro_rules! name_pool {
    ($(#[$meta:meta])* $name:ident, $table:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub id: i64,
            pub name: String,
            pub created_at: chrono::DateTime<chrono::Utc>,
        }

        impl $crate::record::Record for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &["id", "name", "created_at"];
            type Id = i64;

            fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
                Ok(Self {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    created_at: $crate::record::get_time(row, "created_at")?,
                })
            }

            fn id(&self) -> i64 {
                self.id
            }
        }

        impl $crate::record::HasUniqueName for $name {
            fn name(&self) -> &str {
                &self.name
            }
        }

        impl $crate::record::Importable for $name {
            type Key = str;

            fn lookup(
                db: &$crate::client::Database,
                name: &str,
            ) -> Result<Option<Self>, $crate::error::DbError> {
                $crate::record::lookup_by_name(db, name)
            }

            fn import(
                db: &$crate::client::Database,
                name: &str,
            ) -> Result<Self, $crate::error::DbError> {
                $crate::record::import_by_name(db, name)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.name)
            }
        }
    };
}

/// A timestamped link between two records, unique per pair. Linking an
/// already linked pair returns the existing row.
///
/// The `typed` form adds an optional enum stored in a `type` column.
macro_rules! link_record {
    ($(#[$meta:meta])* $name:ident, $table:literal, $left:ident, $right:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub id: i64,
            pub $left: i64,
            pub $right: i64,
            pub created_at: chrono::DateTime<chrono::Utc>,
        }

        impl $crate::record::Record for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] =
                &["id", stringify!($left), stringify!($right), "created_at"];
            type Id = i64;

            fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
                Ok(Self {
                    id: row.get("id")?,
                    $left: row.get(stringify!($left))?,
                    $right: row.get(stringify!($right))?,
                    created_at: $crate::record::get_time(row, "created_at")?,
                })
            }

            fn id(&self) -> i64 {
                self.id
            }
        }

        impl $name {
            pub fn link(
                db: &$crate::client::Database,
                $left: i64,
                $right: i64,
            ) -> Result<Self, $crate::error::DbError> {
                use $crate::record::Record;
                $crate::record::find_or_create(
                    db,
                    $table,
                    &[
                        (stringify!($left), $left.into()),
                        (stringify!($right), $right.into()),
                    ],
                    Self::query()
                        .where_eq(stringify!($left), $left)
                        .where_eq(stringify!($right), $right),
                )
            }

            pub fn lookup_link(
                db: &$crate::client::Database,
                $left: i64,
                $right: i64,
            ) -> Result<Option<Self>, $crate::error::DbError> {
                use $crate::record::Record;
                Self::query()
                    .where_eq(stringify!($left), $left)
                    .where_eq(stringify!($right), $right)
                    .first(db)
            }
        }
    };

    ($(#[$meta:meta])* typed $kind:ty, $kind_name:literal, $name:ident, $table:literal, $left:ident, $right:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub id: i64,
            pub kind: Option<$kind>,
            pub $left: i64,
            pub $right: i64,
            pub created_at: chrono::DateTime<chrono::Utc>,
        }

        impl $crate::record::Record for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] =
                &["id", "type", stringify!($left), stringify!($right), "created_at"];
            type Id = i64;

            fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
                Ok(Self {
                    id: row.get("id")?,
                    kind: $crate::record::get_opt_enum(row, "type", $kind_name)?,
                    $left: row.get(stringify!($left))?,
                    $right: row.get(stringify!($right))?,
                    created_at: $crate::record::get_time(row, "created_at")?,
                })
            }

            fn id(&self) -> i64 {
                self.id
            }
        }

        impl $name {
            /// Link the pair. An existing link keeps its original type.
            pub fn link(
                db: &$crate::client::Database,
                $left: i64,
                $right: i64,
                kind: Option<$kind>,
            ) -> Result<Self, $crate::error::DbError> {
                use $crate::record::Record;
                $crate::record::find_or_create(
                    db,
                    $table,
                    &[
                        ("type", $crate::record::opt_enum_text(kind.as_ref())),
                        (stringify!($left), $left.into()),
                        (stringify!($right), $right.into()),
                    ],
                    Self::query()
                        .where_eq(stringify!($left), $left)
                        .where_eq(stringify!($right), $right),
                )
            }

            pub fn lookup_link(
                db: &$crate::client::Database,
                $left: i64,
                $right: i64,
            ) -> Result<Option<Self>, $crate::error::DbError> {
                use $crate::record::Record;
                Self::query()
                    .where_eq(stringify!($left), $left)
                    .where_eq(stringify!($right), $right)
                    .first(db)
            }
        }

        impl $crate::query::Query<$name> {
            pub fn of_type(self, kind: $kind) -> Self {
                self.where_eq("type", $crate::record::enum_text(&kind))
            }
        }
    };
}
