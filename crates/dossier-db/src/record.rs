//! The record traits every model implements, and the shared write helpers
//! behind them.
//!
//! - [`Record`]: table mapping plus `find`/`all`/`count`/`destroy`
//! - [`Importable`]: find-or-create by natural key
//! - [`HasUniqueName`]: records identified by a unique `name` column
//! - [`LastScannedAt`]: records that track when they were last scanned

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dossier_core::types::parse_variant;
use dossier_core::ValidationErrors;
use rusqlite::types::{Type, Value};
use rusqlite::Row;

use crate::client::{format_time, now, Database};
use crate::error::DbError;
use crate::query::{like_escape, text, Query};

/// A row type stored in one table.
pub trait Record: Sized {
    const TABLE: &'static str;

    /// Selected columns, in table order. Each must be readable by
    /// [`from_row`](Record::from_row) under its own name.
    const COLUMNS: &'static [&'static str];

    type Id: Clone + Display + Into<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn id(&self) -> Self::Id;

    /// A query over every row of this table.
    fn query() -> Query<Self> {
        Query::new()
    }

    fn find(db: &Database, id: Self::Id) -> Result<Option<Self>, DbError> {
        Self::query().with_id(id).first(db)
    }

    /// Like [`find`](Record::find), but absence is an error.
    fn get(db: &Database, id: Self::Id) -> Result<Self, DbError> {
        let shown = id.to_string();
        Self::find(db, id)?.ok_or_else(|| DbError::not_found(Self::TABLE, shown))
    }

    fn all(db: &Database) -> Result<Vec<Self>, DbError> {
        Self::query().all(db)
    }

    fn count(db: &Database) -> Result<u64, DbError> {
        Self::query().count(db)
    }

    /// Re-read this record from the database.
    fn reload(&self, db: &Database) -> Result<Self, DbError> {
        Self::get(db, self.id())
    }

    /// Delete this record. Dependent rows are destroyed or detached in the
    /// same transaction according to each foreign key's delete rule.
    fn destroy(&self, db: &Database) -> Result<(), DbError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", Self::TABLE);
        let id = self.id();
        db.transaction(|db| {
            let deleted = db.execute(&sql, &[id.clone().into()])?;
            if deleted == 0 {
                return Err(DbError::not_found(Self::TABLE, &id));
            }
            tracing::debug!(table = Self::TABLE, id = %id, "Destroyed record");
            Ok(())
        })
    }
}

/// Records with a natural key that can be looked up and found-or-created.
pub trait Importable: Record {
    type Key: ?Sized;

    /// The existing row for `key`, if any. Never errors on absence.
    fn lookup(db: &Database, key: &Self::Key) -> Result<Option<Self>, DbError>;

    /// The row for `key`, created if it does not exist. Importing the same
    /// key again returns the same row.
    fn import(db: &Database, key: &Self::Key) -> Result<Self, DbError>;
}

/// Records identified by a unique, non-blank `name` column.
pub trait HasUniqueName: Record<Id = i64> {
    fn name(&self) -> &str;
}

pub fn lookup_by_name<R: HasUniqueName>(db: &Database, name: &str) -> Result<Option<R>, DbError> {
    R::query().where_eq("name", text(name.trim())).first(db)
}

pub fn import_by_name<R: HasUniqueName>(db: &Database, name: &str) -> Result<R, DbError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::invalid("name", "must be present"));
    }
    find_or_create(
        db,
        R::TABLE,
        &[("name", text(name))],
        R::query().where_eq("name", text(name)),
    )
}

impl<R: HasUniqueName> Query<R> {
    pub fn named(self, name: &str) -> Self {
        self.where_eq("name", text(name))
    }

    /// Names containing `fragment`.
    pub fn name_like(self, fragment: &str) -> Self {
        let condition = format!("{}.name LIKE ? ESCAPE '\\'", R::TABLE);
        self.filter(condition, [text(format!("%{}%", like_escape(fragment)))])
    }
}

/// Records stamped with the last time a scan observed them.
pub trait LastScannedAt: Record<Id = i64> {
    fn last_scanned_at(&self) -> Option<DateTime<Utc>>;

    fn set_last_scanned_at(&mut self, at: DateTime<Utc>);

    /// Stamp the record as scanned now.
    fn touch_scanned(&mut self, db: &Database) -> Result<(), DbError> {
        let at = now();
        let sql = format!("UPDATE {} SET last_scanned_at = ? WHERE id = ?", Self::TABLE);
        let updated = db.execute(&sql, &[text(format_time(&at)), self.id().into()])?;
        if updated == 0 {
            return Err(DbError::not_found(Self::TABLE, self.id()));
        }
        self.set_last_scanned_at(at);
        Ok(())
    }
}

impl<R: LastScannedAt> Query<R> {
    pub fn scanned_since(self, since: DateTime<Utc>) -> Self {
        let condition = format!("{}.last_scanned_at >= ?", R::TABLE);
        self.filter(condition, [text(format_time(&since))])
    }

    pub fn scanned_before(self, before: DateTime<Utc>) -> Self {
        let condition = format!("{}.last_scanned_at < ?", R::TABLE);
        self.filter(condition, [text(format_time(&before))])
    }

    pub fn never_scanned(self) -> Self {
        self.where_null("last_scanned_at")
    }
}

// ── Write helpers ─────────────────────────────────────────────────

/// Insert a row with a fresh `created_at` and return its rowid.
pub(crate) fn insert(
    db: &Database,
    table: &'static str,
    values: &[(&str, Value)],
) -> Result<i64, DbError> {
    let sql = insert_sql(table, values, "");
    db.execute(&sql, &insert_params(values))?;
    let id = db.last_insert_rowid();
    tracing::debug!(table, id, "Created record");
    Ok(id)
}

/// Find-or-create: insert unless the natural key already exists, then read
/// the surviving row back through `existing`. Both steps share one
/// transaction and the uniqueness guard lives in the schema, so concurrent
/// importers converge on a single row.
pub(crate) fn find_or_create<R: Record>(
    db: &Database,
    table: &'static str,
    values: &[(&str, Value)],
    existing: Query<R>,
) -> Result<R, DbError> {
    let sql = insert_sql(table, values, " ON CONFLICT DO NOTHING");
    let params = insert_params(values);
    db.transaction(|db| {
        let inserted = db.execute(&sql, &params)?;
        let record = existing.first(db)?.ok_or_else(|| DbError::Conflict {
            message: format!("{table}: natural key did not resolve to a row after insert"),
        })?;
        if inserted > 0 {
            tracing::debug!(table, id = %record.id(), "Imported record");
        }
        Ok(record)
    })
}

fn insert_sql(table: &str, values: &[(&str, Value)], suffix: &str) -> String {
    let mut columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    columns.push("created_at");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}){suffix}",
        columns.join(", ")
    )
}

fn insert_params(values: &[(&str, Value)]) -> Vec<Value> {
    let mut params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
    params.push(text(format_time(&now())));
    params
}

/// Turn accumulated validation errors into a store error.
pub(crate) fn validated(errors: ValidationErrors) -> Result<(), DbError> {
    errors.into_result().map_err(DbError::from)
}

// ── Parameter helpers ─────────────────────────────────────────────

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

pub(crate) fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(crate) fn enum_text<E: AsRef<str>>(value: &E) -> Value {
    Value::Text(value.as_ref().to_string())
}

pub(crate) fn opt_enum_text<E: AsRef<str>>(value: Option<&E>) -> Value {
    value.map_or(Value::Null, enum_text)
}

// ── Row helpers ───────────────────────────────────────────────────

fn conversion_error(
    row: &Row<'_>,
    column: &str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_time(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(row, column, e))
}

pub(crate) fn get_opt_time(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_error(row, column, e))
    })
    .transpose()
}

pub(crate) fn get_enum<E: FromStr>(
    row: &Row<'_>,
    column: &str,
    kind: &'static str,
) -> rusqlite::Result<E> {
    let raw: String = row.get(column)?;
    parse_variant(kind, &raw).map_err(|e| conversion_error(row, column, e))
}

pub(crate) fn get_opt_enum<E: FromStr>(
    row: &Row<'_>,
    column: &str,
    kind: &'static str,
) -> rusqlite::Result<Option<E>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|raw| parse_variant(kind, &raw).map_err(|e| conversion_error(row, column, e)))
        .transpose()
}
