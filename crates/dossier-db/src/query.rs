//! Lazily composed, chainable queries over one record type.
//!
//! A [`Query`] is only a description (joins, conditions, ordering, paging);
//! nothing touches the database until one of the execution methods runs.
//! Scopes are plain methods on `Query<Model>` that return `Self`, so they
//! chain: `IpAddress::query().v4().with_host_name("www.example.com")`.

use std::marker::PhantomData;

use rusqlite::types::Value;

use crate::client::Database;
use crate::error::DbError;
use crate::record::Record;

pub struct Query<R> {
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Vec<Value>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            joins: self.joins.clone(),
            conditions: self.conditions.clone(),
            params: self.params.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
            _record: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("joins", &self.joins)
            .field("conditions", &self.conditions)
            .field("params", &self.params)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<R: Record> Default for Query<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Query<R> {
    pub fn new() -> Self {
        Self {
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            _record: PhantomData,
        }
    }

    /// Add a `WHERE` condition with `?` placeholders bound to `params` in
    /// order. Conditions are ANDed together.
    pub fn filter(
        mut self,
        condition: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.conditions.push(format!("({})", condition.into()));
        self.params.extend(params);
        self
    }

    /// Add a join clause (`JOIN other ON …`). Identical clauses are only
    /// added once.
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        if !self.joins.contains(&clause) {
            self.joins.push(clause);
        }
        self
    }

    /// Append an ordering term, e.g. `"dossier_ports.number DESC"`.
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order.push(term.into());
        self
    }

    /// Order by creation time, newest first, highest id winning ties.
    pub fn newest_first(self) -> Self {
        self.order_by(format!("{}.created_at DESC", R::TABLE))
            .order_by(format!("{}.id DESC", R::TABLE))
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restrict to rows whose `column` equals `value`.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        let condition = format!("{}.{column} = ?", R::TABLE);
        self.filter(condition, [value.into()])
    }

    /// Restrict to rows whose `column` equals `value`, treating NULL as a
    /// value of its own.
    pub fn where_eq_nullable(self, column: &str, value: impl Into<Value>) -> Self {
        let condition = format!("{}.{column} IS ?", R::TABLE);
        self.filter(condition, [value.into()])
    }

    pub fn where_null(self, column: &str) -> Self {
        let condition = format!("{}.{column} IS NULL", R::TABLE);
        self.filter(condition, [])
    }

    pub fn where_not_null(self, column: &str) -> Self {
        let condition = format!("{}.{column} IS NOT NULL", R::TABLE);
        self.filter(condition, [])
    }

    /// Restrict to rows with the given primary key.
    pub fn with_id(self, id: R::Id) -> Self {
        self.where_eq("id", id)
    }

    fn from_clause(&self) -> String {
        let mut sql = format!(" FROM {}", R::TABLE);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }

    /// The `SELECT` statement this query runs.
    pub fn to_sql(&self) -> String {
        let columns = R::COLUMNS
            .iter()
            .map(|c| format!("{table}.{c} AS {c}", table = R::TABLE))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT DISTINCT {columns}{}", self.from_clause());
        sql.push_str(" ORDER BY ");
        if self.order.is_empty() {
            sql.push_str(&format!("{}.id", R::TABLE));
        } else {
            sql.push_str(&self.order.join(", "));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn all(&self, db: &Database) -> Result<Vec<R>, DbError> {
        db.query_rows(&self.to_sql(), &self.params, |row| R::from_row(row))
    }

    pub fn first(&self, db: &Database) -> Result<Option<R>, DbError> {
        let query = self.clone().limit(1);
        db.query_one(&query.to_sql(), &query.params, |row| R::from_row(row))
    }

    pub fn count(&self, db: &Database) -> Result<u64, DbError> {
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT DISTINCT {}.id{})",
            R::TABLE,
            self.from_clause()
        );
        let count: Option<i64> = db.query_one(&sql, &self.params, |row| row.get(0))?;
        Ok(count.unwrap_or(0) as u64)
    }

    pub fn exists(&self, db: &Database) -> Result<bool, DbError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1{})",
            self.from_clause()
        );
        let exists: Option<bool> = db.query_one(&sql, &self.params, |row| row.get(0))?;
        Ok(exists.unwrap_or(false))
    }

    /// Delete every matching row, applying each table's foreign-key rules.
    pub fn delete_all(&self, db: &Database) -> Result<usize, DbError> {
        let sql = format!(
            "DELETE FROM {table} WHERE id IN (SELECT {table}.id{from})",
            table = R::TABLE,
            from = self.from_clause()
        );
        db.transaction(|db| db.execute(&sql, &self.params))
    }
}

/// Escape `%`, `_` and `\` for use in a `LIKE … ESCAPE '\'` pattern.
pub fn like_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Shorthand for a text parameter.
pub fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

/// Shorthand for an integer parameter.
pub fn int(value: impl Into<i64>) -> Value {
    Value::Integer(value.into())
}
