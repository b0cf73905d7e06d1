//! `WHERE` clause accumulator for list endpoints.
//!
//! Conditions are plain SQL fragments with `?` placeholders; the values are
//! collected alongside in the same order and bound when the query is built.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{Query, QueryAs, QueryScalar};

use super::like_pattern;

#[derive(Debug, Clone)]
enum Bind {
    Text(String),
    UInt(u64),
    Int(i64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Accumulated conditions and their bound values.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<String>,
    binds: Vec<Bind>,
}

macro_rules! bind_each {
    ($filter:expr, $query:expr) => {{
        let mut query = $query;
        for bind in &$filter.binds {
            query = match bind {
                Bind::Text(value) => query.bind(value.clone()),
                Bind::UInt(value) => query.bind(*value),
                Bind::Int(value) => query.bind(*value),
                Bind::Date(value) => query.bind(*value),
                Bind::DateTime(value) => query.bind(*value),
            };
        }
        query
    }};
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition without parameters.
    pub fn raw(&mut self, condition: impl Into<String>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    /// `column = ?` with a text value.
    pub fn eq_text(&mut self, column: &str, value: impl Into<String>) -> &mut Self {
        self.conditions.push(format!("{column} = ?"));
        self.binds.push(Bind::Text(value.into()));
        self
    }

    /// `column = ?` with an unsigned value.
    pub fn eq_uint(&mut self, column: &str, value: u64) -> &mut Self {
        self.conditions.push(format!("{column} = ?"));
        self.binds.push(Bind::UInt(value));
        self
    }

    /// `column = ?` with a signed value.
    pub fn eq_int(&mut self, column: &str, value: i64) -> &mut Self {
        self.conditions.push(format!("{column} = ?"));
        self.binds.push(Bind::Int(value));
        self
    }

    /// `column >= ?` on a date.
    pub fn date_from(&mut self, column: &str, value: NaiveDate) -> &mut Self {
        self.conditions.push(format!("{column} >= ?"));
        self.binds.push(Bind::Date(value));
        self
    }

    /// `column <= ?` on a date.
    pub fn date_to(&mut self, column: &str, value: NaiveDate) -> &mut Self {
        self.conditions.push(format!("{column} <= ?"));
        self.binds.push(Bind::Date(value));
        self
    }

    /// `column >= ?` on a timestamp.
    pub fn since(&mut self, column: &str, value: NaiveDateTime) -> &mut Self {
        self.conditions.push(format!("{column} >= ?"));
        self.binds.push(Bind::DateTime(value));
        self
    }

    /// `column <= ?` on a timestamp.
    pub fn until(&mut self, column: &str, value: NaiveDateTime) -> &mut Self {
        self.conditions.push(format!("{column} <= ?"));
        self.binds.push(Bind::DateTime(value));
        self
    }

    /// `(a LIKE ? OR b LIKE ? ...)` with the term escaped.
    pub fn search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let pattern = like_pattern(term);
        let parts: Vec<String> = columns.iter().map(|c| format!("{c} LIKE ?")).collect();
        self.conditions.push(format!("({})", parts.join(" OR ")));
        for _ in columns {
            self.binds.push(Bind::Text(pattern.clone()));
        }
        self
    }

    /// A condition with arbitrary placeholders, bound to text values in order.
    pub fn with_texts(&mut self, condition: impl Into<String>, values: &[&str]) -> &mut Self {
        self.conditions.push(condition.into());
        self.binds
            .extend(values.iter().map(|v| Bind::Text((*v).to_string())));
        self
    }

    /// A condition with one signed placeholder.
    pub fn with_int(&mut self, condition: impl Into<String>, value: i64) -> &mut Self {
        self.conditions.push(condition.into());
        self.binds.push(Bind::Int(value));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// ` WHERE a AND b`, or an empty string.
    #[must_use]
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// ` AND a AND b`, for queries that already have a `WHERE`.
    #[must_use]
    pub fn and_clause(&self) -> String {
        self.conditions
            .iter()
            .map(|c| format!(" AND {c}"))
            .collect()
    }

    pub fn bind<'q>(
        &self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        bind_each!(self, query)
    }

    pub fn bind_as<'q, O>(
        &self,
        query: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        bind_each!(self, query)
    }

    pub fn bind_scalar<'q, O>(
        &self,
        query: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        bind_each!(self, query)
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
#[must_use]
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }

    #[test]
    fn test_empty_filter_has_no_clause() {
        let filter = Filter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.where_clause(), "");
        assert_eq!(filter.and_clause(), "");
    }

    #[test]
    fn test_conditions_join_with_and() {
        let mut filter = Filter::new();
        filter
            .eq_text("role", "admin")
            .search(&["username", "email"], "ana");
        assert_eq!(
            filter.where_clause(),
            " WHERE role = ? AND (username LIKE ? OR email LIKE ?)"
        );
        assert_eq!(filter.binds.len(), 3);
    }
}
