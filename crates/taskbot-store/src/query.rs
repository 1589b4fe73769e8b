//! Filtered reads and updates over a single collection.
//!
//! A `Query` renders to PostgREST query parameters for the REST backend and
//! is evaluated directly against JSON rows by the in-memory backend, so both
//! backends agree on what a filter means.

use std::cmp::Ordering;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn in_list<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    /// Top-level form: `(column, "eq.42")`.
    fn to_param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", literal(value, false))),
            Filter::In(column, values) => (column.clone(), format!("in.({})", list(values))),
            Filter::Or(filters) => ("or".to_string(), format!("({})", nested(filters))),
        }
    }

    /// Form used inside an `or=(...)` group: `column.eq.42`.
    fn to_nested(&self) -> String {
        match self {
            Filter::Eq(column, Value::Null) => format!("{}.is.null", column),
            Filter::Eq(column, value) => format!("{}.eq.{}", column, literal(value, true)),
            Filter::In(column, values) => format!("{}.in.({})", column, list(values)),
            Filter::Or(filters) => format!("or({})", nested(filters)),
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, expected) => {
                let actual = row.get(column).unwrap_or(&Value::Null);
                loosely_equal(actual, expected)
            }
            Filter::In(column, values) => {
                let actual = row.get(column).unwrap_or(&Value::Null);
                values.iter().any(|value| loosely_equal(actual, value))
            }
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(row)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: &'static str,
    filters: Vec<Filter>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
    columns: Option<Vec<String>>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            columns: None,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.table
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn in_list<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(Filter::in_list(column, values))
    }

    pub fn or(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push((column.to_string(), Direction::Asc));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push((column.to_string(), Direction::Desc));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// PostgREST query parameters for this query.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(columns) = &self.columns {
            params.push(("select".to_string(), columns.join(",")));
        }

        params.extend(self.filters.iter().map(Filter::to_param));

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, direction)| match direction {
                    Direction::Asc => format!("{}.asc", column),
                    Direction::Desc => format!("{}.desc", column),
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Apply ordering, limit and projection to rows that already matched.
    pub fn shape(&self, mut rows: Vec<Value>) -> Vec<Value> {
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|(column, direction)| {
                        let ordering = compare(
                            a.get(column).unwrap_or(&Value::Null),
                            b.get(column).unwrap_or(&Value::Null),
                        );
                        match direction {
                            Direction::Asc => ordering,
                            Direction::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        if let Some(columns) = &self.columns {
            for row in rows.iter_mut() {
                if let Value::Object(map) = row {
                    map.retain(|key, _| columns.iter().any(|column| column == key));
                }
            }
        }

        rows
    }
}

fn literal(value: &Value, nested: bool) -> String {
    match value {
        Value::String(text) if nested && needs_quoting(text) => {
            format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
        }
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty() || text.chars().any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | ' '))
}

fn list(values: &[Value]) -> String {
    values
        .iter()
        .map(|value| literal(value, true))
        .collect::<Vec<_>>()
        .join(",")
}

fn nested(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(Filter::to_nested)
        .collect::<Vec<_>>()
        .join(",")
}

/// Equality the way the store compares a column to a filter literal:
/// numbers by value, and a numeric string equal to the same number.
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        (a, b) => a == b,
    }
}

/// Nulls compare greater than any value, as in Postgres.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}
