//! Raw SQL templates with `{ name }` placeholders, and shaping of JSON rows into records.
//!
//! Execution is left to whatever driver the application uses; this module only produces
//! statement text or a parameterized statement and decodes the rows it gets back.

use crate::error::{BootError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Target placeholder syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dialect {
    Sqlite,
    Mysql,
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Kind named by the leading keyword, if any.
    pub fn detect(sql: &str) -> Option<Self> {
        let keyword = sql.split_whitespace().next()?;
        StatementKind::from_str(keyword).ok()
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A statement with `{ name }` or `{ obj.field }` placeholders.
///
/// ```
/// use axum_boot::sql::{Dialect, SqlTemplate};
/// use serde_json::json;
///
/// let sql = SqlTemplate::parse("select * from {table} where id = {dto.id}")
///     .unwrap()
///     .fill(false, [("table", "user")])
///     .unwrap();
/// let values = json!({"dto": {"id": 7}});
/// let bound = sql.bind(Dialect::Postgres, values.as_object().unwrap()).unwrap();
/// assert_eq!(bound.sql, "select * from user where id = $1");
/// assert_eq!(bound.params, vec![json!(7)]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SqlTemplate {
    segments: Vec<Segment>,
}

/// Statement text with driver placeholders and the values to bind, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<Value>,
    pub kind: Option<StatementKind>,
}

impl SqlTemplate {
    pub fn parse(sql: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = sql;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| BootError::Sql(format!("unclosed placeholder in: {sql}")))?;
            let name = after[..close].trim();
            if name.is_empty() {
                return Err(BootError::Sql(format!("empty placeholder in: {sql}")));
            }
            segments.push(Segment::Placeholder(name.to_string()));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Self { segments })
    }

    /// Inlines the given values. With `with_repr` strings are quoted so `'1'` stays a
    /// string; without it they are inserted verbatim, which suits table names.
    /// Placeholders without a value are kept.
    pub fn fill<I, K, V>(self, with_repr: bool, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        let mut map = Map::new();
        for (key, value) in values {
            let value = serde_json::to_value(value).map_err(|e| BootError::Sql(e.to_string()))?;
            map.insert(key.into(), value);
        }
        Ok(self.fill_map(with_repr, &map))
    }

    pub fn fill_with_repr<I, K, V>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        self.fill(true, values)
    }

    pub fn fill_map(self, with_repr: bool, values: &Map<String, Value>) -> Self {
        let segments = self
            .segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Placeholder(name) => match lookup(values, &name) {
                    Some(value) => Segment::Text(literal(value, with_repr)),
                    None => Segment::Placeholder(name),
                },
                text => text,
            })
            .collect();
        Self { segments }
    }

    /// Names of the placeholders still open, in order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Final text; fails while a placeholder is still open.
    pub fn render(&self) -> Result<String> {
        let mut sql = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Placeholder(name) => {
                    return Err(BootError::Sql(format!("no value for placeholder '{name}'")));
                }
            }
        }
        Ok(sql)
    }

    /// Replaces every open placeholder with a driver placeholder bound to its value.
    pub fn bind(&self, dialect: Dialect, values: &Map<String, Value>) -> Result<BoundStatement> {
        let mut sql = String::new();
        let mut params = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Placeholder(name) => {
                    let value = lookup(values, name).ok_or_else(|| {
                        BootError::Sql(format!("no value for placeholder '{name}'"))
                    })?;
                    params.push(value.clone());
                    sql.push_str(&dialect.placeholder(params.len()));
                }
            }
        }
        let kind = StatementKind::detect(&sql);
        Ok(BoundStatement { sql, params, kind })
    }
}

fn lookup<'a>(values: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = values.get(parts.next()?)?;
    parts.try_fold(first, |value, key| value.get(key))
}

fn literal(value: &Value, with_repr: bool) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if with_repr => quote(s),
        Value::String(s) => s.clone(),
        other if with_repr => quote(&other.to_string()),
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if c == '\'' {
            quoted.push('\'');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Decodes JSON stored as text, recursively, as JSON columns come back from drivers.
pub fn decode_row(row: Value) -> Value {
    match row {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, decode_item(value)))
                .collect(),
        ),
        other => other,
    }
}

fn decode_item(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(object @ Value::Object(_)) => decode_row(object),
        Ok(Value::Array(items)) => Value::Array(items.into_iter().map(decode_item).collect()),
        _ => Value::String(text),
    }
}

/// First row as `T`; more than one row is reported and ignored.
pub fn one<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>> {
    if rows.len() > 1 {
        tracing::warn!(
            rows = rows.len(),
            expected = std::any::type_name::<T>(),
            "query returned more than one row, using the first"
        );
    }
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(decode_row(row)).map_err(row_error::<T>))
        .transpose()
}

pub fn all<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(decode_row(row)).map_err(row_error::<T>))
        .collect()
}

fn row_error<T>(error: serde_json::Error) -> BootError {
    BootError::Sql(format!("row does not match {}: {error}", std::any::type_name::<T>()))
}
