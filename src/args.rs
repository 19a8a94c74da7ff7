// Keyword arguments of a chart call

use crate::data::{DataSource, PartitionedTable, Table, Value};
use crate::error::{ExpressError, Result};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// One keyword argument value.
///
/// Strings are column names wherever a column is expected (`x`, `color`,
/// `by`) and literals everywhere else (`color_discrete_sequence`, `title`).
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<ArgValue>),
    Map(IndexMap<String, ArgValue>),
    Table(DataSource),
}

impl ArgValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ArgValue>> {
        match self {
            ArgValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Column names referenced by this value: a single name or a list of names.
    pub fn columns(&self) -> Vec<String> {
        match self {
            ArgValue::Str(s) => vec![s.clone()],
            ArgValue::List(items) => items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Scalar cell value, used for style tokens and partition keys.
    pub fn to_value(&self) -> Value {
        match self {
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::Int(*n as i64)
            }
            ArgValue::Number(n) => Value::float(*n),
            ArgValue::Str(s) => Value::Str(s.clone()),
            _ => Value::Null,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ArgValue::Null | ArgValue::Table(_) => JsonValue::Null,
            ArgValue::Bool(b) => JsonValue::Bool(*b),
            ArgValue::Number(_) => self.to_value().to_json(),
            ArgValue::Str(s) => JsonValue::String(s.clone()),
            ArgValue::List(items) => JsonValue::Array(items.iter().map(|i| i.to_json()).collect()),
            ArgValue::Map(m) => JsonValue::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        ArgValue::Number(n)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Number(n as f64)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(items: Vec<&str>) -> Self {
        ArgValue::List(items.into_iter().map(ArgValue::from).collect())
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(items: Vec<String>) -> Self {
        ArgValue::List(items.into_iter().map(ArgValue::from).collect())
    }
}

impl From<Vec<f64>> for ArgValue {
    fn from(items: Vec<f64>) -> Self {
        ArgValue::List(items.into_iter().map(ArgValue::from).collect())
    }
}

impl From<Vec<(&str, &str)>> for ArgValue {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        ArgValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), ArgValue::from(v)))
                .collect(),
        )
    }
}

impl From<Table> for ArgValue {
    fn from(t: Table) -> Self {
        ArgValue::Table(DataSource::Table(t))
    }
}

impl From<PartitionedTable> for ArgValue {
    fn from(p: PartitionedTable) -> Self {
        ArgValue::Table(DataSource::Partitioned(p))
    }
}

impl From<DataSource> for ArgValue {
    fn from(d: DataSource) -> Self {
        ArgValue::Table(d)
    }
}

/// Ordered keyword mapping passed to a chart function.
///
/// `Null` values count as absent, matching a keyword left at its default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallArgs {
    values: IndexMap<String, ArgValue>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<ArgValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<ArgValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ArgValue> {
        self.values.shift_remove(key).filter(|v| !v.is_null())
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn columns(&self, key: &str) -> Vec<String> {
        self.get(key).map(|v| v.columns()).unwrap_or_default()
    }

    /// A list of literal strings, accepting a bare string as a one-element list.
    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| v.columns())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrite with `overrides`; a `Null` override unsets the key.
    pub fn apply(&mut self, overrides: &CallArgs) {
        for (k, v) in &overrides.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// Fill every key the caller left unset.
    pub fn with_defaults(mut self, defaults: &CallArgs) -> Self {
        for (k, v) in defaults.iter() {
            if !self.contains(k) {
                self.set(k, v.clone());
            }
        }
        self
    }

    /// The data handle of the call.
    pub fn table(&self) -> Result<&DataSource> {
        match self.get("table") {
            Some(ArgValue::Table(source)) => Ok(source),
            _ => Err(ExpressError::InvalidTable),
        }
    }
}
