// Table engine: typed cells, columns, partitioning

use crate::error::{ExpressError, Result};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;

/// A single table cell.
///
/// Floats are wrapped in `OrderedFloat` so that any cell can take part in a
/// group key (hashing and total ordering are required for partitioning).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

impl Value {
    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(f.into_inner()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            // NaN and infinities have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(f.into_inner())
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s.clone()),
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Str(_) => DataType::Str,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v.into_inner()),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::float).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Every cell is empty, the type is unknown.
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// Infer the narrowest type able to hold every non-empty cell.
    fn infer(cells: &[&str]) -> Self {
        let filled: Vec<&str> = cells.iter().copied().filter(|c| !c.is_empty()).collect();
        if filled.is_empty() {
            DataType::Null
        } else if filled.iter().all(|c| c.parse::<i64>().is_ok()) {
            DataType::Int
        } else if filled.iter().all(|c| c.parse::<f64>().is_ok()) {
            DataType::Float
        } else if filled
            .iter()
            .all(|c| c.eq_ignore_ascii_case("true") || c.eq_ignore_ascii_case("false"))
        {
            DataType::Bool
        } else {
            DataType::Str
        }
    }

    fn parse(self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match self {
            DataType::Null => Value::Null,
            DataType::Int => cell.parse().map(Value::Int).unwrap_or(Value::Null),
            DataType::Float => cell.parse::<f64>().map(Value::float).unwrap_or(Value::Null),
            DataType::Bool => Value::Bool(cell.eq_ignore_ascii_case("true")),
            DataType::Str => Value::Str(cell.to_string()),
        }
    }

    fn unify(self, other: DataType) -> DataType {
        match (self, other) {
            (a, b) if a == b => a,
            (DataType::Null, b) => b,
            (a, DataType::Null) => a,
            (DataType::Int, DataType::Float) | (DataType::Float, DataType::Int) => DataType::Float,
            _ => DataType::Str,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DataType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = values
            .iter()
            .fold(DataType::Null, |acc, v| acc.unify(v.data_type()));
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn from_f64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, values.into_iter().map(Value::float).collect())
    }

    pub fn from_strs(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(name, values.iter().map(|s| Value::from(*s)).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read-only view of one row, handed to derived-column expressions.
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table
            .columns
            .iter()
            .find(|c| c.name == column)
            .and_then(|c| c.values.get(self.index))
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// The tuple of partition-column values identifying one subgroup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GroupKey(pub Vec<Value>);

impl GroupKey {
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// In-memory columnar table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let rows = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
                return Err(ExpressError::Table(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    rows
                )));
            }
        }
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(ExpressError::Table(format!("duplicate column '{}'", col.name)));
            }
        }
        Ok(Self { columns })
    }

    /// Read a table from CSV with a header row, inferring column types.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (i, cell) in record.iter().enumerate().take(headers.len()) {
                raw[i].push(cell.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| {
                let refs: Vec<&str> = cells.iter().map(|s| s.as_str()).collect();
                let dtype = DataType::infer(&refs);
                Column {
                    name,
                    dtype,
                    values: refs.iter().map(|c| dtype.parse(c)).collect(),
                }
            })
            .collect();

        Self::new(columns)
    }

    /// Create a table from a JSON array of objects
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| ExpressError::Table("input data must be a JSON array of objects".into()))?;

        let first_obj = array
            .first()
            .and_then(|v| v.as_object())
            .ok_or_else(|| ExpressError::Table("input data must contain at least one object".into()))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();
        let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(array.len()); headers.len()];

        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| ExpressError::Table("items in array must be objects".into()))?;
            for (i, header) in headers.iter().enumerate() {
                let val = match obj.get(header) {
                    Some(JsonValue::String(s)) => Value::Str(s.clone()),
                    Some(JsonValue::Number(n)) => match n.as_i64() {
                        Some(i) => Value::Int(i),
                        None => n.as_f64().map(Value::float).unwrap_or(Value::Null),
                    },
                    Some(JsonValue::Bool(b)) => Value::Bool(*b),
                    Some(JsonValue::Null) | None => Value::Null,
                    _ => {
                        return Err(ExpressError::Table(format!(
                            "unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                cells[i].push(val);
            }
        }

        Self::new(
            headers
                .into_iter()
                .zip(cells)
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ExpressError::MissingColumn(name.to_string()))
    }

    pub fn numeric_columns(&self) -> HashSet<String> {
        self.columns
            .iter()
            .filter(|c| c.dtype.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Reserve column names that collide with nothing in this table.
    pub fn unique_names(&self, bases: &[&str]) -> IndexMap<String, String> {
        let mut taken: HashSet<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let mut names = IndexMap::new();
        for base in bases {
            let mut name = base.to_string();
            while taken.contains(&name) {
                name.push('_');
            }
            taken.insert(name.clone());
            names.insert(base.to_string(), name);
        }
        names
    }

    pub fn f64_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let col = self.column(name)?;
        if !col.dtype.is_numeric() && col.dtype != DataType::Null {
            return Err(ExpressError::NonNumericColumn(col.name.clone()));
        }
        Ok(col.values.iter().map(|v| v.as_f64()).collect())
    }

    /// Min and max across the non-null cells of several numeric columns.
    pub fn numeric_range(&self, names: &[String]) -> Result<Option<(f64, f64)>> {
        let mut range: Option<(f64, f64)> = None;
        for name in names {
            for v in self.f64_values(name)?.into_iter().flatten() {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        Ok(range)
    }

    pub fn with_column(mut self, column: Column) -> Result<Self> {
        if !self.columns.is_empty() && column.len() != self.num_rows() {
            return Err(ExpressError::Table(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.len(),
                self.num_rows()
            )));
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    pub fn with_literal(self, name: &str, value: Value) -> Result<Self> {
        let rows = self.num_rows();
        self.with_column(Column::new(name, vec![value; rows]))
    }

    /// Add (or replace) a column computed row by row.
    pub fn with_derived<F>(self, name: &str, f: F) -> Result<Self>
    where
        F: Fn(Row<'_>) -> Value,
    {
        let values = (0..self.num_rows())
            .map(|index| f(Row { table: &self, index }))
            .collect();
        self.with_column(Column::new(name, values))
    }

    /// Union tables sharing the same schema.
    pub fn concat(tables: Vec<Table>) -> Result<Table> {
        let mut iter = tables.into_iter();
        let Some(mut acc) = iter.next() else {
            return Ok(Table::default());
        };
        for table in iter {
            if acc.column_names() != table.column_names() {
                return Err(ExpressError::Table(
                    "cannot merge tables with different columns".into(),
                ));
            }
            for (dst, src) in acc.columns.iter_mut().zip(table.columns) {
                dst.dtype = dst.dtype.unify(src.dtype);
                dst.values.extend(src.values);
            }
        }
        Ok(acc)
    }

    pub fn drop_columns(mut self, names: &[String]) -> Self {
        self.columns.retain(|c| !names.contains(&c.name));
        self
    }

    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| self.column(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        Table::new(columns)
    }

    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    dtype: c.dtype,
                    values: indices.iter().map(|&i| c.values[i].clone()).collect(),
                })
                .collect(),
        }
    }

    fn row_key(&self, cols: &[&Column], row: usize) -> GroupKey {
        GroupKey(cols.iter().map(|c| c.values[row].clone()).collect())
    }

    fn key_indices(&self, by: &[String]) -> Result<IndexMap<GroupKey, Vec<usize>>> {
        let cols = by
            .iter()
            .map(|b| self.column(b))
            .collect::<Result<Vec<_>>>()?;
        let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
        for row in 0..self.num_rows() {
            groups.entry(self.row_key(&cols, row)).or_default().push(row);
        }
        Ok(groups)
    }

    /// Distinct key tuples of the given columns, in order of first appearance.
    pub fn distinct(&self, by: &[String]) -> Result<Vec<GroupKey>> {
        Ok(self.key_indices(by)?.into_keys().collect())
    }

    /// Split into one constituent per distinct key, in order of first appearance.
    pub fn partition_by(&self, by: &[String]) -> Result<PartitionedTable> {
        let constituents = self
            .key_indices(by)?
            .into_iter()
            .map(|(key, rows)| Constituent {
                key,
                table: self.take_rows(&rows),
            })
            .collect();
        Ok(PartitionedTable {
            key_columns: by.to_vec(),
            constituents,
        })
    }

    /// Count rows per distinct value of `by`.
    pub fn count_by(&self, count_name: &str, by: &str) -> Result<Table> {
        let by_col = self.column(by)?;
        let mut counts: IndexMap<&Value, i64> = IndexMap::new();
        for v in &by_col.values {
            *counts.entry(v).or_default() += 1;
        }
        let (keys, totals): (Vec<Value>, Vec<Value>) = counts
            .into_iter()
            .map(|(k, n)| (k.clone(), Value::Int(n)))
            .unzip();
        Table::new(vec![
            Column::new(by_col.name.clone(), keys),
            Column::new(count_name, totals),
        ])
    }

    pub fn json_values(&self, name: &str) -> Result<Vec<JsonValue>> {
        Ok(self.column(name)?.values.iter().map(|v| v.to_json()).collect())
    }
}

/// A table already split by key columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionedTable {
    pub key_columns: Vec<String>,
    pub constituents: Vec<Constituent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constituent {
    pub key: GroupKey,
    pub table: Table,
}

impl PartitionedTable {
    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    pub fn merged(&self) -> Result<Table> {
        Table::concat(self.constituents.iter().map(|c| c.table.clone()).collect())
    }
}

/// Anything a chart call accepts as its data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Table(Table),
    Partitioned(PartitionedTable),
}

impl DataSource {
    /// A table carrying the schema, used for type introspection.
    pub fn schema(&self) -> Option<&Table> {
        match self {
            DataSource::Table(t) => Some(t),
            DataSource::Partitioned(p) => p.constituents.first().map(|c| &c.table),
        }
    }

    pub fn numeric_columns(&self) -> HashSet<String> {
        self.schema().map(|t| t.numeric_columns()).unwrap_or_default()
    }

    pub fn flatten(&self) -> Result<Table> {
        match self {
            DataSource::Table(t) => Ok(t.clone()),
            DataSource::Partitioned(p) => p.merged(),
        }
    }
}

impl From<Table> for DataSource {
    fn from(t: Table) -> Self {
        DataSource::Table(t)
    }
}

impl From<PartitionedTable> for DataSource {
    fn from(p: PartitionedTable) -> Self {
        DataSource::Partitioned(p)
    }
}
