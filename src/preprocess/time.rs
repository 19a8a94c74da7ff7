// Timeline durations

use super::PreprocessedGroup;
use crate::args::CallArgs;
use crate::data::{DataSource, Table, Value};
use crate::error::{ExpressError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Interpret a cell as milliseconds since the epoch.
///
/// Numbers are taken as epoch millis; strings may be RFC 3339 timestamps,
/// `%Y-%m-%d %H:%M:%S` datetimes (UTC) or plain dates.
pub fn epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => Some(f.into_inner() as i64),
        Value::Str(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.and_utc().timestamp_millis());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

/// Adds the duration column a timeline bar is drawn with.
#[derive(Debug)]
pub struct TimePreprocesser {
    x_start: String,
    x_end: String,
    diff_name: String,
}

impl TimePreprocesser {
    pub fn new(args: &CallArgs, data: &DataSource) -> Result<Self> {
        let x_start = args
            .str("x_start")
            .ok_or_else(|| ExpressError::config("timeline needs an x_start column"))?;
        let x_end = args
            .str("x_end")
            .ok_or_else(|| ExpressError::config("timeline needs an x_end column"))?;
        let diff_name = data
            .schema()
            .map(|t| t.unique_names(&["x_diff"])["x_diff"].clone())
            .unwrap_or_else(|| "x_diff".to_string());
        Ok(Self {
            x_start: x_start.to_string(),
            x_end: x_end.to_string(),
            diff_name,
        })
    }

    pub fn preprocess(&self, table: Table) -> Result<PreprocessedGroup> {
        // resolve both columns up front so a typo fails loudly
        table.column(&self.x_start)?;
        table.column(&self.x_end)?;
        let (start, end) = (self.x_start.as_str(), self.x_end.as_str());
        let table = table.with_derived(&self.diff_name, |row| {
            let start = row.get(start).and_then(epoch_millis);
            let end = row.get(end).and_then(epoch_millis);
            match (start, end) {
                (Some(s), Some(e)) => e.checked_sub(s).map(Value::Int).unwrap_or(Value::Null),
                _ => Value::Null,
            }
        })?;
        Ok(PreprocessedGroup {
            table,
            remap: CallArgs::new().with("x_diff", self.diff_name.as_str()),
        })
    }
}
