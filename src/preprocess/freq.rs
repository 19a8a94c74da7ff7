// Frequency counts for frequency_bar

use super::{univariate_axes, PreprocessedGroup};
use crate::args::CallArgs;
use crate::data::{DataSource, Table};
use crate::error::{ExpressError, Result};

/// Counts rows per distinct value of the single data column.
#[derive(Debug)]
pub struct FreqPreprocesser {
    var: &'static str,
    other_var: &'static str,
    column: String,
    count_name: String,
}

impl FreqPreprocesser {
    pub fn new(args: &CallArgs, data: &DataSource) -> Result<Self> {
        if args.contains("x") && args.contains("y") {
            return Err(ExpressError::config(
                "frequency_bar takes a column in x or in y, not both",
            ));
        }
        let (var, other_var) = univariate_axes(args);
        let column = args
            .str(var)
            .ok_or_else(|| ExpressError::config("frequency_bar needs a column in x or y"))?
            .to_string();
        let count_name = data
            .schema()
            .map(|t| t.unique_names(&["count"])["count"].clone())
            .unwrap_or_else(|| "count".to_string());
        Ok(Self {
            var,
            other_var,
            column,
            count_name,
        })
    }

    pub fn preprocess(&self, table: &Table) -> Result<PreprocessedGroup> {
        let counts = table.count_by(&self.count_name, &self.column)?;
        let mut remap = CallArgs::new()
            .with(self.var, self.column.as_str())
            .with(self.other_var, self.count_name.as_str());
        if self.var == "y" {
            remap.set("orientation", "h");
        }
        Ok(PreprocessedGroup {
            table: counts,
            remap,
        })
    }
}
