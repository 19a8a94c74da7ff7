// Empirical cumulative distribution per group

use super::{univariate_axes, PreprocessedGroup};
use crate::args::CallArgs;
use crate::data::{Column, DataSource, Table, Value};
use crate::error::{ExpressError, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdfNorm {
    Probability,
    Percent,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdfMode {
    /// Share of values `<= v`.
    Standard,
    /// Share of values `>= v`.
    Reversed,
    /// Share of values `> v`.
    Complementary,
}

/// Empirical cumulative distribution of one column.
#[derive(Debug)]
pub struct EcdfPreprocesser {
    var: &'static str,
    other_var: &'static str,
    column: String,
    norm: EcdfNorm,
    mode: EcdfMode,
    out_name: String,
}

fn by_number(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

impl EcdfPreprocesser {
    pub fn new(args: &CallArgs, data: &DataSource) -> Result<Self> {
        let (var, other_var) = univariate_axes(args);
        let column = args
            .str(var)
            .ok_or_else(|| ExpressError::config("ecdf needs a column in x or y"))?
            .to_string();

        let norm = match args.str("ecdfnorm").unwrap_or("probability") {
            "probability" => EcdfNorm::Probability,
            "percent" => EcdfNorm::Percent,
            "none" => EcdfNorm::Count,
            other => return Err(ExpressError::config(format!("unknown ecdfnorm '{}'", other))),
        };
        let mode = match args.str("ecdfmode").unwrap_or("standard") {
            "standard" => EcdfMode::Standard,
            "reversed" => EcdfMode::Reversed,
            "complementary" => EcdfMode::Complementary,
            other => return Err(ExpressError::config(format!("unknown ecdfmode '{}'", other))),
        };

        let base = match norm {
            EcdfNorm::Probability => "probability",
            EcdfNorm::Percent => "percent",
            EcdfNorm::Count => "count",
        };
        let out_name = data
            .schema()
            .map(|t| t.unique_names(&[base])[base].clone())
            .unwrap_or_else(|| base.to_string());

        Ok(Self {
            var,
            other_var,
            column,
            norm,
            mode,
            out_name,
        })
    }

    pub fn preprocess(&self, table: &Table) -> Result<PreprocessedGroup> {
        let mut counts: Vec<(Value, f64)> = Vec::new();
        let mut values: Vec<&Value> = table
            .column(&self.column)?
            .values
            .iter()
            .filter(|v| !v.is_null())
            .collect();
        values.sort_by(|a, b| by_number(a, b));
        for v in values {
            if let Some((last, n)) = counts.last_mut() {
                if by_number(last, v) == Ordering::Equal {
                    *n += 1.0;
                    continue;
                }
            }
            counts.push((v.clone(), 1.0));
        }

        let total: f64 = counts.iter().map(|(_, n)| n).sum();
        let scale = match self.norm {
            EcdfNorm::Probability if total > 0.0 => 1.0 / total,
            EcdfNorm::Percent if total > 0.0 => 100.0 / total,
            _ => 1.0,
        };

        let mut below = 0.0;
        let mut cumulative = Vec::with_capacity(counts.len());
        for (_, n) in &counts {
            let through = below + n;
            let share = match self.mode {
                EcdfMode::Standard => through,
                EcdfMode::Reversed => total - below,
                EcdfMode::Complementary => total - through,
            };
            cumulative.push(share * scale);
            below = through;
        }

        let table = Table::new(vec![
            Column::new(
                self.column.clone(),
                counts.into_iter().map(|(v, _)| v).collect(),
            ),
            Column::from_f64(self.out_name.clone(), cumulative),
        ])?;
        let remap = CallArgs::new()
            .with(self.var, self.column.as_str())
            .with(self.other_var, self.out_name.as_str());
        Ok(PreprocessedGroup { table, remap })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: CallArgs, values: Vec<f64>) -> Vec<Option<f64>> {
        let table = Table::new(vec![Column::from_f64("v", values)]).unwrap();
        let args = args.with("x", "v");
        let ecdf = EcdfPreprocesser::new(&args, &DataSource::Table(table.clone())).unwrap();
        let out = ecdf.preprocess(&table).unwrap();
        let name = out.remap.str("y").unwrap().to_string();
        out.table.f64_values(&name).unwrap()
    }

    #[test]
    fn test_standard_probability() {
        let out = run(CallArgs::new(), vec![3.0, 1.0, 2.0, 2.0]);
        assert_eq!(out, vec![Some(0.25), Some(0.75), Some(1.0)]);
    }

    #[test]
    fn test_reversed_and_complementary() {
        let values = vec![1.0, 2.0, 2.0, 3.0];
        let reversed = run(
            CallArgs::new().with("ecdfmode", "reversed").with("ecdfnorm", "none"),
            values.clone(),
        );
        assert_eq!(reversed, vec![Some(4.0), Some(3.0), Some(1.0)]);
        let complementary = run(
            CallArgs::new().with("ecdfmode", "complementary").with("ecdfnorm", "percent"),
            values,
        );
        assert_eq!(complementary, vec![Some(75.0), Some(25.0), Some(0.0)]);
    }

    #[test]
    fn test_unknown_mode() {
        let table = Table::new(vec![Column::from_f64("v", vec![1.0])]).unwrap();
        let args = CallArgs::new().with("x", "v").with("ecdfmode", "sideways");
        assert!(EcdfPreprocesser::new(&args, &DataSource::Table(table)).is_err());
    }
}
