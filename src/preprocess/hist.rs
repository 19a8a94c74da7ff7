// Histogram binning shared across every group of a chart

use super::{univariate_axes, PreprocessedGroup};
use crate::args::{ArgValue, CallArgs};
use crate::data::{Column, DataSource, Table, Value};
use crate::error::{ExpressError, Result};
use ordered_float::OrderedFloat;
use std::collections::HashSet;

/// Aggregation applied to the values falling into a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistFunc {
    Avg,
    Count,
    CountDistinct,
    Max,
    Median,
    Min,
    Std,
    Sum,
    Var,
}

impl HistFunc {
    pub fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "avg" => HistFunc::Avg,
            "count" => HistFunc::Count,
            "count_distinct" => HistFunc::CountDistinct,
            "max" => HistFunc::Max,
            "median" => HistFunc::Median,
            "min" => HistFunc::Min,
            "std" => HistFunc::Std,
            "sum" => HistFunc::Sum,
            "var" => HistFunc::Var,
            other => {
                return Err(ExpressError::config(format!("unknown histfunc '{}'", other)))
            }
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            HistFunc::Avg => "avg",
            HistFunc::Count => "count",
            HistFunc::CountDistinct => "count_distinct",
            HistFunc::Max => "max",
            HistFunc::Median => "median",
            HistFunc::Min => "min",
            HistFunc::Std => "std",
            HistFunc::Sum => "sum",
            HistFunc::Var => "var",
        }
    }

    /// Aggregate one bin. Counting functions report 0 for an empty bin, the
    /// others have no value.
    pub fn aggregate(self, values: &[f64]) -> Option<f64> {
        let n = values.len() as f64;
        match self {
            HistFunc::Count => Some(n),
            HistFunc::CountDistinct => Some(
                values
                    .iter()
                    .map(|v| OrderedFloat(*v))
                    .collect::<HashSet<_>>()
                    .len() as f64,
            ),
            _ if values.is_empty() => None,
            HistFunc::Sum => Some(values.iter().sum()),
            HistFunc::Avg => Some(values.iter().sum::<f64>() / n),
            HistFunc::Min => values.iter().copied().reduce(f64::min),
            HistFunc::Max => values.iter().copied().reduce(f64::max),
            HistFunc::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            HistFunc::Var | HistFunc::Std => {
                if values.len() < 2 {
                    return None;
                }
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                Some(if self == HistFunc::Std { var.sqrt() } else { var })
            }
        }
    }
}

/// Equal-width bins over a closed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinEdges {
    pub start: f64,
    pub end: f64,
    pub nbins: usize,
}

impl BinEdges {
    pub fn new(start: f64, end: f64, nbins: usize) -> Result<Self> {
        if nbins == 0 {
            return Err(ExpressError::config("nbins must be at least 1"));
        }
        if !(start.is_finite() && end.is_finite()) || end < start {
            return Err(ExpressError::config(format!(
                "invalid bin range [{}, {}]",
                start, end
            )));
        }
        // a degenerate range still gets a unit-wide span
        let end = if end == start { start + 1.0 } else { end };
        Ok(Self { start, end, nbins })
    }

    pub fn width(&self) -> f64 {
        (self.end - self.start) / self.nbins as f64
    }

    /// Bin index of a value; the range maximum belongs to the last bin and
    /// values outside the range have none.
    pub fn index(&self, v: f64) -> Option<usize> {
        if v.is_nan() || v < self.start || v > self.end {
            return None;
        }
        let i = ((v - self.start) / self.width()).floor() as usize;
        Some(i.min(self.nbins - 1))
    }

    pub fn bin_min(&self, i: usize) -> f64 {
        self.start + i as f64 * self.width()
    }

    pub fn bin_max(&self, i: usize) -> f64 {
        self.start + (i + 1) as f64 * self.width()
    }

    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.bin_min(i) + self.bin_max(i))
    }

    pub fn edges(&self) -> Vec<f64> {
        (0..=self.nbins).map(|i| self.bin_min(i)).collect()
    }
}

#[derive(Debug)]
pub struct HistPreprocesser {
    var: &'static str,
    other_var: &'static str,
    column: String,
    bins: BinEdges,
    histfunc: HistFunc,
    histnorm: Option<String>,
    cumulative: bool,
    barnorm: Option<String>,
    center_name: String,
}

impl HistPreprocesser {
    pub fn new(args: &CallArgs, data: &DataSource) -> Result<Self> {
        let (var, other_var) = univariate_axes(args);
        let column = args
            .str(var)
            .ok_or_else(|| ExpressError::config("histogram needs a column in x or y"))?
            .to_string();

        let nbins = args.f64("nbins").unwrap_or(10.0);
        if nbins < 1.0 {
            return Err(ExpressError::config("nbins must be at least 1"));
        }

        let schema = data.flatten()?;
        let bins = match args.get("range_bins") {
            Some(ArgValue::List(range)) => match range.as_slice() {
                [lo, hi] => match (lo.as_f64(), hi.as_f64()) {
                    (Some(lo), Some(hi)) => BinEdges::new(lo, hi, nbins as usize)?,
                    _ => return Err(ExpressError::config("range_bins must hold two numbers")),
                },
                _ => return Err(ExpressError::config("range_bins must hold two numbers")),
            },
            Some(_) => return Err(ExpressError::config("range_bins must hold two numbers")),
            None => {
                let (lo, hi) = schema
                    .numeric_range(std::slice::from_ref(&column))?
                    .unwrap_or((0.0, 1.0));
                BinEdges::new(lo, hi, nbins as usize)?
            }
        };

        let histnorm = args.str("histnorm").map(str::to_string);
        if let Some(norm) = &histnorm {
            if !matches!(
                norm.as_str(),
                "percent" | "probability" | "density" | "probability density"
            ) {
                return Err(ExpressError::config(format!("unknown histnorm '{}'", norm)));
            }
        }
        let barnorm = args.str("barnorm").map(str::to_string);
        if let Some(norm) = &barnorm {
            if !matches!(norm.as_str(), "fraction" | "percent") {
                return Err(ExpressError::config(format!("unknown barnorm '{}'", norm)));
            }
        }

        let center_name = schema.unique_names(&["bin_center"])["bin_center"].clone();

        Ok(Self {
            var,
            other_var,
            column,
            bins,
            histfunc: HistFunc::parse(args.str("histfunc").unwrap_or("count"))?,
            histnorm,
            cumulative: args.bool("cumulative").unwrap_or(false),
            barnorm,
            center_name,
        })
    }

    pub fn bins(&self) -> &BinEdges {
        &self.bins
    }

    fn aggregate(&self, table: &Table) -> Result<Vec<Option<f64>>> {
        let mut binned: Vec<Vec<f64>> = vec![Vec::new(); self.bins.nbins];
        for v in table.f64_values(&self.column)?.into_iter().flatten() {
            if let Some(i) = self.bins.index(v) {
                binned[i].push(v);
            }
        }
        Ok(binned.iter().map(|b| self.histfunc.aggregate(b)).collect())
    }

    fn value_axis_title(&self) -> String {
        match &self.histnorm {
            Some(norm) => norm.clone(),
            None if self.histfunc == HistFunc::Count => "count".to_string(),
            None => format!("{} of {}", self.histfunc.name(), self.column),
        }
    }

    /// Bin every group against the shared edges and normalize.
    pub fn preprocess_all(&self, groups: &[Table]) -> Result<Vec<PreprocessedGroup>> {
        let mut counts = groups
            .iter()
            .map(|t| self.aggregate(t))
            .collect::<Result<Vec<_>>>()?;

        let mut histnorm = self.histnorm.clone().unwrap_or_default();

        if matches!(histnorm.as_str(), "percent" | "probability" | "probability density") {
            let factor = if histnorm == "percent" { 100.0 } else { 1.0 };
            for group in counts.iter_mut() {
                let total: f64 = group.iter().flatten().sum();
                if total != 0.0 {
                    for v in group.iter_mut().flatten() {
                        *v = *v * factor / total;
                    }
                }
            }
        }

        if self.cumulative {
            for group in counts.iter_mut() {
                let mut running = 0.0;
                for v in group.iter_mut() {
                    running += v.unwrap_or(0.0);
                    *v = Some(running);
                }
            }
            // cumulative sums discard the density part of the normalization
            histnorm = histnorm.replace("density", "").trim().to_string();
        }

        if matches!(histnorm.as_str(), "density" | "probability density") {
            let width = self.bins.width();
            for v in counts.iter_mut().flatten().flatten() {
                *v /= width;
            }
        }

        if let Some(barnorm) = &self.barnorm {
            let factor = if barnorm == "percent" { 100.0 } else { 1.0 };
            for i in 0..self.bins.nbins {
                let total: f64 = counts.iter().filter_map(|g| g[i]).sum();
                for group in counts.iter_mut() {
                    group[i] = group[i].and_then(|v| {
                        if total == 0.0 {
                            None
                        } else {
                            Some(v * factor / total)
                        }
                    });
                }
            }
        }

        let centers: Vec<f64> = (0..self.bins.nbins).map(|i| self.bins.center(i)).collect();
        let title = self.value_axis_title();

        counts
            .into_iter()
            .map(|group| {
                let table = Table::new(vec![
                    Column::from_f64(self.center_name.clone(), centers.clone()),
                    Column::new(
                        self.column.clone(),
                        group.into_iter().map(Value::from).collect(),
                    ),
                ])?;
                let mut remap = CallArgs::new()
                    .with(self.var, self.center_name.as_str())
                    .with(self.other_var, self.column.as_str())
                    .with(&format!("{}_title", self.other_var), title.as_str())
                    .with(&format!("{}_title", self.var), self.column.as_str());
                if self.var == "y" {
                    remap.set("orientation", "h");
                }
                Ok(PreprocessedGroup { table, remap })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn table(values: Vec<f64>) -> Table {
        Table::new(vec![Column::from_f64("v", values)]).unwrap()
    }

    fn counts(group: &PreprocessedGroup) -> Vec<Option<f64>> {
        group.table.f64_values("v").unwrap()
    }

    fn hist(args: CallArgs, data: &Table) -> HistPreprocesser {
        let args = args.with("x", "v").with_defaults(&CallArgs::new().with("nbins", 10.0));
        HistPreprocesser::new(&args, &DataSource::Table(data.clone())).unwrap()
    }

    #[test]
    fn test_edges_over_explicit_range() {
        let data = table(vec![0.5, 9.5]);
        let h = hist(CallArgs::new().with("range_bins", vec![0.0, 10.0]), &data);
        let edges = h.bins().edges();
        assert_eq!(edges.len(), 11);
        for (i, e) in edges.iter().enumerate() {
            assert!(approx_eq!(f64, *e, i as f64, ulps = 4));
        }
    }

    #[test]
    fn test_edges_follow_data_range() {
        let data = table(vec![4.0, 0.0, 7.5, 10.0]);
        let h = hist(CallArgs::new(), &data);
        let edges = h.bins().edges();
        assert_eq!(edges.len(), 11);
        for (i, e) in edges.iter().enumerate() {
            assert!(approx_eq!(f64, *e, i as f64, ulps = 4));
        }
        assert!(approx_eq!(f64, h.bins().width(), 1.0, ulps = 4));
    }

    #[test]
    fn test_count_conservation_and_max_in_last_bin() {
        let values = vec![0.0, 1.0, 2.5, 2.7, 5.0, 9.9, 10.0];
        let data = table(values.clone());
        let h = hist(CallArgs::new(), &data);
        let out = h.preprocess_all(&[data]).unwrap();
        let c = counts(&out[0]);
        let total: f64 = c.iter().flatten().sum();
        assert_eq!(total, values.len() as f64);
        assert_eq!(c[9], Some(2.0));
        assert_eq!(c[2], Some(2.0));
    }

    #[test]
    fn test_out_of_range_values_are_dropped() {
        let data = table(vec![-1.0, 0.5, 11.0]);
        let h = hist(CallArgs::new().with("range_bins", vec![0.0, 10.0]), &data);
        let out = h.preprocess_all(&[data]).unwrap();
        let total: f64 = counts(&out[0]).iter().flatten().sum();
        assert_eq!(total, 1.0);
    }

    #[test]
    fn test_cumulative() {
        let data = table(vec![0.0, 1.0, 1.0, 3.0, 4.0]);
        let raw = hist(CallArgs::new().with("nbins", 4.0), &data)
            .preprocess_all(std::slice::from_ref(&data))
            .unwrap();
        let cum = hist(CallArgs::new().with("nbins", 4.0).with("cumulative", true), &data)
            .preprocess_all(&[data])
            .unwrap();
        let raw = counts(&raw[0]);
        let cum = counts(&cum[0]);
        let mut running = 0.0;
        for i in 0..4 {
            running += raw[i].unwrap();
            assert_eq!(cum[i], Some(running));
        }
    }

    #[test]
    fn test_probability_density_integrates_to_one() {
        let data = table(vec![0.0, 1.0, 1.5, 2.0, 4.0]);
        let h = hist(
            CallArgs::new().with("nbins", 4.0).with("histnorm", "probability density"),
            &data,
        );
        let out = h.preprocess_all(&[data]).unwrap();
        let area: f64 = counts(&out[0]).iter().flatten().map(|v| v * h.bins().width()).sum();
        assert!(approx_eq!(f64, area, 1.0, epsilon = 1e-9));
    }

    #[test]
    fn test_cumulative_drops_density() {
        let data = table(vec![0.0, 2.0, 4.0, 8.0]);
        let h = hist(
            CallArgs::new()
                .with("nbins", 2.0)
                .with("histnorm", "probability density")
                .with("cumulative", true),
            &data,
        );
        let out = h.preprocess_all(&[data]).unwrap();
        let c = counts(&out[0]);
        assert_eq!(c[1], Some(1.0));
    }

    #[test]
    fn test_barnorm_across_groups() {
        let a = table(vec![0.0, 0.0, 0.0]);
        let b = table(vec![0.0]);
        let all = Table::concat(vec![a.clone(), b.clone()]).unwrap();
        let h = hist(CallArgs::new().with("nbins", 1.0).with("barnorm", "percent"), &all);
        let out = h.preprocess_all(&[a, b]).unwrap();
        assert_eq!(counts(&out[0])[0], Some(75.0));
        assert_eq!(counts(&out[1])[0], Some(25.0));
    }

    #[test]
    fn test_histfunc_sum_and_empty_bins() {
        let data = table(vec![1.0, 1.0, 9.0]);
        let h = hist(
            CallArgs::new()
                .with("nbins", 2.0)
                .with("histfunc", "sum")
                .with("range_bins", vec![0.0, 10.0]),
            &data,
        );
        let out = h.preprocess_all(&[data]).unwrap();
        assert_eq!(counts(&out[0]), vec![Some(2.0), Some(9.0)]);

        let empty = table(vec![1.0]);
        let h = hist(
            CallArgs::new()
                .with("nbins", 2.0)
                .with("histfunc", "max")
                .with("range_bins", vec![0.0, 10.0]),
            &empty,
        );
        let out = h.preprocess_all(&[empty]).unwrap();
        assert_eq!(counts(&out[0]), vec![Some(1.0), None]);
    }

    #[test]
    fn test_remap_for_y_histogram() {
        let data = table(vec![1.0, 2.0]);
        let args = CallArgs::new().with("y", "v").with("nbins", 2.0);
        let h = HistPreprocesser::new(&args, &DataSource::Table(data.clone())).unwrap();
        let out = h.preprocess_all(&[data]).unwrap();
        assert_eq!(out[0].remap.str("y"), Some("bin_center"));
        assert_eq!(out[0].remap.str("x"), Some("v"));
        assert_eq!(out[0].remap.str("orientation"), Some("h"));
        assert_eq!(out[0].remap.str("x_title"), Some("count"));
    }

    #[test]
    fn test_unknown_histfunc_is_a_configuration_error() {
        assert!(HistFunc::parse("mode").is_err());
    }
}
