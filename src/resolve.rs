// Argument resolution: pivot detection, style precedence, partition columns

use crate::args::{ArgValue, CallArgs};
use crate::chart::{Capability, ChartKind};
use crate::data::{DataSource, GroupKey, Table, Value};
use crate::error::{ExpressError, Result};
use crate::palette::{StyleAttr, StyleManager, StyleMap};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Keywords that count as the user choosing colors.
const COLOR_ARGS: [&str; 3] = ["color", "color_discrete_sequence", "color_discrete_map"];

/// Wide-to-long reshaping of a list-valued x or y.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotSpec {
    /// `"x"` or `"y"`.
    pub list_var: &'static str,
    pub candidates: Vec<String>,
    /// Column tagging each row with the candidate it came from.
    pub variable: String,
    /// Column holding the candidate's value.
    pub value: String,
}

/// A style attribute that varies by group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStyle {
    pub attr: StyleAttr,
    pub columns: Vec<String>,
    pub manager: StyleManager,
    /// Distinct key tuples of `columns`, in order of first appearance.
    pub keys: Vec<GroupKey>,
}

impl GroupStyle {
    /// Style of a group table. Every row of a group shares the style columns.
    pub fn style_for(&mut self, table: &Table) -> Result<Value> {
        let key = GroupKey(
            self.columns
                .iter()
                .map(|c| Ok(table.column(c)?.values.first().cloned().unwrap_or(Value::Null)))
                .collect::<Result<Vec<_>>>()?,
        );
        Ok(self.manager.assign(&key))
    }
}

/// A style attribute baked into a per-row column.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedStyle {
    pub attr: StyleAttr,
    pub columns: Vec<String>,
    pub manager: StyleManager,
    pub target: String,
}

/// Fully resolved chart call.
///
/// Built stage by stage; no grouping directive (`by`, `by_vars`, style maps,
/// facets) is left in `args` once resolution finishes.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub kind: ChartKind,
    pub args: CallArgs,
    pub data: DataSource,
    pub pivot: Option<PivotSpec>,
    pub group_styles: Vec<GroupStyle>,
    pub attached: Vec<AttachedStyle>,
    pub partition_columns: Vec<String>,
    pub facet_row: Option<String>,
    pub facet_col: Option<String>,
    /// Resolved argument -> the source columns it was derived from.
    pub source_columns: IndexMap<String, Vec<String>>,
    pub user_color: bool,
}

/// Resolve a chart call into a request ready for partitioning.
pub fn resolve(kind: ChartKind, args: CallArgs) -> Result<PlotRequest> {
    let data = args.table()?.clone();
    let explicit_by_vars = args.strings("by_vars").unwrap_or_default();
    let user_color = COLOR_ARGS.iter().any(|a| args.contains(a));

    let mut args = args.with_defaults(&kind.defaults());
    args.remove("table");

    PlotRequest {
        kind,
        args,
        data,
        pivot: None,
        group_styles: Vec::new(),
        attached: Vec::new(),
        partition_columns: Vec::new(),
        facet_row: None,
        facet_col: None,
        source_columns: IndexMap::new(),
        user_color,
    }
    .with_pivot()?
    .with_styles(&explicit_by_vars)?
    .with_partitions()
}

/// Unpivot the candidate columns into `variable` / `value` columns.
///
/// One tagged copy of the table per candidate, unioned; `value` reads the
/// candidate named by the tag, falling through to the last candidate.
pub fn to_long(table: &Table, pivot: &PivotSpec) -> Result<Table> {
    let (last, rest) = pivot
        .candidates
        .split_last()
        .ok_or_else(|| ExpressError::config(format!("{} names no columns", pivot.list_var)))?;

    let tagged = pivot
        .candidates
        .iter()
        .map(|c| {
            table
                .clone()
                .with_literal(&pivot.variable, Value::from(c.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;

    let long = Table::concat(tagged)?.with_derived(&pivot.value, |row| {
        let tag = row.get(&pivot.variable).and_then(|t| t.as_str());
        let source = rest
            .iter()
            .find(|c| tag == Some(c.as_str()))
            .unwrap_or(last);
        row.get(source).cloned().unwrap_or(Value::Null)
    })?;

    Ok(long.drop_columns(&pivot.candidates))
}

fn push_unique(target: &mut Vec<String>, columns: &[String]) {
    for c in columns {
        if !target.contains(c) {
            target.push(c.clone());
        }
    }
}

impl PlotRequest {
    fn with_pivot(mut self) -> Result<Self> {
        let is_list = |var: &str| matches!(self.args.get(var), Some(ArgValue::List(_)));
        let list_var = match (is_list("x"), is_list("y")) {
            (false, false) => return Ok(self),
            (true, true) => {
                return Err(ExpressError::config(
                    "only one of x and y may be a list of columns",
                ))
            }
            (true, false) => "x",
            (false, true) => "y",
        };

        if !self.kind.has(Capability::SupportsLists) {
            return Err(ExpressError::config(format!(
                "{} does not accept a list of columns in {}",
                self.kind.name(),
                list_var
            )));
        }
        let table = match &self.data {
            DataSource::Table(t) => t,
            DataSource::Partitioned(_) => {
                return Err(ExpressError::config(format!(
                    "a list of columns in {} needs an unpartitioned table",
                    list_var
                )))
            }
        };

        let candidates = self
            .args
            .columns(list_var)
            .iter()
            .map(|c| table.column(c).map(|col| col.name.clone()))
            .collect::<Result<Vec<_>>>()?;
        let names = table.unique_names(&["variable", "value"]);
        let pivot = PivotSpec {
            list_var,
            candidates,
            variable: names["variable"].clone(),
            value: names["value"].clone(),
        };
        log::debug!(
            "pivoting {:?} from {} into '{}'/'{}'",
            pivot.candidates,
            list_var,
            pivot.variable,
            pivot.value
        );

        self.data = DataSource::Table(to_long(table, &pivot)?);
        self.args.set(list_var, pivot.value.as_str());
        if !self.args.contains("by") {
            self.args.set("by", pivot.variable.as_str());
        }
        self.pivot = Some(pivot);
        Ok(self)
    }

    fn with_styles(mut self, explicit_by_vars: &[String]) -> Result<Self> {
        let numeric = self.data.numeric_columns();
        for attr in StyleAttr::ALL {
            self = self.with_style(attr, explicit_by_vars, &numeric)?;
        }
        Ok(self)
    }

    fn with_style(
        mut self,
        attr: StyleAttr,
        explicit_by_vars: &[String],
        numeric: &HashSet<String>,
    ) -> Result<Self> {
        let by_cols = self.args.columns("by");
        let by_vars = self.args.columns("by_vars");
        let value_cols = self.args.columns(attr.arg());
        let map = self
            .args
            .remove(attr.map_arg())
            .map(|m| StyleMap::parse(attr, &m))
            .transpose()?;

        match map {
            Some(StyleMap::Identity) => {
                if explicit_by_vars.iter().any(|v| v == attr.arg()) {
                    return Err(ExpressError::config(format!(
                        "{} cannot be grouped through by_vars and mapped by identity",
                        attr.arg()
                    )));
                }
                let [column] = value_cols.as_slice() else {
                    return Err(ExpressError::config(format!(
                        "{}=\"identity\" needs exactly one column in {}",
                        attr.map_arg(),
                        attr.arg()
                    )));
                };
                self.args.remove(attr.arg());
                self.args.set(attr.attached_arg(), column.as_str());
                self.source_columns
                    .insert(attr.attached_arg().to_string(), vec![column.clone()]);
                return Ok(self);
            }
            Some(map) => {
                let columns = if value_cols.is_empty() { by_cols } else { value_cols };
                if columns.is_empty() {
                    return Err(ExpressError::config(format!(
                        "{} needs a column in {} or by",
                        attr.map_arg(),
                        attr.arg()
                    )));
                }
                return self.style_by_group(attr, columns, map.overrides());
            }
            None => {}
        }

        // preprocessed groups no longer carry the source rows a continuous style reads
        let keeps_rows = self.kind.preprocessing().is_none();
        if let [column] = value_cols.as_slice() {
            if keeps_rows && attr.allows_continuous() && numeric.contains(column) {
                log::debug!("{} is continuous over '{}'", attr.arg(), column);
                self.source_columns
                    .insert(attr.arg().to_string(), vec![column.clone()]);
                return Ok(self);
            }
        }
        if !value_cols.is_empty() {
            return self.style_by_group(attr, value_cols, IndexMap::new());
        }
        let wanted = by_vars.iter().any(|v| v == attr.arg()) || self.args.contains(attr.sequence_arg());
        if !by_cols.is_empty() && wanted {
            return self.style_by_group(attr, by_cols, IndexMap::new());
        }
        Ok(self)
    }

    fn style_by_group(
        mut self,
        attr: StyleAttr,
        columns: Vec<String>,
        overrides: IndexMap<String, Value>,
    ) -> Result<Self> {
        let sequence = match self.args.remove(attr.sequence_arg()) {
            Some(ArgValue::List(items)) => items.iter().map(|v| v.to_value()).collect(),
            Some(single) => vec![single.to_value()],
            None => attr.default_sequence(),
        };
        let manager = StyleManager::new(sequence, overrides)?;
        self.args.remove(attr.arg());

        if self.kind.has(Capability::AlwaysAttached) {
            let base = attr.attached_arg();
            let target = self
                .data
                .schema()
                .map(|t| t.unique_names(&[base])[base].clone())
                .unwrap_or_else(|| base.to_string());
            log::debug!("{} attached per row from {:?}", attr.arg(), columns);
            self.source_columns.insert(base.to_string(), columns.clone());
            self.attached.push(AttachedStyle {
                attr,
                columns,
                manager,
                target,
            });
        } else {
            log::debug!("{} resolved by group over {:?}", attr.arg(), columns);
            self.source_columns
                .insert(attr.arg().to_string(), columns.clone());
            self.group_styles.push(GroupStyle {
                attr,
                columns,
                manager,
                keys: Vec::new(),
            });
        }
        Ok(self)
    }

    fn with_partitions(mut self) -> Result<Self> {
        let mut columns = Vec::new();
        if let Some(pivot) = &self.pivot {
            push_unique(&mut columns, std::slice::from_ref(&pivot.variable));
        }
        let by_cols = self.args.columns("by");
        if !self.kind.has(Capability::AlwaysAttached) {
            push_unique(&mut columns, &by_cols);
        }
        push_unique(&mut columns, &self.args.columns("line_group"));
        for style in &self.group_styles {
            push_unique(&mut columns, &style.columns);
        }
        self.facet_row = self.args.remove("facet_row").and_then(|v| v.as_str().map(str::to_string));
        self.facet_col = self.args.remove("facet_col").and_then(|v| v.as_str().map(str::to_string));
        for facet in [&self.facet_row, &self.facet_col].into_iter().flatten() {
            push_unique(&mut columns, std::slice::from_ref(facet));
        }
        for directive in ["by", "by_vars", "line_group"] {
            self.args.remove(directive);
        }

        if let Some(schema) = self.data.schema() {
            for c in &columns {
                schema.column(c)?;
            }
            for arg in self.kind.data_args() {
                for c in self.args.columns(arg) {
                    schema.column(&c)?;
                }
            }
            for sources in self.source_columns.values() {
                for c in sources {
                    schema.column(c)?;
                }
            }
        }

        let flat = self.data.flatten()?;
        for style in self.group_styles.iter_mut() {
            style.keys = flat.distinct(&style.columns)?;
            for key in &style.keys {
                style.manager.assign(key);
            }
        }

        self.partition_columns = match &self.data {
            DataSource::Partitioned(p) => p.key_columns.clone(),
            DataSource::Table(_) => columns,
        };
        log::debug!(
            "{} partitions by {:?}",
            self.kind.name(),
            self.partition_columns
        );
        Ok(self)
    }

    /// Partition columns that name legend entries (everything but facets).
    pub fn legend_columns(&self) -> Vec<String> {
        self.partition_columns
            .iter()
            .filter(|c| Some(*c) != self.facet_row.as_ref() && Some(*c) != self.facet_col.as_ref())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::error::ErrorCategory;

    fn wide() -> Table {
        Table::new(vec![
            Column::from_f64("t", vec![1.0, 2.0, 3.0]),
            Column::from_f64("a", vec![10.0, 20.0, 30.0]),
            Column::from_f64("b", vec![-1.0, -2.0, -3.0]),
            Column::from_strs("g", &["u", "v", "u"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_long_conversion_tags_each_candidate() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", vec!["a", "b"]);
        let request = resolve(ChartKind::Line, args).unwrap();
        let pivot = request.pivot.clone().unwrap();
        assert_eq!(pivot.variable, "variable");
        assert_eq!(pivot.value, "value");

        let long = request.data.flatten().unwrap();
        assert_eq!(long.num_rows(), 6);
        assert!(!long.has_column("a"));
        let parts = long.partition_by(&["variable".to_string()]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts.constituents[0].table.f64_values("value").unwrap(),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
        assert_eq!(
            parts.constituents[1].table.f64_values("value").unwrap(),
            vec![Some(-1.0), Some(-2.0), Some(-3.0)]
        );

        assert_eq!(request.args.str("y"), Some("value"));
        assert_eq!(request.partition_columns, vec!["variable"]);
        assert_eq!(request.group_styles[0].attr, StyleAttr::Color);
        assert!(!request.args.contains("by"));
    }

    #[test]
    fn test_pivot_names_avoid_collisions() {
        let table = wide()
            .with_literal("value", Value::Int(0))
            .unwrap();
        let args = CallArgs::new().with("table", table).with("y", vec!["a", "b"]);
        let request = resolve(ChartKind::Bar, args).unwrap();
        assert_eq!(request.pivot.unwrap().value, "value_");
    }

    #[test]
    fn test_by_assigns_color_by_default() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("by", "g");
        let request = resolve(ChartKind::Scatter, args).unwrap();
        assert_eq!(request.group_styles.len(), 1);
        assert_eq!(request.group_styles[0].columns, vec!["g"]);
        assert_eq!(request.group_styles[0].keys.len(), 2);
        assert_eq!(request.partition_columns, vec!["g"]);
        assert!(!request.user_color);
    }

    #[test]
    fn test_sequence_pulls_attribute_into_grouping() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("by", "g")
            .with("symbol_sequence", vec!["square", "x"]);
        let request = resolve(ChartKind::Scatter, args).unwrap();
        let attrs: Vec<_> = request.group_styles.iter().map(|s| s.attr).collect();
        assert_eq!(attrs, vec![StyleAttr::Color, StyleAttr::Symbol]);
        assert!(!request.args.contains("symbol_sequence"));
    }

    #[test]
    fn test_numeric_color_is_continuous() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("color", "b");
        let request = resolve(ChartKind::Scatter, args).unwrap();
        assert!(request.group_styles.is_empty());
        assert_eq!(request.args.str("color"), Some("b"));
        assert!(request.partition_columns.is_empty());
        assert!(request.user_color);
    }

    #[test]
    fn test_numeric_color_groups_on_preprocessed_chart() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("color", "b");
        let request = resolve(ChartKind::Histogram, args).unwrap();
        assert_eq!(request.group_styles.len(), 1);
        assert_eq!(request.group_styles[0].columns, vec!["b"]);
        assert!(!request.args.contains("color"));
        assert_eq!(request.partition_columns, vec!["b"]);
    }

    #[test]
    fn test_map_by_forces_grouping_of_numeric_column() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("color", "b")
            .with("color_discrete_map", "by");
        let request = resolve(ChartKind::Scatter, args).unwrap();
        assert_eq!(request.group_styles[0].keys.len(), 3);
        assert!(!request.args.contains("color"));
    }

    #[test]
    fn test_identity_becomes_attached() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("color", "g")
            .with("color_discrete_map", "identity");
        let request = resolve(ChartKind::Scatter, args).unwrap();
        assert_eq!(request.args.str("attached_color"), Some("g"));
        assert!(!request.args.contains("color"));
        assert!(request.partition_columns.is_empty());
    }

    #[test]
    fn test_identity_with_explicit_by_vars_is_rejected() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("by", "g")
            .with("by_vars", vec!["color"])
            .with("color", "g")
            .with("color_discrete_map", "identity");
        let err = resolve(ChartKind::Scatter, args).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_always_attached_never_partitions_by_style() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("names", "g")
            .with("values", "a")
            .with("color", "g");
        let request = resolve(ChartKind::Pie, args).unwrap();
        assert!(request.partition_columns.is_empty());
        assert_eq!(request.attached.len(), 1);
        assert_eq!(request.attached[0].target, "attached_color");
    }

    #[test]
    fn test_invalid_table() {
        let args = CallArgs::new().with("table", "nope").with("x", "a");
        let err = resolve(ChartKind::Scatter, args).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Type);
    }

    #[test]
    fn test_list_on_unsupported_chart() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", vec!["a", "b"])
            .with("y", "t")
            .with("z", "t");
        assert!(resolve(ChartKind::Scatter3d, args).is_err());
    }

    #[test]
    fn test_missing_column() {
        let args = CallArgs::new().with("table", wide()).with("x", "nope");
        assert!(matches!(
            resolve(ChartKind::Scatter, args),
            Err(ExpressError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_facets_tracked_separately() {
        let args = CallArgs::new()
            .with("table", wide())
            .with("x", "t")
            .with("y", "a")
            .with("facet_col", "g");
        let request = resolve(ChartKind::Scatter, args).unwrap();
        assert_eq!(request.partition_columns, vec!["g"]);
        assert_eq!(request.facet_col.as_deref(), Some("g"));
        assert!(request.legend_columns().is_empty());
    }
}
