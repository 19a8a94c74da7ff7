use super::{univariate_axes, PreprocessedGroup};
use crate::args::{ArgValue, CallArgs};
use crate::data::Table;
use crate::error::Result;
use crate::palette::StyleAttr;

/// Per-row keywords whose columns ride along with the data column.
const ROW_ARGS: [&str; 2] = ["hover_name", "text"];

/// Distribution charts (violin, box, strip) drawn from one column.
///
/// When both x and y are given the chart is already categorical and the
/// group passes through untouched.
#[derive(Debug)]
pub struct ViolinPreprocesser {
    roles: Option<(&'static str, &'static str, String)>,
    /// Columns kept in each group, the data column first.
    keep: Vec<String>,
}

impl ViolinPreprocesser {
    pub fn new(args: &CallArgs) -> Self {
        if args.contains("x") && args.contains("y") {
            return Self {
                roles: None,
                keep: Vec::new(),
            };
        }
        let (var, other_var) = univariate_axes(args);
        let roles = args.str(var).map(|c| (var, other_var, c.to_string()));
        let mut keep: Vec<String> = roles.iter().map(|(_, _, c)| c.clone()).collect();
        let row_args = ROW_ARGS
            .into_iter()
            .chain(StyleAttr::ALL.iter().map(|a| a.attached_arg()));
        for arg in row_args {
            if let Some(col) = args.str(arg) {
                if !keep.iter().any(|k| k == col) {
                    keep.push(col.to_string());
                }
            }
        }
        Self { roles, keep }
    }

    pub fn preprocess(&self, table: Table) -> Result<PreprocessedGroup> {
        let Some((var, other_var, column)) = &self.roles else {
            return Ok(PreprocessedGroup::unchanged(table));
        };
        let keep: Vec<&str> = self.keep.iter().map(String::as_str).collect();
        let table = table.select(&keep)?;
        let mut remap = CallArgs::new()
            .with(var, column.as_str())
            .with(other_var, ArgValue::Null);
        remap.set("orientation", if *var == "x" { "h" } else { "v" });
        Ok(PreprocessedGroup { table, remap })
    }
}
