// Partition manager: split, preprocess, draw per group, compose

use crate::chart::Capability;
use crate::data::{DataSource, Table, Value};
use crate::draw::{Draw, DrawCall};
use crate::error::Result;
use crate::figure::Figure;
use crate::layer::{layer, LayerSpec};
use crate::palette::StyleAttr;
use crate::preprocess::Preprocesser;
use crate::resolve::PlotRequest;
use indexmap::IndexMap;
use serde_json::json;

/// Space between facet columns, as a fraction of the figure.
const FACET_COL_SPACING: f64 = 0.02;
/// Space between facet rows, as a fraction of the figure.
const FACET_ROW_SPACING: f64 = 0.03;

/// Clamp the gap between `n` panels so the gaps take at most half the figure.
fn panel_spacing(spacing: f64, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    spacing.clamp(0.0, 0.5 / (n - 1) as f64)
}

struct Group {
    partition: IndexMap<String, Value>,
    table: Table,
}

/// Drives one chart call from a resolved request to the final figure.
pub struct PartitionManager {
    request: PlotRequest,
}

impl PartitionManager {
    pub fn new(request: PlotRequest) -> Self {
        Self { request }
    }

    fn groups(&self) -> Result<Vec<Group>> {
        let facets: Vec<&String> = [&self.request.facet_row, &self.request.facet_col]
            .into_iter()
            .flatten()
            .collect();

        match &self.request.data {
            DataSource::Partitioned(parts) => Ok(parts
                .constituents
                .iter()
                .map(|c| {
                    let mut partition: IndexMap<String, Value> = parts
                        .key_columns
                        .iter()
                        .cloned()
                        .zip(c.key.values().iter().cloned())
                        .collect();
                    // facets outside the key are read off the constituent
                    for facet in &facets {
                        if !partition.contains_key(*facet) {
                            let value = c
                                .table
                                .column(facet)
                                .ok()
                                .and_then(|col| col.values.first().cloned())
                                .unwrap_or(Value::Null);
                            partition.insert((*facet).clone(), value);
                        }
                    }
                    Group {
                        partition,
                        table: c.table.clone(),
                    }
                })
                .collect()),
            DataSource::Table(table) if self.request.partition_columns.is_empty() => {
                Ok(vec![Group {
                    partition: IndexMap::new(),
                    table: table.clone(),
                }])
            }
            DataSource::Table(table) => Ok(table
                .partition_by(&self.request.partition_columns)?
                .constituents
                .into_iter()
                .map(|c| Group {
                    partition: self
                        .request
                        .partition_columns
                        .iter()
                        .cloned()
                        .zip(c.key.0)
                        .collect(),
                    table: c.table,
                })
                .collect()),
        }
    }

    /// Draw every group and compose the fragments.
    ///
    /// The trace generator made for the first group is handed to every later
    /// group, so plain style sequences keep cycling across the whole call.
    pub fn create_figure(&mut self, draw: &dyn Draw) -> Result<Figure> {
        let groups = self.groups()?;
        log::debug!(
            "{}: {} group(s) over {:?}",
            self.request.kind.name(),
            groups.len(),
            self.request.partition_columns
        );

        let mut partitions = Vec::with_capacity(groups.len());
        let mut styles = Vec::with_capacity(groups.len());
        let mut tables = Vec::with_capacity(groups.len());
        for group in groups {
            let resolved = self
                .request
                .group_styles
                .iter_mut()
                .map(|s| Ok((s.attr, s.style_for(&group.table)?)))
                .collect::<Result<Vec<(StyleAttr, Value)>>>()?;
            styles.push(resolved);
            partitions.push(group.partition);
            tables.push(group.table);
        }

        let mut preprocesser = Preprocesser::for_request(&self.request)?;
        let prepared = preprocesser.preprocess_all(tables)?;

        let legend_columns = self.request.legend_columns();
        let mut trace_generator = None;
        let mut figs = Vec::with_capacity(prepared.len());
        for ((partition, group), styles) in partitions.iter().zip(prepared).zip(&styles) {
            let mut args = self.request.args.clone();
            args.apply(&group.remap);
            log::trace!("drawing group {:?}", partition);
            let fig = draw.draw(DrawCall {
                kind: self.request.kind,
                args: &args,
                table: &group.table,
                styles,
                partition,
                legend_columns: &legend_columns,
                trace_generator: trace_generator.clone(),
            })?;
            if trace_generator.is_none() {
                trace_generator = fig.trace_generator.clone();
            }
            figs.push(fig);
        }

        self.compose(figs, &partitions)
    }

    fn compose(&self, figs: Vec<Figure>, partitions: &[IndexMap<String, Value>]) -> Result<Figure> {
        let mut fig = if self.request.facet_row.is_some() || self.request.facet_col.is_some() {
            self.facet(figs, partitions)?
        } else {
            layer(figs, Some(0), None)?
        };
        if self.request.pivot.is_some() && self.request.kind.tight_legend() {
            fig.update_layout("legend.tracegroupgap", json!(0));
        }
        fig.has_color = self.request.user_color;
        Ok(fig)
    }

    /// Lay groups out on a row/column grid, one panel per facet cell.
    fn facet(&self, figs: Vec<Figure>, partitions: &[IndexMap<String, Value>]) -> Result<Figure> {
        let levels = |facet: &Option<String>| -> Vec<Value> {
            let mut seen: Vec<Value> = Vec::new();
            for p in partitions {
                let v = facet
                    .as_ref()
                    .and_then(|f| p.get(f).cloned())
                    .unwrap_or(Value::Null);
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
            seen
        };
        let rows = levels(&self.request.facet_row);
        let cols = levels(&self.request.facet_col);
        let cell_of = |p: &IndexMap<String, Value>, facet: &Option<String>, levels: &[Value]| {
            let v = facet
                .as_ref()
                .and_then(|f| p.get(f).cloned())
                .unwrap_or(Value::Null);
            levels.iter().position(|l| *l == v).unwrap_or(0)
        };

        let mut cells: IndexMap<(usize, usize), Vec<Figure>> = IndexMap::new();
        for (fig, p) in figs.into_iter().zip(partitions) {
            let cell = (
                cell_of(p, &self.request.facet_row, &rows),
                cell_of(p, &self.request.facet_col, &cols),
            );
            cells.entry(cell).or_default().push(fig);
        }
        cells.sort_keys();

        let args = &self.request.args;
        let col_spacing = panel_spacing(
            args.f64("facet_col_spacing").unwrap_or(FACET_COL_SPACING),
            cols.len(),
        );
        let row_spacing = panel_spacing(
            args.f64("facet_row_spacing").unwrap_or(FACET_ROW_SPACING),
            rows.len(),
        );
        let (nrows, ncols) = (rows.len() as f64, cols.len() as f64);
        let width = (1.0 - col_spacing * (ncols - 1.0)) / ncols;
        let height = (1.0 - row_spacing * (nrows - 1.0)) / nrows;
        let x_range = |c: usize| {
            let x0 = c as f64 * (width + col_spacing);
            [x0, (x0 + width).min(1.0)]
        };
        let y_range = |r: usize| {
            let y1 = 1.0 - r as f64 * (height + row_spacing);
            [(y1 - height).max(0.0), y1]
        };

        let mut panels = Vec::with_capacity(cells.len());
        let mut specs = Vec::with_capacity(cells.len());
        for ((r, c), cell_figs) in cells {
            panels.push(layer(cell_figs, Some(0), None)?);
            specs.push(LayerSpec {
                x: Some(x_range(c)),
                y: Some(y_range(r)),
                match_x: Some("x".to_string()),
                match_y: Some("y".to_string()),
                ..Default::default()
            });
        }
        let mut fig = layer(panels, None, Some(&specs))?;

        let label = |column: &str| {
            args.get("labels")
                .and_then(|l| l.as_map())
                .and_then(|m| m.get(column))
                .and_then(|v| v.as_str())
                .unwrap_or(column)
                .to_string()
        };
        let mut annotations = Vec::new();
        if let Some(facet) = &self.request.facet_col {
            for (c, value) in cols.iter().enumerate() {
                let [x0, x1] = x_range(c);
                annotations.push(json!({
                    "text": format!("{}={}", label(facet), value),
                    "x": (x0 + x1) / 2.0,
                    "y": 1.0,
                    "xref": "paper",
                    "yref": "paper",
                    "xanchor": "center",
                    "yanchor": "bottom",
                    "showarrow": false,
                }));
            }
        }
        if let Some(facet) = &self.request.facet_row {
            for (r, value) in rows.iter().enumerate() {
                let [y0, y1] = y_range(r);
                annotations.push(json!({
                    "text": format!("{}={}", label(facet), value),
                    "x": 1.0,
                    "y": (y0 + y1) / 2.0,
                    "xref": "paper",
                    "yref": "paper",
                    "xanchor": "left",
                    "yanchor": "middle",
                    "textangle": 90,
                    "showarrow": false,
                }));
            }
        }
        fig.update_layout("annotations", json!(annotations));

        // one legend entry per legend group across all panels
        if !self.request.kind.has(Capability::AlwaysAttached) {
            let mut seen = Vec::new();
            fig.update_traces(|trace| {
                if let Some(group) = trace.get("legendgroup").cloned() {
                    if seen.contains(&group) {
                        trace["showlegend"] = json!(false);
                    } else {
                        seen.push(group);
                    }
                }
            });
        }
        Ok(fig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::CallArgs;
    use crate::chart::ChartKind;
    use crate::data::Column;
    use crate::draw::generate_figure;
    use crate::figure::SharedTraceGenerator;
    use crate::resolve::resolve;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the trace generator each draw receives.
    struct RecordingDraw {
        seen: RefCell<Vec<Option<SharedTraceGenerator>>>,
        produced: RefCell<Vec<SharedTraceGenerator>>,
    }

    impl Draw for RecordingDraw {
        fn draw(&self, call: DrawCall<'_>) -> Result<Figure> {
            self.seen.borrow_mut().push(call.trace_generator.clone());
            let fig = generate_figure(call)?;
            if let Some(tg) = &fig.trace_generator {
                self.produced.borrow_mut().push(tg.clone());
            }
            Ok(fig)
        }
    }

    fn three_groups() -> Table {
        Table::new(vec![
            Column::from_f64("x", vec![1.0, 2.0, 3.0, 4.0]),
            Column::from_f64("y", vec![1.0, 4.0, 9.0, 16.0]),
            Column::from_strs("g", &["a", "b", "c", "a"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_trace_generator_is_shared_across_groups() {
        let args = CallArgs::new()
            .with("table", three_groups())
            .with("x", "x")
            .with("y", "y")
            .with("by", "g");
        let draw = RecordingDraw {
            seen: RefCell::new(Vec::new()),
            produced: RefCell::new(Vec::new()),
        };
        let fig = PartitionManager::new(resolve(ChartKind::Scatter, args).unwrap())
            .create_figure(&draw)
            .unwrap();
        assert_eq!(fig.data.len(), 3);

        let seen = draw.seen.borrow();
        let produced = draw.produced.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].is_none());
        for later in &seen[1..] {
            assert!(Rc::ptr_eq(later.as_ref().unwrap(), &produced[0]));
        }
    }

    #[test]
    fn test_group_colors_follow_palette() {
        let args = CallArgs::new()
            .with("table", three_groups())
            .with("x", "x")
            .with("y", "y")
            .with("color", "g")
            .with("color_discrete_sequence", vec!["red", "blue"]);
        let fig = PartitionManager::new(resolve(ChartKind::Scatter, args).unwrap())
            .create_figure(&crate::draw::ExpressDraw)
            .unwrap();
        let colors: Vec<_> = fig.data.iter().map(|t| t["marker"]["color"].clone()).collect();
        assert_eq!(colors, vec![json!("red"), json!("blue"), json!("red")]);
        assert_eq!(fig.data[0]["x"], json!([1.0, 4.0]));
        assert!(fig.has_color);
    }

    #[test]
    fn test_no_user_color_is_marked() {
        let args = CallArgs::new()
            .with("table", three_groups())
            .with("x", "x")
            .with("y", "y");
        let fig = PartitionManager::new(resolve(ChartKind::Line, args).unwrap())
            .create_figure(&crate::draw::ExpressDraw)
            .unwrap();
        assert!(!fig.has_color);
        assert_eq!(fig.data.len(), 1);
    }

    #[test]
    fn test_facet_grid() {
        let args = CallArgs::new()
            .with("table", three_groups())
            .with("x", "x")
            .with("y", "y")
            .with("facet_col", "g");
        let fig = PartitionManager::new(resolve(ChartKind::Scatter, args).unwrap())
            .create_figure(&crate::draw::ExpressDraw)
            .unwrap();
        assert_eq!(fig.data.len(), 3);
        assert_eq!(fig.data[2]["xaxis"], json!("x3"));
        assert_eq!(fig.layout["xaxis3"]["matches"], json!("x"));
        assert_eq!(fig.layout["annotations"][0]["text"], json!("g=a"));
        assert!(fig.has_subplots);
    }

    fn draw_all(kind: ChartKind, args: CallArgs) -> Figure {
        PartitionManager::new(resolve(kind, args).unwrap())
            .create_figure(&crate::draw::ExpressDraw)
            .unwrap()
    }

    #[test]
    fn test_pivot_tightens_legend_for_preprocessed_charts() {
        let hist = draw_all(
            ChartKind::Histogram,
            CallArgs::new()
                .with("table", three_groups())
                .with("x", vec!["x", "y"]),
        );
        assert_eq!(hist.data.len(), 2);
        assert_eq!(hist.layout["legend"]["tracegroupgap"], json!(0));

        let line = draw_all(
            ChartKind::Line,
            CallArgs::new()
                .with("table", three_groups())
                .with("x", "g")
                .with("y", vec!["x", "y"]),
        );
        assert_eq!(line.data.len(), 2);
        assert!(line
            .layout
            .get("legend")
            .and_then(|l| l.get("tracegroupgap"))
            .is_none());
    }

    #[test]
    fn test_frequency_counts_per_partition() {
        let table = Table::new(vec![
            Column::from_strs("fruit", &["apple", "pear", "apple", "apple", "pear"]),
            Column::from_strs("store", &["n", "n", "s", "s", "s"]),
        ])
        .unwrap();
        let fig = draw_all(
            ChartKind::FrequencyBar,
            CallArgs::new()
                .with("table", table)
                .with("x", "fruit")
                .with("by", "store"),
        );
        assert_eq!(fig.data.len(), 2);
        assert_eq!(fig.data[0]["name"], json!("n"));
        assert_eq!(fig.data[0]["x"], json!(["apple", "pear"]));
        assert_eq!(fig.data[0]["y"], json!([1, 1]));
        assert_eq!(fig.data[1]["name"], json!("s"));
        assert_eq!(fig.data[1]["y"], json!([2, 1]));
        assert_eq!(fig.data[1]["marker"]["color"], json!(crate::palette::PLOTLY_COLORS[1]));
    }

    #[test]
    fn test_ecdf_per_partition() {
        let table = Table::new(vec![
            Column::from_f64("v", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::from_strs("g", &["a", "a", "b", "b", "b"]),
        ])
        .unwrap();
        let fig = draw_all(
            ChartKind::Ecdf,
            CallArgs::new().with("table", table).with("x", "v").with("by", "g"),
        );
        assert_eq!(fig.data.len(), 2);
        assert_eq!(fig.data[0]["x"], json!([1.0, 2.0]));
        assert_eq!(fig.data[0]["y"], json!([0.5, 1.0]));
        assert_eq!(fig.data[1]["x"], json!([3.0, 4.0, 5.0]));
        let last = fig.data[1]["y"][2].as_f64().unwrap();
        assert!((last - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_many_facet_levels_keep_positive_domains() {
        let n = 60;
        let table = Table::new(vec![
            Column::from_f64("x", (0..n).map(|i| i as f64).collect()),
            Column::new("g", (0..n).map(|i| Value::Int(i as i64)).collect()),
        ])
        .unwrap();
        let args = CallArgs::new()
            .with("table", table)
            .with("x", "x")
            .with("y", "x")
            .with("facet_col", "g");
        let fig = PartitionManager::new(resolve(ChartKind::Scatter, args).unwrap())
            .create_figure(&crate::draw::ExpressDraw)
            .unwrap();
        assert_eq!(fig.data.len(), n);

        let mut last_end = 0.0;
        for i in 0..n {
            let axis = if i == 0 { "xaxis".to_string() } else { format!("xaxis{}", i + 1) };
            let domain = fig.layout[&axis]["domain"].as_array().unwrap();
            let (start, end) = (domain[0].as_f64().unwrap(), domain[1].as_f64().unwrap());
            assert!(start < end, "{} has domain {:?}", axis, domain);
            assert!(start >= last_end - 1e-9);
            last_end = end;
        }
        assert!(last_end <= 1.0 + 1e-9);
    }

    #[test]
    fn test_panel_spacing_is_clamped() {
        assert_eq!(panel_spacing(0.02, 1), 0.0);
        assert_eq!(panel_spacing(0.02, 3), 0.02);
        assert_eq!(panel_spacing(0.9, 3), 0.25);
        assert_eq!(panel_spacing(-0.1, 3), 0.0);
    }
}
