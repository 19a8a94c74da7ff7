// Drawing: one group's table and arguments into a figure fragment

use crate::args::CallArgs;
use crate::chart::{Capability, ChartKind};
use crate::data::{Table, Value};
use crate::error::Result;
use crate::figure::{set_path, Figure, SharedTraceGenerator, TraceGenerator};
use crate::palette::StyleAttr;
use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};

/// Largest marker size when size follows a numeric column.
const SIZE_MAX: f64 = 20.0;

/// Everything a draw function sees for one group.
pub struct DrawCall<'a> {
    pub kind: ChartKind,
    pub args: &'a CallArgs,
    pub table: &'a Table,
    /// Styles resolved for this group.
    pub styles: &'a [(StyleAttr, Value)],
    /// The group's partition, column -> value.
    pub partition: &'a IndexMap<String, Value>,
    /// Partition columns that name the trace in the legend.
    pub legend_columns: &'a [String],
    /// Generator created by the first group of the call, if any.
    pub trace_generator: Option<SharedTraceGenerator>,
}

/// Turns a group into a figure fragment.
pub trait Draw {
    fn draw(&self, call: DrawCall<'_>) -> Result<Figure>;
}

/// Builds Plotly JSON traces.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressDraw;

impl Draw for ExpressDraw {
    fn draw(&self, call: DrawCall<'_>) -> Result<Figure> {
        generate_figure(call)
    }
}

/// Trace property a data keyword lands in.
fn trace_property(arg: &str) -> &str {
    match arg {
        "hover_name" => "hovertext",
        "names" => "labels",
        "x_start" => "base",
        "x_diff" => "x",
        "error_x" => "error_x.array",
        "error_y" => "error_y.array",
        other => other,
    }
}

/// Hover placeholder for a trace property.
fn hover_placeholder(prop: &str) -> String {
    match prop {
        "labels" => "%{label}".to_string(),
        other => format!("%{{{}}}", other),
    }
}

/// Display label of a column, honoring the `labels` keyword.
fn label_for(args: &CallArgs, column: &str) -> String {
    args.get("labels")
        .and_then(|l| l.as_map())
        .and_then(|m| m.get(column))
        .and_then(|v| v.as_str())
        .unwrap_or(column)
        .to_string()
}

fn axis_title(args: &CallArgs, axis: &str) -> Option<String> {
    args.str(&format!("{}_title", axis))
        .map(str::to_string)
        .or_else(|| args.str(axis).map(|c| label_for(args, c)))
}

fn legend_name(call: &DrawCall<'_>) -> String {
    call.legend_columns
        .iter()
        .filter_map(|c| call.partition.get(c))
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_trace(call: &DrawCall<'_>) -> Result<(JsonValue, IndexMap<String, String>)> {
    let (kind, args, table) = (call.kind, call.args, call.table);
    let mut trace = json!({ "type": kind.trace_type() });
    let mut columns = IndexMap::new();

    for arg in kind.data_args() {
        let Some(col) = args.str(arg) else {
            continue;
        };
        let prop = trace_property(arg);
        set_path(&mut trace, prop, JsonValue::Array(table.json_values(col)?));
        columns.insert(prop.to_string(), col.to_string());
    }

    for attr in StyleAttr::ALL {
        if let Some(col) = args.str(attr.attached_arg()) {
            let values = JsonValue::Array(table.json_values(col)?);
            for target in kind.style_targets(attr) {
                set_path(&mut trace, target, values.clone());
                columns.insert(target.to_string(), col.to_string());
            }
        }
    }

    // only continuous styles are still named by column here
    if let Some(col) = args.str(StyleAttr::Color.arg()) {
        set_path(&mut trace, "marker.color", JsonValue::Array(table.json_values(col)?));
        set_path(&mut trace, "marker.coloraxis", json!("coloraxis"));
        columns.insert("marker.color".to_string(), col.to_string());
    }
    if let Some(col) = args.str(StyleAttr::Size.arg()) {
        let sizes = table.f64_values(col)?;
        let max = sizes.iter().flatten().copied().fold(0.0, f64::max);
        set_path(&mut trace, "marker.size", JsonValue::Array(table.json_values(col)?));
        set_path(&mut trace, "marker.sizemode", json!("area"));
        if max > 0.0 {
            set_path(&mut trace, "marker.sizeref", json!(2.0 * max / (SIZE_MAX * SIZE_MAX)));
        }
        columns.insert("marker.size".to_string(), col.to_string());
    }

    for (attr, value) in call.styles {
        for target in kind.style_targets(*attr) {
            set_path(&mut trace, target, value.to_json());
        }
    }

    let name = legend_name(call);
    if !kind.has(Capability::AlwaysAttached) {
        if name.is_empty() {
            trace["showlegend"] = json!(false);
        } else {
            trace["name"] = json!(name);
            trace["legendgroup"] = json!(name);
            trace["showlegend"] = json!(true);
        }
    }

    let mut hover: Vec<String> = call
        .partition
        .iter()
        .map(|(col, v)| format!("{}={}", label_for(args, col), v))
        .collect();
    for (prop, col) in &columns {
        if prop.contains('.') {
            continue;
        }
        let label = match prop.as_str() {
            "x" | "y" => axis_title(args, prop).unwrap_or_else(|| col.clone()),
            _ => label_for(args, col),
        };
        hover.push(format!("{}={}", label, hover_placeholder(prop)));
    }
    trace["hovertemplate"] = json!(format!("{}<extra></extra>", hover.join("<br>")));

    if let Some(mode) = kind.mode(args) {
        trace["mode"] = mode.to_json();
    }
    if let Some(orientation) = args.str("orientation") {
        trace["orientation"] = json!(orientation);
    }
    if let Some(shape) = args.str("line_shape") {
        set_path(&mut trace, "line.shape", json!(shape));
    }
    if kind.has(Capability::Bar) || kind.has(Capability::Marker) {
        if !name.is_empty() {
            trace["offsetgroup"] = json!(name);
        }
        trace["alignmentgroup"] = json!("True");
    }

    match kind {
        ChartKind::Area => {
            trace["stackgroup"] = json!("1");
        }
        ChartKind::Violin => {
            trace["points"] = args.get("points").map(|p| p.to_json()).unwrap_or(json!(false));
            set_path(&mut trace, "box.visible", json!(args.bool("box").unwrap_or(false)));
            if !name.is_empty() {
                trace["scalegroup"] = json!(name);
            }
        }
        ChartKind::Box => {
            trace["boxpoints"] = args.get("points").map(|p| p.to_json()).unwrap_or(json!(false));
            if let Some(notched) = args.bool("notched") {
                trace["notched"] = json!(notched);
            }
        }
        ChartKind::Strip => {
            trace["boxpoints"] = json!("all");
            trace["pointpos"] = json!(0);
            trace["hoveron"] = json!("points");
            trace["fillcolor"] = json!("rgba(255,255,255,0)");
            set_path(&mut trace, "line.color", json!("rgba(255,255,255,0)"));
        }
        ChartKind::Timeline => {
            trace["orientation"] = json!("h");
        }
        ChartKind::LinePolar if args.bool("line_close").unwrap_or(false) => {
            for prop in ["r", "theta"] {
                if let Some(JsonValue::Array(values)) = trace.get_mut(prop) {
                    if let Some(first) = values.first().cloned() {
                        values.push(first);
                    }
                }
            }
        }
        _ => {}
    }

    Ok((trace, columns))
}

fn build_layout(call: &DrawCall<'_>) -> JsonValue {
    let (kind, args) = (call.kind, call.args);
    let mut layout = json!({});

    if kind.has(Capability::Scene) {
        set_path(&mut layout, "scene.domain", json!({"x": [0.0, 1.0], "y": [0.0, 1.0]}));
        for axis in ["x", "y", "z"] {
            if let Some(title) = axis_title(args, axis) {
                set_path(&mut layout, &format!("scene.{}axis.title.text", axis), json!(title));
            }
        }
    } else if kind.has(Capability::Polar) {
        set_path(&mut layout, "polar.domain", json!({"x": [0.0, 1.0], "y": [0.0, 1.0]}));
        let direction = args.str("direction").unwrap_or("clockwise");
        let rotation = args.f64("start_angle").unwrap_or(90.0);
        set_path(&mut layout, "polar.angularaxis.direction", json!(direction));
        set_path(&mut layout, "polar.angularaxis.rotation", json!(rotation));
    } else if kind.has(Capability::Ternary) {
        set_path(&mut layout, "ternary.domain", json!({"x": [0.0, 1.0], "y": [0.0, 1.0]}));
        for axis in ["a", "b", "c"] {
            if let Some(col) = args.str(axis) {
                set_path(
                    &mut layout,
                    &format!("ternary.{}axis.title.text", axis),
                    json!(label_for(args, col)),
                );
            }
        }
    } else if !kind.has(Capability::AlwaysAttached) {
        for (axis, other) in [("x", "y"), ("y", "x")] {
            let key = format!("{}axis", axis);
            set_path(&mut layout, &format!("{}.anchor", key), json!(other));
            set_path(&mut layout, &format!("{}.domain", key), json!([0.0, 1.0]));
            let title = if kind == ChartKind::Timeline && axis == "x" {
                None
            } else {
                axis_title(args, axis)
            };
            if let Some(title) = title {
                set_path(&mut layout, &format!("{}.title.text", key), json!(title));
            }
            if args.bool(&format!("log_{}", axis)).unwrap_or(false) {
                set_path(&mut layout, &format!("{}.type", key), json!("log"));
            }
            if let Some(range) = args.get(&format!("range_{}", axis)) {
                set_path(&mut layout, &format!("{}.range", key), range.to_json());
            }
        }
        if kind == ChartKind::Timeline {
            set_path(&mut layout, "xaxis.type", json!("date"));
        }
        if kind.has(Capability::Financial) {
            set_path(&mut layout, "xaxis.rangeslider.visible", json!(false));
        }
    }

    let legend: Vec<String> = call
        .legend_columns
        .iter()
        .map(|c| label_for(args, c))
        .collect();
    if !legend.is_empty() {
        set_path(&mut layout, "legend.title.text", json!(legend.join(", ")));
    }

    if let Some(col) = args.str(StyleAttr::Color.arg()) {
        set_path(&mut layout, "coloraxis.colorbar.title.text", json!(label_for(args, col)));
    }

    for key in ["barmode", "bargap", "violinmode", "boxmode"] {
        if let Some(value) = args.get(key) {
            layout[key] = value.to_json();
        }
    }
    if kind == ChartKind::Strip {
        if let Some(mode) = args.get("stripmode") {
            layout["boxmode"] = mode.to_json();
        }
    }
    if let Some(title) = args.str("title") {
        set_path(&mut layout, "title.text", json!(title));
    }
    if let Some(template) = args.str("template") {
        layout["template"] = json!(template);
    }
    layout
}

/// Draw one group and apply the call's shared trace generator.
pub fn generate_figure(call: DrawCall<'_>) -> Result<Figure> {
    let (mut trace, columns) = build_trace(&call)?;
    let trace_generator = call
        .trace_generator
        .clone()
        .unwrap_or_else(|| TraceGenerator::shared(call.kind, call.args));
    trace_generator.borrow_mut().fill(&mut trace);

    let mut fig = Figure::new();
    if let JsonValue::Object(layout) = build_layout(&call) {
        fig.layout = layout;
    }
    fig.add_trace(
        trace,
        columns,
        call.partition
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    );
    fig.has_template = call.args.contains("template");
    fig.trace_generator = Some(trace_generator);
    Ok(fig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::from_f64("t", vec![1.0, 2.0]),
            Column::from_f64("v", vec![3.0, 4.0]),
        ])
        .unwrap()
    }

    fn call<'a>(
        kind: ChartKind,
        args: &'a CallArgs,
        table: &'a Table,
        styles: &'a [(StyleAttr, Value)],
        partition: &'a IndexMap<String, Value>,
        legend: &'a [String],
    ) -> DrawCall<'a> {
        DrawCall {
            kind,
            args,
            table,
            styles,
            partition,
            legend_columns: legend,
            trace_generator: None,
        }
    }

    #[test]
    fn test_scatter_trace() {
        let args = CallArgs::new().with("x", "t").with("y", "v");
        let t = table();
        let partition = IndexMap::new();
        let fig = generate_figure(call(ChartKind::Scatter, &args, &t, &[], &partition, &[])).unwrap();
        let trace = &fig.data[0];
        assert_eq!(trace["type"], json!("scatter"));
        assert_eq!(trace["mode"], json!("markers"));
        assert_eq!(trace["x"], json!([1.0, 2.0]));
        assert_eq!(trace["showlegend"], json!(false));
        assert_eq!(trace["hovertemplate"], json!("t=%{x}<br>v=%{y}<extra></extra>"));
        assert_eq!(trace["marker"]["color"], json!("#636efa"));
        assert_eq!(fig.layout["xaxis"]["title"]["text"], json!("t"));
        assert_eq!(fig.mappings[0].columns["y"], "v");
        assert!(fig.trace_generator.is_some());
    }

    #[test]
    fn test_group_style_and_legend() {
        let args = CallArgs::new().with("x", "t").with("y", "v");
        let t = table();
        let mut partition = IndexMap::new();
        partition.insert("g".to_string(), Value::from("A"));
        let styles = [(StyleAttr::Color, Value::from("red"))];
        let legend = ["g".to_string()];
        let fig = generate_figure(call(ChartKind::Line, &args, &t, &styles, &partition, &legend)).unwrap();
        let trace = &fig.data[0];
        assert_eq!(trace["name"], json!("A"));
        assert_eq!(trace["line"]["color"], json!("red"));
        assert_eq!(trace["marker"]["color"], json!("red"));
        assert_eq!(trace["mode"], json!("lines"));
        assert_eq!(fig.layout["legend"]["title"]["text"], json!("g"));
        assert_eq!(fig.mappings[0].partition["g"], json!("A"));
    }

    #[test]
    fn test_labels_rename_hover_and_axes() {
        let args = CallArgs::new()
            .with("x", "t")
            .with("y", "v")
            .with("labels", vec![("t", "time")]);
        let t = table();
        let partition = IndexMap::new();
        let fig = generate_figure(call(ChartKind::Bar, &args, &t, &[], &partition, &[])).unwrap();
        assert_eq!(fig.layout["xaxis"]["title"]["text"], json!("time"));
        assert_eq!(
            fig.data[0]["hovertemplate"],
            json!("time=%{x}<br>v=%{y}<extra></extra>")
        );
    }

    #[test]
    fn test_closed_polar_line() {
        let args = CallArgs::new()
            .with("r", "v")
            .with("theta", "t")
            .with("line_close", true)
            .with("direction", "counterclockwise");
        let t = table();
        let partition = IndexMap::new();
        let fig = generate_figure(call(ChartKind::LinePolar, &args, &t, &[], &partition, &[])).unwrap();
        let trace = &fig.data[0];
        assert_eq!(trace["type"], json!("scatterpolar"));
        assert_eq!(trace["mode"], json!("lines"));
        assert_eq!(trace["r"], json!([3.0, 4.0, 3.0]));
        assert_eq!(trace["theta"], json!([1.0, 2.0, 1.0]));
        assert_eq!(fig.layout["polar"]["angularaxis"]["direction"], json!("counterclockwise"));
        assert_eq!(fig.layout["polar"]["angularaxis"]["rotation"], json!(90.0));
    }

    #[test]
    fn test_candlestick_trace() {
        let t = Table::new(vec![
            Column::from_strs("day", &["mon", "tue"]),
            Column::from_f64("o", vec![1.0, 2.0]),
            Column::from_f64("h", vec![3.0, 4.0]),
            Column::from_f64("l", vec![0.5, 1.5]),
            Column::from_f64("c", vec![2.0, 1.8]),
        ])
        .unwrap();
        let args = CallArgs::new()
            .with("x", "day")
            .with("open", "o")
            .with("high", "h")
            .with("low", "l")
            .with("close", "c")
            .with("increasing_color_sequence", vec!["green"]);
        let partition = IndexMap::new();
        let fig =
            generate_figure(call(ChartKind::Candlestick, &args, &t, &[], &partition, &[])).unwrap();
        let trace = &fig.data[0];
        assert_eq!(trace["type"], json!("candlestick"));
        assert_eq!(trace["close"], json!([2.0, 1.8]));
        assert_eq!(trace["increasing"]["line"]["color"], json!("green"));
        assert!(trace.get("marker").is_none());
        assert!(trace.get("decreasing").is_none());
        assert_eq!(fig.layout["xaxis"]["rangeslider"]["visible"], json!(false));
        assert_eq!(fig.mappings[0].columns["open"], "o");
    }

    #[test]
    fn test_attached_colors_on_pie() {
        let t = Table::new(vec![
            Column::from_strs("n", &["a", "b"]),
            Column::from_f64("v", vec![1.0, 2.0]),
            Column::from_strs("c", &["red", "blue"]),
        ])
        .unwrap();
        let args = CallArgs::new()
            .with("names", "n")
            .with("values", "v")
            .with("attached_color", "c");
        let partition = IndexMap::new();
        let fig = generate_figure(call(ChartKind::Pie, &args, &t, &[], &partition, &[])).unwrap();
        let trace = &fig.data[0];
        assert_eq!(trace["labels"], json!(["a", "b"]));
        assert_eq!(trace["marker"]["colors"], json!(["red", "blue"]));
        assert!(trace.get("showlegend").is_none());
        assert!(fig.layout.get("xaxis").is_none());
    }
}
