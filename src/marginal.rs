// Marginal distribution plots beside a main figure

use crate::args::CallArgs;
use crate::chart::ChartKind;
use crate::draw::Draw;
use crate::error::{ExpressError, Result};
use crate::figure::Figure;
use crate::layer::{layer, LayerSpec};
use crate::partition::PartitionManager;
use crate::resolve::resolve;
use serde_json::{json, Map, Value as JsonValue};

/// Main panel extent along an axis that carries a marginal.
const MAIN_Y: [f64; 2] = [0.0, 0.74];
const MAIN_X: [f64; 2] = [0.0, 0.745];
const MARGINAL: [f64; 2] = [0.75, 1.0];

/// Arguments a marginal inherits from the main call.
const INHERITED: [&str; 9] = [
    "table",
    "by",
    "by_vars",
    "color",
    "hover_name",
    "labels",
    "color_discrete_sequence",
    "color_discrete_map",
    "nbins",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginalKind {
    Histogram,
    Violin,
    Box,
    Rug,
}

impl MarginalKind {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "histogram" => Ok(MarginalKind::Histogram),
            "violin" => Ok(MarginalKind::Violin),
            "box" => Ok(MarginalKind::Box),
            "rug" => Ok(MarginalKind::Rug),
            other => Err(ExpressError::config(format!(
                "unknown marginal '{}', expected histogram, violin, box or rug",
                other
            ))),
        }
    }

    pub fn chart(self) -> ChartKind {
        match self {
            MarginalKind::Histogram => ChartKind::Histogram,
            MarginalKind::Violin => ChartKind::Violin,
            MarginalKind::Box => ChartKind::Box,
            MarginalKind::Rug => ChartKind::Strip,
        }
    }
}

/// The subset of `args` a marginal along `var` is drawn from.
pub fn marginal_args(args: &CallArgs, var: &str) -> CallArgs {
    let mut out = CallArgs::new();
    for key in INHERITED {
        if let Some(value) = args.get(key) {
            out.set(key, value.clone());
        }
    }
    if let Some(value) = args.get(var) {
        out.set(var, value.clone());
    }
    out
}

/// Draw one marginal figure for the `var` axis ("x" or "y").
pub fn create_marginal(
    marginal: MarginalKind,
    var: &str,
    args: &CallArgs,
    draw: &dyn Draw,
) -> Result<Figure> {
    let mut margin_args = marginal_args(args, var);
    if marginal == MarginalKind::Histogram {
        margin_args.set("barmode", "overlay");
    }
    log::debug!("drawing {:?} marginal on {}", marginal, var);

    let request = resolve(marginal.chart(), margin_args)?;
    let mut fig = PartitionManager::new(request).create_figure(draw)?;
    fig.set_traces("showlegend", json!(false));
    if marginal == MarginalKind::Rug {
        let symbol = if var == "x" { "line-ns-open" } else { "line-ew-open" };
        fig.set_traces("marker.symbol", json!(symbol));
        fig.set_traces("jitter", json!(0));
    }
    Ok(fig)
}

/// Axis settings hiding the value axis of a marginal.
pub fn marginal_axis_update() -> Map<String, JsonValue> {
    let mut update = Map::new();
    update.insert("title".to_string(), json!({}));
    update.insert("showgrid".to_string(), json!(false));
    update.insert("showline".to_string(), json!(false));
    update.insert("showticklabels".to_string(), json!(false));
    update.insert("ticks".to_string(), json!(""));
    update
}

fn hidden_ticks() -> Map<String, JsonValue> {
    let mut update = Map::new();
    update.insert("showticklabels".to_string(), json!(false));
    update
}

/// Place `main` and up to two marginals into one figure.
///
/// The x marginal sits above the main panel and shares its x axis, the y
/// marginal sits to the right and shares its y axis.
pub fn attach_marginals(main: Figure, x: Option<Figure>, y: Option<Figure>) -> Result<Figure> {
    if x.is_none() && y.is_none() {
        return Ok(main);
    }
    let main_x = if y.is_some() { MAIN_X } else { [0.0, 1.0] };
    let main_y = if x.is_some() { MAIN_Y } else { [0.0, 1.0] };

    let mut figs = vec![main];
    let mut specs = vec![LayerSpec {
        x: Some(main_x),
        y: Some(main_y),
        match_x: Some("x".to_string()),
        match_y: Some("y".to_string()),
        ..Default::default()
    }];
    if let Some(fig) = x {
        figs.push(fig);
        specs.push(LayerSpec {
            x: Some(main_x),
            y: Some(MARGINAL),
            xaxis_update: Some(hidden_ticks()),
            yaxis_update: Some(marginal_axis_update()),
            match_x: Some("x".to_string()),
            match_y: None,
        });
    }
    if let Some(fig) = y {
        figs.push(fig);
        specs.push(LayerSpec {
            x: Some(MARGINAL),
            y: Some(main_y),
            xaxis_update: Some(marginal_axis_update()),
            yaxis_update: Some(hidden_ticks()),
            match_x: None,
            match_y: Some("y".to_string()),
        });
    }
    layer(figs, None, Some(&specs))
}
