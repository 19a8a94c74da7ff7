// Layering: merge figure fragments, optionally into separate panels

use crate::error::{ExpressError, Result};
use crate::figure::{DataMapping, Figure};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;

/// Axis-like layout objects and the trace field referencing them.
const SUBPLOT_KINDS: [(&str, &str); 3] = [("scene", "scene"), ("polar", "subplot"), ("ternary", "subplot")];

/// Trace types drawn on x/y axes.
const CARTESIAN: [&str; 6] = ["scatter", "bar", "violin", "box", "funnel", "histogram"];

/// Trace types positioned by their own `domain`.
const DOMAIN_TRACES: [&str; 5] = ["pie", "funnelarea", "treemap", "sunburst", "icicle"];

/// Where one fragment goes when layered into panels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSpec {
    /// Horizontal sub-range of the figure, `[0, 1]` when unset.
    pub x: Option<[f64; 2]>,
    /// Vertical sub-range of the figure, `[0, 1]` when unset.
    pub y: Option<[f64; 2]>,
    pub xaxis_update: Option<Map<String, JsonValue>>,
    pub yaxis_update: Option<Map<String, JsonValue>>,
    /// Panels sharing a key get matched x axes.
    pub match_x: Option<String>,
    /// Panels sharing a key get matched y axes.
    pub match_y: Option<String>,
}

impl LayerSpec {
    pub fn new(x: Option<[f64; 2]>, y: Option<[f64; 2]>) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }
}

/// Scale `[a, b]` (fractions of a panel) into `target`.
fn rescale(domain: Option<&JsonValue>, target: Option<[f64; 2]>) -> JsonValue {
    let [a, b] = domain
        .and_then(|d| d.as_array())
        .and_then(|d| match d.as_slice() {
            [a, b] => Some([a.as_f64()?, b.as_f64()?]),
            _ => None,
        })
        .unwrap_or([0.0, 1.0]);
    match target {
        Some([lo, hi]) => json!([lo + a * (hi - lo), lo + b * (hi - lo)]),
        None => json!([a, b]),
    }
}

fn is_numbered(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .map(|rest| rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Number of panels a figure already spans.
fn panel_count(fig: &Figure) -> usize {
    let axes = fig.layout.keys().filter(|k| is_numbered(k, "xaxis")).count();
    let subplots = fig
        .layout
        .keys()
        .filter(|k| SUBPLOT_KINDS.iter().any(|(prefix, _)| is_numbered(k, prefix)))
        .count();
    axes + subplots
}

fn trace_type(trace: &JsonValue) -> &str {
    trace.get("type").and_then(|t| t.as_str()).unwrap_or("scatter")
}

/// The subplot object a non-cartesian trace type lives in.
fn subplot_of(ty: &str) -> Option<(&'static str, &'static str)> {
    if ty.ends_with("3d") {
        Some(SUBPLOT_KINDS[0])
    } else if ty.contains("polar") {
        Some(SUBPLOT_KINDS[1])
    } else if ty.contains("ternary") {
        Some(SUBPLOT_KINDS[2])
    } else {
        None
    }
}

fn suffix(panel: usize) -> String {
    if panel == 1 {
        String::new()
    } else {
        panel.to_string()
    }
}

/// Point a single-panel axis reference (`x`, `y`) at the renumbered axis.
fn renumber_ref(value: &JsonValue, sfx: &str) -> JsonValue {
    match value.as_str() {
        Some("x") => json!(format!("x{}", sfx)),
        Some("y") => json!(format!("y{}", sfx)),
        _ => value.clone(),
    }
}

/// Merge fragments into one figure.
///
/// Without `specs` traces are concatenated and the layout is taken from
/// `which_layout` (or merged, later fragments winning). With `specs` every
/// fragment becomes its own panel: axes are renumbered, domains rescaled
/// into the spec's sub-rectangle and trace references rewired.
pub fn layer(figs: Vec<Figure>, which_layout: Option<usize>, specs: Option<&[LayerSpec]>) -> Result<Figure> {
    match specs {
        Some(specs) => layer_panels(figs, specs),
        None => {
            log::debug!("layering {} fragments", figs.len());
            let mut out = Figure::new();
            match which_layout {
                Some(i) => {
                    if let Some(fig) = figs.get(i) {
                        out.layout = fig.layout.clone();
                    }
                }
                None => {
                    for fig in &figs {
                        for (k, v) in &fig.layout {
                            out.layout.insert(k.clone(), v.clone());
                        }
                    }
                }
            }
            for fig in figs {
                append(&mut out, fig.data, fig.mappings);
                out.has_color |= fig.has_color;
                out.has_template |= fig.has_template;
                out.has_subplots |= fig.has_subplots;
                if out.trace_generator.is_none() {
                    out.trace_generator = fig.trace_generator;
                }
            }
            Ok(out)
        }
    }
}

fn append(out: &mut Figure, data: Vec<JsonValue>, mappings: Vec<DataMapping>) {
    let offset = out.data.len();
    out.data.extend(data);
    out.mappings.extend(mappings.into_iter().map(|mut m| {
        m.trace_index += offset;
        m
    }));
}

fn layer_panels(figs: Vec<Figure>, specs: &[LayerSpec]) -> Result<Figure> {
    if figs.len() != specs.len() {
        return Err(ExpressError::config(format!(
            "{} figures but {} layer specs",
            figs.len(),
            specs.len()
        )));
    }
    if figs.iter().any(|f| f.has_subplots || panel_count(f) > 1) {
        return Err(ExpressError::UnsupportedComposition);
    }
    log::debug!("layering {} fragments into panels", figs.len());

    let mut out = Figure::new();
    let mut matched_x: HashMap<String, String> = HashMap::new();
    let mut matched_y: HashMap<String, String> = HashMap::new();

    for (i, (fig, spec)) in figs.into_iter().zip(specs).enumerate() {
        let sfx = suffix(i + 1);
        let cartesian = fig.layout.contains_key("xaxis")
            || fig.data.iter().any(|t| CARTESIAN.contains(&trace_type(t)));

        for (key, value) in &fig.layout {
            if key == "xaxis" || key == "yaxis" || SUBPLOT_KINDS.iter().any(|(k, _)| k == key) {
                continue;
            }
            if !out.layout.contains_key(key) {
                out.layout.insert(key.clone(), value.clone());
            }
        }

        if cartesian {
            for (axis, other, target, update, match_key, matched) in [
                ("x", "y", spec.x, &spec.xaxis_update, &spec.match_x, &mut matched_x),
                ("y", "x", spec.y, &spec.yaxis_update, &spec.match_y, &mut matched_y),
            ] {
                let mut obj = fig
                    .layout
                    .get(&format!("{}axis", axis))
                    .and_then(|a| a.as_object())
                    .cloned()
                    .unwrap_or_default();
                for field in ["overlaying", "matches", "scaleanchor"] {
                    if let Some(v) = obj.get(field).map(|v| renumber_ref(v, &sfx)) {
                        obj.insert(field.to_string(), v);
                    }
                }
                let domain = rescale(obj.get("domain"), target);
                obj.insert("domain".to_string(), domain);
                obj.insert("anchor".to_string(), json!(format!("{}{}", other, sfx)));
                if let Some(update) = update {
                    for (k, v) in update {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                let axis_ref = format!("{}{}", axis, sfx);
                if let Some(group) = match_key {
                    match matched.get(group) {
                        Some(first) => {
                            obj.insert("matches".to_string(), json!(first));
                        }
                        None => {
                            matched.insert(group.clone(), axis_ref.clone());
                        }
                    }
                }
                out.layout.insert(format!("{}axis{}", axis, sfx), JsonValue::Object(obj));
            }
        }

        for (kind, _) in SUBPLOT_KINDS {
            if let Some(JsonValue::Object(subplot)) = fig.layout.get(kind) {
                let mut subplot = subplot.clone();
                let domain = subplot.get("domain").cloned().unwrap_or(json!({}));
                subplot.insert(
                    "domain".to_string(),
                    json!({
                        "x": rescale(domain.get("x"), spec.x),
                        "y": rescale(domain.get("y"), spec.y),
                    }),
                );
                out.layout.insert(format!("{}{}", kind, sfx), JsonValue::Object(subplot));
            }
        }

        let mut data = fig.data;
        for trace in data.iter_mut() {
            let ty = trace_type(trace).to_string();
            if CARTESIAN.contains(&ty.as_str()) {
                trace["xaxis"] = json!(format!("x{}", sfx));
                trace["yaxis"] = json!(format!("y{}", sfx));
            } else if DOMAIN_TRACES.contains(&ty.as_str()) {
                let domain = trace.get("domain").cloned().unwrap_or(json!({}));
                trace["domain"] = json!({
                    "x": rescale(domain.get("x"), spec.x),
                    "y": rescale(domain.get("y"), spec.y),
                });
            } else if let Some((kind, field)) = subplot_of(&ty) {
                trace[field] = json!(format!("{}{}", kind, sfx));
            }
        }

        append(&mut out, data, fig.mappings);
        out.has_color |= fig.has_color;
        out.has_template |= fig.has_template;
        if out.trace_generator.is_none() {
            out.trace_generator = fig.trace_generator;
        }
    }

    out.has_subplots = true;
    Ok(out)
}
