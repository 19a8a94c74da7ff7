// Figure model: Plotly traces and layout plus the mapping back to source columns

use crate::args::{ArgValue, CallArgs};
use crate::chart::{Capability, ChartKind};
use crate::error::Result;
use crate::palette::{StyleAttr, PLOTLY_COLORS};
use crate::OutputOptions;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use std::cell::RefCell;
use std::rc::Rc;

pub type SharedTraceGenerator = Rc<RefCell<TraceGenerator>>;

/// Read a dotted path such as `marker.pattern.shape`.
pub fn get_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

/// Write a dotted path, creating intermediate objects.
pub fn set_path(value: &mut JsonValue, path: &str, new: JsonValue) {
    if !value.is_object() {
        *value = JsonValue::Object(Map::new());
    }
    let JsonValue::Object(obj) = value else {
        return;
    };
    match path.split_once('.') {
        None => {
            obj.insert(path.to_string(), new);
        }
        Some((head, rest)) => {
            let child = obj
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            set_path(child, rest, new);
        }
    }
}

/// Links one trace back to the columns its arrays were read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataMapping {
    pub trace_index: usize,
    /// Trace property path -> source column.
    pub columns: IndexMap<String, String>,
    /// Partition the trace was drawn from, column -> value.
    pub partition: IndexMap<String, JsonValue>,
}

const FINANCIAL_CYCLES: [(&str, &[&str]); 2] = [
    ("increasing_color_sequence", &["increasing.line.color"]),
    ("decreasing_color_sequence", &["decreasing.line.color"]),
];

/// Hands out styles for plain (not group-resolved) sequences, one step per
/// trace, shared by every trace of a chart call.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceGenerator {
    cycles: Vec<StyleCycle>,
}

#[derive(Debug, Clone, PartialEq)]
struct StyleCycle {
    targets: &'static [&'static str],
    values: Vec<JsonValue>,
    next: usize,
}

impl TraceGenerator {
    pub fn new(kind: ChartKind, args: &CallArgs) -> Self {
        let mut cycles = Vec::new();
        // per-row style arrays are never cycled
        if !kind.has(Capability::AlwaysAttached) {
            for attr in StyleAttr::ALL {
                let targets = kind.style_targets(attr);
                if targets.is_empty() {
                    continue;
                }
                let values: Vec<JsonValue> = match args.get(attr.sequence_arg()) {
                    Some(ArgValue::List(items)) => items.iter().map(|v| v.to_json()).collect(),
                    Some(single) => vec![single.to_json()],
                    None if attr == StyleAttr::Color => {
                        PLOTLY_COLORS.iter().map(|c| json!(c)).collect()
                    }
                    None => continue,
                };
                if !values.is_empty() {
                    cycles.push(StyleCycle {
                        targets,
                        values,
                        next: 0,
                    });
                }
            }
        }
        if kind.has(Capability::Financial) {
            for (arg, targets) in FINANCIAL_CYCLES {
                if let Some(ArgValue::List(items)) = args.get(arg) {
                    if !items.is_empty() {
                        cycles.push(StyleCycle {
                            targets,
                            values: items.iter().map(|v| v.to_json()).collect(),
                            next: 0,
                        });
                    }
                }
            }
        }
        Self { cycles }
    }

    pub fn shared(kind: ChartKind, args: &CallArgs) -> SharedTraceGenerator {
        Rc::new(RefCell::new(Self::new(kind, args)))
    }

    /// Advance every cycle and fill the properties the trace leaves unset.
    pub fn fill(&mut self, trace: &mut JsonValue) {
        for cycle in self.cycles.iter_mut() {
            let value = cycle.values[cycle.next % cycle.values.len()].clone();
            cycle.next += 1;
            for target in cycle.targets {
                if get_path(trace, target).is_none() {
                    set_path(trace, target, value.clone());
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Figure {
    pub data: Vec<JsonValue>,
    pub layout: Map<String, JsonValue>,
    pub mappings: Vec<DataMapping>,
    pub has_color: bool,
    pub has_template: bool,
    pub has_subplots: bool,
    pub trace_generator: Option<SharedTraceGenerator>,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trace(
        &mut self,
        trace: JsonValue,
        columns: IndexMap<String, String>,
        partition: IndexMap<String, JsonValue>,
    ) {
        self.mappings.push(DataMapping {
            trace_index: self.data.len(),
            columns,
            partition,
        });
        self.data.push(trace);
    }

    pub fn update_traces<F: FnMut(&mut JsonValue)>(&mut self, mut f: F) {
        for trace in self.data.iter_mut() {
            f(trace);
        }
    }

    /// Set every trace's property at a dotted path.
    pub fn set_traces(&mut self, path: &str, value: JsonValue) {
        self.update_traces(|t| set_path(t, path, value.clone()));
    }

    pub fn update_layout(&mut self, path: &str, value: JsonValue) {
        let mut layout = JsonValue::Object(std::mem::take(&mut self.layout));
        set_path(&mut layout, path, value);
        if let JsonValue::Object(map) = layout {
            self.layout = map;
        }
    }

    pub fn to_json(&self, include_mappings: bool) -> JsonValue {
        let mut out = json!({
            "plotly": {
                "data": self.data,
                "layout": self.layout,
            },
            "is_user_set_template": self.has_template,
            "is_user_set_color": self.has_color,
        });
        if include_mappings {
            out["mappings"] = json!(self.mappings);
        }
        out
    }

    pub fn export(&self, options: &OutputOptions) -> Result<String> {
        let value = self.to_json(options.mappings);
        Ok(if options.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        })
    }
}
