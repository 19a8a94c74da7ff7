// Style palettes and group-to-style assignment

use crate::args::ArgValue;
use crate::data::{GroupKey, Value};
use crate::error::{ExpressError, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Plotly's default qualitative color sequence.
pub const PLOTLY_COLORS: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

const SYMBOLS: [&str; 8] = [
    "circle",
    "diamond",
    "square",
    "x",
    "cross",
    "triangle-up",
    "triangle-down",
    "pentagon",
];

const PATTERN_SHAPES: [&str; 8] = ["", "/", "\\", "x", "-", "|", "+", "."];

const LINE_DASHES: [&str; 6] = ["solid", "dot", "dash", "longdash", "dashdot", "longdashdot"];

const SIZES: [f64; 7] = [4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0];

const WIDTHS: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

/// A visual attribute that can vary between groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleAttr {
    Color,
    Symbol,
    PatternShape,
    LineDash,
    Size,
    Width,
}

impl StyleAttr {
    pub const ALL: [StyleAttr; 6] = [
        StyleAttr::Color,
        StyleAttr::Size,
        StyleAttr::Symbol,
        StyleAttr::PatternShape,
        StyleAttr::LineDash,
        StyleAttr::Width,
    ];

    /// Keyword naming the column that drives this attribute.
    pub fn arg(self) -> &'static str {
        match self {
            StyleAttr::Color => "color",
            StyleAttr::Symbol => "symbol",
            StyleAttr::PatternShape => "pattern_shape",
            StyleAttr::LineDash => "line_dash",
            StyleAttr::Size => "size",
            StyleAttr::Width => "width",
        }
    }

    pub fn sequence_arg(self) -> &'static str {
        match self {
            StyleAttr::Color => "color_discrete_sequence",
            StyleAttr::Symbol => "symbol_sequence",
            StyleAttr::PatternShape => "pattern_shape_sequence",
            StyleAttr::LineDash => "line_dash_sequence",
            StyleAttr::Size => "size_sequence",
            StyleAttr::Width => "width_sequence",
        }
    }

    pub fn map_arg(self) -> &'static str {
        match self {
            StyleAttr::Color => "color_discrete_map",
            StyleAttr::Symbol => "symbol_map",
            StyleAttr::PatternShape => "pattern_shape_map",
            StyleAttr::LineDash => "line_dash_map",
            StyleAttr::Size => "size_map",
            StyleAttr::Width => "width_map",
        }
    }

    /// Keyword carrying a per-row style column.
    pub fn attached_arg(self) -> &'static str {
        match self {
            StyleAttr::Color => "attached_color",
            StyleAttr::Symbol => "attached_symbol",
            StyleAttr::PatternShape => "attached_pattern_shape",
            StyleAttr::LineDash => "attached_line_dash",
            StyleAttr::Size => "attached_size",
            StyleAttr::Width => "attached_width",
        }
    }

    /// Whether a numeric column may drive the attribute continuously.
    pub fn allows_continuous(self) -> bool {
        matches!(self, StyleAttr::Color | StyleAttr::Size)
    }

    pub fn default_sequence(self) -> Vec<Value> {
        match self {
            StyleAttr::Color => PLOTLY_COLORS.iter().map(|c| Value::from(*c)).collect(),
            StyleAttr::Symbol => SYMBOLS.iter().map(|s| Value::from(*s)).collect(),
            StyleAttr::PatternShape => PATTERN_SHAPES.iter().map(|s| Value::from(*s)).collect(),
            StyleAttr::LineDash => LINE_DASHES.iter().map(|s| Value::from(*s)).collect(),
            StyleAttr::Size => SIZES.iter().map(|s| Value::float(*s)).collect(),
            StyleAttr::Width => WIDTHS.iter().map(|s| Value::float(*s)).collect(),
        }
    }
}

/// The `*_map` keyword after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleMap {
    /// `"by"`: style per group with no overrides.
    By,
    /// `"identity"`: column values are the styles themselves.
    Identity,
    Explicit(IndexMap<String, Value>),
}

impl StyleMap {
    pub fn parse(attr: StyleAttr, value: &ArgValue) -> Result<Self> {
        match value {
            ArgValue::Str(s) if s == "by" => Ok(StyleMap::By),
            ArgValue::Str(s) if s == "identity" => Ok(StyleMap::Identity),
            ArgValue::Map(m) => Ok(StyleMap::Explicit(
                m.iter().map(|(k, v)| (k.clone(), v.to_value())).collect(),
            )),
            other => Err(ExpressError::config(format!(
                "{} must be \"by\", \"identity\" or a mapping, got {:?}",
                attr.map_arg(),
                other
            ))),
        }
    }

    pub fn overrides(&self) -> IndexMap<String, Value> {
        match self {
            StyleMap::Explicit(m) => m.clone(),
            _ => IndexMap::new(),
        }
    }
}

/// Cycles a palette over group keys.
///
/// An assignment is made once per key and never changes afterwards. Every new
/// key takes the next palette slot; keys found in the override map show the
/// override instead, so later keys keep their positional style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleManager {
    sequence: Vec<Value>,
    overrides: IndexMap<String, Value>,
    assigned: HashMap<GroupKey, Value>,
    next: usize,
}

impl StyleManager {
    pub fn new(sequence: Vec<Value>, overrides: IndexMap<String, Value>) -> Result<Self> {
        if sequence.is_empty() {
            return Err(ExpressError::config("style sequence must not be empty"));
        }
        Ok(Self {
            sequence,
            overrides,
            assigned: HashMap::new(),
            next: 0,
        })
    }

    pub fn assign(&mut self, key: &GroupKey) -> Value {
        if let Some(style) = self.assigned.get(key) {
            return style.clone();
        }
        let cycled = &self.sequence[self.next % self.sequence.len()];
        self.next += 1;
        // a singleton key is labelled by its only element
        let style = self
            .overrides
            .get(&key.to_string())
            .unwrap_or(cycled)
            .clone();
        self.assigned.insert(key.clone(), style.clone());
        style
    }
}
