// Chart catalog: kinds, capabilities and per-chart defaults

use crate::args::{ArgValue, CallArgs};
use crate::palette::StyleAttr;

/// What a chart kind can do. Dispatch happens by matching on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `x` or `y` may name a list of columns.
    SupportsLists,
    PreprocessHist,
    PreprocessFreq,
    PreprocessViolin,
    PreprocessEcdf,
    PreprocessTime,
    /// Styles are baked into the data as per-row columns, never split by group.
    AlwaysAttached,
    Marker,
    Line,
    Bar,
    Area,
    Scatter,
    Ecdf,
    Scene,
    Polar,
    Ternary,
    Marginals,
    /// Open/high/low/close traces colored by direction.
    Financial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Scatter,
    Scatter3d,
    ScatterPolar,
    ScatterTernary,
    Line,
    Line3d,
    LinePolar,
    LineTernary,
    Area,
    Bar,
    FrequencyBar,
    Histogram,
    Violin,
    Box,
    Strip,
    Ecdf,
    Timeline,
    Funnel,
    Pie,
    FunnelArea,
    Treemap,
    Sunburst,
    Icicle,
    Ohlc,
    Candlestick,
}

impl ChartKind {
    pub const ALL: [ChartKind; 25] = [
        ChartKind::Scatter,
        ChartKind::Scatter3d,
        ChartKind::ScatterPolar,
        ChartKind::ScatterTernary,
        ChartKind::Line,
        ChartKind::Line3d,
        ChartKind::LinePolar,
        ChartKind::LineTernary,
        ChartKind::Area,
        ChartKind::Bar,
        ChartKind::FrequencyBar,
        ChartKind::Histogram,
        ChartKind::Violin,
        ChartKind::Box,
        ChartKind::Strip,
        ChartKind::Ecdf,
        ChartKind::Timeline,
        ChartKind::Funnel,
        ChartKind::Pie,
        ChartKind::FunnelArea,
        ChartKind::Treemap,
        ChartKind::Sunburst,
        ChartKind::Icicle,
        ChartKind::Ohlc,
        ChartKind::Candlestick,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::Scatter => "scatter",
            ChartKind::Scatter3d => "scatter_3d",
            ChartKind::ScatterPolar => "scatter_polar",
            ChartKind::ScatterTernary => "scatter_ternary",
            ChartKind::Line => "line",
            ChartKind::Line3d => "line_3d",
            ChartKind::LinePolar => "line_polar",
            ChartKind::LineTernary => "line_ternary",
            ChartKind::Area => "area",
            ChartKind::Bar => "bar",
            ChartKind::FrequencyBar => "frequency_bar",
            ChartKind::Histogram => "histogram",
            ChartKind::Violin => "violin",
            ChartKind::Box => "box",
            ChartKind::Strip => "strip",
            ChartKind::Ecdf => "ecdf",
            ChartKind::Timeline => "timeline",
            ChartKind::Funnel => "funnel",
            ChartKind::Pie => "pie",
            ChartKind::FunnelArea => "funnel_area",
            ChartKind::Treemap => "treemap",
            ChartKind::Sunburst => "sunburst",
            ChartKind::Icicle => "icicle",
            ChartKind::Ohlc => "ohlc",
            ChartKind::Candlestick => "candlestick",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            ChartKind::Scatter => &[Scatter, SupportsLists, Marginals],
            ChartKind::Scatter3d => &[Scatter, Scene],
            ChartKind::ScatterPolar => &[Scatter, Polar],
            ChartKind::ScatterTernary => &[Scatter, Ternary],
            ChartKind::Line => &[Line, SupportsLists],
            ChartKind::Line3d => &[Line, Scene],
            ChartKind::LinePolar => &[Line, Polar],
            ChartKind::LineTernary => &[Line, Ternary],
            ChartKind::Area => &[Area, Line, SupportsLists],
            ChartKind::Bar => &[Bar, SupportsLists],
            ChartKind::FrequencyBar => &[Bar, SupportsLists, PreprocessFreq],
            ChartKind::Histogram => &[Bar, SupportsLists, PreprocessHist, Marginals],
            ChartKind::Violin | ChartKind::Box | ChartKind::Strip => {
                &[Marker, SupportsLists, PreprocessViolin]
            }
            ChartKind::Ecdf => &[Ecdf, SupportsLists, PreprocessEcdf],
            ChartKind::Timeline => &[Marker, PreprocessTime],
            ChartKind::Funnel => &[Marker, SupportsLists],
            ChartKind::Pie
            | ChartKind::FunnelArea
            | ChartKind::Treemap
            | ChartKind::Sunburst
            | ChartKind::Icicle => &[AlwaysAttached],
            ChartKind::Ohlc | ChartKind::Candlestick => &[Financial],
        }
    }

    pub fn has(self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }

    /// Plotly trace type drawn for this chart.
    pub fn trace_type(self) -> &'static str {
        match self {
            ChartKind::Scatter | ChartKind::Line | ChartKind::Area | ChartKind::Ecdf => "scatter",
            ChartKind::Scatter3d | ChartKind::Line3d => "scatter3d",
            ChartKind::ScatterPolar | ChartKind::LinePolar => "scatterpolar",
            ChartKind::ScatterTernary | ChartKind::LineTernary => "scatterternary",
            ChartKind::Bar | ChartKind::FrequencyBar | ChartKind::Histogram | ChartKind::Timeline => {
                "bar"
            }
            ChartKind::Violin => "violin",
            ChartKind::Box | ChartKind::Strip => "box",
            ChartKind::Funnel => "funnel",
            ChartKind::Pie => "pie",
            ChartKind::FunnelArea => "funnelarea",
            ChartKind::Treemap => "treemap",
            ChartKind::Sunburst => "sunburst",
            ChartKind::Icicle => "icicle",
            ChartKind::Ohlc => "ohlc",
            ChartKind::Candlestick => "candlestick",
        }
    }

    /// Keywords whose values are columns copied into trace properties.
    pub fn data_args(self) -> &'static [&'static str] {
        match self {
            ChartKind::Scatter3d | ChartKind::Line3d => &["x", "y", "z", "text", "hover_name"],
            ChartKind::ScatterPolar | ChartKind::LinePolar => &["r", "theta", "text", "hover_name"],
            ChartKind::ScatterTernary | ChartKind::LineTernary => {
                &["a", "b", "c", "text", "hover_name"]
            }
            ChartKind::Ohlc | ChartKind::Candlestick => {
                &["x", "open", "high", "low", "close", "text", "hover_name"]
            }
            ChartKind::Timeline => &["x_start", "x_diff", "y", "text", "hover_name"],
            ChartKind::Pie | ChartKind::FunnelArea => &["names", "values", "hover_name"],
            ChartKind::Treemap | ChartKind::Sunburst | ChartKind::Icicle => {
                &["names", "values", "parents", "ids", "hover_name"]
            }
            ChartKind::Scatter
            | ChartKind::Line
            | ChartKind::Area
            | ChartKind::Bar => &["x", "y", "error_x", "error_y", "text", "hover_name"],
            _ => &["x", "y", "text", "hover_name"],
        }
    }

    /// Keyword defaults applied before resolution.
    pub fn defaults(self) -> CallArgs {
        let args = CallArgs::new().with("by_vars", vec!["color"]);
        match self {
            ChartKind::Histogram => args
                .with("nbins", 10.0)
                .with("histfunc", "count")
                .with("barmode", "relative")
                .with("bargap", 0.0),
            ChartKind::Violin => args.with("violinmode", "group").with("points", "outliers"),
            ChartKind::Box => args.with("boxmode", "group").with("points", "outliers"),
            ChartKind::Strip => args.with("stripmode", "group").with("points", "all"),
            ChartKind::Ecdf => args
                .with("ecdfnorm", "probability")
                .with("ecdfmode", "standard")
                .with("line_shape", "hv")
                .with("markers", false),
            ChartKind::Bar | ChartKind::FrequencyBar => args.with("barmode", "relative"),
            ChartKind::Line | ChartKind::Area | ChartKind::Line3d | ChartKind::LineTernary => {
                args.with("markers", false)
            }
            ChartKind::LinePolar => args.with("markers", false).with("line_close", false),
            ChartKind::Ohlc | ChartKind::Candlestick => CallArgs::new(),
            _ => args,
        }
    }

    /// Trace properties (dotted paths) receiving a style attribute.
    pub fn style_targets(self, attr: StyleAttr) -> &'static [&'static str] {
        match attr {
            StyleAttr::Color => {
                if self.has(Capability::Financial) {
                    &[]
                } else if self.has(Capability::AlwaysAttached) {
                    &["marker.colors"]
                } else if self.has(Capability::Line) || self.has(Capability::Ecdf) {
                    &["line.color", "marker.color"]
                } else {
                    &["marker.color"]
                }
            }
            StyleAttr::PatternShape => {
                if self.has(Capability::Area) {
                    &["fillpattern.shape"]
                } else if self.has(Capability::Bar) || self.has(Capability::AlwaysAttached) {
                    &["marker.pattern.shape"]
                } else {
                    &[]
                }
            }
            StyleAttr::Symbol => {
                if self.has(Capability::AlwaysAttached) || self.has(Capability::Financial) {
                    &[]
                } else {
                    &["marker.symbol"]
                }
            }
            StyleAttr::LineDash => {
                if self.has(Capability::Line) || self.has(Capability::Ecdf) {
                    &["line.dash"]
                } else {
                    &[]
                }
            }
            StyleAttr::Size if self.has(Capability::Financial) => &[],
            StyleAttr::Size => &["marker.size"],
            StyleAttr::Width => &["line.width"],
        }
    }

    /// The preprocessor family this chart dispatches to, if any.
    pub fn preprocessing(self) -> Option<Capability> {
        [
            Capability::PreprocessHist,
            Capability::PreprocessFreq,
            Capability::PreprocessViolin,
            Capability::PreprocessEcdf,
            Capability::PreprocessTime,
            Capability::AlwaysAttached,
        ]
        .into_iter()
        .find(|c| self.has(*c))
    }

    /// Whether a pivot on this chart should collapse legend group spacing.
    pub fn tight_legend(self) -> bool {
        self.preprocessing().is_some() && !self.has(Capability::AlwaysAttached)
    }

    pub(crate) fn mode(self, args: &CallArgs) -> Option<ArgValue> {
        match self {
            ChartKind::Scatter | ChartKind::Scatter3d | ChartKind::ScatterPolar
            | ChartKind::ScatterTernary => Some("markers".into()),
            ChartKind::Line
            | ChartKind::Line3d
            | ChartKind::LinePolar
            | ChartKind::LineTernary
            | ChartKind::Area
            | ChartKind::Ecdf => {
                if args.bool("markers").unwrap_or(false) {
                    Some("lines+markers".into())
                } else {
                    Some("lines".into())
                }
            }
            _ => None,
        }
    }
}
