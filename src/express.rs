// Public chart functions

use crate::args::{ArgValue, CallArgs};
use crate::chart::{Capability, ChartKind};
use crate::draw::{Draw, ExpressDraw};
use crate::error::{ExpressError, Result};
use crate::figure::Figure;
use crate::marginal::{attach_marginals, create_marginal, MarginalKind};
use crate::partition::PartitionManager;
use crate::preprocess::univariate_axes;
use crate::resolve::resolve;

#[derive(Debug, Default)]
struct Marginals {
    x: Option<MarginalKind>,
    y: Option<MarginalKind>,
}

/// Pull the marginal keywords out of `args`.
fn take_marginals(kind: ChartKind, args: &mut CallArgs) -> Result<Marginals> {
    let mut marginals = Marginals::default();
    let shared = args.remove("marginal");
    let x = args.remove("marginal_x");
    let y = args.remove("marginal_y");
    if shared.is_none() && x.is_none() && y.is_none() {
        return Ok(marginals);
    }
    if !kind.has(Capability::Marginals) {
        return Err(ExpressError::config(format!(
            "{} does not support marginals",
            kind.name()
        )));
    }

    let parse = |value: Option<ArgValue>, key: &str| -> Result<Option<MarginalKind>> {
        match value {
            None => Ok(None),
            Some(v) => match v.as_str() {
                Some(name) => MarginalKind::parse(name).map(Some),
                None => Err(ExpressError::config(format!("{} must be a string", key))),
            },
        }
    };

    if kind.preprocessing().is_some() {
        // univariate charts take a single `marginal` along their data axis
        if x.is_some() || y.is_some() {
            return Err(ExpressError::config(format!(
                "{} takes `marginal`, not `marginal_x`/`marginal_y`",
                kind.name()
            )));
        }
        let marginal = parse(shared, "marginal")?;
        match univariate_axes(args).0 {
            "x" => marginals.x = marginal,
            _ => marginals.y = marginal,
        }
    } else {
        if shared.is_some() {
            return Err(ExpressError::config(format!(
                "{} takes `marginal_x`/`marginal_y`, not `marginal`",
                kind.name()
            )));
        }
        marginals.x = parse(x, "marginal_x")?;
        marginals.y = parse(y, "marginal_y")?;
    }
    Ok(marginals)
}

/// Build a figure for `kind` with the Plotly-JSON trace builder.
pub fn plot(kind: ChartKind, args: CallArgs) -> Result<Figure> {
    plot_with(kind, args, &ExpressDraw)
}

/// Build a figure for `kind`, drawing every group with `draw`.
///
/// Steps:
/// 1. Split off marginal keywords
/// 2. Resolve arguments into a request and draw the main figure per group
/// 3. Draw and attach the marginals, if any
pub fn plot_with(kind: ChartKind, mut args: CallArgs, draw: &dyn Draw) -> Result<Figure> {
    let marginals = take_marginals(kind, &mut args)?;

    let request = resolve(kind, args.clone())?;
    let main = PartitionManager::new(request).create_figure(draw)?;
    let has_color = main.has_color;

    let x = marginals
        .x
        .map(|m| create_marginal(m, "x", &args, draw))
        .transpose()?;
    let y = marginals
        .y
        .map(|m| create_marginal(m, "y", &args, draw))
        .transpose()?;

    let mut fig = attach_marginals(main, x, y)?;
    fig.has_color = has_color;
    Ok(fig)
}

/// Build a figure and hand it to `update` before returning it.
pub fn plot_with_update<F>(kind: ChartKind, args: CallArgs, update: F) -> Result<Figure>
where
    F: FnOnce(&mut Figure),
{
    let mut fig = plot(kind, args)?;
    update(&mut fig);
    Ok(fig)
}

macro_rules! chart_fns {
    ($($(#[$doc:meta])* $name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(args: CallArgs) -> Result<Figure> {
                plot(ChartKind::$kind, args)
            }
        )*
    };
}

chart_fns! {
    /// Markers at `x`/`y`; `y` may list several columns.
    scatter => Scatter,
    scatter_3d => Scatter3d,
    scatter_polar => ScatterPolar,
    scatter_ternary => ScatterTernary,
    line => Line,
    line_3d => Line3d,
    /// Line through `r`/`theta`; `line_close` joins the last point to the first.
    line_polar => LinePolar,
    line_ternary => LineTernary,
    /// Stacked filled lines.
    area => Area,
    bar => Bar,
    /// Bars of row counts per distinct value.
    frequency_bar => FrequencyBar,
    /// Binned aggregate of `x` (or `y`), see `histfunc` and `histnorm`.
    histogram => Histogram,
    violin => Violin,
    box_plot => Box,
    strip => Strip,
    /// Empirical cumulative distribution.
    ecdf => Ecdf,
    /// Horizontal bars from `x_start` to `x_end`.
    timeline => Timeline,
    funnel => Funnel,
    pie => Pie,
    funnel_area => FunnelArea,
    treemap => Treemap,
    sunburst => Sunburst,
    icicle => Icicle,
    /// Open/high/low/close ticks at `x`.
    ohlc => Ohlc,
    candlestick => Candlestick,
}
