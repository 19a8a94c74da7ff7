// Per-group data preparation ahead of drawing

pub mod attached;
pub mod ecdf;
pub mod freq;
pub mod hist;
pub mod time;
pub mod violin;

use crate::args::CallArgs;
use crate::chart::Capability;
use crate::data::Table;
use crate::error::Result;
use crate::resolve::PlotRequest;

pub use attached::AttachedPreprocesser;
pub use ecdf::EcdfPreprocesser;
pub use freq::FreqPreprocesser;
pub use hist::HistPreprocesser;
pub use time::TimePreprocesser;
pub use violin::ViolinPreprocesser;

/// A group after preprocessing: its table and the argument overrides that
/// point each role (x, y, ...) at the columns of that table.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedGroup {
    pub table: Table,
    pub remap: CallArgs,
}

impl PreprocessedGroup {
    pub fn unchanged(table: Table) -> Self {
        Self {
            table,
            remap: CallArgs::new(),
        }
    }
}

/// The axis carrying the data column of a univariate chart, and the other one.
pub(crate) fn univariate_axes(args: &CallArgs) -> (&'static str, &'static str) {
    if args.contains("x") {
        ("x", "y")
    } else {
        ("y", "x")
    }
}

/// Exactly one preprocessor, chosen from the chart's capabilities.
#[derive(Debug)]
pub enum Preprocesser {
    Passthrough,
    Histogram(HistPreprocesser),
    Frequency(FreqPreprocesser),
    Violin(ViolinPreprocesser),
    Ecdf(EcdfPreprocesser),
    Time(TimePreprocesser),
    Attached(AttachedPreprocesser),
}

impl Preprocesser {
    pub fn for_request(request: &PlotRequest) -> Result<Self> {
        let args = &request.args;
        let preprocesser = match request.kind.preprocessing() {
            Some(Capability::PreprocessHist) => {
                Preprocesser::Histogram(HistPreprocesser::new(args, &request.data)?)
            }
            Some(Capability::PreprocessFreq) => {
                Preprocesser::Frequency(FreqPreprocesser::new(args, &request.data)?)
            }
            Some(Capability::PreprocessViolin) => {
                Preprocesser::Violin(ViolinPreprocesser::new(args))
            }
            Some(Capability::PreprocessEcdf) => {
                Preprocesser::Ecdf(EcdfPreprocesser::new(args, &request.data)?)
            }
            Some(Capability::PreprocessTime) => {
                Preprocesser::Time(TimePreprocesser::new(args, &request.data)?)
            }
            Some(Capability::AlwaysAttached) if !request.attached.is_empty() => {
                Preprocesser::Attached(AttachedPreprocesser::new(request.attached.clone()))
            }
            _ => Preprocesser::Passthrough,
        };
        log::debug!("{} uses {}", request.kind.name(), preprocesser.name());
        Ok(preprocesser)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Preprocesser::Passthrough => "no preprocessing",
            Preprocesser::Histogram(_) => "histogram binning",
            Preprocesser::Frequency(_) => "frequency counts",
            Preprocesser::Violin(_) => "violin reshaping",
            Preprocesser::Ecdf(_) => "ecdf",
            Preprocesser::Time(_) => "time durations",
            Preprocesser::Attached(_) => "attached styles",
        }
    }

    pub fn preprocess(&mut self, table: Table) -> Result<PreprocessedGroup> {
        match self {
            Preprocesser::Passthrough => Ok(PreprocessedGroup::unchanged(table)),
            Preprocesser::Histogram(h) => {
                let mut out = h.preprocess_all(std::slice::from_ref(&table))?;
                Ok(out.remove(0))
            }
            Preprocesser::Frequency(f) => f.preprocess(&table),
            Preprocesser::Violin(v) => v.preprocess(table),
            Preprocesser::Ecdf(e) => e.preprocess(&table),
            Preprocesser::Time(t) => t.preprocess(table),
            Preprocesser::Attached(a) => a.preprocess(table),
        }
    }

    /// Preprocess every group of one chart call.
    ///
    /// Histograms need all groups at once because bar normalization spans
    /// groups; everything else works group by group.
    pub fn preprocess_all(&mut self, groups: Vec<Table>) -> Result<Vec<PreprocessedGroup>> {
        if let Preprocesser::Histogram(h) = self {
            return h.preprocess_all(&groups);
        }
        groups.into_iter().map(|t| self.preprocess(t)).collect()
    }
}
