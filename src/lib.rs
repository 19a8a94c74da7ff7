// Library exports for gramexpress

pub mod args;
pub mod chart;
pub mod data;
pub mod draw;
pub mod error;
pub mod express;
pub mod figure;
pub mod layer;
pub mod marginal;
pub mod palette;
pub mod parser;
pub mod partition;
pub mod preprocess;
pub mod resolve;

pub use args::{ArgValue, CallArgs};
pub use chart::{Capability, ChartKind};
pub use data::{DataSource, Table, Value};
pub use error::{ErrorCategory, ExpressError, Result};
pub use express::{plot, plot_with, plot_with_update};
pub use figure::Figure;

use serde::Deserialize;

/// Controls how a finished figure is serialized.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputOptions {
    /// Indent the JSON output.
    #[serde(default)]
    pub pretty: bool,
    /// Include the trace-to-column mappings.
    #[serde(default = "default_mappings")]
    pub mappings: bool,
}

fn default_mappings() -> bool { true }

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            mappings: true,
        }
    }
}
