use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use gramexpress::{parser, ChartKind, OutputOptions, Table};
use log::{info, warn};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Compact JSON on one line
    Json,
    /// Indented JSON
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "gramexpress")]
#[command(about = "Build Plotly figure JSON from CSV data using a chart call DSL", long_about = None)]
struct Args {
    /// Chart call DSL string (e.g., 'df | histogram(x: [a, b], color: g, nbins: 20)')
    dsl: String,

    /// CSV file to read instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Leave the trace-to-column mappings out of the output
    #[arg(long)]
    no_mappings: bool,
}

fn read_table(input: Option<&PathBuf>) -> Result<Table> {
    let table = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Table::from_csv(file).with_context(|| format!("Failed to read CSV from {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read CSV from stdin")?;
            Table::from_csv(buf.as_slice()).context("Failed to read CSV from stdin")?
        }
    };
    info!(
        "read {} rows x {} columns",
        table.num_rows(),
        table.columns().len()
    );
    Ok(table)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let table = read_table(args.input.as_ref())?;

    // Parse the DSL string
    let call = match parser::parse_pipeline(&args.dsl) {
        Ok((remaining, call)) => {
            if !remaining.trim().is_empty() {
                warn!("unparsed input: '{}'", remaining);
            }
            call
        }
        Err(e) => {
            eprintln!("Parse error: {:?}", e);
            std::process::exit(1);
        }
    };
    let kind = ChartKind::from_name(&call.chart)
        .ok_or_else(|| anyhow!("Unknown chart '{}'", call.chart))?;
    let chart_args = call.to_args().with("table", table);

    let fig = gramexpress::plot(kind, chart_args)
        .with_context(|| format!("Failed to build {} figure", kind.name()))?;

    let options = OutputOptions {
        pretty: args.format == Format::Pretty,
        mappings: !args.no_mappings,
    };
    let json = fig.export(&options).context("Failed to serialize figure")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write figure to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
