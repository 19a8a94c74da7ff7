// Pipeline parser: optional `df |` source marker followed by one chart call

use super::ast::ChartCall;
use super::call::parse_call;
use super::lexer::ws;
use nom::{
    bytes::complete::tag,
    character::complete::char,
    combinator::opt,
    sequence::{pair, preceded},
    IResult,
};

/// Parse a complete plot expression
/// Format: df | histogram(x: a, nbins: 20), `| scatter(...)` or `scatter(...)`
///
/// Trailing input is returned to the caller unparsed.
pub fn parse_pipeline(input: &str) -> IResult<&str, ChartCall> {
    let (input, _) = opt(pair(opt(ws(tag("df"))), ws(char('|'))))(input)?;
    preceded(opt(ws(char('|'))), parse_call)(input)
}
