// Chart call parser: name(key: value, ...)

use super::ast::{ChartCall, Literal};
use super::lexer::{identifier, number_literal, string_literal, ws};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{map, opt},
    multi::separated_list0,
    sequence::{delimited, separated_pair, terminated},
    IResult,
};

fn keyword(ident: String) -> Literal {
    match ident.as_str() {
        "true" => Literal::Bool(true),
        "false" => Literal::Bool(false),
        "none" => Literal::None,
        _ => Literal::Column(ident),
    }
}

fn parse_list(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(
            ws(char('[')),
            terminated(
                separated_list0(ws(char(',')), parse_literal),
                opt(ws(char(','))),
            ),
            ws(char(']')),
        ),
        Literal::List,
    )(input)
}

fn parse_map_key(input: &str) -> IResult<&str, String> {
    ws(alt((string_literal, identifier)))(input)
}

fn parse_map(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(
            ws(char('{')),
            terminated(
                separated_list0(
                    ws(char(',')),
                    separated_pair(parse_map_key, ws(char(':')), parse_literal),
                ),
                opt(ws(char(','))),
            ),
            ws(char('}')),
        ),
        Literal::Map,
    )(input)
}

/// Parse one argument value
/// Forms: column, "literal", 20, true, none, [a, b], {A: "red"}
pub fn parse_literal(input: &str) -> IResult<&str, Literal> {
    ws(alt((
        map(string_literal, Literal::Str),
        parse_list,
        parse_map,
        map(number_literal, Literal::Number),
        map(identifier, keyword),
    )))(input)
}

fn parse_argument(input: &str) -> IResult<&str, (String, Literal)> {
    separated_pair(ws(identifier), ws(char(':')), parse_literal)(input)
}

/// Parse a chart call
/// Format: histogram(x: a, color: g, nbins: 20)
pub fn parse_call(input: &str) -> IResult<&str, ChartCall> {
    let (input, chart) = ws(identifier)(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, args) = separated_list0(ws(char(',')), parse_argument)(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((input, ChartCall { chart, args }))
}
