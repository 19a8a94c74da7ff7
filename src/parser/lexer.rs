// Lexical building blocks for the chart call DSL

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    number::complete::recognize_float,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse an identifier: a letter or underscore, then letters, digits or underscores
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
        |s: &str| s.to_string(),
    )(input)
}

fn escaped_body<'a>(stop: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    map(
        opt(escaped_transform(
            is_not(stop),
            '\\',
            alt((
                value("\\", char('\\')),
                value("\"", char('"')),
                value("'", char('\'')),
                value("\n", char('n')),
            )),
        )),
        Option::unwrap_or_default,
    )
}

/// Parse a single- or double-quoted string with backslash escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        delimited(char('"'), escaped_body("\"\\"), char('"')),
        delimited(char('\''), escaped_body("'\\"), char('\'')),
    ))(input)
}

/// Parse a number such as `20`, `-1.5` or `1e3`
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, |s: &str| s.parse::<f64>())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("sepal_width)"), Ok((")", "sepal_width".to_string())));
        assert_eq!(identifier("_x1 "), Ok((" ", "_x1".to_string())));
        assert!(identifier("1abc").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"red\""), Ok(("", "red".to_string())));
        assert_eq!(string_literal("'a b'"), Ok(("", "a b".to_string())));
        assert_eq!(string_literal("\"\""), Ok(("", String::new())));
        assert_eq!(
            string_literal(r#""say \"hi\"""#),
            Ok(("", "say \"hi\"".to_string()))
        );
    }

    #[test]
    fn test_string_literal_unclosed() {
        assert!(string_literal("\"red").is_err());
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("20,"), Ok((",", 20.0)));
        assert_eq!(number_literal("-1.5"), Ok(("", -1.5)));
        assert_eq!(number_literal("1e3"), Ok(("", 1000.0)));
        assert!(number_literal("abc").is_err());
    }

    #[test]
    fn test_ws() {
        let mut p = ws(identifier);
        assert_eq!(p("  time  ,"), Ok((",", "time".to_string())));
    }
}
