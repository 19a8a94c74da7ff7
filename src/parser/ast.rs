// Abstract Syntax Tree for the chart call DSL

use crate::args::{ArgValue, CallArgs};
use indexmap::IndexMap;

/// One chart call: `histogram(x: a, nbins: 20)`
#[derive(Debug, Clone, PartialEq)]
pub struct ChartCall {
    /// Chart function name, e.g. `scatter`
    pub chart: String,
    /// Keyword arguments in source order
    pub args: Vec<(String, Literal)>,
}

/// An argument value as written
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Bare identifier, a column name
    Column(String),
    /// Quoted string
    Str(String),
    Number(f64),
    Bool(bool),
    /// `none`, leaves the keyword at its default
    None,
    List(Vec<Literal>),
    Map(Vec<(String, Literal)>),
}

impl Literal {
    pub fn to_arg(&self) -> ArgValue {
        match self {
            Literal::Column(s) | Literal::Str(s) => ArgValue::Str(s.clone()),
            Literal::Number(n) => ArgValue::Number(*n),
            Literal::Bool(b) => ArgValue::Bool(*b),
            Literal::None => ArgValue::Null,
            Literal::List(items) => ArgValue::List(items.iter().map(Literal::to_arg).collect()),
            Literal::Map(pairs) => ArgValue::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_arg()))
                    .collect::<IndexMap<_, _>>(),
            ),
        }
    }
}

impl ChartCall {
    /// Keyword arguments for the chart function; the table is added by the caller.
    pub fn to_args(&self) -> CallArgs {
        let mut args = CallArgs::new();
        for (key, value) in &self.args {
            args.set(key, value.to_arg());
        }
        args
    }
}
