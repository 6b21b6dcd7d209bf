//! Curly-brace S-expressions, the surface syntax of parse tree descriptions.
//!
//! ```text
//! {word {substituent locant=2 {group chloro Cl[R]}} {root {group ethanol CCO}}}
//! ```
//!
//! Atoms are runs of anything but whitespace and braces, or double quoted
//! strings. `;` starts a comment that runs to the end of the line.

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{all_consuming, cut, map, value},
    error::{context, convert_error, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

pub type Error<'a> = VerboseError<&'a str>;
pub type Res<'a, T> = IResult<&'a str, T, Error<'a>>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn is_list(&self) -> bool {
        matches!(self, SExpr::List(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, SExpr::Atom(_))
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// The leading atom of a list, e.g. `word` in `{word ...}`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }
}

impl Display for SExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SExpr::Atom(s) if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '{' || c == '}') => {
                write!(f, "\"{}\"", s)
            }
            SExpr::Atom(s) => write!(f, "{}", s),
            SExpr::List(l) => {
                write!(f, "{{")?;
                for (i, e) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl FromStr for SExpr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut all = parse(s)?;
        match all.len() {
            1 => Ok(all.remove(0)),
            n => Err(format!("Expected one expression, found {n}")),
        }
    }
}

/// Whitespace and comments.
fn ignored(input: &str) -> Res<()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char(';'), take_till(|c| c == '\n'))),
        ))),
    )(input)
}

fn parse_string_literal(input: &str) -> Res<SExpr> {
    map(
        delimited(char('"'), take_while(|c| c != '"'), cut(char('"'))),
        |content: &str| SExpr::Atom(content.to_string()),
    )(input)
}

fn parse_atom(input: &str) -> Res<SExpr> {
    alt((
        parse_string_literal,
        map(
            take_while1(|c: char| c != '{' && c != '}' && c != '"' && c != ';' && !c.is_whitespace()),
            |atom: &str| SExpr::Atom(atom.to_string()),
        ),
    ))(input)
}

fn parse_list(input: &str) -> Res<SExpr> {
    map(
        preceded(
            char('{'),
            cut(context("list", terminated(many0(parse_sexpr), preceded(ignored, char('}'))))),
        ),
        SExpr::List,
    )(input)
}

fn parse_sexpr(input: &str) -> Res<SExpr> {
    preceded(ignored, alt((parse_list, parse_atom)))(input)
}

/// Parse every top-level expression in `input`.
pub fn parse(input: &str) -> Result<Vec<SExpr>, String> {
    match all_consuming(terminated(many0(parse_sexpr), ignored))(input) {
        Ok((_, sexprs)) => Ok(sexprs),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err("incomplete".to_string()),
    }
}
