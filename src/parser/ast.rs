//! The expression tree produced by the parser.
//!
//! Every node owns its children exclusively and is immutable once built.
//! [`Expr`]'s `Display` writes canonical source text which parses back into an
//! equal tree.
use core::fmt;
use std::collections::HashSet;

use arbitrary::{Arbitrary, Unstructured};

use crate::lexer::Keyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// introduces a top-level binding
    Define {
        name: Box<str>,
        value: Box<Expr>,
    },
    Lambda {
        params: Box<[Box<str>]>,
        body: Box<Expr>,
    },
    /// resolved during lowering, not parsing
    Identifier(Box<str>),
}

impl Expr {
    pub fn binary(op: BinaryOperator, lhs: Expr, rhs: Expr) -> Self {
        Self::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn define(name: impl AsRef<str>, value: Expr) -> Self {
        Self::Define {
            name: Box::from(name.as_ref()),
            value: Box::new(value),
        }
    }

    pub fn lambda(params: impl IntoIterator<Item = impl AsRef<str>>, body: Expr) -> Self {
        Self::Lambda {
            params: params
                .into_iter()
                .map(|param| Box::from(param.as_ref()))
                .collect(),
            body: Box::new(body),
        }
    }

    pub fn identifier(name: impl AsRef<str>) -> Self {
        Self::Identifier(Box::from(name.as_ref()))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::BinaryOp { op, lhs, rhs } => write!(f, "({op} {lhs} {rhs})"),
            Self::Define { name, value } => write!(f, "({} {name} {value})", Keyword::Define),
            Self::Lambda { params, body } => {
                write!(f, "({} (", Keyword::Lambda)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {body})")
            }
            Self::Identifier(name) => write!(f, "{name}"),
        }
    }
}

// Only generates trees that survive a print/parse round trip: finite
// non-negative numbers, identifiers that don't start with a keyword and
// lambdas without repeated parameters.
impl<'a> Arbitrary<'a> for Expr {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        arbitrary_expr(u, 4)
    }
}

fn arbitrary_expr(u: &mut Unstructured<'_>, depth: u32) -> arbitrary::Result<Expr> {
    let max_choice = if depth == 0 { 1 } else { 4 };
    Ok(match u.int_in_range(0..=max_choice)? {
        0 => {
            let value: f64 = u.arbitrary()?;
            Expr::Number(if value.is_finite() { value.abs() } else { 0.0 })
        }
        1 => Expr::Identifier(arbitrary_identifier(u)?),
        2 => Expr::binary(
            u.arbitrary()?,
            arbitrary_expr(u, depth - 1)?,
            arbitrary_expr(u, depth - 1)?,
        ),
        3 => Expr::Define {
            name: arbitrary_identifier(u)?,
            value: Box::new(arbitrary_expr(u, depth - 1)?),
        },
        _ => {
            let mut seen = HashSet::new();
            let mut params = Vec::new();
            for _ in 0..u.int_in_range(0..=3)? {
                let param = arbitrary_identifier(u)?;
                if seen.insert(param.clone()) {
                    params.push(param);
                }
            }
            Expr::Lambda {
                params: params.into(),
                body: Box::new(arbitrary_expr(u, depth - 1)?),
            }
        }
    })
}

fn arbitrary_identifier(u: &mut Unstructured<'_>) -> arbitrary::Result<Box<str>> {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const ALPHANUMERIC: &[u8] =
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let mut ident = String::new();
    ident.push(char::from(*u.choose(LETTERS)?));
    for _ in 0..u.int_in_range(0..=6)? {
        ident.push(char::from(*u.choose(ALPHANUMERIC)?));
    }
    if Keyword::prefix_of(&ident).is_some() {
        ident.insert(0, 'v');
    }
    Ok(Box::from(ident.as_str()))
}

#[cfg(test)]
mod tests {
    use super::{BinaryOperator, Expr};
    use assert2::check;

    #[test]
    fn display_is_canonical_source() {
        let expr = Expr::define(
            "area",
            Expr::lambda(
                ["w", "h"],
                Expr::binary(
                    BinaryOperator::Mul,
                    Expr::identifier("w"),
                    Expr::identifier("h"),
                ),
            ),
        );
        check!(expr.to_string() == "(define area (lambda (w h) (* w h)))");
        check!(Expr::Number(5.0).to_string() == "5");
        check!(Expr::Number(0.25).to_string() == "0.25");
        check!(Expr::lambda([] as [&str; 0], Expr::Number(1.0)).to_string() == "(lambda () 1)");
    }

    #[test]
    fn operator_lexemes() {
        for op in [
            BinaryOperator::Add,
            BinaryOperator::Sub,
            BinaryOperator::Mul,
            BinaryOperator::Div,
        ] {
            check!(BinaryOperator::from_lexeme(op.symbol()) == Some(op));
        }
        check!(BinaryOperator::from_lexeme("%").is_none());
    }
}
