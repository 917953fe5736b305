//! Recursive descent over a materialised token sequence.
//!
//! Instead of a cursor object, [`parse`] takes a start index and returns the
//! index of the *last* token that belongs to the parsed expression; a caller
//! resumes with the sibling at `end + 1`. The parser holds no state, so a
//! failed parse leaves nothing behind.
use tracing::debug;

use crate::lexer::{tokenize, Keyword, Token, TokenKind};

pub mod ast;

pub use ast::{BinaryOperator, Expr};

/// How many expressions deep a parse may go before giving up with
/// [`ParseError::TooDeep`]. Lowering and printing recurse over the same tree.
pub const MAX_NESTING: usize = 256;

#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum ParseError {
    #[error("nothing to parse")]
    NothingToParse,
    #[error("expected an expression at token {offset}, found end of input")]
    OffsetOutOfRange { offset: usize },
    #[error("define must be followed by an identifier")]
    MalformedDefine { offset: usize },
    #[error("lambda must be followed by a parenthesised list of identifiers")]
    MalformedLambda { offset: usize },
    #[error("parameter `{name}` is repeated")]
    DuplicateParameter { name: Box<str>, offset: usize },
    #[error("invalid numeric literal `{lexeme}`")]
    InvalidNumber { lexeme: Box<str>, offset: usize },
    #[error("unsupported expression form")]
    UnsupportedForm { offset: usize },
    #[error("expected `)` to close the `(` at token {open}")]
    UnclosedParen { open: usize, offset: usize },
    #[error("unexpected `)`")]
    UnexpectedCloseParen { offset: usize },
    #[error("expression nested more than {} levels deep", MAX_NESTING)]
    TooDeep { offset: usize },
}

impl ParseError {
    /// Index of the token the error points at.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::NothingToParse => None,
            Self::OffsetOutOfRange { offset }
            | Self::MalformedDefine { offset }
            | Self::MalformedLambda { offset }
            | Self::DuplicateParameter { offset, .. }
            | Self::InvalidNumber { offset, .. }
            | Self::UnsupportedForm { offset }
            | Self::UnclosedParen { offset, .. }
            | Self::UnexpectedCloseParen { offset }
            | Self::TooDeep { offset } => Some(*offset),
        }
    }
}

/// Parses one expression starting at `start`.
///
/// On success, returns the expression together with the index of its last token.
pub fn parse(tokens: &[Token], start: usize) -> Result<(Expr, usize), ParseError> {
    parse_nested(tokens, start, 0)
}

fn parse_nested(tokens: &[Token], start: usize, depth: usize) -> Result<(Expr, usize), ParseError> {
    if depth >= MAX_NESTING {
        return Err(ParseError::TooDeep { offset: start });
    }
    let token = tokens
        .get(start)
        .ok_or(ParseError::OffsetOutOfRange { offset: start })?;

    match token.kind {
        TokenKind::OpenParen => {
            if start + 1 >= tokens.len() {
                return Err(ParseError::UnclosedParen {
                    open: start,
                    offset: start + 1,
                });
            }
            let (expr, end) = parse_nested(tokens, start + 1, depth + 1)?;
            match tokens.get(end + 1) {
                Some(close) if close.kind == TokenKind::CloseParen => Ok((expr, end + 1)),
                _ => Err(ParseError::UnclosedParen {
                    open: start,
                    offset: end + 1,
                }),
            }
        }
        TokenKind::CloseParen => Err(ParseError::UnexpectedCloseParen { offset: start }),
        TokenKind::BinaryOperator => {
            let op = BinaryOperator::from_lexeme(&token.lexeme)
                .ok_or(ParseError::UnsupportedForm { offset: start })?;
            let (lhs, lhs_end) = parse_nested(tokens, start + 1, depth + 1)?;
            let (rhs, rhs_end) = parse_nested(tokens, lhs_end + 1, depth + 1)?;
            Ok((Expr::binary(op, lhs, rhs), rhs_end))
        }
        TokenKind::Number => {
            let value = token
                .lexeme
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber {
                    lexeme: token.lexeme.clone(),
                    offset: start,
                })?;
            Ok((Expr::Number(value), start))
        }
        TokenKind::Identifier => Ok((Expr::Identifier(token.lexeme.clone()), start)),
        TokenKind::Keyword => match Keyword::from_lexeme(&token.lexeme) {
            Some(Keyword::Define) => parse_define(tokens, start, depth),
            Some(Keyword::Lambda) => parse_lambda(tokens, start, depth),
            None => Err(ParseError::UnsupportedForm { offset: start }),
        },
    }
}

// define NAME VALUE
fn parse_define(tokens: &[Token], start: usize, depth: usize) -> Result<(Expr, usize), ParseError> {
    let name = match tokens.get(start + 1) {
        Some(tok) if tok.kind == TokenKind::Identifier => tok.lexeme.clone(),
        _ => return Err(ParseError::MalformedDefine { offset: start + 1 }),
    };
    let (value, end) = parse_nested(tokens, start + 2, depth + 1)?;
    Ok((
        Expr::Define {
            name,
            value: Box::new(value),
        },
        end,
    ))
}

// lambda ( PARAM* ) BODY
fn parse_lambda(tokens: &[Token], start: usize, depth: usize) -> Result<(Expr, usize), ParseError> {
    match tokens.get(start + 1) {
        Some(tok) if tok.kind == TokenKind::OpenParen => {}
        _ => return Err(ParseError::MalformedLambda { offset: start + 1 }),
    }

    let mut params: Vec<Box<str>> = Vec::new();
    let mut offset = start + 2;
    loop {
        match tokens.get(offset) {
            Some(tok) if tok.kind == TokenKind::Identifier => {
                if params.contains(&tok.lexeme) {
                    return Err(ParseError::DuplicateParameter {
                        name: tok.lexeme.clone(),
                        offset,
                    });
                }
                params.push(tok.lexeme.clone());
                offset += 1;
            }
            Some(tok) if tok.kind == TokenKind::CloseParen => break,
            _ => return Err(ParseError::MalformedLambda { offset }),
        }
    }

    let (body, end) = parse_nested(tokens, offset + 1, depth + 1)?;
    Ok((
        Expr::Lambda {
            params: params.into(),
            body: Box::new(body),
        },
        end,
    ))
}

/// Parses every top-level expression in `tokens`, in order.
pub fn parse_program(tokens: &[Token]) -> Result<Vec<Expr>, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::NothingToParse);
    }

    let mut exprs = Vec::new();
    let mut offset = 0;
    while offset < tokens.len() {
        let (expr, end) = parse(tokens, offset)?;
        debug!(start = offset, end, %expr, "parsed top-level expression");
        exprs.push(expr);
        offset = end + 1;
    }
    Ok(exprs)
}

/// Lexes and parses `source` into its top-level expressions.
pub fn parse_source(source: &str) -> Result<Vec<Expr>, crate::Error> {
    let tokens = tokenize(source)?;
    Ok(parse_program(&tokens)?)
}
