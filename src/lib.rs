//! A compiler for a tiny Scheme-like language of numbers, arithmetic,
//! definitions and lambdas.
//!
//! Source text goes through [`lexer`], [`parser`] and [`compiler`], ending up
//! as functions and globals of an [`ir::Module`].
pub mod compiler;
pub mod ir;
pub mod lexer;
pub mod parser;

pub use compiler::{lower, CodegenError, Session};
pub use ir::{BackendError, Builder, Module, Target, Value};
pub use lexer::{tokenize, Keyword, LexError, Lexer, Span, Token, TokenKind, Tokens};
pub use parser::{parse, parse_program, parse_source, BinaryOperator, Expr, ParseError};

/// Any error the pipeline can produce, tagged by the stage that produced it.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Self::Codegen(CodegenError::Backend(err))
    }
}
