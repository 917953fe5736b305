//! Turns source text into a flat sequence of classified [`Token`]s.
//!
//! Raw recognition is done by a [`logos`] lexer; [`Lexer`] wraps it to apply the
//! keyword rule (a keyword is matched as a *prefix* of the remaining input, so
//! `definex` scans as `define` followed by `x`) and to remember the last error.
use core::fmt;

pub use logos::Span;
use logos::Logos;
use tracing::trace;

/// Errors raised by the raw [`logos`] lexer, before a span is attached.
#[derive(Debug, PartialEq, Clone, Default)]
enum RawError {
    #[default]
    Unrecognized,
    MalformedNumber,
}

fn check_number(lexer: &mut logos::Lexer<RawToken>) -> Result<(), RawError> {
    if lexer.slice().matches('.').count() > 1 {
        Err(RawError::MalformedNumber)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Logos)]
#[logos(error = RawError)]
#[logos(skip r"[ \t\r\n\x0C]+")]
enum RawToken {
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    // keywords are split off these in `Lexer::scan`
    #[regex("[a-zA-Z][a-zA-Z0-9]*")]
    Word,
    #[regex(r"[0-9.]+", check_number)]
    Number,
    #[regex(r"[+\-*/]")]
    BinaryOperator,
}

#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum LexError {
    #[error("unrecognized token")]
    UnrecognizedToken { span: Span },
    #[error("malformed number")]
    MalformedNumber { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            Self::UnrecognizedToken { span } | Self::MalformedNumber { span } => span.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    Identifier,
    Number,
    BinaryOperator,
    Keyword,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenParen => "OpenParen",
            Self::CloseParen => "CloseParen",
            Self::Identifier => "Identifier",
            Self::Number => "Number",
            Self::BinaryOperator => "BinaryOperator",
            Self::Keyword => "Keyword",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Define,
    Lambda,
}

impl Keyword {
    /// Keywords in the order they are tried against the input.
    pub const ALL: [Keyword; 2] = [Keyword::Define, Keyword::Lambda];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Define => "define",
            Self::Lambda => "lambda",
        }
    }

    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kw| kw.as_str() == lexeme)
    }

    /// The first keyword that `text` starts with, if any.
    pub fn prefix_of(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kw| text.starts_with(kw.as_str()))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified lexeme. Immutable once scanned.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Box<str>,
    /// byte range in the source, only used for diagnostics
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl AsRef<str>) -> Self {
        Self {
            kind,
            lexeme: Box::from(lexeme.as_ref()),
            span: 0..0,
        }
    }
}

/// Forward-only scanner over one source. Create a new one per input.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    error: Option<LexError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            error: None,
        }
    }

    /// Scans the next token.
    ///
    /// Returns `Ok(None)` at end of input, and also after an error has been
    /// reported: scanning never resumes past a bad token.
    pub fn scan(&mut self) -> Result<Option<Token>, LexError> {
        if self.error.is_some() {
            return Ok(None);
        }

        let rest = &self.source[self.offset..];
        let mut raw = RawToken::lexer(rest);
        let Some(result) = raw.next() else {
            self.offset = self.source.len();
            return Ok(None);
        };

        let start = self.offset + raw.span().start;
        let mut end = self.offset + raw.span().end;
        let kind = match result {
            Ok(RawToken::OpenParen) => TokenKind::OpenParen,
            Ok(RawToken::CloseParen) => TokenKind::CloseParen,
            Ok(RawToken::Word) => match Keyword::prefix_of(raw.slice()) {
                Some(keyword) => {
                    end = start + keyword.as_str().len();
                    TokenKind::Keyword
                }
                None => TokenKind::Identifier,
            },
            Ok(RawToken::Number) => TokenKind::Number,
            Ok(RawToken::BinaryOperator) => TokenKind::BinaryOperator,
            Err(err) => {
                while !self.source.is_char_boundary(end) {
                    end += 1;
                }
                let span = start..end;
                let error = match err {
                    RawError::Unrecognized => LexError::UnrecognizedToken { span },
                    RawError::MalformedNumber => LexError::MalformedNumber { span },
                };
                self.offset = end;
                self.error = Some(error.clone());
                return Err(error);
            }
        };

        self.offset = end;
        let token = Token {
            kind,
            lexeme: Box::from(&self.source[start..end]),
            span: start..end,
        };
        trace!(kind = %token.kind, lexeme = %token.lexeme, "scanned token");
        Ok(Some(token))
    }

    /// The error that stopped scanning, if any.
    pub fn error(&self) -> Option<&LexError> {
        self.error.as_ref()
    }

    /// Iterates over the remaining tokens, ending after the first error.
    pub fn tokens(&mut self) -> Tokens<'_, 'src> {
        Tokens { lexer: self }
    }
}

/// Iterator returned by [`Lexer::tokens`].
#[derive(Debug)]
pub struct Tokens<'lexer, 'src> {
    lexer: &'lexer mut Lexer<'src>,
}

impl Iterator for Tokens<'_, '_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lexer.scan().transpose()
    }
}

/// Scans all of `source` into a token sequence, stopping at the first error.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokens().collect()
}

#[cfg(test)]
mod tests {
    use super::{tokenize, LexError, Lexer, TokenKind};
    use arbtest::arbtest;
    use assert2::{check, let_assert};

    fn kinds_and_lexemes(source: &str) -> Vec<(TokenKind, String)> {
        let_assert!(Ok(tokens) = tokenize(source));
        tokens
            .into_iter()
            .map(|tok| (tok.kind, tok.lexeme.to_string()))
            .collect()
    }

    #[test]
    fn define_form() {
        use TokenKind::*;
        check!(
            kinds_and_lexemes("(define x 5)")
                == vec![
                    (OpenParen, "(".to_string()),
                    (Keyword, "define".to_string()),
                    (Identifier, "x".to_string()),
                    (Number, "5".to_string()),
                    (CloseParen, ")".to_string()),
                ]
        );
    }

    #[test]
    fn operators_and_whitespace() {
        use TokenKind::*;
        check!(
            kinds_and_lexemes("(+\t1\n  (/ 2.5 x2))")
                == vec![
                    (OpenParen, "(".to_string()),
                    (BinaryOperator, "+".to_string()),
                    (Number, "1".to_string()),
                    (OpenParen, "(".to_string()),
                    (BinaryOperator, "/".to_string()),
                    (Number, "2.5".to_string()),
                    (Identifier, "x2".to_string()),
                    (CloseParen, ")".to_string()),
                    (CloseParen, ")".to_string()),
                ]
        );
        for op in ["+", "-", "*", "/"] {
            check!(kinds_and_lexemes(op) == vec![(BinaryOperator, op.to_string())]);
        }
    }

    #[test]
    fn keywords_match_as_prefix() {
        use TokenKind::*;
        check!(
            kinds_and_lexemes("definex")
                == vec![(Keyword, "define".to_string()), (Identifier, "x".to_string())]
        );
        check!(
            kinds_and_lexemes("lambda2")
                == vec![(Keyword, "lambda".to_string()), (Number, "2".to_string())]
        );
        // not a prefix, so a plain identifier
        check!(kinds_and_lexemes("xdefine") == vec![(Identifier, "xdefine".to_string())]);
        check!(super::Keyword::prefix_of("lambdas") == Some(super::Keyword::Lambda));
        check!(super::Keyword::from_lexeme("lambdas").is_none());
    }

    #[test]
    fn spans_point_into_source() {
        let_assert!(Ok(tokens) = tokenize("  (define abc 12)"));
        check!(tokens[1].span == (3..9));
        check!(tokens[2].span == (10..13));
        check!(tokens[3].span == (14..16));
    }

    #[test]
    fn token_at_end_of_input_is_kept() {
        check!(kinds_and_lexemes("42") == vec![(TokenKind::Number, "42".to_string())]);
        check!(kinds_and_lexemes("abc") == vec![(TokenKind::Identifier, "abc".to_string())]);
    }

    #[test]
    fn empty_input() {
        check!(kinds_and_lexemes("").is_empty());
        check!(kinds_and_lexemes(" \t\n ").is_empty());
        let mut lexer = Lexer::new("");
        check!(lexer.scan() == Ok(None));
        check!(lexer.error().is_none());
    }

    #[test]
    fn second_decimal_point_is_malformed() {
        check!(tokenize("1.2.3") == Err(LexError::MalformedNumber { span: 0..5 }));
        check!(kinds_and_lexemes(".5") == vec![(TokenKind::Number, ".5".to_string())]);
    }

    #[test]
    fn scanning_stops_at_unrecognized_token() {
        let mut lexer = Lexer::new("(+ 1 #) 2");
        let tokens: Vec<_> = lexer.tokens().collect();
        check!(tokens.len() == 4);
        let_assert!(Some(Err(LexError::UnrecognizedToken { span })) = tokens.last());
        check!(*span == (5..6));
        check!(lexer.error() == Some(&LexError::UnrecognizedToken { span: 5..6 }));
        check!(lexer.scan() == Ok(None));
    }

    #[test]
    fn scan_one_token_at_a_time() {
        let mut lexer = Lexer::new("(* x 2)");
        let mut scanned = vec![];
        while let Some(token) = lexer.scan().transpose() {
            let_assert!(Ok(token) = token);
            scanned.push((token.kind, token.lexeme.to_string()));
        }
        check!(scanned == kinds_and_lexemes("(* x 2)"));
        check!(lexer.scan() == Ok(None));
        check!(lexer.error().is_none());

        let mut lexer = Lexer::new("1.2.3 x");
        check!(lexer.scan() == Err(LexError::MalformedNumber { span: 0..5 }));
        check!(lexer.scan() == Ok(None));
    }

    #[test]
    fn numeric_literals_lex_to_one_token() {
        arbtest(|u| {
            let whole: u64 = u.arbitrary()?;
            let frac: Option<u32> = u.arbitrary()?;
            let source = match frac {
                Some(frac) => format!("{whole}.{frac}"),
                None => whole.to_string(),
            };
            let_assert!(Ok(tokens) = tokenize(&source));
            check!(tokens.len() == 1, "`{source}` did not lex to one token");
            check!(tokens[0].kind == TokenKind::Number);
            check!(tokens[0].lexeme.as_ref() == source);
            Ok(())
        });
    }
}
