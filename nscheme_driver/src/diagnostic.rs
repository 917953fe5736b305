use std::ops::Range;

use codesnake::{Block, CodeWidth, Label, LineIndex};
use nscheme::{tokenize, CodegenError, Error, TokenKind};
use yansi::Paint;

/// The byte range of `source` that `err` is about, when it can be pinned down.
///
/// Parser errors count tokens, so the source is re-lexed to find the span; an
/// offset past the end points at the last token.
pub fn locate(source: &str, err: &Error) -> Option<Range<usize>> {
    match err {
        Error::Lex(err) => Some(err.span()),
        Error::Parse(err) => {
            let tokens = tokenize(source).ok()?;
            let offset = err.offset()?;
            tokens
                .get(offset)
                .or_else(|| tokens.last())
                .map(|token| token.span.clone())
        }
        Error::Codegen(CodegenError::UnresolvedIdentifier(name)) => tokenize(source)
            .ok()?
            .into_iter()
            .find(|token| token.kind == TokenKind::Identifier && token.lexeme == *name)
            .map(|token| token.span),
        Error::Codegen(_) => None,
    }
}

fn make_block<'a>(
    idx: &'a LineIndex,
    span: Range<usize>,
    message: &str,
) -> Option<Block<&'a str, String>> {
    Block::new(
        idx,
        [Label::new(span)
            .with_text(message.red().to_string())
            .with_style(|s| s.red().bold().to_string())],
    )
}

/// Renders `err` against the `source` it came from, labelled with `name`.
pub fn render(name: &str, source: &str, err: &Error) -> String {
    let mut out = format!("{}: {err}\n", "error".red().bold());
    let idx = LineIndex::new(source);
    let block = locate(source, err)
        .filter(|span| !span.is_empty())
        .and_then(|span| make_block(&idx, span, &err.to_string()))
        .map(|block| block.map_code(|c| CodeWidth::new(c, c.len())));
    if let Some(block) = block {
        out.push_str(&format!("{}[{name}]\n", block.prologue()));
        out.push_str(&block.to_string());
        out.push_str(&format!("{}\n", block.epilogue()));
    }
    out
}
