//! Tag lexing and section structure

use super::error::{RenderError, RenderResult};
use super::Delimiters;
use quick_xml::escape::{escape, unescape};
use std::ops::Range;

/// What a tag asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    /// `{{name}}`
    Value,
    /// `{{#name}}`
    Section,
    /// `{{^name}}`
    Inverted,
    /// `{{/name}}`
    Close,
}

/// A complete tag found in escaped character data
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagSpan {
    /// Byte range of the tag including delimiters
    pub range: Range<usize>,
    pub kind: TagKind,
    /// Unescaped, trimmed name without the kind marker
    pub name: String,
}

/// Find every tag in `text`, which is still XML-escaped.
///
/// An opening delimiter must be closed before the next opening delimiter and
/// before the end of `text`.
pub(crate) fn lex(text: &str, delimiters: &Delimiters, part: &str) -> RenderResult<Vec<TagSpan>> {
    delimiters.validate()?;
    let start = escape(delimiters.start.as_str());
    let end = escape(delimiters.end.as_str());
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(start.as_ref()) {
        let open = cursor + found;
        let inner_start = open + start.len();
        let close = text[inner_start..].find(end.as_ref()).map(|i| inner_start + i);
        let next_open = text[inner_start..].find(start.as_ref()).map(|i| inner_start + i);

        let inner_end = match (close, next_open) {
            (Some(c), Some(n)) if n < c => return Err(unclosed(text, open, part)),
            (Some(c), _) => c,
            (None, _) => return Err(unclosed(text, open, part)),
        };

        let range = open..inner_end + end.len();
        let (kind, name) = classify(&text[inner_start..inner_end]);
        spans.push(TagSpan { range, kind, name });
        cursor = inner_end + end.len();
    }

    Ok(spans)
}

fn unclosed(text: &str, open: usize, part: &str) -> RenderError {
    let context: String = text[open..].chars().take(40).collect();
    RenderError::UnclosedTag {
        part: part.to_string(),
        context,
    }
}

fn classify(raw: &str) -> (TagKind, String) {
    let raw = raw.trim();
    let (kind, rest) = match raw.chars().next() {
        Some('#') => (TagKind::Section, &raw[1..]),
        Some('^') => (TagKind::Inverted, &raw[1..]),
        Some('/') => (TagKind::Close, &raw[1..]),
        _ => (TagKind::Value, raw),
    };
    let rest = rest.trim();
    let name = unescape(rest).map(|c| c.into_owned()).unwrap_or_else(|_| rest.to_string());
    (kind, name)
}

/// A tag located in a part, along with the text run that holds it
#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub span: TagSpan,
    /// Index of the text run
    pub run: usize,
}

/// Section structure of a part
#[derive(Debug)]
pub(crate) enum Node {
    Value(usize),
    Section {
        open: usize,
        close: usize,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// Pair opening and closing markers into a tree of token indices
pub(crate) fn build_tree(tokens: &[Token], part: &str) -> RenderResult<Vec<Node>> {
    // (open token index, children collected so far)
    let mut stack: Vec<(usize, Vec<Node>)> = Vec::new();
    let mut roots = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        match token.span.kind {
            TagKind::Value => match stack.last_mut() {
                Some((_, children)) => children.push(Node::Value(index)),
                None => roots.push(Node::Value(index)),
            },
            TagKind::Section | TagKind::Inverted => stack.push((index, Vec::new())),
            TagKind::Close => {
                let Some((open, children)) = stack.pop() else {
                    return Err(RenderError::UnopenedSection {
                        part: part.to_string(),
                        name: token.span.name.clone(),
                    });
                };
                let open_name = &tokens[open].span.name;
                if *open_name != token.span.name {
                    return Err(RenderError::MismatchedSection {
                        part: part.to_string(),
                        open: open_name.clone(),
                        close: token.span.name.clone(),
                    });
                }
                let node = Node::Section {
                    open,
                    close: index,
                    inverted: tokens[open].span.kind == TagKind::Inverted,
                    children,
                };
                match stack.last_mut() {
                    Some((_, parent)) => parent.push(node),
                    None => roots.push(node),
                }
            }
        }
    }

    if let Some((open, _)) = stack.pop() {
        return Err(RenderError::UnclosedSection {
            part: part.to_string(),
            name: tokens[open].span.name.clone(),
        });
    }

    Ok(roots)
}
