//! Template rendering
//!
//! Substitutes placeholder tags in every `word/*.xml` part and produces a new
//! archive. Tags use `{{` and `}}` by default:
//!
//! - `{{name}}` is replaced by the value of `name`
//! - `{{#name}}...{{/name}}` keeps its body when `name` has a non-empty value
//! - `{{^name}}...{{/name}}` keeps its body when `name` is empty or missing
//!
//! Values are scalar strings, so a section renders its body at most once.
//! With `paragraph_loop`, a section marker that is the only text of its
//! paragraph takes the whole paragraph with it; otherwise only the run text
//! is removed and the paragraph structure stays in place.

mod error;
mod normalize;
mod tags;
mod xml;

pub use error::{RenderError, RenderResult};

use crate::archive::TemplateArchive;
use crate::sanitizer::DocumentData;
use normalize::merge_split_tags;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use tags::{build_tree, lex, Node, TagSpan, Token};
use xml::{check_well_formed, is_balanced, paragraphs, preserve_space, text_runs, TextRun};

/// Markup inserted in place of a newline when `linebreaks` is enabled
const LINE_BREAK: &str = "</w:t><w:br/><w:t xml:space=\"preserve\">";

/// Opening and closing tag delimiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub start: String,
    pub end: String,
}

impl Delimiters {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Both delimiters must be non-empty
    pub fn validate(&self) -> RenderResult<()> {
        if self.start.is_empty() || self.end.is_empty() {
            return Err(RenderError::InvalidDelimiters {
                start: self.start.clone(),
                end: self.end.clone(),
            });
        }
        Ok(())
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

/// What to do with a placeholder that has no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValue {
    /// Render an empty string
    Blank,
    /// Fail with [`RenderError::MissingValue`]
    Error,
}

impl Default for MissingValue {
    fn default() -> Self {
        MissingValue::Blank
    }
}

/// Engine options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Drop paragraphs that hold nothing but a section marker
    pub paragraph_loop: bool,
    /// Turn newlines in values into line breaks
    pub linebreaks: bool,
    /// Tag delimiters
    pub delimiters: Delimiters,
    /// Handling of placeholders without a value
    pub missing_value: MissingValue,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            paragraph_loop: true,
            linebreaks: true,
            delimiters: Delimiters::default(),
            missing_value: MissingValue::Blank,
        }
    }
}

impl RenderOptions {
    pub fn with_paragraph_loop(mut self, enabled: bool) -> Self {
        self.paragraph_loop = enabled;
        self
    }

    pub fn with_linebreaks(mut self, enabled: bool) -> Self {
        self.linebreaks = enabled;
        self
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_missing_value(mut self, policy: MissingValue) -> Self {
        self.missing_value = policy;
        self
    }
}

/// A replacement of a byte range in a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn new(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    fn remove(range: Range<usize>) -> Self {
        Self::new(range, String::new())
    }
}

/// Apply edits to `xml`. An edit that overlaps an earlier, wider one is dropped.
pub(crate) fn apply_edits(xml: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            continue;
        }
        out.push_str(&xml[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&xml[cursor..]);
    out
}

/// Render every document part of `archive` with `data`
pub fn render(
    archive: &TemplateArchive,
    data: &DocumentData,
    options: &RenderOptions,
) -> RenderResult<TemplateArchive> {
    let mut updates = Vec::new();

    for entry in archive.entries().iter().filter(|e| e.is_document_xml()) {
        let source = std::str::from_utf8(&entry.data)
            .map_err(|_| RenderError::InvalidPart(entry.name.clone()))?;
        let rendered = render_part(source, data, options, &entry.name)?;
        if rendered != source {
            updates.push((entry.name.clone(), rendered.into_bytes()));
        }
    }

    tracing::debug!(parts = updates.len(), "Rendered template");
    Ok(archive.with_entries(updates))
}

/// Render a single part
pub fn render_part(
    source: &str,
    data: &DocumentData,
    options: &RenderOptions,
    part: &str,
) -> RenderResult<String> {
    options.delimiters.validate()?;
    let xml = merge_split_tags(source, &options.delimiters, part)?;
    let runs = text_runs(&xml, 0..xml.len());

    let mut tokens = Vec::new();
    for (index, run) in runs.iter().enumerate() {
        let base = run.content.start;
        for span in lex(run.text(&xml), &options.delimiters, part)? {
            tokens.push(Token {
                span: TagSpan {
                    range: base + span.range.start..base + span.range.end,
                    ..span
                },
                run: index,
            });
        }
    }

    if tokens.is_empty() {
        return Ok(xml);
    }

    let tree = build_tree(&tokens, part)?;
    let mut renderer = PartRenderer {
        xml: &xml,
        runs: &runs,
        tokens: &tokens,
        paragraphs: paragraphs(&xml),
        data,
        options,
        edits: Vec::new(),
        preserved: HashSet::new(),
    };
    renderer.render_nodes(&tree)?;

    let output = apply_edits(&xml, renderer.edits);
    check_well_formed(&output).map_err(|reason| RenderError::MalformedOutput {
        part: part.to_string(),
        reason,
    })?;
    Ok(output)
}

fn encode_value(value: &str, linebreaks: bool) -> String {
    if !linebreaks {
        return escape(value).into_owned();
    }
    value
        .split('\n')
        .map(|line| escape(line.strip_suffix('\r').unwrap_or(line)).into_owned())
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

struct PartRenderer<'a> {
    xml: &'a str,
    runs: &'a [TextRun],
    tokens: &'a [Token],
    paragraphs: Vec<Range<usize>>,
    data: &'a DocumentData,
    options: &'a RenderOptions,
    edits: Vec<Edit>,
    /// Runs whose opening tag already received `xml:space="preserve"`
    preserved: HashSet<usize>,
}

impl PartRenderer<'_> {
    fn render_nodes(&mut self, nodes: &[Node]) -> RenderResult<()> {
        for node in nodes {
            match node {
                Node::Value(index) => self.render_value(*index)?,
                Node::Section {
                    open,
                    close,
                    inverted,
                    children,
                } => {
                    let name = &self.tokens[*open].span.name;
                    let truthy = self.data.get(name).is_some_and(|v| !v.is_empty());
                    let shown = truthy != *inverted;

                    match self.paragraph_block(*open, *close) {
                        Some((first, last)) if shown => {
                            self.edits.push(Edit::remove(first));
                            self.edits.push(Edit::remove(last));
                            self.render_nodes(children)?;
                        }
                        Some((first, last)) => {
                            self.edits.push(Edit::remove(first.start..last.end));
                        }
                        None if shown => {
                            self.edits.push(Edit::remove(self.tokens[*open].span.range.clone()));
                            self.edits.push(Edit::remove(self.tokens[*close].span.range.clone()));
                            self.render_nodes(children)?;
                        }
                        None => self.remove_inline(*open, *close),
                    }
                }
            }
        }
        Ok(())
    }

    fn render_value(&mut self, index: usize) -> RenderResult<()> {
        let token = &self.tokens[index];
        let value = match self.data.get(&token.span.name) {
            Some(value) => value.as_str(),
            None => match self.options.missing_value {
                MissingValue::Blank => {
                    tracing::debug!(name = %token.span.name, "No value for placeholder, rendering blank");
                    ""
                }
                MissingValue::Error => {
                    return Err(RenderError::MissingValue(token.span.name.clone()));
                }
            },
        };

        self.edits.push(Edit::new(
            token.span.range.clone(),
            encode_value(value, self.options.linebreaks),
        ));

        if !value.is_empty() && self.preserved.insert(token.run) {
            let open = self.runs[token.run].open.clone();
            let open_tag = &self.xml[open.clone()];
            let preserved = preserve_space(open_tag);
            if preserved != open_tag {
                self.edits.push(Edit::new(open, preserved));
            }
        }
        Ok(())
    }

    /// Paragraph containing `token` when the token is its only text
    fn sole_paragraph(&self, token: usize) -> Option<Range<usize>> {
        let span = &self.tokens[token].span;
        let paragraph = self
            .paragraphs
            .iter()
            .find(|p| p.start <= span.range.start && span.range.end <= p.end)?;

        let text: String = text_runs(self.xml, paragraph.clone())
            .iter()
            .map(|r| r.text(self.xml))
            .collect();
        (text.trim() == &self.xml[span.range.clone()]).then(|| paragraph.clone())
    }

    fn paragraph_block(&self, open: usize, close: usize) -> Option<(Range<usize>, Range<usize>)> {
        if !self.options.paragraph_loop {
            return None;
        }
        let first = self.sole_paragraph(open)?;
        let last = self.sole_paragraph(close)?;
        if first == last || !is_balanced(&self.xml[first.start..last.end]) {
            return None;
        }
        Some((first, last))
    }

    /// Remove a hidden section's text without touching element structure
    fn remove_inline(&mut self, open: usize, close: usize) {
        let (first, last) = (&self.tokens[open], &self.tokens[close]);

        if first.run == last.run {
            self.edits.push(Edit::remove(first.span.range.start..last.span.range.end));
            return;
        }

        self.edits.push(Edit::remove(
            first.span.range.start..self.runs[first.run].content.end,
        ));
        for run in &self.runs[first.run + 1..last.run] {
            if !run.content.is_empty() {
                self.edits.push(Edit::remove(run.content.clone()));
            }
        }
        self.edits.push(Edit::remove(
            self.runs[last.run].content.start..last.span.range.end,
        ));
    }
}
