//! Placeholder discovery for DOCX templates
//!
//! Word splits text into runs whenever formatting changes, so a placeholder
//! typed as `{{client_name}}` can end up as `{{client` and `_name}}` in two
//! different `<w:t>` elements. The scanner therefore works in layers, each
//! one only adding names the previous layers missed:
//!
//! 1. `{{name}}` over the entity-decoded XML
//! 2. `{name}` over the same text, unless `{{name}}` is also present
//! 3. both patterns again over the text with all markup removed
//! 4. a loose word-level fallback when fewer than three names were found
//!
//! Every pass is a pure function from text to a set of names.

use crate::archive::{is_document_xml_path, ArchiveAccess};
use crate::error::{Result, TemplateError};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Below this many names the word-level fallback pass runs
pub const FALLBACK_THRESHOLD: usize = 3;

fn double_brace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_.]*)\}\}").expect("double brace pattern is valid")
    })
}

fn single_brace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_.]*)\}").expect("single brace pattern is valid")
    })
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("markup pattern is valid"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_.]*$").expect("name pattern is valid"))
}

/// Whether a captured token is a fillable variable rather than a section marker
pub fn is_fillable(name: &str) -> bool {
    !name.starts_with('#') && !name.starts_with('/') && !name.trim().is_empty()
}

/// Whether a string is a valid placeholder name
pub fn is_placeholder_name(name: &str) -> bool {
    name_regex().is_match(name)
}

/// Decode the five predefined XML entities.
///
/// The replacements run in sequence, so `&amp;lt;` decodes to `&lt;` and not `<`.
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Remove every `<...>` tag, keeping only character data
pub fn strip_tags(text: &str) -> String {
    markup_regex().replace_all(text, "").into_owned()
}

fn capture_names(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| is_fillable(name))
        .map(|name| name.trim().to_string())
        .collect()
}

/// Pass 1: `{{name}}` tokens
pub fn double_brace_pass(text: &str) -> BTreeSet<String> {
    capture_names(double_brace_regex(), text).into_iter().collect()
}

/// Pass 2: `{name}` tokens whose `{{name}}` form does not occur anywhere in `text`
pub fn single_brace_pass(text: &str) -> BTreeSet<String> {
    capture_names(single_brace_regex(), text)
        .into_iter()
        .filter(|name| !text.contains(&format!("{{{{{name}}}}}")))
        .collect()
}

/// Pass 3: both brace forms over tag-free text
pub fn plain_text_pass(plain: &str) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = capture_names(double_brace_regex(), plain).into_iter().collect();
    names.extend(capture_names(single_brace_regex(), plain));
    names
}

/// Fallback pass: words that touch a brace somewhere in the plain text
pub fn fallback_pass(plain: &str) -> BTreeSet<String> {
    let debraced = plain.replace(['{', '}'], " ");
    debraced
        .split_whitespace()
        .filter(|word| word.len() > 1 && is_fillable(word) && is_placeholder_name(word))
        .filter(|word| touches_brace(plain, word))
        .map(str::to_string)
        .collect()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether `word` occurs as a whole token directly before or after a brace
fn touches_brace(plain: &str, word: &str) -> bool {
    plain.match_indices(word).any(|(start, _)| {
        let before = plain[..start].chars().next_back();
        let after = plain[start + word.len()..].chars().next();

        let whole = !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char);
        let is_brace = |c: Option<char>| matches!(c, Some('{') | Some('}'));
        whole && (is_brace(before) || is_brace(after))
    })
}

/// Run every pass over already concatenated document XML.
///
/// Returns distinct names sorted ascending.
pub fn scan_text(xml: &str) -> Vec<String> {
    let decoded = decode_entities(xml);

    let mut names = double_brace_pass(&decoded);
    names.extend(single_brace_pass(&decoded));

    let plain = strip_tags(&decoded);
    names.extend(plain_text_pass(&plain));

    if names.len() < FALLBACK_THRESHOLD {
        let recovered = fallback_pass(&plain);
        if !recovered.is_empty() {
            tracing::debug!(count = recovered.len(), "Fallback pass recovered names");
        }
        names.extend(recovered);
    }

    names.into_iter().collect()
}

/// Result of scanning an archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Distinct placeholder names, sorted ascending
    pub variables: Vec<String>,
    /// Parts whose text was included
    pub parts_read: Vec<String>,
    /// Parts that could not be decoded and were skipped
    pub parts_skipped: Vec<String>,
}

/// Concatenate every `word/*.xml` part in archive order, separated by newlines.
///
/// Parts that fail to decode are logged and skipped; the main document part
/// is expected to carry the content.
pub fn collect_document_text<A: ArchiveAccess + ?Sized>(archive: &A) -> (String, ScanReport) {
    let mut text = String::new();
    let mut report = ScanReport::default();

    for path in archive.list_entries() {
        if !is_document_xml_path(path) {
            continue;
        }
        match archive.read_text(path) {
            Ok(Some(content)) if !content.is_empty() => {
                text.push_str(&content);
                text.push('\n');
                report.parts_read.push(path.to_string());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Unable to read part {}, skipping: {}", path, e);
                report.parts_skipped.push(path.to_string());
            }
        }
    }

    (text, report)
}

/// Discover the placeholder names referenced by a template
pub fn scan_archive<A: ArchiveAccess + ?Sized>(archive: &A) -> Result<ScanReport> {
    let (text, mut report) = collect_document_text(archive);
    if text.is_empty() {
        return Err(TemplateError::MissingDocumentContent);
    }

    report.variables = scan_text(&text);
    tracing::debug!(
        variables = report.variables.len(),
        parts = report.parts_read.len(),
        "Scanned template"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArchiveError, ArchiveResult};
    use proptest::prelude::*;

    /// Minimal archive double keyed by path
    struct FakeArchive(Vec<(&'static str, Option<&'static str>)>);

    impl ArchiveAccess for FakeArchive {
        fn list_entries(&self) -> Vec<&str> {
            self.0.iter().map(|(p, _)| *p).collect()
        }

        fn read_text(&self, path: &str) -> ArchiveResult<Option<String>> {
            match self.0.iter().find(|(p, _)| *p == path) {
                Some((_, Some(text))) => Ok(Some(text.to_string())),
                Some((p, None)) => Err(ArchiveError::Utf8 {
                    path: p.to_string(),
                    source: String::from_utf8(vec![0xff]).unwrap_err(),
                }),
                None => Ok(None),
            }
        }
    }

    fn paragraph(runs: &[&str]) -> String {
        let runs: String = runs
            .iter()
            .map(|t| format!("<w:r><w:rPr><w:b/></w:rPr><w:t>{t}</w:t></w:r>"))
            .collect();
        format!("<w:p>{runs}</w:p>")
    }

    #[test]
    fn test_decode_entities_is_sequential() {
        assert_eq!(decode_entities("&lt;a&gt; &quot;x&quot; &#39;y&#39;"), "<a> \"x\" 'y'");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_double_brace_pass_skips_markers() {
        let names = double_brace_pass("{{#items}}{{name}}{{/items}} {{name}} {{a.b}}");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a.b", "name"]);
    }

    #[test]
    fn test_single_brace_pass_ignores_double_brace_inner() {
        let text = "{{name}} and {city}";
        let names = single_brace_pass(text);
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["city"]);
    }

    #[test]
    fn test_single_and_double_forms_count_once() {
        let xml = paragraph(&["{{x}} then {x}"]);
        assert_eq!(scan_text(&xml), vec!["x"]);
    }

    #[test]
    fn test_split_runs_recovered_by_plain_text_pass() {
        let xml = paragraph(&["Dear {{na", "me}}, from {{sen", "der}}"]);
        assert!(double_brace_pass(&xml).is_empty());
        assert_eq!(scan_text(&xml), vec!["name", "sender"]);
    }

    #[test]
    fn test_control_markers_never_surface() {
        let xml = format!(
            "{}{}{}",
            paragraph(&["{{#section}}"]),
            paragraph(&["{{item}}"]),
            paragraph(&["{{/section}}"])
        );
        let names = scan_text(&xml);
        assert_eq!(names, vec!["item"]);
        assert!(!names.contains(&"section".to_string()));
    }

    #[test]
    fn test_entities_decoded_before_matching() {
        // braces never need escaping, but surrounding entities must not break tokens
        let xml = paragraph(&["&lt;{{lt_value}}&gt; &amp; {{amp_value}}"]);
        assert_eq!(scan_text(&xml), vec!["amp_value", "lt_value"]);
    }

    #[test]
    fn test_fallback_recovers_spaced_token_only() {
        let xml = paragraph(&["Dear {{ recipient}}, thanks for visiting."]);
        assert_eq!(scan_text(&xml), vec!["recipient"]);
    }

    #[test]
    fn test_fallback_skipped_when_enough_names() {
        let xml = paragraph(&["{{a1}} {{b2}} {{c3}} {{ spaced}}"]);
        assert_eq!(scan_text(&xml), vec!["a1", "b2", "c3"]);
    }

    #[test]
    fn test_fallback_ignores_single_letters_and_prose() {
        let plain = "x} The quick brown fox";
        assert!(fallback_pass(plain).is_empty());
    }

    #[test]
    fn test_no_placeholders_is_empty() {
        assert!(scan_text(&paragraph(&["Just some text."])).is_empty());
    }

    #[test]
    fn test_scan_archive_reads_headers_and_skips_broken_parts() {
        let archive = FakeArchive(vec![
            ("[Content_Types].xml", Some("<Types>{{not_a_part}}</Types>")),
            ("word/document.xml", Some("<w:t>{{body}}</w:t>")),
            ("word/header1.xml", Some("<w:t>{{header}}</w:t>")),
            ("word/footer1.xml", None),
            ("word/_rels/document.xml.rels", Some("{{rels}}")),
        ]);

        let report = scan_archive(&archive).unwrap();
        assert_eq!(report.variables, vec!["body", "header"]);
        assert_eq!(report.parts_read, vec!["word/document.xml", "word/header1.xml"]);
        assert_eq!(report.parts_skipped, vec!["word/footer1.xml"]);
    }

    #[test]
    fn test_scan_archive_without_content() {
        let archive = FakeArchive(vec![("word/document.xml", Some(""))]);
        assert!(matches!(
            scan_archive(&archive),
            Err(TemplateError::MissingDocumentContent)
        ));
    }

    proptest! {
        #[test]
        fn prop_output_is_sorted_distinct_set(
            names in proptest::collection::vec("[a-z_][a-z0-9_]{0,8}", 1..6),
            repeats in 1usize..4,
        ) {
            let mut runs = Vec::new();
            for _ in 0..repeats {
                for name in &names {
                    runs.push(format!("{{{{{name}}}}}"));
                }
            }
            let xml = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", runs.join(" "));

            let expected: Vec<String> = names.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
            prop_assert_eq!(scan_text(&xml), expected);
        }
    }
}
