//! Consolidation of tags split across text runs
//!
//! Word starts a new run whenever formatting changes, so `{{name}}` may be
//! stored as `{{na` and `me}}` in two `<w:t>` elements. Within each paragraph
//! the run texts are joined, every tag is moved whole into the run where it
//! starts, and the leftover pieces are removed from the following runs.

use super::error::RenderResult;
use super::tags::lex;
use super::xml::{paragraphs, preserve_space, text_runs, TextRun};
use super::{apply_edits, Delimiters, Edit};

/// Rewrite `xml` so that no tag spans more than one text run
pub(crate) fn merge_split_tags(xml: &str, delimiters: &Delimiters, part: &str) -> RenderResult<String> {
    let mut edits = Vec::new();

    for paragraph in paragraphs(xml) {
        let runs = text_runs(xml, paragraph);
        if runs.len() < 2 {
            continue;
        }
        edits.extend(merge_paragraph(xml, &runs, delimiters, part)?);
    }

    if edits.is_empty() {
        return Ok(xml.to_string());
    }
    tracing::trace!(part, edits = edits.len(), "Merged split tags");
    Ok(apply_edits(xml, edits))
}

fn merge_paragraph(
    xml: &str,
    runs: &[TextRun],
    delimiters: &Delimiters,
    part: &str,
) -> RenderResult<Vec<Edit>> {
    let joined: String = runs.iter().map(|r| r.text(xml)).collect();
    let spans = lex(&joined, delimiters, part)?;

    // Offsets of each run's text inside `joined`
    let mut bounds = Vec::with_capacity(runs.len());
    let mut offset = 0;
    for run in runs {
        let len = run.content.len();
        bounds.push(offset..offset + len);
        offset += len;
    }

    if !spans
        .iter()
        .any(|s| bounds.iter().all(|b| !(b.start <= s.range.start && s.range.end <= b.end)))
    {
        return Ok(Vec::new());
    }

    let mut texts = vec![String::new(); runs.len()];
    let distribute = |texts: &mut Vec<String>, from: usize, to: usize| {
        for (index, bound) in bounds.iter().enumerate() {
            let start = from.max(bound.start);
            let end = to.min(bound.end);
            if start < end {
                texts[index].push_str(&joined[start..end]);
            }
        }
    };

    let mut cursor = 0;
    for span in &spans {
        distribute(&mut texts, cursor, span.range.start);
        let owner = bounds
            .iter()
            .position(|b| b.start <= span.range.start && span.range.start < b.end)
            .unwrap_or(0);
        texts[owner].push_str(&joined[span.range.clone()]);
        cursor = span.range.end;
    }
    distribute(&mut texts, cursor, joined.len());

    let mut edits = Vec::new();
    for (run, text) in runs.iter().zip(texts) {
        if run.text(xml) == text {
            continue;
        }
        let open_tag = &xml[run.open.clone()];
        let preserved = preserve_space(open_tag);
        if preserved != open_tag {
            edits.push(Edit::new(run.open.clone(), preserved));
        }
        edits.push(Edit::new(run.content.clone(), text));
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(xml: &str) -> String {
        merge_split_tags(xml, &Delimiters::default(), "word/document.xml").unwrap()
    }

    #[test]
    fn test_merges_tag_split_across_three_runs() {
        let xml = concat!(
            r#"<w:p><w:r><w:t>Dear {{cli</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t>ent_na</w:t></w:r>"#,
            r#"<w:r><w:t>me}}, hi</w:t></w:r></w:p>"#
        );
        let merged = merge(xml);
        assert_eq!(
            merged,
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">Dear {{client_name}}</w:t></w:r>"#,
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve"></w:t></w:r>"#,
                r#"<w:r><w:t xml:space="preserve">, hi</w:t></w:r></w:p>"#
            )
        );
    }

    #[test]
    fn test_split_delimiters() {
        let xml = r#"<w:p><w:r><w:t>{</w:t></w:r><w:r><w:t>{x}</w:t></w:r><w:r><w:t>}</w:t></w:r></w:p>"#;
        let merged = merge(xml);
        assert!(merged.contains(r#"<w:t xml:space="preserve">{{x}}</w:t>"#));
    }

    #[test]
    fn test_untouched_when_tags_are_whole() {
        let xml = r#"<w:p><w:r><w:t>{{a}}</w:t></w:r><w:r><w:t>{{b}}</w:t></w:r></w:p>"#;
        assert_eq!(merge(xml), xml);
    }

    #[test]
    fn test_paragraphs_are_independent() {
        let xml = r#"<w:p><w:r><w:t>{{a</w:t></w:r></w:p><w:p><w:r><w:t>}}</w:t></w:r></w:p>"#;
        assert!(merge_split_tags(xml, &Delimiters::default(), "p").is_ok());
    }
}
