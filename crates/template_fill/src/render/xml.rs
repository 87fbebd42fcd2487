//! Byte-range views over WordprocessingML parts
//!
//! The renderer edits part XML in place instead of rebuilding it, so it only
//! needs to know where paragraphs and `<w:t>` text elements start and end.

use quick_xml::events::Event;
use quick_xml::Reader;
use regex_lite::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn text_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<w:t(?:\s[^>/]*)?>([^<]*)</w:t>").expect("text element pattern is valid")
    })
}

fn paragraph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(/?)w:p(?:\s[^>]*)?>").expect("paragraph pattern is valid"))
}

fn element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z_][A-Za-z0-9_:.\-]*)[^>]*?(/?)>").expect("element pattern is valid")
    })
}

/// A `<w:t>` element located in a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextRun {
    /// The opening `<w:t ...>` tag
    pub open: Range<usize>,
    /// The escaped character data between the tags
    pub content: Range<usize>,
}

impl TextRun {
    pub fn text<'a>(&self, xml: &'a str) -> &'a str {
        &xml[self.content.clone()]
    }
}

/// Locate every `<w:t>` element whose start lies in `range`
pub(crate) fn text_runs(xml: &str, range: Range<usize>) -> Vec<TextRun> {
    text_element_regex()
        .captures_iter(&xml[range.clone()])
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let content = caps.get(1)?;
            Some(TextRun {
                open: range.start + whole.start()..range.start + content.start(),
                content: range.start + content.start()..range.start + content.end(),
            })
        })
        .collect()
}

/// Locate innermost `<w:p>` paragraphs, ordered by position.
///
/// A paragraph that contains another paragraph (text boxes) is not reported.
pub(crate) fn paragraphs(xml: &str) -> Vec<Range<usize>> {
    let mut stack: Vec<(usize, bool)> = Vec::new();
    let mut found = Vec::new();

    for caps in paragraph_regex().captures_iter(xml) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.as_str().ends_with("/>") {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            if let Some((start, has_child)) = stack.pop() {
                if !has_child {
                    found.push(start..whole.end());
                }
            }
        } else {
            if let Some(parent) = stack.last_mut() {
                parent.1 = true;
            }
            stack.push((whole.start(), false));
        }
    }

    found.sort_by_key(|r| r.start);
    found
}

/// Whether every element opened in `fragment` is also closed in it
pub(crate) fn is_balanced(fragment: &str) -> bool {
    let mut stack: Vec<&str> = Vec::new();

    for caps in element_regex().captures_iter(fragment) {
        let (Some(slash), Some(name), Some(self_closing)) = (caps.get(1), caps.get(2), caps.get(3))
        else {
            return false;
        };
        if !self_closing.as_str().is_empty() {
            continue;
        }
        if slash.as_str().is_empty() {
            stack.push(name.as_str());
        } else if stack.pop() != Some(name.as_str()) {
            return false;
        }
    }

    stack.is_empty()
}

/// Ensure an opening `<w:t>` tag preserves whitespace
pub(crate) fn preserve_space(open_tag: &str) -> String {
    if open_tag.contains("xml:space=") {
        open_tag.to_string()
    } else {
        format!("<w:t xml:space=\"preserve\"{}", &open_tag["<w:t".len()..])
    }
}

/// Parse the whole part, reporting the first structural error
pub(crate) fn check_well_formed(xml: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = true;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                ))
            }
        }
    }
}
