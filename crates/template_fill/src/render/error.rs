//! Error types for template rendering

use thiserror::Error;

/// Errors that can occur while substituting values into a template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Opening delimiter without a matching closing delimiter in the same paragraph
    #[error("Unclosed tag in {part}: {context}")]
    UnclosedTag { part: String, context: String },

    /// Closing section marker without an opening marker
    #[error("Unopened section in {part}: {name}")]
    UnopenedSection { part: String, name: String },

    /// Opening section marker that is never closed
    #[error("Unclosed section in {part}: {name}")]
    UnclosedSection { part: String, name: String },

    /// Closing marker names a different section than the innermost open one
    #[error("Mismatched section in {part}: opened {open}, closed {close}")]
    MismatchedSection {
        part: String,
        open: String,
        close: String,
    },

    /// Start or end delimiter is empty
    #[error("Invalid delimiters: start {start:?}, end {end:?}")]
    InvalidDelimiters { start: String, end: String },

    /// A placeholder had no value and the missing-value policy is `Error`
    #[error("Missing value for placeholder: {0}")]
    MissingValue(String),

    /// A document part is not UTF-8 text
    #[error("Part is not valid UTF-8: {0}")]
    InvalidPart(String),

    /// Substitution produced XML that no longer parses
    #[error("Rendered part {part} is not well-formed: {reason}")]
    MalformedOutput { part: String, reason: String },
}

/// Result type for rendering
pub type RenderResult<T> = std::result::Result<T, RenderError>;
