//! Error types for template operations

use crate::render::RenderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while opening or reading a DOCX container
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Zero-length input
    #[error("input is empty")]
    EmptyInput,

    /// Input shorter than the smallest plausible archive
    #[error("input is too small: {size} bytes (minimum {min})")]
    TooSmall { size: usize, min: usize },

    /// ZIP structure could not be read
    #[error("ZIP error: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),

    /// Required part is absent from the archive
    #[error("Missing required part: {0}")]
    MissingDocumentPart(String),

    /// Part bytes are not UTF-8 text
    #[error("Part {path} is not valid UTF-8: {source}")]
    Utf8 {
        path: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// IO error while reading or writing entry data
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for archive operations
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Failure taxonomy for the fill workflow
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template bytes are empty
    #[error("template file is empty")]
    EmptyInput,

    /// Template bytes are too short to be a DOCX file
    #[error("invalid template file: too small ({size} bytes, minimum {min})")]
    TooSmall { size: usize, min: usize },

    /// The bytes are not a readable DOCX container
    #[error("unable to read the template, make sure it is a valid DOCX file: {0}")]
    InvalidArchive(#[source] ArchiveError),

    /// Template path does not exist
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Uploaded file does not carry the .docx extension
    #[error("please upload a .docx file (got {0})")]
    NotDocx(String),

    /// No readable document part produced any text
    #[error("unable to find document content")]
    MissingDocumentContent,

    /// The scanner found no placeholders
    #[error("no variables found in the template, make sure it contains {{{{name}}}} placeholders")]
    NoVariablesFound,

    /// The engine failed to substitute values
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Anything else, including sink failures
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<ArchiveError> for TemplateError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::EmptyInput => TemplateError::EmptyInput,
            ArchiveError::TooSmall { size, min } => TemplateError::TooSmall { size, min },
            other => TemplateError::InvalidArchive(other),
        }
    }
}

impl From<std::io::Error> for TemplateError {
    fn from(err: std::io::Error) -> Self {
        TemplateError::Unknown(err.to_string())
    }
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Workflow phase an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Reading template bytes from disk
    Load,
    /// Discovering placeholder names
    Parse,
    /// Sanitizing, rendering, and saving
    Generate,
}

impl Phase {
    /// Human-readable prefix used when reporting a failure in this phase
    pub fn prefix(&self) -> &'static str {
        match self {
            Phase::Load => "failed to load template",
            Phase::Parse => "failed to parse template variables",
            Phase::Generate => "document generation failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A [`TemplateError`] wrapped with the phase that produced it
#[derive(Debug, Error)]
#[error("{phase}: {source}")]
pub struct PhaseError {
    pub phase: Phase,
    #[source]
    pub source: TemplateError,
}

impl PhaseError {
    pub fn new(phase: Phase, source: impl Into<TemplateError>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }

    /// The underlying failure
    pub fn kind(&self) -> &TemplateError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_error_maps_size_checks() {
        assert!(matches!(
            TemplateError::from(ArchiveError::EmptyInput),
            TemplateError::EmptyInput
        ));
        assert!(matches!(
            TemplateError::from(ArchiveError::TooSmall { size: 2, min: 4 }),
            TemplateError::TooSmall { size: 2, min: 4 }
        ));
        assert!(matches!(
            TemplateError::from(ArchiveError::MissingDocumentPart("word/document.xml".into())),
            TemplateError::InvalidArchive(_)
        ));
    }

    #[test]
    fn test_phase_error_message_has_prefix() {
        let err = PhaseError::new(Phase::Parse, TemplateError::NoVariablesFound);
        let message = err.to_string();
        assert!(message.starts_with("failed to parse template variables: "));
        assert!(message.contains("{{name}}"));
        assert!(matches!(err.kind(), TemplateError::NoVariablesFound));
    }
}
