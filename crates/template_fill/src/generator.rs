//! End-to-end fill workflow
//!
//! Each entry point runs one phase of the workflow (load, parse, or generate)
//! and reports failures as a [`PhaseError`] carrying that phase's prefix.
//! Failures are logged before they are returned.

use crate::archive::{check_size, TemplateArchive, DOCX_MIME_TYPE};
use crate::config::GeneratorConfig;
use crate::error::{Phase, PhaseError, Result, TemplateError};
use crate::render::render;
use crate::sanitizer::{complete, sanitize_all, DocumentData};
use crate::scanner::scan_archive;
use crate::sink::DocumentSink;
use crate::value::RawData;
use std::io;
use std::path::{Path, PathBuf};

/// Overrides for [`generate_simple_document`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Template to load instead of the configured default
    pub template_path: Option<PathBuf>,
    /// Output name instead of the configured default
    pub output_file_name: Option<String>,
}

fn fail(phase: Phase, err: impl Into<TemplateError>) -> PhaseError {
    let err = PhaseError::new(phase, err);
    tracing::error!("{}", err);
    err
}

fn read_error(path: &Path, err: io::Error) -> TemplateError {
    if err.kind() == io::ErrorKind::NotFound {
        TemplateError::TemplateNotFound(path.display().to_string())
    } else {
        TemplateError::Unknown(format!("unable to read {}: {}", path.display(), err))
    }
}

fn checked(bytes: Vec<u8>, min_size: usize) -> Result<Vec<u8>> {
    check_size(&bytes, min_size)?;
    Ok(bytes)
}

async fn read_template(path: &Path, min_size: usize) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded template");
    checked(bytes, min_size)
}

/// Read template bytes from disk
pub async fn load_template(path: impl AsRef<Path>, min_size: usize) -> std::result::Result<Vec<u8>, PhaseError> {
    read_template(path.as_ref(), min_size)
        .await
        .map_err(|e| fail(Phase::Load, e))
}

/// Read template bytes from disk synchronously
pub fn load_template_sync(path: impl AsRef<Path>, min_size: usize) -> std::result::Result<Vec<u8>, PhaseError> {
    let path = path.as_ref();
    std::fs::read(path)
        .map_err(|e| read_error(path, e))
        .and_then(|bytes| checked(bytes, min_size))
        .map_err(|e| fail(Phase::Load, e))
}

/// Placeholder names referenced by a template, sorted ascending.
///
/// A template without placeholders yields an empty list.
pub fn parse_template_variables(
    bytes: &[u8],
    config: &GeneratorConfig,
) -> std::result::Result<Vec<String>, PhaseError> {
    let scan = || -> Result<Vec<String>> {
        let archive = TemplateArchive::open_with_min_size(bytes, config.min_file_size)?;
        Ok(scan_archive(&archive)?.variables)
    };
    scan().map_err(|e| fail(Phase::Parse, e))
}

/// Like [`parse_template_variables`], but a template without placeholders
/// is an error
pub fn require_template_variables(
    bytes: &[u8],
    config: &GeneratorConfig,
) -> std::result::Result<Vec<String>, PhaseError> {
    let variables = parse_template_variables(bytes, config)?;
    if variables.is_empty() {
        return Err(fail(Phase::Parse, TemplateError::NoVariablesFound));
    }
    Ok(variables)
}

/// Render template bytes with `data` into new document bytes
pub fn render_document(bytes: &[u8], data: &DocumentData, config: &GeneratorConfig) -> Result<Vec<u8>> {
    let archive = TemplateArchive::open_with_min_size(bytes, config.min_file_size)?;
    let rendered = render(&archive, data, &config.render)?;
    rendered
        .to_bytes()
        .map_err(|e| TemplateError::Unknown(format!("unable to write document: {e}")))
}

fn render_and_save<S: DocumentSink + ?Sized>(
    bytes: &[u8],
    data: &DocumentData,
    file_name: &str,
    config: &GeneratorConfig,
    sink: &S,
) -> Result<()> {
    let output = render_document(bytes, data, config)?;
    sink.save(&output, DOCX_MIME_TYPE, file_name)
        .map_err(|e| TemplateError::Unknown(format!("unable to save {file_name}: {e}")))?;
    tracing::info!(file_name, bytes = output.len(), "Generated document");
    Ok(())
}

/// Timestamped name for documents generated without an explicit name
pub fn default_output_name() -> String {
    format!("generated-{}.docx", chrono::Utc::now().timestamp_millis())
}

/// Fill template bytes with every value in `data` and hand the result to `sink`.
///
/// Returns the file name the document was saved under.
pub fn generate_document_from_bytes<S: DocumentSink + ?Sized>(
    bytes: &[u8],
    data: &RawData,
    file_name: Option<&str>,
    config: &GeneratorConfig,
    sink: &S,
) -> std::result::Result<String, PhaseError> {
    let file_name = file_name.map(str::to_string).unwrap_or_else(default_output_name);
    render_and_save(bytes, &sanitize_all(data), &file_name, config, sink)
        .map_err(|e| fail(Phase::Generate, e))?;
    Ok(file_name)
}

/// Fill template bytes for a known list of placeholder names.
///
/// Every name in `variables` gets a value; names missing from `data` render
/// as empty text and keys outside `variables` are ignored.
pub fn generate_filled_document<S: DocumentSink + ?Sized>(
    bytes: &[u8],
    data: &RawData,
    variables: &[String],
    file_name: &str,
    config: &GeneratorConfig,
    sink: &S,
) -> std::result::Result<(), PhaseError> {
    render_and_save(bytes, &complete(data, variables), file_name, config, sink)
        .map_err(|e| fail(Phase::Generate, e))
}

/// Fill the configured default template (or `options.template_path`).
///
/// Load failures are reported as generation failures, since loading is part
/// of generating here.
pub async fn generate_simple_document<S: DocumentSink + ?Sized>(
    data: &RawData,
    options: &GenerateOptions,
    config: &GeneratorConfig,
    sink: &S,
) -> std::result::Result<String, PhaseError> {
    let path = options
        .template_path
        .as_deref()
        .unwrap_or(config.default_template_path.as_path());
    let file_name = options
        .output_file_name
        .clone()
        .unwrap_or_else(|| config.default_output_file_name.clone());

    let bytes = read_template(path, config.min_file_size)
        .await
        .map_err(|e| fail(Phase::Generate, e))?;
    render_and_save(&bytes, &sanitize_all(data), &file_name, config, sink)
        .map_err(|e| fail(Phase::Generate, e))?;
    Ok(file_name)
}

/// Output name for a filled upload: the first `.docx` becomes `_filled.docx`
pub fn filled_file_name(upload_name: &str) -> String {
    upload_name.replacen(".docx", "_filled.docx", 1)
}
