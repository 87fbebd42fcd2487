//! DOCX Template Filling
//!
//! This crate discovers the placeholders in a Word template, completes caller
//! data against them, and renders a new document.
//!
//! # Features
//!
//! - In-memory DOCX archive reading and writing
//! - Layered placeholder discovery (`{{name}}`, `{name}`, tag-free text)
//! - Value coercion and completion of missing or empty fields
//! - Rendering with split-run repair, XML escaping, line breaks, and sections
//! - A session state machine for upload, fill, and generate
//!
//! # Example
//!
//! ```rust
//! use template_fill::{
//!     ArchiveAccess, ArchiveEntry, MemorySink, RawData, TemplateArchive, Value,
//!     generate_document_from_bytes, parse_template_variables, GeneratorConfig, DOCUMENT_PART,
//! };
//!
//! let xml = "<w:document><w:body><w:p><w:r><w:t>Hello {{name}}</w:t></w:r></w:p></w:body></w:document>";
//! let template = TemplateArchive::from_entries(vec![ArchiveEntry::file(DOCUMENT_PART, xml)])
//!     .unwrap()
//!     .to_bytes()
//!     .unwrap();
//!
//! let config = GeneratorConfig::default();
//! assert_eq!(parse_template_variables(&template, &config).unwrap(), vec!["name"]);
//!
//! let mut data = RawData::new();
//! data.insert("name".to_string(), Value::from("Ada"));
//!
//! let sink = MemorySink::new();
//! generate_document_from_bytes(&template, &data, Some("hello.docx"), &config, &sink).unwrap();
//!
//! let output = TemplateArchive::open(&sink.last().unwrap().bytes).unwrap();
//! assert!(output.read_text(DOCUMENT_PART).unwrap().unwrap().contains("Hello Ada"));
//! ```

pub mod archive;
pub mod config;
mod error;
pub mod generator;
pub mod render;
pub mod sanitizer;
pub mod scanner;
pub mod session;
pub mod sink;
mod value;

// Re-export main types
pub use archive::{ArchiveAccess, ArchiveEntry, EntryCompression, TemplateArchive, DOCUMENT_PART, DOCX_MIME_TYPE, MIN_FILE_SIZE};
pub use config::{ConfigError, ConfigManager, GeneratorConfig};
pub use error::{ArchiveError, ArchiveResult, Phase, PhaseError, Result, TemplateError};
pub use generator::{
    filled_file_name, generate_document_from_bytes, generate_filled_document, generate_simple_document,
    load_template, load_template_sync, parse_template_variables, render_document, require_template_variables,
    GenerateOptions,
};
pub use render::{render, Delimiters, MissingValue, RenderError, RenderOptions};
pub use sanitizer::{complete, sanitize_all, DocumentData};
pub use scanner::{scan_archive, scan_text, ScanReport};
pub use session::{FillSession, GenerationStatus, SessionError};
pub use sink::{DirectorySink, DocumentSink, MemorySink, SavedDocument};
pub use value::{RawData, Value};
