//! ZIP container access for DOCX templates
//!
//! A DOCX file is a ZIP archive of XML parts. The template workflow only needs
//! two things from it: an ordered listing of entry paths and the text of the
//! XML parts. [`TemplateArchive`] loads every entry into memory once, so the
//! scanner and the renderer can read it without re-parsing, and the renderer
//! produces a *new* archive instead of mutating this one.

use crate::error::{ArchiveError, ArchiveResult};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Path of the main document body inside a DOCX container
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Folder holding the WordprocessingML parts
pub const DOCUMENT_FOLDER: &str = "word/";

/// MIME type of generated documents
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Smallest byte length accepted before attempting to parse a container
pub const MIN_FILE_SIZE: usize = 4;

/// Typed read access to the entries of a DOCX container
pub trait ArchiveAccess {
    /// Entry paths in archive order
    fn list_entries(&self) -> Vec<&str>;

    /// Decode an entry as UTF-8 text. Returns `Ok(None)` when the entry is absent.
    fn read_text(&self, path: &str) -> ArchiveResult<Option<String>>;
}

/// How an entry is stored in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCompression {
    Stored,
    Deflated,
}

impl From<CompressionMethod> for EntryCompression {
    fn from(method: CompressionMethod) -> Self {
        if method == CompressionMethod::Stored {
            EntryCompression::Stored
        } else {
            EntryCompression::Deflated
        }
    }
}

impl From<EntryCompression> for CompressionMethod {
    fn from(compression: EntryCompression) -> Self {
        match compression {
            EntryCompression::Stored => CompressionMethod::Stored,
            EntryCompression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// A single entry of a template archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the container
    pub name: String,
    /// Uncompressed bytes
    pub data: Vec<u8>,
    /// Compression used when the entry is written back
    pub compression: EntryCompression,
    /// Whether this entry is a directory marker
    pub is_dir: bool,
}

impl ArchiveEntry {
    /// Create a deflated file entry
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            compression: EntryCompression::Deflated,
            is_dir: false,
        }
    }

    /// Whether this entry is an XML part of the document folder
    pub fn is_document_xml(&self) -> bool {
        !self.is_dir && is_document_xml_path(&self.name)
    }
}

/// Whether a path names an XML part under `word/`
pub fn is_document_xml_path(path: &str) -> bool {
    path.starts_with(DOCUMENT_FOLDER) && path.ends_with(".xml")
}

/// Reject inputs that are implausibly small before any ZIP parsing happens
pub fn check_size(bytes: &[u8], min_size: usize) -> ArchiveResult<()> {
    if bytes.is_empty() {
        return Err(ArchiveError::EmptyInput);
    }
    if bytes.len() < min_size {
        return Err(ArchiveError::TooSmall {
            size: bytes.len(),
            min: min_size,
        });
    }
    Ok(())
}

/// An in-memory DOCX container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateArchive {
    entries: Vec<ArchiveEntry>,
}

impl TemplateArchive {
    /// Open a DOCX container using the default minimum size
    pub fn open(bytes: &[u8]) -> ArchiveResult<Self> {
        Self::open_with_min_size(bytes, MIN_FILE_SIZE)
    }

    /// Open a DOCX container, rejecting inputs shorter than `min_size`
    pub fn open_with_min_size(bytes: &[u8], min_size: usize) -> ArchiveResult<Self> {
        check_size(bytes, min_size)?;

        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data)
                    .map_err(|e| ArchiveError::InvalidArchive(e.into()))?;
            }
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression().into(),
                is_dir: file.is_dir(),
            });
        }

        tracing::debug!(entries = entries.len(), "Opened template archive");
        Self::from_entries(entries)
    }

    /// Build an archive from entries, validating that the document body exists
    pub fn from_entries(entries: Vec<ArchiveEntry>) -> ArchiveResult<Self> {
        if !entries.iter().any(|e| e.name == DOCUMENT_PART && !e.is_dir) {
            return Err(ArchiveError::MissingDocumentPart(DOCUMENT_PART.to_string()));
        }
        Ok(Self { entries })
    }

    /// All entries in archive order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Look up an entry by path
    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries (never true for a validated archive)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return a copy of this archive with `path` replaced (or appended)
    pub fn with_entry(&self, path: &str, data: Vec<u8>) -> Self {
        self.with_entries(vec![(path.to_string(), data)])
    }

    /// Return a copy of this archive with every `(path, data)` pair applied
    pub fn with_entries(&self, updates: Vec<(String, Vec<u8>)>) -> Self {
        let mut entries = self.entries.clone();
        for (path, data) in updates {
            match entries.iter_mut().find(|e| e.name == path) {
                Some(entry) => entry.data = data,
                None => entries.push(ArchiveEntry::file(path, data)),
            }
        }
        Self { entries }
    }

    /// Serialize the archive back into ZIP bytes
    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let options = SimpleFileOptions::default().compression_method(entry.compression.into());
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)?;
            } else {
                zip.start_file(entry.name.as_str(), options)?;
                zip.write_all(&entry.data)?;
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

impl ArchiveAccess for TemplateArchive {
    fn list_entries(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn read_text(&self, path: &str) -> ArchiveResult<Option<String>> {
        match self.entry(path) {
            Some(entry) if !entry.is_dir => String::from_utf8(entry.data.clone())
                .map(Some)
                .map_err(|source| ArchiveError::Utf8 {
                    path: path.to_string(),
                    source,
                }),
            _ => Ok(None),
        }
    }
}
