//! Destinations for generated documents

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Accepts finished document bytes under a file name
pub trait DocumentSink {
    fn save(&self, bytes: &[u8], mime_type: &str, file_name: &str) -> io::Result<()>;
}

/// Writes documents into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where a document named `file_name` ends up
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl DocumentSink for DirectorySink {
    fn save(&self, bytes: &[u8], mime_type: &str, file_name: &str) -> io::Result<()> {
        // A bare file name keeps writes inside `dir`
        if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid output file name: {file_name}"),
            ));
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(file_name);
        std::fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), mime_type, bytes = bytes.len(), "Saved document");
        Ok(())
    }
}

/// A document captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Keeps saved documents in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<SavedDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents saved so far, oldest first
    pub fn documents(&self) -> Vec<SavedDocument> {
        match self.saved.lock() {
            Ok(saved) => saved.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The most recently saved document
    pub fn last(&self) -> Option<SavedDocument> {
        self.documents().pop()
    }
}

impl DocumentSink for MemorySink {
    fn save(&self, bytes: &[u8], mime_type: &str, file_name: &str) -> io::Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink lock poisoned"))?;
        saved.push(SavedDocument {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

impl<S: DocumentSink + ?Sized> DocumentSink for &S {
    fn save(&self, bytes: &[u8], mime_type: &str, file_name: &str) -> io::Result<()> {
        (**self).save(bytes, mime_type, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::DOCX_MIME_TYPE;
    use tempfile::TempDir;

    #[test]
    fn test_directory_sink_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp_dir.path().join("out/nested"));

        sink.save(b"PK\x03\x04", DOCX_MIME_TYPE, "a.docx").unwrap();
        assert_eq!(std::fs::read(sink.path_for("a.docx")).unwrap(), b"PK\x03\x04");
    }

    #[test]
    fn test_directory_sink_rejects_paths() {
        let temp_dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp_dir.path());

        let err = sink.save(b"x", DOCX_MIME_TYPE, "../escape.docx").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(sink.save(b"x", DOCX_MIME_TYPE, "").is_err());
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.save(b"one", DOCX_MIME_TYPE, "1.docx").unwrap();
        (&sink).save(b"two", DOCX_MIME_TYPE, "2.docx").unwrap();

        let docs = sink.documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].file_name, "1.docx");
        assert_eq!(sink.last().unwrap().bytes, b"two");
        assert_eq!(docs[1].mime_type, DOCX_MIME_TYPE);
    }
}
