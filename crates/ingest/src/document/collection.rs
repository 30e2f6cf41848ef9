//! The knowledge-base PDF directory: listing, loading, and file management.

use std::fs;
use std::path::{Path, PathBuf};

use parentkb_core::PageText;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{extract_pdf, ExtractionError};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("invalid file name: '{0}'")]
    InvalidName(String),
    #[error("only PDF files are allowed: '{0}'")]
    NotPdf(String),
    #[error("PDF file '{0}' not found")]
    NotFound(String),
    #[error("PDF file '{0}' already exists")]
    AlreadyExists(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the pipeline gets page text from.
///
/// Loading is blocking (file IO + PDF parsing); async callers should run it on
/// the blocking pool.
pub trait DocumentSource: Send + Sync {
    /// Every non-empty page across all current files.
    fn load_all(&self) -> Result<Vec<PageText>, CollectionError>;

    /// Non-empty pages of one file. Empty if the file is absent or has no text.
    fn load_one(&self, name: &str) -> Result<Vec<PageText>, CollectionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfFile {
    pub name: String,
    pub size: u64,
}

/// A flat directory of PDF files.
pub struct PdfCollection {
    dir: PathBuf,
}

impl PdfCollection {
    /// Open the collection, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CollectionError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All PDF files, sorted by name.
    pub fn list(&self) -> Result<Vec<PdfFile>, CollectionError> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_pdf_name(name) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(PdfFile {
                name: name.to_string(),
                size,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Store uploaded bytes. If `name` is taken, `_1`, `_2`, ... is appended to
    /// the stem. Returns the stored file name.
    pub fn save_upload(&self, name: &str, bytes: &[u8]) -> Result<String, CollectionError> {
        validate_name(name)?;
        if !is_pdf_name(name) {
            return Err(CollectionError::NotPdf(name.to_string()));
        }

        let (stem, ext) = split_extension(name);
        let mut stored = name.to_string();
        let mut counter = 1;
        while self.dir.join(&stored).exists() {
            stored = format!("{stem}_{counter}{ext}");
            counter += 1;
        }

        fs::write(self.dir.join(&stored), bytes)?;
        info!(file = %stored, bytes = bytes.len(), "saved uploaded PDF");
        Ok(stored)
    }

    /// Rename `old` to `new` (`.pdf` is appended to `new` when missing).
    /// Returns the final new name.
    pub fn rename(&self, old: &str, new: &str) -> Result<String, CollectionError> {
        validate_name(old)?;
        let new = if is_pdf_name(new) {
            new.to_string()
        } else {
            format!("{new}.pdf")
        };
        validate_name(&new)?;

        let old_path = self.dir.join(old);
        let new_path = self.dir.join(&new);
        if !old_path.is_file() {
            return Err(CollectionError::NotFound(old.to_string()));
        }
        if old != new && new_path.exists() {
            return Err(CollectionError::AlreadyExists(new));
        }

        fs::rename(&old_path, &new_path)?;
        info!(from = old, to = %new, "renamed PDF");
        Ok(new)
    }

    pub fn delete(&self, name: &str) -> Result<(), CollectionError> {
        validate_name(name)?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(CollectionError::NotFound(name.to_string()));
        }
        if !is_pdf_name(name) {
            return Err(CollectionError::NotPdf(name.to_string()));
        }
        fs::remove_file(&path)?;
        info!(file = name, "deleted PDF");
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.dir.join(name).is_file()
    }

    fn load_file(&self, name: &str) -> Result<Vec<PageText>, ExtractionError> {
        let bytes = fs::read(self.dir.join(name))?;
        let pages = extract_pdf(&bytes)?;
        debug!(file = name, pages = pages.len(), "extracted PDF text");
        Ok(pages
            .into_iter()
            .map(|p| PageText::new(p.text, name, Some(p.page_number)))
            .collect())
    }
}

impl DocumentSource for PdfCollection {
    fn load_all(&self) -> Result<Vec<PageText>, CollectionError> {
        let mut pages = Vec::new();
        for file in self.list()? {
            match self.load_file(&file.name) {
                Ok(mut file_pages) => pages.append(&mut file_pages),
                Err(e) => warn!(file = %file.name, error = %e, "skipping unreadable PDF"),
            }
        }
        Ok(pages)
    }

    fn load_one(&self, name: &str) -> Result<Vec<PageText>, CollectionError> {
        validate_name(name)?;
        if !self.dir.join(name).is_file() {
            return Ok(Vec::new());
        }
        match self.load_file(name) {
            Ok(pages) => Ok(pages),
            Err(e) => {
                warn!(file = name, error = %e, "failed to load PDF");
                Ok(Vec::new())
            }
        }
    }
}

fn is_pdf_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}

/// Reject anything that could escape the collection directory.
fn validate_name(name: &str) -> Result<(), CollectionError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(CollectionError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// "guide.final.pdf" -> ("guide.final", ".pdf")
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    }
}
