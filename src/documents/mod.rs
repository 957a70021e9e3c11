// Document loader
// Reads every PDF in a folder into one block of text

#[cfg(test)]
pub(crate) mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{ChatError, Result};

/// Text gathered from one pass over the PDF folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedDocuments {
    /// Page text of every PDF, concatenated in file name order
    pub text: String,
    /// PDF files that were read
    pub files: Vec<PathBuf>,
}

impl LoadedDocuments {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Whether a path names a PDF file, ignoring extension case
#[inline]
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// List the PDF files directly inside `folder`, sorted by file name
#[inline]
pub fn list_pdf_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|e| {
        ChatError::Source(format!(
            "Failed to read PDF folder {}: {}",
            folder.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            ChatError::Source(format!(
                "Failed to list PDF folder {}: {}",
                folder.display(),
                e
            ))
        })?;
        let path = entry.path();
        if path.is_file() && is_pdf_path(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Extract the text of every page of one PDF
#[inline]
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .map_err(|e| ChatError::Source(format!("Failed to read {}: {}", path.display(), e)))?;

    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        ChatError::Source(format!(
            "Failed to extract text from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Read every PDF in `folder` and concatenate the extracted text
#[inline]
pub fn load_folder(folder: &Path) -> Result<LoadedDocuments> {
    let files = list_pdf_files(folder)?;

    if files.is_empty() {
        warn!("No PDF files found in {}", folder.display());
        return Ok(LoadedDocuments::default());
    }

    let mut text = String::new();
    for file in &files {
        let page_text = extract_pdf_text(file)?;
        debug!(
            "Extracted {} characters from {}",
            page_text.len(),
            file.display()
        );
        text.push_str(&page_text);
    }

    info!(
        "Loaded {} characters from {} PDF files in {}",
        text.len(),
        files.len(),
        folder.display()
    );

    Ok(LoadedDocuments { text, files })
}
