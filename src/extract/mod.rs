//! Local text extraction from study documents.
//!
//! Dispatches on the lowercased file extension: `.txt` is read as UTF-8,
//! `.pdf` goes through pdf-extract, `.docx` is unzipped and the text of
//! `word/document.xml` is pulled out with paragraph breaks. Extracted text
//! is cleaned up and capped at a character budget before being handed to
//! the prompt layer.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::debug;

const TRUNCATION_MARKER: &str = "\n\n[Content truncated - showing first portion of document]";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported file type: '{0}'. Only .txt, .docx, and .pdf are supported")]
    Unsupported(String),
    #[error("failed to read PDF: {0}")]
    Pdf(String),
    #[error("failed to read DOCX: {0}")]
    Docx(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract the raw text content of `path` based on its extension.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    debug!(path = %path.display(), %ext, "extracting document text");

    match ext.as_str() {
        "txt" => Ok(fs::read_to_string(path)?),
        "pdf" => pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string())),
        "docx" => extract_docx(path),
        other => Err(ExtractError::Unsupported(format!(".{other}"))),
    }
}

/// Extract, clean up and truncate to `max_chars` for inclusion in a prompt.
///
/// Truncation prefers a sentence boundary in the final 20% of the window and
/// appends a visible marker; untruncated content is returned unchanged.
pub fn extract_for_prompt(path: &Path, max_chars: usize) -> Result<String, ExtractError> {
    let text = extract_text(path)?;
    Ok(truncate_at_sentence(&cleanup(&text), max_chars))
}

// ── DOCX ──────────────────────────────────────────────────────────────────────

/// A `.docx` file is a ZIP archive; the document body lives in
/// `word/document.xml`.
fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let file = fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("word/document.xml missing: {e}")))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    docx_xml_to_text(&xml)
}

/// Pull visible text out of WordprocessingML: `<w:t>` runs carry text,
/// `</w:p>` ends a paragraph, `<w:br/>` and `<w:tab/>` are whitespace.
fn docx_xml_to_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" => out.push('\n'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => out.push('\t'),
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
    }
    Ok(out)
}

// ── Post-processing ───────────────────────────────────────────────────────────

fn cleanup(text: &str) -> String {
    let mut cleaned = text.to_string();
    while cleaned.contains("\n\n\n") {
        cleaned = cleaned.replace("\n\n\n", "\n\n");
    }
    cleaned.trim().to_string()
}

fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let window = &text[..cut];

    // Prefer ending on a sentence, but only if the period falls in the last
    // 20% of the window — otherwise too much content would be dropped.
    let threshold = (max_chars * 4) / 5;
    let cut_at = window
        .rfind('.')
        .filter(|&i| window[..=i].chars().count() > threshold)
        .map(|i| i + 1)
        .unwrap_or(window.len());

    format!("{}{TRUNCATION_MARKER}", &window[..cut_at])
}
