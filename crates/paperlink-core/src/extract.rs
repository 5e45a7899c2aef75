//! Text extraction from source documents.
//!
//! Dispatches on file extension: `.pdf` goes through the PDF extractor
//! (behind the `pdf` feature), `.txt`/`.md` are read as UTF-8 plaintext,
//! and unknown extensions fall back to a plaintext read. Extraction never
//! raises: a missing or unreadable file yields an empty string and the
//! caller decides whether zero chunks constitutes a failure.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

pub fn extract_text(file_path: &Path) -> String {
    if !file_path.exists() {
        error!("file not found: {}", file_path.display());
        return String::new();
    }

    let suffix = file_path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);

    match suffix.as_deref() {
        Some("pdf") => extract_pdf(file_path),
        Some("txt") | Some("md") => extract_plaintext(file_path),
        other => {
            warn!("unsupported file format {:?}, trying plaintext read", other);
            extract_plaintext(file_path)
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(pdf_path: &Path) -> String {
    match pdf_extract::extract_text(pdf_path) {
        Ok(text) => {
            info!(
                "extracted {} characters from {}",
                text.len(),
                pdf_path.display()
            );
            text
        }
        Err(e) => {
            error!("error extracting PDF text from {}: {e}", pdf_path.display());
            String::new()
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(pdf_path: &Path) -> String {
    error!(
        "PDF support not compiled in, cannot extract {}",
        pdf_path.display()
    );
    String::new()
}

fn extract_plaintext(txt_path: &Path) -> String {
    let text = match fs::read_to_string(txt_path) {
        Ok(text) => text,
        // Not valid UTF-8: degrade instead of failing the document.
        Err(_) => match fs::read(txt_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            Err(e) => {
                error!("error reading text file {}: {e}", txt_path.display());
                return String::new();
            }
        },
    };
    info!("read {} characters from {}", text.len(), txt_path.display());
    text
}
