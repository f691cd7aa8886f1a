//! PDF upload handling for the text-import path.
//!
//! The upload is spooled to a temp file and walked with pdf-extract.
//! Extraction is synchronous and CPU-bound, so it runs on a blocking thread.

use std::io::Write;

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::AppError;

pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

/// Extracts the text content of an uploaded PDF. Encrypted, scanned, or
/// otherwise textless documents surface as validation errors.
pub async fn extract_pdf_text(data: Bytes) -> Result<String, AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > MAX_PDF_BYTES {
        return Err(AppError::Validation(
            "PDF exceeds the 10 MB upload limit".to_string(),
        ));
    }

    let size = data.len();
    let text = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&data)?;
        Ok(pdf_extract::extract_text(file.path())?)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
    .map_err(|e| AppError::Validation(format!("Could not extract text from PDF: {e}")))?;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(
            "PDF contained no extractable text".to_string(),
        ));
    }

    debug!("Extracted {} chars of text from a {size}-byte PDF", text.len());
    Ok(text)
}
