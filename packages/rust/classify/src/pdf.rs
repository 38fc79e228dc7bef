//! Best-effort text extraction from fetched PDF bytes.

use lopdf::Document as PdfDocument;

use parlwatch_shared::{MonitorError, Result};

/// Extract the text content of every page of a PDF.
///
/// Extraction quality varies with the producing tool; callers treat any
/// failure as "no body text" and classify on title/description alone.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let document = PdfDocument::load_mem(bytes)
        .map_err(|e| MonitorError::parse(format!("PDF load failed: {e}")))?;

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    document
        .extract_text(&pages)
        .map_err(|e| MonitorError::parse(format!("PDF text extraction failed: {e}")))
}
