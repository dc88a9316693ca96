//! PDF text extraction backed by `lopdf`.

use super::ExtractError;
use lopdf::Document;

/// Extract text from every page, concatenated in document order.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes)?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut text = String::new();
    for page_number in page_numbers {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                let trimmed = page_text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(trimmed);
            }
            Err(error) => {
                // Pages without a decodable content stream are skipped rather
                // than failing the whole document.
                tracing::debug!(page = page_number, error = %error, "Skipping unreadable PDF page");
            }
        }
    }

    Ok(text)
}
