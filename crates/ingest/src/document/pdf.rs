use super::{ExtractionError, PageContent};

/// Extract linear text from PDF bytes, one entry per page with text.
///
/// `pdf-extract` returns the whole document as one string with form feeds
/// (`\x0C`) between pages. Blank pages are dropped but keep their slot in the
/// numbering, so page numbers stay 1-based positions in the original file.
pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    // pdf-extract panics on some malformed files instead of returning an error.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractionError::PdfError("PDF parser panicked".to_string()))?
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;
    Ok(split_pages(&text))
}

fn split_pages(text: &str) -> Vec<PageContent> {
    if text.trim().is_empty() {
        // Scanned/image PDF: nothing to index.
        return Vec::new();
    }

    if !text.contains('\x0C') {
        return vec![PageContent {
            page_number: 1,
            text: text.trim().to_string(),
        }];
    }

    text.split('\x0C')
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| PageContent {
            page_number: i as u32 + 1,
            text: page_text.trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feed_and_keeps_numbering() {
        let pages = split_pages("First page.\x0C   \x0CThird page.");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "First page.");
        assert_eq!(pages[1].page_number, 3);
        assert_eq!(pages[1].text, "Third page.");
    }

    #[test]
    fn no_form_feed_is_single_page() {
        let pages = split_pages("  just one page \n");
        assert_eq!(pages, vec![PageContent { page_number: 1, text: "just one page".into() }]);
    }

    #[test]
    fn blank_document_has_no_pages() {
        assert!(split_pages(" \n\x0C \t").is_empty());
    }

    #[test]
    fn garbage_bytes_fail() {
        assert!(matches!(
            extract_pdf(b"definitely not a pdf"),
            Err(ExtractionError::PdfError(_))
        ));
    }
}
