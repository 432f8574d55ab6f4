use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use common::error::AppError;

const FAST_PATH_MIN_LEN: usize = 150;
const FAST_PATH_MIN_ASCII_RATIO: f64 = 0.7;
const MIN_LETTER_RATIO: f64 = 0.3;

/// Extracts the text layer of a PDF and reflows it into paragraphs.
///
/// Scanned documents without a text layer are rejected; there is no OCR step.
pub async fn extract_pdf_content(file_path: &Path) -> Result<String, AppError> {
    let pdf_bytes = tokio::fs::read(file_path).await?;
    let (page_count, extraction) =
        tokio::task::spawn_blocking(move || read_text_layer(&pdf_bytes)).await??;

    if extraction.is_empty() {
        return Err(AppError::Processing(format!(
            "PDF '{}' has no extractable text layer",
            file_path.display()
        )));
    }

    if !looks_good_enough(&extraction) {
        warn!(
            path = %file_path.display(),
            chars = extraction.len(),
            "PDF text layer looks sparse or noisy; answers may be poor"
        );
    }

    debug!(
        path = %file_path.display(),
        pages = page_count,
        chars = extraction.len(),
        "Extracted PDF text layer"
    );

    Ok(post_process(&extraction))
}

/// Counts pages and pulls the trimmed text layer out of an in-memory PDF.
fn read_text_layer(pdf_bytes: &[u8]) -> Result<(usize, String), AppError> {
    let document = Document::load_mem(pdf_bytes)
        .map_err(|err| AppError::Processing(format!("Failed to parse PDF: {err}")))?;
    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(AppError::Processing("PDF appears to have no pages".into()));
    }

    let text = pdf_extract::extract_text_from_mem(pdf_bytes)
        .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))?;
    Ok((page_count, text.trim().to_string()))
}

/// Heuristic check that the text layer is real prose rather than glyph soup.
fn looks_good_enough(text: &str) -> bool {
    if text.len() < FAST_PATH_MIN_LEN {
        return false;
    }

    let total_chars = text.chars().count() as f64;
    if total_chars == 0.0 {
        return false;
    }

    let ascii_chars = text.chars().filter(char::is_ascii).count() as f64;
    if ascii_chars / total_chars < FAST_PATH_MIN_ASCII_RATIO {
        return false;
    }

    let letters = text.chars().filter(|c| c.is_alphabetic()).count() as f64;
    letters / total_chars > MIN_LETTER_RATIO
}

fn post_process(text: &str) -> String {
    let cleaned = text.replace('\r', "");
    reflow_paragraphs(cleaned.trim())
}

/// Joins hard-wrapped lines into paragraphs, keeping list items, headings and
/// table rows on their own lines.
fn reflow_paragraphs(input: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_structural_line(trimmed) {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join(" "));
                buffer.clear();
            }
            if !trimmed.is_empty() {
                paragraphs.push(trimmed.to_string());
            }
            continue;
        }

        buffer.push(trimmed);
    }

    if !buffer.is_empty() {
        paragraphs.push(buffer.join(" "));
    }

    paragraphs.join("\n\n")
}

fn is_structural_line(line: &str) -> bool {
    let numbered = line.chars().next().is_some_and(|c| c.is_ascii_digit())
        && line
            .split_once(['.', ')'])
            .is_some_and(|(head, _)| head.chars().all(|c| c.is_ascii_digit()));

    numbered
        || line.starts_with('#')
        || line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with('•')
        || line.starts_with('>')
        || line.starts_with('|')
}
