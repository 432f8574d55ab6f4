use std::path::Path;

use common::error::AppError;
use mime_guess::from_path;

use super::{chunking::TextKind, pdf_ingestion::extract_pdf_content};

/// Text of a document together with how it should be split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub kind: TextKind,
}

/// Guesses the MIME type based on the file extension.
pub fn guess_mime_type(path: &Path) -> String {
    from_path(path)
        .first_or(mime::APPLICATION_OCTET_STREAM)
        .essence_str()
        .to_string()
}

pub async fn extract_text_from_file(path: &Path) -> Result<ExtractedText, AppError> {
    if !tokio::fs::try_exists(path).await? {
        return Err(AppError::NotFound(format!(
            "document '{}' does not exist",
            path.display()
        )));
    }

    let mime_type = guess_mime_type(path);
    match mime_type.as_str() {
        "application/pdf" => Ok(ExtractedText {
            text: extract_pdf_content(path).await?,
            kind: TextKind::Markdown,
        }),
        "text/markdown" | "text/x-markdown" => Ok(ExtractedText {
            text: tokio::fs::read_to_string(path).await?,
            kind: TextKind::Markdown,
        }),
        "text/plain" => Ok(ExtractedText {
            text: tokio::fs::read_to_string(path).await?,
            kind: TextKind::Plain,
        }),
        other => Err(AppError::Validation(format!(
            "unsupported document type '{other}' for '{}'",
            path.display()
        ))),
    }
}
