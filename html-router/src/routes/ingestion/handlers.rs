use axum::{extract::State, response::IntoResponse};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use common::error::AppError;
use serde::Serialize;
use session::{IngestOutcome, SessionSnapshot};
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    html_state::HtmlState,
    middlewares::response_middleware::{HtmlError, TemplateResponse},
};

#[derive(Debug, TryFromMultipart)]
pub struct DocumentUpload {
    // Size is bounded by the route's DefaultBodyLimit.
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

#[derive(Serialize)]
struct DocumentPanelData {
    document_label: String,
    outcome: IngestOutcome,
    session: SessionSnapshot,
}

pub async fn process_document(
    State(state): State<HtmlState>,
    TypedMultipart(upload): TypedMultipart<DocumentUpload>,
) -> Result<impl IntoResponse, HtmlError> {
    let file_name = upload
        .file
        .metadata
        .file_name
        .clone()
        .ok_or_else(|| AppError::Validation("The upload has no file name.".into()))?;

    let stored = state
        .session
        .paths()
        .store_upload(&file_name, upload.file.contents.path())
        .await?;
    info!(file = %file_name, stored = %stored.display(), "Received document upload");

    let report = state.session.ingest(Some(&stored)).await?;
    let document_label = stored
        .file_name()
        .map_or(file_name, |name| name.to_string_lossy().into_owned());

    Ok(TemplateResponse::new_partial(
        "index/index.html",
        "document_panel",
        DocumentPanelData {
            document_label,
            outcome: report.outcome,
            session: report.session,
        },
    ))
}
