use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct IngestParams {
    // Size is bounded by the route's DefaultBodyLimit.
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

pub async fn ingest_document(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<IngestParams>,
) -> Result<impl IntoResponse, ApiError> {
    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .ok_or_else(|| ApiError::ValidationError("file field has no file name".into()))?;

    let stored = state
        .session
        .paths()
        .store_upload(&file_name, input.file.contents.path())
        .await?;
    info!(file = %file_name, stored = %stored.display(), "Received ingestion request");

    let report = state.session.ingest(Some(&stored)).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": report.session.status,
            "outcome": report.outcome,
            "cache_key": report.session.cache_key,
        })),
    ))
}
