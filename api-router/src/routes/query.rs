use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SourceResponse {
    pub position: usize,
    pub score: f32,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceResponse>,
}

pub async fn query_document(
    State(state): State<ApiState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::ValidationError("question must not be empty".into()));
    }

    info!(question_chars = question.len(), "Received query request");
    let answer = state.session.answer(question).await?;

    Ok(Json(QueryResponse {
        answer: answer.content,
        sources: answer
            .sources
            .into_iter()
            .map(|source| SourceResponse {
                position: source.chunk.position,
                score: source.score,
                text: source.chunk.text,
            })
            .collect(),
    }))
}
