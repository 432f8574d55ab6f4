use axum::{extract::State, response::IntoResponse, Form};
use common::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    html_state::HtmlState,
    middlewares::response_middleware::{HtmlError, TemplateResponse},
};

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub question: String,
}

#[derive(Serialize)]
struct SourceView {
    position: usize,
    score: f32,
    text: String,
}

#[derive(Serialize)]
struct AnswerData {
    question: String,
    answer: String,
    sources: Vec<SourceView>,
}

pub async fn answer_question(
    State(state): State<HtmlState>,
    Form(form): Form<QueryForm>,
) -> Result<impl IntoResponse, HtmlError> {
    let question = form.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Enter a question first.".into()).into());
    }

    info!(question_chars = question.len(), "Answering question from web UI");
    let answer = state.session.answer(question).await?;

    Ok(TemplateResponse::new_partial(
        "index/index.html",
        "answer",
        AnswerData {
            question: question.to_string(),
            answer: answer.content,
            sources: answer
                .sources
                .into_iter()
                .map(|source| SourceView {
                    position: source.chunk.position,
                    score: source.score,
                    text: source.chunk.text,
                })
                .collect(),
        },
    ))
}
