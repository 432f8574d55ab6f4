use axum::{extract::State, response::IntoResponse};
use serde::Serialize;
use session::SessionSnapshot;

use crate::{
    html_state::HtmlState,
    middlewares::response_middleware::{HtmlError, TemplateResponse},
};

pub const NO_DOCUMENT_LABEL: &str = "No PDF Loaded";

#[derive(Serialize)]
pub struct IndexPageData {
    document_label: String,
    session: SessionSnapshot,
}

pub async fn index_handler(State(state): State<HtmlState>) -> Result<impl IntoResponse, HtmlError> {
    Ok(TemplateResponse::new_template(
        "index/index.html",
        IndexPageData {
            document_label: NO_DOCUMENT_LABEL.to_string(),
            session: state.session.snapshot().await,
        },
    ))
}

#[derive(Serialize)]
pub struct StatusData {
    session: SessionSnapshot,
}

/// Vector store label only; polled by the page after uploads.
pub async fn show_status(State(state): State<HtmlState>) -> Result<impl IntoResponse, HtmlError> {
    Ok(TemplateResponse::new_partial(
        "index/index.html",
        "vectorstore_status",
        StatusData {
            session: state.session.snapshot().await,
        },
    ))
}
