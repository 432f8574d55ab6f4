use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Extension,
};
use axum_htmx::{HxRequest, HX_TRIGGER};
use common::error::AppError;
use minijinja::{context, value::ValueKind, Value};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::templates::ProvidesTemplates;

pub const APP_TITLE: &str = "GPT PDF Chat";

const HTMX_HEADERS_TO_FORWARD: &[&str] = &["HX-Push", "HX-Trigger", "HX-Retarget"];

#[derive(Clone, Debug)]
pub enum TemplateKind {
    Full(String),
    Partial(String, String),
    Error(StatusCode),
}

/// Marker returned by handlers; `with_template_response` turns it into HTML.
#[derive(Clone)]
pub struct TemplateResponse {
    template_kind: TemplateKind,
    context: Value,
}

impl TemplateResponse {
    pub fn new_template<T: Serialize>(name: impl Into<String>, context: T) -> Self {
        Self {
            template_kind: TemplateKind::Full(name.into()),
            context: Value::from_serialize(&context),
        }
    }

    pub fn new_partial<T: Serialize>(
        template: impl Into<String>,
        block: impl Into<String>,
        context: T,
    ) -> Self {
        Self {
            template_kind: TemplateKind::Partial(template.into(), block.into()),
            context: Value::from_serialize(&context),
        }
    }

    pub fn error(status: StatusCode, title: &str, description: &str) -> Self {
        Self {
            template_kind: TemplateKind::Error(status),
            context: context! {
                status_code => status.as_u16(),
                title => title,
                description => description
            },
        }
    }

    pub fn not_found() -> Self {
        Self::error(
            StatusCode::NOT_FOUND,
            "Page Not Found",
            "The page you're looking for doesn't exist.",
        )
    }

    pub fn server_error() -> Self {
        Self::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Something went wrong on our end.",
        )
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(StatusCode::BAD_REQUEST, "Bad Request", message)
    }

    pub fn no_document() -> Self {
        Self::error(
            StatusCode::CONFLICT,
            "No document loaded",
            "Process a PDF before asking questions.",
        )
    }

    pub fn kind(&self) -> &TemplateKind {
        &self.template_kind
    }
}

impl IntoResponse for TemplateResponse {
    fn into_response(self) -> Response {
        Extension(self).into_response()
    }
}

#[derive(Serialize)]
struct ContextWrapper {
    app_title: &'static str,
    #[serde(flatten)]
    context: HashMap<String, Value>,
}

pub async fn with_template_response<S>(
    State(state): State<S>,
    HxRequest(is_htmx): HxRequest,
    req: Request,
    next: Next,
) -> Response
where
    S: ProvidesTemplates + Clone + Send + Sync + 'static,
{
    let response = next.run(req).await;

    let Some(template_response) = response.extensions().get::<TemplateResponse>().cloned() else {
        return response;
    };
    let templates = state.templates();

    let context_map = match context_to_map(&template_response.context) {
        Ok(map) => map,
        Err(kind) => {
            error!(
                ?kind,
                template_kind = ?template_response.template_kind,
                "Template context must be a map or unit"
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(fallback_error())).into_response();
        }
    };
    let context = Value::from_serialize(&ContextWrapper {
        app_title: APP_TITLE,
        context: context_map,
    });

    match &template_response.template_kind {
        TemplateKind::Full(name) => match templates.render(name, &context) {
            Ok(html) => {
                let mut rendered = Html(html).into_response();
                forward_headers(response.headers(), rendered.headers_mut());
                rendered
            }
            Err(e) => {
                error!(template = %name, error = ?e, "Failed to render template");
                (StatusCode::INTERNAL_SERVER_ERROR, Html(fallback_error())).into_response()
            }
        },
        TemplateKind::Partial(template, block) => {
            match templates.render_block(template, block, &context) {
                Ok(html) => {
                    let mut rendered = Html(html).into_response();
                    forward_headers(response.headers(), rendered.headers_mut());
                    rendered
                }
                Err(e) => {
                    error!(%template, %block, error = ?e, "Failed to render block");
                    (StatusCode::INTERNAL_SERVER_ERROR, Html(fallback_error())).into_response()
                }
            }
        }
        TemplateKind::Error(status) => {
            if is_htmx {
                // htmx swaps nothing on 204; the page shows a toast from HX-Trigger.
                let title = string_attr(&template_response.context, "title", "Error");
                let description = string_attr(
                    &template_response.context,
                    "description",
                    "An error occurred.",
                );
                let trigger =
                    json!({"toast": {"title": title, "description": description, "type": "error"}});
                (StatusCode::NO_CONTENT, [(HX_TRIGGER, trigger.to_string())], "").into_response()
            } else {
                match templates.render("errors/error.html", &context) {
                    Ok(html) => (*status, Html(html)).into_response(),
                    Err(e) => {
                        error!(error = ?e, "Failed to render 'errors/error.html'");
                        (*status, Html(fallback_error())).into_response()
                    }
                }
            }
        }
    }
}

fn context_to_map(value: &Value) -> Result<HashMap<String, Value>, ValueKind> {
    match value.kind() {
        ValueKind::Map => {
            let mut map = HashMap::new();
            if let Ok(keys) = value.try_iter() {
                for key in keys {
                    if let Ok(val) = value.get_item(&key) {
                        map.insert(key.to_string(), val);
                    }
                }
            }
            Ok(map)
        }
        ValueKind::None | ValueKind::Undefined => Ok(HashMap::new()),
        other => Err(other),
    }
}

fn forward_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for &header_name in HTMX_HEADERS_TO_FORWARD {
        if let Ok(name) = HeaderName::from_bytes(header_name.as_bytes()) {
            if let Some(value) = from.get(&name) {
                to.insert(name.clone(), value.clone());
            }
        }
    }
}

fn string_attr(value: &Value, attr: &str, fallback: &str) -> String {
    value
        .get_attr(attr)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug)]
pub enum HtmlError {
    AppError(AppError),
    TemplateError(String),
}

impl From<AppError> for HtmlError {
    fn from(err: AppError) -> Self {
        Self::AppError(err)
    }
}

impl From<minijinja::Error> for HtmlError {
    fn from(err: minijinja::Error) -> Self {
        Self::TemplateError(err.to_string())
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        match self {
            Self::AppError(err) => match err {
                AppError::NotFound(_) => TemplateResponse::not_found().into_response(),
                AppError::Validation(msg) => TemplateResponse::bad_request(&msg).into_response(),
                AppError::NoActiveEngine => TemplateResponse::no_document().into_response(),
                AppError::Deserialization(msg) => {
                    error!(%msg, "Cached vector store could not be read");
                    TemplateResponse::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Vector store unreadable",
                        "The cached vector store for this document could not be read.",
                    )
                    .into_response()
                }
                _ => {
                    error!(error = ?err, "Internal error");
                    TemplateResponse::server_error().into_response()
                }
            },
            Self::TemplateError(err) => {
                error!(%err, "Template error");
                TemplateResponse::server_error().into_response()
            }
        }
    }
}

fn fallback_error() -> String {
    r#"
    <html>
        <body>
            <main class="container">
                <h1>Error</h1>
                <p>Sorry, something went wrong displaying this page.</p>
            </main>
        </body>
    </html>
    "#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(err: AppError) -> Option<StatusCode> {
        let response = HtmlError::from(err).into_response();
        response
            .extensions()
            .get::<TemplateResponse>()
            .and_then(|t| match t.kind() {
                TemplateKind::Error(status) => Some(*status),
                _ => None,
            })
    }

    #[test]
    fn test_app_errors_map_to_error_templates() {
        assert_eq!(kind_of(AppError::NoActiveEngine), Some(StatusCode::CONFLICT));
        assert_eq!(
            kind_of(AppError::Validation("bad".into())),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            kind_of(AppError::NotFound("gone".into())),
            Some(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            kind_of(AppError::Deserialization("corrupt".into())),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn test_context_to_map_accepts_maps_and_unit() {
        let map = context_to_map(&context! { answer => "42" }).expect("map");
        assert_eq!(map.get("answer").and_then(|v| v.as_str()), Some("42"));

        assert!(context_to_map(&Value::from(())).expect("unit").is_empty());
        assert!(context_to_map(&Value::from(7)).is_err());
    }
}
