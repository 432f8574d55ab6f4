pub mod html_state;
pub mod middlewares;
pub mod router_factory;
pub mod routes;
pub mod templates;

use axum::{extract::FromRef, Router};
use html_state::HtmlState;
use router_factory::RouterFactory;

/// Html routes
pub fn html_routes<S>(app_state: &HtmlState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    HtmlState: FromRef<S>,
{
    RouterFactory::new(app_state)
        .add_routes(routes::index::router())
        .add_routes(routes::chat::router())
        .add_routes(routes::ingestion::router(
            app_state.config.ingest_max_body_bytes,
        ))
        .with_assets("/assets", "assets/")
        .with_compression()
        .build()
}
