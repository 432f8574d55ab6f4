use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use async_openai::{config::OpenAIConfig, Client};
use axum::{extract::FromRef, Router};
use common::{
    storage::paths::StoragePaths,
    utils::{
        config::{get_config, AppConfig},
        embedding::EmbeddingProvider,
    },
};
use html_router::{html_routes, html_state::HtmlState};
use ingestion_pipeline::PdfEngineBuilder;
use retrieval_pipeline::DefaultQueryServices;
use session::Session;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Used when `RUST_LOG` is unset, empty or unparsable.
const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the environment may already be set.
    let dotenv = dotenvy::dotenv();

    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .try_init()
        .ok();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = get_config()?;
    if config.missing_credential() {
        warn!("OPENAI_API_KEY is not set; OpenAI embeddings and answers will fail");
    }

    let openai_client = Arc::new(Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider =
        Arc::new(EmbeddingProvider::from_config(&config, Arc::clone(&openai_client)).await?);
    info!(
        embedding_backend = ?config.embedding_backend,
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let paths = StoragePaths::from_config(&config);
    paths.ensure_exists().await?;

    let session = build_session(&config, paths, openai_client, embedding_provider);
    if let Err(e) = session.initialize().await {
        error!(error = %e, "Could not restore vector store; starting with an empty session");
    }
    info!(status = %session.status().await, "Vector store status");

    let app = build_app(session, &config);

    let serve_address = format!("{}:{}", config.http_host, config.http_port);
    info!(address = %serve_address, "Starting server");
    let listener = tokio::net::TcpListener::bind(&serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn build_session(
    config: &AppConfig,
    paths: StoragePaths,
    openai_client: Arc<Client<OpenAIConfig>>,
    embedding_provider: Arc<EmbeddingProvider>,
) -> Arc<Session> {
    let builder = Arc::new(PdfEngineBuilder::from_config(
        config,
        Arc::clone(&embedding_provider),
    ));
    let services = Arc::new(DefaultQueryServices::from_config(
        config,
        openai_client,
        embedding_provider,
    ));
    Arc::new(Session::new(paths, builder, services))
}

fn build_app(session: Arc<Session>, config: &AppConfig) -> Router {
    let html_state = HtmlState::new_with_resources(Arc::clone(&session), config.clone(), None);
    let api_state = ApiState::new(session, config);

    Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .merge(html_routes(&html_state))
        .with_state(AppState {
            api_state,
            html_state,
        })
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
    html_state: HtmlState,
}
