#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

use std::{path::Path, sync::Arc};

use common::{
    error::AppError,
    storage::{
        index_cache::{CacheKey, IndexCache},
        paths::StoragePaths,
    },
};
use ingestion_pipeline::EngineBuilder;
use retrieval_pipeline::{Answer, QueryEngine, QueryServices};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

/// Status shown before any document has been found or processed.
pub const STATUS_NONE: &str = "None";

#[derive(Clone, Debug)]
pub enum SessionState {
    Empty,
    Ready {
        key: CacheKey,
        engine: Arc<QueryEngine>,
    },
}

/// How an ingest obtained its engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    Built,
    CacheHit,
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Empty,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionPhase,
    pub cache_key: Option<String>,
    pub status: String,
}

/// Result of one ingest together with the session state it produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub session: SessionSnapshot,
}

struct Inner {
    state: SessionState,
    status: String,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        let (state, cache_key) = match &self.state {
            SessionState::Ready { key, .. } => (SessionPhase::Ready, Some(key.to_string())),
            SessionState::Empty => (SessionPhase::Empty, None),
        };
        SessionSnapshot {
            state,
            cache_key,
            status: self.status.clone(),
        }
    }
}

/// Holds at most one engine and decides whether ingesting a document loads a
/// cached engine or builds a new one.
pub struct Session {
    paths: StoragePaths,
    cache: IndexCache,
    builder: Arc<dyn EngineBuilder>,
    services: Arc<dyn QueryServices>,
    inner: RwLock<Inner>,
    ingest_lock: Mutex<()>,
}

impl Session {
    pub fn new(
        paths: StoragePaths,
        builder: Arc<dyn EngineBuilder>,
        services: Arc<dyn QueryServices>,
    ) -> Self {
        let cache = paths.index_cache();
        Self {
            paths,
            cache,
            builder,
            services,
            inner: RwLock::new(Inner {
                state: SessionState::Empty,
                status: STATUS_NONE.to_string(),
            }),
            ingest_lock: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Loads the cached engine of the first PDF in the intake folder, if any.
    ///
    /// Never builds: a document without a cache entry leaves the session empty.
    #[instrument(skip_all)]
    pub async fn initialize(&self) -> Result<(), AppError> {
        let _guard = self.ingest_lock.lock().await;

        let paths = self.paths.clone();
        let scan = tokio::task::spawn_blocking(move || paths.first_document())
            .await
            .map_err(|err| AppError::InternalError(format!("intake scan task failed: {err}")))?;

        let Some(document) = scan? else {
            warn!(folder = %self.paths.intake_dir().display(), "No PDF found in intake folder");
            self.set_status(STATUS_NONE).await;
            return Ok(());
        };

        let key = CacheKey::for_document(&document)?;
        info!(document = %document.display(), key = %key, "Found document");

        if self.cache.contains(&key).await? {
            let engine: QueryEngine = self.cache.load(&key).await?;
            info!(key = %key, chunks = engine.index().len(), "Loaded vector store from disk");
            let status = format!("Vector store from disk. {key}");
            self.activate(key, engine, status).await;
        } else {
            let file_name = document
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            warn!(document = %document.display(), "No vector store for document");
            self.set_status(format!("No vector store for {file_name}")).await;
        }

        Ok(())
    }

    /// Makes `document` the active engine, loading it from the cache when an
    /// entry exists for its identity and building it otherwise.
    ///
    /// The returned snapshot is taken before the ingest lock is released.
    #[instrument(skip_all, fields(document = ?document))]
    pub async fn ingest(&self, document: Option<&Path>) -> Result<IngestReport, AppError> {
        let Some(document) = document else {
            warn!("No document provided for ingestion");
            return Ok(IngestReport {
                outcome: IngestOutcome::Skipped,
                session: self.snapshot().await,
            });
        };

        let _guard = self.ingest_lock.lock().await;
        let key = CacheKey::for_document(document)?;

        let (engine, outcome, status) = if self.cache.contains(&key).await? {
            let engine: QueryEngine = self.cache.load(&key).await?;
            info!(key = %key, "Vector store loaded from disk");
            (
                engine,
                IngestOutcome::CacheHit,
                format!("Vector store loaded from disk. {key}"),
            )
        } else {
            let engine = self.builder.build(document).await?;
            self.cache.store(&key, &engine).await?;
            info!(key = %key, chunks = engine.index().len(), "Vector store updated");
            (
                engine,
                IngestOutcome::Built,
                format!("Vector store updated. {key}"),
            )
        };

        let session = self.activate(key, engine, status).await;
        Ok(IngestReport { outcome, session })
    }

    /// Queries the active engine; the read lock is released before the query runs.
    pub async fn answer(&self, question: &str) -> Result<Answer, AppError> {
        let engine = match &self.inner.read().await.state {
            SessionState::Ready { engine, .. } => Arc::clone(engine),
            SessionState::Empty => return Err(AppError::NoActiveEngine),
        };

        engine.query(question, self.services.as_ref()).await
    }

    pub async fn status(&self) -> String {
        self.inner.read().await.status.clone()
    }

    pub async fn active_key(&self) -> Option<CacheKey> {
        match &self.inner.read().await.state {
            SessionState::Ready { key, .. } => Some(key.clone()),
            SessionState::Empty => None,
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(self.inner.read().await.state, SessionState::Ready { .. })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().await.snapshot()
    }

    async fn activate(
        &self,
        key: CacheKey,
        engine: QueryEngine,
        status: String,
    ) -> SessionSnapshot {
        let mut inner = self.inner.write().await;
        inner.state = SessionState::Ready {
            key,
            engine: Arc::new(engine),
        };
        inner.status = status;
        inner.snapshot()
    }

    async fn set_status(&self, status: impl Into<String>) {
        self.inner.write().await.status = status.into();
    }
}
