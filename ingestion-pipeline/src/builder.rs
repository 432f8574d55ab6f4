use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::index_cache::document_identity,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use retrieval_pipeline::{EmbeddingSignature, QueryEngine, VectorIndex};
use tracing::{info, instrument};

use crate::utils::{
    chunking::{prepare_chunks, ChunkingConfig},
    file_text_extraction::extract_text_from_file,
};

/// Turns a document on disk into a queryable engine.
#[async_trait]
pub trait EngineBuilder: Send + Sync {
    async fn build(&self, document: &Path) -> Result<QueryEngine, AppError>;
}

/// Extracts text, splits it into chunks and embeds every chunk.
pub struct PdfEngineBuilder {
    embedding_provider: Arc<EmbeddingProvider>,
    chunking: ChunkingConfig,
    similarity_top_k: usize,
}

impl PdfEngineBuilder {
    pub fn new(
        embedding_provider: Arc<EmbeddingProvider>,
        chunking: ChunkingConfig,
        similarity_top_k: usize,
    ) -> Self {
        Self {
            embedding_provider,
            chunking,
            similarity_top_k,
        }
    }

    pub fn from_config(config: &AppConfig, embedding_provider: Arc<EmbeddingProvider>) -> Self {
        Self::new(
            embedding_provider,
            ChunkingConfig::from_config(config),
            config.similarity_top_k,
        )
    }
}

#[async_trait]
impl EngineBuilder for PdfEngineBuilder {
    #[instrument(skip_all, fields(document = %document.display()))]
    async fn build(&self, document: &Path) -> Result<QueryEngine, AppError> {
        let extracted = extract_text_from_file(document).await?;
        let chunks = prepare_chunks(&extracted.text, extracted.kind, &self.chunking)?;
        if chunks.is_empty() {
            return Err(AppError::Processing(format!(
                "'{}' contains no text to index",
                document.display()
            )));
        }

        let embeddings = self.embedding_provider.embed_batch(chunks.clone()).await?;
        let index = VectorIndex::new(
            document_identity(document).unwrap_or_default(),
            EmbeddingSignature::of(&self.embedding_provider),
            chunks,
            embeddings,
        )?;

        info!(
            chunks = index.len(),
            backend = %index.signature.backend,
            dimension = index.signature.dimension,
            "Built vector index"
        );

        Ok(QueryEngine::new(index, self.similarity_top_k))
    }
}
