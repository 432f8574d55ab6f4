use chrono::{DateTime, Utc};
use common::{error::AppError, utils::embedding::EmbeddingProvider};
use serde::{Deserialize, Serialize};

use crate::{
    scoring::{cosine_similarity, top_k, Scored},
    RetrievedChunk,
};

/// Identifies the embedding space an index was built in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSignature {
    pub backend: String,
    pub model: String,
    pub dimension: usize,
}

impl EmbeddingSignature {
    pub fn of(provider: &EmbeddingProvider) -> Self {
        Self {
            backend: provider.backend_label().to_string(),
            model: provider.model_code(),
            dimension: provider.dimension(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Order of the chunk within the source document.
    pub position: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Flat vector index over the chunks of a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    pub document: String,
    pub signature: EmbeddingSignature,
    pub created_at: DateTime<Utc>,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Pairs each text with its embedding. Every embedding must match the
    /// signature's dimension.
    pub fn new(
        document: impl Into<String>,
        signature: EmbeddingSignature,
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, AppError> {
        if texts.len() != embeddings.len() {
            return Err(AppError::Processing(format!(
                "received {} embeddings for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        if let Some(bad) = embeddings
            .iter()
            .find(|embedding| embedding.len() != signature.dimension)
        {
            return Err(AppError::Processing(format!(
                "embedding has {} dimensions, expected {}",
                bad.len(),
                signature.dimension
            )));
        }

        let chunks = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (text, embedding))| IndexedChunk {
                position,
                text,
                embedding,
            })
            .collect();

        Ok(Self {
            document: document.into(),
            signature,
            created_at: Utc::now(),
            chunks,
        })
    }

    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Ranks every chunk by cosine similarity to `query_embedding`.
    pub fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        if query_embedding.len() != self.signature.dimension {
            return Err(AppError::Validation(format!(
                "query embedding has {} dimensions but the index for '{}' was built with {} ({})",
                query_embedding.len(),
                self.document,
                self.signature.dimension,
                self.signature.backend
            )));
        }

        let scored = self
            .chunks
            .iter()
            .map(|chunk| Scored::new(chunk, cosine_similarity(query_embedding, &chunk.embedding)))
            .collect();

        Ok(top_k(scored, limit)
            .into_iter()
            .map(|scored| RetrievedChunk {
                chunk: scored.item.clone(),
                score: scored.score,
            })
            .collect())
    }
}
