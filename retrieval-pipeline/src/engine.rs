use common::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{index::VectorIndex, services::QueryServices, RetrievedChunk};

/// Queryable engine over one document; this is what gets cached on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEngine {
    index: VectorIndex,
    similarity_top_k: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub content: String,
    pub sources: Vec<RetrievedChunk>,
}

impl QueryEngine {
    pub fn new(index: VectorIndex, similarity_top_k: usize) -> Self {
        Self {
            index,
            similarity_top_k: similarity_top_k.max(1),
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn similarity_top_k(&self) -> usize {
        self.similarity_top_k
    }

    pub fn retrieve(&self, query_embedding: &[f32]) -> Result<Vec<RetrievedChunk>, AppError> {
        self.index.search(query_embedding, self.similarity_top_k)
    }

    /// Embeds the question, retrieves the closest chunks and asks the
    /// language model for an answer grounded in them.
    #[instrument(skip_all, fields(document = %self.index.document))]
    pub async fn query(
        &self,
        question: &str,
        services: &dyn QueryServices,
    ) -> Result<Answer, AppError> {
        info!(question, "Sending query");
        let query_embedding = services.embed_query(question).await?;
        let sources = self.retrieve(&query_embedding)?;
        let content = services.generate_answer(question, &sources).await?;
        info!(answer_chars = content.len(), sources = sources.len(), "Received response");

        Ok(Answer { content, sources })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use common::utils::embedding::EmbeddingProvider;

    use super::*;
    use crate::index::EmbeddingSignature;

    struct MockServices {
        provider: EmbeddingProvider,
        seen_context: Mutex<Vec<String>>,
    }

    impl MockServices {
        fn new(dimension: usize) -> Self {
            Self {
                provider: EmbeddingProvider::new_hashed(dimension),
                seen_context: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QueryServices for MockServices {
        async fn embed_query(&self, question: &str) -> Result<Vec<f32>, AppError> {
            Ok(self.provider.embed(question).await?)
        }

        async fn generate_answer(
            &self,
            _question: &str,
            context: &[RetrievedChunk],
        ) -> Result<String, AppError> {
            let texts: Vec<String> = context.iter().map(|c| c.chunk.text.clone()).collect();
            self.seen_context
                .lock()
                .expect("lock")
                .extend(texts.iter().cloned());
            Ok(texts.first().cloned().unwrap_or_default())
        }
    }

    async fn engine_for(texts: &[&str], top_k: usize) -> QueryEngine {
        let provider = EmbeddingProvider::new_hashed(1024);
        let texts: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
        let embeddings = provider.embed_batch(texts.clone()).await.expect("embed");
        let index = VectorIndex::new(
            "report",
            EmbeddingSignature::of(&provider),
            texts,
            embeddings,
        )
        .expect("index");
        QueryEngine::new(index, top_k)
    }

    #[tokio::test]
    async fn test_query_answers_from_most_similar_chunk() {
        let engine = engine_for(
            &[
                "The warehouse opened in Oslo during spring.",
                "Quarterly revenue grew by twelve percent.",
                "The board approved a new dividend policy.",
            ],
            2,
        )
        .await;
        let services = MockServices::new(1024);

        let answer = engine
            .query("How much did quarterly revenue grow?", &services)
            .await
            .expect("answer");

        assert_eq!(answer.content, "Quarterly revenue grew by twelve percent.");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(services.seen_context.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn test_query_with_wrong_embedding_space_fails() {
        let engine = engine_for(&["alpha"], 3).await;
        let services = MockServices::new(8);

        let result = engine.query("alpha", &services).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_top_k_is_at_least_one() {
        let engine = engine_for(&["alpha", "beta"], 0).await;
        assert_eq!(engine.similarity_top_k(), 1);
        assert_eq!(engine.index().len(), 2);
    }
}
