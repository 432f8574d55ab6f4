use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use common::{
    error::AppError,
    utils::{
        config::AppConfig,
        embedding::EmbeddingProvider,
    },
};
use tracing::debug;

use crate::{
    answer_retrieval::{
        chunks_to_chat_context, create_chat_request, create_user_message, process_llm_response,
    },
    RetrievedChunk,
};

/// External capabilities a [`crate::QueryEngine`] needs to answer a question.
#[async_trait]
pub trait QueryServices: Send + Sync {
    async fn embed_query(&self, question: &str) -> Result<Vec<f32>, AppError>;

    async fn generate_answer(
        &self,
        question: &str,
        context: &[RetrievedChunk],
    ) -> Result<String, AppError>;
}

pub struct DefaultQueryServices {
    openai_client: Arc<Client<OpenAIConfig>>,
    embedding_provider: Arc<EmbeddingProvider>,
    model: String,
    system_prompt: String,
}

impl DefaultQueryServices {
    pub fn new(
        openai_client: Arc<Client<OpenAIConfig>>,
        embedding_provider: Arc<EmbeddingProvider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            openai_client,
            embedding_provider,
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        openai_client: Arc<Client<OpenAIConfig>>,
        embedding_provider: Arc<EmbeddingProvider>,
    ) -> Self {
        Self::new(
            openai_client,
            embedding_provider,
            config.query_model.clone(),
            config.query_system_prompt.clone(),
        )
    }
}

#[async_trait]
impl QueryServices for DefaultQueryServices {
    async fn embed_query(&self, question: &str) -> Result<Vec<f32>, AppError> {
        self.embedding_provider.embed(question).await
    }

    async fn generate_answer(
        &self,
        question: &str,
        context: &[RetrievedChunk],
    ) -> Result<String, AppError> {
        let context_json = chunks_to_chat_context(context);
        let user_message = create_user_message(&context_json, question);
        let request = create_chat_request(user_message, &self.model, &self.system_prompt)?;

        debug!(model = %self.model, context_chunks = context.len(), "Sending chat completion");
        let response = self.openai_client.chat().create(request).await?;

        process_llm_response(response)
    }
}
