use std::{str::FromStr, sync::Arc};

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use fastembed::{EmbeddingModel, ModelTrait, TextEmbedding, TextInitOptions};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::config::AppConfig;
use crate::error::AppError;

/// Recorded as the model of hashed indexes so the bucket scheme travels with the cache.
pub const HASHED_SCHEME: &str = "sha256-buckets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAI,
    #[serde(alias = "fast-embed", alias = "fast")]
    FastEmbed,
    Hashed,
}

/// Turns text into vectors with the backend chosen in configuration.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    OpenAI {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    FastEmbed {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: EmbeddingModel,
        dimension: usize,
    },
    Hashed {
        dimension: usize,
    },
}

impl EmbeddingProvider {
    pub async fn from_config(
        config: &AppConfig,
        openai_client: Arc<Client<OpenAIConfig>>,
    ) -> Result<Self, AppError> {
        match config.embedding_backend {
            EmbeddingBackend::OpenAI => Ok(Self {
                backend: Backend::OpenAI {
                    client: openai_client,
                    model: config.embedding_model.clone(),
                    dimensions: config.embedding_dimensions,
                },
            }),
            EmbeddingBackend::FastEmbed => {
                // OpenAI model names mean "use the FastEmbed default".
                let model_code = Some(config.embedding_model.as_str())
                    .filter(|code| !code.starts_with("text-embedding-"));
                Self::new_fastembed(model_code).await
            }
            EmbeddingBackend::Hashed => Ok(Self::new_hashed(config.embedding_dimensions as usize)),
        }
    }

    /// Loads a local FastEmbed model, downloading it on first use.
    pub async fn new_fastembed(model_code: Option<&str>) -> Result<Self, AppError> {
        let model_name = match model_code {
            Some(code) => EmbeddingModel::from_str(code).map_err(|err| {
                AppError::Validation(format!("unknown FastEmbed model '{code}': {err}"))
            })?,
            None => EmbeddingModel::default(),
        };

        let options = TextInitOptions::new(model_name.clone()).with_show_download_progress(true);
        let lookup = model_name.clone();
        let (model, dimension) = tokio::task::spawn_blocking(move || {
            let model = TextEmbedding::try_new(options).map_err(|err| {
                AppError::InternalError(format!("loading FastEmbed model: {err}"))
            })?;
            let dimension = EmbeddingModel::get_model_info(&lookup)
                .map(|info| info.dim)
                .ok_or_else(|| {
                    AppError::InternalError(format!("no FastEmbed metadata for {lookup}"))
                })?;
            Ok::<_, AppError>((model, dimension))
        })
        .await??;
        info!(model = %model_name, dimension, "FastEmbed model ready");

        Ok(Self {
            backend: Backend::FastEmbed {
                model: Arc::new(Mutex::new(model)),
                model_name,
                dimension,
            },
        })
    }

    /// Offline bag-of-words vectors; stable across builds and platforms.
    pub fn new_hashed(dimension: usize) -> Self {
        Self {
            backend: Backend::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.backend {
            Backend::OpenAI { .. } => "openai",
            Backend::FastEmbed { .. } => "fastembed",
            Backend::Hashed { .. } => "hashed",
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.backend {
            Backend::OpenAI { dimensions, .. } => *dimensions as usize,
            Backend::FastEmbed { dimension, .. } | Backend::Hashed { dimension } => *dimension,
        }
    }

    pub fn model_code(&self) -> String {
        match &self.backend {
            Backend::OpenAI { model, .. } => model.clone(),
            Backend::FastEmbed { model_name, .. } => model_name.to_string(),
            Backend::Hashed { .. } => HASHED_SCHEME.to_string(),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.embed_batch(vec![text.to_owned()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Processing("embedding backend returned no vector".into()))
    }

    /// One vector per input, in input order.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            Backend::Hashed { dimension } => Ok(texts
                .iter()
                .map(|text| hashed_embedding(text, *dimension))
                .collect()),
            Backend::FastEmbed { model, .. } => {
                let mut guard = model.lock().await;
                guard
                    .embed(texts, None)
                    .map_err(|err| AppError::Processing(format!("FastEmbed failed: {err}")))
            }
            Backend::OpenAI {
                client,
                model,
                dimensions,
            } => {
                debug!(count = texts.len(), %model, "Requesting OpenAI embeddings");
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.as_str())
                    .input(texts)
                    .dimensions(*dimensions)
                    .build()?;
                let mut data = client.embeddings().create(request).await?.data;
                data.sort_by_key(|item| item.index);
                Ok(data.into_iter().map(|item| item.embedding).collect())
            }
        }
    }
}

/// Counts lowercase ASCII-alphanumeric tokens into SHA-256 selected buckets,
/// then L2-normalises. Text without tokens maps to the zero vector.
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    for token in text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
    {
        if let Some(slot) = vector.get_mut(bucket(&token.to_ascii_lowercase(), dimension)) {
            *slot += 1.0;
        }
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

fn bucket(token: &str, dimension: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let prefix = digest.first_chunk::<8>().copied().unwrap_or_default();
    (u64::from_le_bytes(prefix) % dimension as u64) as usize
}
