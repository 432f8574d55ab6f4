use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::embedding::EmbeddingBackend;

pub const DEFAULT_QUERY_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about a single document. \
Use only the supplied context passages to answer. If the context does not contain the answer, say that the document does not cover it. \
Answer in plain prose without restating the question.";

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_query_model")]
    pub query_model: String,
    #[serde(default = "default_query_system_prompt")]
    pub query_system_prompt: String,
    #[serde(default = "default_pdf_folder")]
    pub pdf_folder: String,
    #[serde(default = "default_vectorstore_folder")]
    pub vectorstore_folder: String,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_chunk_min_chars")]
    pub chunk_min_chars: usize,
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    #[serde(default = "default_chunk_overlap_chars")]
    pub chunk_overlap_chars: usize,
    #[serde(default = "default_ingest_max_body_bytes")]
    pub ingest_max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            query_model: default_query_model(),
            query_system_prompt: default_query_system_prompt(),
            pdf_folder: default_pdf_folder(),
            vectorstore_folder: default_vectorstore_folder(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            similarity_top_k: default_similarity_top_k(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            chunk_min_chars: default_chunk_min_chars(),
            chunk_max_chars: default_chunk_max_chars(),
            chunk_overlap_chars: default_chunk_overlap_chars(),
            ingest_max_body_bytes: default_ingest_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// True when no credential was supplied for the language model client.
    pub fn missing_credential(&self) -> bool {
        self.openai_api_key.trim().is_empty()
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_query_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_query_system_prompt() -> String {
    DEFAULT_QUERY_SYSTEM_PROMPT.to_string()
}

fn default_pdf_folder() -> String {
    "pdf_input".to_string()
}

fn default_vectorstore_folder() -> String {
    "vector_databases".to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_http_port() -> u16 {
    7860
}

const fn default_similarity_top_k() -> usize {
    3
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimensions() -> u32 {
    1536
}

const fn default_chunk_min_chars() -> usize {
    500
}

const fn default_chunk_max_chars() -> usize {
    2000
}

const fn default_chunk_overlap_chars() -> usize {
    100
}

const fn default_ingest_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
