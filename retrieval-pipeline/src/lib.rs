pub mod answer_retrieval;
pub mod engine;
pub mod index;
pub mod scoring;
pub mod services;

pub use engine::{Answer, QueryEngine};
pub use index::{EmbeddingSignature, IndexedChunk, VectorIndex};
pub use services::{DefaultQueryServices, QueryServices};

// A chunk selected for the prompt together with its similarity to the question.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: IndexedChunk,
    pub score: f32,
}
