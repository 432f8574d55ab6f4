#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod builder;
pub mod utils;

pub use builder::{EngineBuilder, PdfEngineBuilder};
pub use utils::chunking::ChunkingConfig;
