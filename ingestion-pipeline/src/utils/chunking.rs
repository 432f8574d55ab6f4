use common::{error::AppError, utils::config::AppConfig};
use text_splitter::{ChunkCapacity, ChunkConfig, MarkdownSplitter, TextSplitter};

/// Character bounds for splitting document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_chars: config.chunk_min_chars,
            max_chars: config.chunk_max_chars,
            overlap_chars: config.chunk_overlap_chars,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.min_chars == 0 || self.max_chars == 0 || self.min_chars > self.max_chars {
            return Err(AppError::Validation(
                "invalid chunk bounds; ensure 0 < min <= max".into(),
            ));
        }

        if self.overlap_chars >= self.min_chars {
            return Err(AppError::Validation(format!(
                "chunk_min_chars must be greater than the configured overlap of {}",
                self.overlap_chars
            )));
        }

        Ok(())
    }

    fn splitter_config(&self) -> Result<ChunkConfig<text_splitter::Characters>, AppError> {
        self.validate()?;

        let capacity = ChunkCapacity::new(self.min_chars)
            .with_max(self.max_chars)
            .map_err(|e| AppError::Validation(format!("invalid chunk bounds: {e}")))?;

        ChunkConfig::new(capacity)
            .with_overlap(self.overlap_chars)
            .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    Markdown,
}

/// Splits `text` into chunks; blank chunks are dropped.
pub fn prepare_chunks(
    text: &str,
    kind: TextKind,
    config: &ChunkingConfig,
) -> Result<Vec<String>, AppError> {
    let splitter_config = config.splitter_config()?;

    let chunks: Vec<String> = match kind {
        TextKind::Plain => TextSplitter::new(splitter_config)
            .chunks(text)
            .map(str::to_owned)
            .collect(),
        TextKind::Markdown => MarkdownSplitter::new(splitter_config)
            .chunks(text)
            .map(str::to_owned)
            .collect(),
    };

    Ok(chunks
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect())
}
