use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::AppError;

/// Extension used for serialized engines on disk.
pub const CACHE_EXTENSION: &str = "cache";

/// Bumped whenever the serialized engine layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

const CACHE_MAGIC: [u8; 4] = *b"PDFQ";
const LENGTH_PREFIX_BYTES: usize = 8;

/// File name of a cached engine, derived from the document's base name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives `<identity>.cache` where the identity is the file name without extension.
    pub fn for_document(document: &Path) -> Result<Self, AppError> {
        let identity = document_identity(document).ok_or_else(|| {
            AppError::Validation(format!(
                "cannot derive a document identity from '{}'",
                document.display()
            ))
        })?;
        Ok(Self(format!("{identity}.{CACHE_EXTENSION}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base file name without its extension.
pub fn document_identity(document: &Path) -> Option<String> {
    document
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheHeader {
    magic: [u8; 4],
    format_version: u32,
}

/// Serializes engines into a folder, one file per [`CacheKey`].
///
/// Layout: little-endian `u64` header length, bincode header, bincode payload.
/// Writes land in a temporary file inside the folder and are renamed over the
/// target, so a reader never observes a half-written entry.
#[derive(Clone, Debug)]
pub struct IndexCache {
    folder: PathBuf,
}

impl IndexCache {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.folder.join(key.as_str())
    }

    pub async fn contains(&self, key: &CacheKey) -> Result<bool, AppError> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }

    pub async fn store<T: Serialize>(&self, key: &CacheKey, engine: &T) -> Result<(), AppError> {
        let bytes = encode(engine)?;
        let folder = self.folder.clone();
        let target = self.path_for(key);
        let size = bytes.len();

        let written = target.clone();
        tokio::task::spawn_blocking(move || -> Result<(), AppError> {
            let mut file = NamedTempFile::new_in(&folder)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            file.persist(&written)?;
            Ok(())
        })
        .await??;

        info!(path = %target.display(), bytes = size, "Vector store saved");
        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<T, AppError> {
        let path = self.path_for(key);
        let bytes = tokio::fs::read(&path).await.map_err(|err| {
            AppError::Deserialization(format!("cannot read {}: {err}", path.display()))
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Loading vector store");

        decode(&bytes)
            .map_err(|reason| AppError::Deserialization(format!("{}: {reason}", path.display())))
    }

    /// Deletes a cached engine; returns whether a file was removed.
    pub async fn remove(&self, key: &CacheKey) -> Result<bool, AppError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

fn encode<T: Serialize>(engine: &T) -> Result<Vec<u8>, AppError> {
    let config = bincode::config::standard();
    let header = CacheHeader {
        magic: CACHE_MAGIC,
        format_version: CACHE_FORMAT_VERSION,
    };

    let header_bytes = bincode::serde::encode_to_vec(&header, config)
        .map_err(|err| AppError::Serialization(err.to_string()))?;
    let payload = bincode::serde::encode_to_vec(engine, config)
        .map_err(|err| AppError::Serialization(err.to_string()))?;

    let mut bytes = Vec::with_capacity(
        LENGTH_PREFIX_BYTES
            .saturating_add(header_bytes.len())
            .saturating_add(payload.len()),
    );
    bytes.extend_from_slice(&(header_bytes.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&header_bytes);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let config = bincode::config::standard();

    let (prefix, rest) = bytes
        .split_first_chunk::<LENGTH_PREFIX_BYTES>()
        .ok_or("file is truncated")?;
    let header_len =
        usize::try_from(u64::from_le_bytes(*prefix)).map_err(|_| "header length overflow")?;
    let header_bytes = rest.get(..header_len).ok_or("header is truncated")?;
    let payload = rest.get(header_len..).ok_or("payload is missing")?;

    let (header, _): (CacheHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, config).map_err(|err| err.to_string())?;

    if header.magic != CACHE_MAGIC {
        return Err("not a vector store file".into());
    }
    if header.format_version != CACHE_FORMAT_VERSION {
        return Err(format!(
            "unsupported format version {} (expected {CACHE_FORMAT_VERSION})",
            header.format_version
        ));
    }

    let (engine, consumed): (T, usize) =
        bincode::serde::decode_from_slice(payload, config).map_err(|err| err.to_string())?;
    if consumed != payload.len() {
        return Err("trailing bytes after payload".into());
    }

    Ok(engine)
}
