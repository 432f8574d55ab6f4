use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use tracing::{info, warn};

use crate::{error::AppError, storage::index_cache::IndexCache, utils::config::AppConfig};

/// Resolved locations of the document intake folder and the engine cache folder.
#[derive(Clone, Debug)]
pub struct StoragePaths {
    intake_dir: PathBuf,
    cache_dir: PathBuf,
}

impl StoragePaths {
    pub fn new(intake_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            intake_dir: intake_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.pdf_folder, &config.vectorstore_folder)
    }

    pub fn intake_dir(&self) -> &Path {
        &self.intake_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn index_cache(&self) -> IndexCache {
        IndexCache::new(&self.cache_dir)
    }

    /// Creates both folders when they are missing.
    pub async fn ensure_exists(&self) -> Result<(), AppError> {
        for dir in [&self.intake_dir, &self.cache_dir] {
            if tokio::fs::try_exists(dir).await? {
                continue;
            }
            tokio::fs::create_dir_all(dir).await?;
            info!(folder = %dir.display(), "Created folder");
        }
        Ok(())
    }

    /// Where an uploaded file named `file_name` is kept inside the intake folder.
    pub fn intake_path(&self, file_name: &str) -> Result<PathBuf, AppError> {
        let sanitized = sanitize_file_name(file_name);
        if sanitized.trim_end_matches('.').trim().is_empty() {
            return Err(AppError::Validation(format!(
                "'{file_name}' is not a usable file name"
            )));
        }
        Ok(self.intake_dir.join(sanitized))
    }

    /// First PDF in the intake folder, in alphabetical order.
    pub fn first_document(&self) -> Result<Option<PathBuf>, AppError> {
        let folder = self.intake_dir.to_string_lossy();
        let pattern = format!("{}/*.pdf", Pattern::escape(&folder));
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let entries = glob_with(&pattern, options)
            .map_err(|err| AppError::InternalError(format!("invalid intake pattern: {err}")))?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => return Ok(Some(path)),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Skipping unreadable intake entry"),
            }
        }

        Ok(None)
    }

    /// Copies an uploaded file into the intake folder under its sanitised
    /// name, replacing any earlier upload with exactly the same name.
    pub async fn store_upload(&self, file_name: &str, source: &Path) -> Result<PathBuf, AppError> {
        let target = self.intake_path(file_name)?;
        let bytes = tokio::fs::copy(source, &target).await?;
        info!(path = %target.display(), bytes, "Stored uploaded document");
        Ok(target)
    }
}

/// Keeps only the final path component of an uploaded name. Control
/// characters and leading dots are dropped; spaces, dashes and non-ASCII
/// letters survive so distinct names keep distinct identities.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let kept: String = base.chars().filter(|c| !c.is_control()).collect();
    kept.trim().trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_exists_creates_missing_folders() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(
            root.path().join("pdf_input"),
            root.path().join("vector_databases"),
        );

        paths.ensure_exists().await.expect("create folders");
        assert!(paths.intake_dir().is_dir());
        assert!(paths.cache_dir().is_dir());

        // Second call is a no-op
        paths.ensure_exists().await.expect("idempotent");
    }

    #[test]
    fn test_from_config_uses_configured_folders() {
        let config = AppConfig::default();
        let paths = StoragePaths::from_config(&config);
        assert_eq!(paths.intake_dir(), Path::new("pdf_input"));
        assert_eq!(paths.cache_dir(), Path::new("vector_databases"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("normal_file.pdf"), "normal_file.pdf");
        assert_eq!(sanitize_file_name("file with spaces.pdf"), "file with spaces.pdf");
        assert_eq!(sanitize_file_name("Q1-report.pdf"), "Q1-report.pdf");
        assert_eq!(sanitize_file_name("Übersicht.pdf"), "Übersicht.pdf");
        assert_eq!(sanitize_file_name("dir/nested/report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("C:\\uploads\\report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../dangerous.pdf"), "dangerous.pdf");
        assert_eq!(sanitize_file_name("no_extension"), "no_extension");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("bad\0name\n.pdf"), "badname.pdf");
    }

    #[test]
    fn test_similar_names_stay_distinct() {
        let names = ["Q1 report.pdf", "Q1-report.pdf", "Q1_report.pdf", "日報.pdf", "月報.pdf"];
        let sanitized: std::collections::HashSet<_> =
            names.iter().map(|n| sanitize_file_name(n)).collect();
        assert_eq!(sanitized.len(), names.len());
    }

    #[test]
    fn test_intake_path_rejects_empty_names() {
        let paths = StoragePaths::new("in", "out");
        assert!(matches!(
            paths.intake_path(".."),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            paths.intake_path("Report 2024.pdf").expect("path"),
            Path::new("in").join("Report 2024.pdf")
        );
    }

    #[tokio::test]
    async fn test_store_upload_copies_into_intake_folder() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(root.path().join("in"), root.path().join("out"));
        paths.ensure_exists().await.expect("folders");
        let upload = root.path().join("upload.tmp");
        std::fs::write(&upload, b"%PDF-1.4").expect("write");

        let stored = paths
            .store_upload("My Report.pdf", &upload)
            .await
            .expect("store");

        assert_eq!(stored, paths.intake_dir().join("My Report.pdf"));
        assert_eq!(std::fs::read(&stored).expect("read"), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_first_document_picks_alphabetical_pdf() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(root.path().join("in"), root.path().join("out"));
        paths.ensure_exists().await.expect("folders");

        assert!(paths.first_document().expect("scan").is_none());

        std::fs::write(paths.intake_dir().join("notes.txt"), b"ignored").expect("write");
        std::fs::write(paths.intake_dir().join("zeta.pdf"), b"%PDF").expect("write");
        std::fs::write(paths.intake_dir().join("alpha.PDF"), b"%PDF").expect("write");

        let first = paths.first_document().expect("scan").expect("some pdf");
        assert_eq!(first.file_name().and_then(|n| n.to_str()), Some("alpha.PDF"));
    }
}
