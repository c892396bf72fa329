// ABOUTME: File upload persistence for FILE-type settings
// ABOUTME: Stores an uploaded file and yields the URL saved as the setting value

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::SettingsError;
use setkeep_storage::StorageError;

/// A file submitted for a FILE-type setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-side file name, used only for its extension
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            contents,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let contents = tokio::fs::read(path).await.map_err(StorageError::Io)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, contents))
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
    }
}

/// Destination for uploaded files
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist `file` for `section.key` and return its public URL
    async fn store(
        &self,
        section: &str,
        key: &str,
        file: &UploadedFile,
    ) -> Result<String, SettingsError>;
}

/// Writes uploads into a local directory served under a URL prefix
pub struct LocalUploadStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &setkeep_config::Config) -> Self {
        Self::new(config.upload_dir.clone(), config.upload_url_prefix.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name_for(section: &str, key: &str, file: &UploadedFile) -> String {
        let unique = nanoid::nanoid!(12);
        match file.extension() {
            Some(ext) => format!("{}_{}_{}.{}", section, key, unique, ext),
            None => format!("{}_{}_{}", section, key, unique),
        }
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn store(
        &self,
        section: &str,
        key: &str,
        file: &UploadedFile,
    ) -> Result<String, SettingsError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(StorageError::Io)?;

        let file_name = Self::file_name_for(section, key, file);
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, &file.contents)
            .await
            .map_err(StorageError::Io)?;

        info!(section, key, path = %path.display(), "Stored uploaded setting file");
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }
}
