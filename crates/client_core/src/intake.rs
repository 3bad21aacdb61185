//! File handles accepted by the upload flow and their data-URL encoding.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{constants::MAX_FILE_SIZE_BYTES, error::UploadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A user-chosen file as reported by a drop or picker event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

impl SelectedFile {
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size_bytes: bytes.len() as u64,
            source: FileSource::Bytes(bytes),
        }
    }

    /// Stats a file on disk; the content type is guessed from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat '{}'", path.display()))?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            content_type,
            size_bytes: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn check_size(&self) -> Result<(), UploadError> {
        if self.size_bytes > MAX_FILE_SIZE_BYTES {
            return Err(UploadError::FileTooLarge {
                size_bytes: self.size_bytes,
                max_bytes: MAX_FILE_SIZE_BYTES,
            });
        }
        Ok(())
    }

    /// File name without its extension, used as a project label.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

#[async_trait]
pub trait FileEncoder: Send + Sync {
    async fn encode(&self, file: &SelectedFile) -> Result<String, UploadError>;
}

/// Encodes file contents as `data:<mime>;base64,<payload>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlEncoder;

#[async_trait]
impl FileEncoder for DataUrlEncoder {
    async fn encode(&self, file: &SelectedFile) -> Result<String, UploadError> {
        let encoded = match &file.source {
            FileSource::Bytes(bytes) => STANDARD.encode(bytes),
            FileSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|err| UploadError::Encode(format!("{}: {err}", path.display())))?;
                STANDARD.encode(bytes)
            }
        };
        Ok(format!("data:{};base64,{encoded}", file.content_type))
    }
}
