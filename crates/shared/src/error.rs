use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Encode,
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file is {size_bytes} bytes, above the {max_bytes} byte limit")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },
    #[error("unsupported content type '{0}'; expected an image")]
    UnsupportedContentType(String),
    #[error("failed to read file: {0}")]
    Encode(String),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileTooLarge { .. } | Self::UnsupportedContentType(_) => ErrorKind::Validation,
            Self::Encode(_) => ErrorKind::Encode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("render request failed: {0}")]
    Remote(String),
    #[error("render service returned no image")]
    EmptyResult,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Generation
    }
}
