use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_PROJECT_NAME, UPLOAD_ERROR_SENTINEL},
    error::UploadError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountState {
    #[default]
    Unmounted,
    Mounting,
    Mounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Processing,
    Succeeded,
    Failed,
}

/// State carried from the upload screen to the visualizer on navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_render: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NavigationState {
    /// Builds the handoff for a completed upload. Returns `None` for the error sentinel.
    pub fn from_upload_payload(payload: &str, name: Option<String>) -> Option<Self> {
        if payload.is_empty() || payload == UPLOAD_ERROR_SENTINEL {
            return None;
        }
        Some(Self {
            initial_image: Some(payload.to_string()),
            initial_render: None,
            name,
        })
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_PROJECT_NAME,
        }
    }

    pub fn source_image(&self) -> Option<&str> {
        self.initial_image.as_deref().filter(|image| !image.is_empty())
    }

    pub fn prerendered(&self) -> Option<&str> {
        self.initial_render.as_deref().filter(|image| !image.is_empty())
    }
}

/// Terminal result of one upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Encoded(String),
    Failed(UploadError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Flattens the outcome to the string handed to navigation; failures become the sentinel.
    pub fn into_payload(self) -> String {
        match self {
            Self::Encoded(payload) => payload,
            Self::Failed(_) => UPLOAD_ERROR_SENTINEL.to_string(),
        }
    }
}
