use serde::{Deserialize, Serialize};

/// Body of the remote rendering call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateViewRequest {
    pub source_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateViewResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_image: Option<String>,
}
