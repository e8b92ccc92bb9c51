// Ingested API call events (what the histogram query counts).

use serde::{Deserialize, Serialize};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    /// Epoch millis (UTC).
    pub requested_at: i64,
    pub api_name: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub api_creator: String,
}

impl ApiRequest {
    pub fn new(requested_at: i64, api_name: impl Into<String>) -> Self {
        Self {
            requested_at,
            api_name: api_name.into(),
            api_version: String::new(),
            api_creator: String::new(),
        }
    }
}
