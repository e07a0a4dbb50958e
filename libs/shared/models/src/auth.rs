use serde::{Deserialize, Serialize};

/// Bearer token pair issued by the backend. The tokens are opaque to the
/// client; only the backend validates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    pub refresh: Option<String>,
}
