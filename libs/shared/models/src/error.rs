use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl PortalError {
    /// Transient failures leave the previous derived state in place; auth
    /// failures require the caller to re-authenticate.
    pub fn is_auth(&self) -> bool {
        matches!(self, PortalError::Auth(_) | PortalError::NotAuthenticated)
    }
}
