use tokio::sync::RwLock;
use tracing::{debug, info};

use shared_models::TokenPair;

/// Holds the bearer credentials for one portal login. Passed explicitly into
/// the [`crate::BackendClient`] instead of living in module-level storage, so
/// its lifecycle (create, refresh, dispose) is visible to the caller.
pub struct AuthSession {
    tokens: RwLock<Option<TokenPair>>,
}

impl AuthSession {
    pub fn create(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            tokens: RwLock::new(Some(TokenPair {
                access: access.into(),
                refresh: refresh.into(),
            })),
        }
    }

    /// A session with no credentials. Every authenticated request through it
    /// fails with `NotAuthenticated` until tokens are applied.
    pub fn anonymous() -> Self {
        Self {
            tokens: RwLock::new(None),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.access.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.refresh.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    /// Install the result of a refresh-token exchange. The backend may rotate
    /// the refresh token; when it does not, the old one stays valid.
    pub async fn apply_refresh(&self, access: String, refresh: Option<String>) {
        let mut guard = self.tokens.write().await;
        let kept_refresh = match (&refresh, guard.as_ref()) {
            (Some(new), _) => new.clone(),
            (None, Some(old)) => old.refresh.clone(),
            (None, None) => String::new(),
        };
        *guard = Some(TokenPair {
            access,
            refresh: kept_refresh,
        });
        debug!("Auth session refreshed");
    }

    /// Clear stored credentials. Called when a refresh exchange fails; the
    /// user must re-authenticate from outside this crate.
    pub async fn dispose(&self) {
        let mut guard = self.tokens.write().await;
        if guard.take().is_some() {
            info!("Auth session disposed, credentials cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refresh_keeps_old_refresh_token_when_not_rotated() {
        let session = AuthSession::create("a1", "r1");
        session.apply_refresh("a2".to_string(), None).await;

        assert_eq!(session.access_token().await.as_deref(), Some("a2"));
        assert_eq!(session.refresh_token().await.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn dispose_clears_credentials() {
        let session = AuthSession::create("a1", "r1");
        session.dispose().await;

        assert!(!session.is_authenticated().await);
        assert_eq!(session.access_token().await, None);
    }
}
