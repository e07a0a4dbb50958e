use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::{PortalError, RefreshRequest, RefreshResponse};

use crate::models::{
    AvailabilityRequest, AvailableSlotsPayload, DashboardPayload, EndConsultationRequest,
    RescheduleRequest, WalkinRequest,
};
use crate::session::AuthSession;

/// REST gateway to the appointment backend. All portal traffic goes through
/// the single [`request`](Self::request) helper so the bearer header and the
/// 401 refresh-and-retry handling live in one place.
pub struct BackendClient {
    client: Client,
    base_url: String,
    session: Arc<AuthSession>,
}

impl BackendClient {
    pub fn new(config: &AppConfig, session: Arc<AuthSession>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|err| {
                warn!("Failed to build HTTP client with timeout: {}", err);
                Client::new()
            });

        Self {
            client,
            base_url: config.api_base_url.clone(),
            session,
        }
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, PortalError>
    where
        T: DeserializeOwned,
    {
        if self.session.access_token().await.is_none() {
            // No access token stored; a valid refresh token can still rescue
            // the session before the first authenticated call.
            if !self.refresh_access_token().await {
                return Err(PortalError::NotAuthenticated);
            }
        }

        let response = self.send(method.clone(), path, body.as_ref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if self.refresh_access_token().await {
                let retry = self.send(method, path, body.as_ref()).await?;
                return Self::decode(retry).await;
            }
            self.session.dispose().await;
            return Err(PortalError::Auth("token refresh failed".to_string()));
        }

        Self::decode(response).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, PortalError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url);

        if let Some(token) = self.session.access_token().await {
            req = req.bearer_auth(token);
        }
        if let Some(body_data) = body {
            req = req.json(body_data);
        }

        Ok(req.send().await?)
    }

    async fn decode<T>(response: Response) -> Result<T, PortalError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => PortalError::Auth(error_text),
                404 => PortalError::NotFound(error_text),
                400 => PortalError::BadRequest(error_text),
                s => PortalError::Api {
                    status: s,
                    message: error_text,
                },
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// One refresh-token exchange. A rejection in any form clears the stored
    /// credentials, matching the backend's single-attempt contract.
    async fn refresh_access_token(&self) -> bool {
        let Some(refresh) = self.session.refresh_token().await else {
            return false;
        };

        let url = format!("{}/token/refresh/", self.base_url);
        let result = self
            .client
            .post(&url)
            .json(&RefreshRequest { refresh })
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<RefreshResponse>().await {
                Ok(tokens) => {
                    self.session.apply_refresh(tokens.access, tokens.refresh).await;
                    true
                }
                Err(err) => {
                    warn!("Token refresh returned malformed body: {}", err);
                    self.session.dispose().await;
                    false
                }
            },
            Ok(resp) => {
                warn!("Token refresh rejected ({})", resp.status());
                self.session.dispose().await;
                false
            }
            Err(err) => {
                warn!("Token refresh request failed: {}", err);
                self.session.dispose().await;
                false
            }
        }
    }

    // ==================== Dashboard & queue reads ====================

    pub async fn fetch_dashboard(&self) -> Result<DashboardPayload, PortalError> {
        self.request(Method::GET, "/doctor/dashboard/", None).await
    }

    /// Raw appointment list for a date. Returned untyped: shape coercion
    /// (bare array vs `{results: []}`) belongs to the normalizer.
    pub async fn fetch_appointments(&self, date: NaiveDate) -> Result<Value, PortalError> {
        let path = format!("/doctor/appointments/?date={}", date.format("%Y-%m-%d"));
        self.request(Method::GET, &path, None).await
    }

    pub async fn available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<AvailableSlotsPayload, PortalError> {
        let path = format!(
            "/appointments/available_slots/?doctor_id={}&date={}",
            doctor_id,
            date.format("%Y-%m-%d")
        );
        self.request(Method::GET, &path, None).await
    }

    // ==================== Consultation mutations ====================

    pub async fn start_consultation(&self, appointment_id: &str) -> Result<Value, PortalError> {
        let path = format!("/appointments/{}/start_consultation/", appointment_id);
        self.request(Method::POST, &path, None).await
    }

    pub async fn end_consultation(
        &self,
        appointment_id: &str,
        body: &EndConsultationRequest,
    ) -> Result<Value, PortalError> {
        let path = format!("/appointments/{}/end_consultation/", appointment_id);
        self.request(Method::POST, &path, Some(serde_json::to_value(body)?))
            .await
    }

    // ==================== Queue management mutations ====================

    pub async fn create_walkin(&self, body: &WalkinRequest) -> Result<Value, PortalError> {
        self.request(
            Method::POST,
            "/appointments/walkin/",
            Some(serde_json::to_value(body)?),
        )
        .await
    }

    pub async fn reschedule(
        &self,
        appointment_id: &str,
        body: &RescheduleRequest,
    ) -> Result<Value, PortalError> {
        let path = format!("/appointments/{}/reschedule/", appointment_id);
        self.request(Method::POST, &path, Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn set_availability(&self, body: &AvailabilityRequest) -> Result<Value, PortalError> {
        self.request(
            Method::POST,
            "/doctor/availability/",
            Some(serde_json::to_value(body)?),
        )
        .await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
