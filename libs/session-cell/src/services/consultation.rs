use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use polling_cell::QueuePoller;
use queue_cell::{AppointmentRecord, AppointmentStatus, ReconciledQueueState};
use shared_backend::{BackendClient, EndConsultationRequest};

use crate::error::SessionError;
use crate::models::{SessionState, SessionStatus};

/// Tracks the single active consultation for one doctor view and issues the
/// backend mutations its actions require. State changes follow a strict
/// no-optimistic-commit rule: a failed mutation leaves the session exactly as
/// it was, and the poll resync remains the sole source of truth.
pub struct ConsultationService {
    client: Arc<BackendClient>,
    poller: Option<Arc<QueuePoller>>,
    auto_call_next: bool,
    state: RwLock<SessionState>,
}

impl ConsultationService {
    pub fn new(client: Arc<BackendClient>, auto_call_next: bool) -> Self {
        Self {
            client,
            poller: None,
            auto_call_next,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Attach the poller whose snapshot this session tracks. Each successful
    /// mutation then pulls a fresh snapshot right away instead of leaving the
    /// published queue state stale until the next scheduled tick.
    pub fn with_poller(mut self, poller: Arc<QueuePoller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Authoritative overwrite from a fresh poll. Bypasses the local
    /// transition table: the backend has already decided.
    pub async fn resync(&self, queue: &ReconciledQueueState) {
        let mut state = self.state.write().await;

        match &queue.active {
            Some(active) => {
                let id_changed = state.active_id.as_deref() != Some(active.id.as_str());
                let backend_elapsed = elapsed_from_backend(active);

                if id_changed {
                    debug!(
                        "Active appointment changed to id {}, resetting session clock",
                        active.id
                    );
                    state.active_id = Some(active.id.clone());
                    state.elapsed_seconds = backend_elapsed.unwrap_or(0);
                } else if let Some(elapsed) = backend_elapsed {
                    // Local ticks are advisory between polls; the backend
                    // clock wins whenever it reports one.
                    state.elapsed_seconds = elapsed;
                }

                state.status = session_status_for(active.status);
            }
            None => {
                if state.active_id.take().is_some() {
                    state.elapsed_seconds = 0;
                }
                state.status = SessionStatus::Queued;
            }
        }
    }

    /// Start the consultation for the first eligible upcoming appointment.
    pub async fn call_next(
        &self,
        queue: &ReconciledQueueState,
    ) -> Result<AppointmentRecord, SessionError> {
        let next = self.start_next(queue).await?;
        self.refresh_queue().await;
        Ok(next)
    }

    async fn start_next(
        &self,
        queue: &ReconciledQueueState,
    ) -> Result<AppointmentRecord, SessionError> {
        let next = queue
            .upcoming
            .iter()
            .find(|a| a.status.is_startable())
            .ok_or(SessionError::NoEligibleNext)?;

        self.client.start_consultation(&next.id).await?;
        info!("Called next patient, token {}", next.token_number);
        Ok(next.clone())
    }

    /// End the active in-progress consultation. When the auto-call policy is
    /// on, the next eligible patient is started without further user action;
    /// an empty queue is a clean finish, not an error.
    pub async fn complete(
        &self,
        queue: &ReconciledQueueState,
    ) -> Result<Option<AppointmentRecord>, SessionError> {
        let active = queue.active.as_ref().ok_or(SessionError::NoActiveConsultation)?;
        if active.status != AppointmentStatus::InProgress {
            return Err(SessionError::NoActiveConsultation);
        }

        let body = EndConsultationRequest {
            notes: Some("Consultation completed successfully.".to_string()),
            no_show: None,
        };
        self.client.end_consultation(&active.id, &body).await?;

        {
            let mut state = self.state.write().await;
            state.status = SessionStatus::Completed;
            state.elapsed_seconds = 0;
        }
        info!("Consultation completed for token {}", active.token_number);

        let chained = self.chain_next(queue).await?;
        self.refresh_queue().await;
        Ok(chained)
    }

    /// Mark the active appointment as a no-show. Chains to the next patient
    /// under the same policy as [`complete`](Self::complete).
    pub async fn mark_no_show(
        &self,
        queue: &ReconciledQueueState,
    ) -> Result<Option<AppointmentRecord>, SessionError> {
        let active = queue.active.as_ref().ok_or(SessionError::NoActiveConsultation)?;

        let body = EndConsultationRequest {
            notes: Some("Patient marked as no-show.".to_string()),
            no_show: Some(true),
        };
        self.client.end_consultation(&active.id, &body).await?;

        {
            let mut state = self.state.write().await;
            state.status = SessionStatus::Completed;
            state.elapsed_seconds = 0;
        }
        info!("Token {} marked as no-show", active.token_number);

        let chained = self.chain_next(queue).await?;
        self.refresh_queue().await;
        Ok(chained)
    }

    async fn chain_next(
        &self,
        queue: &ReconciledQueueState,
    ) -> Result<Option<AppointmentRecord>, SessionError> {
        if !self.auto_call_next {
            return Ok(None);
        }
        match self.start_next(queue).await {
            Ok(next) => Ok(Some(next)),
            Err(SessionError::NoEligibleNext) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Fetch-after-mutate: one immediate poll so the published queue state
    /// and this session reflect the mutation without waiting out the
    /// scheduled interval. No-op when no poller is attached.
    async fn refresh_queue(&self) {
        if let Some(poller) = &self.poller {
            if poller.poll_once().await {
                self.resync(&poller.state()).await;
            }
        }
    }

    /// Pause the running session. Local-only: the backend contract has no
    /// hold endpoint, so this survives only until the next resync says
    /// otherwise.
    pub async fn hold(&self) -> Result<(), SessionError> {
        self.transition_local(SessionStatus::OnHold).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.transition_local(SessionStatus::InProgress).await
    }

    async fn transition_local(&self, target: SessionStatus) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if !state.status.can_transition_to(target) {
            return Err(SessionError::InvalidTransition {
                from: state.status,
                to: target,
            });
        }
        state.status = target;
        Ok(())
    }

    /// Notify waiting patients that the session runs long. No status change.
    pub async fn extend(&self, queue: &ReconciledQueueState) -> Result<(), SessionError> {
        let active = queue.active.as_ref().ok_or(SessionError::NoActiveConsultation)?;
        info!(
            "Session extended for token {}, waiting patients notified",
            active.token_number
        );
        Ok(())
    }

    /// Hand the session to another doctor. Notification side effect only.
    pub async fn transfer(&self, queue: &ReconciledQueueState) -> Result<(), SessionError> {
        let active = queue.active.as_ref().ok_or(SessionError::NoActiveConsultation)?;
        info!("Session transfer requested for token {}", active.token_number);
        Ok(())
    }

    /// One second of wall clock. Counts strictly while in progress; the
    /// status guard makes stray ticks during other states harmless.
    pub async fn tick(&self) {
        let mut state = self.state.write().await;
        if state.status == SessionStatus::InProgress {
            state.elapsed_seconds += 1;
        }
    }
}

fn session_status_for(status: AppointmentStatus) -> SessionStatus {
    match status {
        AppointmentStatus::InProgress => SessionStatus::InProgress,
        AppointmentStatus::OnHold => SessionStatus::OnHold,
        AppointmentStatus::Waiting | AppointmentStatus::Arrived => SessionStatus::Called,
        AppointmentStatus::Completed | AppointmentStatus::NoShow | AppointmentStatus::Cancelled => {
            SessionStatus::Completed
        }
        _ => SessionStatus::Queued,
    }
}

fn elapsed_from_backend(active: &AppointmentRecord) -> Option<u64> {
    active.consultation_started_at.map(|started| {
        let seconds = (Utc::now() - started).num_seconds();
        seconds.max(0) as u64
    })
}
