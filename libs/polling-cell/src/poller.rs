use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use queue_cell::{
    normalize_current_token, normalize_list, reconcile, QueueSnapshot, ReconciledQueueState,
};
use shared_backend::BackendClient;
use shared_models::PortalError;

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    /// Cap on the upcoming list (3 for the cabin display, `None` for queue
    /// management).
    pub upcoming_limit: Option<usize>,
    /// How long without a successful poll before the view reports offline.
    pub offline_grace: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            upcoming_limit: None,
            offline_grace: Duration::from_secs(15),
        }
    }
}

/// Periodically pulls a dashboard snapshot and publishes the reconciled
/// queue state over a watch channel. Each publish replaces the whole value;
/// consumers never see a partially updated state. A failed poll keeps the
/// previous state (stale-but-valid) and waits for the next tick.
pub struct QueuePoller {
    client: Arc<BackendClient>,
    settings: PollerSettings,
    state_tx: watch::Sender<ReconciledQueueState>,
    last_success: RwLock<Option<Instant>>,
    started_at: Instant,
    is_shutdown: RwLock<bool>,
}

impl QueuePoller {
    pub fn new(client: Arc<BackendClient>, settings: PollerSettings) -> Self {
        let (state_tx, _) = watch::channel(ReconciledQueueState::default());
        Self {
            client,
            settings,
            state_tx,
            last_success: RwLock::new(None),
            started_at: Instant::now(),
            is_shutdown: RwLock::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReconciledQueueState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ReconciledQueueState {
        self.state_tx.borrow().clone()
    }

    /// Poll on the configured interval until shut down. The first fetch
    /// happens immediately.
    pub async fn run(&self) {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if *self.is_shutdown.read().await {
                debug!("Queue poller received shutdown signal");
                break;
            }
            self.poll_once().await;
        }
    }

    /// One fetch-reconcile-publish cycle. Returns whether a new state was
    /// published.
    pub async fn poll_once(&self) -> bool {
        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                if *self.is_shutdown.read().await {
                    // The consumer is gone; a late result must not be
                    // delivered anywhere.
                    debug!("Discarding snapshot fetched after teardown");
                    return false;
                }

                let state = reconcile(&snapshot, self.settings.upcoming_limit);
                let _ = self.state_tx.send(state);
                *self.last_success.write().await = Some(Instant::now());
                true
            }
            Err(err) => {
                warn!("Snapshot poll failed, keeping previous state: {}", err);
                false
            }
        }
    }

    /// Dashboard first; when it carries no appointment list, fall back to the
    /// by-date appointments endpoint.
    async fn fetch_snapshot(&self) -> Result<QueueSnapshot, PortalError> {
        let dashboard = self.client.fetch_dashboard().await?;

        let mut appointments = dashboard
            .today_appointments
            .as_ref()
            .map(normalize_list)
            .unwrap_or_default();

        if appointments.is_empty() {
            let today = Utc::now().date_naive();
            let raw = self.client.fetch_appointments(today).await?;
            appointments = normalize_list(&raw);
        }

        let queue = dashboard.current_queue.unwrap_or_default();

        Ok(QueueSnapshot {
            current_token: queue
                .current_token
                .as_ref()
                .and_then(normalize_current_token),
            appointments,
            completed_count: queue.completed_tokens.unwrap_or(0),
            average_consult_minutes: queue.average_time_per_patient,
        })
    }

    /// True when no poll has succeeded within the grace period. Transient
    /// failures inside the grace window stay invisible.
    pub async fn is_offline(&self) -> bool {
        let reference = self
            .last_success
            .read()
            .await
            .unwrap_or(self.started_at);
        reference.elapsed() >= self.settings.offline_grace
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}
