use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

use crate::services::consultation::ConsultationService;

/// Second-granularity local clock for the session view. Independent of the
/// poll interval; drift between the two is expected, the poll resync wins.
pub struct SessionTimer {
    service: Arc<ConsultationService>,
    is_shutdown: RwLock<bool>,
}

impl SessionTimer {
    pub fn new(service: Arc<ConsultationService>) -> Self {
        Self {
            service,
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn run(&self) {
        let mut ticker = interval(Duration::from_secs(1));
        // A suspended task must not replay missed ticks as a burst; that
        // would double-count elapsed time.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so counting
        // starts one full second in.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if *self.is_shutdown.read().await {
                debug!("Session timer received shutdown signal");
                break;
            }
            self.service.tick().await;
        }
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}
