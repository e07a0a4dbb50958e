use std::env;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polling_cell::{PollerSettings, QueuePoller};
use queue_cell::{project, DisplayOptions, DisplayState};
use shared_backend::{AuthSession, BackendClient};
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cabin display");

    let config = AppConfig::from_env();

    let session = match (
        env::var("PORTAL_ACCESS_TOKEN"),
        env::var("PORTAL_REFRESH_TOKEN"),
    ) {
        (Ok(access), Ok(refresh)) => AuthSession::create(access, refresh),
        _ => {
            warn!("PORTAL_ACCESS_TOKEN/PORTAL_REFRESH_TOKEN not set, starting unauthenticated");
            AuthSession::anonymous()
        }
    };

    let client = Arc::new(BackendClient::new(&config, Arc::new(session)));

    let options = DisplayOptions {
        show_full_names: env_flag("PORTAL_SHOW_FULL_NAMES", true),
        show_tokens: env_flag("PORTAL_SHOW_TOKENS", true),
        show_upcoming_limit: Some(3),
    };

    let settings = PollerSettings {
        interval: Duration::from_secs(config.cabin_poll_interval_secs),
        upcoming_limit: Some(3),
        offline_grace: Duration::from_secs(config.offline_grace_secs),
    };
    let poller = Arc::new(QueuePoller::new(client, settings));
    let mut state_rx = poller.subscribe();

    let runner = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run().await })
    };

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                let display = project(&state, &options);
                render(&display, poller.is_offline().await);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down cabin display");
                poller.shutdown().await;
                break;
            }
        }
    }

    runner.abort();
}

fn render(display_state: &DisplayState, offline: bool) {
    if offline {
        warn!("Connection lost, showing last known queue");
    }

    info!(
        "NOW SERVING  {}  {}",
        display_state.now_serving.token.as_deref().unwrap_or(""),
        display_state.now_serving.patient
    );
    for entry in &display_state.upcoming {
        info!(
            "COMING UP    {}  {}",
            entry.token.as_deref().unwrap_or(""),
            entry.patient
        );
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}
