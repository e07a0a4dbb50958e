use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub cabin_poll_interval_secs: u64,
    pub offline_grace_secs: u64,
    pub http_timeout_secs: u64,
    pub auto_call_next: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("PORTAL_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_BASE_URL not set, using empty value");
                    String::new()
                }),
            poll_interval_secs: parse_var("PORTAL_POLL_INTERVAL_SECS", 2),
            cabin_poll_interval_secs: parse_var("PORTAL_CABIN_POLL_INTERVAL_SECS", 3),
            offline_grace_secs: parse_var("PORTAL_OFFLINE_GRACE_SECS", 15),
            http_timeout_secs: parse_var("PORTAL_HTTP_TIMEOUT_SECS", 10),
            auto_call_next: env::var("PORTAL_AUTO_CALL_NEXT")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }
}

fn parse_var(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid number, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_configured_requires_base_url() {
        let config = AppConfig {
            api_base_url: String::new(),
            poll_interval_secs: 2,
            cabin_poll_interval_secs: 3,
            offline_grace_secs: 15,
            http_timeout_secs: 10,
            auto_call_next: true,
        };
        assert!(!config.is_configured());

        let configured = AppConfig {
            api_base_url: "http://localhost:8000/api".to_string(),
            ..config
        };
        assert!(configured.is_configured());
    }
}
