use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one consultation session, as shown on the live session
/// timeline. Strict machine: `queued → called → in-progress → {completed,
/// on-hold}`, with `on-hold → in-progress` as the resume path. `completed` is
/// terminal; the next active appointment starts a fresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Queued,
    Called,
    InProgress,
    OnHold,
    Completed,
}

impl SessionStatus {
    pub fn valid_transitions(&self) -> Vec<SessionStatus> {
        match self {
            Self::Queued => vec![Self::Called],
            Self::Called => vec![Self::InProgress],
            Self::InProgress => vec![Self::Completed, Self::OnHold],
            Self::OnHold => vec![Self::InProgress],
            Self::Completed => vec![],
        }
    }

    /// Local, action-triggered transitions go through this check. Poll
    /// resyncs are authoritative and bypass it.
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Called => "called",
            Self::InProgress => "in-progress",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Owned by the local 1 s timer while in progress; overwritten by every
    /// poll resync that carries a backend-derived value.
    pub elapsed_seconds: u64,
    /// Id of the appointment this session tracks. A change here means a new
    /// consultation cycle and resets the elapsed counter.
    pub active_id: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Queued,
            elapsed_seconds: 0,
            active_id: None,
        }
    }
}

/// "MM:SS" for the session timer widget.
pub fn format_elapsed(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
