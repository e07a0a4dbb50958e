use serde::Serialize;

use crate::models::ReconciledQueueState;

/// Privacy and layout toggles for the public cabin screen.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub show_full_names: bool,
    pub show_tokens: bool,
    pub show_upcoming_limit: Option<usize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_full_names: true,
            show_tokens: true,
            show_upcoming_limit: Some(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowServing {
    /// `None` when tokens are hidden by the options.
    pub token: Option<String>,
    pub patient: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingEntry {
    pub token: Option<String>,
    pub patient: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub now_serving: NowServing,
    pub upcoming: Vec<UpcomingEntry>,
}

/// Project reconciled queue state into the cabin display shape. Pure and
/// side-effect free; the input state is never touched.
pub fn project(state: &ReconciledQueueState, options: &DisplayOptions) -> DisplayState {
    let now_serving = match &state.active {
        Some(active) => NowServing {
            token: options.show_tokens.then(|| active.token_number.clone()),
            patient: display_name(&active.patient_name, options.show_full_names),
        },
        None => NowServing {
            token: options.show_tokens.then(|| "—".to_string()),
            patient: "Waiting for next patient...".to_string(),
        },
    };

    let limit = options.show_upcoming_limit.unwrap_or(usize::MAX);
    let upcoming = state
        .upcoming
        .iter()
        .take(limit)
        .map(|a| UpcomingEntry {
            token: options.show_tokens.then(|| a.token_number.clone()),
            patient: display_name(&a.patient_name, options.show_full_names),
            reason: a.reason.clone(),
        })
        .collect();

    DisplayState {
        now_serving,
        upcoming,
    }
}

fn display_name(name: &str, show_full: bool) -> String {
    if show_full {
        name.to_string()
    } else {
        anonymize(name)
    }
}

/// Redact a patient name for public display: first initial plus last name
/// part, or just the initial for single-word names.
pub fn anonymize(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "—".to_string(),
        [only] => {
            let initial = only.chars().next().unwrap_or('—');
            format!("{}.", initial)
        }
        parts => {
            let initial = parts[0].chars().next().unwrap_or('—');
            format!("{}. {}", initial, parts[parts.len() - 1])
        }
    }
}
