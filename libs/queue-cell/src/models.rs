use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical appointment status. The synonym table in [`from_raw`]
/// (`Self::from_raw`) is the only place backend spelling variants
/// (`inprogress`, `in-progress`, ...) are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Pending,
    Waiting,
    Arrived,
    InProgress,
    OnHold,
    Completed,
    NoShow,
    Cancelled,
    Unknown,
}

impl AppointmentStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "scheduled" => Self::Scheduled,
            "confirmed" => Self::Confirmed,
            "pending" => Self::Pending,
            "waiting" => Self::Waiting,
            "arrived" => Self::Arrived,
            "in_progress" | "inprogress" | "in-progress" => Self::InProgress,
            "on_hold" | "onhold" | "on-hold" => Self::OnHold,
            "completed" => Self::Completed,
            "no_show" | "noshow" | "no-show" => Self::NoShow,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Arrived => "arrived",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Statuses that belong in the upcoming list.
    pub fn is_waitable(&self) -> bool {
        matches!(
            self,
            Self::Waiting | Self::Pending | Self::Arrived | Self::Scheduled | Self::Confirmed
        )
    }

    /// Statuses eligible for active selection when no queue pointer exists.
    pub fn is_active_candidate(&self) -> bool {
        matches!(self, Self::InProgress | Self::Waiting | Self::Arrived)
    }

    /// Statuses a consultation may be started from.
    pub fn is_startable(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed | Self::Waiting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::NoShow | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Vip,
    Emergency,
}

impl Priority {
    /// "normal" and empty map to `None`: only the elevated tiers are tagged.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "vip" => Some(Self::Vip),
            "emergency" => Some(Self::Emergency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Appointment,
    Walkin,
    Followup,
}

impl BookingType {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "walkin" | "walk-in" | "walk_in" => Self::Walkin,
            "followup" | "follow-up" | "follow_up" => Self::Followup,
            _ => Self::Appointment,
        }
    }
}

/// Canonical appointment record, post-normalization.
///
/// `token_number` is a display label, unique within one day's set but not
/// globally; it may be alphanumeric ("A104", "CARD-2024-103").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: String,
    pub token_number: String,
    pub patient_name: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub time_slot: String,
    pub patient_age: Option<u32>,
    pub booking_type: BookingType,
    pub priority: Option<Priority>,
    pub doctor_name: Option<String>,
    pub consultation_started_at: Option<DateTime<Utc>>,
}

impl Default for AppointmentRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            token_number: String::new(),
            patient_name: "Unknown".to_string(),
            status: AppointmentStatus::Unknown,
            reason: "—".to_string(),
            time_slot: String::new(),
            patient_age: None,
            booking_type: BookingType::Appointment,
            priority: None,
            doctor_name: None,
            consultation_started_at: None,
        }
    }
}

/// One polled view of today's queue. Insertion order is the backend response
/// order; it is not authoritative for queue order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub current_token: Option<String>,
    pub appointments: Vec<AppointmentRecord>,
    pub completed_count: u32,
    pub average_consult_minutes: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub total: usize,
}

/// Derived state, rebuilt whole on every poll. Never mutated incrementally:
/// a resync replaces the entire value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledQueueState {
    pub active: Option<AppointmentRecord>,
    pub upcoming: Vec<AppointmentRecord>,
    pub stats: QueueStats,
}
