use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `GET /doctor/dashboard/`. Every field is optional because the
/// backend omits sections freely (no queue yet, no profile for admins, etc.).
#[derive(Debug, Default, Deserialize)]
pub struct DashboardPayload {
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub today_appointments: Option<Value>,
    #[serde(default)]
    pub current_queue: Option<CurrentQueuePayload>,
    #[serde(default)]
    pub completed_today: Option<u32>,
    #[serde(default)]
    pub total_patients: Option<u32>,
}

/// The `current_queue` block. `current_token` arrives as a string in newer
/// backend versions and as a bare number in older ones, so it stays raw here.
#[derive(Debug, Default, Deserialize)]
pub struct CurrentQueuePayload {
    #[serde(default)]
    pub current_token: Option<Value>,
    #[serde(default)]
    pub completed_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
    #[serde(default)]
    pub average_time_per_patient: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndConsultationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_show: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkinRequest {
    pub patient_name: String,
    pub patient_age: u32,
    /// `None` means normal priority; the backend only understands the
    /// elevated tiers ("vip", "emergency").
    pub priority: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduleRequest {
    pub new_doctor_id: String,
    pub appointment_date: String,
    pub time_slot: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailableSlotsPayload {
    #[serde(default)]
    pub available_slots: Vec<SlotOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotOption {
    pub value: String,
    pub display: String,
}
