use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::models::{AppointmentRecord, AppointmentStatus, BookingType, Priority};

/// Every backend shape an appointment record has been observed in. Fields the
/// payload omits deserialize to `None`; a record that matches none of the
/// known shapes degrades to defaults instead of failing.
#[derive(Debug, Default, Deserialize)]
struct RawAppointment {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    token_number: Option<RawToken>,
    #[serde(default)]
    token: Option<RawToken>,
    #[serde(default)]
    patient_name: Option<String>,
    #[serde(default)]
    patient: Option<RawPerson>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    booking_type: Option<String>,
    #[serde(default)]
    reason_for_visit: Option<String>,
    #[serde(default)]
    time_slot: Option<String>,
    #[serde(default)]
    appointment_time: Option<String>,
    #[serde(default)]
    patient_age: Option<u32>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    doctor_name: Option<String>,
    #[serde(default)]
    doctor: Option<RawPerson>,
    #[serde(default)]
    consultation_started_at: Option<String>,
}

/// Tokens arrive as strings in newer backend versions, bare numbers in older
/// ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawToken {
    Text(String),
    Number(i64),
}

impl RawToken {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// `patient`/`doctor` fields are either a bare display name or an embedded
/// profile object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPerson {
    Name(String),
    Profile {
        #[serde(default)]
        full_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl RawPerson {
    fn display_name(self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name),
            Self::Profile { full_name, name } => full_name.or(name),
        }
    }
}

/// Map one raw backend record into the canonical shape. Pure and infallible:
/// unknown shapes log a warning and coalesce to defaults. Idempotent over
/// records already in canonical form.
pub fn normalize(value: &Value) -> AppointmentRecord {
    let raw: RawAppointment = serde_json::from_value(value.clone()).unwrap_or_else(|err| {
        warn!("Unrecognized appointment shape, using defaults: {}", err);
        RawAppointment::default()
    });

    let id = raw.id.as_ref().and_then(scalar_to_string).unwrap_or_default();

    // Last-resort token fallback: the backend numeric id. Documented edge
    // case, not an error.
    let token_number = raw
        .token_number
        .map(RawToken::into_string)
        .or_else(|| raw.token.map(RawToken::into_string))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| id.clone());

    let status_raw = raw.status.unwrap_or_default();
    let status = AppointmentStatus::from_raw(&status_raw);
    if status == AppointmentStatus::Unknown && !status_raw.trim().is_empty() {
        warn!("Unknown appointment status {:?}, keeping as unknown", status_raw);
    }

    let booking_type = raw
        .booking_type
        .as_deref()
        .map(BookingType::from_raw)
        .unwrap_or(BookingType::Appointment);

    let reason = raw
        .reason
        .filter(|r| !r.is_empty())
        .or_else(|| raw.booking_type.filter(|r| !r.is_empty()))
        .or_else(|| raw.reason_for_visit.filter(|r| !r.is_empty()))
        .unwrap_or_else(|| "—".to_string());

    let consultation_started_at = raw.consultation_started_at.and_then(|ts| {
        DateTime::parse_from_rfc3339(&ts)
            .map(|dt| dt.to_utc())
            .map_err(|err| warn!("Unparseable consultation_started_at {:?}: {}", ts, err))
            .ok()
    });

    AppointmentRecord {
        id,
        token_number,
        patient_name: raw
            .patient_name
            .filter(|n| !n.is_empty())
            .or_else(|| raw.patient.and_then(RawPerson::display_name))
            .unwrap_or_else(|| "Unknown".to_string()),
        status,
        reason,
        time_slot: raw
            .time_slot
            .filter(|t| !t.is_empty())
            .or(raw.appointment_time)
            .unwrap_or_default(),
        patient_age: raw.patient_age,
        booking_type,
        priority: raw.priority.as_deref().and_then(Priority::from_raw),
        doctor_name: raw
            .doctor_name
            .filter(|n| !n.is_empty())
            .or_else(|| raw.doctor.and_then(RawPerson::display_name)),
        consultation_started_at,
    }
}

/// Normalize a payload that should be a list of appointments. Handles the
/// paginated `{results: []}` wrapper; anything else coerces to empty with a
/// warning, never an error.
pub fn normalize_list(value: &Value) -> Vec<AppointmentRecord> {
    let empty: Vec<Value> = Vec::new();
    let items: &[Value] = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items,
            _ => {
                warn!("Appointment payload is an object without results[], coercing to empty");
                &empty
            }
        },
        Value::Null => &empty,
        other => {
            warn!("Expected appointment list, got {}, coercing to empty", type_name(other));
            &empty
        }
    };

    items.iter().map(normalize).collect()
}

/// The dashboard queue pointer: string in newer backends, number in older
/// ones, empty string when nobody is being served.
pub fn normalize_current_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::String(_) => None,
        other => {
            warn!("Unexpected current_token shape {}, ignoring", type_name(other));
            None
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
