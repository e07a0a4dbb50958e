use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::models::{AppointmentRecord, QueueSnapshot, QueueStats, ReconciledQueueState};

/// Rebuild the derived queue state from one snapshot. The result is a whole
/// replacement for whatever the caller held before; nothing here is patched
/// in place.
pub fn reconcile(snapshot: &QueueSnapshot, upcoming_limit: Option<usize>) -> ReconciledQueueState {
    let active = select_active(snapshot);
    let upcoming = upcoming_after(&snapshot.appointments, active.as_ref(), upcoming_limit);
    let stats = compute_stats(&snapshot.appointments);

    ReconciledQueueState {
        active,
        upcoming,
        stats,
    }
}

/// Active-appointment selection, first match wins:
/// 1. exact `token_number` match against the backend queue pointer,
/// 2. substring containment in either direction (compatibility shim for
///    prefixed/padded token formats; logged when it fires),
/// 3. first record in snapshot order that is in progress, waiting or arrived.
fn select_active(snapshot: &QueueSnapshot) -> Option<AppointmentRecord> {
    if let Some(current) = snapshot.current_token.as_deref() {
        if let Some(exact) = snapshot
            .appointments
            .iter()
            .find(|a| a.token_number == current)
        {
            return Some(exact.clone());
        }

        if let Some(fuzzy) = snapshot.appointments.iter().find(|a| {
            !a.token_number.is_empty()
                && (a.token_number.contains(current) || current.contains(a.token_number.as_str()))
        }) {
            warn!(
                "Queue pointer {:?} matched token {:?} only by containment",
                current, fuzzy.token_number
            );
            return Some(fuzzy.clone());
        }

        debug!("Queue pointer {:?} matches no appointment, falling back to status scan", current);
    }

    snapshot
        .appointments
        .iter()
        .find(|a| a.status.is_active_candidate())
        .cloned()
}

fn upcoming_after(
    appointments: &[AppointmentRecord],
    active: Option<&AppointmentRecord>,
    limit: Option<usize>,
) -> Vec<AppointmentRecord> {
    let mut upcoming: Vec<AppointmentRecord> = appointments
        .iter()
        .filter(|a| a.status.is_waitable())
        .filter(|a| active.map_or(true, |act| a.token_number != act.token_number))
        .cloned()
        .collect();

    upcoming.sort_by(|a, b| compare_tokens(&a.token_number, &b.token_number));

    if let Some(limit) = limit {
        upcoming.truncate(limit);
    }
    upcoming
}

/// Numeric comparison when both tokens carry a digit run ("A2" < "A10"),
/// lexicographic otherwise.
pub fn compare_tokens(a: &str, b: &str) -> Ordering {
    match (token_numeric(a), token_numeric(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

/// First contiguous digit run in the token, if any. "A104" -> 104.
fn token_numeric(token: &str) -> Option<u64> {
    let digits: String = token
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Day-level aggregates. Arrived patients count as waiting, matching the
/// dashboard's stat cards.
pub fn compute_stats(appointments: &[AppointmentRecord]) -> QueueStats {
    let mut stats = QueueStats {
        total: appointments.len(),
        ..QueueStats::default()
    };

    for appointment in appointments {
        use crate::models::AppointmentStatus::*;
        match appointment.status {
            Waiting | Pending | Arrived => stats.waiting += 1,
            InProgress => stats.in_progress += 1,
            Completed => stats.completed += 1,
            _ => {}
        }
    }
    stats
}

/// Case-insensitive filter over token and patient name, for the queue
/// management search box. An empty term returns everything.
pub fn search<'a>(
    appointments: &'a [AppointmentRecord],
    term: &str,
) -> Vec<&'a AppointmentRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return appointments.iter().collect();
    }

    appointments
        .iter()
        .filter(|a| {
            a.token_number.to_lowercase().contains(&needle)
                || a.patient_name.to_lowercase().contains(&needle)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Local-only reorder of the day's list (the backend keeps its own order;
/// this affects nothing beyond the current view). Returns whether a swap
/// happened.
pub fn move_in_queue(
    appointments: &mut [AppointmentRecord],
    token_number: &str,
    direction: MoveDirection,
) -> bool {
    let Some(index) = appointments
        .iter()
        .position(|a| a.token_number == token_number)
    else {
        return false;
    };

    let target = match direction {
        MoveDirection::Up if index > 0 => index - 1,
        MoveDirection::Down if index + 1 < appointments.len() => index + 1,
        _ => return false,
    };

    appointments.swap(index, target);
    true
}
