use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use polling_cell::{PollerSettings, QueuePoller};
use queue_cell::{AppointmentRecord, AppointmentStatus, ReconciledQueueState};
use session_cell::{ConsultationService, SessionError, SessionStatus, SessionTimer};
use shared_backend::{AuthSession, BackendClient};
use shared_config::AppConfig;

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        api_base_url: base_url.to_string(),
        poll_interval_secs: 2,
        cabin_poll_interval_secs: 3,
        offline_grace_secs: 15,
        http_timeout_secs: 5,
        auto_call_next: true,
    }
}

fn service_for(base_url: &str, auto_call_next: bool) -> ConsultationService {
    let session = Arc::new(AuthSession::create("valid-access", "valid-refresh"));
    let client = Arc::new(BackendClient::new(&test_config(base_url), session));
    ConsultationService::new(client, auto_call_next)
}

/// Service wired to nowhere, for tests that never issue a mutation.
fn local_service() -> ConsultationService {
    service_for("http://127.0.0.1:0", true)
}

fn record(id: &str, token: &str, status: AppointmentStatus) -> AppointmentRecord {
    AppointmentRecord {
        id: id.to_string(),
        token_number: token.to_string(),
        patient_name: format!("Patient {}", token),
        status,
        ..AppointmentRecord::default()
    }
}

fn queue(
    active: Option<AppointmentRecord>,
    upcoming: Vec<AppointmentRecord>,
) -> ReconciledQueueState {
    ReconciledQueueState {
        active,
        upcoming,
        ..ReconciledQueueState::default()
    }
}

#[tokio::test]
async fn completing_a_session_auto_calls_the_next_patient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/1/end_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments/2/start_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "in_progress"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri(), true);
    let queue = queue(
        Some(record("1", "A103", AppointmentStatus::InProgress)),
        vec![record("2", "A104", AppointmentStatus::Waiting)],
    );

    let chained = service.complete(&queue).await.unwrap();
    assert_eq!(chained.unwrap().token_number, "A104");

    let state = service.state().await;
    assert_eq!(state.status, SessionStatus::Completed);
    assert_eq!(state.elapsed_seconds, 0);
}

#[tokio::test]
async fn completing_a_session_refetches_the_queue_immediately() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/1/end_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments/2/start_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The post-mutation snapshot: exactly one fetch, already showing the
    // chained patient as in progress.
    Mock::given(method("GET"))
        .and(path("/doctor/dashboard/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "today_appointments": [
                {"id": 1, "token_number": "A103", "patient_name": "Ravi Sharma", "status": "completed"},
                {"id": 2, "token_number": "A104", "patient_name": "Asha Rao", "status": "in_progress"}
            ],
            "current_queue": {"current_token": "A104", "completed_tokens": 1}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Arc::new(AuthSession::create("valid-access", "valid-refresh"));
    let client = Arc::new(BackendClient::new(&test_config(&mock_server.uri()), session));
    let poller = Arc::new(QueuePoller::new(client.clone(), PollerSettings::default()));
    let service = ConsultationService::new(client, true).with_poller(poller.clone());

    let queue = queue(
        Some(record("1", "A103", AppointmentStatus::InProgress)),
        vec![record("2", "A104", AppointmentStatus::Waiting)],
    );
    service.complete(&queue).await.unwrap();

    // The poller published the fresh snapshot and the session resynced onto it.
    assert_eq!(poller.state().active.as_ref().unwrap().token_number, "A104");
    let state = service.state().await;
    assert_eq!(state.active_id.as_deref(), Some("2"));
    assert_eq!(state.status, SessionStatus::InProgress);
}

#[tokio::test]
async fn auto_call_policy_off_completes_without_chaining() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/1/end_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments/2/start_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri(), false);
    let queue = queue(
        Some(record("1", "A103", AppointmentStatus::InProgress)),
        vec![record("2", "A104", AppointmentStatus::Waiting)],
    );

    let chained = service.complete(&queue).await.unwrap();
    assert!(chained.is_none());
}

#[tokio::test]
async fn completing_the_last_session_is_a_clean_finish() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/1/end_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri(), true);
    let queue = queue(
        Some(record("1", "A103", AppointmentStatus::InProgress)),
        vec![],
    );

    let chained = service.complete(&queue).await.unwrap();
    assert!(chained.is_none());
}

#[tokio::test]
async fn no_show_posts_the_flag_and_chains() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/1/end_consultation/"))
        .and(body_json(json!({
            "notes": "Patient marked as no-show.",
            "no_show": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments/2/start_consultation/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri(), true);
    let queue = queue(
        Some(record("1", "A103", AppointmentStatus::Waiting)),
        vec![record("2", "A104", AppointmentStatus::Waiting)],
    );

    service.mark_no_show(&queue).await.unwrap();
}

#[tokio::test]
async fn failed_mutation_leaves_session_state_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments/1/end_consultation/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server.uri(), true);
    let queue = queue(
        Some(record("1", "A103", AppointmentStatus::InProgress)),
        vec![],
    );

    service.resync(&queue).await;
    for _ in 0..5 {
        service.tick().await;
    }

    let result = service.complete(&queue).await;
    assert_matches!(result, Err(SessionError::Backend(_)));

    let state = service.state().await;
    assert_eq!(state.status, SessionStatus::InProgress);
    assert_eq!(state.elapsed_seconds, 5);
}

#[tokio::test]
async fn complete_requires_an_in_progress_active() {
    let service = local_service();

    let empty = queue(None, vec![]);
    assert_matches!(
        service.complete(&empty).await,
        Err(SessionError::NoActiveConsultation)
    );

    let not_started = queue(Some(record("1", "A103", AppointmentStatus::Waiting)), vec![]);
    assert_matches!(
        service.complete(&not_started).await,
        Err(SessionError::NoActiveConsultation)
    );
}

#[tokio::test]
async fn resync_resets_elapsed_when_the_active_id_changes() {
    let service = local_service();

    service
        .resync(&queue(
            Some(record("1", "A103", AppointmentStatus::InProgress)),
            vec![],
        ))
        .await;
    for _ in 0..42 {
        service.tick().await;
    }
    assert_eq!(service.state().await.elapsed_seconds, 42);

    // Same appointment, no backend clock: local count survives the poll.
    service
        .resync(&queue(
            Some(record("1", "A103", AppointmentStatus::InProgress)),
            vec![],
        ))
        .await;
    assert_eq!(service.state().await.elapsed_seconds, 42);

    // New appointment id: the counter must not carry over.
    service
        .resync(&queue(
            Some(record("2", "A104", AppointmentStatus::InProgress)),
            vec![],
        ))
        .await;
    assert_eq!(service.state().await.elapsed_seconds, 0);
}

#[tokio::test]
async fn resync_adopts_the_backend_clock_when_reported() {
    let service = local_service();

    let mut active = record("1", "A103", AppointmentStatus::InProgress);
    active.consultation_started_at = Some(Utc::now() - ChronoDuration::seconds(90));

    service.resync(&queue(Some(active), vec![])).await;

    let elapsed = service.state().await.elapsed_seconds;
    assert!((88..=92).contains(&elapsed), "elapsed was {}", elapsed);
}

#[tokio::test]
async fn resync_maps_appointment_statuses_onto_the_timeline() {
    let service = local_service();

    service
        .resync(&queue(
            Some(record("1", "A1", AppointmentStatus::Scheduled)),
            vec![],
        ))
        .await;
    assert_eq!(service.state().await.status, SessionStatus::Queued);

    service
        .resync(&queue(Some(record("1", "A1", AppointmentStatus::Arrived)), vec![]))
        .await;
    assert_eq!(service.state().await.status, SessionStatus::Called);

    service
        .resync(&queue(
            Some(record("1", "A1", AppointmentStatus::InProgress)),
            vec![],
        ))
        .await;
    assert_eq!(service.state().await.status, SessionStatus::InProgress);

    service.resync(&queue(None, vec![])).await;
    assert_eq!(service.state().await.status, SessionStatus::Queued);
    assert_eq!(service.state().await.active_id, None);
}

#[tokio::test]
async fn hold_and_resume_follow_the_transition_table() {
    let service = local_service();

    // Holding before anything runs is rejected.
    assert_matches!(
        service.hold().await,
        Err(SessionError::InvalidTransition { .. })
    );

    service
        .resync(&queue(
            Some(record("1", "A1", AppointmentStatus::InProgress)),
            vec![],
        ))
        .await;

    service.hold().await.unwrap();
    assert_eq!(service.state().await.status, SessionStatus::OnHold);

    // No counting while on hold.
    service.tick().await;
    assert_eq!(service.state().await.elapsed_seconds, 0);

    service.resume().await.unwrap();
    assert_eq!(service.state().await.status, SessionStatus::InProgress);
}

#[tokio::test(start_paused = true)]
async fn timer_counts_only_while_in_progress() {
    let service = Arc::new(local_service());
    let timer = Arc::new(SessionTimer::new(service.clone()));

    let runner = {
        let timer = timer.clone();
        tokio::spawn(async move { timer.run().await })
    };

    // Still queued: three seconds pass, nothing counts.
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    assert_eq!(service.state().await.elapsed_seconds, 0);

    service
        .resync(&queue(
            Some(record("1", "A1", AppointmentStatus::InProgress)),
            vec![],
        ))
        .await;

    tokio::time::sleep(std::time::Duration::from_secs(4)).await;
    let elapsed = service.state().await.elapsed_seconds;
    assert!((3..=4).contains(&elapsed), "elapsed was {}", elapsed);

    timer.shutdown().await;
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    runner.abort();
}
