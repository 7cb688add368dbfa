//! Reconciliation: converging local belief to server truth.

mod support;

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio::sync::watch;

use tempo_api_client::TimeApi;
use tempo_core::ActiveSession;
use tempo_tracker::{
    EventBus, RealizedTimeCache, Reconciler, SessionStore, TrackerEvent,
};

use support::{ok_data, record_json, CapturedRequest, MockBackend, Responder};

const USER_ID: i64 = 7;

/// Responder backed by a mutable list of active-record JSON values, plus a
/// switch to fail the poll endpoint.
#[derive(Default)]
struct PollState {
    active: Vec<serde_json::Value>,
    realized_ms: u64,
    fail_polls: bool,
    unauthorized: bool,
}

fn poll_responder(state: Arc<Mutex<PollState>>) -> Arc<Responder> {
    Arc::new(move |req: &CapturedRequest| {
        let s = state.lock().unwrap();

        if req.is("GET", "/api/registro-tempo/ativos") {
            if s.unauthorized {
                return (401, String::new());
            }
            if s.fail_polls {
                return (502, "upstream down".to_string());
            }
            return ok_data(json!(s.active.clone()));
        }

        if req.is("GET", "/api/registro-tempo/realizado") {
            return ok_data(json!({ "tempo_realizado_ms": s.realized_ms }));
        }

        (404, format!("no route for {} {}", req.method, req.path))
    })
}

struct Harness {
    _backend: MockBackend,
    state: Arc<Mutex<PollState>>,
    store: Arc<SessionStore>,
    realized: Arc<RealizedTimeCache>,
    bus: EventBus,
    reconciler: Reconciler,
}

async fn harness(poll_interval: Duration) -> Harness {
    let state = Arc::new(Mutex::new(PollState::default()));
    let backend = MockBackend::start(poll_responder(state.clone())).await;

    let api = Arc::new(TimeApi::new(&backend.base_url, Duration::from_secs(5)).unwrap());
    let store = Arc::new(SessionStore::new());
    let realized = Arc::new(RealizedTimeCache::new());
    let bus = EventBus::default();
    let reconciler = Reconciler::new(
        api,
        store.clone(),
        realized.clone(),
        bus.clone(),
        USER_ID,
        poll_interval,
    );

    Harness {
        _backend: backend,
        state,
        store,
        realized,
        bus,
        reconciler,
    }
}

fn local_session(estimate: &str) -> ActiveSession {
    ActiveSession {
        estimate_id: estimate.to_string(),
        record_id: 900,
        task_id: format!("task-of-{estimate}"),
        client_id: "C-1".to_string(),
        user_id: USER_ID,
        started_at: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn clears_store_when_server_reports_nothing() {
    let h = harness(Duration::from_secs(60)).await;
    h.store.set(local_session("TE-1"));
    let mut rx = h.bus.subscribe();

    assert!(h.reconciler.poll().await.is_continue());

    // stopped from another device: converged within one cycle
    assert!(h.store.get_any_active().is_none());
    assert_eq!(drain(&mut rx), vec![TrackerEvent::SessionsRefreshed]);
}

#[tokio::test]
async fn adopts_session_started_elsewhere() {
    let h = harness(Duration::from_secs(60)).await;
    h.state.lock().unwrap().active =
        vec![record_json(777, "TE-9", "2025-03-10T10:00:00Z")];
    h.state.lock().unwrap().realized_ms = 42_000;
    let mut rx = h.bus.subscribe();

    let _ = h.reconciler.poll().await;

    let adopted = h.store.get_any_active().unwrap();
    assert_eq!(adopted.estimate_id, "TE-9");
    assert_eq!(adopted.record_id, 777);
    assert_eq!(drain(&mut rx), vec![TrackerEvent::SessionsRefreshed]);
    // poll also refreshed the realized value for the active key
    assert_eq!(h.realized.get(&adopted.realized_key()), 42_000);
}

#[tokio::test]
async fn replaces_store_when_server_disagrees() {
    let h = harness(Duration::from_secs(60)).await;
    h.store.set(local_session("TE-1"));
    h.state.lock().unwrap().active =
        vec![record_json(778, "TE-2", "2025-03-10T10:00:00Z")];

    let _ = h.reconciler.poll().await;

    assert!(h.store.get_active("TE-1").is_none());
    assert_eq!(h.store.get_any_active().unwrap().estimate_id, "TE-2");
}

#[tokio::test]
async fn matching_session_refreshes_silently() {
    let h = harness(Duration::from_secs(60)).await;
    h.store.set(local_session("TE-1"));
    // same estimate, newer record id (e.g. reopened server-side)
    h.state.lock().unwrap().active =
        vec![record_json(901, "TE-1", "2025-03-10T09:00:00Z")];
    let mut rx = h.bus.subscribe();

    let _ = h.reconciler.poll().await;

    assert_eq!(h.store.get_active("TE-1").unwrap().record_id, 901);
    // no event: nothing moved from the surfaces' point of view
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn keeps_most_recent_of_duplicate_server_sessions() {
    let h = harness(Duration::from_secs(60)).await;
    h.state.lock().unwrap().active = vec![
        record_json(1, "TE-old", "2025-03-10T08:00:00Z"),
        record_json(2, "TE-new", "2025-03-10T11:00:00Z"),
    ];

    let _ = h.reconciler.poll().await;

    // invariant guard: exactly one survives, the latest start wins
    let active = h.store.get_any_active().unwrap();
    assert_eq!(active.estimate_id, "TE-new");
    assert!(h.store.get_active("TE-old").is_none());
}

#[tokio::test]
async fn skips_records_without_estimate_id() {
    let h = harness(Duration::from_secs(60)).await;
    h.state.lock().unwrap().active = vec![json!({
        "id": 5,
        "tarefa_id": "T-1",
        "cliente_id": "C-1",
        "usuario_id": USER_ID,
        "data_inicio": "2025-03-10T08:00:00Z",
    })];

    assert!(h.reconciler.poll().await.is_continue());
    assert!(h.store.get_any_active().is_none());
}

#[tokio::test]
async fn transient_poll_failure_keeps_local_state() {
    let h = harness(Duration::from_secs(60)).await;
    h.store.set(local_session("TE-1"));
    h.state.lock().unwrap().fail_polls = true;
    let mut rx = h.bus.subscribe();

    assert!(h.reconciler.poll().await.is_continue());

    // no flicker: the session is still there, nothing was emitted
    assert!(h.store.get_active("TE-1").is_some());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn auth_expiry_discards_state_and_stops_polling() {
    let h = harness(Duration::from_secs(60)).await;
    h.store.set(local_session("TE-1"));
    h.realized
        .set(local_session("TE-1").realized_key(), 10_000);
    h.state.lock().unwrap().unauthorized = true;
    let mut rx = h.bus.subscribe();

    assert!(matches!(h.reconciler.poll().await, ControlFlow::Break(())));

    assert!(h.store.get_any_active().is_none());
    assert_eq!(h.realized.get(&local_session("TE-1").realized_key()), 0);
    assert_eq!(drain(&mut rx), vec![TrackerEvent::AuthExpired]);
}

#[tokio::test]
async fn local_events_trigger_an_immediate_poll() {
    // long interval so only the startup poll and the event-driven poll run
    let h = harness(Duration::from_secs(3600)).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let store = h.store.clone();
    let state = h.state.clone();
    let bus = h.bus.clone();

    let run = tokio::spawn(h.reconciler.run(shutdown_rx));

    // let the immediate startup tick pass with an empty server
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(store.get_any_active().is_none());

    // a session appears server-side; a local refresh request should pick
    // it up now, not an hour from now
    state.lock().unwrap().active =
        vec![record_json(777, "TE-9", "2025-03-10T10:00:00Z")];
    bus.emit(TrackerEvent::SessionsRefreshed);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.get_any_active().unwrap().estimate_id, "TE-9");

    let _ = shutdown_tx.send(true);
    run.await.unwrap();
}
