use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use tempo_api::{ActiveSession, Estimate, FinishTrackingRequest, StartTrackingRequest};
use tempo_api_client::{ApiError, TimeApi};

use crate::error::TrackerError;
use crate::events::{EventBus, TrackerEvent};
use crate::realized::RealizedTimeCache;
use crate::store::SessionStore;

/// Observable lifecycle of an estimate's tracking control.
///
/// `Starting` and `Stopping` cover the window where a request is in flight
/// and the control should render ghosted; the committed store only ever
/// holds `Active` sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Starting,
    Active,
    Stopping,
}

#[derive(Debug, Clone)]
enum InFlight {
    Starting(String),
    Stopping(String),
}

/// Start/stop state machine for the user's sessions.
///
/// All mutations are serialized behind one async lock: a `start` issued
/// while another `start`/`stop` is pending queues behind it instead of
/// racing it. That, plus stopping any other active session before a new
/// start, is what keeps the server from ever holding two active records
/// for the same user.
pub struct SessionController {
    api: Arc<TimeApi>,
    store: Arc<SessionStore>,
    realized: Arc<RealizedTimeCache>,
    bus: EventBus,
    user_id: i64,
    op_gate: tokio::sync::Mutex<()>,
    in_flight: RwLock<Option<InFlight>>,
}

impl SessionController {
    pub fn new(
        api: Arc<TimeApi>,
        store: Arc<SessionStore>,
        realized: Arc<RealizedTimeCache>,
        bus: EventBus,
        user_id: i64,
    ) -> Self {
        Self {
            api,
            store,
            realized,
            bus,
            user_id,
            op_gate: tokio::sync::Mutex::new(()),
            in_flight: RwLock::new(None),
        }
    }

    /// Phase of one estimate's control, for ghosting/labeling.
    pub fn phase(&self, estimate_id: &str) -> SessionPhase {
        let in_flight = self
            .in_flight
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match in_flight.as_ref() {
            Some(InFlight::Starting(id)) if id.as_str() == estimate_id => {
                return SessionPhase::Starting;
            }
            Some(InFlight::Stopping(id)) if id.as_str() == estimate_id => {
                return SessionPhase::Stopping;
            }
            _ => {}
        }
        drop(in_flight);
        if self.store.get_active(estimate_id).is_some() {
            SessionPhase::Active
        } else {
            SessionPhase::Idle
        }
    }

    /// Start tracking against `estimate`.
    ///
    /// No-op if that estimate is already active locally. If a *different*
    /// estimate is active, it is stopped (server-confirmed) before the
    /// start request is issued. On failure the store is left exactly as it
    /// was.
    pub async fn start(&self, estimate: &Estimate) -> Result<ActiveSession, TrackerError> {
        let _gate = self.op_gate.lock().await;

        if let Some(current) = self.store.get_active(&estimate.estimate_id) {
            debug!(
                "start({}): already active, returning current session",
                estimate.estimate_id
            );
            return Ok(current);
        }

        if let Some(other) = self.store.get_any_active() {
            info!(
                "start({}): stopping active session for {} first",
                estimate.estimate_id, other.estimate_id
            );
            self.finish_and_commit(&other).await?;
        }

        self.set_in_flight(InFlight::Starting(estimate.estimate_id.clone()));
        let result = self
            .api
            .start_tracking(&StartTrackingRequest::for_estimate(estimate, self.user_id))
            .await;
        self.clear_in_flight();

        let record = result.map_err(|e| self.map_api_error(e))?;
        let session = ActiveSession::try_from(record)?;
        self.store.set(session.clone());
        info!(
            "session started: estimate {} (record {})",
            session.estimate_id, session.record_id
        );
        self.bus.emit(TrackerEvent::SessionStarted {
            estimate_id: session.estimate_id.clone(),
        });
        Ok(session)
    }

    /// Stop the session tracked against `estimate_id`.
    ///
    /// Idempotent: with nothing active for that estimate this resolves as a
    /// no-op without touching the network or emitting events. On failure
    /// the store keeps the session: the UI continues to show it running,
    /// which is what the server believes too.
    pub async fn stop(&self, estimate_id: &str) -> Result<Option<ActiveSession>, TrackerError> {
        let _gate = self.op_gate.lock().await;

        let Some(session) = self.store.get_active(estimate_id) else {
            debug!("stop({estimate_id}): nothing active, no-op");
            return Ok(None);
        };

        self.finish_and_commit(&session).await?;
        Ok(Some(session))
    }

    /// Close `session` on the server and commit the result locally.
    /// Must be called with the operation gate held.
    async fn finish_and_commit(&self, session: &ActiveSession) -> Result<(), TrackerError> {
        self.set_in_flight(InFlight::Stopping(session.estimate_id.clone()));
        let result = self
            .api
            .finish_tracking(
                session.record_id,
                &FinishTrackingRequest {
                    task_id: session.task_id.clone(),
                    user_id: session.user_id,
                },
            )
            .await;
        self.clear_in_flight();

        result.map_err(|e| self.map_api_error(e))?;

        self.store.clear(&session.estimate_id);
        self.refresh_realized(session).await;
        info!(
            "session stopped: estimate {} (record {})",
            session.estimate_id, session.record_id
        );
        self.bus.emit(TrackerEvent::SessionStopped {
            estimate_id: session.estimate_id.clone(),
        });
        Ok(())
    }

    /// Pull the server-computed realized total for the stopped session's
    /// key, overwriting whatever the local ticks guessed. A failure here is
    /// transient; the next reconciliation poll corrects the cache.
    async fn refresh_realized(&self, session: &ActiveSession) {
        match self
            .api
            .realized(
                session.user_id,
                &session.task_id,
                &session.client_id,
                &session.estimate_id,
            )
            .await
        {
            Ok(ms) => self.realized.set(session.realized_key(), ms),
            Err(e) => warn!(
                "realized refresh failed for estimate {}: {e}",
                session.estimate_id
            ),
        }
    }

    fn map_api_error(&self, e: ApiError) -> TrackerError {
        match e {
            ApiError::AuthExpired => {
                warn!("authentication expired; discarding tracking state");
                self.store.clear_all();
                self.realized.clear_all();
                self.bus.emit(TrackerEvent::AuthExpired);
                TrackerError::AuthExpired
            }
            e if e.is_already_tracking() => {
                // The server already holds a record for this user (started
                // elsewhere, or a lost response). Adopt server truth
                // instead of fighting it.
                self.bus.emit(TrackerEvent::SessionsRefreshed);
                TrackerError::AlreadyTracking
            }
            e => TrackerError::Api(e),
        }
    }

    fn set_in_flight(&self, op: InFlight) {
        *self
            .in_flight
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(op);
    }

    fn clear_in_flight(&self) {
        *self
            .in_flight
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
