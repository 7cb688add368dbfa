use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use tempo_api::{ActiveSession, TimeRecord};
use tempo_api_client::{ApiError, TimeApi};

use crate::events::{EventBus, TrackerEvent};
use crate::realized::RealizedTimeCache;
use crate::store::SessionStore;

/// Converges local belief about active sessions to server truth.
///
/// Polls on a fixed interval and immediately after any local start/stop so
/// a change never waits for the next tick. The server is authoritative:
/// sessions started or stopped from another device/tab replace or clear
/// whatever the store holds. Transient poll failures keep local state
/// untouched, so a dropped request never causes flicker.
pub struct Reconciler {
    api: Arc<TimeApi>,
    store: Arc<SessionStore>,
    realized: Arc<RealizedTimeCache>,
    bus: EventBus,
    user_id: i64,
    poll_interval: Duration,
}

impl Reconciler {
    pub fn new(
        api: Arc<TimeApi>,
        store: Arc<SessionStore>,
        realized: Arc<RealizedTimeCache>,
        bus: EventBus,
        user_id: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            store,
            realized,
            bus,
            user_id,
            poll_interval,
        }
    }

    /// Run until shutdown, auth expiry, or the bus closing.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.bus.subscribe();
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.poll().await.is_break() {
                        break;
                    }
                }

                event = events.recv() => match event {
                    Ok(TrackerEvent::AuthExpired) => {
                        debug!("reconciler stopping: auth expired");
                        break;
                    }
                    // A local action or refresh request: re-pull server
                    // state now instead of waiting out the interval.
                    Ok(_) => {
                        if self.poll().await.is_break() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("reconciler lagged {skipped} events; next poll resyncs");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("reconciler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One reconciliation pass. `Break` means the loop must stop
    /// (authentication expired).
    pub async fn poll(&self) -> ControlFlow<()> {
        let records = match self.api.active_for_user(self.user_id).await {
            Ok(records) => records,
            Err(ApiError::AuthExpired) => {
                warn!("poll: authentication expired; discarding tracking state");
                self.store.clear_all();
                self.realized.clear_all();
                self.bus.emit(TrackerEvent::AuthExpired);
                return ControlFlow::Break(());
            }
            Err(e) => {
                // Transient: retried on the next tick, local state kept.
                warn!("poll failed ({e}); keeping local state");
                return ControlFlow::Continue(());
            }
        };

        self.merge(records);

        if let Some(active) = self.store.get_any_active() {
            self.refresh_realized(&active).await;
        }

        ControlFlow::Continue(())
    }

    /// Fold the server's report into the store. Server wins.
    fn merge(&self, records: Vec<TimeRecord>) {
        let mut sessions: Vec<ActiveSession> = records
            .into_iter()
            .filter_map(|record| match ActiveSession::try_from(record) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!("poll: skipping unusable record ({e})");
                    None
                }
            })
            .collect();

        if sessions.len() > 1 {
            // One active session per user is a server invariant; if it
            // breaks upstream, keep the most recently started and say so.
            warn!(
                "server reports {} active sessions for user {}; keeping the most recent",
                sessions.len(),
                self.user_id
            );
            sessions.sort_by_key(|s| s.started_at);
        }
        let server = sessions.pop();
        let local = self.store.get_any_active();

        match (server, local) {
            (Some(server), Some(local)) if server.estimate_id == local.estimate_id => {
                // Same session; refresh fields silently so nothing flickers.
                if server != local {
                    self.store.set(server);
                }
            }
            (Some(server), _) => {
                debug!(
                    "adopting server session for estimate {}",
                    server.estimate_id
                );
                self.store.set(server);
                self.bus.emit(TrackerEvent::SessionsRefreshed);
            }
            (None, Some(local)) => {
                // Stopped or expired elsewhere.
                debug!(
                    "server reports no active session; clearing estimate {}",
                    local.estimate_id
                );
                self.store.clear_all();
                self.bus.emit(TrackerEvent::SessionsRefreshed);
            }
            (None, None) => {}
        }
    }

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
            Err(e) => debug!(
                "realized refresh failed for estimate {} ({e}); ticks carry on",
                session.estimate_id
            ),
        }
    }
}
