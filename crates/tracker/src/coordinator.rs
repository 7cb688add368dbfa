use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tempo_api_client::TimeApi;

use crate::config::TrackerConfig;
use crate::controller::SessionController;
use crate::events::EventBus;
use crate::realized::RealizedTimeCache;
use crate::reconciler::Reconciler;
use crate::store::SessionStore;
use crate::ticker;

/// Wires the stores, controller and background loops for one authenticated
/// user. Created after login, torn down (via the shutdown channel) on
/// logout. Nothing here is process-global.
pub struct Coordinator {
    pub store: Arc<SessionStore>,
    pub realized: Arc<RealizedTimeCache>,
    pub bus: EventBus,
    pub controller: Arc<SessionController>,
    api: Arc<TimeApi>,
    config: TrackerConfig,
}

impl Coordinator {
    pub fn new(api: Arc<TimeApi>, config: TrackerConfig) -> Self {
        let store = Arc::new(SessionStore::new());
        let realized = Arc::new(RealizedTimeCache::new());
        let bus = EventBus::new(config.tracker.event_capacity);
        let controller = Arc::new(SessionController::new(
            api.clone(),
            store.clone(),
            realized.clone(),
            bus.clone(),
            config.identity.user_id,
        ));
        Self {
            store,
            realized,
            bus,
            controller,
            api,
            config,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.config.identity.user_id
    }

    /// One reconciliation pass, for one-shot commands that need the store
    /// populated with server truth before acting on it.
    pub async fn reconcile_once(&self) -> std::ops::ControlFlow<()> {
        self.make_reconciler().poll().await
    }

    fn make_reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.api.clone(),
            self.store.clone(),
            self.realized.clone(),
            self.bus.clone(),
            self.config.identity.user_id,
            self.config.poll_interval(),
        )
    }

    /// Spawn the reconciliation poll loop and the per-second ticker. Both
    /// exit when `true` is sent on the shutdown channel; the caller should
    /// await the handles to finish teardown.
    pub fn spawn_background(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> (JoinHandle<()>, JoinHandle<()>) {
        let reconciler_handle = tokio::spawn(self.make_reconciler().run(shutdown.clone()));

        let ticker_handle = tokio::spawn(ticker::run_ticker(
            self.store.clone(),
            self.realized.clone(),
            self.config.tick_interval(),
            shutdown,
        ));

        (reconciler_handle, ticker_handle)
    }
}
