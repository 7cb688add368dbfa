use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::realized::RealizedTimeCache;
use crate::store::SessionStore;

/// Advance the realized cache for the active session's key once per tick so
/// displayed totals keep moving between server refreshes.
///
/// The written value is advisory; reconciliation overwrites it with the
/// server's number on every poll. Elapsed-clock display does not go through
/// here at all; surfaces compute `now - started_at` at render time.
pub async fn run_ticker(
    store: Arc<SessionStore>,
    realized: Arc<RealizedTimeCache>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(tick);
    // Skip the immediate first tick: zero time has passed.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(active) = store.get_any_active() {
                    realized.tick(&active.realized_key(), tick.as_millis() as u64);
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("ticker shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempo_core::ActiveSession;

    fn session(estimate: &str) -> ActiveSession {
        ActiveSession {
            estimate_id: estimate.to_string(),
            record_id: 1,
            task_id: "t".to_string(),
            client_id: "c".to_string(),
            user_id: 7,
            started_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_only_while_a_session_is_active() {
        let store = Arc::new(SessionStore::new());
        let realized = Arc::new(RealizedTimeCache::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_ticker(
            store.clone(),
            realized.clone(),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        // Idle: nothing accumulates.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let active = session("e1");
        let key = active.realized_key();
        assert_eq!(realized.get(&key), 0);

        // Active: one tick per second.
        store.set(active);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        let ticked = realized.get(&key);
        assert!(ticked >= 3000, "expected >= 3000, got {ticked}");

        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
    }
}
