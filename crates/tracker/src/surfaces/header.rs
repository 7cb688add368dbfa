use chrono::{DateTime, Utc};

use tempo_core::clock::format_hms;

use crate::store::SessionStore;

/// The persistent compact widget: whichever session is running, regardless
/// of estimate, with a live clock. `None` while idle, so the widget hides
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSnapshot {
    pub estimate_id: String,
    pub task_id: String,
    pub elapsed_ms: u64,
    /// `H:MM:SS`
    pub clock: String,
}

pub fn header_snapshot(store: &SessionStore, now: DateTime<Utc>) -> Option<HeaderSnapshot> {
    let session = store.get_any_active()?;
    let elapsed_ms = session.elapsed_ms(now);
    Some(HeaderSnapshot {
        estimate_id: session.estimate_id,
        task_id: session.task_id,
        elapsed_ms,
        clock: format_hms(elapsed_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempo_core::ActiveSession;

    #[test]
    fn hidden_while_idle() {
        let store = SessionStore::new();
        assert!(header_snapshot(&store, Utc::now()).is_none());
    }

    #[test]
    fn clock_tracks_elapsed_time() {
        let store = SessionStore::new();
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        store.set(ActiveSession {
            estimate_id: "TE-51".to_string(),
            record_id: 981,
            task_id: "T-14".to_string(),
            client_id: "ACME".to_string(),
            user_id: 7,
            started_at: start,
        });

        let snap = header_snapshot(&store, start + chrono::Duration::seconds(90)).unwrap();
        assert_eq!(snap.estimate_id, "TE-51");
        assert_eq!(snap.clock, "0:01:30");

        // successive ticks never run backwards
        let later = header_snapshot(&store, start + chrono::Duration::seconds(91)).unwrap();
        assert!(later.elapsed_ms > snap.elapsed_ms);
    }
}
