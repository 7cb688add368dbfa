use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A running work session against one estimate.
///
/// Sessions are keyed by `estimate_id` everywhere in the client: that is the
/// identity of the unit of estimated work the user pressed play on.
/// `record_id` is only the server row backing it and is needed again solely
/// to finish the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveSession {
    /// Estimate the session is tracked against (stable lookup key)
    pub estimate_id: String,
    /// Server-assigned id of the underlying time record
    pub record_id: i64,
    pub task_id: String,
    pub client_id: String,
    pub user_id: i64,
    /// Server-issued start timestamp
    pub started_at: DateTime<Utc>,
}

impl ActiveSession {
    /// Milliseconds elapsed since the session started, clamped at zero so a
    /// small client/server clock skew never renders a negative timer.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn realized_key(&self) -> RealizedKey {
        RealizedKey {
            client_id: self.client_id.clone(),
            task_id: self.task_id.clone(),
            estimate_id: self.estimate_id.clone(),
        }
    }
}

/// The planned unit of work a start/stop control belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Estimate {
    pub estimate_id: String,
    pub task_id: String,
    pub client_id: String,
    /// Optional product the task is billed under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Planned time in milliseconds; 0 = no estimate recorded
    #[serde(default)]
    pub estimated_ms: u64,
}

impl Estimate {
    pub fn realized_key(&self) -> RealizedKey {
        RealizedKey {
            client_id: self.client_id.clone(),
            task_id: self.task_id.clone(),
            estimate_id: self.estimate_id.clone(),
        }
    }
}

/// Key under which cumulative realized time is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RealizedKey {
    pub client_id: String,
    pub task_id: String,
    pub estimate_id: String,
}
