use chrono::{DateTime, Utc};

use tempo_core::clock::{format_hms, is_overrun, progress_percent};
use tempo_core::Estimate;

use crate::controller::{SessionController, SessionPhase};
use crate::realized::RealizedTimeCache;
use crate::store::SessionStore;

/// One estimate row on the task board: play/stop control state, realized
/// total and progress against the estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    pub estimate_id: String,
    pub phase: SessionPhase,
    /// Cumulative realized for the tuple (server value plus local ticks
    /// while running)
    pub realized_ms: u64,
    pub realized_clock: String,
    /// Live clock of the running session, `None` when this row is idle
    pub elapsed_clock: Option<String>,
    /// 0–100, against `estimated_ms`
    pub progress_pct: u8,
    pub overrun: bool,
}

/// Derive the board rows for a set of estimates. Pure: reads the stores,
/// mutates nothing.
pub fn board_rows(
    estimates: &[Estimate],
    store: &SessionStore,
    realized: &RealizedTimeCache,
    controller: &SessionController,
    now: DateTime<Utc>,
) -> Vec<BoardRow> {
    estimates
        .iter()
        .map(|estimate| board_row(estimate, store, realized, controller, now))
        .collect()
}

pub fn board_row(
    estimate: &Estimate,
    store: &SessionStore,
    realized: &RealizedTimeCache,
    controller: &SessionController,
    now: DateTime<Utc>,
) -> BoardRow {
    let phase = controller.phase(&estimate.estimate_id);
    let realized_ms = realized.get(&estimate.realized_key());
    let elapsed_clock = store
        .get_active(&estimate.estimate_id)
        .map(|session| format_hms(session.elapsed_ms(now)));

    BoardRow {
        estimate_id: estimate.estimate_id.clone(),
        phase,
        realized_ms,
        realized_clock: format_hms(realized_ms),
        elapsed_clock,
        progress_pct: progress_percent(realized_ms, estimate.estimated_ms),
        overrun: is_overrun(realized_ms, estimate.estimated_ms),
    }
}
