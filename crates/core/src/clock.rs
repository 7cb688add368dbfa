//! Display math for timers and progress bars.

/// Format milliseconds as `H:MM:SS`: hours unpadded, minutes and seconds
/// two-digit. `0` renders as `0:00:00`.
pub fn format_hms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Progress of realized time against an estimate, as a whole percentage
/// capped at 100. An estimate of 0 means "no estimate" and reports 0.
pub fn progress_percent(realized_ms: u64, estimated_ms: u64) -> u8 {
    if estimated_ms == 0 {
        return 0;
    }
    let pct = realized_ms.saturating_mul(100) / estimated_ms;
    pct.min(100) as u8
}

/// Whether realized time has exceeded the estimate. Never true without an
/// estimate.
pub fn is_overrun(realized_ms: u64, estimated_ms: u64) -> bool {
    estimated_ms > 0 && realized_ms > estimated_ms
}
