use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::info;

use tempo_core::Estimate;
use tempo_tracker::surfaces::{board_rows, header_snapshot};
use tempo_tracker::{Coordinator, SessionPhase, TrackerEvent};

use crate::commands::load_coordinator;

/// `ESTIMATE:TASK:CLIENT[:ESTIMATED_MINUTES]`
fn parse_row(spec: &str) -> Result<Estimate> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 3 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
        bail!("invalid row spec {spec:?}, expected ESTIMATE:TASK:CLIENT[:MINUTES]");
    }
    let estimated_ms = match parts.get(3) {
        Some(minutes) => {
            let minutes: u64 = minutes
                .parse()
                .with_context(|| format!("invalid minutes in row spec {spec:?}"))?;
            minutes * 60_000
        }
        None => 0,
    };
    Ok(Estimate {
        estimate_id: parts[0].to_string(),
        task_id: parts[1].to_string(),
        client_id: parts[2].to_string(),
        product_id: None,
        estimated_ms,
    })
}

pub async fn run_watch(row_specs: &[String]) -> Result<()> {
    let estimates: Vec<Estimate> = row_specs
        .iter()
        .map(|spec| parse_row(spec))
        .collect::<Result<_>>()?;

    let (coordinator, _config) = load_coordinator()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (reconciler_handle, ticker_handle) = coordinator.spawn_background(shutdown_rx);

    info!("watching; Ctrl-C to exit");
    let auth_expired = render_loop(&coordinator, &estimates).await;

    let _ = shutdown_tx.send(true);
    let _ = reconciler_handle.await;
    let _ = ticker_handle.await;

    if auth_expired {
        bail!("authentication expired; run `tempo config --api-key <KEY>` and retry");
    }
    Ok(())
}

/// Re-render both surfaces on every bus event and once a second for the
/// live clock. Returns true when the session ended because auth expired.
async fn render_loop(coordinator: &Coordinator, estimates: &[Estimate]) -> bool {
    let mut events = coordinator.bus.subscribe();
    let mut clock = tokio::time::interval(Duration::from_secs(1));
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        render(coordinator, estimates);

        tokio::select! {
            _ = clock.tick() => {}
            event = events.recv() => match event {
                Ok(TrackerEvent::AuthExpired) => return true,
                Err(broadcast::error::RecvError::Closed) => return false,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            },
            _ = &mut shutdown => return false,
        }
    }
}

fn render(coordinator: &Coordinator, estimates: &[Estimate]) {
    let now = Utc::now();

    match header_snapshot(&coordinator.store, now) {
        Some(header) => println!(
            "[{}] tracking {} (task {})",
            header.clock, header.estimate_id, header.task_id
        ),
        None => println!("[0:00:00] idle"),
    }

    for row in board_rows(
        estimates,
        &coordinator.store,
        &coordinator.realized,
        &coordinator.controller,
        now,
    ) {
        let control = match row.phase {
            SessionPhase::Idle => "play ",
            SessionPhase::Starting => "..   ",
            SessionPhase::Active => "stop ",
            SessionPhase::Stopping => "..   ",
        };
        let progress = if row.overrun {
            format!("{}% OVER", row.progress_pct)
        } else {
            format!("{}%", row.progress_pct)
        };
        println!(
            "  {control} {}  realized {}  {progress}{}",
            row.estimate_id,
            row.realized_clock,
            row.elapsed_clock
                .as_deref()
                .map(|clock| format!("  running {clock}"))
                .unwrap_or_default()
        );
    }
}

/// SIGTERM or SIGINT on unix, Ctrl-C elsewhere.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return std::future::pending::<()>().await,
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(_) => return std::future::pending::<()>().await,
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C");
    }
}
