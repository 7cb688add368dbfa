use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use tempo_api_client::{retry, RetryConfig, TimeApi};
use tempo_core::clock::format_hms;
use tempo_core::Estimate;
use tempo_tracker::config::{load_config, save_config};
use tempo_tracker::{Coordinator, TrackerConfig};

pub fn build_api(config: &TrackerConfig) -> Result<Arc<TimeApi>> {
    let mut api = TimeApi::new(&config.server.url, config.request_timeout())
        .context("failed to create HTTP client")?;
    if !config.server.api_key.is_empty() {
        api.set_auth(config.server.api_key.clone());
    }
    Ok(Arc::new(api))
}

pub fn load_coordinator() -> Result<(Coordinator, TrackerConfig)> {
    let config = load_config().context("failed to load config")?;
    if config.identity.user_id == 0 {
        bail!("no user configured; run `tempo config --user-id <ID>` first");
    }
    let api = build_api(&config)?;
    Ok((Coordinator::new(api, config.clone()), config))
}

pub async fn run_status() -> Result<()> {
    let (coordinator, _config) = load_coordinator()?;
    let _ = coordinator.reconcile_once().await;

    match coordinator.store.get_any_active() {
        Some(session) => {
            let realized = coordinator.realized.get(&session.realized_key());
            println!(
                "tracking estimate {} (task {}, client {})",
                session.estimate_id, session.task_id, session.client_id
            );
            println!("  elapsed   {}", format_hms(session.elapsed_ms(Utc::now())));
            println!("  realized  {}", format_hms(realized));
        }
        None => println!("no active session"),
    }
    Ok(())
}

pub async fn run_start(
    estimate_id: String,
    task_id: String,
    client_id: String,
    product_id: Option<String>,
) -> Result<()> {
    let (coordinator, _config) = load_coordinator()?;
    // populate the store first so an already-running session gets stopped
    // instead of bouncing off the server's conflict check
    let _ = coordinator.reconcile_once().await;

    let estimate = Estimate {
        estimate_id,
        task_id,
        client_id,
        product_id,
        estimated_ms: 0,
    };
    let session = coordinator.controller.start(&estimate).await?;
    println!(
        "started estimate {} (record {})",
        session.estimate_id, session.record_id
    );
    Ok(())
}

pub async fn run_stop(estimate_id: Option<String>) -> Result<()> {
    let (coordinator, _config) = load_coordinator()?;
    let _ = coordinator.reconcile_once().await;

    let target = match estimate_id {
        Some(id) => Some(id),
        None => coordinator
            .store
            .get_any_active()
            .map(|session| session.estimate_id),
    };
    let Some(estimate_id) = target else {
        println!("no active session");
        return Ok(());
    };

    match coordinator.controller.stop(&estimate_id).await? {
        Some(session) => {
            let realized = coordinator.realized.get(&session.realized_key());
            println!(
                "stopped estimate {}, realized {}",
                session.estimate_id,
                format_hms(realized)
            );
        }
        None => println!("estimate {estimate_id} was not being tracked"),
    }
    Ok(())
}

pub async fn run_history(estimate_id: &str) -> Result<()> {
    let config = load_config().context("failed to load config")?;
    let api = build_api(&config)?;

    let entries = retry::with_backoff("history", &RetryConfig::default(), || {
        api.history_for_estimate(estimate_id)
    })
    .await?;

    if entries.is_empty() {
        println!("no sessions recorded for estimate {estimate_id}");
        return Ok(());
    }
    for entry in entries {
        let duration = entry
            .duration_ms
            .map(format_hms)
            .unwrap_or_else(|| "running".to_string());
        println!(
            "{}  {}  {}",
            entry.started_at.format("%Y-%m-%d %H:%M"),
            duration,
            entry
                .finished_at
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default()
        );
    }
    Ok(())
}

pub fn run_config(
    server: Option<String>,
    api_key: Option<String>,
    user_id: Option<i64>,
) -> Result<()> {
    let mut config = load_config().context("failed to load config")?;

    if server.is_none() && api_key.is_none() && user_id.is_none() {
        println!("server   {}", config.server.url);
        println!(
            "api_key  {}",
            if config.server.api_key.is_empty() {
                "(unset)"
            } else {
                "(set)"
            }
        );
        println!("user_id  {}", config.identity.user_id);
        println!("poll     {}s", config.tracker.poll_interval_secs);
        return Ok(());
    }

    if let Some(url) = server {
        config.server.url = url;
    }
    if let Some(key) = api_key {
        config.server.api_key = key;
    }
    if let Some(id) = user_id {
        config.identity.user_id = id;
    }
    save_config(&config).context("failed to save config")?;
    println!("config saved");
    Ok(())
}
