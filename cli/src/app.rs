//! Command handlers: wire config, plugin services and the environment.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use vault_env_core::api::{
    CliError, ConfigSnapshot, EntitiesOutcome, EnvConfig, EnvError, Environment,
    HostPlatform, HostServicesFactory, InitReport, StateEvent,
};
use vault_env_core::import::CompanionBridge;
use vault_env_core::sync_gate::SyncGate;
use vault_env_plugins::chat::HostUiSlot;
use vault_env_plugins::config_source::FileConfigSource;
use vault_env_plugins::services::PluginServicesFactory;
use vault_env_plugins::{factory, vault};

use crate::commands::cli::RunArgs;

async fn build_environment(
    source: FileConfigSource,
    cfg: EnvConfig,
    platform: HostPlatform,
) -> Result<(Environment, Arc<HostUiSlot>), CliError> {
    let services = PluginServicesFactory::new(Arc::new(source)).with_platform(platform);
    let ui = services.ui();
    let host = services.build_services(&cfg).await?;
    let env = Environment::new(cfg, host);
    spawn_event_logger(env.subscribe());
    Ok((env, ui))
}

fn spawn_event_logger(mut event_rx: broadcast::Receiver<StateEvent>) {
    tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("state event logger lagged by {skipped}");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                StateEvent::PhaseChanged {
                    old_phase,
                    new_phase,
                    ..
                } => {
                    tracing::debug!("Environment {:?} -> {:?}", old_phase, new_phase);
                }
                StateEvent::EntitiesLoaded { generation, .. } => {
                    tracing::info!("Collections loaded (generation {})", generation);
                }
                StateEvent::EntitiesUnloaded { .. } => {
                    tracing::debug!("Collections unloaded");
                }
                StateEvent::ImportStarted { strategy, .. } => {
                    tracing::info!("Import started ({})", strategy);
                }
                StateEvent::ImportFinished {
                    strategy, outcome, ..
                } => {
                    tracing::info!("Import finished ({}): {}", strategy, outcome);
                }
                StateEvent::ChatReady { sessions, .. } => {
                    tracing::info!("Chat ready with {} saved sessions", sessions);
                }
            }
        }
    });
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Command(format!("serialize output failed: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Initialize, report the UI container once init is underway, and stay up
/// until Ctrl-C. Then save and unload.
#[tracing::instrument(name = "cli.run", skip_all)]
pub async fn run(
    source: FileConfigSource,
    cfg: EnvConfig,
    run_args: RunArgs,
) -> Result<i32, CliError> {
    let platform = HostPlatform {
        is_mobile: run_args.mobile,
    };
    let (env, ui) = build_environment(source, cfg, platform).await?;

    let init_env = env.clone();
    let mut init = tokio::spawn(async move { init_env.init().await });
    ui.set(run_args.ui_container.clone());

    let joined = tokio::select! {
        joined = &mut init => joined,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted during init, cancelling pending waits");
            env.cancel_pending();
            return match init.await {
                Ok(Err(EnvError::Wait(err))) => {
                    tracing::info!("init abandoned: {err}");
                    Ok(0)
                }
                Ok(Err(err)) => Err(err.into()),
                Ok(Ok(_)) => shutdown(&env).await,
                Err(e) => Err(CliError::Command(format!("init task failed: {e}"))),
            };
        }
    };
    let report = joined.map_err(|e| CliError::Command(format!("init task failed: {e}")))??;

    match report {
        InitReport::MobileDisabled => {
            tracing::warn!("environment is disabled on mobile hosts");
            return Ok(0);
        }
        InitReport::Ready {
            entities,
            import_started,
            chat_sessions,
        } => {
            tracing::info!(
                entities = ?entities,
                import_started = import_started,
                chat_sessions = chat_sessions,
                "environment ready, press Ctrl-C to stop"
            );
        }
    }

    tokio::signal::ctrl_c().await?;
    shutdown(&env).await
}

async fn shutdown(env: &Environment) -> Result<i32, CliError> {
    let report = env.save().await;
    env.unload().await?;
    log_save_report(&report.saved, &report.failed);
    Ok(if report.failed.is_empty() { 0 } else { 1 })
}

fn log_save_report(saved: &[String], failed: &[String]) {
    if failed.is_empty() {
        tracing::info!(saved = ?saved, "saved and unloaded");
    } else {
        tracing::warn!(saved = ?saved, failed = ?failed, "unloaded with unsaved collections");
    }
}

/// Probe the companion service and read the sync gate without initializing anything.
#[tracing::instrument(name = "cli.check", skip_all)]
pub async fn check(cfg: &EnvConfig) -> Result<i32, CliError> {
    let reachable = if cfg.companion.enabled {
        let request = factory::build_request(cfg)?;
        let bridge = CompanionBridge::new(
            request,
            &cfg.companion.base_url,
            Duration::from_millis(cfg.companion.probe_timeout_ms),
        );
        Some(bridge.probe().await)
    } else {
        None
    };

    let gate = SyncGate::new(factory::build_sync_status(cfg));
    let status = gate.status();

    print_json(&serde_json::json!({
        "vault_root": vault::vault_root(cfg).display().to_string(),
        "embed_model_key": cfg.embed_model_key,
        "companion": {
            "enabled": cfg.companion.enabled,
            "base_url": cfg.companion.base_url,
            "reachable": reachable,
        },
        "sync": {
            "status": format!("{status:?}"),
            "blocking": gate.is_blocking(),
        },
    }))?;
    Ok(0)
}

pub fn exclusions(cfg: EnvConfig) -> Result<i32, CliError> {
    let snapshot = ConfigSnapshot::new(cfg);
    let value = serde_json::to_value(snapshot.exclusions())
        .map_err(|e| CliError::Command(format!("serialize exclusions failed: {e}")))?;
    print_json(&value)?;
    Ok(0)
}

/// Load the collections, run the local import once, save and unload.
#[tracing::instrument(name = "cli.import", skip_all)]
pub async fn import(source: FileConfigSource, cfg: EnvConfig) -> Result<i32, CliError> {
    let (env, _ui) = build_environment(source, cfg, HostPlatform::default()).await?;

    env.init_chunker().await?;
    match env.init_entities().await? {
        EntitiesOutcome::Loaded { .. } => {}
        other => {
            return Err(CliError::Command(format!(
                "collections were not loaded: {other:?}"
            )))
        }
    }
    let pair = env
        .collections()
        .await
        .ok_or_else(|| CliError::Command("collections were not loaded".to_string()))?;

    let outcome = pair.sources().import().await?;
    let report = env.save().await;
    env.unload().await?;

    print_json(&serde_json::json!({
        "outcome": outcome.to_string(),
        "saved": report.saved,
        "failed": report.failed,
    }))?;
    Ok(if report.failed.is_empty() { 0 } else { 1 })
}
