use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vault_env_cli::app;
use vault_env_cli::commands::cli;
use vault_env_core::api::{CliError, ConfigSource, EnvError, LogRotation, LoggingConfig};
use vault_env_core::config::get_vault_env_data_dir;
use vault_env_plugins::config_source::FileConfigSource;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let source = FileConfigSource::new(args.config.clone()).with_vault_root(args.vault.clone());
    let cfg = source
        .current()
        .map_err(|e| CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    match args.command {
        cli::Commands::Run(run_args) => app::run(source, cfg, run_args).await,
        cli::Commands::Check => app::check(&cfg).await,
        cli::Commands::Exclusions => app::exclusions(cfg),
        cli::Commands::Import => app::import(source, cfg).await,
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 1: finished with unsaved collections (returned as a normal exit code)
    // 11: config error
    // 20: lifecycle transition / wait error
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Env(env) => match env {
            EnvError::Config(_) => 11,
            EnvError::Transition(_) | EnvError::Wait(_) => 20,
            EnvError::Collection { .. }
            | EnvError::EmbedModel { .. }
            | EnvError::Chat(_)
            | EnvError::Plugin(_) => 50,
        },
        CliError::Command(_) => 50,
        CliError::Io(_) => 50,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = log_dir(logging);
        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let appender = match logging.rotation {
            LogRotation::Never => tracing_appender::rolling::never(
                &dir,
                format!("vault-env.{}.log", std::process::id()),
            ),
            LogRotation::Hourly => tracing_appender::rolling::hourly(&dir, "vault-env.log"),
            LogRotation::Daily => tracing_appender::rolling::daily(&dir, "vault-env.log"),
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let ansi = logging
        .ansi
        .unwrap_or_else(|| atty::is(atty::Stream::Stderr));
    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_target(logging.targets)
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .with_target(logging.targets)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// `[logging].directory` with `~` expanded, else `~/.vault-env/logs`, else the OS temp dir.
fn log_dir(logging: &LoggingConfig) -> PathBuf {
    let configured = logging
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(dir) = configured {
        return PathBuf::from(shellexpand::tilde(dir).into_owned());
    }
    match get_vault_env_data_dir() {
        Ok(dir) => dir.join("logs"),
        Err(_) => std::env::temp_dir().join("vault-env"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_prefers_configured_directory() {
        let logging = LoggingConfig {
            directory: Some("  /var/log/vault-env ".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(log_dir(&logging), PathBuf::from("/var/log/vault-env"));
    }

    #[test]
    fn test_log_dir_defaults_under_data_dir() {
        let logging = LoggingConfig {
            directory: Some(String::new()),
            ..LoggingConfig::default()
        };
        let expected = get_vault_env_data_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|_| std::env::temp_dir().join("vault-env"));
        assert_eq!(log_dir(&logging), expected);
    }

    #[test]
    fn test_disabled_logging_installs_nothing() {
        let logging = LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        };
        assert!(init_tracing(&logging).is_ok());
    }
}
