//! API Failover
//!
//! Diagnostic CLI for the credential pool: shows how configured credentials
//! rotate under consecutive failures, and how validation notices behave
//! under the configured strict mode.

use anyhow::{Context, Result};
use api_failover::{validation, Settings};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// API Failover
///
/// Inspect credential rotation and validation behavior.
#[derive(Parser, Debug)]
#[command(name = "api-failover")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable strict mode (overrides STRICT_MODE env var)
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate consecutive failures and print each credential swap as JSON
    Rotate {
        /// Number of consecutive failures to simulate
        #[arg(short, long, default_value_t = 3)]
        failures: u32,
    },
    /// Run a validation notice under the configured strict mode
    Warn {
        /// Message to report
        message: String,
    },
}

#[derive(Serialize)]
struct RotationStep {
    step: u32,
    credential: String,
    /// Backoff sleep before this attempt
    delay_ms: u64,
    active: usize,
    awaiting: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load().context("Failed to load settings")?;

    // Override settings with CLI arguments
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if args.strict {
        settings.strict_mode = true;
    }

    init_tracing(&settings.log_level);

    tracing::debug!(
        app_name = %settings.app_name,
        strict_mode = settings.strict_mode,
        credentials = settings.credentials.len(),
        "Settings loaded"
    );

    match args.command {
        Command::Rotate { failures } => rotate(&settings, failures),
        Command::Warn { message } => {
            validation::warning(&settings, &message)?;
            Ok(())
        }
    }
}

fn rotate(settings: &Settings, failures: u32) -> Result<()> {
    for line in rotation_report(settings, failures)? {
        println!("{}", line);
    }
    Ok(())
}

/// One JSON line per simulated attempt, then the final pool stats
fn rotation_report(settings: &Settings, failures: u32) -> Result<Vec<String>> {
    let pool = settings.api_pool();
    let retry = settings.retry.to_config()?;
    let mut delay = Duration::ZERO;
    let mut lines = Vec::new();

    for step in 0..=failures {
        let current = pool
            .get_current()
            .context("No credentials to rotate; set API_CREDENTIALS or API_KEYS")?;
        let stats = pool.stats();

        let line = RotationStep {
            step,
            credential: current.name().to_string(),
            delay_ms: delay.as_millis() as u64,
            active: stats.active,
            awaiting: stats.awaiting,
        };
        lines.push(serde_json::to_string(&line)?);

        if step < failures {
            pool.demote(&current);
            delay = if step == 0 {
                retry.initial_delay
            } else {
                retry.next_delay(delay)
            };
        }
    }

    lines.push(serde_json::to_string(&pool.stats())?);
    Ok(lines)
}

/// Initialize tracing subscriber with the specified log level
fn init_tracing(log_level: &str) {
    // Build filter from RUST_LOG env var or use provided log level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // Logs go to stderr so stdout stays machine-readable
    let console_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_failover::PoolStats;
    use api_failover::config::RetrySettings;
    use api_failover::services::ApiKeyCredentialConfig;

    fn settings_with_keys(keys: &[&str]) -> Settings {
        Settings {
            retry: RetrySettings {
                delay_ms: 100,
                ..Default::default()
            },
            credentials: keys
                .iter()
                .enumerate()
                .map(|(i, key)| ApiKeyCredentialConfig {
                    api_key: key.to_string(),
                    name: format!("key-{}", i),
                    base_url: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rotation_report_ends_with_final_stats() {
        let lines = rotation_report(&settings_with_keys(&["k1", "k2", "k3"]), 2).unwrap();

        // three attempts plus the final stats line
        assert_eq!(lines.len(), 4);

        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["credential"], "key-0");
        assert_eq!(first["delay_ms"], 0);

        let last_step: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(last_step["credential"], "key-2");
        assert_eq!(last_step["delay_ms"], 200);

        let stats: serde_json::Value = serde_json::from_str(&lines[3]).unwrap();
        assert_eq!(stats, serde_json::to_value(PoolStats { active: 1, awaiting: 2 }).unwrap());
    }

    #[test]
    fn test_rotation_report_without_credentials_fails() {
        assert!(rotation_report(&settings_with_keys(&[]), 1).is_err());
    }
}
