/// Reminder dispatcher loop
///
/// Runs [`dispatch_due_reminders`] on a fixed interval until its shutdown
/// token is cancelled. A failed pass is logged and retried on the next tick;
/// reminders it claimed stay unsent because the pass rolled back.
///
/// # Example
///
/// ```no_run
/// use peerlearn_worker::dispatcher::{ReminderDispatcher, WorkerConfig};
/// use peerlearn_shared::realtime::RealtimeHub;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let dispatcher = ReminderDispatcher::new(pool, RealtimeHub::new(), WorkerConfig::from_env()?);
///
/// let token = dispatcher.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     token.cancel();
/// });
///
/// dispatcher.run().await?;
/// # Ok(())
/// # }
/// ```

use peerlearn_shared::realtime::RealtimeHub;
use peerlearn_shared::reminders::{dispatch_due_reminders, DEFAULT_BATCH_SIZE};
use sqlx::PgPool;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default seconds between passes
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be a positive integer, got '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Seconds between reminder passes
    pub poll_interval_secs: u64,

    /// Reminders claimed per pass
    pub batch_size: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            database_url: String::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl WorkerConfig {
    /// Reads `DATABASE_URL`, `REMINDER_POLL_INTERVAL_SECS` and
    /// `REMINDER_BATCH_SIZE` from the environment (and `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let positive = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::Invalid { name, value }),
                },
            }
        };

        let poll_interval_secs = positive("REMINDER_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let batch_size = positive("REMINDER_BATCH_SIZE", DEFAULT_BATCH_SIZE as u64)?;
        let batch_size = i64::try_from(batch_size).map_err(|_| ConfigError::Invalid {
            name: "REMINDER_BATCH_SIZE",
            value: batch_size.to_string(),
        })?;

        Ok(WorkerConfig {
            database_url,
            poll_interval_secs,
            batch_size,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Periodic reminder dispatcher
pub struct ReminderDispatcher {
    pool: PgPool,
    hub: RealtimeHub,
    config: WorkerConfig,
    shutdown_token: CancellationToken,
}

impl ReminderDispatcher {
    pub fn new(pool: PgPool, hub: RealtimeHub, config: WorkerConfig) -> Self {
        ReminderDispatcher {
            pool,
            hub,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs a single pass; returns the number of reminders sent
    pub async fn run_once(&self) -> Result<usize, sqlx::Error> {
        dispatch_due_reminders(&self.pool, &self.hub, self.config.batch_size).await
    }

    /// Runs passes until shutdown
    ///
    /// The first pass starts immediately. Ticks missed during a slow pass
    /// are skipped rather than replayed.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "Reminder dispatcher starting"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut total: usize = 0;
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_token.cancelled() => break,

                _ = interval.tick() => match self.run_once().await {
                    Ok(0) => {}
                    Ok(sent) => {
                        total += sent;
                        tracing::debug!(sent, total, "Reminder pass complete");
                    }
                    Err(e) => tracing::error!(error = %e, "Reminder pass failed"),
                },
            }
        }

        tracing::info!(total, "Reminder dispatcher shut down");
        Ok(())
    }
}
