//! Background refresh jobs
//!
//! One tokio task per (project_id, env_id). Each task re-runs the validator on
//! its configuration at a fixed period and records the latest outcome.

use super::types::{ConfigKey, OAuthConfig, TokenPayload};
use super::validator::TokenEndpointValidator;
use crate::config::RefreshConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Scheduling seam used by the save path
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Schedule recurring refresh for `config`, replacing any job with the same key
    async fn add_or_replace_job(&self, config: &OAuthConfig) -> Result<()>;

    /// Cancel the job for `config`'s key; a no-op when none exists
    async fn remove_job(&self, config: &OAuthConfig) -> Result<()>;

    /// Latest run information for a key, if a job is scheduled
    async fn job_status(&self, key: &ConfigKey) -> Option<JobStatus>;
}

/// Observable state of one refresh job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub project_id: String,
    pub env_id: String,
    pub interval_seconds: u64,
    pub scheduled_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_token: Option<TokenPayload>,
    pub runs: u64,
    pub failures: u64,
}

impl JobStatus {
    fn new(key: &ConfigKey, period: Duration) -> Self {
        Self {
            project_id: key.project_id.clone(),
            env_id: key.env_id.clone(),
            interval_seconds: period.as_secs(),
            scheduled_at: Utc::now(),
            last_run_at: None,
            last_success_at: None,
            last_error: None,
            last_token: None,
            runs: 0,
            failures: 0,
        }
    }
}

struct RefreshJob {
    handle: JoinHandle<()>,
    status: Arc<RwLock<JobStatus>>,
}

/// Tokio-task based [`JobScheduler`]
pub struct RefreshScheduler {
    validator: TokenEndpointValidator,
    refresh_config: RefreshConfig,
    jobs: Mutex<HashMap<ConfigKey, RefreshJob>>,
}

impl RefreshScheduler {
    pub fn new(validator: TokenEndpointValidator, refresh_config: RefreshConfig) -> Self {
        Self {
            validator,
            refresh_config,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Refresh period for a configuration
    pub fn period_for(&self, config: &OAuthConfig) -> Duration {
        match config.token_valid_hour {
            Some(hours) if hours > 0 => Duration::from_secs(u64::from(hours) * 3600),
            _ => self.refresh_config.default_interval(),
        }
    }

    /// Number of scheduled jobs
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Abort every job
    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.lock().await;
        for (key, job) in jobs.drain() {
            job.handle.abort();
            debug!("Stopped refresh job {}", key);
        }
        info!("Refresh scheduler stopped");
    }

    async fn run_job(
        validator: TokenEndpointValidator,
        config: OAuthConfig,
        period: Duration,
        status: Arc<RwLock<JobStatus>>,
    ) {
        let key = config.key();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = Utc::now();
            let outcome = validator.validate(&config.request, now).await;

            let mut status = status.write().await;
            status.runs += 1;
            status.last_run_at = Some(now);
            match outcome {
                Ok(payload) => {
                    debug!("Refreshed token for {}", key);
                    status.last_success_at = Some(now);
                    status.last_error = None;
                    status.last_token = Some(payload);
                }
                Err(e) => {
                    warn!("Token refresh for {} failed: {}", key, e);
                    status.failures += 1;
                    status.last_error = Some(e.to_string());
                }
            }
        }
    }
}

#[async_trait]
impl JobScheduler for RefreshScheduler {
    async fn add_or_replace_job(&self, config: &OAuthConfig) -> Result<()> {
        let key = config.key();
        if !self.refresh_config.enabled {
            debug!("Refresh disabled, not scheduling {}", key);
            return Ok(());
        }

        let period = self.period_for(config);
        let status = Arc::new(RwLock::new(JobStatus::new(&key, period)));
        let handle = tokio::spawn(Self::run_job(
            self.validator.clone(),
            config.clone(),
            period,
            Arc::clone(&status),
        ));

        let mut jobs = self.jobs.lock().await;
        if let Some(previous) = jobs.insert(key.clone(), RefreshJob { handle, status }) {
            previous.handle.abort();
            info!("Replaced refresh job {} (every {:?})", key, period);
        } else {
            info!("Scheduled refresh job {} (every {:?})", key, period);
        }
        Ok(())
    }

    async fn remove_job(&self, config: &OAuthConfig) -> Result<()> {
        let key = config.key();
        match self.jobs.lock().await.remove(&key) {
            Some(job) => {
                job.handle.abort();
                info!("Removed refresh job {}", key);
            }
            None => debug!("No refresh job for {}", key),
        }
        Ok(())
    }

    async fn job_status(&self, key: &ConfigKey) -> Option<JobStatus> {
        let status = {
            let jobs = self.jobs.lock().await;
            jobs.get(key).map(|job| Arc::clone(&job.status))
        }?;
        let snapshot = status.read().await.clone();
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpClientConfig;
    use crate::oauth::template::PlaceholderMode;

    fn scheduler(enabled: bool) -> RefreshScheduler {
        let http = HttpClientConfig {
            timeout_seconds: 2,
            ..Default::default()
        };
        let validator = TokenEndpointValidator::new(&http, PlaceholderMode::First).unwrap();
        let refresh = RefreshConfig {
            enabled,
            ..Default::default()
        };
        RefreshScheduler::new(validator, refresh)
    }

    fn unreachable_config(env_id: &str) -> OAuthConfig {
        let mut config = OAuthConfig {
            project_id: "p1".to_string(),
            env_id: env_id.to_string(),
            is_oauth_open: true,
            ..Default::default()
        };
        config.request.url = "http://127.0.0.1:1/token".to_string();
        config
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one_job() {
        let scheduler = scheduler(true);
        let config = unreachable_config("e1");

        scheduler.add_or_replace_job(&config).await.unwrap();
        scheduler.add_or_replace_job(&config).await.unwrap();
        assert_eq!(scheduler.job_count().await, 1);

        scheduler.shutdown().await;
        assert_eq!(scheduler.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_missing_job_is_noop() {
        let scheduler = scheduler(true);
        scheduler.remove_job(&unreachable_config("e1")).await.unwrap();
        assert_eq!(scheduler.job_count().await, 0);

        scheduler.add_or_replace_job(&unreachable_config("e1")).await.unwrap();
        scheduler.remove_job(&unreachable_config("e1")).await.unwrap();
        assert_eq!(scheduler.job_count().await, 0);
        assert!(scheduler.job_status(&ConfigKey::new("p1", "e1")).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_refresh_schedules_nothing() {
        let scheduler = scheduler(false);
        scheduler.add_or_replace_job(&unreachable_config("e1")).await.unwrap();
        assert_eq!(scheduler.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_period_uses_token_valid_hour() {
        let scheduler = scheduler(true);
        let mut config = unreachable_config("e1");
        assert_eq!(scheduler.period_for(&config), Duration::from_secs(3600));

        config.token_valid_hour = Some(2);
        assert_eq!(scheduler.period_for(&config), Duration::from_secs(7200));

        config.token_valid_hour = Some(0);
        assert_eq!(scheduler.period_for(&config), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_first_run_records_failure() {
        let scheduler = scheduler(true);
        scheduler.add_or_replace_job(&unreachable_config("e1")).await.unwrap();
        let key = ConfigKey::new("p1", "e1");

        let mut status = None;
        for _ in 0..100 {
            let current = scheduler.job_status(&key).await.unwrap();
            if current.runs > 0 {
                status = Some(current);
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let status = status.expect("job should have run once");
        assert_eq!(status.failures, 1);
        assert!(status.last_error.is_some());
        assert!(status.last_token.is_none());
        scheduler.shutdown().await;
    }
}
