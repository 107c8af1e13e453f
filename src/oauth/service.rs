//! OAuth configuration service
//!
//! Identifier checks, the persist-then-schedule save path, lookups, and
//! one-shot validation of candidate configurations.

use super::scheduler::{JobScheduler, JobStatus};
use super::store::OAuthStore;
use super::types::{ConfigKey, OAuthConfig, StoredConfig, TokenPayload, TokenRequestSpec};
use super::validator::TokenEndpointValidator;
use crate::error::{Result, SyncError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct OAuthService {
    store: Arc<dyn OAuthStore>,
    scheduler: Arc<dyn JobScheduler>,
    validator: TokenEndpointValidator,
}

impl OAuthService {
    pub fn new(
        store: Arc<dyn OAuthStore>,
        scheduler: Arc<dyn JobScheduler>,
        validator: TokenEndpointValidator,
    ) -> Self {
        Self {
            store,
            scheduler,
            validator,
        }
    }

    /// Upsert a configuration, then add or remove its refresh job.
    ///
    /// A scheduling failure is logged and leaves the record saved but unscheduled.
    pub async fn save(&self, config: OAuthConfig) -> Result<StoredConfig> {
        let project_id = require(Some(config.project_id.as_str()), "project_id")?.to_string();
        let env_id = require(Some(config.env_id.as_str()), "env_id")?.to_string();

        let stored = self.store.upsert(&project_id, &env_id, config).await?;
        info!("Saved OAuth configuration {}", stored.key());

        let scheduled = if stored.config.is_oauth_open {
            self.scheduler.add_or_replace_job(&stored.config).await
        } else {
            self.scheduler.remove_job(&stored.config).await
        };
        if let Err(e) = scheduled {
            warn!(
                "OAuth configuration {} saved but refresh job update failed: {}",
                stored.key(),
                e
            );
        }

        Ok(stored)
    }

    pub async fn get(&self, project_id: Option<&str>, env_id: Option<&str>) -> Result<Option<StoredConfig>> {
        let project_id = require(project_id, "project_id")?;
        let env_id = require(env_id, "env_id")?;
        self.store.get_by_project_and_env(project_id, env_id).await
    }

    pub async fn list(&self, project_id: Option<&str>) -> Result<Vec<StoredConfig>> {
        let project_id = require(project_id, "project_id")?;
        self.store.list_by_project(project_id).await
    }

    /// Probe the token endpoint described by `spec` once; nothing is persisted
    pub async fn validate(&self, spec: &TokenRequestSpec) -> Result<TokenPayload> {
        self.validator.validate(spec, Utc::now()).await
    }

    pub async fn job_status(&self, project_id: Option<&str>, env_id: Option<&str>) -> Result<Option<JobStatus>> {
        let project_id = require(project_id, "project_id")?;
        let env_id = require(env_id, "env_id")?;
        Ok(self.scheduler.job_status(&ConfigKey::new(project_id, env_id)).await)
    }

    /// Schedule a refresh job for every open configuration in storage
    pub async fn schedule_stored(&self) -> Result<usize> {
        let mut scheduled = 0;
        for record in self.store.list_all().await? {
            if !record.config.is_oauth_open {
                continue;
            }
            match self.scheduler.add_or_replace_job(&record.config).await {
                Ok(()) => scheduled += 1,
                Err(e) => warn!("Failed to schedule refresh job {}: {}", record.key(), e),
            }
        }
        debug!("Scheduled {} stored refresh jobs", scheduled);
        Ok(scheduled)
    }
}

/// Absent and empty identifiers are both missing
fn require<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SyncError::missing_identifier(field)),
    }
}
