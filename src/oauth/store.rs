//! Configuration record storage
//!
//! [`OAuthStore`] is the persistence seam. [`MemoryOAuthStore`] keeps records in
//! memory and, when given a path, writes a JSON snapshot after every upsert.

use super::types::{ConfigKey, OAuthConfig, StoredConfig};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Storage keyed uniquely by (project_id, env_id)
#[async_trait]
pub trait OAuthStore: Send + Sync {
    /// Insert or replace the configuration for the key
    async fn upsert(&self, project_id: &str, env_id: &str, config: OAuthConfig) -> Result<StoredConfig>;

    async fn get_by_project_and_env(&self, project_id: &str, env_id: &str) -> Result<Option<StoredConfig>>;

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<StoredConfig>>;

    /// Every stored record, used to reschedule refresh jobs at startup
    async fn list_all(&self) -> Result<Vec<StoredConfig>>;
}

#[derive(Debug, Default)]
pub struct MemoryOAuthStore {
    records: RwLock<BTreeMap<ConfigKey, StoredConfig>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryOAuthStore {
    /// Create an in-memory store with no snapshot file
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSON snapshot, loading it if the file exists
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = BTreeMap::new();

        if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            let stored: Vec<StoredConfig> = serde_json::from_str(&content).map_err(|e| {
                SyncError::storage(format!("Failed to parse snapshot {}: {}", path.display(), e))
            })?;
            for record in stored {
                records.insert(record.key(), record);
            }
            info!("Loaded {} OAuth configurations from {}", records.len(), path.display());
        } else {
            debug!("No snapshot at {}, starting empty", path.display());
        }

        Ok(Self {
            records: RwLock::new(records),
            snapshot_path: Some(path),
        })
    }

    async fn persist(&self, records: &BTreeMap<ConfigKey, StoredConfig>) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let snapshot: Vec<&StoredConfig> = records.values().collect();
        let content = serde_json::to_string_pretty(&snapshot)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        debug!("Persisted {} OAuth configurations to {}", snapshot.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl OAuthStore for MemoryOAuthStore {
    async fn upsert(&self, project_id: &str, env_id: &str, mut config: OAuthConfig) -> Result<StoredConfig> {
        config.project_id = project_id.to_string();
        config.env_id = env_id.to_string();
        let key = config.key();
        let now = Utc::now();

        let mut records = self.records.write().await;
        let stored = match records.get(&key) {
            Some(existing) => StoredConfig {
                id: existing.id,
                config,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => StoredConfig::new(config, now),
        };

        let previous = records.insert(key.clone(), stored.clone());
        if let Err(e) = self.persist(&records).await {
            // Keep memory consistent with what is on disk
            match previous {
                Some(previous) => records.insert(key, previous),
                None => records.remove(&key),
            };
            return Err(e);
        }

        Ok(stored)
    }

    async fn get_by_project_and_env(&self, project_id: &str, env_id: &str) -> Result<Option<StoredConfig>> {
        let records = self.records.read().await;
        Ok(records.get(&ConfigKey::new(project_id, env_id)).cloned())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<StoredConfig>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| record.config.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<StoredConfig>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}
