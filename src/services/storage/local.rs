//! # 本地存储后端
//!
//! 未登录时使用。设置保存在 `mindmap_api_settings`，工件列表整体保存在
//! `mindmap_saved_maps`（JSON 数组）。每次修改都是"读取整个列表 → 修改 → 原子写回"，
//! 由内部互斥锁串行化，避免并发创建时互相覆盖。
//!
//! 工件 id 为创建时的毫秒时间戳；同一毫秒内重复时递增直到唯一。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::models::artifact::{ArtifactUpdate, IconColor, NewArtifact, StoredArtifact};
use crate::models::settings::UserSettings;
use crate::services::file_store::{ARTIFACTS_KEY, FileStore, SETTINGS_KEY};
use crate::services::storage::StorageBackend;

/// 基于 `FileStore` 的本地后端
#[derive(Debug, Clone)]
pub struct LocalBackend {
    store: FileStore,
    write_lock: Arc<Mutex<()>>,
}

impl LocalBackend {
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_all(&self) -> Result<Vec<StoredArtifact>, StorageError> {
        Ok(self.store.read(ARTIFACTS_KEY).await?.unwrap_or_default())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn load_settings(&self) -> Result<Option<UserSettings>, StorageError> {
        self.store.read(SETTINGS_KEY).await
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        self.store.write(SETTINGS_KEY, settings).await
    }

    async fn list_artifacts(&self) -> Result<Vec<StoredArtifact>, StorageError> {
        let mut artifacts = self.read_all().await?;
        sort_newest_first(&mut artifacts);
        Ok(artifacts)
    }

    async fn get_artifact(&self, id: &str) -> Result<Option<StoredArtifact>, StorageError> {
        Ok(self.read_all().await?.into_iter().find(|a| a.id == id))
    }

    async fn create_artifact(
        &self,
        artifact: NewArtifact,
        icon_color: IconColor,
    ) -> Result<StoredArtifact, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut artifacts = self.read_all().await?;

        let now = Utc::now();
        let stored = StoredArtifact {
            id: next_local_id(&artifacts, now.timestamp_millis()),
            title: artifact.title,
            original_filename: artifact.original_filename,
            mode: artifact.mode,
            model_name: artifact.model_name,
            file_type: artifact.file_type,
            data: artifact.data,
            process_steps: artifact.process_steps,
            paper_notes: artifact.paper_notes,
            icon_color,
            created_at: iso_timestamp(now),
            updated_at: None,
        };

        artifacts.push(stored.clone());
        self.store.write(ARTIFACTS_KEY, &artifacts).await?;
        Ok(stored)
    }

    async fn update_artifact(
        &self,
        id: &str,
        update: &ArtifactUpdate,
    ) -> Result<Option<StoredArtifact>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut artifacts = self.read_all().await?;

        let Some(artifact) = artifacts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        update.apply_to(artifact);
        artifact.updated_at = Some(iso_timestamp(Utc::now()));
        let updated = artifact.clone();

        self.store.write(ARTIFACTS_KEY, &artifacts).await?;
        Ok(Some(updated))
    }

    async fn delete_artifact(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut artifacts = self.read_all().await?;

        let before = artifacts.len();
        artifacts.retain(|a| a.id != id);
        if artifacts.len() == before {
            return Ok(false);
        }

        self.store.write(ARTIFACTS_KEY, &artifacts).await?;
        Ok(true)
    }
}

/// 以毫秒时间戳作为 id，与已有 id 冲突时递增
fn next_local_id(existing: &[StoredArtifact], now_millis: i64) -> String {
    let mut candidate = now_millis;
    while existing.iter().any(|a| a.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// ISO 8601 时间戳（毫秒精度，UTC，`Z` 结尾）
fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 按创建时间倒序排列；无法解析的时间戳排在最后
pub(crate) fn sort_newest_first(artifacts: &mut [StoredArtifact]) {
    artifacts.sort_by_key(|a| {
        std::cmp::Reverse(
            DateTime::parse_from_rfc3339(&a.created_at)
                .map(|t| t.timestamp_millis())
                .unwrap_or(i64::MIN),
        )
    });
}
