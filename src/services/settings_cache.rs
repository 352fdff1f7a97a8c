//! # 设置缓存
//!
//! 生成流程需要同步拿到设置，因此在内存中维护两层：
//! - **进程缓存**：最近一次 `load_settings` / `save_settings` 的结果
//! - **快速缓存镜像**：`mindmap_settings_cache` 文件的内存副本，启动时读取一次
//!
//! `get_sync` 只读内存：进程缓存 → 镜像 → 默认值，不做任何 I/O。
//!
//! ## 线程安全
//! 使用 `std::sync::RwLock`，所有写操作都在 await 之前完成，
//! Tauri command 可能在不同线程上并发执行，RwLock 允许多个读操作并发进行。

use std::sync::RwLock;

use crate::models::settings::UserSettings;
use crate::services::file_store::{FileStore, SETTINGS_CACHE_KEY};

/// 用户设置的读穿缓存
#[derive(Debug)]
pub struct SettingsCache {
    /// 进程缓存
    cached: RwLock<Option<UserSettings>>,

    /// 快速缓存文件的内存镜像
    mirror: RwLock<Option<UserSettings>>,

    store: FileStore,
}

impl SettingsCache {
    /// 创建缓存，并同步读取快速缓存文件填充镜像
    pub fn load(store: FileStore) -> Self {
        let mirror = store
            .read_blocking::<UserSettings>(SETTINGS_CACHE_KEY)
            .map(UserSettings::fill_blanks);
        if mirror.is_some() {
            log::info!("已从快速缓存恢复设置");
        }
        Self {
            cached: RwLock::new(None),
            mirror: RwLock::new(mirror),
            store,
        }
    }

    /// 同步读取设置：进程缓存 → 镜像 → 默认值
    pub fn get_sync(&self) -> UserSettings {
        if let Some(settings) = self.cached.read().ok().and_then(|c| c.clone()) {
            return settings;
        }
        if let Some(settings) = self.mirror.read().ok().and_then(|m| m.clone()) {
            return settings;
        }
        UserSettings::default()
    }

    /// 同步更新进程缓存和镜像
    pub fn set(&self, settings: &UserSettings) {
        if let Ok(mut cached) = self.cached.write() {
            *cached = Some(settings.clone());
        }
        if let Ok(mut mirror) = self.mirror.write() {
            *mirror = Some(settings.clone());
        }
    }

    /// 把设置写入快速缓存文件；失败只记录日志
    pub async fn persist_mirror(&self, settings: &UserSettings) {
        if let Err(e) = self.store.write(SETTINGS_CACHE_KEY, settings).await {
            log::error!("写入设置快速缓存失败: {}", e);
        }
    }

    /// 清空进程缓存、镜像和快速缓存文件
    pub async fn clear(&self) {
        if let Ok(mut cached) = self.cached.write() {
            *cached = None;
        }
        if let Ok(mut mirror) = self.mirror.write() {
            *mirror = None;
        }
        if let Err(e) = self.store.remove(SETTINGS_CACHE_KEY).await {
            log::error!("删除设置快速缓存失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(api_key: &str) -> UserSettings {
        UserSettings {
            api_key: api_key.to_string(),
            ..UserSettings::default()
        }
    }

    #[test]
    fn test_empty_cache_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cache = SettingsCache::load(FileStore::new(dir.path()));
        assert_eq!(cache.get_sync(), UserSettings::default());
    }

    #[tokio::test]
    async fn test_mirror_survives_restart() {
        let dir = TempDir::new().unwrap();
        let cache = SettingsCache::load(FileStore::new(dir.path()));
        cache.set(&settings("sk-1"));
        cache.persist_mirror(&settings("sk-1")).await;

        let reloaded = SettingsCache::load(FileStore::new(dir.path()));
        assert_eq!(reloaded.get_sync().api_key, "sk-1");
    }

    #[tokio::test]
    async fn test_mirror_blanks_are_filled_on_load() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let stale = UserSettings {
            model_name: " ".to_string(),
            ..settings("sk-1")
        };
        store.write(SETTINGS_CACHE_KEY, &stale).await.unwrap();

        let cache = SettingsCache::load(store);
        assert_eq!(cache.get_sync().model_name, UserSettings::default().model_name);
        assert_eq!(cache.get_sync().api_key, "sk-1");
    }

    #[tokio::test]
    async fn test_clear_drops_every_layer() {
        let dir = TempDir::new().unwrap();
        let cache = SettingsCache::load(FileStore::new(dir.path()));
        cache.set(&settings("sk-1"));
        cache.persist_mirror(&settings("sk-1")).await;

        cache.clear().await;
        assert_eq!(cache.get_sync(), UserSettings::default());
        let reloaded = SettingsCache::load(FileStore::new(dir.path()));
        assert_eq!(reloaded.get_sync(), UserSettings::default());
    }
}
