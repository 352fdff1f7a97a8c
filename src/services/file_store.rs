//! # 本地键值文件存储
//!
//! 应用数据目录下每个固定的键对应一个 JSON 文件（`<key>.json`）：
//! - `mindmap_api_settings` - 未登录时的用户设置
//! - `mindmap_saved_maps` - 未登录时的工件列表
//! - `mindmap_settings_cache` - 设置快速缓存（启动时同步读取）
//! - `supabase-auth` - 持久化的登录会话
//!
//! ## 写入流程
//! 1. 校验键名（只允许字母、数字、`-`、`_`，防止路径穿越）
//! 2. 序列化写入同目录的 `<key>.json.tmp`
//! 3. 原文件存在时复制为 `<key>.json.bak`
//! 4. `rename` 覆盖原文件
//!
//! 同一数据目录的写入和删除由存储内的互斥锁串行化（克隆共享同一把锁），
//! 临时文件路径固定也不会互相覆盖。
//!
//! 读取时如果主文件损坏，会回退读取 `.bak`。

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// 未登录时的用户设置
pub const SETTINGS_KEY: &str = "mindmap_api_settings";

/// 未登录时的工件列表
pub const ARTIFACTS_KEY: &str = "mindmap_saved_maps";

/// 设置快速缓存
pub const SETTINGS_CACHE_KEY: &str = "mindmap_settings_cache";

/// 登录会话
pub const AUTH_SESSION_KEY: &str = "supabase-auth";

/// 数据目录下的 JSON 文件存储
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// # 参数
    /// - `root` - 数据目录；首次写入时自动创建
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 读取并反序列化一个键
    ///
    /// # 返回值
    /// - `Ok(Some(value))` - 读取成功
    /// - `Ok(None)` - 文件不存在
    ///
    /// # 错误
    /// 读取失败，或主文件与备份都无法解析时返回错误
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("{} 解析失败，尝试读取备份: {}", path.display(), e);
                let backup = tokio::fs::read_to_string(backup_path(&path)).await?;
                Ok(Some(serde_json::from_str(&backup)?))
            }
        }
    }

    /// 同步读取一个键（仅用于启动阶段）
    ///
    /// 读取失败或解析失败时返回 `None`，不回退备份。
    pub fn read_blocking<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key).ok()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{} 解析失败，忽略: {}", path.display(), e);
                None
            }
        }
    }

    /// 序列化并原子写入一个键
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let content = serde_json::to_vec_pretty(value)?;

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.root).await?;
        let tmp = tmp_path(&path);
        tokio::fs::write(&tmp, &content).await?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::copy(&path, backup_path(&path)).await?;
        }

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// 删除一个键（连同备份）；不存在时视为成功
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        for target in [backup_path(&path), path] {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

/// 键名只能包含字母、数字、`-` 和 `_`
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("非法的存储键: {:?}", key),
        )))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.read::<Value>(SETTINGS_KEY).await.unwrap(), None);

        store.write(SETTINGS_KEY, &json!({ "apiKey": "k" })).await.unwrap();
        let value: Value = store.read(SETTINGS_KEY).await.unwrap().unwrap();
        assert_eq!(value["apiKey"], json!("k"));
        assert_eq!(store.read_blocking::<Value>(SETTINGS_KEY), Some(value));
        assert!(!dir.path().join("data/mindmap_api_settings.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_backup_and_recovers_from_corruption() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.write(ARTIFACTS_KEY, &json!([1])).await.unwrap();
        store.write(ARTIFACTS_KEY, &json!([1, 2])).await.unwrap();

        let main = dir.path().join("mindmap_saved_maps.json");
        std::fs::write(&main, "{ truncated").unwrap();

        let value: Value = store.read(ARTIFACTS_KEY).await.unwrap().unwrap();
        assert_eq!(value, json!([1]));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.write(AUTH_SESSION_KEY, &json!({})).await.unwrap();
        store.remove(AUTH_SESSION_KEY).await.unwrap();
        store.remove(AUTH_SESSION_KEY).await.unwrap();
        assert_eq!(store.read::<Value>(AUTH_SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_key() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let writes = (0..32).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.write(SETTINGS_CACHE_KEY, &json!({ "n": i })).await })
        });
        for handle in futures_util::future::join_all(writes).await {
            handle.unwrap().unwrap();
        }

        let value: Value = store.read(SETTINGS_CACHE_KEY).await.unwrap().unwrap();
        assert!(value["n"].is_u64());
        assert!(!dir.path().join("mindmap_settings_cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.write("../escape", &json!(1)).await.is_err());
        assert!(store.read::<Value>("").await.is_err());
    }
}
