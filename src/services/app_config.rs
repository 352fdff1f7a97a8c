//! # 应用配置
//!
//! 部署相关的配置（与用户设置无关）：
//! - Supabase 地址与匿名密钥：都配置时启用登录和远程存储
//! - 凭据加密密钥
//! - 数据目录：默认 `~/.text2mindmap`
//! - 论文笔记格式修复的超时秒数：默认 180
//!
//! 先读取 `~/.text2mindmap/app-config.json`（不存在或无法解析时静默使用默认值），
//! 再用环境变量覆盖：
//!
//! | 环境变量 | 字段 |
//! |----------|------|
//! | `TEXT2MINDMAP_SUPABASE_URL` | `supabaseUrl` |
//! | `TEXT2MINDMAP_SUPABASE_ANON_KEY` | `supabaseAnonKey` |
//! | `TEXT2MINDMAP_ENCRYPTION_KEY` | `encryptionKey` |
//! | `TEXT2MINDMAP_DATA_DIR` | `dataDir` |
//! | `TEXT2MINDMAP_REPAIR_TIMEOUT_SECS` | `repairTimeoutSecs` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::path;

/// 未配置时使用的加密密钥，仅供开发环境
pub const DEFAULT_ENCRYPTION_KEY: &str = "default-dev-key-do-not-use-in-prod";

pub const ENV_SUPABASE_URL: &str = "TEXT2MINDMAP_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "TEXT2MINDMAP_SUPABASE_ANON_KEY";
pub const ENV_ENCRYPTION_KEY: &str = "TEXT2MINDMAP_ENCRYPTION_KEY";
pub const ENV_DATA_DIR: &str = "TEXT2MINDMAP_DATA_DIR";
pub const ENV_REPAIR_TIMEOUT_SECS: &str = "TEXT2MINDMAP_REPAIR_TIMEOUT_SECS";

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub encryption_key: String,
    pub data_dir: Option<PathBuf>,
    pub repair_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            encryption_key: DEFAULT_ENCRYPTION_KEY.to_string(),
            data_dir: None,
            repair_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// 读取配置文件并应用环境变量覆盖
    pub async fn load() -> Self {
        let from_file = match path::get_app_config_path() {
            Ok(config_path) => Self::read_from(&config_path).await,
            Err(_) => Self::default(),
        };
        from_file.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// 读取指定配置文件；不存在或解析失败时静默返回默认配置
    pub async fn read_from(config_path: &Path) -> Self {
        match tokio::fs::read_to_string(config_path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// 用环境变量覆盖配置；空字符串视为未设置
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = var(ENV_SUPABASE_URL) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = var(ENV_SUPABASE_ANON_KEY) {
            self.supabase_anon_key = Some(key);
        }
        if let Some(secret) = var(ENV_ENCRYPTION_KEY) {
            self.encryption_key = secret;
        }
        if let Some(dir) = var(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        match var(ENV_REPAIR_TIMEOUT_SECS).map(|secs| secs.trim().parse::<u64>()) {
            Some(Ok(secs)) => self.repair_timeout_secs = Some(secs),
            Some(Err(e)) => log::warn!("{} 不是合法的秒数，忽略: {}", ENV_REPAIR_TIMEOUT_SECS, e),
            None => {}
        }
        self
    }

    /// Supabase 地址与匿名密钥；任一缺失时返回 `None`
    pub fn supabase(&self) -> Option<(&str, &str)> {
        let url = self.supabase_url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let key = self.supabase_anon_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((url, key))
    }

    /// 修复阶段超时；未配置或为 0 时返回 `None`（使用默认值）
    pub fn repair_timeout(&self) -> Option<Duration> {
        self.repair_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// 数据目录：配置优先，否则为 `~/.text2mindmap`
    pub fn data_dir(&self) -> Result<PathBuf, String> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => path::get_app_data_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_or_invalid_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = AppConfig::read_from(&dir.path().join("none.json")).await;
        assert_eq!(missing, AppConfig::default());

        let invalid = dir.path().join("bad.json");
        std::fs::write(&invalid, "not json").unwrap();
        assert_eq!(AppConfig::read_from(&invalid).await, AppConfig::default());
    }

    #[tokio::test]
    async fn test_file_then_env_overrides() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app-config.json");
        std::fs::write(
            &file,
            r#"{ "supabaseUrl": "https://file.supabase.co", "supabaseAnonKey": "file-key" }"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SUPABASE_URL, "https://env.supabase.co"),
            (ENV_ENCRYPTION_KEY, "prod-secret"),
            (ENV_DATA_DIR, "  "),
            (ENV_REPAIR_TIMEOUT_SECS, "45"),
        ]);
        let config = AppConfig::read_from(&file)
            .await
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.supabase(), Some(("https://env.supabase.co", "file-key")));
        assert_eq!(config.encryption_key, "prod-secret");
        assert_eq!(config.data_dir, None);
        assert_eq!(config.repair_timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_invalid_or_zero_repair_timeout_uses_default() {
        let config = AppConfig::default()
            .with_env_overrides(|name| (name == ENV_REPAIR_TIMEOUT_SECS).then(|| "soon".to_string()));
        assert_eq!(config.repair_timeout(), None);

        let zero = AppConfig {
            repair_timeout_secs: Some(0),
            ..AppConfig::default()
        };
        assert_eq!(zero.repair_timeout(), None);
    }

    #[test]
    fn test_supabase_requires_both_values() {
        let config = AppConfig {
            supabase_url: Some("https://x.supabase.co".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.supabase(), None);
    }
}
