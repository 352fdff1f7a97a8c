//! # 设置与持久化层
//!
//! `StorageBackend` 是本地与远程两种后端的统一接口；`Persistence` 在每次调用时
//! 按当前身份选择后端：
//!
//! ```text
//! [解析身份] --无--> Local
//!           --有--> [会话（30 秒内过期则先刷新）]
//!                     --有效--> Remote
//!                     --无效--> Degraded（返回安全默认值，不报错）
//! ```
//!
//! 已登录但未配置远程存储时同样视为 Degraded。
//!
//! ## 降级策略
//! 所有持久化错误都在这里记录日志后吞掉：列表返回 `[]`、单条记录返回 `None`、
//! 删除返回 `false`、设置返回默认值。浏览和设置页面不会因为后端暂时不可用而失败。

pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use crate::error::StorageError;
use crate::models::artifact::{ArtifactUpdate, IconColor, NewArtifact, StoredArtifact};
use crate::models::settings::{IconColorPreference, UserSettings};
use crate::services::crypto::Cipher;
use crate::services::identity::{IdentityProvider, Session};
use crate::services::settings_cache::SettingsCache;

pub use local::LocalBackend;
pub use remote::{RemoteBackend, RemoteConfig};

/// 存储后端
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// 后端名称，仅用于日志
    fn name(&self) -> &'static str;

    /// 读取设置；没有记录时返回 `None`
    async fn load_settings(&self) -> Result<Option<UserSettings>, StorageError>;

    /// 写入设置（覆盖或 upsert）
    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError>;

    /// 全部工件，按创建时间倒序
    async fn list_artifacts(&self) -> Result<Vec<StoredArtifact>, StorageError>;

    async fn get_artifact(&self, id: &str) -> Result<Option<StoredArtifact>, StorageError>;

    /// 创建工件，由后端分配 id 和时间戳
    async fn create_artifact(
        &self,
        artifact: NewArtifact,
        icon_color: IconColor,
    ) -> Result<StoredArtifact, StorageError>;

    /// 局部更新；工件不存在时返回 `None`
    async fn update_artifact(
        &self,
        id: &str,
        update: &ArtifactUpdate,
    ) -> Result<Option<StoredArtifact>, StorageError>;

    /// 删除工件；返回是否确实删除了记录
    async fn delete_artifact(&self, id: &str) -> Result<bool, StorageError>;
}

/// 后端解析结果
pub enum Resolved {
    Ready(Arc<dyn StorageBackend>),
    Degraded,
}

/// 持久化门面
pub struct Persistence {
    local: Arc<LocalBackend>,
    remote: Option<RemoteConfig>,
    identity: Arc<dyn IdentityProvider>,
    cipher: Cipher,
    cache: SettingsCache,
}

impl Persistence {
    /// # 参数
    /// - `local` - 未登录时使用的本地后端
    /// - `remote` - 远程存储连接参数；`None` 表示未配置 Supabase
    /// - `identity` - 身份提供者
    /// - `cipher` - 远程存储中 API 密钥的加解密器
    /// - `cache` - 设置缓存
    pub fn new(
        local: LocalBackend,
        remote: Option<RemoteConfig>,
        identity: Arc<dyn IdentityProvider>,
        cipher: Cipher,
        cache: SettingsCache,
    ) -> Self {
        Self {
            local: Arc::new(local),
            remote,
            identity,
            cipher,
            cache,
        }
    }

    /// 按当前身份解析本次调用使用的后端
    pub async fn resolve(&self) -> Resolved {
        if self.identity.current_identity().await.is_none() {
            return Resolved::Ready(self.local.clone());
        }
        match self.identity.session().await {
            Some(session) => self.remote_for(&session),
            None => {
                log::warn!("已登录但会话不可用，持久化操作降级");
                Resolved::Degraded
            }
        }
    }

    fn remote_for(&self, session: &Session) -> Resolved {
        match &self.remote {
            Some(config) => Resolved::Ready(Arc::new(RemoteBackend::new(
                config.clone(),
                &session.access_token,
                &session.user.id,
                self.cipher.clone(),
            ))),
            None => {
                log::warn!("{}", StorageError::NotConfigured);
                Resolved::Degraded
            }
        }
    }

    // ======== 设置 ========

    /// 同步读取设置：进程缓存 → 快速缓存镜像 → 默认值
    pub fn get_settings_sync(&self) -> UserSettings {
        self.cache.get_sync()
    }

    /// 从当前后端读取设置，并刷新缓存
    ///
    /// 没有记录、读取失败或降级时返回默认值。
    pub async fn load_settings(&self) -> UserSettings {
        let settings = match self.resolve().await {
            Resolved::Ready(backend) => match backend.load_settings().await {
                Ok(Some(settings)) => settings.fill_blanks(),
                Ok(None) => UserSettings::default(),
                Err(e) => {
                    log::error!("读取设置失败 ({}): {}", backend.name(), e);
                    UserSettings::default()
                }
            },
            Resolved::Degraded => UserSettings::default(),
        };

        self.cache.set(&settings);
        self.cache.persist_mirror(&settings).await;
        settings
    }

    /// 保存设置
    ///
    /// 空白的模型名、地址和提示词先用默认值补齐；然后同步更新缓存和镜像
    /// （此后 `get_settings_sync` 立即可见），再写快速缓存文件，最后写入后端。
    /// 后端失败只记录日志，调用方仍拿到这份设置。
    pub async fn save_settings(&self, settings: UserSettings) -> UserSettings {
        let settings = settings.fill_blanks();
        self.cache.set(&settings);
        self.cache.persist_mirror(&settings).await;

        match self.resolve().await {
            Resolved::Ready(backend) => {
                if let Err(e) = backend.save_settings(&settings).await {
                    log::error!("保存设置失败 ({}): {}", backend.name(), e);
                }
            }
            Resolved::Degraded => log::warn!("会话不可用，设置仅保存在本地缓存"),
        }
        settings
    }

    /// 清空设置缓存（登出时调用）
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    // ======== 工件 ========

    /// 创建工件，图标颜色取自缓存中的偏好设置
    pub async fn create_artifact(&self, artifact: NewArtifact) -> Option<StoredArtifact> {
        let Resolved::Ready(backend) = self.resolve().await else {
            return None;
        };
        let icon_color = pick_icon_color(self.cache.get_sync().icon_color_preference);
        match backend.create_artifact(artifact, icon_color).await {
            Ok(created) => {
                log::info!("已创建工件 {} ({})", created.id, backend.name());
                Some(created)
            }
            Err(e) => {
                log::error!("创建工件失败 ({}): {}", backend.name(), e);
                None
            }
        }
    }

    /// 列出全部工件（新的在前）
    ///
    /// 远程返回 401 时刷新会话并重试一次；其余失败返回空列表。
    pub async fn list_artifacts(&self) -> Vec<StoredArtifact> {
        let Resolved::Ready(backend) = self.resolve().await else {
            return Vec::new();
        };
        match backend.list_artifacts().await {
            Ok(artifacts) => artifacts,
            Err(StorageError::Unauthorized) => {
                log::warn!("会话已失效，刷新后重试一次");
                let Some(session) = self.identity.refresh_session().await else {
                    return Vec::new();
                };
                let Resolved::Ready(retry) = self.remote_for(&session) else {
                    return Vec::new();
                };
                retry.list_artifacts().await.unwrap_or_else(|e| {
                    log::error!("重试读取工件列表失败: {}", e);
                    Vec::new()
                })
            }
            Err(e) => {
                log::error!("读取工件列表失败 ({}): {}", backend.name(), e);
                Vec::new()
            }
        }
    }

    pub async fn get_artifact(&self, id: &str) -> Option<StoredArtifact> {
        let Resolved::Ready(backend) = self.resolve().await else {
            return None;
        };
        backend.get_artifact(id).await.unwrap_or_else(|e| {
            log::error!("读取工件 {} 失败 ({}): {}", id, backend.name(), e);
            None
        })
    }

    /// 局部更新工件，只写入给出的字段
    pub async fn update_artifact(&self, id: &str, update: ArtifactUpdate) -> Option<StoredArtifact> {
        let Resolved::Ready(backend) = self.resolve().await else {
            return None;
        };
        backend.update_artifact(id, &update).await.unwrap_or_else(|e| {
            log::error!("更新工件 {} 失败 ({}): {}", id, backend.name(), e);
            None
        })
    }

    pub async fn delete_artifact(&self, id: &str) -> bool {
        let Resolved::Ready(backend) = self.resolve().await else {
            return false;
        };
        backend.delete_artifact(id).await.unwrap_or_else(|e| {
            log::error!("删除工件 {} 失败 ({}): {}", id, backend.name(), e);
            false
        })
    }
}

/// 按偏好选择图标颜色：随机时在调色板中均匀选取
fn pick_icon_color(preference: IconColorPreference) -> IconColor {
    match preference {
        IconColorPreference::Fixed(color) => color,
        IconColorPreference::Random => IconColor::PALETTE
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or_default(),
    }
}
