//! # 应用状态
//!
//! 把配置、生成流水线、持久化层和认证客户端组装在一起，
//! 通过 Tauri 的 `manage()` 注册为全局状态，所有 command 经 `State<AppState>` 访问。

use std::sync::Arc;

use crate::error::{AppError, StorageError};
use crate::models::artifact::StoredArtifact;
use crate::models::generation::GenerationRequest;
use crate::services::app_config::AppConfig;
use crate::services::crypto::Cipher;
use crate::services::file_store::FileStore;
use crate::services::identity::{Anonymous, Identity, IdentityProvider, SupabaseAuth};
use crate::services::pipeline::Pipeline;
use crate::services::settings_cache::SettingsCache;
use crate::services::storage::{LocalBackend, Persistence, RemoteConfig};

/// 应用全局状态
pub struct AppState {
    pipeline: Pipeline,
    persistence: Persistence,
    /// 配置了 Supabase 时存在
    auth: Option<Arc<SupabaseAuth>>,
}

impl AppState {
    /// 按配置构建应用状态
    ///
    /// - 本地后端与设置快速缓存位于数据目录下
    /// - 同时配置了 Supabase 地址和匿名密钥时启用 `SupabaseAuth` 与远程存储，
    ///   否则使用 `Anonymous`，所有数据只保存在本地
    ///
    /// # 错误
    /// 无法确定数据目录时返回错误
    pub fn new(config: AppConfig) -> Result<Self, String> {
        let data_dir = config.data_dir()?;
        let store = FileStore::new(data_dir);
        let http = reqwest::Client::new();

        let pipeline = match config.repair_timeout() {
            Some(timeout) => Pipeline::new().with_repair_timeout(timeout),
            None => Pipeline::new(),
        };

        let (auth, remote) = match config.supabase() {
            Some((url, anon_key)) => (
                Some(Arc::new(SupabaseAuth::new(http.clone(), url, anon_key, store.clone()))),
                Some(RemoteConfig::new(http, url, anon_key)),
            ),
            None => (None, None),
        };

        let identity: Arc<dyn IdentityProvider> = match &auth {
            Some(auth) => auth.clone(),
            None => Arc::new(Anonymous),
        };

        log::info!(
            "应用数据目录: {}，远程存储: {}",
            store.root().display(),
            if remote.is_some() { "已启用" } else { "未配置" }
        );

        let persistence = Persistence::new(
            LocalBackend::new(store.clone()),
            remote,
            identity,
            Cipher::new(config.encryption_key),
            SettingsCache::load(store),
        );

        Ok(Self {
            pipeline,
            persistence,
            auth,
        })
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// 生成并保存
    ///
    /// 使用同步缓存中的设置执行完整生成；只有全部阶段成功后才创建工件。
    ///
    /// # 错误
    /// - `AppError::Generation` - 生成失败（不会创建任何工件）
    /// - `AppError::SaveFailed` - 生成成功但持久化层未能保存
    pub async fn generate_and_save(&self, request: GenerationRequest) -> Result<StoredArtifact, AppError> {
        let settings = self.persistence.get_settings_sync();
        let result = self.pipeline.generate(&settings, &request).await?;
        let artifact = result.into_new_artifact(&request);
        self.persistence
            .create_artifact(artifact)
            .await
            .ok_or(AppError::SaveFailed)
    }

    /// 登录，成功后从远程存储加载设置
    ///
    /// # 错误
    /// 未配置 Supabase 时返回 `StorageError::NotConfigured`；凭据错误或网络错误原样返回
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, StorageError> {
        let auth = self.auth.as_ref().ok_or(StorageError::NotConfigured)?;
        let session = auth.sign_in_with_password(email, password).await?;
        self.persistence.load_settings().await;
        Ok(session.user)
    }

    /// 登出并清空设置缓存
    pub async fn sign_out(&self) {
        if let Some(auth) = &self.auth {
            auth.sign_out().await;
        }
        self.persistence.clear_cache().await;
    }

    /// 当前登录身份
    pub async fn current_identity(&self) -> Option<Identity> {
        match &self.auth {
            Some(auth) => auth.current_identity().await,
            None => None,
        }
    }
}
