//! # 错误类型
//!
//! - `GenerationError` - 生成路径错误：向上传播到 UI，作为用户可见的失败
//! - `StorageError` - 持久化路径错误：在 `Persistence` 边界记录日志后降级为默认值
//! - `AppError` - 生成并保存的组合流程错误
//!
//! IPC 层统一通过 `to_string()` 转换为 `String`，与 Tauri command 的错误约定一致。

use thiserror::Error;

/// 生成流水线错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 未配置 API 密钥：必须在任何网络请求之前失败，用户需修正设置
    #[error("API Key is missing. Please configure it in Settings.")]
    Configuration,

    /// 上游返回非 2xx 或非 JSON 响应
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// 传输层失败（连接、TLS、读取响应体等）
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),

    /// 模型输出在去除代码围栏后仍不是合法 JSON，或响应结构缺失
    #[error("解析模型输出失败: {0}")]
    Parse(String),

    /// 修复阶段超时（只在内部使用，不会传播给调用方）
    #[error("请求超时（{0} 秒）")]
    Timeout(u64),
}

/// 持久化层错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 远程会话失效（HTTP 401）
    #[error("远程会话已失效，需要重新登录")]
    Unauthorized,

    /// 远程存储返回错误
    #[error("远程存储错误 ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),

    #[error("本地存储读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据序列化失败: {0}")]
    Serde(#[from] serde_json::Error),

    /// 已登录但未配置远程存储地址或匿名密钥
    #[error("远程存储未配置")]
    NotConfigured,
}

impl StorageError {
    /// 把远程服务的非 2xx 响应映射为存储错误
    ///
    /// 401 一律视为会话失效；其余状态码优先取响应 JSON 中的
    /// `message` / `msg` / `error_description` / `error` 字段，否则使用原始响应体。
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        if status == 401 {
            return StorageError::Unauthorized;
        }
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
            })
            .unwrap_or_else(|| body.to_string());
        StorageError::Remote { status, message }
    }
}

/// 生成并保存流程的错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// 生成成功但工件未能保存（持久化层已降级并记录日志）
    #[error("生成结果保存失败，请检查登录状态或存储空间")]
    SaveFailed,
}
