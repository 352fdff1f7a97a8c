//! # text2mindmap - 核心库与 Tauri 应用初始化
//!
//! 把上传的文档（纯文本、Markdown、PDF、图片）交给 OpenAI 兼容的大模型，
//! 生成结构化思维导图、流程步骤或论文阅读笔记，并保存为可浏览、可编辑的工件。
//!
//! ## 模块结构
//! - `models/` - 数据模型（对应前端 TypeScript 类型）
//! - `services/` - 核心业务逻辑（生成流水线、持久化层、认证）
//! - `error` - 错误类型
//! - `utils/` - 通用工具函数
//! - `commands/` - Tauri command 处理函数（仅 `desktop` feature）
//!
//! ## 架构说明
//! 核心逻辑不依赖 Tauri，可以在无界面环境下直接使用和测试；
//! 启用 `desktop` feature 时由 `run()` 组装 Tauri 应用，`main.rs` 只负责调用它。

#[cfg(feature = "desktop")]
mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, GenerationError, StorageError};
pub use services::app_config::AppConfig;
pub use services::pipeline::Pipeline;
pub use services::state::AppState;
pub use services::storage::Persistence;

#[cfg(feature = "desktop")]
use tauri::Manager;

// 移动端（Android/iOS）编译时把 `run()` 标记为入口点；桌面端由 `main.rs` 直接调用。
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
/// Tauri 应用启动函数
///
/// 1. 在 `setup` 钩子中按需注册日志插件（仅调试构建）
/// 2. 读取应用配置（配置文件 + 环境变量）并构建 `AppState`
/// 3. 注册所有自定义 Tauri commands
/// 4. 生成应用上下文并启动主事件循环
///
/// # Panics
/// Tauri 应用启动失败（例如无法确定数据目录或窗口创建失败）时 panic。
pub fn run() {
    tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            // 生成
            commands::generate::generate_document,
            // 设置
            commands::settings::get_settings_sync,
            commands::settings::load_settings,
            commands::settings::save_settings,
            // 工件
            commands::artifacts::list_artifacts,
            commands::artifacts::get_artifact,
            commands::artifacts::update_artifact,
            commands::artifacts::delete_artifact,
            // 登录
            commands::auth::sign_in,
            commands::auth::sign_out,
            commands::auth::get_current_identity,
        ])
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let config = tauri::async_runtime::block_on(AppConfig::load());
            let state = AppState::new(config)?;
            app.manage(state);
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
