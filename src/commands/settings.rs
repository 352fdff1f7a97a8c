//! # 设置 Tauri Commands
//!
//! - `get_settings_sync` - 从内存缓存同步读取设置
//! - `load_settings` - 从当前后端加载设置并刷新缓存
//! - `save_settings` - 校验后保存设置

use tauri::State;

use crate::models::settings::UserSettings;
use crate::services::state::AppState;

/// 同步读取设置
///
/// 只读内存（进程缓存 → 快速缓存镜像 → 默认值），不会等待网络。
#[tauri::command]
pub fn get_settings_sync(state: State<'_, AppState>) -> UserSettings {
    state.persistence().get_settings_sync()
}

/// 从当前后端加载设置
///
/// 未登录时读取本地记录，已登录时读取远程记录；失败时返回默认值。
#[tauri::command]
pub async fn load_settings(state: State<'_, AppState>) -> Result<UserSettings, String> {
    Ok(state.persistence().load_settings().await)
}

/// 保存设置
///
/// # 错误
/// Base URL 为空或不以 http 开头时拒绝保存；后端写入失败不会报错（已记录日志）
#[tauri::command]
pub async fn save_settings(
    settings: UserSettings,
    state: State<'_, AppState>,
) -> Result<UserSettings, String> {
    settings.validate()?;
    Ok(state.persistence().save_settings(settings).await)
}
