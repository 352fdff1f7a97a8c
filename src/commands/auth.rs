//! # 登录 Tauri Commands
//!
//! - `sign_in` - 邮箱密码登录，成功后加载远程设置
//! - `sign_out` - 登出并清空设置缓存
//! - `get_current_identity` - 当前登录身份（未登录为 `null`）

use tauri::State;

use crate::services::identity::Identity;
use crate::services::state::AppState;

/// 邮箱密码登录
///
/// # 错误
/// 未配置 Supabase、凭据错误或网络错误
#[tauri::command]
pub async fn sign_in(
    email: String,
    password: String,
    state: State<'_, AppState>,
) -> Result<Identity, String> {
    state
        .sign_in(&email, &password)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn sign_out(state: State<'_, AppState>) -> Result<(), String> {
    state.sign_out().await;
    Ok(())
}

#[tauri::command]
pub async fn get_current_identity(state: State<'_, AppState>) -> Result<Option<Identity>, String> {
    Ok(state.current_identity().await)
}
