//! # 工件 Tauri Commands
//!
//! 列表、读取、局部更新和删除。持久化层的错误已在内部降级，
//! 这里的 command 不会失败：找不到或后端不可用时分别返回空列表、`null` 或 `false`。

use tauri::State;

use crate::models::artifact::{ArtifactUpdate, StoredArtifact};
use crate::services::state::AppState;

/// 全部工件，新的在前
#[tauri::command]
pub async fn list_artifacts(state: State<'_, AppState>) -> Result<Vec<StoredArtifact>, String> {
    Ok(state.persistence().list_artifacts().await)
}

#[tauri::command]
pub async fn get_artifact(
    id: String,
    state: State<'_, AppState>,
) -> Result<Option<StoredArtifact>, String> {
    Ok(state.persistence().get_artifact(&id).await)
}

/// 局部更新工件
///
/// 详情页编辑标题、节点文本、流程步骤或笔记后调用；省略的字段保持不变。
///
/// # 参数
/// - `id` - 工件 id
/// - `update` - 只包含需要修改的字段
#[tauri::command]
pub async fn update_artifact(
    id: String,
    update: ArtifactUpdate,
    state: State<'_, AppState>,
) -> Result<Option<StoredArtifact>, String> {
    if update.is_empty() {
        return Ok(state.persistence().get_artifact(&id).await);
    }
    Ok(state.persistence().update_artifact(&id, update).await)
}

#[tauri::command]
pub async fn delete_artifact(id: String, state: State<'_, AppState>) -> Result<bool, String> {
    Ok(state.persistence().delete_artifact(&id).await)
}
