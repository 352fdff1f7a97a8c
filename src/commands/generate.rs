//! # 生成 Tauri Command
//!
//! - `generate_document` - 生成思维导图和/或论文笔记并保存为工件

use tauri::State;

use crate::models::artifact::StoredArtifact;
use crate::models::generation::GenerationRequest;
use crate::services::state::AppState;

/// 生成并保存
///
/// 前端在上传文件或粘贴文本后调用。设置取自同步缓存，
/// 全部阶段成功后才创建工件，返回的工件可直接用于跳转详情页。
///
/// # 参数
/// - `request` - 内容（`pdf` / `image` 为 base64）、内容类型、模式和原始文件名
///
/// # 错误
/// 未配置 API 密钥、上游错误、模型输出无法解析，或生成成功但保存失败
#[tauri::command]
pub async fn generate_document(
    request: GenerationRequest,
    state: State<'_, AppState>,
) -> Result<StoredArtifact, String> {
    state
        .generate_and_save(request)
        .await
        .map_err(|e| e.to_string())
}
