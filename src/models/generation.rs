//! # 生成请求与结果
//!
//! 生成流水线的输入输出类型。`GenerationResult` 只在整个生成（含修复阶段）
//! 全部成功后才会产生，调用方据此创建持久化工件。

use serde::{Deserialize, Serialize};

use crate::models::artifact::{FileType, Mode, NewArtifact};
use crate::models::mindmap::{ProcessStep, Section};

/// 标题回退值：既没有模型标题也没有原始文件名时使用
pub const UNTITLED: &str = "Untitled";

/// 一次生成请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// `txt` 为纯文本，`pdf` / `image` 为 base64 编码的二进制数据
    pub content: String,

    pub file_type: FileType,

    pub mode: Mode,

    /// 上传时的文件名，用于标题回退和工件元数据
    #[serde(default)]
    pub original_filename: Option<String>,
}

/// 一次生成的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_steps: Option<Vec<ProcessStep>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_notes: Option<String>,

    /// 记录在工件上的模型：paper 模式为论文模型，其余为思维导图模型
    pub model_name: String,
}

impl GenerationResult {
    /// 转换为工件创建载荷
    pub fn into_new_artifact(self, request: &GenerationRequest) -> NewArtifact {
        NewArtifact {
            title: self.title,
            original_filename: request.original_filename.clone(),
            mode: request.mode,
            model_name: Some(self.model_name),
            file_type: request.file_type,
            data: self.sections,
            process_steps: self.process_steps,
            paper_notes: self.paper_notes,
        }
    }
}

/// 去掉文件扩展名得到回退标题
///
/// 例如 `"meeting.notes.txt"` → `"meeting.notes"`；没有扩展名时原样返回。
pub fn title_from_filename(filename: &str) -> Option<String> {
    let name = filename.trim();
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("weekly.txt").as_deref(), Some("weekly"));
        assert_eq!(title_from_filename("a.b.pdf").as_deref(), Some("a.b"));
        assert_eq!(title_from_filename("README").as_deref(), Some("README"));
        assert_eq!(title_from_filename(".pdf").as_deref(), Some(".pdf"));
        assert_eq!(title_from_filename("  "), None);
    }
}
