//! # 工件（Artifact）数据模型
//!
//! 一次成功的生成运行对应一个持久化工件，包含思维导图和/或论文笔记以及元数据。
//!
//! - `StoredArtifact` - 已持久化的工件（本地 JSON 与 IPC 传输都使用 camelCase）
//! - `NewArtifact` - 创建载荷，不含 id / 时间戳 / 图标颜色（由存储层分配）
//! - `ArtifactUpdate` - 局部更新载荷，只有 `Some` 的字段会被写入

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::mindmap::{ProcessStep, Section};

/// 生成模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    MindMap,
    Paper,
    Both,
}

impl Mode {
    /// 是否需要生成思维导图
    pub fn wants_mind_map(self) -> bool {
        matches!(self, Mode::MindMap | Mode::Both)
    }

    /// 是否需要生成论文笔记
    pub fn wants_paper_notes(self) -> bool {
        matches!(self, Mode::Paper | Mode::Both)
    }
}

/// 上传内容类型
///
/// `Txt` 的内容为纯文本；`Pdf` / `Image` 的内容为 base64 编码的二进制数据。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Txt,
    Pdf,
    Image,
}

impl FileType {
    /// 是否以文件/图片附件形式发送给模型
    pub fn is_binary(self) -> bool {
        !matches!(self, FileType::Txt)
    }
}

/// 工件卡片的图标颜色
///
/// 无法识别的取值回退为 `Green`（与列表页的默认配色一致）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum IconColor {
    Blue,
    #[default]
    Green,
    Orange,
    Purple,
    Pink,
    Cyan,
    Emerald,
    Indigo,
}

impl IconColor {
    /// 随机分配时使用的完整调色板
    pub const PALETTE: [IconColor; 8] = [
        IconColor::Blue,
        IconColor::Green,
        IconColor::Orange,
        IconColor::Purple,
        IconColor::Pink,
        IconColor::Cyan,
        IconColor::Emerald,
        IconColor::Indigo,
    ];

    /// 解析颜色名，无法识别时返回 `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "blue" => Some(IconColor::Blue),
            "green" => Some(IconColor::Green),
            "orange" => Some(IconColor::Orange),
            "purple" => Some(IconColor::Purple),
            "pink" => Some(IconColor::Pink),
            "cyan" => Some(IconColor::Cyan),
            "emerald" => Some(IconColor::Emerald),
            "indigo" => Some(IconColor::Indigo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IconColor::Blue => "blue",
            IconColor::Green => "green",
            IconColor::Orange => "orange",
            IconColor::Purple => "purple",
            IconColor::Pink => "pink",
            IconColor::Cyan => "cyan",
            IconColor::Emerald => "emerald",
            IconColor::Indigo => "indigo",
        }
    }
}

impl From<Option<String>> for IconColor {
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .and_then(IconColor::parse)
            .unwrap_or_default()
    }
}

/// 已持久化的工件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    /// 不透明标识：本地为毫秒时间戳，远程由服务端分配
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(default)]
    pub file_type: FileType,

    /// 思维导图分区
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Section>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_steps: Option<Vec<ProcessStep>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_notes: Option<String>,

    #[serde(default)]
    pub icon_color: IconColor,

    /// 创建时间（ISO 8601）
    #[serde(default)]
    pub created_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// 工件创建载荷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtifact {
    pub title: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default)]
    pub data: Option<Vec<Section>>,
    #[serde(default)]
    pub process_steps: Option<Vec<ProcessStep>>,
    #[serde(default)]
    pub paper_notes: Option<String>,
}

/// 工件局部更新载荷
///
/// 只有显式给出的字段会被写入，省略的字段保持原值（不会被置空）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Section>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_steps: Option<Vec<ProcessStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

impl ArtifactUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.data.is_none()
            && self.process_steps.is_none()
            && self.paper_notes.is_none()
            && self.mode.is_none()
    }

    /// 将更新应用到已有工件上（仅覆盖给出的字段）
    pub fn apply_to(&self, artifact: &mut StoredArtifact) {
        if let Some(title) = &self.title {
            artifact.title = title.clone();
        }
        if let Some(data) = &self.data {
            artifact.data = Some(data.clone());
        }
        if let Some(steps) = &self.process_steps {
            artifact.process_steps = Some(steps.clone());
        }
        if let Some(notes) = &self.paper_notes {
            artifact.paper_notes = Some(notes.clone());
        }
        if let Some(mode) = self.mode {
            artifact.mode = mode;
        }
    }
}

/// 同时接受字符串和数字形式的 id（远程表的主键可能是 bigint）
pub(crate) fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid artifact id: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StoredArtifact {
        serde_json::from_value(json!({
            "id": "1700000000000",
            "title": "Weekly sync",
            "mode": "both",
            "fileType": "pdf",
            "data": [{ "theme": "green", "title": "Goals", "items": ["Owner: Ann"] }],
            "processSteps": [{ "title": "Kickoff", "color": "#90EE90" }],
            "paperNotes": "# Notes",
            "iconColor": "indigo",
            "createdAt": "2026-01-01T00:00:00.000Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_title_only_update_keeps_content() {
        let mut artifact = sample();
        let before = artifact.clone();
        let update = ArtifactUpdate {
            title: Some("X".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut artifact);

        assert_eq!(artifact.title, "X");
        assert_eq!(artifact.data, before.data);
        assert_eq!(artifact.process_steps, before.process_steps);
        assert_eq!(artifact.paper_notes, before.paper_notes);
        assert_eq!(artifact.mode, Mode::Both);
    }

    #[test]
    fn test_update_serializes_only_present_fields() {
        let update = ArtifactUpdate {
            paper_notes: Some("fixed".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "paperNotes": "fixed" }));
        assert!(ArtifactUpdate::default().is_empty());
    }

    #[test]
    fn test_numeric_id_and_unknown_icon_color() {
        let artifact: StoredArtifact = serde_json::from_value(json!({
            "id": 42,
            "title": "t",
            "iconColor": "magenta"
        }))
        .unwrap();
        assert_eq!(artifact.id, "42");
        assert_eq!(artifact.icon_color, IconColor::Green);
        assert_eq!(artifact.mode, Mode::MindMap);
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(serde_json::to_value(Mode::MindMap).unwrap(), json!("mindmap"));
        assert_eq!(serde_json::to_value(Mode::Both).unwrap(), json!("both"));
        assert!(Mode::Both.wants_mind_map() && Mode::Both.wants_paper_notes());
        assert!(!Mode::Paper.wants_mind_map());
    }
}
