//! # 思维导图与论文笔记数据模型
//!
//! 定义了生成流水线产出的结构化文档：
//! - `MindMapDocument` / `Section` / `Item` - 思维导图主体
//! - `ProcessStep` - 流程时间线
//! - `PaperNotesDocument` - 论文阅读笔记（Markdown + LaTeX）
//!
//! 所有结构体均派生 `Serialize` 和 `Deserialize`，字段名使用 camelCase，
//! 与前端组件和已持久化的 JSON 数据保持一致。
//!
//! ## 容错策略
//! 模型输出的 JSON 并不总是严格符合约定，反序列化一律采用宽松策略：
//! - 未知或缺失的 `theme` 回退为 `blue`
//! - `items` 中的元素可以是字符串，也可以是对象（简单条目或富卡片）
//! - 缺失或为 `null` 的数组和标题字段视为空
//! - 流程步骤的颜色缺失、为 `null` 或空白时使用浅蓝色

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 流程步骤的默认颜色（浅蓝色）
pub const DEFAULT_STEP_COLOR: &str = "#87CEFA";

/// 完整的思维导图文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapDocument {
    /// 文档标题
    pub title: String,

    /// 主题分区：按模型给出的顺序保存，顺序有意义（通常为讨论的时间顺序）
    pub sections: Vec<Section>,

    /// 流程时间线：可能为空
    #[serde(default)]
    pub process_steps: Vec<ProcessStep>,
}

/// 分区配色主题
///
/// 只接受五种取值；其他任何值（包括 `null` 和缺失）在数据校验边界统一回退为 `Blue`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Theme {
    Orange,
    Green,
    Pink,
    Cyan,
    #[default]
    Blue,
}

impl From<Option<String>> for Theme {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some("orange") => Theme::Orange,
            Some("green") => Theme::Green,
            Some("pink") => Theme::Pink,
            Some("cyan") => Theme::Cyan,
            _ => Theme::Blue,
        }
    }
}

/// 思维导图中的一个主题分区
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub theme: Theme,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
}

/// 分区中的条目
///
/// 三种形态：
/// - `Text` - 裸字符串（旧数据和 prompt 中 "Title: Content" 形式的简单条目）
/// - `Simple` - `{ "content": "..." }` 对象形式的简单条目
/// - `RichCard` - 带子栏目的富卡片
///
/// 序列化时保持原有形态：裸字符串仍写回裸字符串，对象仍写回对象，
/// 保证保存时数据原样往返。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item {
    Text(String),
    Simple(SimpleItem),
    RichCard(RichCard),
}

/// 简单条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleItem {
    pub content: String,
}

/// 富卡片类型标记，序列化为 `"type": "rich-card"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RichCardTag {
    #[default]
    #[serde(rename = "rich-card")]
    RichCard,
}

/// 富卡片：用于包含多个子要点或对比的复杂主题
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichCard {
    #[serde(rename = "type", default, skip_deserializing)]
    pub kind: RichCardTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_sections: Vec<SubSection>,
}

/// 富卡片中的子栏目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubSection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub points: Vec<String>,
}

/// 流程时间线中的一个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// 十六进制颜色；缺失、`null` 或空白时为浅蓝色
    #[serde(default = "default_step_color", deserialize_with = "step_color")]
    pub color: String,
}

fn default_step_color() -> String {
    DEFAULT_STEP_COLOR.to_string()
}

fn step_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|color| color.trim().to_string())
        .filter(|color| !color.is_empty())
        .unwrap_or_else(default_step_color))
}

/// `null` 与缺失同等对待
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 论文阅读笔记文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperNotesDocument {
    pub title: String,
    /// 含 LaTeX 数学公式片段的 Markdown 文本
    pub content: String,
}

impl SimpleItem {
    /// 按第一个冒号拆分为（标签，正文），仅用于展示
    ///
    /// 不包含冒号时返回 `None`。存储的 `content` 始终保持不变。
    pub fn label_and_body(&self) -> Option<(&str, &str)> {
        let (label, body) = self.content.split_once(':')?;
        Some((label.trim(), body.trim()))
    }
}

impl Item {
    /// 提取简单条目（字符串或 `{content}` 对象），富卡片返回 `None`
    pub fn as_simple(&self) -> Option<SimpleItem> {
        match self {
            Item::Text(text) => Some(SimpleItem {
                content: text.clone(),
            }),
            Item::Simple(item) => Some(item.clone()),
            Item::RichCard(_) => None,
        }
    }
}

impl From<SimpleItem> for Item {
    /// 简单条目还原为裸字符串形态（前端编辑器保存的就是这种形态）
    fn from(item: SimpleItem) -> Self {
        Item::Text(item.content)
    }
}

impl<'de> Deserialize<'de> for Item {
    /// 宽松反序列化
    ///
    /// - 字符串 → `Text`
    /// - 含 `subSections` 或 `type == "rich-card"` 的对象 → `RichCard`
    /// - 含字符串 `content` 的其他对象 → `Simple`
    /// - 其余对象 → 默认字段的 `RichCard`
    /// - 数字、布尔等标量 → 转成字符串的 `Text`
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let item = match value {
            Value::String(text) => Item::Text(text),
            Value::Object(map) => {
                let is_card = map.contains_key("subSections")
                    || map.get("type").and_then(Value::as_str) == Some("rich-card");
                let simple_content = match map.get("content") {
                    Some(Value::String(content)) if !is_card => Some(content.clone()),
                    _ => None,
                };
                match simple_content {
                    Some(content) => Item::Simple(SimpleItem { content }),
                    None => Item::RichCard(
                        serde_json::from_value(Value::Object(map))
                            .map_err(serde::de::Error::custom)?,
                    ),
                }
            }
            Value::Null => Item::Text(String::new()),
            Value::Array(_) => {
                return Err(serde::de::Error::custom("mind map item cannot be an array"));
            }
            other => Item::Text(other.to_string()),
        };
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_round_trips_through_simple_item() {
        for original in ["hello world", "", "多字节 文本", "trailing space "] {
            let item: Item = serde_json::from_value(json!(original)).unwrap();
            let simple = item.as_simple().unwrap();
            let back = Item::from(simple);
            assert_eq!(serde_json::to_value(&back).unwrap(), json!(original));
        }
    }

    #[test]
    fn test_colon_split_is_display_only() {
        let item: Item = serde_json::from_value(json!("Owner: John: Doe")).unwrap();
        let simple = item.as_simple().unwrap();
        assert_eq!(simple.label_and_body(), Some(("Owner", "John: Doe")));
        // 存储形态不变
        assert_eq!(serde_json::to_value(&item).unwrap(), json!("Owner: John: Doe"));
    }

    #[test]
    fn test_object_items_keep_their_shape() {
        let items: Vec<Item> = serde_json::from_value(json!([
            { "content": "Objective: efficiency" },
            {
                "type": "rich-card",
                "title": "Dataset",
                "subSections": [{ "title": "Sources", "points": ["HF", "CC"] }]
            }
        ]))
        .unwrap();

        assert!(matches!(items[0], Item::Simple(_)));
        match &items[1] {
            Item::RichCard(card) => {
                assert_eq!(card.title.as_deref(), Some("Dataset"));
                assert_eq!(card.sub_sections[0].points, vec!["HF", "CC"]);
            }
            other => panic!("expected rich card, got {other:?}"),
        }

        let value = serde_json::to_value(&items).unwrap();
        assert_eq!(value[0], json!({ "content": "Objective: efficiency" }));
        assert_eq!(value[1]["type"], json!("rich-card"));
        assert_eq!(value[1]["subSections"][0]["title"], json!("Sources"));
    }

    #[test]
    fn test_unknown_theme_falls_back_to_blue() {
        let sections: Vec<Section> = serde_json::from_value(json!([
            { "theme": "purple", "title": "A", "items": [] },
            { "theme": null, "title": "B" },
            { "title": "C" },
            { "theme": "pink", "title": "D" }
        ]))
        .unwrap();

        let themes: Vec<Theme> = sections.iter().map(|s| s.theme).collect();
        assert_eq!(themes, vec![Theme::Blue, Theme::Blue, Theme::Blue, Theme::Pink]);
        assert!(sections[1].items.is_empty());
    }

    #[test]
    fn test_process_step_color_default() {
        let step: ProcessStep = serde_json::from_value(json!({ "title": "Kickoff" })).unwrap();
        assert_eq!(step.color, DEFAULT_STEP_COLOR);
        assert_eq!(step.desc, None);
    }

    #[test]
    fn test_null_and_blank_fields_fall_back() {
        let steps: Vec<ProcessStep> = serde_json::from_value(json!([
            { "title": "A", "color": null },
            { "title": null, "color": "  " },
            { "title": "C", "color": "#FFB6C1" }
        ]))
        .unwrap();
        let colors: Vec<&str> = steps.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, vec![DEFAULT_STEP_COLOR, DEFAULT_STEP_COLOR, "#FFB6C1"]);
        assert_eq!(steps[1].title, "");

        let section: Section =
            serde_json::from_value(json!({ "title": null, "items": null })).unwrap();
        assert_eq!(section.title, "");
        assert!(section.items.is_empty());

        let card: RichCard = serde_json::from_value(json!({
            "subSections": [{ "title": null, "points": null }]
        }))
        .unwrap();
        assert_eq!(card.sub_sections, vec![SubSection::default()]);
    }
}
