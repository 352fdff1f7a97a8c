//! # 用户设置数据模型
//!
//! 定义了 `UserSettings`（API 凭据、模型名称、提示词、输出语言、图标颜色偏好）
//! 及其取值枚举。每个身份恰好对应一条设置记录；匿名时每个本地安装对应一条。
//!
//! 本地存储与 IPC 传输使用 camelCase 字段；远程表的 snake_case 行映射在
//! `services::storage::remote` 中完成。

use serde::{Deserialize, Serialize};

use crate::models::artifact::IconColor;
use crate::services::prompts;

/// 默认的 OpenAI 兼容接口地址
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// 默认的思维导图模型
pub const DEFAULT_MODEL_NAME: &str = "gpt-4o";

/// 默认的论文阅读模型
pub const DEFAULT_PAPER_MODEL_NAME: &str = "gemini-2.5-pro-thinking";

/// 输出语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum OutputLanguage {
    #[default]
    Zh,
    En,
}

impl From<Option<String>> for OutputLanguage {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some("en") => OutputLanguage::En,
            _ => OutputLanguage::Zh,
        }
    }
}

impl OutputLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputLanguage::Zh => "zh",
            OutputLanguage::En => "en",
        }
    }
}

/// 图标颜色偏好：随机，或固定为调色板中的某个颜色
///
/// 线上格式是单个字符串：`"random"` 或颜色名。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum IconColorPreference {
    #[default]
    Random,
    Fixed(IconColor),
}

impl From<Option<String>> for IconColorPreference {
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .and_then(IconColor::parse)
            .map_or(IconColorPreference::Random, IconColorPreference::Fixed)
    }
}

impl From<IconColorPreference> for String {
    fn from(value: IconColorPreference) -> Self {
        match value {
            IconColorPreference::Random => "random".to_string(),
            IconColorPreference::Fixed(color) => color.as_str().to_string(),
        }
    }
}

/// 用户设置
///
/// 缺失字段一律取默认值，保证旧版本保存的设置文件仍可读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// API 密钥：远程存储时必须加密
    pub api_key: String,

    /// OpenAI 兼容接口的基础地址
    pub base_url: String,

    /// 思维导图（以及格式修复）使用的模型
    pub model_name: String,

    /// 论文笔记使用的模型
    pub paper_reading_model_name: String,

    /// 转录文本（txt）生成思维导图的系统提示词
    pub system_prompt: String,

    /// 文档/图片（pdf、image）生成思维导图的系统提示词
    pub pdf_system_prompt: String,

    /// 论文笔记的系统提示词
    pub paper_reading_prompt: String,

    pub output_language: OutputLanguage,

    pub icon_color_preference: IconColorPreference,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            paper_reading_model_name: DEFAULT_PAPER_MODEL_NAME.to_string(),
            system_prompt: prompts::TRANSCRIPT_MIND_MAP_PROMPT.to_string(),
            pdf_system_prompt: prompts::DOCUMENT_MIND_MAP_PROMPT.to_string(),
            paper_reading_prompt: prompts::PAPER_READING_PROMPT.to_string(),
            output_language: OutputLanguage::Zh,
            icon_color_preference: IconColorPreference::Random,
        }
    }
}

impl UserSettings {
    /// 校验设置是否可保存
    ///
    /// Base URL 不能为空，且必须以 http:// 或 https:// 开头。
    pub fn validate(&self) -> Result<(), String> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err("Base URL 不能为空".to_string());
        }
        if !base_url.starts_with("http") {
            return Err("Base URL 必须以 http:// 或 https:// 开头".to_string());
        }
        Ok(())
    }

    /// 是否已配置 API 密钥
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// 用默认值填充空白字段（模型名、地址、提示词）
    ///
    /// 远程记录和旧版本本地记录中可能存在空字符串字段，
    /// 读取后统一补齐，避免生成阶段拿到空提示词。
    pub fn fill_blanks(mut self) -> Self {
        let defaults = UserSettings::default();
        let fill = |field: &mut String, default: String| {
            if field.trim().is_empty() {
                *field = default;
            }
        };
        fill(&mut self.base_url, defaults.base_url);
        fill(&mut self.model_name, defaults.model_name);
        fill(&mut self.paper_reading_model_name, defaults.paper_reading_model_name);
        fill(&mut self.system_prompt, defaults.system_prompt);
        fill(&mut self.pdf_system_prompt, defaults.pdf_system_prompt);
        fill(&mut self.paper_reading_prompt, defaults.paper_reading_prompt);
        self
    }
}
