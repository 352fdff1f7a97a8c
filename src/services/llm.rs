//! # LLM chat/completions 客户端
//!
//! 对 OpenAI 兼容的 `/chat/completions` 接口发起非流式请求：
//! - 请求体：`{ model, messages: [system, user], temperature }`
//! - 用户内容：`txt` 为纯字符串；`pdf` / `image` 为附件 part + 简短文字指令 part
//! - 响应：取 `choices[0].message.content`
//!
//! ## 错误映射
//! - 响应 Content-Type 不是 JSON：带状态码和 100 字符响应预览的上游错误
//!   （通常意味着 Base URL 配错，返回了网页）
//! - 非 2xx：优先使用上游 JSON 中的 `error.message`，否则为通用状态码信息
//! - 响应结构缺失：解析错误
//!
//! 客户端本身不设超时，也不重试；需要超时的调用方（修复阶段）自行用
//! `tokio::time::timeout` 包裹。

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerationError;
use crate::models::artifact::FileType;
use crate::services::prompts;

/// 错误信息中响应体预览的最大字符数
const PREVIEW_CHARS: usize = 100;

/// 接口路径后缀
const COMPLETIONS_PATH: &str = "/chat/completions";

/// 用户消息内容：纯文本，或由多个类型化 part 组成的数组
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// 多模态内容 part
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    File { file: FileData },
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileData {
    pub filename: String,
    /// `data:<mime>;base64,<payload>` 形式的 data URL
    pub file_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl UserContent {
    /// 按内容类型构造用户消息
    ///
    /// - `Txt`：原文直接作为字符串内容
    /// - `Pdf`：`file` part（`data:application/pdf;base64,...`）+ 文字指令
    /// - `Image`：`image_url` part（`data:image/png;base64,...`）+ 文字指令
    pub fn for_input(file_type: FileType, content: &str) -> Self {
        match file_type {
            FileType::Txt => UserContent::Text(content.to_string()),
            FileType::Pdf => UserContent::Parts(vec![
                ContentPart::File {
                    file: FileData {
                        filename: "document.pdf".to_string(),
                        file_data: format!("data:application/pdf;base64,{}", content),
                    },
                },
                ContentPart::Text {
                    text: prompts::DOCUMENT_INSTRUCTION.to_string(),
                },
            ]),
            FileType::Image => UserContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{}", content),
                    },
                },
                ContentPart::Text {
                    text: prompts::IMAGE_INSTRUCTION.to_string(),
                },
            ]),
        }
    }
}

/// 一次 chat/completions 调用的参数
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user: UserContent,
    pub temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a UserContent,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 规范化接口地址
///
/// 去掉末尾的 `/`，如果用户填写的地址尚未包含 `/chat/completions`，则自动追加。
pub fn completions_url(base_url: &str) -> String {
    let url = base_url.trim().trim_end_matches('/');
    if url.ends_with(COMPLETIONS_PATH) {
        url.to_string()
    } else {
        format!("{}{}", url, COMPLETIONS_PATH)
    }
}

/// chat/completions 客户端
///
/// 内部的 `reqwest::Client` 持有连接池，整个应用共享一个实例。
#[derive(Debug, Clone, Default)]
pub struct LlmClient {
    http: Client,
}

impl LlmClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    /// 发起一次非流式补全请求，返回 `choices[0].message.content`
    pub async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, GenerationError> {
        let url = completions_url(request.base_url);
        let system = UserContent::Text(request.system_prompt.to_string());
        let body = ChatCompletionBody {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(request.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        if !is_json {
            let text = response.text().await.unwrap_or_default();
            log::error!("LLM 接口返回了非 JSON 响应 (HTTP {}): {}", status.as_u16(), url);
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message: format!(
                    "API returned non-JSON response (Status {}). Check your Base URL. Response preview: {}...",
                    status.as_u16(),
                    preview(&text)
                ),
            });
        }

        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|value| {
                    value
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| {
                    format!("API request failed with status {}", status.as_u16())
                });
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Parse(format!("无法解析接口响应: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Parse("响应中缺少 choices[0].message.content".to_string()))
    }
}

/// 截取响应体前若干字符（按字符而非字节，避免截断多字节字符）
fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
