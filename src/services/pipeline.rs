//! # 生成流水线
//!
//! 把上传的内容和选定的模式变成思维导图和/或论文笔记：
//! 1. 按内容类型选择系统提示词，并追加输出语言指令
//! 2. API 密钥为空时立即返回配置错误，不发出任何网络请求
//! 3. `both` 模式并发发出两个请求，任一失败则整体失败（不返回部分结果）
//! 4. 思维导图响应去掉外层代码围栏后按 JSON 解析，兼容旧版纯数组格式
//! 5. 论文笔记经过修复阶段（LLM 修复 + 本地确定性清理）
//!
//! 修复阶段是全函数：超时、上游错误或空输出都会回退到本地清理，永不失败。

use std::time::Duration;

use futures_util::future::try_join;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerationError;
use crate::models::artifact::Mode;
use crate::models::generation::{GenerationRequest, GenerationResult, UNTITLED, title_from_filename};
use crate::models::mindmap::{MindMapDocument, PaperNotesDocument, ProcessStep, Section};
use crate::models::settings::UserSettings;
use crate::services::llm::{ChatRequest, LlmClient, UserContent};
use crate::services::prompts;
use crate::services::repair::{cleanup_markdown, normalize_line_endings, strip_wrapping_fence};

/// 思维导图请求的采样温度
const MIND_MAP_TEMPERATURE: f32 = 0.2;

/// 论文笔记请求的采样温度
const PAPER_TEMPERATURE: f32 = 0.3;

/// 修复请求的采样温度
const REPAIR_TEMPERATURE: f32 = 0.1;

/// 修复阶段的默认超时
pub const DEFAULT_REPAIR_TIMEOUT: Duration = Duration::from_secs(180);

/// 思维导图响应的对象格式
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MindMapPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    mind_map: Option<Vec<Section>>,
    #[serde(default)]
    process_flow: Option<Vec<ProcessStep>>,
}

/// 生成流水线
#[derive(Debug, Clone)]
pub struct Pipeline {
    llm: LlmClient,
    repair_timeout: Duration,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            llm: LlmClient::new(),
            repair_timeout: DEFAULT_REPAIR_TIMEOUT,
        }
    }

    /// 覆盖修复阶段超时
    pub fn with_repair_timeout(mut self, timeout: Duration) -> Self {
        self.repair_timeout = timeout;
        self
    }

    /// 执行一次完整生成
    ///
    /// # 参数
    /// - `settings` - 当前用户设置（通常来自同步设置缓存）
    /// - `request` - 内容、内容类型、模式和原始文件名
    ///
    /// # 返回值
    /// 全部阶段成功后的生成结果；论文笔记已经过修复阶段
    ///
    /// # 错误
    /// 配置错误、上游错误、网络错误或思维导图解析错误，均不重试
    pub async fn generate(
        &self,
        settings: &UserSettings,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        if !settings.has_api_key() {
            return Err(GenerationError::Configuration);
        }

        log::info!(
            "开始生成: mode={:?}, file_type={:?}, 内容长度={}",
            request.mode,
            request.file_type,
            request.content.len()
        );

        let mode = request.mode;
        let (mind_map, paper_notes) = match (mode.wants_mind_map(), mode.wants_paper_notes()) {
            (true, true) => {
                let (mind_map, notes) = try_join(
                    self.generate_mind_map(settings, request),
                    self.generate_paper_notes(settings, request),
                )
                .await?;
                (Some(mind_map), Some(notes))
            }
            (true, false) => (Some(self.generate_mind_map(settings, request).await?), None),
            (false, _) => (None, Some(self.generate_paper_notes(settings, request).await?)),
        };

        let paper_notes = match paper_notes {
            Some(notes) => Some(PaperNotesDocument {
                content: self.repair(settings, &notes.content).await,
                ..notes
            }),
            None => None,
        };

        let title = mind_map
            .as_ref()
            .map(|doc| doc.title.trim())
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .or_else(|| paper_notes.as_ref().map(|notes| notes.title.clone()))
            .unwrap_or_else(|| fallback_title(request));

        let model_name = if request.mode == Mode::Paper {
            settings.paper_reading_model_name.clone()
        } else {
            settings.model_name.clone()
        };

        let (sections, process_steps) = match mind_map {
            Some(doc) => (Some(doc.sections), Some(doc.process_steps)),
            None => (None, None),
        };

        log::info!("生成完成: title={}", title);

        Ok(GenerationResult {
            title,
            sections,
            process_steps,
            paper_notes: paper_notes.map(|notes| notes.content),
            model_name,
        })
    }

    async fn generate_mind_map(
        &self,
        settings: &UserSettings,
        request: &GenerationRequest,
    ) -> Result<MindMapDocument, GenerationError> {
        let system_prompt = prompts::mind_map_prompt(settings, request.file_type);
        let content = self
            .llm
            .complete(&ChatRequest {
                base_url: &settings.base_url,
                api_key: &settings.api_key,
                model: &settings.model_name,
                system_prompt: &system_prompt,
                user: UserContent::for_input(request.file_type, &request.content),
                temperature: MIND_MAP_TEMPERATURE,
            })
            .await?;
        parse_mind_map_response(&content)
    }

    async fn generate_paper_notes(
        &self,
        settings: &UserSettings,
        request: &GenerationRequest,
    ) -> Result<PaperNotesDocument, GenerationError> {
        let system_prompt = prompts::paper_prompt(settings);
        let content = self
            .llm
            .complete(&ChatRequest {
                base_url: &settings.base_url,
                api_key: &settings.api_key,
                model: &settings.paper_reading_model_name,
                system_prompt: &system_prompt,
                user: UserContent::for_input(request.file_type, &request.content),
                temperature: PAPER_TEMPERATURE,
            })
            .await?;
        Ok(PaperNotesDocument {
            title: fallback_title(request),
            content,
        })
    }

    /// 修复论文笔记的 Markdown 格式
    ///
    /// 先统一换行符，再用固定的格式修复提示词调用一次模型（受超时约束）。
    /// 成功时去掉外层围栏后做本地清理；API 密钥为空、超时、上游错误或空输出时，
    /// 直接对原文做本地清理。失败只记录 warn 日志，不向调用方传播。
    pub async fn repair(&self, settings: &UserSettings, markdown: &str) -> String {
        let normalized = normalize_line_endings(markdown);
        if !settings.has_api_key() {
            return cleanup_markdown(&normalized);
        }

        let request = ChatRequest {
            base_url: &settings.base_url,
            api_key: &settings.api_key,
            model: &settings.model_name,
            system_prompt: prompts::REPAIR_PROMPT,
            user: UserContent::Text(normalized.clone()),
            temperature: REPAIR_TEMPERATURE,
        };

        let outcome = match tokio::time::timeout(self.repair_timeout, self.llm.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.repair_timeout.as_secs())),
        };

        match outcome {
            Ok(fixed) if !fixed.trim().is_empty() => {
                let fixed = normalize_line_endings(&fixed);
                cleanup_markdown(strip_wrapping_fence(&fixed))
            }
            Ok(_) => {
                log::warn!("格式修复返回空内容，改用本地清理");
                cleanup_markdown(&normalized)
            }
            Err(e) => {
                log::warn!("格式修复失败，改用本地清理: {}", e);
                cleanup_markdown(&normalized)
            }
        }
    }
}

/// 解析思维导图响应
///
/// 接受两种格式：
/// - `{ "title", "mindMap", "processFlow" }` 对象
/// - 旧版的纯 Section 数组（无标题和流程）
///
/// 先尝试去掉外层围栏；仍无法解析时，再去掉文本中所有的 ```` ```json ```` /
/// ```` ``` ```` 标记重试一次。
///
/// # 错误
/// 两次都不是合法 JSON，或 JSON 既不是对象也不是数组时返回 `GenerationError::Parse`
pub fn parse_mind_map_response(content: &str) -> Result<MindMapDocument, GenerationError> {
    let value: Value = serde_json::from_str(strip_wrapping_fence(content))
        .or_else(|_| serde_json::from_str(remove_fence_markers(content).trim()))
        .map_err(|e| GenerationError::Parse(e.to_string()))?;

    match value {
        Value::Array(_) => {
            let sections: Vec<Section> =
                serde_json::from_value(value).map_err(|e| GenerationError::Parse(e.to_string()))?;
            Ok(MindMapDocument {
                title: String::new(),
                sections,
                process_steps: Vec::new(),
            })
        }
        Value::Object(_) => {
            let payload: MindMapPayload =
                serde_json::from_value(value).map_err(|e| GenerationError::Parse(e.to_string()))?;
            Ok(MindMapDocument {
                title: payload.title.unwrap_or_default().trim().to_string(),
                sections: payload.mind_map.unwrap_or_default(),
                process_steps: payload.process_flow.unwrap_or_default(),
            })
        }
        _ => Err(GenerationError::Parse("模型输出既不是 JSON 对象也不是数组".to_string())),
    }
}

/// 原始文件名去掉扩展名，没有文件名时为 `Untitled`
fn fallback_title(request: &GenerationRequest) -> String {
    request
        .original_filename
        .as_deref()
        .and_then(title_from_filename)
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn remove_fence_markers(content: &str) -> String {
    content.replace("```json", "").replace("```", "")
}
