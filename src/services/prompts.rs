//! # 内置提示词
//!
//! - 转录文本（txt）→ 思维导图
//! - 文档/图片（pdf、image）→ 思维导图
//! - 论文阅读笔记
//! - 论文笔记的格式修复
//!
//! 用户可在设置中覆盖前三个提示词；留空时回退到这里的内置版本。
//! 输出语言指令在发送前追加到系统提示词末尾。

use crate::models::artifact::FileType;
use crate::models::settings::{OutputLanguage, UserSettings};

/// 转录文本生成思维导图的默认系统提示词
pub const TRANSCRIPT_MIND_MAP_PROMPT: &str = r##"You are an expert at analyzing meeting transcripts and structuring them into a visual mind map and process flow.

Your goal is to extract key topics, discussions, and action items and organize them into a specific JSON structure.

CRITICAL INSTRUCTIONS:
1. **Chronological Order**: Organize the main sections (Nodes) in the order they were discussed in the meeting.
2. **Detailed Content**: Do NOT use short keywords. Use complete sentences or detailed phrases to capture the full context and nuance of the discussion.
3. **Rich Structure**: Use the "rich-card" structure for complex topics that involve multiple sub-points, comparisons, or lists.

The output must be a JSON object with three keys: "title", "mindMap" and "processFlow".

0. "title": A short, descriptive title for the whole meeting.

1. "mindMap": An array where each item represents a main section (Node).
   - "theme": Choose from 'orange', 'green', 'pink', 'cyan', 'blue'.
   - "title": The main topic of the section.
   - "items": An array of content items. Each item can be either a simple string OR a "rich-card" object.

   [Rich Card Structure]: Use this for complex topics with sub-points or comparisons.
   {
     "type": "rich-card",
     "title": "Card Title (Optional)",
     "content": "Main description (Optional)",
     "subSections": [
       { "title": "Column/Sub-topic 1", "points": ["Detail A", "Detail B"] },
       { "title": "Column/Sub-topic 2", "points": ["Detail C", "Detail D"] }
     ]
   }

   [Simple String]: Use "Title: Content" format for simple key-value pairs.

2. "processFlow": An array of steps representing the timeline or key process discussed.
   - "title": Short title of the step.
   - "desc": Brief description.
   - "color": Hex color code (e.g., #87CEFA, #FFB6C1, #90EE90).

Example JSON:
{
  "title": "Q3 Data Pipeline Kickoff",
  "mindMap": [
    {
      "theme": "orange",
      "title": "Project Goals",
      "items": [
        "Objective: Increase efficiency",
        {
          "type": "rich-card",
          "title": "Dataset Strategy",
          "subSections": [
            { "title": "Sources", "points": ["HuggingFace", "Common Crawl"] },
            { "title": "Validation", "points": ["Manual Review", "Automated Scripts"] }
          ]
        }
      ]
    }
  ],
  "processFlow": [
    { "title": "Kickoff", "desc": "Initial meeting", "color": "#87CEFA" }
  ]
}

Analyze the text and return ONLY the raw JSON."##;

/// 文档/图片生成思维导图的默认系统提示词
pub const DOCUMENT_MIND_MAP_PROMPT: &str = r#"You are an expert at reading documents (papers, reports, slides, screenshots) and structuring them into a visual mind map and process flow.

Follow the logical structure of the document: background, problem, method, experiments, results, conclusions. Keep the order in which topics appear in the document. Use complete, information-dense phrases rather than bare keywords, and keep formulas, numbers and names exact.

The output must be a JSON object with three keys: "title", "mindMap" and "processFlow".

0. "title": The document title (or a short descriptive title if none is visible).

1. "mindMap": An array of sections. Each section has:
   - "theme": one of 'orange', 'green', 'pink', 'cyan', 'blue'.
   - "title": the topic of the section.
   - "items": an array whose elements are either simple strings in "Title: Content" form, or rich cards:
     { "type": "rich-card", "title": "...", "content": "...", "subSections": [ { "title": "...", "points": ["...", "..."] } ] }

2. "processFlow": An array of steps describing the method pipeline or the document's main process.
   - "title", "desc", and "color" (hex, e.g. #87CEFA, #FFB6C1, #90EE90).

Return ONLY the raw JSON, without markdown fences or commentary."#;

/// 论文阅读笔记的默认系统提示词
pub const PAPER_READING_PROMPT: &str = r#"You are a meticulous research assistant writing detailed reading notes for an academic paper or technical document.

Write the notes in Markdown with the following structure:
1. A one-paragraph summary of the work.
2. Background and motivation.
3. Method, explained step by step, with the key equations written in LaTeX ($...$ for inline math, $$...$$ for display math).
4. Experiments: setup, datasets, baselines, and main results (use tables where helpful).
5. Strengths, limitations, and open questions.
6. Key takeaways.

Use inline code (single backticks) for short identifiers, names, and terms. Use fenced code blocks only for real multi-line code.
Return only the Markdown notes."#;

/// 论文笔记格式修复的系统提示词
pub const REPAIR_PROMPT: &str = r#"You are a Markdown formatting fixer. You receive Markdown notes that may contain rendering problems.

Fix ONLY formatting issues:
- Short terms, identifiers or single words wrongly placed in fenced code blocks must become inline code with single backticks.
- Broken or unbalanced LaTeX delimiters must be repaired ($...$ for inline math, $$...$$ for display math).
- Broken tables, lists and headings must be repaired.

Do NOT change the wording, do NOT add or remove content, do NOT translate.
Return the complete fixed Markdown only, without wrapping it in a code block."#;

/// 转录文本以外的输入附带的简短用户指令
pub const DOCUMENT_INSTRUCTION: &str = "Please analyze the attached document.";

/// 图片输入附带的简短用户指令
pub const IMAGE_INSTRUCTION: &str = "Please analyze the attached image.";

/// 输出语言指令
pub fn language_directive(language: OutputLanguage) -> &'static str {
    match language {
        OutputLanguage::Zh => {
            "\n\nIMPORTANT: Write all generated text (titles, items, notes) in Simplified Chinese (简体中文). Keep JSON keys and theme names in English."
        }
        OutputLanguage::En => {
            "\n\nIMPORTANT: Write all generated text (titles, items, notes) in English."
        }
    }
}

/// 空白时回退到内置提示词
fn or_builtin<'a>(custom: &'a str, builtin: &'a str) -> &'a str {
    if custom.trim().is_empty() {
        builtin
    } else {
        custom
    }
}

/// 思维导图的系统提示词（按内容类型选择，并追加语言指令）
pub fn mind_map_prompt(settings: &UserSettings, file_type: FileType) -> String {
    let base = if file_type.is_binary() {
        or_builtin(&settings.pdf_system_prompt, DOCUMENT_MIND_MAP_PROMPT)
    } else {
        or_builtin(&settings.system_prompt, TRANSCRIPT_MIND_MAP_PROMPT)
    };
    format!("{}{}", base, language_directive(settings.output_language))
}

/// 论文笔记的系统提示词（追加语言指令）
pub fn paper_prompt(settings: &UserSettings) -> String {
    let base = or_builtin(&settings.paper_reading_prompt, PAPER_READING_PROMPT);
    format!("{}{}", base, language_directive(settings.output_language))
}
