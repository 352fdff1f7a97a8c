//! # 论文笔记修复的确定性部分
//!
//! 修复阶段的 LLM 调用在 `pipeline` 中完成；本模块只包含纯字符串变换：
//! - `normalize_line_endings` - 统一换行符为 `\n`
//! - `strip_wrapping_fence` - 去掉包裹整段输出的代码围栏
//! - `cleanup_markdown` - 把被误写成代码块的短术语折叠为行内代码
//!
//! ## 代码块折叠规则
//! 对每个两侧不是反引号的 ```` ``` ... ``` ```` 代码块：
//! 1. 开头围栏同一行的信息串必须为空，或匹配 `^[\w-]+$` 且长度 < 20
//! 2. 块体必须恰好有一行非空内容（没有换行的块直接取内部文本）
//! 3. 该内容 < 80 个字符，不含反引号、`; { ( =`，也不含
//!    `import ` / `def ` / `class ` / `function ` 关键字
//!
//! 满足条件的块变为 `` `content` ``，其余保持原样。
//! 变换反复应用直到不再变化，因此天然幂等。

use std::sync::LazyLock;

use regex::Regex;

/// 匹配一个完整的围栏代码块（非贪婪，跨行）
static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

/// 语言标签
static INFO_STRING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+$").unwrap());

/// 语言标签的最大长度（不含）
const MAX_INFO_LEN: usize = 20;

/// 可折叠内容的最大字符数（不含）
const MAX_INLINE_LEN: usize = 80;

/// 出现即视为代码的字符
const CODE_CHARS: [char; 4] = [';', '{', '(', '='];

/// 出现即视为代码的关键字
const CODE_KEYWORDS: [&str; 4] = ["import ", "def ", "class ", "function "];

/// 可被剥离的外层围栏语言标签
const WRAPPER_TAGS: [&str; 3] = ["markdown", "md", "json"];

/// 将 `\r\n` 和孤立的 `\r` 统一为 `\n`
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// 去掉包裹整段文本的代码围栏
///
/// 接受 ```` ```markdown ````、```` ```md ````、```` ```json ```` 以及无标签的围栏。
/// 无标签时，如果内部还有位于行首的 ```` ``` ````，说明文本本身以代码块开头和
/// 结尾，而不是被整体包裹，此时不做剥离。
///
/// # 返回值
/// 剥离后的内容（已去除首尾空白）；不满足条件时返回去除首尾空白的原文
pub fn strip_wrapping_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() < 6 || !trimmed.starts_with("```") || !trimmed.ends_with("```") {
        return trimmed;
    }

    let Some((first_line, rest)) = trimmed.split_once('\n') else {
        return trimmed;
    };
    let tag = first_line[3..].trim();
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };

    if tag.is_empty() {
        if inner.contains("\n```") {
            return trimmed;
        }
    } else if !WRAPPER_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t)) {
        return trimmed;
    }

    inner.trim()
}

/// 把误写成代码块的短术语折叠为行内代码
///
/// 纯函数，无副作用；`cleanup_markdown(cleanup_markdown(x)) == cleanup_markdown(x)`。
pub fn cleanup_markdown(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = collapse_pass(&current);
        // 每次折叠都会删除反引号，所以循环必然终止
        if next == current {
            return current;
        }
        current = next;
    }
}

/// 执行一轮折叠
fn collapse_pass(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for captures in FENCED_BLOCK_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        let before_is_tick = whole.start() > 0 && bytes[whole.start() - 1] == b'`';
        let after_is_tick = bytes.get(whole.end()) == Some(&b'`');
        if before_is_tick || after_is_tick {
            continue;
        }

        if let Some(content) = inline_candidate(inner.as_str()) {
            output.push_str(&text[last..whole.start()]);
            output.push('`');
            output.push_str(content);
            output.push('`');
            last = whole.end();
        }
    }

    output.push_str(&text[last..]);
    output
}

/// 判断代码块内部是否可以折叠，返回折叠后的内容
///
/// 可折叠的形态：只有一行非空内容；或开头围栏没有语言标记时，
/// 两行非空内容且第一行像语言标记（标记被丢弃）。
fn inline_candidate(inner: &str) -> Option<&str> {
    let content = match inner.split_once('\n') {
        Some((info, body)) => {
            let info = info.trim();
            let lines: Vec<&str> = body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            match lines.as_slice() {
                [line] if info.is_empty() || is_info_string(info) => *line,
                [tag, line] if info.is_empty() && is_info_string(tag) => *line,
                _ => return None,
            }
        }
        None => inner.trim(),
    };

    looks_like_term(content).then_some(content)
}

fn is_info_string(text: &str) -> bool {
    text.chars().count() < MAX_INFO_LEN && INFO_STRING_RE.is_match(text)
}

/// 短、且不像代码
fn looks_like_term(content: &str) -> bool {
    !content.is_empty()
        && content.chars().count() < MAX_INLINE_LEN
        && !content.contains('`')
        && !content.contains(CODE_CHARS)
        && !CODE_KEYWORDS.iter().any(|keyword| content.contains(keyword))
}
