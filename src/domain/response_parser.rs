//! Tutor Response Parser - 模型分段输出解析
//!
//! 模型输出是自由文本，只是"期望"带有标签分段。支持的版式都以
//! [`SectionLayout`] 的形式显式声明，新增版式只需追加一个常量。
//!
//! 解析永远不会失败：最坏情况原样返回模型输出。

use once_cell::sync::Lazy;
use regex::Regex;

use super::turn::ParsedTutorResponse;

/// 分段在回复中的作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionRole {
    /// 目标语言句子
    Sentence,
    /// 母语释义
    Meaning,
    /// 跟读句子（长版式专有）
    Speak,
    /// 后续问题
    Next,
}

/// 一种分段版式
#[derive(Debug)]
pub struct SectionLayout {
    pub name: &'static str,
    pub headers: &'static [(&'static str, SectionRole)],
}

/// 长版式: "English sentence: … Hindi explanation: … Speak this: … Next question: …"
pub const LONG_FORM: SectionLayout = SectionLayout {
    name: "long_form",
    headers: &[
        ("English sentence", SectionRole::Sentence),
        ("Hindi explanation", SectionRole::Meaning),
        ("Speak this", SectionRole::Speak),
        ("Next question", SectionRole::Next),
    ],
};

/// 短版式: "English: … Hindi: … Next: …"
pub const SHORT_FORM: SectionLayout = SectionLayout {
    name: "short_form",
    headers: &[
        ("English", SectionRole::Sentence),
        ("Hindi", SectionRole::Meaning),
        ("Next", SectionRole::Next),
    ],
};

/// 所有已知版式
pub const LAYOUTS: &[&SectionLayout] = &[&LONG_FORM, &SHORT_FORM];

struct HeaderEntry {
    layout: &'static SectionLayout,
    role: SectionRole,
}

struct HeaderGrammar {
    /// 标签位于行首
    line_start: Regex,
    /// 标签出现在任意位置（模型把所有分段写在同一行时）
    inline: Regex,
    /// 按捕获组顺序排列
    entries: Vec<HeaderEntry>,
}

/// 所有版式的标签合成一个正则，每个标签一个捕获组。
/// 标签按长度降序排列，保证 "English sentence" 优先于 "English"。
static GRAMMAR: Lazy<HeaderGrammar> = Lazy::new(|| {
    let mut labels: Vec<(&'static str, HeaderEntry)> = LAYOUTS
        .iter()
        .flat_map(|layout| {
            layout
                .headers
                .iter()
                .map(move |(label, role)| (*label, HeaderEntry { layout, role: *role }))
        })
        .collect();
    labels.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let alternatives: Vec<String> = labels
        .iter()
        .map(|(label, _)| {
            let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
            format!("({})", words.join(r"\s+"))
        })
        .collect();

    // 允许 markdown 加粗: "**English:**" / "**English**:"
    let labels_pattern = format!(r"(?:{})[ \t]*\**[ \t]*:\**", alternatives.join("|"));
    let compile = |pattern: String| {
        Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid header grammar: {e}"))
    };
    let line_start = compile(format!(r"(?im)^[ \t]*\**[ \t]*{}", labels_pattern));
    let inline = compile(format!(r"(?i)\b{}", labels_pattern));
    let entries = labels.into_iter().map(|(_, entry)| entry).collect();

    HeaderGrammar {
        line_start,
        inline,
        entries,
    }
});

impl HeaderGrammar {
    /// (标签起点, 正文起点, 标签)
    fn headers<'g>(&'g self, regex: &Regex, text: &str) -> Vec<(usize, usize, &'g HeaderEntry)> {
        regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let index = (1..caps.len()).find(|i| caps.get(*i).is_some())?;
                Some((whole.start(), whole.end(), &self.entries[index - 1]))
            })
            .collect()
    }
}

/// 抽取出的一个分段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub layout: &'static str,
    pub role: SectionRole,
    /// 已去除首尾空白
    pub body: &'a str,
}

/// 按出现顺序抽取所有分段
///
/// 分段正文从标签后开始，到下一个已知标签或文本末尾为止。
/// 标签只在行首识别，正文里的 "English:" 不会截断分段；
/// 行首标签少于两个时（所有分段挤在同一行）退回到行内匹配。
pub fn extract_sections(text: &str) -> Vec<Section<'_>> {
    let grammar = &*GRAMMAR;

    let mut headers = grammar.headers(&grammar.line_start, text);
    if headers.len() < 2 {
        headers = grammar.headers(&grammar.inline, text);
    }

    headers
        .iter()
        .enumerate()
        .map(|(i, (_, body_start, entry))| {
            let body_end = headers.get(i + 1).map(|h| h.0).unwrap_or(text.len());
            Section {
                layout: entry.layout.name,
                role: entry.role,
                body: text[*body_start..body_end].trim(),
            }
        })
        .collect()
}

impl SectionLayout {
    /// 判断文本主要使用哪种版式（命中标签最多者，平局取先声明的）
    pub fn detect(text: &str) -> Option<&'static SectionLayout> {
        let sections = extract_sections(text);
        LAYOUTS
            .iter()
            .map(|layout| {
                let hits = sections.iter().filter(|s| s.layout == layout.name).count();
                (*layout, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .fold(None, |best: Option<(&'static SectionLayout, usize)>, (layout, hits)| {
                match best {
                    Some((_, best_hits)) if best_hits >= hits => best,
                    _ => Some((layout, hits)),
                }
            })
            .map(|(layout, _)| layout)
    }
}

fn first_non_empty<'a>(sections: &[Section<'a>], role: SectionRole) -> Option<&'a str> {
    sections
        .iter()
        .find(|s| s.role == role && !s.body.is_empty())
        .map(|s| s.body)
}

/// 解析导师回复
///
/// - 跟读部分：优先 "Speak this"，没有则用句子段
/// - 两者都有时：`跟读 + ". " + 后续问题`
/// - 只有一个时：单独使用该段
/// - 都没有时：原样返回模型输出
pub fn parse_tutor_response(raw: &str) -> ParsedTutorResponse {
    let sections = extract_sections(raw);

    let speak = first_non_empty(&sections, SectionRole::Speak)
        .or_else(|| first_non_empty(&sections, SectionRole::Sentence));
    let next = first_non_empty(&sections, SectionRole::Next);

    let speakable_text = match (speak, next) {
        (Some(speak), Some(next)) => format!("{}. {}", speak, next),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => raw.to_string(),
    };

    ParsedTutorResponse {
        full_text: raw.to_string(),
        speakable_text,
    }
}
