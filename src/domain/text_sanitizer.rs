//! Text Sanitizer - 合成前的文本清洗
//!
//! 只作用于交给 TTS 的文本，返回给调用方的文本保持原样。

use once_cell::sync::Lazy;
use regex::Regex;

/// markdown 强调标记
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_]").unwrap_or_else(|e| panic!("invalid emphasis pattern: {e}")));

/// 白名单之外的字符：单词字符、空白、基本标点
static NOT_SPEAKABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^\w\s.,?!;:$'"-]"#)
        .unwrap_or_else(|e| panic!("invalid speakable pattern: {e}"))
});

/// 清洗待合成文本
///
/// 幂等：`sanitize_for_speech(sanitize_for_speech(x)) == sanitize_for_speech(x)`
pub fn sanitize_for_speech(text: &str) -> String {
    let without_emphasis = EMPHASIS.replace_all(text, "");
    let speakable = NOT_SPEAKABLE.replace_all(&without_emphasis, "");
    speakable.trim().to_string()
}
