//! Prompt Builder - 导师提示词
//!
//! 把转写文本代入固定模板。模板要求三段式短输出，
//! 下游解析器依赖这个低方差的输出形状。

/// 提示词模板，`{transcript}` 是唯一的替换点
pub const TUTOR_PROMPT_TEMPLATE: &str = "\
You are a spoken English teacher for a Hindi speaker.

User said in Hindi:
{transcript}

Your task:
1. Give a natural English sentence the user can speak.
2. Give its simple Hindi meaning.
3. Ask ONE short follow-up question in English for conversation practice.

Rules:
- Keep it short
- No explanations
- Output in this exact format

English:
Hindi:
Next:
";

const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

/// 构建导师提示词
///
/// 只替换一次：转写文本里即使出现 `{transcript}` 也原样保留
pub fn build_tutor_prompt(transcript: &str) -> String {
    match TUTOR_PROMPT_TEMPLATE.split_once(TRANSCRIPT_PLACEHOLDER) {
        Some((head, tail)) => {
            let mut prompt = String::with_capacity(TUTOR_PROMPT_TEMPLATE.len() + transcript.len());
            prompt.push_str(head);
            prompt.push_str(transcript.trim());
            prompt.push_str(tail);
            prompt
        }
        None => TUTOR_PROMPT_TEMPLATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_transcript() {
        let prompt = build_tutor_prompt("मुझे पानी चाहिए");
        assert!(prompt.contains("User said in Hindi:\nमुझे पानी चाहिए\n"));
        assert!(!prompt.contains(TRANSCRIPT_PLACEHOLDER));
    }

    #[test]
    fn test_prompt_declares_all_sections() {
        let prompt = build_tutor_prompt("hello");
        assert!(prompt.starts_with("You are a spoken English teacher for a Hindi speaker."));
        assert!(prompt.ends_with("English:\nHindi:\nNext:\n"));
        assert!(prompt.contains("No explanations"));
    }

    #[test]
    fn test_placeholder_in_transcript_is_not_expanded() {
        let prompt = build_tutor_prompt("say {transcript} twice");
        assert!(prompt.contains("say {transcript} twice"));
        assert_eq!(prompt.matches("{transcript}").count(), 1);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_tutor_prompt(" hi "), build_tutor_prompt("hi"));
    }
}
