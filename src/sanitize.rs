//! Response sanitization
//!
//! Generative backends intermittently leak prompt scaffolding (instruction
//! echoes, chat-template tokens, code fences) and stop mid-sentence. This
//! filter strips the known artifacts, drops trailing fragments and caps the
//! length. Discarding valid text is acceptable; letting garbage through is not.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SanitizerConfig;

/// Artifact patterns removed from raw output, matched across line boundaries
static ARTIFACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?s)###.*?###").unwrap(),
        Regex::new(r"(?s)Instruction:.*").unwrap(),
        Regex::new(r"(?s)System:.*").unwrap(),
        Regex::new(r#"(?s)\{"role".*?\}"#).unwrap(),
        Regex::new(r"(?s)<\|.*?\|>").unwrap(),
        Regex::new(r"(?s)```.*?```").unwrap(),
    ]
});

/// Leakage keywords; any survivor after stripping discards the whole response
const LEAKAGE_KEYWORDS: &[&str] = &["instruction", "system:", "###", "assistant"];

const TERMINALS: &[char] = &['.', '!', '?'];

/// Placeholder used when the backend produced (almost) nothing
pub fn silence_placeholder(name: &str) -> String {
    format!("{} remains silent, deep in thought.", name)
}

/// Placeholder used when the response leaked prompt scaffolding
pub fn leakage_placeholder(name: &str) -> String {
    format!("{} carefully considers the situation.", name)
}

/// Defensive cleaner for generated character text
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Clean raw backend output spoken by `name`
    pub fn clean(&self, raw: &str, name: &str) -> String {
        if raw.trim().chars().count() < self.config.min_chars {
            return silence_placeholder(name);
        }

        let mut text = raw.to_string();
        for pattern in ARTIFACT_PATTERNS.iter() {
            text = pattern.replace_all(&text, "").into_owned();
        }

        let lowered = text.to_lowercase();
        if LEAKAGE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            log::debug!("Discarding response for {}: leakage keyword survived stripping", name);
            return leakage_placeholder(name);
        }

        let text = repair_sentences(&text);
        let text = self.cap_length(&text);

        text.trim().to_string()
    }

    /// Truncate over-long text at the first sentence end after `cut_words`
    fn cap_length(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= self.config.max_words {
            return text.to_string();
        }

        let start = self.config.cut_words.min(words.len());
        match words[start..].iter().position(|w| w.ends_with(TERMINALS)) {
            Some(offset) => words[..=start + offset].join(" "),
            None => format!("{}...", words[..start].join(" ")),
        }
    }
}

/// Drop the trailing fragment after the last terminal mark.
///
/// Every terminal mark is normalised to `.` when the text has more than one
/// fragment; single-fragment text is returned untouched.
fn repair_sentences(text: &str) -> String {
    let fragments: Vec<&str> = lazy_regex::regex!(r"[.!?]").split(text).collect();
    if fragments.len() <= 1 {
        return text.to_string();
    }

    format!("{}.", fragments[..fragments.len() - 1].join("."))
}
