//! Order-preserving fallback keyword extractor.
//!
//! No ranking: strips code and punctuation, drops stopwords and short
//! tokens, and returns the first survivors in text order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{BASIC_STOPWORDS, KeywordExtractor, has_cjk, stopword_set, strip_code_spans};

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\x{4e00}-\x{9fff}\s]").expect("valid non-word regex"));

pub struct SimpleExtractor {
    stopwords: HashSet<String>,
}

impl SimpleExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stopwords: stopword_set(&[BASIC_STOPWORDS]),
        }
    }

    fn keep(&self, token: &str) -> bool {
        let len = token.chars().count();
        len >= 2 && !self.stopwords.contains(token) && (has_cjk(token) || len >= 3)
    }
}

impl Default for SimpleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor for SimpleExtractor {
    fn extract(&self, text: &str, k: usize) -> Vec<String> {
        let without_code = strip_code_spans(text);
        let clean = NON_WORD.replace_all(&without_code, " ");

        clean
            .split_whitespace()
            .filter(|token| self.keep(token))
            .take(k)
            .map(str::to_string)
            .collect()
    }

    fn name(&self) -> &'static str {
        "simple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_tokens_in_order() {
        let extractor = SimpleExtractor::new();
        let keywords = extractor.extract("Routing agents decide between tools quickly", 3);
        assert_eq!(keywords, vec!["Routing", "agents", "decide"]);
    }

    #[test]
    fn drops_short_latin_and_stopwords() {
        let extractor = SimpleExtractor::new();
        let keywords = extractor.extract("an ox is 的 提示链 go", 5);
        assert_eq!(keywords, vec!["提示链"]);
    }

    #[test]
    fn two_char_cjk_is_kept() {
        let extractor = SimpleExtractor::new();
        assert_eq!(extractor.extract("路由 反思", 5), vec!["路由", "反思"]);
    }

    #[test]
    fn ignores_code_and_punctuation() {
        let extractor = SimpleExtractor::new();
        let text = "Planning, (agents)!\n```\nsecret_code here\n```\nReflection.";
        let keywords = extractor.extract(text, 10);
        assert_eq!(keywords, vec!["Planning", "agents", "Reflection"]);
    }

    #[test]
    fn respects_limit_and_is_deterministic() {
        let extractor = SimpleExtractor::new();
        let text = "alpha beta gamma delta epsilon zeta";
        assert_eq!(extractor.extract(text, 2).len(), 2);
        assert_eq!(extractor.extract(text, 4), extractor.extract(text, 4));
        assert!(extractor.extract(text, 0).is_empty());
    }
}
