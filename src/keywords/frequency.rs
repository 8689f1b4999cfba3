//! TF-IDF keyword extraction over jieba segmentation.
//!
//! Text is cleaned of code, markdown marks and URLs, then segmented by jieba
//! with the domain vocabulary registered as nouns. Words are ranked by TF-IDF
//! against jieba's bundled IDF table; only nouns, verbal nouns and verbs are
//! considered, and stopwords and single characters are dropped afterwards.

use std::collections::HashSet;
use std::sync::LazyLock;

use jieba_rs::{Jieba, KeywordExtract, TfIdf};
use regex::Regex;

use super::{BASIC_STOPWORDS, EXTENDED_STOPWORDS, KeywordExtractor, stopword_set, strip_code_spans};

static MARKDOWN_MARKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_~`\[\]]").expect("valid markdown marks regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
static SPECIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\x{4e00}-\x{9fff}\s.,!?;:，。！？；：]").expect("valid special char regex")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Dictionary frequency for vocabulary terms, high enough to win segmentation.
const DOMAIN_WORD_FREQ: usize = 1000;

/// Part-of-speech tag given to vocabulary terms.
const DOMAIN_WORD_TAG: &str = "n";

/// Part-of-speech tags eligible for ranking.
const ALLOWED_POS: &[&str] = &["n", "vn", "v"];

pub struct FrequencyExtractor {
    jieba: Jieba,
    tfidf: TfIdf,
    stopwords: HashSet<String>,
}

impl FrequencyExtractor {
    /// Create an extractor with `vocabulary` added to jieba's dictionary.
    #[must_use]
    pub fn new(vocabulary: &[String]) -> Self {
        let mut jieba = Jieba::new();
        for word in vocabulary.iter().map(|w| w.trim()).filter(|w| !w.is_empty()) {
            jieba.add_word(word, Some(DOMAIN_WORD_FREQ), Some(DOMAIN_WORD_TAG));
        }

        Self {
            jieba,
            tfidf: TfIdf::default(),
            stopwords: stopword_set(&[BASIC_STOPWORDS, EXTENDED_STOPWORDS]),
        }
    }

    fn preprocess(text: &str) -> String {
        let text = strip_code_spans(text);
        let text = MARKDOWN_MARKS.replace_all(&text, " ");
        let text = URL.replace_all(&text, "");
        let text = SPECIAL.replace_all(&text, " ");
        WHITESPACE.replace_all(&text, " ").trim().to_string()
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(&token.to_lowercase())
    }
}

impl KeywordExtractor for FrequencyExtractor {
    fn extract(&self, text: &str, k: usize) -> Vec<String> {
        let clean = Self::preprocess(text);
        if clean.is_empty() || k == 0 {
            return Vec::new();
        }

        let allowed_pos = ALLOWED_POS.iter().map(|p| (*p).to_string()).collect();
        self.tfidf
            .extract_keywords(&self.jieba, &clean, k, allowed_pos)
            .into_iter()
            .map(|keyword| keyword.keyword)
            .filter(|word| word.chars().count() >= 2 && !self.is_stopword(word))
            .take(k)
            .collect()
    }

    fn name(&self) -> &'static str {
        "frequency"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::DOMAIN_WORDS;

    fn extractor() -> FrequencyExtractor {
        let vocabulary: Vec<String> = DOMAIN_WORDS.iter().map(|w| (*w).to_string()).collect();
        FrequencyExtractor::new(&vocabulary)
    }

    #[test]
    fn segments_cjk_into_real_words() {
        let keywords = extractor().extract("提示链模式是一种强大的范式。", 10);

        assert!(keywords.contains(&"提示链".to_string()));
        assert!(!keywords.iter().any(|k| k == "种强大"));
        assert!(!keywords.iter().any(|k| k.chars().count() < 2));
    }

    #[test]
    fn vocabulary_term_is_one_word() {
        let ex = extractor();
        let words = ex.jieba.cut("多智能体协作需要记忆管理", false);
        assert!(words.contains(&"多智能体协作"));
        assert!(words.contains(&"记忆管理"));
    }

    #[test]
    fn extra_vocabulary_is_used() {
        let ex = FrequencyExtractor::new(&["护栏机制".to_string()]);
        assert!(ex.jieba.cut("护栏机制保护系统", false).contains(&"护栏机制"));
        assert!(ex.extract("护栏机制保护系统", 5).contains(&"护栏机制".to_string()));
    }

    #[test]
    fn stopwords_are_dropped() {
        let keywords = extractor().extract("使用工具调用数据库。使用模型。使用检索。", 10);
        assert!(!keywords.iter().any(|k| k == "使用"));
        assert!(keywords.contains(&"数据库".to_string()));
    }

    #[test]
    fn code_and_urls_are_ignored() {
        let text = "See https://example.com/page\n```python\nimport secretmodule\n```\n智能体调用外部系统";
        let keywords = extractor().extract(text, 10);
        assert!(!keywords.iter().any(|k| k.contains("secretmodule")));
        assert!(!keywords.iter().any(|k| k.contains("example")));
        assert!(keywords.contains(&"智能体".to_string()));
    }

    #[test]
    fn deterministic_and_limited() {
        let ex = extractor();
        let text = "智能体使用工具。智能体规划任务。路由模式根据输入选择处理器。";
        let first = ex.extract(text, 2);
        assert_eq!(first, ex.extract(text, 2));
        assert!(first.len() <= 2);
        assert!(ex.extract("", 4).is_empty());
        assert!(ex.extract(text, 0).is_empty());
    }
}
