//! Markdown document chunking.
//!
//! [`DocumentChunker`] walks a chapter file line by line, closing chunks at
//! headings, paragraph boundaries and the size limit while keeping fenced
//! code intact, and tags each chunk with chapter, heading and keyword
//! metadata.

pub mod metadata;
pub mod state;

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::keywords::{ExtractorKind, KeywordExtractor, build_extractor};

pub use metadata::{BaseMetadata, ChapterInfo, ChunkMetadata, SectionType};
pub use state::{ChunkEmission, ChunkState, Heading};

/// Default lower chunk size in characters (accepted, not enforced).
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 200;

/// Default upper chunk size in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 800;

/// Default number of keywords per chunk.
pub const DEFAULT_MAX_KEYWORDS: usize = 5;

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+").expect("valid list item regex"));
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+").expect("valid numbered item regex"));

/// One retrievable slice of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// `chapter_<id>_block_<nnn>`, unique within one document.
    pub id: String,
    /// Trimmed chunk text, never empty.
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Chunk size settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerOptions {
    /// Smallest desired chunk. Stored for callers; splitting never merges
    /// small chunks.
    pub min_chunk_size: usize,
    /// A chunk is closed once its joined text reaches this many characters,
    /// except inside code fences.
    pub max_chunk_size: usize,
    pub max_keywords: usize,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self {
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }
}

/// Splits markdown chapters into [`DocumentChunk`]s.
pub struct DocumentChunker {
    options: ChunkerOptions,
    extractor: Box<dyn KeywordExtractor>,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(ChunkerOptions::default(), build_extractor(ExtractorKind::default(), &[]))
    }
}

impl DocumentChunker {
    #[must_use]
    pub fn new(options: ChunkerOptions, extractor: Box<dyn KeywordExtractor>) -> Self {
        Self { options, extractor }
    }

    #[must_use]
    pub fn options(&self) -> &ChunkerOptions {
        &self.options
    }

    #[must_use]
    pub fn extractor(&self) -> &dyn KeywordExtractor {
        self.extractor.as_ref()
    }

    /// Split a markdown file into chunks.
    ///
    /// Read or decode failures are logged and yield an empty list.
    #[must_use]
    pub fn split_file(&self, path: &Path) -> Vec<DocumentChunk> {
        match self.try_split_file(path) {
            Ok(chunks) => {
                info!(
                    file = %path.display(),
                    chunks = chunks.len(),
                    "split document"
                );
                chunks
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read document");
                Vec::new()
            }
        }
    }

    /// Split a markdown file, returning read and decode failures.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read as UTF-8 text.
    pub fn try_split_file(&self, path: &Path) -> std::io::Result<Vec<DocumentChunk>> {
        let text = fs::read_to_string(path)?;
        Ok(self.split_text(path, &text))
    }

    /// Split in-memory markdown; `path` only feeds the base metadata.
    #[must_use]
    pub fn split_text(&self, path: &Path, text: &str) -> Vec<DocumentChunk> {
        let base = BaseMetadata::from_path(path);
        let mut state = ChunkState::new(self.options.max_chunk_size);

        let mut chunks: Vec<DocumentChunk> = text
            .lines()
            .filter_map(|line| state.on_line(line))
            .map(|emission| self.build_chunk(&base, emission))
            .collect();

        if let Some(emission) = state.finish() {
            chunks.push(self.build_chunk(&base, emission));
        }

        debug!(
            file = %base.file_name,
            chunks = chunks.len(),
            extractor = self.extractor.name(),
            "chunking pass finished"
        );
        chunks
    }

    fn build_chunk(&self, base: &BaseMetadata, emission: ChunkEmission) -> DocumentChunk {
        let ChunkEmission {
            block_index,
            content,
            heading,
            section_type,
        } = emission;

        let id = format!("chapter_{}_block_{block_index:03}", base.chapter_id());
        let keywords = self.extractor.extract(&content, self.options.max_keywords);

        let metadata = ChunkMetadata {
            base: base.clone(),
            section_type,
            block_index,
            word_count: content.split_whitespace().count(),
            char_count: content.chars().count(),
            title_level: heading.level(),
            title: heading.title().to_string(),
            has_code: has_code(&content),
            has_list: has_list(&content),
            keywords,
        };

        DocumentChunk {
            id,
            content,
            metadata,
        }
    }
}

#[must_use]
pub fn has_code(content: &str) -> bool {
    content.contains(state::CODE_FENCE)
}

/// True when the chunk opens with a bulleted or numbered list item.
#[must_use]
pub fn has_list(content: &str) -> bool {
    LIST_ITEM.is_match(content) || NUMBERED_ITEM.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::SimpleExtractor;

    fn chunker(max: usize) -> DocumentChunker {
        DocumentChunker::new(
            ChunkerOptions {
                max_chunk_size: max,
                ..ChunkerOptions::default()
            },
            Box::new(SimpleExtractor::new()),
        )
    }

    fn split(text: &str) -> Vec<DocumentChunk> {
        chunker(DEFAULT_MAX_CHUNK_SIZE).split_text(Path::new("07-Chapter-01-Prompt-Chaining.md"), text)
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn level_two_sections_are_typed() {
            let text = "## 概述\n提示链把复杂任务拆成小步骤。\n\n## 应用案例\n信息处理流程。\n\n## 要点\n拆解问题。\n";
            let chunks = split(text);

            assert_eq!(chunks.len(), 3);
            let types: Vec<_> = chunks.iter().map(|c| c.metadata.section_type).collect();
            assert_eq!(
                types,
                vec![
                    Some(SectionType::Overview),
                    Some(SectionType::Application),
                    Some(SectionType::Takeaway)
                ]
            );
            assert!(chunks.iter().all(|c| c.metadata.title_level == 2));
            assert_eq!(chunks[1].metadata.title, "应用案例");
        }

        #[test]
        fn long_paragraph_splits_on_size() {
            let line = "x".repeat(99);
            let text = vec![line; 10].join("\n");
            assert_eq!(text.chars().count(), 999);

            let chunks = split(&text);
            assert_eq!(chunks.len(), 2);
            assert!(chunks[0].metadata.char_count >= DEFAULT_MAX_CHUNK_SIZE);
            for chunk in &chunks {
                assert_eq!(chunk.metadata.title_level, 0);
                assert_eq!(chunk.metadata.title, "");
            }
        }

        #[test]
        fn code_fence_is_never_split() {
            let mut text = String::from("Intro paragraph line\n```python\n");
            for i in 0..50 {
                text.push_str(&format!("value_{i} = compute({i}) + offset_{i}\n"));
            }
            text.push_str("```\nAfter the code.\n");

            let chunks = split(&text);
            let code_chunk = chunks.iter().find(|c| c.metadata.has_code).unwrap();

            assert!(code_chunk.content.contains("```python"));
            assert!(code_chunk.content.contains("value_0 ="));
            assert!(code_chunk.content.contains("value_49 ="));
            assert_eq!(code_chunk.content.matches("```").count(), 2);
            assert!(code_chunk.metadata.char_count > DEFAULT_MAX_CHUNK_SIZE);
        }

        #[test]
        fn rule_before_heading_stays_in_chunk() {
            let chunks = split("a\nb\n\n---\n\n## 概述\nbody\n- item\n");

            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks[1].content, "---\n\n## 概述\nbody\n- item");
            assert_eq!(chunks[1].id, "chapter_07_block_001");
            assert_eq!(chunks[1].metadata.title, "概述");
            assert_eq!(chunks[1].metadata.section_type, Some(SectionType::Overview));
            assert!(!chunks[1].metadata.has_list);
        }

        #[test]
        fn plain_file_has_no_chapter_fields() {
            let chunks = chunker(800).split_text(Path::new("plain.md"), "# Title\nbody text");
            assert_eq!(chunks.len(), 1);
            assert!(chunks[0].metadata.base.chapter.is_none());
            assert_eq!(chunks[0].id, "chapter_unknown_block_000");

            let json = serde_json::to_value(&chunks[0]).unwrap();
            assert!(json["metadata"].get("chapter_id").is_none());
            assert_eq!(json["metadata"]["file_name"], "plain.md");
        }
    }

    mod property_tests {
        use super::*;

        const MIXED: &str = "# 第一章\n\n---\n\n导言段落。\n\n## 概述\n- 第一点\n- 第二点\n\n***\n\n\n## 示例\n```\n# inside code\n\n```\n1. step one\n___\n";

        #[test]
        fn idempotent() {
            assert_eq!(split(MIXED), split(MIXED));
        }

        #[test]
        fn block_indexes_are_dense() {
            let chunks = split(MIXED);
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.metadata.block_index, i);
                assert_eq!(chunk.id, format!("chapter_07_block_{i:03}"));
            }
        }

        #[test]
        fn no_empty_or_rule_only_chunks() {
            for chunk in split(MIXED) {
                let trimmed = chunk.content.trim();
                assert!(!trimmed.is_empty());
                assert!(!["---", "***", "___"].contains(&trimmed));
            }
        }

        #[test]
        fn chapter_fields_are_stable() {
            let chunks = split(MIXED);
            assert!(!chunks.is_empty());
            for chunk in &chunks {
                let chapter = chunk.metadata.base.chapter.as_ref().unwrap();
                assert_eq!(chapter.chapter_id, "07");
                assert_eq!(chapter.chapter_name_cn, "第一章：提示链");
            }
        }

        #[test]
        fn heading_inside_code_is_not_a_title() {
            let chunks = split(MIXED);
            assert!(chunks.iter().all(|c| c.metadata.title != "inside code"));
        }
    }

    mod metadata_tests {
        use super::*;

        #[test]
        fn counts_and_flags() {
            let chunks = split("## 示例\nSome words here\n- item\n```\ncode\n```");
            let meta = &chunks[0].metadata;

            assert_eq!(meta.word_count, 10);
            assert_eq!(meta.char_count, chunks[0].content.chars().count());
            assert!(meta.has_code);
            assert!(!meta.has_list);
            assert_eq!(meta.section_type, Some(SectionType::Example));
            assert!(meta.keywords.len() <= DEFAULT_MAX_KEYWORDS);
        }

        #[test]
        fn list_detection_anchors_at_chunk_start() {
            assert!(has_list("- item\nmore"));
            assert!(has_list("  * nested"));
            assert!(has_list("12. numbered\nrest"));
            assert!(!has_list("intro\n- item"));
            assert!(!has_list("-no space\n3.no space"));
        }

        #[test]
        fn heading_led_list_is_not_flagged() {
            let chunks = split("## 要点\n- one\n- two");
            assert!(!chunks[0].metadata.has_list);

            let chunks = split("- one\n- two");
            assert!(chunks[0].metadata.has_list);
        }

        #[test]
        fn keywords_follow_extractor() {
            let chunks = split("Reflection improves agents through critique loops");
            assert_eq!(
                chunks[0].metadata.keywords,
                vec!["Reflection", "improves", "agents", "through", "critique"]
            );
        }

        #[test]
        fn metadata_serializes_in_order() {
            let chunks = split("## 概述\ntext");
            let json = serde_json::to_string(&chunks[0].metadata).unwrap();
            let chapter_pos = json.find("\"chapter_id\"").unwrap();
            let file_pos = json.find("\"file_path\"").unwrap();
            let section_pos = json.find("\"section_type\"").unwrap();
            let index_pos = json.find("\"block_index\"").unwrap();
            assert!(chapter_pos < file_pos && file_pos < section_pos && section_pos < index_pos);
        }

        #[test]
        fn chunk_round_trips_through_json() {
            let chunk = split("## 要点\n- one\n- two").remove(0);
            let json = serde_json::to_string(&chunk).unwrap();
            let back: DocumentChunk = serde_json::from_str(&json).unwrap();
            assert_eq!(back, chunk);
        }
    }

    #[test]
    fn missing_file_yields_empty() {
        let chunks = chunker(800).split_file(Path::new("/nonexistent/dir/01-x.md"));
        assert!(chunks.is_empty());
    }

    #[test]
    fn invalid_utf8_yields_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("03-bad.md");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();
        assert!(chunker(800).split_file(&path).is_empty());
        assert!(chunker(800).try_split_file(&path).is_err());
    }

    #[test]
    fn file_and_text_splits_agree() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("07-Chapter-01-Prompt-Chaining.md");
        let text = "## 概述\n提示链。\n\n## 要点\n- 拆解\n";
        fs::write(&path, text).unwrap();

        let chunker = chunker(800);
        assert_eq!(chunker.try_split_file(&path).unwrap(), chunker.split_text(&path, text));
        assert_eq!(chunker.split_file(&path).len(), 2);
    }
}
