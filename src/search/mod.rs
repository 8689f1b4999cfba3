//! Search backend trait and types.

pub mod scan;

#[cfg(feature = "ranked")]
pub mod tantivy;

use crate::chunker::{DocumentChunk, SectionType};
use crate::corpus::ChunkCorpus;

/// Characters of chunk content shown in a result.
pub const SNIPPET_CHARS: usize = 120;

/// Options for filtering and limiting search results.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub chapter: Option<String>,
    pub section: Option<SectionType>,
    /// Edit distance for fuzzy matching (ranked backend only).
    pub fuzzy: Option<u8>,
}

impl SearchOptions {
    /// True if the chunk passes the chapter and section filters.
    #[must_use]
    pub fn accepts(&self, chunk: &DocumentChunk) -> bool {
        let chapter_ok = self.chapter.as_deref().is_none_or(|wanted| {
            chunk
                .metadata
                .base
                .chapter
                .as_ref()
                .is_some_and(|c| c.chapter_id == wanted)
        });
        let section_ok = self
            .section
            .is_none_or(|wanted| chunk.metadata.section_type == Some(wanted));

        chapter_ok && section_ok
    }
}

/// A single matching chunk.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub chapter_id: Option<String>,
    /// Chunk file the result came from.
    pub source: String,
    pub snippet: String,
    pub score: Option<f32>,
}

impl SearchResult {
    #[must_use]
    pub fn from_chunk(chunk: &DocumentChunk, source: &str, score: Option<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            title: chunk.metadata.title.clone(),
            chapter_id: chunk.metadata.base.chapter.as_ref().map(|c| c.chapter_id.clone()),
            source: source.to_string(),
            snippet: snippet(&chunk.content),
            score,
        }
    }
}

/// First line-collapsed characters of a chunk.
#[must_use]
pub fn snippet(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{cut}…")
}

/// Trait for search backends (scan, tantivy).
pub trait SearchBackend: Send + Sync {
    /// Search the corpus for chunks matching the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the search operation fails.
    fn search(
        &self,
        query: &str,
        corpus: &ChunkCorpus,
        options: &SearchOptions,
    ) -> anyhow::Result<Vec<SearchResult>>;
}
