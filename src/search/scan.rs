//! In-process scan backend.
//!
//! Matches query terms case-insensitively against chunk content, titles and
//! keywords. Needs no index, so it is the default.

use crate::corpus::ChunkCorpus;
use crate::search::{SearchBackend, SearchOptions, SearchResult};

/// Score added per term found in the chunk keywords.
const KEYWORD_BONUS: f32 = 2.0;

/// Score added per term found in the chunk title.
const TITLE_BONUS: f32 = 1.5;

/// Search backend that scans every loaded chunk.
pub struct ScanBackend;

impl ScanBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScanBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBackend for ScanBackend {
    fn search(
        &self,
        query: &str,
        corpus: &ChunkCorpus,
        options: &SearchOptions,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(vec![]);
        }

        let mut results = Vec::new();

        for file in &corpus.files {
            for chunk in &file.chunks {
                if !options.accepts(chunk) {
                    continue;
                }

                let content = chunk.content.to_lowercase();
                let title = chunk.metadata.title.to_lowercase();
                let keywords: Vec<String> =
                    chunk.metadata.keywords.iter().map(|k| k.to_lowercase()).collect();

                let mut score = 0.0_f32;
                let mut all_matched = true;
                for term in &terms {
                    #[allow(clippy::cast_precision_loss)]
                    let hits = content.matches(term.as_str()).count() as f32;
                    if hits == 0.0 {
                        all_matched = false;
                        break;
                    }
                    score += hits;
                    if keywords.iter().any(|k| k.contains(term.as_str())) {
                        score += KEYWORD_BONUS;
                    }
                    if title.contains(term.as_str()) {
                        score += TITLE_BONUS;
                    }
                }

                if all_matched {
                    results.push(SearchResult::from_chunk(chunk, &file.name, Some(score)));
                }
            }
        }

        // Stable sort keeps corpus order for equal scores.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if let Some(limit) = options.limit {
            results.truncate(limit);
        }

        Ok(results)
    }
}
