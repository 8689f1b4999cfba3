//! Command implementations shared by CLI and MCP server.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chunker::{ChunkerOptions, DocumentChunk, DocumentChunker};
use crate::cli::Backend;
use crate::config::Config;
use crate::corpus::{ChunkCorpus, markdown_files};
use crate::keywords::{ExtractorKind, build_extractor};
use crate::search::scan::ScanBackend;
use crate::search::{SearchBackend, SearchOptions, SearchResult};
use crate::storage::ChunkStore;
use crate::storage::local::LocalChunkStore;

#[cfg(feature = "ranked")]
use crate::search::tantivy::{IndexMode, TantivyBackend};

/// Per-invocation overrides for the configured chunker settings.
#[derive(Debug, Clone, Default)]
pub struct SplitOverrides {
    pub max_chunk_size: Option<usize>,
    pub min_chunk_size: Option<usize>,
    pub extractor: Option<ExtractorKind>,
}

/// Build a chunker from config, applying any overrides.
///
/// # Errors
///
/// Returns an error if the resulting maximum chunk size is zero.
pub fn build_chunker(config: &Config, overrides: &SplitOverrides) -> anyhow::Result<DocumentChunker> {
    let defaults = config.chunking.options();
    let options = ChunkerOptions {
        min_chunk_size: overrides.min_chunk_size.unwrap_or(defaults.min_chunk_size),
        max_chunk_size: overrides.max_chunk_size.unwrap_or(defaults.max_chunk_size),
        max_keywords: defaults.max_keywords,
    };

    if options.max_chunk_size == 0 {
        anyhow::bail!("max chunk size must be greater than zero");
    }

    let kind = overrides.extractor.unwrap_or(config.keywords.extractor);
    let extractor = build_extractor(kind, &config.keywords.domain_words);

    Ok(DocumentChunker::new(options, extractor))
}

/// Chunks produced from one source file.
#[derive(Debug, Clone)]
pub struct FileChunks {
    pub source: PathBuf,
    /// Where the chunks were written, if an output directory was given.
    pub output: Option<PathBuf>,
    pub chunks: Vec<DocumentChunk>,
}

/// Outcome of splitting one or more files.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub files: Vec<FileChunks>,
    pub failed: Vec<(PathBuf, String)>,
}

impl SplitReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|f| f.chunks.len()).sum()
    }
}

/// Split one file and optionally persist the result.
///
/// Goes through [`DocumentChunker::try_split_file`] so read failures reach
/// the report instead of becoming an empty chunk list.
fn split_one(
    chunker: &DocumentChunker,
    path: &Path,
    store: Option<&dyn ChunkStore>,
) -> anyhow::Result<FileChunks> {
    let chunks = chunker
        .try_split_file(path)
        .map_err(|e| anyhow::anyhow!("Read {}: {e}", path.display()))?;

    let output = match store {
        Some(store) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some(store.write_chunks(&stem, &chunks)?)
        }
        None => None,
    };

    info!(file = %path.display(), chunks = chunks.len(), "split file");
    Ok(FileChunks {
        source: path.to_path_buf(),
        output,
        chunks,
    })
}

/// Split every `*.md` file in `dir`, in file-name order.
///
/// A file that cannot be read or written is logged and counted as a failure;
/// the rest of the batch continues.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn batch_split(
    chunker: &DocumentChunker,
    dir: &Path,
    store: Option<&dyn ChunkStore>,
) -> anyhow::Result<SplitReport> {
    let files = markdown_files(dir)
        .map_err(|e| anyhow::anyhow!("Cannot list {}: {e}", dir.display()))?;

    if files.is_empty() {
        warn!(dir = %dir.display(), "no markdown files found");
    }

    let mut report = SplitReport::default();
    for file in files {
        match split_one(chunker, &file, store) {
            Ok(result) => report.files.push(result),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "split failed");
                report.failed.push((file, e.to_string()));
            }
        }
    }

    info!(
        files = report.succeeded(),
        failed = report.failed.len(),
        chunks = report.total_chunks(),
        "batch split finished"
    );
    Ok(report)
}

/// Split a file or a directory of files, writing into `output` when given.
///
/// # Errors
///
/// Returns an error if `input` does not exist or a directory cannot be listed.
pub fn split_path(
    chunker: &DocumentChunker,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<SplitReport> {
    let store = output.map(|dir| LocalChunkStore::new(dir.to_path_buf()));
    let store = store.as_ref().map(|s| s as &dyn ChunkStore);

    if input.is_dir() {
        return batch_split(chunker, input, store);
    }

    if !input.is_file() {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }

    let mut report = SplitReport::default();
    match split_one(chunker, input, store) {
        Ok(result) => report.files.push(result),
        Err(e) => {
            warn!(file = %input.display(), error = %e, "split failed");
            report.failed.push((input.to_path_buf(), e.to_string()));
        }
    }
    Ok(report)
}

/// Extract keywords from text with the selected extractor.
#[must_use]
pub fn keywords(
    text: &str,
    top_k: usize,
    kind: ExtractorKind,
    domain_words: &[String],
) -> Vec<String> {
    build_extractor(kind, domain_words).extract(text, top_k)
}

/// Search the chunk corpus under `chunks_dir`.
///
/// # Errors
///
/// Returns an error if the corpus cannot be loaded, the ranked index is
/// missing, or the backend fails.
pub fn search(
    query: &str,
    chunks_dir: &Path,
    options: &SearchOptions,
    backend: Backend,
) -> anyhow::Result<Vec<SearchResult>> {
    let corpus = ChunkCorpus::load(chunks_dir)?;
    search_corpus(query, &corpus, options, backend)
}

/// Search a loaded corpus using the specified backend.
///
/// # Errors
///
/// Returns an error if the selected backend fails.
pub fn search_corpus(
    query: &str,
    corpus: &ChunkCorpus,
    options: &SearchOptions,
    backend: Backend,
) -> anyhow::Result<Vec<SearchResult>> {
    match backend {
        Backend::Scan => ScanBackend::new().search(query, corpus, options),
        #[cfg(feature = "ranked")]
        Backend::Ranked => {
            if !TantivyBackend::index_exists(corpus) {
                anyhow::bail!(
                    "No index found for chunks at {}. Run `bookchunk index` first.",
                    corpus.root.display()
                );
            }
            let tantivy = TantivyBackend::open_for_corpus(corpus, IndexMode::ReadOnly)?;
            tantivy.search(query, corpus, options)
        }
        Backend::Auto => {
            // Auto-select: use Tantivy if index exists, otherwise scan
            #[cfg(feature = "ranked")]
            if TantivyBackend::index_exists(corpus) {
                let tantivy = TantivyBackend::open_for_corpus(corpus, IndexMode::ReadOnly)?;
                return tantivy.search(query, corpus, options);
            }

            ScanBackend::new().search(query, corpus, options)
        }
    }
}

/// Build or rebuild the search index for the chunk corpus.
///
/// Returns the number of chunks indexed.
///
/// # Errors
///
/// Returns an error if the corpus cannot be loaded or indexing fails.
#[cfg(feature = "ranked")]
pub fn index_all(chunks_dir: &Path) -> anyhow::Result<usize> {
    let corpus = ChunkCorpus::load(chunks_dir)?;
    let backend = TantivyBackend::open_for_corpus(&corpus, IndexMode::ReadWrite)?;
    backend.index_corpus(&corpus)?;
    Ok(corpus.chunk_count())
}

/// Chunk counts for a corpus.
#[derive(Debug, Default)]
pub struct CorpusStats {
    /// Chunk count per chunk file, in file order.
    pub files: Vec<(String, usize)>,
    /// Chunk count per section type label. Chunks without one count as `none`.
    pub sections: BTreeMap<String, usize>,
    pub total_chunks: usize,
    pub skipped: usize,
}

/// Summarize the chunk corpus under `chunks_dir`.
///
/// # Errors
///
/// Returns an error if the corpus cannot be loaded.
pub fn stats(chunks_dir: &Path) -> anyhow::Result<CorpusStats> {
    let corpus = ChunkCorpus::load(chunks_dir)?;
    Ok(corpus_stats(&corpus))
}

#[must_use]
pub fn corpus_stats(corpus: &ChunkCorpus) -> CorpusStats {
    let mut stats = CorpusStats {
        skipped: corpus.skipped.len(),
        ..Default::default()
    };

    for file in &corpus.files {
        stats.files.push((file.name.clone(), file.chunks.len()));
        stats.total_chunks += file.chunks.len();

        for chunk in &file.chunks {
            let label = chunk
                .metadata
                .section_type
                .map_or("none", |s| s.label());
            *stats.sections.entry(label.to_string()).or_default() += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::TempDir;

    const CHAPTER: &str = "## 概述\n提示链把复杂任务拆成步骤。\n\n## 应用案例\n报告生成流水线。\n";

    fn write_sources(dir: &Path) {
        fs::write(dir.join("07-Chapter-01-Prompt-Chaining.md"), CHAPTER).unwrap();
        fs::write(dir.join("08-Chapter-02-Routing.md"), "## 要点\n路由选择处理器。\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();
    }

    mod build_chunker_tests {
        use super::*;

        #[test]
        fn overrides_take_precedence() {
            let config = Config::default();
            let overrides = SplitOverrides {
                max_chunk_size: Some(300),
                min_chunk_size: Some(50),
                extractor: Some(ExtractorKind::Simple),
            };

            let chunker = build_chunker(&config, &overrides).unwrap();
            assert_eq!(chunker.options().max_chunk_size, 300);
            assert_eq!(chunker.options().min_chunk_size, 50);
            assert_eq!(chunker.extractor().name(), "simple");
        }

        #[test]
        fn config_defaults_apply() {
            let chunker = build_chunker(&Config::default(), &SplitOverrides::default()).unwrap();
            assert_eq!(chunker.options().max_chunk_size, 800);
            assert_eq!(chunker.extractor().name(), "frequency");
        }

        #[test]
        fn zero_max_is_rejected() {
            let overrides = SplitOverrides {
                max_chunk_size: Some(0),
                ..Default::default()
            };
            assert!(build_chunker(&Config::default(), &overrides).is_err());
        }
    }

    mod split_tests {
        use super::*;

        #[test]
        fn batch_split_writes_sorted_outputs() {
            let src = TempDir::new().unwrap();
            let out = TempDir::new().unwrap();
            write_sources(src.path());

            let chunker = DocumentChunker::default();
            let report = split_path(&chunker, src.path(), Some(out.path())).unwrap();

            assert_eq!(report.succeeded(), 2);
            assert!(report.failed.is_empty());
            assert_eq!(report.total_chunks(), 3);
            assert!(report.files[0].source.ends_with("07-Chapter-01-Prompt-Chaining.md"));
            assert!(out.path().join("07-Chapter-01-Prompt-Chaining_chunks.json").exists());
            assert!(out.path().join("08-Chapter-02-Routing_chunks.json").exists());
        }

        #[test]
        fn split_without_output_writes_nothing() {
            let src = TempDir::new().unwrap();
            write_sources(src.path());
            let file = src.path().join("08-Chapter-02-Routing.md");

            let report = split_path(&DocumentChunker::default(), &file, None).unwrap();

            assert_eq!(report.succeeded(), 1);
            assert!(report.files[0].output.is_none());
            assert_eq!(report.files[0].chunks[0].id, "chapter_08_block_000");
        }

        #[test]
        fn unreadable_file_is_counted_and_batch_continues() {
            let src = TempDir::new().unwrap();
            write_sources(src.path());
            fs::write(src.path().join("09-bad.md"), [0xff_u8, 0xfe, 0x00]).unwrap();

            let report = split_path(&DocumentChunker::default(), src.path(), None).unwrap();

            assert_eq!(report.succeeded(), 2);
            assert_eq!(report.failed.len(), 1);
            assert!(report.failed[0].0.ends_with("09-bad.md"));
        }

        #[test]
        fn missing_input_is_error() {
            let result = split_path(
                &DocumentChunker::default(),
                Path::new("/nonexistent/input.md"),
                None,
            );
            assert!(result.is_err());
        }
    }

    mod corpus_command_tests {
        use super::*;
        use crate::chunker::SectionType;

        fn chunks_dir() -> TempDir {
            let src = TempDir::new().unwrap();
            let out = TempDir::new().unwrap();
            write_sources(src.path());
            split_path(&DocumentChunker::default(), src.path(), Some(out.path())).unwrap();
            out
        }

        #[test]
        fn stats_counts_files_and_sections() {
            let out = chunks_dir();
            let stats = stats(out.path()).unwrap();

            assert_eq!(stats.total_chunks, 3);
            assert_eq!(stats.files.len(), 2);
            assert_eq!(stats.sections.get("模式概述"), Some(&1));
            assert_eq!(stats.sections.get("实际应用"), Some(&1));
            assert_eq!(stats.sections.get("核心要点"), Some(&1));
        }

        #[test]
        fn search_scan_with_section_filter() {
            let out = chunks_dir();
            let options = SearchOptions {
                section: Some(SectionType::Application),
                ..Default::default()
            };

            let results = search("报告", out.path(), &options, Backend::Scan).unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].id, "chapter_07_block_001");
        }

        #[test]
        fn auto_falls_back_to_scan_without_index() {
            let out = chunks_dir();
            let results =
                search("路由", out.path(), &SearchOptions::default(), Backend::Auto).unwrap();
            assert_eq!(results.len(), 1);
        }

        #[test]
        fn search_missing_dir_is_error() {
            let result = search(
                "x",
                Path::new("/nonexistent/chunks"),
                &SearchOptions::default(),
                Backend::Scan,
            );
            assert!(result.is_err());
        }
    }

    #[test]
    fn keywords_respects_top_k() {
        let text = "提示链 提示链 路由 路由 并行化 反思 工具使用";
        let result = keywords(text, 2, ExtractorKind::Frequency, &[]);
        assert!(result.len() <= 2);
    }
}
