//! CLI interface for bookchunk.
//!
//! Provides command-line argument parsing using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::keywords::ExtractorKind;

/// Default number of search results to return.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default number of keywords for the `keywords` command.
pub const DEFAULT_TOP_K: usize = 10;

/// Lines shown on each side of a wash preview.
pub const PREVIEW_LINES: usize = 20;

/// Search backend selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Backend {
    /// Scan chunk files directly (default).
    #[default]
    Scan,
    /// Use Tantivy for BM25 ranked search (requires `ranked` feature).
    #[cfg(feature = "ranked")]
    Ranked,
    /// Use the ranked index when it exists, otherwise scan.
    Auto,
}

/// Command-line interface for bookchunk.
#[derive(Parser)]
#[command(name = "bookchunk")]
#[command(author, version, about = "Chunk bilingual book chapters for retrieval", long_about = None)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Split a markdown file, or every markdown file in a directory, into chunks.
    Split {
        /// Input file or directory.
        input: PathBuf,

        /// Directory for `<stem>_chunks.json` output. Nothing is written when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured maximum chunk size in characters.
        #[arg(long)]
        max_chunk_size: Option<usize>,

        /// Override the configured minimum chunk size (recorded, not enforced).
        #[arg(long)]
        min_chunk_size: Option<usize>,

        /// Keyword extractor to use.
        #[arg(short, long)]
        extractor: Option<ExtractorKind>,

        /// Print the chunks as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Clean bilingual chapter files down to Chinese-only markdown.
    Wash {
        /// Wash a single file in place.
        #[arg(short, long, conflicts_with_all = ["preview", "dir"])]
        file: Option<PathBuf>,

        /// Show a before/after preview of a file without writing.
        #[arg(short, long, conflicts_with = "dir")]
        preview: Option<PathBuf>,

        /// Wash every markdown file in a directory (defaults to the configured source dir).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Extract keywords from text or a file.
    Keywords {
        /// Text to analyze.
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// File to analyze.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum number of keywords.
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Keyword extractor to use.
        #[arg(short, long)]
        extractor: Option<ExtractorKind>,
    },

    /// Search chunks for a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Filter results to this chapter id (e.g., "07").
        #[arg(short, long)]
        chapter: Option<String>,

        /// Filter results to this section type (e.g., "实际应用").
        #[arg(short, long)]
        section: Option<String>,

        /// Search backend to use.
        #[arg(short, long, default_value = "scan")]
        backend: Backend,

        /// Enable fuzzy search with specified edit distance (1-2).
        /// Only available with the `ranked` backend.
        #[arg(short, long)]
        fuzzy: Option<u8>,
    },

    /// Show chunk counts per file and per section type.
    Stats,

    /// Build or rebuild the search index over the chunks directory.
    /// Requires the `ranked` feature.
    #[cfg(feature = "ranked")]
    Index,

    /// Start the MCP server for AI editor integration.
    #[cfg(feature = "mcp")]
    Serve,
}
