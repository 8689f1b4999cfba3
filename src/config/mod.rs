//! Configuration loading for bookchunk.

use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::chunker::{
    ChunkerOptions, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_KEYWORDS, DEFAULT_MIN_CHUNK_SIZE,
};
use crate::keywords::ExtractorKind;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "BOOKCHUNK_CONFIG";

/// Top-level configuration loaded from config.toml.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
}

/// Chunk size settings.
#[derive(Debug, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

/// Keyword extractor selection.
#[derive(Debug, Default, Deserialize)]
pub struct KeywordsConfig {
    #[serde(default)]
    pub extractor: ExtractorKind,
    /// Extra terms added to the built-in domain vocabulary.
    #[serde(default)]
    pub domain_words: Vec<String>,
}

/// Where chapter sources and chunk output live.
#[derive(Debug, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default = "default_chunks_dir")]
    pub chunks_dir: String,
}

fn default_min_chunk_size() -> usize {
    DEFAULT_MIN_CHUNK_SIZE
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

fn default_max_keywords() -> usize {
    DEFAULT_MAX_KEYWORDS
}

fn default_source_dir() -> String {
    "./text".to_string()
}

fn default_chunks_dir() -> String {
    "./chunks".to_string()
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            max_keywords: default_max_keywords(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            chunks_dir: default_chunks_dir(),
        }
    }
}

impl ChunkingConfig {
    #[must_use]
    pub fn options(&self) -> ChunkerOptions {
        ChunkerOptions {
            min_chunk_size: self.min_chunk_size,
            max_chunk_size: self.max_chunk_size,
            max_keywords: self.max_keywords,
        }
    }
}

impl CorpusConfig {
    #[must_use]
    pub fn chunks_path(&self) -> PathBuf {
        expand_tilde(&self.chunks_dir)
    }

    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        expand_tilde(&self.source_dir)
    }
}

impl Config {
    /// Load config from `$BOOKCHUNK_CONFIG` or ~/.config/bookchunk/config.toml,
    /// or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if let Some(path) = config_path
            && path.exists()
        {
            let contents = std::fs::read_to_string(&path)?;
            return Self::parse(&contents);
        }

        Ok(Config::default())
    }

    /// Parse a TOML config document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value has the wrong type.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.chunking.max_chunk_size == 0 {
            anyhow::bail!("chunking.max_chunk_size must be greater than zero");
        }
        Ok(config)
    }

    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(explicit));
        }

        ProjectDirs::from("", "", "bookchunk").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Expand ~ to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(base_dirs) = BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.chunking.min_chunk_size, 200);
        assert_eq!(config.chunking.max_chunk_size, 800);
        assert_eq!(config.chunking.max_keywords, 5);
        assert_eq!(config.keywords.extractor, ExtractorKind::Frequency);
        assert!(config.keywords.domain_words.is_empty());
        assert_eq!(config.corpus.chunks_dir, "./chunks");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            "[chunking]\nmax_chunk_size = 500\n\n[keywords]\nextractor = \"simple\"\ndomain_words = [\"护栏\"]\n",
        )
        .unwrap();
        assert_eq!(config.chunking.max_chunk_size, 500);
        assert_eq!(config.chunking.min_chunk_size, 200);
        assert_eq!(config.keywords.extractor, ExtractorKind::Simple);
        assert_eq!(config.keywords.domain_words, vec!["护栏"]);
    }

    #[test]
    fn zero_max_chunk_size_is_rejected() {
        let result = Config::parse("[chunking]\nmax_chunk_size = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_extractor_is_rejected() {
        assert!(Config::parse("[keywords]\nextractor = \"magic\"\n").is_err());
    }

    #[test]
    fn options_mirror_chunking_section() {
        let config = Config::parse("[chunking]\nmin_chunk_size = 10\nmax_keywords = 3\n").unwrap();
        let options = config.chunking.options();
        assert_eq!(options.min_chunk_size, 10);
        assert_eq!(options.max_chunk_size, 800);
        assert_eq!(options.max_keywords, 3);
    }

    #[test]
    fn expand_tilde_leaves_relative_paths() {
        assert_eq!(expand_tilde("./chunks"), PathBuf::from("./chunks"));
    }
}
