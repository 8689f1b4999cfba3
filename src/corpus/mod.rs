//! Chunk corpus loading and source file discovery.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::chunker::DocumentChunk;
use crate::storage::local::LocalChunkStore;
use crate::storage::{ChunkStore, StorageError};

/// Errors that can occur when loading a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Chunk directory not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to list chunks: {0}")]
    Storage(#[from] StorageError),
}

/// All `*.md` files directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns an I/O error if `dir` cannot be listed.
pub fn markdown_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    Ok(files)
}

/// One persisted chunk file.
#[derive(Debug, Clone)]
pub struct ChunkFile {
    /// File name inside the chunks directory.
    pub name: String,
    pub chunks: Vec<DocumentChunk>,
}

/// Every chunk file under a chunks directory.
#[derive(Debug, Clone)]
pub struct ChunkCorpus {
    pub root: PathBuf,
    pub files: Vec<ChunkFile>,
    /// Files that could not be read or parsed, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl ChunkCorpus {
    /// Load all chunk files from a chunks directory.
    ///
    /// Unreadable or invalid files are skipped and listed in `skipped`.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::NotFound` if the directory doesn't exist.
    pub fn load(root: &Path) -> Result<Self, CorpusError> {
        if !root.exists() {
            return Err(CorpusError::NotFound(root.to_path_buf()));
        }

        Self::from_store(&LocalChunkStore::new(root.to_path_buf()))
    }

    /// Load all chunk files through a store.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::Storage` if the store cannot be listed.
    pub fn from_store(store: &dyn ChunkStore) -> Result<Self, CorpusError> {
        let mut files = Vec::new();
        let mut skipped = Vec::new();

        for name in store.list_chunk_files()? {
            match store.read_chunks(&name) {
                Ok(chunks) => files.push(ChunkFile { name, chunks }),
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping chunk file");
                    skipped.push((name, e.to_string()));
                }
            }
        }

        Ok(Self {
            root: store.root().to_path_buf(),
            files,
            skipped,
        })
    }

    /// Iterate every chunk in file order.
    pub fn chunks(&self) -> impl Iterator<Item = &DocumentChunk> {
        self.files.iter().flat_map(|f| f.chunks.iter())
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.files.iter().map(|f| f.chunks.len()).sum()
    }

    #[must_use]
    pub fn find(&self, id: &str, file_name: Option<&str>) -> Option<&DocumentChunk> {
        self.files
            .iter()
            .filter(|f| file_name.is_none_or(|name| f.name == name))
            .flat_map(|f| f.chunks.iter())
            .find(|c| c.id == id)
    }
}
