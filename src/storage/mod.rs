//! Chunk storage trait and implementations.
//!
//! Chunk lists are persisted one JSON file per source document
//! (`<stem>_chunks.json`). The trait keeps the batch driver and the search
//! layer independent of where those files live.

pub mod local;

use std::path::{Path, PathBuf};

use crate::chunker::DocumentChunk;

/// Suffix appended to a source file stem to name its chunk file.
pub const CHUNK_FILE_SUFFIX: &str = "_chunks.json";

/// Chunk file name for a source document stem.
#[must_use]
pub fn chunk_file_name(stem: &str) -> String {
    format!("{stem}{CHUNK_FILE_SUFFIX}")
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Failed to read: {0}")]
    ReadError(String),

    #[error("Failed to write: {0}")]
    WriteError(String),

    #[error("Failed to parse chunks: {0}")]
    ParseError(String),

    #[error("Failed to serialize: {0}")]
    SerializeError(String),
}

/// Trait for chunk storage backends.
pub trait ChunkStore: Send + Sync {
    /// Persist one document's chunks under `stem`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the chunks cannot be serialized or written.
    fn write_chunks(&self, stem: &str, chunks: &[DocumentChunk]) -> Result<PathBuf, StorageError>;

    /// Read a chunk file by name (e.g. `07-Chapter-01_chunks.json`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file is missing, unreadable or invalid.
    fn read_chunks(&self, file_name: &str) -> Result<Vec<DocumentChunk>, StorageError>;

    /// List chunk file names, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store root cannot be listed.
    fn list_chunk_files(&self) -> Result<Vec<String>, StorageError>;

    /// Get the root path for this store.
    fn root(&self) -> &Path;
}
