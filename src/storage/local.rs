//! Local filesystem chunk store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::chunker::DocumentChunk;
use crate::storage::{CHUNK_FILE_SUFFIX, ChunkStore, StorageError, chunk_file_name};

/// Chunk store backed by a local directory.
pub struct LocalChunkStore {
    root: PathBuf,
}

impl LocalChunkStore {
    /// Create a store rooted at the given directory. Nothing is created until
    /// the first write.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ChunkStore for LocalChunkStore {
    fn write_chunks(&self, stem: &str, chunks: &[DocumentChunk]) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            StorageError::WriteError(format!("create dir {}: {e}", self.root.display()))
        })?;

        let path = self.root.join(chunk_file_name(stem));

        // serde_json writes non-ASCII characters literally.
        let contents = serde_json::to_string_pretty(chunks)
            .map_err(|e| StorageError::SerializeError(e.to_string()))?;

        fs::write(&path, contents)
            .map_err(|e| StorageError::WriteError(format!("{}: {e}", path.display())))?;

        Ok(path)
    }

    fn read_chunks(&self, file_name: &str) -> Result<Vec<DocumentChunk>, StorageError> {
        let path = self.root.join(file_name);

        if !path.exists() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| StorageError::ReadError(format!("{}: {e}", path.display())))?;

        serde_json::from_str(&contents)
            .map_err(|e| StorageError::ParseError(format!("{}: {e}", path.display())))
    }

    fn list_chunk_files(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.exists() {
            return Err(StorageError::NotFound(self.root.display().to_string()));
        }

        let entries = fs::read_dir(&self.root)
            .map_err(|e| StorageError::ReadError(format!("{}: {e}", self.root.display())))?;

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.ends_with(CHUNK_FILE_SUFFIX))
            .collect();
        names.sort();

        Ok(names)
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
