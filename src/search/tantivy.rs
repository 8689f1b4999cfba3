//! Tantivy-based search backend with BM25 ranking.
//!
//! Indexes every chunk of a chunk corpus. The index lives in `.index/` under
//! the chunks directory and must be rebuilt after re-splitting.

use std::path::{Path, PathBuf};

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{FAST, Field, IndexRecordOption, STORED, STRING, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, Term};
use tracing::info;

use crate::corpus::ChunkCorpus;
use crate::search::{SearchBackend, SearchOptions, SearchResult, snippet};

/// Index directory name within the chunks directory.
const INDEX_DIR: &str = ".index";

/// Heap size for the index writer (50MB).
const WRITER_HEAP_SIZE: usize = 50_000_000;

/// Index mode controls whether the backend can write to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    ReadWrite,
    ReadOnly,
}

/// Schema field handles for the Tantivy index.
#[derive(Debug, Clone)]
struct SchemaFields {
    id: Field,
    title: Field,
    content: Field,
    keywords: Field,
    chapter_id: Field,
    section_type: Field,
    source: Field,
}

/// Tantivy-based search backend with BM25 ranking.
pub struct TantivyBackend {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    mode: IndexMode,
    index_path: PathBuf,
}

impl TantivyBackend {
    /// Build the chunk schema.
    ///
    /// `title`, `content` and `keywords` are searchable; `chapter_id` and
    /// `section_type` are exact-match filters; `id` and `source` locate the
    /// chunk in the corpus.
    fn build_schema() -> (Schema, SchemaFields) {
        let mut schema_builder = Schema::builder();

        let id = schema_builder.add_text_field("id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let content = schema_builder.add_text_field("content", TEXT | STORED);
        let keywords = schema_builder.add_text_field("keywords", TEXT | STORED);
        let chapter_id = schema_builder.add_text_field("chapter_id", STRING | STORED | FAST);
        let section_type = schema_builder.add_text_field("section_type", STRING | STORED);
        let source = schema_builder.add_text_field("source", STRING | STORED);

        let schema = schema_builder.build();
        let fields = SchemaFields {
            id,
            title,
            content,
            keywords,
            chapter_id,
            section_type,
            source,
        };

        (schema, fields)
    }

    /// Open or create a Tantivy index at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be opened or created, or if it is
    /// missing in read-only mode.
    pub fn open(index_path: &Path, mode: IndexMode) -> anyhow::Result<Self> {
        let index = if index_path.exists() {
            let directory = MmapDirectory::open(index_path)?;
            Index::open(directory)?
        } else if mode == IndexMode::ReadWrite {
            let (schema, _) = Self::build_schema();
            std::fs::create_dir_all(index_path)?;
            let directory = MmapDirectory::open(index_path)?;
            Index::create(directory, schema, IndexSettings::default())?
        } else {
            anyhow::bail!(
                "Index not found at {} (read-only mode)",
                index_path.display()
            );
        };

        let schema = index.schema();
        let fields = SchemaFields {
            id: schema.get_field("id")?,
            title: schema.get_field("title")?,
            content: schema.get_field("content")?,
            keywords: schema.get_field("keywords")?,
            chapter_id: schema.get_field("chapter_id")?,
            section_type: schema.get_field("section_type")?,
            source: schema.get_field("source")?,
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            fields,
            mode,
            index_path: index_path.to_path_buf(),
        })
    }

    /// Open or create the index for a chunk corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be opened or created.
    pub fn open_for_corpus(corpus: &ChunkCorpus, mode: IndexMode) -> anyhow::Result<Self> {
        Self::open(&corpus.root.join(INDEX_DIR), mode)
    }

    #[must_use]
    pub fn index_exists(corpus: &ChunkCorpus) -> bool {
        corpus.root.join(INDEX_DIR).exists()
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Fuzzy term query over title, content and keywords for each word.
    fn build_fuzzy_query(&self, query_str: &str, distance: u8) -> Box<dyn Query> {
        let searchable = [self.fields.title, self.fields.content, self.fields.keywords];

        let clauses: Vec<(Occur, Box<dyn Query>)> = query_str
            .split_whitespace()
            .flat_map(|word| {
                let word = word.to_lowercase();
                searchable.map(|field| {
                    let term = Term::from_field_text(field, &word);
                    // A transposition counts as one edit.
                    let fuzzy = FuzzyTermQuery::new(term, distance, true);
                    (Occur::Should, Box::new(fuzzy) as Box<dyn Query>)
                })
            })
            .collect();

        Box::new(BooleanQuery::new(clauses))
    }

    fn build_query(
        &self,
        query_str: &str,
        options: &SearchOptions,
    ) -> anyhow::Result<Box<dyn Query>> {
        let text_query: Box<dyn Query> = if let Some(distance) = options.fuzzy {
            self.build_fuzzy_query(query_str, distance)
        } else {
            let query_parser = QueryParser::for_index(
                &self.index,
                vec![self.fields.title, self.fields.content, self.fields.keywords],
            );
            query_parser.parse_query(query_str)?
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];

        if let Some(chapter) = options.chapter.as_deref() {
            let term = Term::from_field_text(self.fields.chapter_id, chapter);
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        if let Some(section) = options.section {
            let term = Term::from_field_text(self.fields.section_type, section.label());
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        if clauses.len() == 1 {
            let (_, query) = clauses.remove(0);
            return Ok(query);
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Index every chunk of the corpus, replacing previous contents.
    ///
    /// # Errors
    ///
    /// Returns an error if indexing fails or if in read-only mode.
    pub fn index_corpus(&self, corpus: &ChunkCorpus) -> anyhow::Result<()> {
        if self.mode == IndexMode::ReadOnly {
            anyhow::bail!("Cannot index in read-only mode");
        }

        let mut writer: IndexWriter = self.index.writer(WRITER_HEAP_SIZE)?;
        writer.delete_all_documents()?;

        for file in &corpus.files {
            for chunk in &file.chunks {
                let meta = &chunk.metadata;
                let mut doc = tantivy::TantivyDocument::new();
                doc.add_text(self.fields.id, &chunk.id);
                doc.add_text(self.fields.title, &meta.title);
                doc.add_text(self.fields.content, &chunk.content);
                doc.add_text(self.fields.keywords, meta.keywords.join(" "));
                if let Some(chapter) = &meta.base.chapter {
                    doc.add_text(self.fields.chapter_id, &chapter.chapter_id);
                }
                if let Some(section) = meta.section_type {
                    doc.add_text(self.fields.section_type, section.label());
                }
                doc.add_text(self.fields.source, &file.name);

                writer.add_document(doc)?;
            }
        }

        writer.commit()?;
        info!(
            index = %self.index_path.display(),
            chunks = corpus.chunk_count(),
            "indexed chunks"
        );

        Ok(())
    }

    fn stored_text<'a>(&self, doc: &'a tantivy::TantivyDocument, field: Field) -> Option<&'a str> {
        doc.get_first(field).and_then(|v| v.as_str())
    }

    /// Resolve a hit against the loaded corpus, falling back to stored fields
    /// when the index is older than the chunk files.
    fn doc_to_search_result(
        &self,
        doc: &tantivy::TantivyDocument,
        score: f32,
        corpus: &ChunkCorpus,
    ) -> SearchResult {
        let id = self.stored_text(doc, self.fields.id).unwrap_or("unknown");
        let source = self.stored_text(doc, self.fields.source).unwrap_or("");

        if let Some(chunk) = corpus.find(id, Some(source)) {
            return SearchResult::from_chunk(chunk, source, Some(score));
        }

        SearchResult {
            id: id.to_string(),
            title: self
                .stored_text(doc, self.fields.title)
                .unwrap_or_default()
                .to_string(),
            chapter_id: self
                .stored_text(doc, self.fields.chapter_id)
                .map(str::to_string),
            source: source.to_string(),
            snippet: snippet(self.stored_text(doc, self.fields.content).unwrap_or_default()),
            score: Some(score),
        }
    }
}

impl SearchBackend for TantivyBackend {
    fn search(
        &self,
        query: &str,
        corpus: &ChunkCorpus,
        options: &SearchOptions,
    ) -> anyhow::Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }

        let searcher = self.reader.searcher();
        let limit = options.limit.unwrap_or(10);
        let tantivy_query = self.build_query(query, options)?;
        let top_docs = searcher.search(&tantivy_query, &TopDocs::with_limit(limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: tantivy::TantivyDocument = searcher.doc(doc_address)?;
            results.push(self.doc_to_search_result(&doc, score, corpus));
        }

        Ok(results)
    }
}
