//! bookchunk - Structure-aware chunking for bilingual book chapters.
//!
//! This library splits markdown chapters into retrieval-sized chunks with
//! chapter, section and keyword metadata, persists them as JSON, and offers
//! local search over the result (scan, or Tantivy BM25 with the `ranked`
//! feature).
//!
//! # Modules
//!
//! - [`chunker`] - The splitting pass and chunk metadata
//! - [`keywords`] - Keyword extractor trait and implementations
//! - [`wash`] - Cleaning of bilingual source chapters
//! - [`commands`] - High-level operations (split, search, stats, index)
//! - [`corpus`] - Loading persisted chunk files
//! - [`search`] - Search backend trait and implementations
//! - [`storage`] - Chunk store trait and local implementation
//! - [`config`] - Configuration loading
//! - [`cli`] - Command-line interface definitions

pub mod chunker;
pub mod cli;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod keywords;
pub mod search;
pub mod storage;
pub mod wash;

#[cfg(feature = "mcp")]
pub mod mcp;
