//! MCP server implementation for bookchunk.
//!
//! Exposes chunking, chunk search and keyword extraction as MCP tools.

use std::borrow::Cow;
use std::fmt::Write;
use std::path::Path;

use clap::ValueEnum;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorCode, ErrorData as McpError, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
    transport::stdio,
};
use serde::Deserialize;

use crate::chunker::SectionType;
use crate::cli::{Backend, DEFAULT_SEARCH_LIMIT, DEFAULT_TOP_K};
use crate::commands::{self, SplitOverrides};
use crate::config::Config;
use crate::keywords::ExtractorKind;
use crate::search::SearchOptions;

/// Parameters for `chunk_document` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ChunkParams {
    #[schemars(description = "Path to a markdown chapter file")]
    pub path: String,
    #[schemars(description = "Maximum chunk size in characters (default from config)")]
    pub max_chunk_size: Option<usize>,
    #[schemars(description = "Keyword extractor: 'frequency' or 'simple'")]
    pub extractor: Option<String>,
}

/// Parameters for `search_chunks` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "The search query")]
    pub query: String,
    #[schemars(description = "Maximum number of results (default: 10)")]
    pub limit: Option<usize>,
    #[schemars(description = "Filter by chapter id (e.g., '07')")]
    pub chapter: Option<String>,
    #[schemars(description = "Filter by section type (e.g., '实际应用' or 'application')")]
    pub section: Option<String>,
}

/// Parameters for `extract_keywords` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct KeywordsParams {
    #[schemars(description = "Text to analyze")]
    pub text: String,
    #[schemars(description = "Maximum number of keywords (default: 10)")]
    pub top_k: Option<usize>,
    #[schemars(description = "Keyword extractor: 'frequency' or 'simple'")]
    pub extractor: Option<String>,
}

fn internal_error(message: String) -> McpError {
    McpError {
        code: ErrorCode::INTERNAL_ERROR,
        message: Cow::from(message),
        data: None,
    }
}

fn invalid_params(message: String) -> McpError {
    McpError {
        code: ErrorCode::INVALID_PARAMS,
        message: Cow::from(message),
        data: None,
    }
}

fn parse_extractor(value: Option<&str>) -> Result<Option<ExtractorKind>, McpError> {
    value
        .map(|v| {
            ExtractorKind::from_str(v, true)
                .map_err(|_| invalid_params(format!("Unknown extractor: {v}")))
        })
        .transpose()
}

fn load_config() -> Result<Config, McpError> {
    Config::load().map_err(|e| internal_error(format!("Failed to load config: {e}")))
}

/// MCP server exposing bookchunk tools.
#[derive(Clone)]
pub struct BookchunkServer {
    tool_router: ToolRouter<Self>,
}

impl Default for BookchunkServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl BookchunkServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Split a markdown chapter into chunks and return them as JSON")]
    async fn chunk_document(
        &self,
        Parameters(params): Parameters<ChunkParams>,
    ) -> Result<CallToolResult, McpError> {
        let config = load_config()?;
        let overrides = SplitOverrides {
            max_chunk_size: params.max_chunk_size,
            min_chunk_size: None,
            extractor: parse_extractor(params.extractor.as_deref())?,
        };

        let chunker = commands::build_chunker(&config, &overrides)
            .map_err(|e| invalid_params(e.to_string()))?;
        let report = commands::split_path(&chunker, Path::new(&params.path), None)
            .map_err(|e| internal_error(format!("Chunking failed: {e}")))?;

        if let Some((path, error)) = report.failed.first() {
            return Err(internal_error(format!(
                "Chunking failed for {}: {error}",
                path.display()
            )));
        }

        let chunks: Vec<_> = report.files.iter().flat_map(|f| &f.chunks).collect();
        let json = serde_json::to_string_pretty(&chunks)
            .map_err(|e| internal_error(format!("Failed to serialize chunks: {e}")))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Search persisted chunks by query, optionally filtered by chapter or section")]
    async fn search_chunks(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let config = load_config()?;

        let section = params
            .section
            .as_deref()
            .map(|value| {
                SectionType::parse(value)
                    .ok_or_else(|| invalid_params(format!("Unknown section type: {value}")))
            })
            .transpose()?;

        let options = SearchOptions {
            limit: Some(params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
            chapter: params.chapter,
            section,
            fuzzy: None,
        };

        let results = commands::search(
            &params.query,
            &config.corpus.chunks_path(),
            &options,
            Backend::Auto,
        )
        .map_err(|e| internal_error(format!("Search failed: {e}")))?;

        if results.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "No matches found for '{}'",
                params.query
            ))]));
        }

        let mut output = String::new();
        for result in &results {
            let _ = write!(
                output,
                "## {} ({})\n**Chapter:** {}\n**File:** {}\n{}\n\n",
                result.title,
                result.id,
                result.chapter_id.as_deref().unwrap_or("-"),
                result.source,
                result.snippet
            );
        }
        let _ = write!(output, "*{} result(s) found*", results.len());

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(description = "Extract keywords from text")]
    async fn extract_keywords(
        &self,
        Parameters(params): Parameters<KeywordsParams>,
    ) -> Result<CallToolResult, McpError> {
        let config = load_config()?;
        let kind = parse_extractor(params.extractor.as_deref())?
            .unwrap_or(config.keywords.extractor);

        let keywords = commands::keywords(
            &params.text,
            params.top_k.unwrap_or(DEFAULT_TOP_K),
            kind,
            &config.keywords.domain_words,
        );

        Ok(CallToolResult::success(vec![Content::text(
            keywords.join(", "),
        )]))
    }
}

#[tool_handler]
impl ServerHandler for BookchunkServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "bookchunk splits book chapters into retrieval chunks. \
                Use chunk_document to split a markdown file, search_chunks to query \
                persisted chunks, and extract_keywords to pull keywords from text."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Start the MCP server with stdio transport.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a fatal error.
pub async fn serve() -> anyhow::Result<()> {
    let server = BookchunkServer::new();
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
