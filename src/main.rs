use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use bookchunk::chunker::{DocumentChunk, SectionType};
use bookchunk::cli::{Cli, Commands, PREVIEW_LINES};
use bookchunk::commands::{self, SplitOverrides, SplitReport};
use bookchunk::config::Config;
use bookchunk::search::{SearchOptions, SearchResult};
use bookchunk::wash;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output and the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::parse_from(["bookchunk", "--help"]);
        return Ok(());
    };

    let config = Config::load()?;

    match command {
        Commands::Split {
            input,
            output,
            max_chunk_size,
            min_chunk_size,
            extractor,
            json,
        } => {
            let overrides = SplitOverrides {
                max_chunk_size,
                min_chunk_size,
                extractor,
            };
            let chunker = commands::build_chunker(&config, &overrides)?;
            let report = commands::split_path(&chunker, &input, output.as_deref())?;

            if json {
                print_chunks_json(&report, input.is_dir())?;
            } else {
                print_split_report(&report);
            }

            if report.succeeded() == 0 && !report.failed.is_empty() {
                anyhow::bail!("All {} file(s) failed to split", report.failed.len());
            }
            Ok(())
        }
        Commands::Wash { file, preview, dir } => {
            if let Some(path) = preview {
                let view = wash::preview(&path, PREVIEW_LINES)?;
                println!("--- before ---");
                for line in &view.before {
                    println!("{line}");
                }
                println!("--- after ---");
                for line in &view.after {
                    println!("{line}");
                }
            } else if let Some(path) = file {
                wash::wash_file(&path)?;
                println!("Washed: {}", path.display());
            } else {
                let dir = dir.unwrap_or_else(|| config.corpus.source_path());
                let report = wash::wash_dir(&dir)?;
                for path in &report.cleaned {
                    println!("✓ {}", path.display());
                }
                for (path, error) in &report.failed {
                    println!("✗ {}: {error}", path.display());
                }
                println!(
                    "Washed {} of {} file(s)",
                    report.cleaned.len(),
                    report.total()
                );
            }
            Ok(())
        }
        Commands::Keywords {
            text,
            file,
            top_k,
            extractor,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide --text or --file"),
            };

            let kind = extractor.unwrap_or(config.keywords.extractor);
            let keywords = commands::keywords(&text, top_k, kind, &config.keywords.domain_words);

            if keywords.is_empty() {
                println!("No keywords found.");
            }
            for keyword in keywords {
                println!("{keyword}");
            }
            Ok(())
        }
        Commands::Search {
            query,
            limit,
            chapter,
            section,
            backend,
            fuzzy,
        } => {
            let section = section
                .map(|value| {
                    SectionType::parse(&value)
                        .ok_or_else(|| anyhow::anyhow!("Unknown section type: {value}"))
                })
                .transpose()?;

            let options = SearchOptions {
                limit: Some(limit),
                chapter,
                section,
                fuzzy,
            };
            let results =
                commands::search(&query, &config.corpus.chunks_path(), &options, backend)?;
            print_search_results(&results);
            Ok(())
        }
        Commands::Stats => {
            let chunks_dir = config.corpus.chunks_path();
            let stats = commands::stats(&chunks_dir)?;

            println!("Chunks in {}:", chunks_dir.display());
            for (name, count) in &stats.files {
                println!("  {name}: {count}");
            }
            println!("Section types:");
            for (label, count) in &stats.sections {
                println!("  {label}: {count}");
            }
            println!("Total: {} chunk(s) in {} file(s)", stats.total_chunks, stats.files.len());
            if stats.skipped > 0 {
                println!("Skipped: {} unreadable file(s)", stats.skipped);
            }
            Ok(())
        }
        #[cfg(feature = "ranked")]
        Commands::Index => {
            let chunks_dir = config.corpus.chunks_path();
            let count = commands::index_all(&chunks_dir)?;
            println!("Indexed {count} chunk(s) in {}", chunks_dir.display());
            Ok(())
        }
        #[cfg(feature = "mcp")]
        Commands::Serve => tokio::runtime::Runtime::new()?.block_on(bookchunk::mcp::serve()),
    }
}

fn print_split_report(report: &SplitReport) {
    for file in &report.files {
        println!("✓ {} -> {} chunk(s)", file.source.display(), file.chunks.len());
        if let Some(output) = &file.output {
            println!("  saved {}", output.display());
        }
    }
    for (path, error) in &report.failed {
        println!("✗ {}: {error}", path.display());
    }
    println!(
        "Split {} file(s) into {} chunk(s), {} failed",
        report.succeeded(),
        report.total_chunks(),
        report.failed.len()
    );
}

/// A single file prints its chunk array; a directory prints an object keyed
/// by source file name.
fn print_chunks_json(report: &SplitReport, keyed: bool) -> anyhow::Result<()> {
    let json = if keyed {
        let by_file: BTreeMap<String, &Vec<DocumentChunk>> = report
            .files
            .iter()
            .map(|f| (file_name(&f.source), &f.chunks))
            .collect();
        serde_json::to_string_pretty(&by_file)?
    } else {
        let chunks: Vec<&DocumentChunk> = report.files.iter().flat_map(|f| &f.chunks).collect();
        serde_json::to_string_pretty(&chunks)?
    };
    println!("{json}");
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_search_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for result in results {
        let chapter = result.chapter_id.as_deref().unwrap_or("-");
        match result.score {
            Some(score) => println!("{} [{chapter}] {} ({score:.2})", result.id, result.title),
            None => println!("{} [{chapter}] {}", result.id, result.title),
        }
        println!("    {}", result.snippet);
        println!("    from {}", result.source);
    }
}
