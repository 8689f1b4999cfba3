//! Bilingual chapter cleanup.
//!
//! Chapter sources interleave English lines with their Chinese translation
//! wrapped in `<mark>` tags. Washing keeps the Chinese text, heading levels
//! and structural lines (images, captions, rules, blanks) and drops the
//! English.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::keywords::has_cjk;

static MARKED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\s*<mark>(.*?)</mark>").expect("valid marked title regex"));
static MARK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<mark>(.*?)</mark>").expect("valid mark tag regex"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank run regex"));

/// Errors that can occur while washing a file.
#[derive(Debug, Error)]
pub enum WashError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Directory not found: {0}")]
    MissingDir(PathBuf),
}

/// Outcome of washing a directory.
#[derive(Debug, Default)]
pub struct WashReport {
    pub cleaned: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl WashReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.cleaned.len() + self.failed.len()
    }
}

/// Before/after view of a file without touching it.
#[derive(Debug)]
pub struct WashPreview {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

fn has_mark(line: &str) -> bool {
    line.contains("<mark>") && line.contains("</mark>")
}

fn unmark(line: &str) -> String {
    MARK_TAG.replace_all(line, "$1").into_owned()
}

/// Rebuild a title line at the heading level of `line`.
fn with_heading_level(line: &str, title: &str) -> String {
    let prefix = ["### ", "## ", "# "]
        .into_iter()
        .find(|p| line.starts_with(p))
        .unwrap_or("");
    format!("{prefix}{title}\n")
}

fn is_structural(line: &str) -> bool {
    let trimmed = line.trim();
    line.starts_with("![")
        || line.starts_with("**Fig.")
        || line.starts_with("**图")
        || matches!(trimmed, "---" | "***" | "")
}

/// Collapse runs of three or more newlines to a single blank line.
#[must_use]
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}

/// Wash lines, keeping their line endings. Returns the kept lines.
fn wash_lines(lines: &[&str]) -> Vec<String> {
    let mut cleaned = Vec::with_capacity(lines.len());
    let mut skip_next = false;

    for (i, line) in lines.iter().copied().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }

        // "English | <mark>中文</mark>" titles
        if line.contains("| <mark>") && line.contains("</mark>") {
            if let Some(caps) = MARKED_TITLE.captures(line) {
                cleaned.push(with_heading_level(line, &caps[1]));
            }
            continue;
        }

        // "English | 中文" titles that were already unmarked
        if line.contains(" | ") && !line.contains("<mark>") && !line.contains("</mark>") {
            let parts: Vec<&str> = line.split(" | ").collect();
            if parts.len() == 2 && has_cjk(parts[1]) {
                cleaned.push(with_heading_level(line, parts[1].trim()));
            }
            continue;
        }

        if has_mark(line) {
            cleaned.push(unmark(line));
            continue;
        }

        // An English line (list item or paragraph) followed by its translation.
        let next_marked = lines.get(i + 1).is_some_and(|next| has_mark(next));
        if next_marked {
            skip_next = true;
            cleaned.push(unmark(lines[i + 1]));
            continue;
        }

        if is_structural(line) {
            cleaned.push(line.to_string());
            continue;
        }

        if !has_cjk(line) && !line.trim().starts_with('#') {
            continue;
        }

        cleaned.push(line.to_string());
    }

    cleaned
}

/// Convert `\r\n` and lone `\r` line endings to `\n`.
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Wash a whole document.
#[must_use]
pub fn wash_text(text: &str) -> String {
    let text = normalize_newlines(text);
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    collapse_blank_lines(&wash_lines(&lines).concat())
}

/// Wash a file in place.
///
/// # Errors
///
/// Returns `WashError::Read` or `WashError::Write` on I/O failure.
pub fn wash_file(path: &Path) -> Result<(), WashError> {
    let text = fs::read_to_string(path).map_err(|source| WashError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, wash_text(&text)).map_err(|source| WashError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(file = %path.display(), "washed");
    Ok(())
}

/// Wash every `*.md` file in a directory. Failures are recorded, not fatal.
///
/// # Errors
///
/// Returns `WashError::MissingDir` if `dir` does not exist or cannot be listed.
pub fn wash_dir(dir: &Path) -> Result<WashReport, WashError> {
    let files = crate::corpus::markdown_files(dir)
        .map_err(|_| WashError::MissingDir(dir.to_path_buf()))?;

    let mut report = WashReport::default();
    for file in files {
        match wash_file(&file) {
            Ok(()) => report.cleaned.push(file),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "wash failed");
                report.failed.push((file, e.to_string()));
            }
        }
    }

    info!(
        cleaned = report.cleaned.len(),
        failed = report.failed.len(),
        "wash finished"
    );
    Ok(report)
}

/// Show the first `limit` lines before and after washing.
///
/// # Errors
///
/// Returns `WashError::Read` if the file cannot be read.
pub fn preview(path: &Path, limit: usize) -> Result<WashPreview, WashError> {
    let text = fs::read_to_string(path).map_err(|source| WashError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let text = normalize_newlines(&text);
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let after = wash_lines(&lines);

    Ok(WashPreview {
        before: lines
            .iter()
            .take(limit)
            .map(|l| l.trim_end_matches('\n').to_string())
            .collect(),
        after: after
            .iter()
            .take(limit)
            .map(|l| l.trim_end_matches('\n').to_string())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_title_keeps_level() {
        let out = wash_text("## Overview | <mark>概述</mark>\n");
        assert_eq!(out, "## 概述\n");
    }

    #[test]
    fn unmarked_bilingual_title() {
        assert_eq!(wash_text("# Routing | 路由\n"), "# 路由\n");
        // Second part without CJK is dropped entirely.
        assert_eq!(wash_text("a | b\n"), "");
    }

    #[test]
    fn english_line_replaced_by_translation() {
        let text = "Prompt chaining splits tasks.\n<mark>提示链拆分任务。</mark>\n";
        assert_eq!(wash_text(text), "提示链拆分任务。\n");
    }

    #[test]
    fn english_list_item_replaced_by_translation() {
        let text = "- First step\n<mark>- 第一步</mark>\n";
        assert_eq!(wash_text(text), "- 第一步\n");
    }

    #[test]
    fn structural_lines_survive() {
        let text = "![diagram](fig1.png)\n**Fig. 1** Flow\n---\n\nEnglish only line\n";
        assert_eq!(
            wash_text(text),
            "![diagram](fig1.png)\n**Fig. 1** Flow\n---\n\n"
        );
    }

    #[test]
    fn headings_without_cjk_are_kept() {
        assert_eq!(wash_text("# Appendix\n"), "# Appendix\n");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
        assert_eq!(collapse_blank_lines("a\nb"), "a\nb");
    }

    #[test]
    fn washed_output_never_has_three_newlines() {
        let text = "中文一\n\nEnglish\n\nMore English\n\n中文二\n";
        let out = wash_text(text);
        assert!(!out.contains("\n\n\n"));
        assert_eq!(out, "中文一\n\n中文二\n");
    }

    #[test]
    fn crlf_blank_runs_collapse() {
        let text = "中文一\r\n\r\nEnglish\r\n\r\n\r\n中文二\r\n";
        let out = wash_text(text);
        assert!(!out.contains('\r'));
        assert_eq!(out, "中文一\n\n中文二\n");
    }

    #[test]
    fn crlf_file_washes_like_lf() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("07-x.md");
        fs::write(&path, "Hello\r\n<mark>你好</mark>\r\n\r\n\r\n\r\n世界\r\n").unwrap();

        wash_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "你好\n\n世界\n");
    }

    #[test]
    fn wash_file_rewrites_in_place() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("07-x.md");
        fs::write(&path, "Hello\n<mark>你好</mark>\n").unwrap();

        wash_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "你好\n");
    }

    #[test]
    fn preview_does_not_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.md");
        let original = "Hello\n<mark>你好</mark>\n";
        fs::write(&path, original).unwrap();

        let view = preview(&path, 20).unwrap();
        assert_eq!(view.before, vec!["Hello", "<mark>你好</mark>"]);
        assert_eq!(view.after, vec!["你好"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn wash_dir_missing_is_error() {
        assert!(matches!(
            wash_dir(Path::new("/nonexistent/wash/dir")),
            Err(WashError::MissingDir(_))
        ));
    }
}
