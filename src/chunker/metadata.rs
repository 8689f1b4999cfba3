//! Chunk metadata: file-derived base fields, section typing and the
//! per-chunk record serialized alongside each chunk.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CHAPTER_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(.+)\.md").expect("valid chapter file regex"));
static CHAPTER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Chapter\s*\d+\s*").expect("valid chapter prefix regex"));
static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*").expect("valid leading digits regex"));

/// Chinese chapter names keyed by two-digit chapter id.
const CHAPTER_NAMES_CN: &[(&str, &str)] = &[
    ("00", "目录"),
    ("01", "致谢"),
    ("02", "鸣谢"),
    ("03", "前言"),
    ("04", "思想领袖"),
    ("05", "介绍"),
    ("06", "什么是智能体"),
    ("07", "第一章：提示链"),
    ("08", "第二章：路由"),
    ("09", "第三章：并行化"),
    ("10", "第四章：反思"),
    ("11", "第五章：工具使用"),
    ("12", "第六章：规划"),
    ("13", "第七章：多智能体协作"),
    ("14", "第八章：记忆管理"),
    ("16", "第十章：模型上下文协议"),
    ("17", "第十一章：目标设定与监控"),
    ("19", "第十三章：人在回路"),
    ("20", "第十四章：知识检索RAG"),
    ("21", "第十五章：智能体间通信"),
    ("22", "第十六章：资源感知优化"),
    ("23", "第十七章：推理技术"),
    ("25", "第十九章：评估与监控"),
    ("26", "第二十章：优先级"),
    ("27", "第二十一章：探索与发现"),
];

/// Look up the Chinese chapter name, falling back to `第<id>章`.
#[must_use]
pub fn chinese_chapter_name(chapter_id: &str) -> String {
    CHAPTER_NAMES_CN
        .iter()
        .find(|(id, _)| *id == chapter_id)
        .map_or_else(|| format!("第{chapter_id}章"), |(_, name)| (*name).to_string())
}

/// Chapter fields, present only for files named like `07-Chapter-01-Prompt-Chaining.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub chapter_id: String,
    pub chapter_name_en: String,
    pub chapter_name_cn: String,
}

/// Metadata derived once per source file and shared by all of its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseMetadata {
    #[serde(flatten)]
    pub chapter: Option<ChapterInfo>,
    pub file_path: String,
    pub file_name: String,
}

impl BaseMetadata {
    /// Derive base metadata from a file path.
    ///
    /// Chaptered file names (`<digits>-<rest>.md`) yield chapter fields;
    /// anything else only records the path and name.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let chapter = CHAPTER_FILE.captures(&file_name).map(|caps| {
            let chapter_id = caps[1].to_string();
            let raw_name = caps[2].replace('-', " ");
            let without_prefix = CHAPTER_PREFIX.replace(&raw_name, "");
            let chapter_name_en = LEADING_DIGITS.replace(&without_prefix, "").into_owned();
            let chapter_name_cn = chinese_chapter_name(&chapter_id);

            ChapterInfo {
                chapter_id,
                chapter_name_en,
                chapter_name_cn,
            }
        });

        Self {
            chapter,
            file_path: path.to_string_lossy().into_owned(),
            file_name,
        }
    }

    /// Chapter id used in chunk ids, `unknown` for unchaptered files.
    #[must_use]
    pub fn chapter_id(&self) -> &str {
        self.chapter.as_ref().map_or("unknown", |c| c.chapter_id.as_str())
    }
}

/// Coarse semantic bucket assigned from a level-2 heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionType {
    #[serde(rename = "模式概述")]
    Overview,
    #[serde(rename = "实际应用")]
    Application,
    #[serde(rename = "核心要点")]
    Takeaway,
    #[serde(rename = "代码示例")]
    Example,
    #[serde(rename = "其他")]
    Other,
}

impl SectionType {
    /// Buckets in match priority order with their bilingual markers.
    const MARKERS: [(Self, [&'static str; 2]); 4] = [
        (Self::Overview, ["概述", "Overview"]),
        (Self::Application, ["应用", "Application"]),
        (Self::Takeaway, ["要点", "Takeaway"]),
        (Self::Example, ["示例", "Example"]),
    ];

    /// Classify a level-2 heading by substring match; the first bucket wins.
    #[must_use]
    pub fn classify(title: &str) -> Self {
        Self::MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| title.contains(m)))
            .map_or(Self::Other, |(section, _)| *section)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Overview => "模式概述",
            Self::Application => "实际应用",
            Self::Takeaway => "核心要点",
            Self::Example => "代码示例",
            Self::Other => "其他",
        }
    }

    /// Parse either the stored label or the English variant name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "模式概述" | "overview" => Some(Self::Overview),
            "实际应用" | "application" => Some(Self::Application),
            "核心要点" | "takeaway" => Some(Self::Takeaway),
            "代码示例" | "example" => Some(Self::Example),
            "其他" | "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Full metadata attached to an emitted chunk.
///
/// Field order matches the JSON output: base fields, the section type
/// overlay, then per-chunk fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub base: BaseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<SectionType>,
    pub block_index: usize,
    pub word_count: usize,
    pub char_count: usize,
    pub title_level: u8,
    pub title: String,
    pub has_code: bool,
    pub has_list: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}
