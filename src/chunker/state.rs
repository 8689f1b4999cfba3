//! Line-by-line chunking state machine.
//!
//! [`ChunkState`] holds everything the splitter carries across lines. Feed it
//! lines with [`ChunkState::on_line`] and drain the tail with
//! [`ChunkState::finish`]; each call returns at most one finished chunk body.

use std::sync::LazyLock;

use regex::Regex;

use super::metadata::SectionType;

/// Fence marker that opens and closes a code block.
pub const CODE_FENCE: &str = "```";

/// Heading patterns in match priority order (levels 1 to 3).
static HEADING_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"^#\s+(.+)$").expect("valid h1 regex"),
        Regex::new(r"^##\s+(.+)$").expect("valid h2 regex"),
        Regex::new(r"^###\s+(.+)$").expect("valid h3 regex"),
    ]
});

/// Current heading context of the pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Heading {
    #[default]
    None,
    H1(String),
    H2(String),
    H3(String),
}

impl Heading {
    /// Detect a level 1-3 heading line.
    #[must_use]
    pub fn detect(line: &str) -> Self {
        for (level, pattern) in HEADING_PATTERNS.iter().enumerate() {
            if let Some(caps) = pattern.captures(line) {
                let title = caps[1].trim().to_string();
                return match level {
                    0 => Self::H1(title),
                    1 => Self::H2(title),
                    _ => Self::H3(title),
                };
            }
        }
        Self::None
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::H1(_) => 1,
            Self::H2(_) => 2,
            Self::H3(_) => 3,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::None => "",
            Self::H1(t) | Self::H2(t) | Self::H3(t) => t,
        }
    }

    #[must_use]
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A finished chunk body, before keyword and count enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEmission {
    pub block_index: usize,
    pub content: String,
    pub heading: Heading,
    pub section_type: Option<SectionType>,
}

/// Returns true if joined lines are worth emitting: not blank, not a bare rule.
#[must_use]
pub fn should_save(content: &str) -> bool {
    let trimmed = content.trim();
    !trimmed.is_empty() && !matches!(trimmed, "---" | "***" | "___")
}

/// Stateful forward pass over one document's lines.
#[derive(Debug)]
pub struct ChunkState {
    max_chunk_size: usize,
    lines: Vec<String>,
    /// Character count of `lines` joined with `\n`.
    joined_len: usize,
    in_code_block: bool,
    heading: Heading,
    block_index: usize,
    section_type: Option<SectionType>,
}

impl ChunkState {
    #[must_use]
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size,
            lines: Vec::new(),
            joined_len: 0,
            in_code_block: false,
            heading: Heading::None,
            block_index: 0,
            section_type: None,
        }
    }

    #[must_use]
    pub fn in_code_block(&self) -> bool {
        self.in_code_block
    }

    #[must_use]
    pub fn heading(&self) -> &Heading {
        &self.heading
    }

    /// Number of chunks emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.block_index
    }

    /// Advance the pass by one physical line.
    pub fn on_line(&mut self, line: &str) -> Option<ChunkEmission> {
        if line.starts_with(CODE_FENCE) {
            self.in_code_block = !self.in_code_block;
            self.push(line);
            return None;
        }

        if self.in_code_block {
            self.push(line);
            return None;
        }

        let heading = Heading::detect(line);
        if heading.is_some() {
            // The heading closes the previous chunk under the previous title.
            // Rejected lines stay and lead the heading's chunk.
            let emission = self.close();

            if let Heading::H2(title) = &heading {
                self.section_type = Some(SectionType::classify(title));
            }
            self.heading = heading;
            self.push(line);
            return emission;
        }

        self.push(line);
        if self.should_split() {
            return self.flush();
        }
        None
    }

    /// Flush whatever remains after the last line.
    pub fn finish(&mut self) -> Option<ChunkEmission> {
        self.flush()
    }

    fn push(&mut self, line: &str) {
        if !self.lines.is_empty() {
            self.joined_len += 1;
        }
        self.joined_len += line.chars().count();
        self.lines.push(line.to_string());
    }

    fn should_split(&self) -> bool {
        if self.joined_len >= self.max_chunk_size {
            return true;
        }

        self.lines.len() >= 3 && self.lines.last().is_some_and(|l| l.trim().is_empty())
    }

    /// Emit the accumulator only if it passes the save test, leaving it
    /// untouched otherwise.
    fn close(&mut self) -> Option<ChunkEmission> {
        if should_save(&self.lines.join("\n")) {
            self.flush()
        } else {
            None
        }
    }

    /// Drain the accumulator, emitting it only if it passes the save test.
    fn flush(&mut self) -> Option<ChunkEmission> {
        let joined = self.lines.join("\n");
        self.lines.clear();
        self.joined_len = 0;

        if !should_save(&joined) {
            return None;
        }

        let emission = ChunkEmission {
            block_index: self.block_index,
            content: joined.trim().to_string(),
            heading: self.heading.clone(),
            section_type: self.section_type,
        };
        self.block_index += 1;
        Some(emission)
    }
}
