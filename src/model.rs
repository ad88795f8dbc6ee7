use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RecapError;

/// Spoiler boundary for a TV series: nothing after `episode` of `season` may be revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesTarget {
    pub series_title: String,
    pub season: u32,
    pub episode: u32,
}

impl SeriesTarget {
    pub fn new(series_title: &str, season: u32, episode: u32) -> Result<Self, RecapError> {
        let series_title = non_blank_title(series_title)?;
        if season == 0 {
            return Err(RecapError::InvalidTarget("season must be >= 1".to_owned()));
        }
        if episode == 0 {
            return Err(RecapError::InvalidTarget("episode must be >= 1".to_owned()));
        }
        Ok(Self {
            series_title,
            season,
            episode,
        })
    }

    pub fn label(&self) -> String {
        format!("Season {} Episode {}", self.season, self.episode)
    }
}

/// Book request as it arrives from a caller; `part` may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTargetRequest {
    pub title: String,
    pub chapter: u32,
    #[serde(default)]
    pub part: Option<u32>,
}

impl BookTargetRequest {
    pub const DEFAULT_PART: u32 = 1;

    /// Applies the part default and validates the numbers.
    pub fn normalize(&self) -> Result<BookTarget, RecapError> {
        BookTarget::new(
            &self.title,
            self.part.unwrap_or(Self::DEFAULT_PART),
            self.chapter,
        )
    }
}

/// Spoiler boundary for a book: nothing after `chapter` of `part` may be revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTarget {
    pub book_title: String,
    pub part: u32,
    pub chapter: u32,
}

impl BookTarget {
    pub fn new(book_title: &str, part: u32, chapter: u32) -> Result<Self, RecapError> {
        let book_title = non_blank_title(book_title)?;
        if part == 0 {
            return Err(RecapError::InvalidTarget("part must be >= 1".to_owned()));
        }
        if chapter == 0 {
            return Err(RecapError::InvalidTarget("chapter must be >= 1".to_owned()));
        }
        Ok(Self {
            book_title,
            part,
            chapter,
        })
    }

    pub fn label(&self) -> String {
        if self.part == BookTargetRequest::DEFAULT_PART {
            format!("Chapter {}", self.chapter)
        } else {
            format!("Part {} Chapter {}", self.part, self.chapter)
        }
    }
}

fn non_blank_title(title: &str) -> Result<String, RecapError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(RecapError::InvalidTarget("title must not be empty".to_owned()));
    }
    Ok(title.to_owned())
}

/// `(season, episode)` for series, `(part, chapter_range_start)` for books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub major: u32,
    pub minor: u32,
}

impl SequenceKey {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryUnit {
    pub key: SequenceKey,
    pub label: String,
    pub text: String,
}

impl SummaryUnit {
    /// Returns `None` when `text` is blank; such units never enter a window.
    pub fn new(key: SequenceKey, label: String, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            key,
            label,
            text: text.to_owned(),
        })
    }
}

/// A chapter-summary page found on a book index, before it is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDocument {
    pub part: u32,
    pub chapter_range_start: u32,
    pub chapter_range_end: u32,
    pub url: String,
}

impl SummaryDocument {
    pub fn covers(&self, chapter: u32) -> bool {
        self.chapter_range_start <= chapter && chapter <= self.chapter_range_end
    }

    pub fn key(&self) -> SequenceKey {
        SequenceKey::new(self.part, self.chapter_range_start)
    }

    pub fn label(&self) -> String {
        format!(
            "Part {} | Chapters {}-{}",
            self.part, self.chapter_range_start, self.chapter_range_end
        )
    }
}

/// Ordered, spoiler-safe summaries up to and including the target unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWindow {
    units: Vec<SummaryUnit>,
}

impl ResolvedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a unit. Resolvers push in ascending key order; a unit whose key
    /// does not advance the window is rejected.
    pub fn push(&mut self, unit: SummaryUnit) -> bool {
        if let Some(last) = self.units.last()
            && unit.key <= last.key
        {
            tracing::warn!(key = %unit.key, last = %last.key, "out-of-order summary unit dropped");
            return false;
        }
        self.units.push(unit);
        true
    }

    pub fn units(&self) -> &[SummaryUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Composed recap split into its two sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapSections {
    pub character_context: Vec<String>,
    pub story_recap: String,
}

/// Client-facing recap payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapResponse {
    pub character_context: Vec<String>,
    pub story_recap: String,
    pub generated_at: String,
}
