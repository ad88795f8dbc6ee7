use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use rand::Rng as _;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::RecapError;
use crate::fetch::PageFetcher;
use crate::model::{BookTarget, ResolvedWindow, SummaryDocument, SummaryUnit};

/// Tokens marking analysis/character pages that must never enter a window.
const BANNED_LINK_TOKENS: &[&str] = &[
    "epilogue",
    "monologue",
    "analysis",
    "themes",
    "symbol",
    "character",
];

const GATED_MARKERS: &[&str] = &["Sign up to unlock", "Create a free account"];

const SUMMARY_HEADING: &str = "Summary";

static PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"part-(\d+)").expect("valid part regex"));
static CHAPTER_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"chapters?\s*(\d+)(?:\D+(\d+))?").expect("valid chapter range regex")
});
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));
static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid heading selector")
});

#[derive(Debug, Clone)]
pub struct BookSiteConfig {
    pub base_url: String,
    pub index_timeout: Duration,
    pub document_timeout: Duration,
    pub delay: Throttle,
}

impl BookSiteConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.coursehero.com/lit";
}

/// Randomized pause between consecutive page fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub min: Duration,
    pub max: Duration,
}

impl Throttle {
    pub const NONE: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    fn next_delay(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "courtesy delay");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Discovers, selects and fetches chapter-summary pages for one book.
///
/// The resolver owns its fetcher for exactly one run; `resolve` consumes it so
/// the fetcher is released on every exit path.
pub struct BookWindowResolver<F> {
    fetcher: F,
    config: BookSiteConfig,
}

impl<F: PageFetcher> BookWindowResolver<F> {
    pub fn new(fetcher: F, config: BookSiteConfig) -> Self {
        Self { fetcher, config }
    }

    pub async fn resolve(self, target: &BookTarget) -> Result<ResolvedWindow, RecapError> {
        let index_url = index_url(&self.config.base_url, &target.book_title)?;
        tracing::info!(
            title = %target.book_title,
            part = target.part,
            chapter = target.chapter,
            index = %index_url,
            "resolving book window"
        );

        let index_html = self
            .fetcher
            .fetch(index_url.as_str(), self.config.index_timeout)
            .await?;
        let discovered = discover_documents(&index_html, &index_url, target.part)?;
        tracing::info!(documents = discovered.len(), "discovered summary documents");

        let selected = select_until(discovered, target)?;
        tracing::info!(documents = selected.len(), "selected summary documents");

        let mut window = ResolvedWindow::new();
        for doc in &selected {
            self.config.delay.pause().await;

            let Some(text) = self.fetch_summary(doc).await else {
                continue;
            };
            if let Some(unit) = SummaryUnit::new(doc.key(), doc.label(), &text) {
                window.push(unit);
            }
        }

        tracing::info!(
            title = %target.book_title,
            units = window.len(),
            selected = selected.len(),
            "book window resolved"
        );
        Ok(window)
    }

    /// Per-document failures are logged and turned into a skipped unit.
    async fn fetch_summary(&self, doc: &SummaryDocument) -> Option<String> {
        let html = match self
            .fetcher
            .fetch(&doc.url, self.config.document_timeout)
            .await
        {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(url = %doc.url, error = %err, "summary fetch failed; skipping");
                return None;
            }
        };

        if is_gated(&html) {
            tracing::warn!(url = %doc.url, "gated content; skipping");
            return None;
        }

        let summary = extract_summary(&html);
        if summary.is_none() {
            tracing::warn!(url = %doc.url, "no parsable Summary section; skipping");
        }
        summary
    }
}

pub fn book_slug(title: &str) -> String {
    title.trim().replace(' ', "-")
}

fn index_url(base_url: &str, title: &str) -> Result<Url, RecapError> {
    let base_url = base_url.trim_end_matches('/');
    let raw = format!("{base_url}/{}/", book_slug(title));
    Url::parse(&raw).map_err(|err| RecapError::InvalidTarget(format!("index url {raw}: {err}")))
}

/// Whether a link points at a plot-summary page covering one or more chapters.
pub fn is_summary_link(href: &str, text: &str) -> bool {
    let combined = format!("{href} {text}").to_lowercase();

    if !combined.contains("summary") {
        return false;
    }
    if BANNED_LINK_TOKENS.iter().any(|token| combined.contains(token)) {
        return false;
    }
    // "chapter" also matches "chapters".
    combined.contains("chapter")
}

/// Part from the link URL, chapter range from the link text.
pub fn parse_part_and_range(href: &str, text: &str) -> Result<(u32, u32, u32), RecapError> {
    let lower_href = href.to_lowercase();
    let part = PART_RE
        .captures(&lower_href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| RecapError::Parse(format!("part not found in url: {href}")))?;

    let lower_text = text.to_lowercase();
    let caps = CHAPTER_RANGE_RE
        .captures(&lower_text)
        .ok_or_else(|| RecapError::Parse(format!("chapter not found in link text: {text:?}")))?;
    let start = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| RecapError::Parse(format!("chapter not found in link text: {text:?}")))?;
    let end = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(start);

    if end < start {
        tracing::debug!(text, start, end, "descending chapter range; treating as single chapter");
        return Ok((part, start, start));
    }
    Ok((part, start, end))
}

/// Enumerates summary documents on an index page, dropping anything past `target_part`.
pub fn discover_documents(
    index_html: &str,
    index_url: &Url,
    target_part: u32,
) -> Result<Vec<SummaryDocument>, RecapError> {
    let document = Html::parse_document(index_html);
    let mut seen = HashSet::new();
    let mut documents = Vec::new();

    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let text = element_text(&link);
        if !is_summary_link(href, &text) {
            continue;
        }

        let (part, start, end) = parse_part_and_range(href, &text)?;
        if part > target_part {
            continue;
        }

        let Ok(mut url) = index_url.join(href) else {
            tracing::debug!(href, "unresolvable summary link; ignoring");
            continue;
        };
        // Anchors and tracking parameters point at the same page.
        url.set_fragment(None);
        url.set_query(None);
        let url = url.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        documents.push(SummaryDocument {
            part,
            chapter_range_start: start,
            chapter_range_end: end,
            url,
        });
    }

    if documents.is_empty() {
        return Err(RecapError::NotFound(format!(
            "no chapter summaries discovered at {index_url}"
        )));
    }
    Ok(documents)
}

/// Keeps every earlier part in full, plus the single target-part document whose
/// range contains the target chapter.
///
/// Documents sharing a `(part, start)` key collapse to one: the widest range in
/// earlier parts, and the narrowest covering range in the target part.
pub fn select_until(
    documents: Vec<SummaryDocument>,
    target: &BookTarget,
) -> Result<Vec<SummaryDocument>, RecapError> {
    let mut selected = documents
        .iter()
        .filter(|doc| doc.part < target.part)
        .cloned()
        .collect::<Vec<_>>();
    selected.sort_by_key(|doc| {
        (
            doc.part,
            doc.chapter_range_start,
            Reverse(doc.chapter_range_end),
        )
    });
    selected.dedup_by_key(|doc| doc.key());

    let covering = documents
        .into_iter()
        .filter(|doc| doc.part == target.part && doc.covers(target.chapter))
        .collect::<Vec<_>>();
    if covering.len() > 1 {
        tracing::debug!(
            part = target.part,
            chapter = target.chapter,
            candidates = covering.len(),
            "overlapping summaries cover the target chapter; keeping the narrowest"
        );
    }
    selected.extend(
        covering
            .into_iter()
            .min_by_key(|doc| (doc.chapter_range_start, doc.chapter_range_end)),
    );

    if selected.is_empty() {
        return Err(RecapError::NotFound(format!(
            "no summary covers part {} chapter {}",
            target.part, target.chapter
        )));
    }
    Ok(selected)
}

pub fn is_gated(html: &str) -> bool {
    GATED_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Paragraphs following the `Summary` heading, up to the next heading of the
/// same level, joined by blank lines.
pub fn extract_summary(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let heading = document
        .select(&HEADING_SELECTOR)
        .find(|h| element_text(h).trim() == SUMMARY_HEADING)?;
    let heading_name = heading.value().name();

    let mut paragraphs = Vec::new();
    for sibling in heading.next_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        let name = element.value().name();
        if name == heading_name {
            break;
        }
        if name != "p" {
            continue;
        }
        let text = element_text(&element);
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }

    if paragraphs.is_empty() {
        return None;
    }
    Some(paragraphs.join("\n\n"))
}

/// Text content with runs of whitespace collapsed to single spaces.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
