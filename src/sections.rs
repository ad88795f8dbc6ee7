use crate::compose::{SECTION_1_MARKER, SECTION_2_MARKER};
use crate::model::RecapSections;

pub const UNPARSED_CHARACTER_CONTEXT: &str = "Unable to parse character context";

const CHARACTER_CONTEXT_TITLE: &str = "CHARACTER CONTEXT";
const STORY_RECAP_TITLE: &str = "STORY RECAP";

/// Best-effort split of generated recap text.
///
/// Everything before the first `SECTION 2 —` is treated as character context,
/// one bullet per kept line; everything after is the story recap. Missing
/// pieces fall back to a fixed placeholder bullet and to the raw text.
pub fn parse_recap_sections(raw: &str) -> RecapSections {
    let (context_part, story_part) = match raw.split_once(SECTION_2_MARKER) {
        Some((before, after)) => (before, after),
        None => (raw, ""),
    };

    let context_part = context_part
        .replace(SECTION_1_MARKER, "")
        .replace(CHARACTER_CONTEXT_TITLE, "");
    let mut character_context = context_part
        .lines()
        .map(str::trim)
        .filter(|line| keep_context_line(line))
        .map(str::to_owned)
        .collect::<Vec<_>>();
    if character_context.is_empty() {
        character_context.push(UNPARSED_CHARACTER_CONTEXT.to_owned());
    }

    let story_part = story_part.replacen(STORY_RECAP_TITLE, "", 1);
    let mut story_recap = story_part.trim().to_owned();
    if story_recap.is_empty() {
        tracing::warn!(chars = raw.len(), "recap text has no story section; using raw text");
        story_recap = raw.to_owned();
    }

    RecapSections {
        character_context,
        story_recap,
    }
}

fn keep_context_line(line: &str) -> bool {
    if line.starts_with('•') {
        return true;
    }
    !line.is_empty() && !line.starts_with('-')
}
