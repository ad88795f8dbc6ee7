use crate::error::RecapError;
use crate::generate::TextGenerator;
use crate::model::ResolvedWindow;

pub const SECTION_1_MARKER: &str = "SECTION 1 —";
pub const SECTION_2_MARKER: &str = "SECTION 2 —";

pub const DEFAULT_OUTPUT_LANGUAGE: &str = "Turkish";

/// Which template to use; wording differs between episodes and chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecapMedium {
    Series,
    Book,
}

impl RecapMedium {
    fn unit_noun(self) -> &'static str {
        match self {
            Self::Series => "episode",
            Self::Book => "chapter",
        }
    }

    fn units_heading(self) -> &'static str {
        match self {
            Self::Series => "EPISODE SUMMARIES",
            Self::Book => "CHAPTER SUMMARIES",
        }
    }
}

/// Builds the two-section recap prompt and hands it to a [`TextGenerator`].
pub struct RecapComposer<'a> {
    generator: &'a dyn TextGenerator,
    output_language: String,
}

impl<'a> RecapComposer<'a> {
    pub fn new(generator: &'a dyn TextGenerator, output_language: &str) -> Self {
        Self {
            generator,
            output_language: output_language.to_owned(),
        }
    }

    /// Returns the generator's text verbatim; section structure is not checked here.
    pub async fn compose(
        &self,
        medium: RecapMedium,
        title: &str,
        target_label: &str,
        window: &ResolvedWindow,
    ) -> Result<String, RecapError> {
        if window.is_empty() {
            return Err(RecapError::EmptyWindow(format!(
                "no summaries available for {title} up to {target_label}"
            )));
        }

        let prompt = build_prompt(medium, title, target_label, window, &self.output_language);
        tracing::info!(
            title,
            target = target_label,
            units = window.len(),
            prompt_chars = prompt.len(),
            "compose recap"
        );

        let text = self.generator.generate(&prompt).await?;
        Ok(text)
    }
}

/// One `"{label}: {text}"` line per unit, in window order.
pub fn build_raw_context(window: &ResolvedWindow) -> String {
    window
        .units()
        .iter()
        .map(|unit| format!("{}: {}", unit.label, unit.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(
    medium: RecapMedium,
    title: &str,
    target_label: &str,
    window: &ResolvedWindow,
    output_language: &str,
) -> String {
    let raw_context = build_raw_context(window);
    let noun = medium.unit_noun();

    let intro = match medium {
        RecapMedium::Series => format!(
            "Below are episode summaries for {title} up to {target_label}."
        ),
        RecapMedium::Book => format!(
            "Below are chapter summaries for the book \"{title}\" up to {target_label}."
        ),
    };

    let atmosphere = match medium {
        RecapMedium::Series => "",
        RecapMedium::Book => {
            "- Before describing events, briefly evoke the atmosphere and setting of the book.\n"
        }
    };

    format!(
        "{intro}\n\
Your task is to create a detailed recap of the story so far and PRODUCE EXACTLY TWO SECTIONS as per the instructions below.\n\
\n\
{SECTION_1_MARKER} CHARACTER CONTEXT\n\
Rules:\n\
- Introduce ONLY the main characters.\n\
- Maximum 1 sentence per character.\n\
- Describe ONLY:\n\
  - who the character is\n\
  - their current role or position in the story\n\
- Do NOT describe events.\n\
- Do NOT mention specific actions or {noun}s.\n\
- Do NOT include cause-effect explanations.\n\
- Use bullet points.\n\
- Keep this section SHORT and STATIC.\n\
\n\
{SECTION_2_MARKER} STORY RECAP\n\
Rules:\n\
{atmosphere}\
- Write the recap as a continuous story, divided into natural paragraphs.\n\
- Each paragraph must focus on ONLY ONE character or character group.\n\
- Do NOT jump between characters within the same paragraph.\n\
- Early {noun}s must be summarized briefly.\n\
- Events closer to {target_label} must be described in more detail.\n\
- Skip minor side events unless they directly affect the current situation.\n\
- Emphasize:\n\
  - turning points\n\
  - conflicts that are still unresolved\n\
  - the character's current position at the stopping point\n\
- Do NOT include headings or labels.\n\
- End the recap with the most recent unresolved tension or decision.\n\
\n\
OUTPUT RULES\n\
- Output language: {output_language}.\n\
- Start directly with {SECTION_1_MARKER} CHARACTER CONTEXT.\n\
- Do NOT add any commentary, explanations or headings other than the two sections.\n\
\n\
{units_heading}:\n\
{raw_context}\n",
        units_heading = medium.units_heading(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::GenerateError;
    use crate::model::{SequenceKey, SummaryUnit};

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.prompts.lock().unwrap().push(prompt.to_owned());
            Ok("SECTION 1 — CHARACTER CONTEXT\n• A\nSECTION 2 — STORY RECAP\nB".to_owned())
        }
    }

    fn window() -> ResolvedWindow {
        let mut window = ResolvedWindow::new();
        for (episode, text) in [(1, "Pilot happens."), (2, "Things escalate.")] {
            window.push(
                SummaryUnit::new(
                    SequenceKey::new(1, episode),
                    format!("S1E{episode} - Ep"),
                    text,
                )
                .unwrap(),
            );
        }
        window
    }

    #[tokio::test]
    async fn empty_window_fails_without_calling_generator() {
        let generator = RecordingGenerator::default();
        let composer = RecapComposer::new(&generator, DEFAULT_OUTPUT_LANGUAGE);

        let err = composer
            .compose(
                RecapMedium::Series,
                "X",
                "Season 1 Episode 1",
                &ResolvedWindow::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RecapError::EmptyWindow(_)));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn compose_returns_generator_output_verbatim() {
        let generator = RecordingGenerator::default();
        let composer = RecapComposer::new(&generator, "English");

        let text = composer
            .compose(RecapMedium::Series, "X", "Season 1 Episode 2", &window())
            .await
            .unwrap();

        assert_eq!(
            text,
            "SECTION 1 — CHARACTER CONTEXT\n• A\nSECTION 2 — STORY RECAP\nB"
        );
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Output language: English."));
    }

    #[test]
    fn raw_context_is_one_line_per_unit_in_order() {
        assert_eq!(
            build_raw_context(&window()),
            "S1E1 - Ep: Pilot happens.\nS1E2 - Ep: Things escalate."
        );
    }

    #[test]
    fn prompt_is_deterministic_and_carries_both_markers() {
        let a = build_prompt(RecapMedium::Series, "X", "Season 1 Episode 2", &window(), "Turkish");
        let b = build_prompt(RecapMedium::Series, "X", "Season 1 Episode 2", &window(), "Turkish");
        assert_eq!(a, b);

        assert!(a.contains("SECTION 1 — CHARACTER CONTEXT"));
        assert!(a.contains("SECTION 2 — STORY RECAP"));
        assert!(a.contains("Events closer to Season 1 Episode 2"));
        assert!(a.contains("EPISODE SUMMARIES:\nS1E1 - Ep: Pilot happens."));
        assert!(a.ends_with("S1E2 - Ep: Things escalate.\n"));
    }

    #[test]
    fn book_prompt_uses_chapter_wording() {
        let prompt = build_prompt(
            RecapMedium::Book,
            "Crime and Punishment",
            "Part 2 Chapter 3",
            &window(),
            "Turkish",
        );
        assert!(prompt.starts_with(
            "Below are chapter summaries for the book \"Crime and Punishment\" up to Part 2 Chapter 3."
        ));
        assert!(prompt.contains("atmosphere"));
        assert!(prompt.contains("CHAPTER SUMMARIES:"));
        assert!(!prompt.contains("episode"));
    }
}
