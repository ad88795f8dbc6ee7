use std::time::Duration;

use anyhow::Context as _;

use crate::book::{BookSiteConfig, Throttle};
use crate::compose::DEFAULT_OUTPUT_LANGUAGE;
use crate::generate::{self, Engine, GeneratorConfig};
use crate::tmdb::TmdbConfig;

pub const INDEX_TIMEOUT: Duration = Duration::from_secs(20);
pub const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(20);
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_FETCH_DELAY_MIN_MS: u64 = 1500;
pub const DEFAULT_FETCH_DELAY_MAX_MS: u64 = 3500;

/// Everything the service needs, read from the process environment.
#[derive(Debug, Clone)]
pub struct RecapConfig {
    /// `None` when `TMDB_API_KEY` is unset; series recaps are then rejected.
    pub tmdb: Option<TmdbConfig>,
    pub book_site: BookSiteConfig,
    pub generator: GeneratorConfig,
    pub output_language: String,
}

impl RecapConfig {
    /// Loads `.env` (if any) and reads the `TMDB_*`, `RECAP_*` and engine key variables.
    pub fn from_env() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).context("load .env"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let tmdb = var("TMDB_API_KEY").map(|api_key| TmdbConfig {
            base_url: var("TMDB_BASE_URL").unwrap_or_else(|| TmdbConfig::DEFAULT_BASE_URL.to_owned()),
            api_key,
            language: var("TMDB_LANGUAGE").unwrap_or_else(|| TmdbConfig::DEFAULT_LANGUAGE.to_owned()),
            timeout: METADATA_TIMEOUT,
        });

        let delay_min = parse_millis(var("RECAP_FETCH_DELAY_MIN_MS"), DEFAULT_FETCH_DELAY_MIN_MS)
            .context("invalid RECAP_FETCH_DELAY_MIN_MS")?;
        let delay_max = parse_millis(var("RECAP_FETCH_DELAY_MAX_MS"), DEFAULT_FETCH_DELAY_MAX_MS)
            .context("invalid RECAP_FETCH_DELAY_MAX_MS")?;
        let book_site = BookSiteConfig {
            base_url: var("RECAP_BOOK_BASE_URL")
                .unwrap_or_else(|| BookSiteConfig::DEFAULT_BASE_URL.to_owned()),
            index_timeout: INDEX_TIMEOUT,
            document_timeout: DOCUMENT_TIMEOUT,
            delay: Throttle::new(delay_min, delay_max),
        };

        let raw_engine = var("RECAP_ENGINE").unwrap_or_default();
        let engine = Engine::parse(&raw_engine).with_context(|| {
            format!("invalid RECAP_ENGINE={raw_engine:?}. expected one of: gemini, openai, command")
        })?;

        let generator = GeneratorConfig {
            engine,
            system_instruction: generate::SERIES_SYSTEM_INSTRUCTION.to_owned(),
            temperature: generate::DEFAULT_TEMPERATURE,
            timeout: GENERATION_TIMEOUT,
            gemini_api_key: var("GEMINI_KEY"),
            gemini_model: var("RECAP_GEMINI_MODEL")
                .unwrap_or_else(|| generate::gemini::DEFAULT_MODEL.to_owned()),
            gemini_base_url: var("RECAP_GEMINI_BASE_URL")
                .unwrap_or_else(|| generate::gemini::DEFAULT_BASE_URL.to_owned()),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("RECAP_OPENAI_MODEL")
                .unwrap_or_else(|| generate::openai::DEFAULT_MODEL.to_owned()),
            openai_base_url: var("RECAP_OPENAI_BASE_URL")
                .unwrap_or_else(|| generate::openai::DEFAULT_BASE_URL.to_owned()),
            command: var("RECAP_COMMAND"),
            command_args: Vec::new(),
        };

        Ok(Self {
            tmdb,
            book_site,
            generator,
            output_language: var("RECAP_OUTPUT_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_OUTPUT_LANGUAGE.to_owned()),
        })
    }
}

fn parse_millis(raw: Option<String>, default: u64) -> anyhow::Result<Duration> {
    let millis = match raw {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("expected milliseconds, got {raw:?}"))?,
        None => default,
    };
    Ok(Duration::from_millis(millis))
}
