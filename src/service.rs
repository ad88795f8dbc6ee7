use std::sync::Arc;

use anyhow::Context as _;
use chrono::SecondsFormat;

use crate::book::{BookSiteConfig, BookWindowResolver};
use crate::compose::{RecapComposer, RecapMedium};
use crate::config::RecapConfig;
use crate::error::RecapError;
use crate::fetch::HttpPageFetcher;
use crate::generate::{self, TextGenerator};
use crate::model::{BookTarget, BookTargetRequest, RecapResponse, ResolvedWindow, SeriesTarget};
use crate::sections::parse_recap_sections;
use crate::series::SeriesWindowResolver;
use crate::tmdb::{SeriesMetadataClient, TmdbClient};

/// Request-level orchestration: normalize, resolve, compose, split.
///
/// Shared collaborators are stateless and held behind `Arc`; a book run gets
/// its own page fetcher, dropped when the run finishes.
#[derive(Clone)]
pub struct RecapService {
    tmdb: Option<Arc<dyn SeriesMetadataClient>>,
    series_generator: Arc<dyn TextGenerator>,
    book_generator: Arc<dyn TextGenerator>,
    book_site: BookSiteConfig,
    output_language: String,
}

impl RecapService {
    pub fn new(
        tmdb: Option<Arc<dyn SeriesMetadataClient>>,
        series_generator: Arc<dyn TextGenerator>,
        book_generator: Arc<dyn TextGenerator>,
        book_site: BookSiteConfig,
        output_language: String,
    ) -> Self {
        Self {
            tmdb,
            series_generator,
            book_generator,
            book_site,
            output_language,
        }
    }

    pub fn from_config(config: &RecapConfig) -> anyhow::Result<Self> {
        let tmdb = match &config.tmdb {
            Some(tmdb) => {
                let client = TmdbClient::new(tmdb.clone()).context("build TMDB client")?;
                Some(Arc::new(client) as Arc<dyn SeriesMetadataClient>)
            }
            None => {
                tracing::warn!("TMDB_API_KEY is not set; series recaps are disabled");
                None
            }
        };

        let series_generator =
            generate::build_generator(&config.generator).context("build series generator")?;
        let mut book_config = config.generator.clone();
        book_config.system_instruction = generate::BOOK_SYSTEM_INSTRUCTION.to_owned();
        let book_generator =
            generate::build_generator(&book_config).context("build book generator")?;

        Ok(Self::new(
            tmdb,
            series_generator,
            book_generator,
            config.book_site.clone(),
            config.output_language.clone(),
        ))
    }

    pub async fn series_window(&self, target: &SeriesTarget) -> Result<ResolvedWindow, RecapError> {
        let tmdb = self
            .tmdb
            .as_deref()
            .ok_or_else(|| RecapError::NotConfigured("TMDB_API_KEY is not set".to_owned()))?;
        SeriesWindowResolver::new(tmdb).resolve(target).await
    }

    pub async fn book_window(&self, target: &BookTarget) -> Result<ResolvedWindow, RecapError> {
        let fetcher = HttpPageFetcher::new()?;
        BookWindowResolver::new(fetcher, self.book_site.clone())
            .resolve(target)
            .await
    }

    pub async fn recap_series(&self, target: &SeriesTarget) -> Result<RecapResponse, RecapError> {
        let window = self.series_window(target).await?;
        let composer = RecapComposer::new(self.series_generator.as_ref(), &self.output_language);
        let text = composer
            .compose(
                RecapMedium::Series,
                &target.series_title,
                &target.label(),
                &window,
            )
            .await?;
        Ok(into_response(&text))
    }

    /// Applies the default part before anything else runs.
    pub async fn recap_book(&self, request: &BookTargetRequest) -> Result<RecapResponse, RecapError> {
        let target = request.normalize()?;
        let window = self.book_window(&target).await?;
        let composer = RecapComposer::new(self.book_generator.as_ref(), &self.output_language);
        let text = composer
            .compose(RecapMedium::Book, &target.book_title, &target.label(), &window)
            .await?;
        Ok(into_response(&text))
    }
}

fn into_response(text: &str) -> RecapResponse {
    let sections = parse_recap_sections(text);
    RecapResponse {
        character_context: sections.character_context,
        story_recap: sections.story_recap,
        generated_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}
