use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{FetchError, RecapError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeriesCandidate {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeasonDescriptor {
    pub season_number: u32,
    #[serde(default)]
    pub episode_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeriesDetails {
    #[serde(default)]
    pub seasons: Vec<SeasonDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
}

/// Search and metadata lookups for TV series.
#[async_trait]
pub trait SeriesMetadataClient: Send + Sync {
    /// Candidates in relevance order. Fails with `NotFound` when empty.
    async fn search(&self, query: &str) -> Result<Vec<SeriesCandidate>, RecapError>;

    async fn series_details(&self, series_id: u64) -> Result<SeriesDetails, RecapError>;

    async fn episode_details(
        &self,
        series_id: u64,
        season: u32,
        episode: u32,
    ) -> Result<EpisodeDetails, RecapError>;
}

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub base_url: String,
    pub api_key: String,
    pub language: String,
    pub timeout: Duration,
}

impl TmdbConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.themoviedb.org/3";
    pub const DEFAULT_LANGUAGE: &'static str = "tr-TR";
}

/// TMDB v3 client. Holds no per-request state and is shared across requests.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: reqwest::Client,
    config: TmdbConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SeriesCandidate>,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| FetchError::Transport {
                url: config.base_url.clone(),
                source: err,
            })?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        let base_url = self.config.base_url.trim_end_matches('/');
        format!("{base_url}/{}", path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = self.endpoint(path);
        let timeout = self.config.timeout;
        tracing::debug!(url = %url, "tmdb request");

        let mut query = vec![
            ("api_key", self.config.api_key.as_str()),
            ("language", self.config.language.as_str()),
        ];
        query.extend_from_slice(extra);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(&url, timeout, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|err| FetchError::from_reqwest(&url, timeout, err))?;
        serde_json::from_str(&raw).map_err(|err| FetchError::Decode {
            url,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl SeriesMetadataClient for TmdbClient {
    async fn search(&self, query: &str) -> Result<Vec<SeriesCandidate>, RecapError> {
        let response: SearchResponse = self.get_json("search/tv", &[("query", query)]).await?;
        if response.results.is_empty() {
            return Err(RecapError::NotFound(format!("no series matches {query:?}")));
        }
        Ok(response.results)
    }

    async fn series_details(&self, series_id: u64) -> Result<SeriesDetails, RecapError> {
        Ok(self.get_json(&format!("tv/{series_id}"), &[]).await?)
    }

    async fn episode_details(
        &self,
        series_id: u64,
        season: u32,
        episode: u32,
    ) -> Result<EpisodeDetails, RecapError> {
        Ok(self
            .get_json(
                &format!("tv/{series_id}/season/{season}/episode/{episode}"),
                &[],
            )
            .await?)
    }
}
