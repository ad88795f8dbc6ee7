use crate::error::RecapError;
use crate::model::{ResolvedWindow, SequenceKey, SeriesTarget, SummaryUnit};
use crate::tmdb::{SeasonDescriptor, SeriesCandidate, SeriesMetadataClient};

/// Season 0 holds specials, which are never part of canonical numbering.
const SPECIALS_SEASON: u32 = 0;

/// Walks a series' seasons and episodes up to a target episode.
pub struct SeriesWindowResolver<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C> SeriesWindowResolver<'a, C>
where
    C: SeriesMetadataClient + ?Sized,
{
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, target: &SeriesTarget) -> Result<ResolvedWindow, RecapError> {
        let candidates = self.client.search(&target.series_title).await?;
        let series = pick_canonical_series(&candidates).ok_or_else(|| {
            RecapError::NotFound(format!("no series matches {:?}", target.series_title))
        })?;
        tracing::info!(
            title = %target.series_title,
            series_id = series.id,
            name = %series.name,
            "resolved series"
        );

        let details = self.client.series_details(series.id).await?;
        let seasons = canonical_seasons(&details.seasons);

        let mut window = ResolvedWindow::new();
        for season in seasons {
            if season.season_number > target.season {
                break;
            }

            let upper = episode_upper_bound(season, target);
            for episode in 1..=upper {
                let detail = self
                    .client
                    .episode_details(series.id, season.season_number, episode)
                    .await?;

                let label = format!("S{}E{} - {}", season.season_number, episode, detail.name);
                let overview = detail.overview.as_deref().unwrap_or_default();
                match SummaryUnit::new(
                    SequenceKey::new(season.season_number, episode),
                    label,
                    overview,
                ) {
                    Some(unit) => {
                        window.push(unit);
                    }
                    None => {
                        tracing::debug!(
                            season = season.season_number,
                            episode,
                            "episode has no overview; skipping"
                        );
                    }
                }
            }
        }

        tracing::info!(
            title = %target.series_title,
            season = target.season,
            episode = target.episode,
            units = window.len(),
            "series window resolved"
        );
        Ok(window)
    }
}

/// The first search result is taken as the series; there is no disambiguation
/// among same-titled shows.
pub fn pick_canonical_series(candidates: &[SeriesCandidate]) -> Option<&SeriesCandidate> {
    candidates.first()
}

fn canonical_seasons(seasons: &[SeasonDescriptor]) -> Vec<&SeasonDescriptor> {
    let mut out = seasons
        .iter()
        .filter(|s| s.season_number != SPECIALS_SEASON)
        .collect::<Vec<_>>();
    out.sort_by_key(|s| s.season_number);
    out.dedup_by_key(|s| s.season_number);
    out
}

fn episode_upper_bound(season: &SeasonDescriptor, target: &SeriesTarget) -> u32 {
    if season.season_number == target.season {
        target.episode
    } else {
        season.episode_count
    }
}
