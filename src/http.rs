use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::error::{ErrorKind, RecapError};
use crate::model::{BookTargetRequest, RecapResponse, SeriesTarget};
use crate::service::RecapService;

#[derive(Clone)]
pub struct AppState {
    pub service: RecapService,
}

#[derive(Debug, Deserialize)]
pub struct SeriesRecapRequest {
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/recap/series", post(recap_series))
        .route("/recap/book", post(recap_book))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn recap_series(
    State(state): State<AppState>,
    request: Result<Json<SeriesRecapRequest>, JsonRejection>,
) -> Result<Json<RecapResponse>, ApiError> {
    let Json(request) = request?;
    let target = SeriesTarget::new(&request.title, request.season, request.episode)?;
    let response = state.service.recap_series(&target).await?;
    Ok(Json(response))
}

async fn recap_book(
    State(state): State<AppState>,
    request: Result<Json<BookTargetRequest>, JsonRejection>,
) -> Result<Json<RecapResponse>, ApiError> {
    let Json(request) = request?;
    let response = state.service.recap_book(&request).await?;
    Ok(Json(response))
}

/// Maps a failed recap run to a status code and `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError(RecapError);

impl From<RecapError> for ApiError {
    fn from(err: RecapError) -> Self {
        Self(err)
    }
}

// Undecodable bodies (negative numbers, missing fields) are bad targets, not empty windows.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RecapError::InvalidTarget(rejection.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidTarget => StatusCode::BAD_REQUEST,
            ErrorKind::EmptyWindow => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, %status, "recap failed");
        } else {
            tracing::info!(error = %self.0, %status, "recap rejected");
        }
        let body = serde_json::json!({ "detail": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt as _;

    use super::*;
    use crate::book::{BookSiteConfig, Throttle};
    use crate::error::GenerateError;
    use crate::generate::TextGenerator;
    use crate::tmdb::{
        EpisodeDetails, SeasonDescriptor, SeriesCandidate, SeriesDetails, SeriesMetadataClient,
    };

    struct ShortSeries {
        overviews: bool,
    }

    #[async_trait]
    impl SeriesMetadataClient for ShortSeries {
        async fn search(&self, query: &str) -> Result<Vec<SeriesCandidate>, RecapError> {
            if query == "Nothing" {
                return Err(RecapError::NotFound(format!("no series matches {query:?}")));
            }
            Ok(vec![SeriesCandidate {
                id: 1,
                name: query.to_owned(),
            }])
        }

        async fn series_details(&self, _series_id: u64) -> Result<SeriesDetails, RecapError> {
            Ok(SeriesDetails {
                seasons: vec![SeasonDescriptor {
                    season_number: 1,
                    episode_count: 2,
                }],
            })
        }

        async fn episode_details(
            &self,
            _series_id: u64,
            _season: u32,
            episode: u32,
        ) -> Result<EpisodeDetails, RecapError> {
            Ok(EpisodeDetails {
                name: format!("Ep {episode}"),
                overview: self.overviews.then(|| format!("Overview {episode}.")),
            })
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            Ok("SECTION 1 — CHARACTER CONTEXT\n• A: lead.\nSECTION 2 — STORY RECAP\nStory.".to_owned())
        }
    }

    fn app(overviews: bool) -> Router {
        let generator: Arc<dyn TextGenerator> = Arc::new(FixedGenerator);
        let service = RecapService::new(
            Some(Arc::new(ShortSeries { overviews })),
            Arc::clone(&generator),
            generator,
            BookSiteConfig {
                base_url: "http://127.0.0.1:9/lit".to_owned(),
                index_timeout: Duration::from_secs(1),
                document_timeout: Duration::from_secs(1),
                delay: Throttle::NONE,
            },
            "English".to_owned(),
        );
        router(AppState { service })
    }

    async fn post_json(app: Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let response = app(true)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn series_recap_returns_camel_case_payload() {
        let (status, body) = post_json(
            app(true),
            "/recap/series",
            serde_json::json!({ "title": "Show", "season": 1, "episode": 2 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["characterContext"], serde_json::json!(["• A: lead."]));
        assert_eq!(body["storyRecap"], "Story.");
        assert!(body["generatedAt"].is_string());
    }

    #[tokio::test]
    async fn errors_map_to_status_and_detail() {
        let (status, body) = post_json(
            app(true),
            "/recap/series",
            serde_json::json!({ "title": "Nothing", "season": 1, "episode": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("Nothing"));

        let (status, _) = post_json(
            app(true),
            "/recap/series",
            serde_json::json!({ "title": "Show", "season": 0, "episode": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(
            app(false),
            "/recap/series",
            serde_json::json!({ "title": "Show", "season": 1, "episode": 2 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().starts_with("nothing to recap yet"));
    }

    #[tokio::test]
    async fn book_request_with_zero_chapter_is_bad_request() {
        let (status, _) = post_json(
            app(true),
            "/recap/book",
            serde_json::json!({ "title": "Dune", "chapter": 0 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undecodable_bodies_are_bad_requests_with_detail() {
        let (status, body) = post_json(
            app(true),
            "/recap/series",
            serde_json::json!({ "title": "Show", "season": -1, "episode": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("season"));

        let (status, body) = post_json(
            app(true),
            "/recap/book",
            serde_json::json!({ "title": "Dune", "chapter": 2, "part": -3 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("invalid target"));

        let (status, body) = post_json(
            app(true),
            "/recap/book",
            serde_json::json!({ "chapter": 2 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }
}
