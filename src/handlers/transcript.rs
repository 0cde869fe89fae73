//! # Transcript Endpoint
//!
//! `GET /api/youtube-transcript?videoId=<id>` answers with exactly one of:
//! - 200 `{"transcript": "<fragments joined by single spaces>"}`
//! - 400 `{"error": "No video ID provided"}`
//! - 500 `{"error": "<provider message>"}`
//!
//! The work happens in [`transcript_for`], a plain async function over the provider and
//! the language list. The actix handler only pulls those out of `AppState`.

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    transcript::{self, TranscriptProvider},
};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{info, warn};

pub const MISSING_VIDEO_ID: &str = "No video ID provided";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed. Use GET with ?videoId=";

/// Success body of the transcript endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

/// First non-empty `videoId` value of a raw query string.
///
/// Unparseable query strings count as "no video id".
pub fn video_id_from_query(query: &str) -> Option<String> {
    let pairs = web::Query::<Vec<(String, String)>>::from_query(query).ok()?;
    pairs
        .into_inner()
        .into_iter()
        .find(|(key, value)| key == "videoId" && !value.is_empty())
        .map(|(_, value)| value)
}

/// Resolve one request against a provider.
pub async fn transcript_for(
    provider: &dyn TranscriptProvider,
    languages: &[String],
    video_id: Option<&str>,
) -> AppResult<TranscriptResponse> {
    let video_id = match video_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(AppError::BadRequest(MISSING_VIDEO_ID.to_string())),
    };

    let transcript = transcript::fetch_transcript_text(provider, video_id, languages)
        .await
        .map_err(|err| {
            warn!(video_id = %video_id, provider = provider.name(), error = %err, "Transcript fetch failed");
            AppError::from(err)
        })?;

    info!(video_id = %video_id, chars = transcript.len(), "Transcript fetched");
    Ok(TranscriptResponse { transcript })
}

pub async fn get_transcript(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let video_id = video_id_from_query(req.query_string());
    let body = transcript_for(state.provider.as_ref(), state.languages(), video_id.as_deref()).await?;
    Ok(HttpResponse::Ok().json(body))
}

pub async fn method_not_allowed() -> Result<HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed(METHOD_NOT_ALLOWED.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::transcript::testing::FakeProvider;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn call(provider: FakeProvider, uri: &str) -> (StatusCode, Value) {
        let state = AppState::new(AppConfig::default(), Arc::new(provider));
        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::resource("/api/youtube-transcript")
                    .route(web::get().to(get_transcript))
                    .default_service(web::to(method_not_allowed)),
            ),
        )
        .await;

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await;
        let status = res.status();
        let body: Value = actix_test::read_body_json(res).await;
        (status, body)
    }

    /// Exactly one of `transcript` / `error` is present.
    fn assert_single_shape(body: &Value) {
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("transcript") ^ object.contains_key("error"));
    }

    #[actix_web::test]
    async fn test_missing_video_id() {
        for uri in ["/api/youtube-transcript", "/api/youtube-transcript?videoId=", "/api/youtube-transcript?other=1"] {
            let (status, body) = call(FakeProvider::english(&["a"]), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "No video ID provided" }));
        }
    }

    #[actix_web::test]
    async fn test_joins_fragments_in_order() {
        let (status, body) = call(
            FakeProvider::english(&["a", "b", "c"]),
            "/api/youtube-transcript?videoId=dQw4w9WgXcQ",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "transcript": "a b c" }));
        assert_single_shape(&body);
    }

    #[actix_web::test]
    async fn test_single_and_empty_fragment_lists() {
        let (_, body) = call(FakeProvider::english(&["hello"]), "/api/youtube-transcript?videoId=x").await;
        assert_eq!(body, json!({ "transcript": "hello" }));

        let (status, body) = call(FakeProvider::english(&[]), "/api/youtube-transcript?videoId=x").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "transcript": "" }));
    }

    #[actix_web::test]
    async fn test_provider_failure_is_500_with_message() {
        let (status, body) = call(FakeProvider::missing(), "/api/youtube-transcript?videoId=X").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "No transcripts were found for video_id X" }));
        assert_single_shape(&body);
    }

    #[actix_web::test]
    async fn test_non_english_only_video_fails() {
        use crate::transcript::{testing::track, TranscriptFragment};
        let provider = FakeProvider::with_tracks(vec![track(
            "v",
            "de",
            false,
            vec![TranscriptFragment::new("hallo", 0.0, 1.0)],
        )]);
        let (status, body) = call(provider, "/api/youtube-transcript?videoId=v").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "No transcripts were found for video_id v" }));
    }

    #[actix_web::test]
    async fn test_repeated_requests_are_identical() {
        let provider = FakeProvider::english(&["same", "words"]);
        let first = transcript_for(&provider, &["en".to_string()], Some("v")).await;
        let second = transcript_for(&provider, &["en".to_string()], Some("v")).await;
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn test_other_methods_rejected() {
        let state = AppState::new(AppConfig::default(), Arc::new(FakeProvider::english(&["a"])));
        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::resource("/api/youtube-transcript")
                    .route(web::get().to(get_transcript))
                    .default_service(web::to(method_not_allowed)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::post().uri("/api/youtube-transcript?videoId=x").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body, json!({ "error": METHOD_NOT_ALLOWED }));
    }

    #[test]
    fn test_video_id_from_query() {
        assert_eq!(video_id_from_query("videoId=abc"), Some("abc".to_string()));
        assert_eq!(video_id_from_query("videoId=&videoId=abc"), Some("abc".to_string()));
        assert_eq!(video_id_from_query("videoId=a%20b"), Some("a b".to_string()));
        assert_eq!(video_id_from_query("videoid=abc"), None);
        assert_eq!(video_id_from_query(""), None);
    }
}
