//! # Transcript Module
//!
//! Retrieves caption data for a video from an external transcript source and flattens it
//! into a single block of text.
//!
//! ## Key Components:
//! - **TranscriptProvider**: The seam to the outside world. It can list the caption
//!   tracks of a video and fetch the fragments of one track.
//! - **Track selection**: Picks a track using an ordered language preference list
//! - **Joining**: Concatenates fragment texts with single spaces, keeping provider order
//!
//! ## Providers:
//! - **youtube**: Reads the caption tracks embedded in the YouTube watch page
//! - **scrape_creators**: Asks the ScrapeCreators API, which returns the transcript inline
//!
//! ## Why a trait:
//! HTTP handlers only see `Arc<dyn TranscriptProvider>`, so tests swap in a fake provider
//! and no handler test ever touches the network.

pub mod scrape_creators; // ScrapeCreators API client
pub mod youtube;         // YouTube watch-page scraper

pub use scrape_creators::ScrapeCreatorsProvider;
pub use youtube::YouTubeProvider;

use crate::config::{ProviderKind, TranscriptConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One caption line as delivered by the provider.
///
/// Only `text` is used to build the response; timing is kept for logging and future use.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFragment {
    pub text: String,
    /// Offset from the start of the video, in seconds
    pub start: f64,
    /// How long the line is shown, in seconds
    pub duration: f64,
}

impl TranscriptFragment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Where a track's fragments come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackLocator {
    /// Fragments must be downloaded from this URL
    Url(String),
    /// The provider already returned the fragments while listing
    Inline(Vec<TranscriptFragment>),
}

/// A caption track available for a video.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTrack {
    pub video_id: String,
    /// Language code such as "en" or "en-GB"
    pub language_code: String,
    /// Human readable language name ("English (auto-generated)")
    pub language: String,
    /// Auto-generated (speech recognition) captions rather than uploaded ones
    pub is_generated: bool,
    pub locator: TrackLocator,
}

/// Failures at the provider boundary.
///
/// The `Display` text of each variant is what clients receive in the `error` field,
/// so every message has to make sense on its own.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid video id {0}: pass the video id, not the video URL")]
    InvalidVideoId(String),

    #[error("The video is no longer available (video_id: {video_id})")]
    VideoUnavailable { video_id: String },

    #[error("Subtitles are disabled for this video (video_id: {video_id})")]
    TranscriptsDisabled { video_id: String },

    #[error("YouTube is receiving too many requests from this IP (video_id: {video_id})")]
    TooManyRequests { video_id: String },

    #[error("No transcripts were found for video_id {video_id}")]
    NoTranscriptFound { video_id: String },

    #[error("{source_name} error: {status}")]
    Upstream { source_name: &'static str, status: u16 },

    #[error("Request to transcript source failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from transcript source: {0}")]
    InvalidResponse(String),
}

/// Capability to list and fetch transcripts for a video.
///
/// ## Rust Concepts:
/// - **#[async_trait]**: Async functions in a trait object (`dyn TranscriptProvider`)
/// - **Send + Sync**: The provider is shared by every actix worker thread through an `Arc`
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Short name used in logs and the health endpoint
    fn name(&self) -> &'static str;

    /// List every caption track the video offers.
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptTrack>, ProviderError>;

    /// Fetch the ordered fragments of one track.
    async fn fetch(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptFragment>, ProviderError>;
}

/// Pick a track following the language preference order.
///
/// For each language code, in order, a manually created track beats an auto-generated
/// one. Languages outside the list are never chosen.
pub fn select_track(
    video_id: &str,
    tracks: Vec<TranscriptTrack>,
    languages: &[String],
) -> Result<TranscriptTrack, ProviderError> {
    for code in languages {
        let mut candidates: Vec<&TranscriptTrack> = tracks
            .iter()
            .filter(|track| track.language_code == *code)
            .collect();
        // false < true: manual tracks first
        candidates.sort_by_key(|track| track.is_generated);

        if let Some(track) = candidates.first() {
            return Ok((*track).clone());
        }
    }

    Err(ProviderError::NoTranscriptFound {
        video_id: video_id.to_string(),
    })
}

/// Concatenate fragment texts with single spaces, preserving order.
pub fn join_fragments(fragments: &[TranscriptFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// List, select and fetch: the whole provider conversation for one video.
pub async fn fetch_transcript_text(
    provider: &dyn TranscriptProvider,
    video_id: &str,
    languages: &[String],
) -> Result<String, ProviderError> {
    let tracks = provider.list_transcripts(video_id).await?;
    debug!(
        video_id = %video_id,
        provider = provider.name(),
        available = tracks.len(),
        "Listed transcript tracks"
    );

    let track = select_track(video_id, tracks, languages)?;
    debug!(
        video_id = %video_id,
        language_code = %track.language_code,
        language = %track.language,
        is_generated = track.is_generated,
        "Selected transcript track"
    );

    let fragments = provider.fetch(&track).await?;
    let covered_secs = fragments
        .last()
        .map(|last| last.start + last.duration)
        .unwrap_or(0.0);
    debug!(
        video_id = %video_id,
        fragments = fragments.len(),
        covered_secs,
        "Fetched transcript fragments"
    );

    Ok(join_fragments(&fragments))
}

/// Shared HTTP client with the configured timeout.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("transcript-backend/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Build the provider selected in the configuration.
pub fn build_provider(config: &TranscriptConfig) -> anyhow::Result<Arc<dyn TranscriptProvider>> {
    let client = http_client(Duration::from_secs(config.request_timeout_secs))?;

    let provider: Arc<dyn TranscriptProvider> = match config.provider {
        ProviderKind::Youtube => Arc::new(YouTubeProvider::new(client, &config.youtube_base_url)),
        ProviderKind::ScrapeCreators => {
            let api_key = config
                .scrape_creators_api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Server missing SCRAPECREATORS_API_KEY"))?;
            Arc::new(ScrapeCreatorsProvider::new(
                client,
                &config.scrape_creators_endpoint,
                api_key,
            ))
        }
    };

    Ok(provider)
}


#[cfg(test)]
mod tests {
    use super::testing::{track, FakeProvider};
    use super::*;

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn frag(text: &str) -> TranscriptFragment {
        TranscriptFragment::new(text, 0.0, 1.0)
    }

    #[test]
    fn test_join_preserves_order_with_single_spaces() {
        let fragments = vec![frag("a"), frag("b"), frag("c")];
        assert_eq!(join_fragments(&fragments), "a b c");
    }

    #[test]
    fn test_join_single_and_empty() {
        assert_eq!(join_fragments(&[frag("hello")]), "hello");
        assert_eq!(join_fragments(&[]), "");
    }

    #[test]
    fn test_select_prefers_manual_over_generated() {
        let tracks = vec![
            track("v", "en", true, vec![frag("auto")]),
            track("v", "en", false, vec![frag("manual")]),
        ];
        let chosen = select_track("v", tracks, &langs(&["en"])).unwrap();
        assert!(!chosen.is_generated);
    }

    #[test]
    fn test_select_follows_language_order() {
        let tracks = vec![
            track("v", "de", false, vec![frag("hallo")]),
            track("v", "en", true, vec![frag("hello")]),
        ];
        let chosen = select_track("v", tracks.clone(), &langs(&["en", "de"])).unwrap();
        assert_eq!(chosen.language_code, "en");

        let chosen = select_track("v", tracks, &langs(&["fr", "de"])).unwrap();
        assert_eq!(chosen.language_code, "de");
    }

    /// No fallback to languages outside the preference list.
    #[test]
    fn test_select_without_match_fails() {
        let tracks = vec![track("v", "de", false, vec![frag("hallo")])];
        let err = select_track("v", tracks, &langs(&["en"])).unwrap_err();
        assert_eq!(err.to_string(), "No transcripts were found for video_id v");
    }

    #[tokio::test]
    async fn test_fetch_transcript_text_end_to_end() {
        let provider = FakeProvider::english(&["never", "gonna", "give"]);
        let text = fetch_transcript_text(&provider, "vid", &langs(&["en"])).await.unwrap();
        assert_eq!(text, "never gonna give");
    }

    #[tokio::test]
    async fn test_fetch_transcript_text_propagates_failure() {
        let provider = FakeProvider::missing();
        let err = fetch_transcript_text(&provider, "X", &langs(&["en"])).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoTranscriptFound { .. }));
    }

    #[test]
    fn test_upstream_message() {
        let err = ProviderError::Upstream {
            source_name: "ScrapeCreators",
            status: 404,
        };
        assert_eq!(err.to_string(), "ScrapeCreators error: 404");
    }

    #[test]
    fn test_build_provider_respects_kind() {
        let mut config = crate::config::AppConfig::default().transcript;
        assert_eq!(build_provider(&config).unwrap().name(), "youtube");

        config.provider = ProviderKind::ScrapeCreators;
        assert!(build_provider(&config).is_err());

        config.scrape_creators_api_key = Some("key".to_string());
        assert_eq!(build_provider(&config).unwrap().name(), "scrape_creators");
    }
}
