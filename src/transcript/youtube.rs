//! YouTube watch-page provider.
//!
//! The watch page embeds the player response, whose `captions` object lists every caption
//! track with a signed `baseUrl`. Fetching that URL with `fmt=json3` returns the caption
//! events as JSON, one event per on-screen line.

use super::{ProviderError, TrackLocator, TranscriptFragment, TranscriptProvider, TranscriptTrack};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

const SOURCE_NAME: &str = "YouTube";
const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";

pub struct YouTubeProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YouTubeProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn watch_page(&self, video_id: &str, consent: Option<&str>) -> Result<String, ProviderError> {
        let mut request = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)])
            .header(ACCEPT_LANGUAGE, "en-US");
        if let Some(value) = consent {
            request = request.header(COOKIE, format!("CONSENT=YES+{}", value));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(video_id, status));
        }
        Ok(response.text().await?)
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            url.to_string()
        }
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeProvider {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptTrack>, ProviderError> {
        if video_id.starts_with("http://") || video_id.starts_with("https://") {
            return Err(ProviderError::InvalidVideoId(video_id.to_string()));
        }

        let mut html = self.watch_page(video_id, None).await?;

        // EU visitors get a cookie consent form instead of the watch page
        if html.contains(CONSENT_FORM_MARKER) {
            let value = consent_value(&html)
                .map(str::to_string)
                .ok_or_else(|| ProviderError::InvalidResponse("unreadable consent form".to_string()))?;
            debug!(video_id = %video_id, "Accepting YouTube cookie consent");
            html = self.watch_page(video_id, Some(&value)).await?;
            if html.contains(CONSENT_FORM_MARKER) {
                warn!(video_id = %video_id, "Consent form shown again after accepting");
                return Err(ProviderError::InvalidResponse(
                    "cookie consent could not be accepted".to_string(),
                ));
            }
        }

        extract_caption_tracks(video_id, &html)
    }

    async fn fetch(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptFragment>, ProviderError> {
        let url = match &track.locator {
            TrackLocator::Url(url) => self.absolute_url(url),
            TrackLocator::Inline(fragments) => return Ok(fragments.clone()),
        };
        debug!(video_id = %track.video_id, language_code = %track.language_code, "Downloading caption track");

        let response = self
            .client
            .get(url)
            .query(&[("fmt", "json3")])
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&track.video_id, status));
        }

        parse_json3(&response.text().await?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    name: Option<TrackName>,
    /// "asr" marks automatic speech recognition tracks
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn text(&self) -> Option<String> {
        if let Some(text) = &self.simple_text {
            return Some(text.clone());
        }
        if self.runs.is_empty() {
            return None;
        }
        Some(self.runs.iter().map(|run| run.text.as_str()).collect())
    }
}

/// Read the caption track list out of a watch page.
pub fn extract_caption_tracks(video_id: &str, html: &str) -> Result<Vec<TranscriptTrack>, ProviderError> {
    let Some((_, rest)) = html.split_once("\"captions\":") else {
        if html.contains("class=\"g-recaptcha\"") {
            return Err(ProviderError::TooManyRequests {
                video_id: video_id.to_string(),
            });
        }
        if !html.contains("\"playabilityStatus\":") {
            return Err(ProviderError::VideoUnavailable {
                video_id: video_id.to_string(),
            });
        }
        return Err(ProviderError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    };

    // The captions object is followed by the rest of the player response; read one value only
    let captions: Captions = serde_json::Deserializer::from_str(rest)
        .into_iter::<Captions>()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("truncated captions object".to_string()))?
        .map_err(|e| ProviderError::InvalidResponse(format!("captions object: {}", e)))?;

    let tracks: Vec<TranscriptTrack> = captions
        .player_captions_tracklist_renderer
        .map(|renderer| renderer.caption_tracks)
        .unwrap_or_default()
        .into_iter()
        .map(|track| {
            let language = track
                .name
                .as_ref()
                .and_then(TrackName::text)
                .unwrap_or_else(|| track.language_code.clone());
            TranscriptTrack {
                video_id: video_id.to_string(),
                is_generated: track.kind.as_deref() == Some("asr"),
                language_code: track.language_code,
                language,
                locator: TrackLocator::Url(track.base_url),
            }
        })
        .collect();

    if tracks.is_empty() {
        return Err(ProviderError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    }

    Ok(tracks)
}

/// Error for a non-2xx answer from YouTube; 429 means the IP is being throttled.
fn status_error(video_id: &str, status: StatusCode) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::TooManyRequests {
            video_id: video_id.to_string(),
        };
    }
    ProviderError::Upstream {
        source_name: SOURCE_NAME,
        status: status.as_u16(),
    }
}

/// Value of the hidden `v` input in YouTube's consent form.
fn consent_value(html: &str) -> Option<&str> {
    let (_, rest) = html.split_once("name=\"v\" value=\"")?;
    let (value, _) = rest.split_once('"')?;
    Some(value)
}

#[derive(Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSegment>,
}

#[derive(Deserialize)]
struct TimedTextSegment {
    #[serde(default)]
    utf8: String,
}

/// Convert a `json3` timed-text document into fragments.
///
/// Events carrying only whitespace (line breaks between cues) are dropped.
pub fn parse_json3(body: &str) -> Result<Vec<TranscriptFragment>, ProviderError> {
    if body.trim().is_empty() {
        return Err(ProviderError::InvalidResponse("empty caption track".to_string()));
    }

    let timed_text: TimedText = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("caption track: {}", e)))?;

    let fragments = timed_text
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.replace('\n', " ");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptFragment::new(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
            ))
        })
        .collect();

    Ok(fragments)
}
