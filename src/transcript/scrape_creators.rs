//! ScrapeCreators provider.
//!
//! One authenticated GET returns the whole transcript, so listing already yields the
//! fragments and `fetch` just hands them back.

use super::{ProviderError, TrackLocator, TranscriptFragment, TranscriptProvider, TranscriptTrack};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const SOURCE_NAME: &str = "ScrapeCreators";
const DEFAULT_LANGUAGE: &str = "en";
/// Marks a language name that could not be turned into a code
const UNKNOWN_LANGUAGE_PREFIX: &str = "unknown:";
/// Longest upstream error body excerpt written to the log
const ERROR_EXCERPT_CHARS: usize = 500;

pub struct ScrapeCreatorsProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ScrapeCreatorsProvider {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: String) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.trim().to_string(),
        }
    }
}

#[async_trait]
impl TranscriptProvider for ScrapeCreatorsProvider {
    fn name(&self) -> &'static str {
        "scrape_creators"
    }

    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptTrack>, ProviderError> {
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", video_url.as_str())])
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                video_id = %video_id,
                status = status.as_u16(),
                details = %excerpt(&body, ERROR_EXCERPT_CHARS),
                "ScrapeCreators rejected transcript request"
            );
            return Err(ProviderError::Upstream {
                source_name: SOURCE_NAME,
                status: status.as_u16(),
            });
        }

        let payload: TranscriptPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("ScrapeCreators payload: {}", e)))?;

        Ok(vec![track_from_payload(video_id, payload)?])
    }

    async fn fetch(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptFragment>, ProviderError> {
        match &track.locator {
            TrackLocator::Inline(fragments) => Ok(fragments.clone()),
            TrackLocator::Url(url) => Err(ProviderError::InvalidResponse(format!(
                "ScrapeCreators tracks are inline, got locator {}",
                url
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    transcript: Option<Vec<PayloadLine>>,
    #[serde(default)]
    transcript_only_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayloadLine {
    #[serde(default)]
    text: String,
    /// Sent as a number or as a numeric string
    #[serde(default)]
    start_ms: Option<Value>,
    #[serde(default)]
    end_ms: Option<Value>,
}

fn track_from_payload(video_id: &str, payload: TranscriptPayload) -> Result<TranscriptTrack, ProviderError> {
    let fragments = match (payload.transcript, payload.transcript_only_text) {
        (Some(lines), _) => lines.into_iter().map(fragment_from_line).collect(),
        (None, Some(text)) => vec![TranscriptFragment::new(text, 0.0, 0.0)],
        (None, None) => {
            return Err(ProviderError::InvalidResponse(
                "ScrapeCreators payload has no transcript".to_string(),
            ))
        }
    };

    let language = payload.language.unwrap_or_default();
    let language_code = language_code_for(&language);
    if language_code != language {
        debug!(video_id = %video_id, language = %language, language_code = %language_code, "Derived transcript language code");
    }

    Ok(TranscriptTrack {
        video_id: video_id.to_string(),
        language: if language.is_empty() { language_code.clone() } else { language },
        language_code,
        is_generated: false,
        locator: TrackLocator::Inline(fragments),
    })
}

fn fragment_from_line(line: PayloadLine) -> TranscriptFragment {
    let start_ms = line.start_ms.as_ref().and_then(millis).unwrap_or(0.0);
    let end_ms = line.end_ms.as_ref().and_then(millis).unwrap_or(start_ms);
    TranscriptFragment::new(
        line.text,
        start_ms / 1000.0,
        (end_ms - start_ms).max(0.0) / 1000.0,
    )
}

fn millis(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Language code for the payload's `language` field.
///
/// Codes pass through, English names map to `en` and a missing value means the
/// default language. Any other name gets a code no preference list contains, so
/// selection reports the transcript as missing instead of mislabelling it.
fn language_code_for(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        return DEFAULT_LANGUAGE.to_string();
    }
    if looks_like_language_code(trimmed) {
        return trimmed.to_string();
    }
    if trimmed.to_ascii_lowercase().starts_with("english") {
        return "en".to_string();
    }
    format!("{}{}", UNKNOWN_LANGUAGE_PREFIX, trimmed)
}

/// "en" or "pt-BR"; full names such as "English" are not codes.
fn looks_like_language_code(value: &str) -> bool {
    match value.split_once('-') {
        Some((lang, region)) => is_alpha_pair(lang) && is_alpha_pair(region),
        None => is_alpha_pair(value),
    }
}

fn is_alpha_pair(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|c| c.is_ascii_alphabetic())
}

fn excerpt(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
