use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Effective configuration; the ScrapeCreators key is only reported as present or absent.
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = &state.config;

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "transcript": {
                "provider": config.transcript.provider,
                "languages": config.transcript.languages,
                "request_timeout_secs": config.transcript.request_timeout_secs,
                "youtube_base_url": config.transcript.youtube_base_url,
                "scrape_creators_endpoint": config.transcript.scrape_creators_endpoint,
                "scrape_creators_api_key_set": config.has_api_key()
            }
        }
    })))
}
