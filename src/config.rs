//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP__ prefix, double underscore between sections)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **enums with serde**: `ProviderKind` is written as a plain string ("youtube") in TOML and env vars
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Platform variables (HOST, PORT, SCRAPECREATORS_API_KEY)
//! 2. Environment variables (APP__SERVER__PORT, APP__TRANSCRIPT__LANGUAGES=en,de, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;              // Better error handling with context
use serde::{Deserialize, Serialize};  // For converting to/from TOML, JSON, etc.
use std::env;                    // For reading environment variables
use std::fmt;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// The HTTP server and the transcript provider are configured independently,
/// so each gets its own section (`[server]`, `[transcript]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transcript: TranscriptConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
/// - `port = 8080`: Common development port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,  // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// Which upstream service answers transcript requests.
///
/// ## Rust Concepts:
/// - **#[serde(rename_all = "snake_case")]**: `ScrapeCreators` is spelled `scrape_creators`
///   in config files and environment variables
/// - **Copy**: The enum holds no data, so it can be copied like an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Scrape the caption tracks straight from the YouTube watch page
    Youtube,
    /// Ask the ScrapeCreators API (requires an API key)
    ScrapeCreators,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Youtube => write!(f, "youtube"),
            ProviderKind::ScrapeCreators => write!(f, "scrape_creators"),
        }
    }
}

/// Transcript retrieval settings.
///
/// ## Fields:
/// - `provider`: Which upstream to use (see [`ProviderKind`])
/// - `languages`: Ordered language-code preference list; the first code with a track wins
/// - `request_timeout_secs`: Timeout applied to every outbound HTTP call
/// - `youtube_base_url`: Where watch pages are downloaded from
/// - `scrape_creators_endpoint` / `scrape_creators_api_key`: ScrapeCreators access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    pub provider: ProviderKind,
    pub languages: Vec<String>,
    pub request_timeout_secs: u64,
    pub youtube_base_url: String,
    pub scrape_creators_endpoint: String,
    #[serde(default)]
    pub scrape_creators_api_key: Option<String>,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// With no configuration at all the service fetches English transcripts from YouTube.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),  // Localhost only (safe for development)
                port: 8080,
            },
            transcript: TranscriptConfig {
                provider: ProviderKind::Youtube,
                languages: vec!["en".to_string()],
                request_timeout_secs: 30,
                youtube_base_url: "https://www.youtube.com".to_string(),
                scrape_creators_endpoint:
                    "https://api.scrapecreators.com/v1/youtube/video/transcript".to_string(),
                scrape_creators_api_key: None,
            },
        }
    }
}

/// Implementation block for AppConfig - adds methods to the struct.
impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP__
    /// 4. Handle special cases for HOST, PORT and SCRAPECREATORS_API_KEY
    ///
    /// ## Environment Variable Examples:
    /// - `APP__SERVER__PORT=3000`: Override server port
    /// - `APP__TRANSCRIPT__PROVIDER=scrape_creators`: Switch provider
    /// - `APP__TRANSCRIPT__LANGUAGES=en,en-GB`: Ordered language preferences
    /// - `PORT=3000`: Special case for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = ::config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(::config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists)
            .add_source(::config::File::with_name("config").required(false))
            // 3. Environment variables; a double underscore separates sections because
            //    field names themselves contain single underscores
            .add_source(
                ::config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("transcript.languages"),
            );

        // Variables used by deployment platforms and by the original service
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("SCRAPECREATORS_API_KEY") {
            settings = settings.set_override("transcript.scrape_creators_api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - At least one language code is configured and none is blank
    /// - The outbound request timeout is not 0
    /// - The ScrapeCreators provider has an API key
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.transcript.languages.is_empty() {
            return Err(anyhow::anyhow!("At least one transcript language must be configured"));
        }

        if self.transcript.languages.iter().any(|code| code.trim().is_empty()) {
            return Err(anyhow::anyhow!("Transcript language codes cannot be blank"));
        }

        if self.transcript.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0"));
        }

        if self.transcript.provider == ProviderKind::ScrapeCreators && !self.has_api_key() {
            return Err(anyhow::anyhow!(
                "Provider {} requires SCRAPECREATORS_API_KEY",
                self.transcript.provider
            ));
        }

        Ok(())  // All validation passed
    }

    /// Whether a non-blank ScrapeCreators API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.transcript
            .scrape_creators_api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Tests for the configuration module.
#[cfg(test)]
mod tests {
    use super::*;  // Import everything from the parent module

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.transcript.provider, ProviderKind::Youtube);
        assert_eq!(config.transcript.languages, vec!["en".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;  // Invalid port
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_languages_must_not_be_empty_or_blank() {
        let mut config = AppConfig::default();
        config.transcript.languages.clear();
        assert!(config.validate().is_err());

        config.transcript.languages = vec!["en".to_string(), "  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.transcript.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    /// ScrapeCreators cannot work without credentials, so startup must refuse it.
    #[test]
    fn test_scrape_creators_requires_api_key() {
        let mut config = AppConfig::default();
        config.transcript.provider = ProviderKind::ScrapeCreators;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider scrape_creators requires SCRAPECREATORS_API_KEY"
        );

        config.transcript.scrape_creators_api_key = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.transcript.scrape_creators_api_key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::Youtube.to_string(), "youtube");
        assert_eq!(ProviderKind::ScrapeCreators.to_string(), "scrape_creators");
        let parsed: ProviderKind = serde_json::from_str("\"scrape_creators\"").unwrap();
        assert_eq!(parsed, ProviderKind::ScrapeCreators);
    }
}
