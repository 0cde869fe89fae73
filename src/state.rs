//! # Application State Management
//!
//! Shared state handed to every HTTP request handler through `web::Data<AppState>`.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows every actix worker to share ownership of the same data
//! - **Thread safety**: Safe to share between threads
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time
//! - **Used for**: Request metrics, the only data that changes while the server runs
//!
//! ### Trait objects
//! - **Arc<dyn TranscriptProvider>**: Handlers do not know (or care) which provider is
//!   configured; tests put a fake one here
//!
//! Configuration is read-only after startup, so it sits behind a plain `Arc`.

use crate::config::AppConfig;
use crate::transcript::TranscriptProvider;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration loaded at startup
    pub config: Arc<AppConfig>,

    /// Source of transcripts for `/api/youtube-transcript`
    pub provider: Arc<dyn TranscriptProvider>,

    /// Request counters updated by the metrics middleware
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Request metrics collected across all HTTP requests.
///
/// - **request_count**: Total requests processed
/// - **error_count**: Requests answered with a 4xx or 5xx status
/// - **endpoint_metrics**: Per-endpoint statistics, keyed by "METHOD /path"
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed metrics for a specific API endpoint.
///
/// ## Performance calculations:
/// - **Average response time**: total_duration_ms / request_count
/// - **Error rate**: error_count / request_count
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn TranscriptProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Ordered language preference used for track selection.
    pub fn languages(&self) -> &[String] {
        &self.config.transcript.languages
    }

    pub fn increment_request_count(&self) {
        // Counters stay usable even if a panicking writer poisoned the lock
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Copy of the current metrics, so the lock is not held while building a response.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0  // No requests yet, so no average to calculate
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::testing::FakeProvider;

    fn state() -> AppState {
        AppState::new(AppConfig::default(), Arc::new(FakeProvider::english(&["hi"])))
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = state();
        state.record_endpoint_request("GET /api/youtube-transcript", 10, false);
        state.record_endpoint_request("GET /api/youtube-transcript", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["GET /api/youtube-transcript"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.error_count, 1);
        assert_eq!(metric.average_duration_ms(), 20.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[test]
    fn test_global_counters() {
        let state = state();
        assert_eq!(state.get_metrics_snapshot().error_rate(), 0.0);

        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.error_rate(), 0.5);
    }

    #[test]
    fn test_languages_come_from_config() {
        assert_eq!(state().languages(), &["en".to_string()]);
    }
}
