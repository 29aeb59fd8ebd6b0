//! # Application State Management
//!
//! Shared state that every HTTP request handler can reach: configuration, the
//! per-session interview registry, the external service clients, and request
//! metrics.
//!
//! ## Thread Safety Pattern:
//! Mutable pieces use `Arc<RwLock<T>>`: many concurrent readers or one
//! writer, never both. The session registry carries its own lock internally
//! (see `interview.rs`); the service clients are immutable after startup and
//! share one `Arc`.

use crate::config::AppConfig;
use crate::interview::SessionRegistry;
use crate::services::ServiceClients;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all HTTP request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration (readable at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Request/answer metrics (updated by middleware and the answer handler)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Per-session interview cursors over the fixed question list
    pub sessions: SessionRegistry,

    /// Speech, feedback, and synthesis clients
    pub services: Arc<ServiceClients>,

    /// When the server started (Instant is Copy, no lock needed)
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total HTTP requests processed since server start
    pub request_count: u64,

    /// Total error responses since server start
    pub error_count: u64,

    /// Answers that made it through the full pipeline
    pub answers_processed: u64,

    /// Per-endpoint statistics, keyed by normalized path template
    /// (e.g. "GET /api/audio/{filename}")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Performance counters for a single endpoint template.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Build the shared state from validated configuration: the session
    /// registry over the configured questions, and one client set for the
    /// external services. Fails at startup if the HTTP client cannot be
    /// built with the configured timeout.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let sessions = SessionRegistry::new(config.interview.questions.clone());
        let services = Arc::new(ServiceClients::new(&config.services)?);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            sessions,
            services,
            start_time: Instant::now(),
        })
    }

    /// A copy of the current configuration; cloning releases the lock
    /// immediately so other threads aren't blocked.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Called once per answer that completed the pipeline (cursor advanced).
    pub fn record_answer_processed(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.answers_processed += 1;
    }

    /// Record one request against an endpoint template.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// A consistent copy of the metrics for the /health and /api/metrics
    /// endpoints, cloned so the lock isn't held during serialization.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            answers_processed: metrics.answers_processed,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
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

    fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.services.api_key = "test-key".to_string();
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_metrics_counters() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();
        state.record_answer_processed();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.answers_processed, 1);
    }

    #[test]
    fn test_endpoint_metrics_aggregate_by_template() {
        let state = test_state();
        state.record_endpoint_request("GET /api/audio/{filename}", 12, false);
        state.record_endpoint_request("GET /api/audio/{filename}", 8, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["GET /api/audio/{filename}"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.error_count, 1);
        assert_eq!(metric.average_duration_ms(), 10.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[test]
    fn test_registry_reflects_configured_questions() {
        let state = test_state();
        assert_eq!(state.sessions.question_count(), 3);
        assert_eq!(state.sessions.first_question(), "Tell me about yourself.");
    }
}
