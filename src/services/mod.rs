//! External service clients: speech-to-text, generative feedback, and
//! text-to-speech. Nothing in here is reimplemented locally: each client is a
//! thin, single-attempt HTTP wrapper with no retry policy.

pub mod generate;
pub mod synthesize;
pub mod transcribe;

pub use generate::FeedbackClient;
pub use synthesize::TtsClient;
pub use transcribe::{SpeechClient, Transcription};

use crate::config::ServicesConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// The three collaborators the answer pipeline talks to, sharing one
/// connection pool and timeout policy.
#[derive(Debug, Clone)]
pub struct ServiceClients {
    pub speech: SpeechClient,
    pub feedback: FeedbackClient,
    pub tts: TtsClient,
}

impl ServiceClients {
    /// Build the shared HTTP client and the three service wrappers.
    ///
    /// A builder failure is a startup-fatal error: falling back to a default
    /// client would silently discard the configured request timeout and leave
    /// external calls unbounded.
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build the shared HTTP client")?;

        Ok(Self {
            speech: SpeechClient::new(
                http.clone(),
                config.speech_endpoint.clone(),
                config.api_key.clone(),
                config.language.clone(),
            ),
            feedback: FeedbackClient::new(
                http.clone(),
                config.generate_endpoint.clone(),
                config.gemini_model.clone(),
                config.api_key.clone(),
            ),
            tts: TtsClient::new(http, config.tts_endpoint.clone(), config.language.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_clients_build_with_configured_timeout() {
        // Construction must succeed with the stock configuration and hand the
        // same pool to all three clients; any builder failure propagates
        // instead of degrading to a client without the timeout.
        let services = AppConfig::default().services;
        let clients = ServiceClients::new(&services).unwrap();
        assert_eq!(clients.feedback.model(), "gemini-2.0-flash");
    }
}
