//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The Google API key is deliberately *not* part of the TOML surface: it is read
//! from the `GOOGLE_API_KEY` environment variable only, and its absence is a
//! startup-fatal condition (`validate()` fails with a clear diagnostic rather
//! than letting the first answer request fail mysteriously).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub services: ServicesConfig,
    pub audio: AudioConfig,
    pub interview: InterviewConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// External service configuration: speech-to-text, generative feedback, and
/// text-to-speech endpoints, all Google-hosted and sharing one API key.
///
/// ## Fields:
/// - `api_key`: Credential for the speech and generative-language APIs
///   (populated from `GOOGLE_API_KEY`, never from config.toml)
/// - `gemini_model`: Which Gemini model generates interview feedback
/// - `language`: BCP-47 language code used for recognition and synthesis
/// - `request_timeout_secs`: Per-call HTTP timeout; there are no retries, so
///   this bounds how long a request can hang on one external collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub api_key: String,
    pub gemini_model: String,
    pub language: String,
    pub speech_endpoint: String,
    pub generate_endpoint: String,
    pub tts_endpoint: String,
    pub request_timeout_secs: u64,
}

/// Audio handling configuration.
///
/// ## Fields:
/// - `sample_rate`: Rate the transcoder resamples to; tone analysis assumes it
/// - `work_dir`: Directory for per-request upload/waveform/synthesis files
///   (defaults to a subdirectory of the system temp dir)
/// - `max_upload_bytes`: Upload size cap enforced while draining the multipart stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub work_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// The fixed interview question list, asked round-robin per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    pub questions: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            services: ServicesConfig {
                api_key: String::new(),
                gemini_model: "gemini-2.0-flash".to_string(),
                language: "en-US".to_string(),
                speech_endpoint: "https://speech.googleapis.com/v1/speech:recognize".to_string(),
                generate_endpoint: "https://generativelanguage.googleapis.com/v1beta/models"
                    .to_string(),
                tts_endpoint: "https://translate.google.com/translate_tts".to_string(),
                request_timeout_secs: 30,
            },
            audio: AudioConfig {
                sample_rate: 22050,
                work_dir: env::temp_dir().join("interview-coach"),
                max_upload_bytes: 25 * 1024 * 1024,  // 25MB is plenty for a spoken answer
            },
            interview: InterviewConfig {
                questions: vec![
                    "Tell me about yourself.".to_string(),
                    "Why should we hire you?".to_string(),
                    "Describe a challenge you faced and how you overcame it.".to_string(),
                ],
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases: HOST/PORT (deployment platforms) and GOOGLE_API_KEY
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            settings = settings.set_override("services.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - The API key is present (startup-fatal when missing, so a misconfigured
    ///   deployment fails at boot instead of on the first answer)
    /// - Sample rate and upload cap are non-zero
    /// - At least one interview question exists (the cursor arithmetic divides
    ///   by the question count)
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.services.api_key.is_empty() {
            return Err(anyhow::anyhow!(
                "GOOGLE_API_KEY environment variable is not set; it is required for \
                 speech recognition and feedback generation"
            ));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate cannot be 0"));
        }

        if self.audio.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.interview.questions.is_empty() {
            return Err(anyhow::anyhow!("Interview question list cannot be empty"));
        }

        if self.services.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Service request timeout must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> AppConfig {
        let mut config = AppConfig::default();
        config.services.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.audio.sample_rate, 22050);
        assert_eq!(config.interview.questions.len(), 3);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_config_validation() {
        assert!(config_with_key().validate().is_ok());

        let mut config = config_with_key();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = config_with_key();
        config.interview.questions.clear();
        assert!(config.validate().is_err());
    }
}
