//! # Speech-to-Text Client
//!
//! Sends the transcoded WAV to the Google Speech recognition REST API and
//! returns the best transcript. Two distinct non-success outcomes matter to
//! the pipeline:
//!
//! - **Ambiguous**: the service answered but produced no confident transcript
//!   (silence, mumbling, background noise). The pipeline substitutes the
//!   sentinel marker string and continues.
//! - **Error**: the service was unreachable or rejected the request. The
//!   pipeline substitutes an error-marker transcript carrying the detail and
//!   continues (graceful-degradation policy).

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;
use tracing::debug;

/// Result of a recognition attempt that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Transcription {
    /// The service produced a transcript.
    Recognized(String),
    /// Audio was received but nothing intelligible came back.
    Ambiguous,
}

#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
}

impl SpeechClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        language: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            language,
        }
    }

    /// Recognize speech in a complete WAV file.
    ///
    /// The WAV bytes go up base64-encoded; the service reads the sample rate
    /// and encoding from the RIFF header, so neither is declared explicitly.
    pub async fn transcribe_wav(&self, wav_bytes: &[u8]) -> Result<Transcription, AppError> {
        let payload = json!({
            "config": {
                "languageCode": self.language,
                "enableAutomaticPunctuation": true,
            },
            "audio": {
                "content": BASE64.encode(wav_bytes),
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "speech API returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let transcript = extract_transcript(&body);

        match transcript {
            Some(text) if !text.is_empty() => {
                debug!(chars = text.len(), "speech recognized");
                Ok(Transcription::Recognized(text))
            }
            _ => Ok(Transcription::Ambiguous),
        }
    }
}

/// Pull the transcript out of a recognition response, concatenating the top
/// alternative of each result segment.
fn extract_transcript(body: &serde_json::Value) -> Option<String> {
    let results = body.get("results")?.as_array()?;
    let pieces: Vec<&str> = results
        .iter()
        .filter_map(|result| {
            result
                .get("alternatives")?
                .as_array()?
                .first()?
                .get("transcript")?
                .as_str()
        })
        .collect();

    if pieces.is_empty() {
        return None;
    }
    Some(pieces.join(" ").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_transcript_single_result() {
        let body = serde_json::json!({
            "results": [
                {"alternatives": [{"transcript": "tell me about yourself", "confidence": 0.92}]}
            ]
        });
        assert_eq!(
            extract_transcript(&body),
            Some("tell me about yourself".to_string())
        );
    }

    #[test]
    fn test_extract_transcript_joins_segments() {
        let body = serde_json::json!({
            "results": [
                {"alternatives": [{"transcript": "I worked on"}]},
                {"alternatives": [{"transcript": "a large migration"}]}
            ]
        });
        assert_eq!(
            extract_transcript(&body),
            Some("I worked on a large migration".to_string())
        );
    }

    #[test]
    fn test_extract_transcript_empty_results() {
        // The API answers `{}` for unintelligible audio.
        assert_eq!(extract_transcript(&serde_json::json!({})), None);
        assert_eq!(
            extract_transcript(&serde_json::json!({"results": []})),
            None
        );
    }
}
