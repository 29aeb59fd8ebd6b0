//! # Generative Feedback Client
//!
//! Submits the composed interview prompt to the Gemini `generateContent` REST
//! endpoint and extracts the text of the first candidate. Failures propagate
//! as `ExternalService` errors; the pipeline decides how to degrade (it
//! substitutes a user-safe apology rather than failing the request).

use crate::error::AppError;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FeedbackClient {
    client: reqwest::Client,
    endpoint_base: String,
    model: String,
    api_key: String,
}

impl FeedbackClient {
    pub fn new(
        client: reqwest::Client,
        endpoint_base: String,
        model: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            endpoint_base,
            model,
            api_key,
        }
    }

    /// Which model answers are generated with (surfaced by /health).
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate feedback text for a prompt. Single attempt, no retries.
    pub async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/{}:generateContent",
            self.endpoint_base.trim_end_matches('/'),
            self.model
        );

        let payload = json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "generative API returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        match extract_text(&body) {
            Some(text) => {
                debug!(model = %self.model, chars = text.len(), "feedback generated");
                Ok(text)
            }
            None => Err(AppError::ExternalService(
                "generative API returned no candidates".to_string(),
            )),
        }
    }
}

/// Text of the first candidate: `candidates[0].content.parts[*].text` joined.
fn extract_text(body: &serde_json::Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let pieces: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .collect();

    let text = pieces.concat().trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_from_candidate() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "Good structure. Next question: ..."}],
                    "role": "model"
                }
            }]
        });
        assert_eq!(
            extract_text(&body),
            Some("Good structure. Next question: ...".to_string())
        );
    }

    #[test]
    fn test_extract_text_joins_parts_and_trims() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "  Solid answer."}, {"text": " Keep going.\n"}]}
            }]
        });
        assert_eq!(
            extract_text(&body),
            Some("Solid answer. Keep going.".to_string())
        );
    }

    #[test]
    fn test_extract_text_missing_candidates() {
        assert_eq!(extract_text(&serde_json::json!({})), None);
        assert_eq!(extract_text(&serde_json::json!({"candidates": []})), None);
    }
}
