//! # Text-to-Speech Client
//!
//! Synthesizes the feedback text as MP3 audio using the Google Translate TTS
//! endpoint. The endpoint caps each request at 200 characters of text, so
//! longer feedback is split on whitespace into chunks and the returned MP3
//! segments are concatenated; MPEG frames are self-delimiting, so players
//! accept the concatenation.

use crate::error::AppError;
use tracing::debug;

/// Per-request character limit imposed by the synthesis endpoint.
const MAX_CHUNK_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct TtsClient {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl TtsClient {
    pub fn new(client: reqwest::Client, endpoint: String, language: String) -> Self {
        // The endpoint speaks primary language subtags ("en"), not full
        // BCP-47 tags ("en-US").
        let language = language
            .split('-')
            .next()
            .unwrap_or("en")
            .to_ascii_lowercase();
        Self {
            client,
            endpoint,
            language,
        }
    }

    /// Synthesize speech for `text`, returning complete MP3 bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AppError::ExternalService(
                "nothing to synthesize: feedback text is empty".to_string(),
            ));
        }

        let total_chunks = chunks.len();
        let total = total_chunks.to_string();
        let mut mp3 = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx_str = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", self.language.as_str()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx_str.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(AppError::ExternalService(format!(
                    "TTS endpoint returned {} for chunk {}/{}",
                    response.status(),
                    idx + 1,
                    total_chunks
                )));
            }

            mp3.extend_from_slice(&response.bytes().await?);
        }

        debug!(chunks = total_chunks, bytes = mp3.len(), "speech synthesized");
        Ok(mp3)
    }
}

/// Split text into whitespace-respecting chunks of at most `max_chars`
/// characters. A single word longer than the limit is hard-split so no chunk
/// ever exceeds it.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let word_chars: Vec<char> = word.chars().collect();
            for piece in word_chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let separator = usize::from(!current.is_empty());
        if current_len + separator + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Good answer, keep it concise.", MAX_CHUNK_CHARS);
        assert_eq!(chunks, vec!["Good answer, keep it concise.".to_string()]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", MAX_CHUNK_CHARS).is_empty());
        assert!(chunk_text("   \n ", MAX_CHUNK_CHARS).is_empty());
    }

    #[test]
    fn test_long_text_splits_on_whitespace() {
        let text = "word ".repeat(100);
        let chunks = chunk_text(&text, 20);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {:?}", chunk);
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
    }

    #[test]
    fn test_oversized_word_is_hard_split() {
        let word = "a".repeat(45);
        let chunks = chunk_text(&word, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 20);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn test_language_normalized_to_primary_subtag() {
        let client = TtsClient::new(
            reqwest::Client::new(),
            "https://example.invalid/tts".to_string(),
            "en-US".to_string(),
        );
        assert_eq!(client.language, "en");
    }
}
