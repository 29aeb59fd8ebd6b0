//! # Audio Transcoding
//!
//! Converts the browser's uploaded container (typically webm/opus) into the
//! mono PCM WAV the transcription and tone stages consume, by invoking the
//! external `ffmpeg` binary as a subprocess.
//!
//! ffmpeg's stderr is captured and carried into the error message when the
//! conversion fails, instead of being discarded; a silent transcode failure
//! previously let an unusable waveform flow into analysis.

use crate::error::AppError;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// How much of ffmpeg's stderr to keep in an error message. The interesting
/// part (unrecognized codec, truncated input) is always at the end.
const STDERR_TAIL_BYTES: usize = 600;

/// Transcode `input` into a mono 16-bit PCM WAV at `sample_rate`, written to
/// `output`. Returns a typed `Transcode` error carrying the exit status and
/// stderr tail on failure.
pub async fn transcode_to_wav(
    input: &Path,
    output: &Path,
    sample_rate: u32,
) -> Result<(), AppError> {
    let result = Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-ar",
            &sample_rate.to_string(),
            "-ac",
            "1",
            "-f",
            "wav",
            &output.to_string_lossy(),
        ])
        .output()
        .await;

    let output_info = match result {
        Ok(info) => info,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::Transcode(
                "ffmpeg binary not found on PATH; install ffmpeg to enable audio conversion"
                    .to_string(),
            ));
        }
        Err(err) => {
            return Err(AppError::Transcode(format!(
                "failed to spawn ffmpeg: {}",
                err
            )));
        }
    };

    if !output_info.status.success() {
        let stderr = String::from_utf8_lossy(&output_info.stderr);
        return Err(AppError::Transcode(format!(
            "ffmpeg exited with {}: {}",
            output_info.status,
            stderr_tail(&stderr)
        )));
    }

    debug!(
        input = %input.display(),
        output = %output.display(),
        sample_rate,
        "transcoded upload to wav"
    );
    Ok(())
}

fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed;
    }
    // Cut on a char boundary near the tail.
    let mut start = trimmed.len() - STDERR_TAIL_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_short_passthrough() {
        assert_eq!(stderr_tail("  codec not found \n"), "codec not found");
    }

    #[test]
    fn test_stderr_tail_truncates_long_output() {
        let long = "x".repeat(5000);
        assert_eq!(stderr_tail(&long).len(), STDERR_TAIL_BYTES);
    }

    #[tokio::test]
    async fn test_missing_input_is_typed_error() {
        let input = Path::new("/nonexistent/answer.webm");
        let output = std::env::temp_dir().join("interview_coach_test_transcode.wav");
        let result = transcode_to_wav(input, &output, 22050).await;
        // Either ffmpeg is absent or it rejects the missing input; both must
        // surface as a Transcode error, never silently succeed.
        match result {
            Err(AppError::Transcode(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected transcode error, got {:?}", other.map(|_| ())),
        }
    }
}
