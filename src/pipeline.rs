//! # Answer Pipeline
//!
//! The single orchestrating operation of the backend: take uploaded answer
//! audio, transcode it, transcribe it, analyze its tone, ask the generative
//! service for feedback, synthesize the feedback as speech, advance the
//! session cursor, and assemble the JSON-ready result.
//!
//! ## Temp-file discipline:
//! Every intermediate gets a per-request UUID name under the configured work
//! directory, so concurrent requests never touch each other's files. The
//! upload and transcoded WAV are removed by a scoped guard when the pipeline
//! returns (success or error); only the synthesized MP3 stays, for retrieval
//! via `GET /api/audio/{filename}`.
//!
//! ## Degradation policy (applied uniformly):
//! Once an upload is accepted, transcription, generation, and synthesis
//! failures each substitute a marker or fallback value and the request still
//! answers 200. Transcode and local I/O failures abort, since without a usable
//! waveform there is nothing meaningful to degrade to.

use crate::audio::{self, tone::ToneMetrics};
use crate::error::{AppError, AppResult};
use crate::services::Transcription;
use crate::state::AppState;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// Sentinel transcript for audio the recognizer received but couldn't parse.
pub const AMBIGUOUS_TRANSCRIPT: &str = "[Could not understand audio]";

/// User-safe feedback substituted when the generative service fails.
pub const FALLBACK_FEEDBACK: &str =
    "Sorry, I encountered an error trying to generate a response.";

/// Everything one processed answer produces, serialized as the 200 response.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub session_id: String,
    pub transcript: String,
    pub feedback: String,
    /// The question that was asked (not the next one)
    pub question: String,
    pub tone: ToneMetrics,
    /// Filename of the synthesized feedback audio, empty when synthesis failed
    pub ai_audio: String,
}

/// Removes intermediate files when the pipeline scope ends, whichever way it
/// ends.
struct IntermediateFiles {
    paths: Vec<PathBuf>,
}

impl Drop for IntermediateFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "failed to clean up intermediate file");
                }
            }
        }
    }
}

/// Process one uploaded answer for the given session.
///
/// The handler has already established that audio bytes are present; an empty
/// upload at this level still fails with `Input` as a safety net.
pub async fn process(
    state: &AppState,
    audio_upload: Vec<u8>,
    session_token: String,
) -> AppResult<AnswerResult> {
    if audio_upload.is_empty() {
        return Err(AppError::Input("No audio file provided".to_string()));
    }

    let config = state.get_config();
    let request_id = Uuid::new_v4();
    let upload_path = config.audio.work_dir.join(format!("answer_{}.webm", request_id));
    let wav_path = config.audio.work_dir.join(format!("answer_{}.wav", request_id));
    let mp3_name = format!("feedback_{}.mp3", request_id);

    let _cleanup = IntermediateFiles {
        paths: vec![upload_path.clone(), wav_path.clone()],
    };

    // Stage 1: persist the upload under a unique name.
    tokio::fs::write(&upload_path, &audio_upload).await?;

    // Stage 2: transcode to the waveform the downstream stages consume.
    audio::transcode_to_wav(&upload_path, &wav_path, config.audio.sample_rate).await?;

    // Stage 3: transcribe. Ambiguous audio and service failures both degrade
    // to marker transcripts so the interview loop stays alive.
    let wav_bytes = tokio::fs::read(&wav_path).await?;
    let transcript = match state.services.speech.transcribe_wav(&wav_bytes).await {
        Ok(Transcription::Recognized(text)) => text,
        Ok(Transcription::Ambiguous) => AMBIGUOUS_TRANSCRIPT.to_string(),
        Err(err) => {
            warn!(error = %err, "speech recognition failed, continuing with error marker");
            format!("[API Error: {}]", err)
        }
    };

    // Stage 4: tone metrics from the same waveform. A waveform the decoder
    // can't read is a pipeline-level error, not a degradable one.
    let (tone, duration_secs) = {
        let wav_path = wav_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(ToneMetrics, f32), anyhow::Error> {
            let waveform = audio::load_wav_mono(&wav_path)?;
            let tone = audio::analyze(&waveform.samples, waveform.sample_rate);
            Ok((tone, waveform.duration_secs()))
        })
        .await
        .map_err(|err| AppError::Internal(format!("tone analysis task failed: {}", err)))??
    };

    // Stage 5: read the current question without advancing yet.
    let question = state.sessions.current_question(&session_token);

    // Stage 6: one prompt carrying question, transcript, and tone metrics.
    let prompt = build_prompt(&question, &transcript, &tone);

    // Stage 7: generative feedback, apology fallback on any failure.
    let feedback = match state.services.feedback.generate(&prompt).await {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "feedback generation failed, substituting fallback");
            FALLBACK_FEEDBACK.to_string()
        }
    };

    // Stage 8: synthesize the feedback; an empty reference signals the client
    // to skip playback.
    let ai_audio = match state.services.tts.synthesize(&feedback).await {
        Ok(mp3_bytes) => {
            tokio::fs::write(config.audio.work_dir.join(&mp3_name), &mp3_bytes).await?;
            mp3_name
        }
        Err(err) => {
            warn!(error = %err, "speech synthesis failed, returning empty audio reference");
            String::new()
        }
    };

    // Stage 9: the answer is processed; move this session to the next question.
    state.sessions.advance(&session_token);
    state.record_answer_processed();

    info!(
        session = %session_token,
        audio_secs = duration_secs,
        transcript_chars = transcript.len(),
        confidence = tone.confidence_score,
        "answer processed"
    );

    // Stage 10: the structured result, quoting the question that was asked.
    Ok(AnswerResult {
        session_id: session_token,
        transcript,
        feedback,
        question,
        tone,
        ai_audio,
    })
}

/// Compose the single textual prompt sent to the generative service.
fn build_prompt(question: &str, transcript: &str, tone: &ToneMetrics) -> String {
    let tone_json = serde_json::to_string(tone).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Interview question: {}\nUser answer: {}\nTone analysis: {}\n\n\
         Provide:\n- Short feedback on answer\n- Next question (if any)",
        question, transcript, tone_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_all_three_inputs() {
        let tone = ToneMetrics {
            avg_pitch: 141.2,
            pitch_var: 18.4,
            volume: 0.0421,
            tempo: 112.5,
            confidence_score: 55.3,
        };
        let prompt = build_prompt("Tell me about yourself.", "I am a backend engineer.", &tone);

        assert!(prompt.starts_with("Interview question: Tell me about yourself."));
        assert!(prompt.contains("User answer: I am a backend engineer."));
        assert!(prompt.contains("\"avg_pitch\":141.2"));
        assert!(prompt.contains("- Next question (if any)"));
    }

    #[test]
    fn test_intermediate_files_removed_on_drop() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("interview_coach_cleanup_{}.tmp", Uuid::new_v4()));
        std::fs::write(&path, b"scratch").unwrap();
        assert!(path.exists());

        drop(IntermediateFiles {
            paths: vec![path.clone()],
        });
        assert!(!path.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_files() {
        // Dropping a guard over files that never got created must not warn-loop
        // or panic (the transcode stage can fail before the wav exists).
        drop(IntermediateFiles {
            paths: vec![PathBuf::from("/nonexistent/interview_coach.tmp")],
        });
    }
}
