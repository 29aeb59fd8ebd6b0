//! Audio handling: waveform decoding, tone analysis, and format transcoding.

pub mod tone;
pub mod transcode;
pub mod waveform;

pub use tone::{analyze, ToneMetrics};
pub use transcode::transcode_to_wav;
pub use waveform::load_wav_mono;
