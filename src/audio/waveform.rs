//! # Waveform Loading
//!
//! Decodes the transcoded WAV file into mono f32 samples in [-1.0, 1.0], the
//! representation the tone analyzer works on. The transcoder already downmixes
//! to mono at the configured rate, but the decoder tolerates multi-channel
//! input by averaging channels so a hand-supplied WAV still analyzes sensibly.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::path::Path;

/// A decoded waveform plus the rate it was sampled at.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Read a WAV file into mono float samples.
///
/// ## Sample conversion:
/// Integer PCM scales into [-1.0, 1.0] (16-bit divides by 32768, matching the
/// usual ML-audio convention); float PCM passes through. Multi-channel frames
/// average down to one channel.
pub fn load_wav_mono(path: &Path) -> Result<Waveform> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open waveform file {}", path.display()))?;

    let (header, data) = wav::read(&mut file)
        .with_context(|| format!("failed to parse WAV data in {}", path.display()))?;

    let channels = header.channel_count as usize;
    if channels == 0 {
        return Err(anyhow!("WAV header declares zero channels"));
    }

    let interleaved: Vec<f32> = match data {
        wav::BitDepth::Eight(samples) => samples
            .into_iter()
            .map(|s| (s as f32 - 128.0) / 128.0)
            .collect(),
        wav::BitDepth::Sixteen(samples) => {
            samples.into_iter().map(|s| s as f32 / 32768.0).collect()
        }
        wav::BitDepth::TwentyFour(samples) => samples
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        wav::BitDepth::ThirtyTwoFloat(samples) => samples,
        wav::BitDepth::Empty => Vec::new(),
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        downmix(&interleaved, channels)
    };

    Ok(Waveform {
        samples,
        sample_rate: header.sampling_rate,
    })
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Build a minimal 16-bit PCM WAV in memory and write it to a temp file.
    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let header = wav::Header::new(wav::WAV_FORMAT_PCM, channels, sample_rate, 16);
        let mut cursor = std::io::Cursor::new(Vec::new());
        wav::write(header, &wav::BitDepth::Sixteen(samples.to_vec()), &mut cursor).unwrap();
        let mut file = File::create(path).unwrap();
        file.write_all(cursor.get_ref()).unwrap();
    }

    #[test]
    fn test_load_mono_wav() {
        let path = std::env::temp_dir().join("interview_coach_test_mono.wav");
        write_test_wav(&path, 22050, 1, &[0, 16384, -16384, 32767]);

        let waveform = load_wav_mono(&path).unwrap();
        assert_eq!(waveform.sample_rate, 22050);
        assert_eq!(waveform.samples.len(), 4);
        assert!((waveform.samples[1] - 0.5).abs() < 1e-3);
        assert!((waveform.samples[2] + 0.5).abs() < 1e-3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_stereo_downmix_averages_channels() {
        let path = std::env::temp_dir().join("interview_coach_test_stereo.wav");
        // L=16384, R=0 in every frame; the mono mix should sit halfway.
        write_test_wav(&path, 22050, 2, &[16384, 0, 16384, 0]);

        let waveform = load_wav_mono(&path).unwrap();
        assert_eq!(waveform.samples.len(), 2);
        for sample in &waveform.samples {
            assert!((sample - 0.25).abs() < 1e-3);
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_errors() {
        let path = Path::new("/definitely/not/here.wav");
        assert!(load_wav_mono(path).is_err());
    }
}
