//! WAV decoding to the 16 kHz mono f32 buffer Whisper consumes.

use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, VoxarchError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Decoded recording, resampled to [`SAMPLE_RATE`] mono.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }
}

/// Decode a WAV file. A missing file is `SourceNotFound`; anything hound
/// cannot read is `AudioDecode`.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    if !path.is_file() {
        return Err(VoxarchError::SourceNotFound {
            path: path.display().to_string(),
        });
    }
    let file = File::open(path)?;
    decode_reader(BufReader::new(file))
}

/// Decode WAV data from any reader. Integer and float formats, any channel
/// count and any sample rate are accepted.
pub fn decode_reader<R: Read>(reader: R) -> Result<DecodedAudio> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoxarchError::AudioDecode {
        message: format!("not a readable WAV file: {e}"),
    })?;

    let spec = wav_reader.spec();
    let read_failed = |e: hound::Error| VoxarchError::AudioDecode {
        message: format!("failed to read WAV samples: {e}"),
    };

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav_reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(read_failed)?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(read_failed)?
        }
    };

    let mono = downmix(&interleaved, spec.channels);
    let samples = resample(&mono, spec.sample_rate, SAMPLE_RATE);
    Ok(DecodedAudio { samples })
}

/// Average interleaved frames down to one channel.
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = (source_pos - source_idx as f64) as f32;

            match samples.get(source_idx + 1) {
                Some(&right) => {
                    let left = samples[source_idx];
                    left + (right - left) * fraction
                }
                None => samples[source_idx],
            }
        })
        .collect()
}
