use std::f32::consts::TAU;
use std::io::Write;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// A short synthesized alert tone.
#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    pub sample_rate: u32,
    pub volume: f32,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            duration_ms: 150,
            sample_rate: 44_100,
            volume: 0.3,
        }
    }
}

impl Tone {
    pub fn sample_count(&self) -> usize {
        (self.sample_rate as usize * self.duration_ms as usize) / 1000
    }

    /// Mono f32 PCM: a sine under an exponential decay envelope.
    pub fn samples(&self) -> Vec<f32> {
        let n = self.sample_count();
        let rate = self.sample_rate as f32;
        // decays to ~1% of the initial amplitude by the last sample
        let decay = if n > 0 { (0.01f32).ln() / n as f32 } else { 0.0 };
        (0..n)
            .map(|i| {
                let t = i as f32 / rate;
                let envelope = (decay * i as f32).exp();
                (TAU * self.frequency_hz * t).sin() * envelope * self.volume
            })
            .collect()
    }
}

/// Output for alert tones. Playback is fire-and-forget.
pub trait TonePlayer: Send + Sync {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<(), SoundError>;
}

/// Whether the default audio host exposes an output device.
pub fn has_output_device() -> bool {
    cpal::default_host().default_output_device().is_some()
}

/// Linear resampling of mono PCM from `from_hz` to `to_hz`.
pub fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if samples.is_empty() || from_hz == 0 || to_hz == 0 || from_hz == to_hz {
        return samples.to_vec();
    }
    let ratio = from_hz as f64 / to_hz as f64;
    let len = ((samples.len() as f64) / ratio).round() as usize;
    (0..len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

/// Plays tones on the default output device. Blocks until the tone ends,
/// so call it off the async runtime.
#[derive(Debug, Default)]
pub struct SpeakerPlayer;

impl SpeakerPlayer {
    fn output_config(
        device: &cpal::Device,
        sample_rate: u32,
    ) -> Result<cpal::StreamConfig, SoundError> {
        let ranges: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| SoundError::Playback(e.to_string()))?
            .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
            .collect();

        let range = ranges
            .iter()
            .find(|c| c.min_sample_rate().0 <= sample_rate && c.max_sample_rate().0 >= sample_rate)
            .map(|c| c.with_sample_rate(cpal::SampleRate(sample_rate)))
            .or_else(|| ranges.first().map(|c| c.with_max_sample_rate()))
            .ok_or_else(|| SoundError::Playback("no f32 output format".into()))?;
        Ok(range.config())
    }
}

impl TonePlayer for SpeakerPlayer {
    fn play(&self, samples: &[f32], sample_rate: u32) -> Result<(), SoundError> {
        if samples.is_empty() || sample_rate == 0 {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or(SoundError::NoOutputDevice)?;
        let config = Self::output_config(&device, sample_rate)?;
        let channels = usize::from(config.channels.max(1));
        let out_rate = config.sample_rate.0;
        let pcm = resample(samples, sample_rate, out_rate);
        let duration = Duration::from_millis(pcm.len() as u64 * 1000 / u64::from(out_rate.max(1)));

        let mut pos = 0usize;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        frame.fill(pcm.get(pos).copied().unwrap_or(0.0));
                        pos += 1;
                    }
                },
                move |err| {
                    error!("Audio output error: {err}");
                },
                None,
            )
            .map_err(|e| SoundError::Playback(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SoundError::Playback(e.to_string()))?;
        debug!(rate = out_rate, channels, "Alert tone playing");
        // let the buffer drain before the stream is dropped
        std::thread::sleep(duration + Duration::from_millis(50));
        Ok(())
    }
}

/// Rings the terminal bell. Used when there is no output device.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl TonePlayer for TerminalBell {
    fn play(&self, _samples: &[f32], _sample_rate: u32) -> Result<(), SoundError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| SoundError::Playback(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_length_and_bounds() {
        let tone = Tone::default();
        let samples = tone.samples();
        assert_eq!(samples.len(), 44_100 * 150 / 1000);
        assert!(samples.iter().all(|s| s.abs() <= tone.volume + f32::EPSILON));
    }

    #[test]
    fn test_tone_decays() {
        let samples = Tone::default().samples();
        let head: f32 = samples[..200].iter().map(|s| s.abs()).fold(0.0, f32::max);
        let tail: f32 = samples[samples.len() - 200..]
            .iter()
            .map(|s| s.abs())
            .fold(0.0, f32::max);
        assert!(tail < head / 10.0);
    }

    #[test]
    fn test_resample_changes_length() {
        let samples = Tone::default().samples();
        let up = resample(&samples, 44_100, 48_000);
        assert_eq!(up.len(), (samples.len() as f64 * 48_000.0 / 44_100.0).round() as usize);
        assert_eq!(up[0], samples[0]);

        let same = resample(&samples, 44_100, 44_100);
        assert_eq!(same, samples);
        assert!(resample(&[], 44_100, 48_000).is_empty());
    }

    #[test]
    fn test_resample_interpolates() {
        let out = resample(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 1.0);
    }

    #[test]
    fn test_speaker_skips_empty_tone() {
        assert!(SpeakerPlayer.play(&[], 44_100).is_ok());
        assert!(SpeakerPlayer.play(&[0.1, 0.2], 0).is_ok());
    }

    #[test]
    fn test_zero_length_tone() {
        let tone = Tone {
            duration_ms: 0,
            ..Tone::default()
        };
        assert!(tone.samples().is_empty());
    }
}
