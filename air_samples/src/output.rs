//! Where played samples go.
//!
//! [`CpalOutput`] mixes any number of overlapping one-shot voices into the
//! default output device.  Each voice is resampled from its buffer's rate to
//! the device rate by linear interpolation.  [`NullOutput`] swallows
//! everything and is used when no device can be opened.

use std::fmt;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::buffer::SampleBuffer;

// ════════════════════════════════════════════════════════════════════════════
// AudioOutput
// ════════════════════════════════════════════════════════════════════════════

/// Fire-and-forget playback sink.  Not `Send`: a cpal stream stays on the
/// thread that opened it.
pub trait AudioOutput {
    /// Start playing `buffer` from its first frame.  Must not block.
    fn start(&mut self, buffer: Arc<SampleBuffer>);
}

/// Discards playback.
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn start(&mut self, buffer: Arc<SampleBuffer>) {
        debug!(frames = buffer.frames(), "null output: sample dropped");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// OutputError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum OutputError {
    NoDevice,
    Config(String),
    Build(String),
    Play(String),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::NoDevice  => write!(f, "no audio output device"),
            OutputError::Config(m) => write!(f, "output config: {}", m),
            OutputError::Build(m)  => write!(f, "could not build output stream: {}", m),
            OutputError::Play(m)   => write!(f, "could not start output stream: {}", m),
        }
    }
}

impl std::error::Error for OutputError {}

// ════════════════════════════════════════════════════════════════════════════
// Voices and the mixer
// ════════════════════════════════════════════════════════════════════════════

struct Voice {
    buffer:   Arc<SampleBuffer>,
    /// Fractional read position, in source frames.
    position: f64,
    /// Source frames consumed per output frame.
    step:     f64,
}

impl Voice {
    fn new(buffer: Arc<SampleBuffer>, device_rate: u32) -> Self {
        let step = buffer.sample_rate() as f64 / device_rate.max(1) as f64;
        Voice { buffer, position: 0.0, step }
    }

    fn finished(&self) -> bool {
        self.position >= self.buffer.frames() as f64
    }

    fn sample(&self, channel: usize) -> f32 {
        let i    = self.position.floor() as usize;
        let frac = (self.position - i as f64) as f32;
        let a    = self.buffer.sample(i, channel);
        let b    = if i + 1 < self.buffer.frames() { self.buffer.sample(i + 1, channel) } else { a };
        a + (b - a) * frac
    }
}

struct Mixer {
    voices:      Vec<Voice>,
    max_voices:  usize,
    device_rate: u32,
}

impl Mixer {
    fn new(device_rate: u32, max_voices: usize) -> Self {
        Mixer { voices: Vec::new(), max_voices: max_voices.max(1), device_rate }
    }

    fn start(&mut self, buffer: Arc<SampleBuffer>) {
        if self.voices.len() >= self.max_voices {
            // Oldest voice goes first.
            self.voices.remove(0);
        }
        self.voices.push(Voice::new(buffer, self.device_rate));
    }

    /// Sum every active voice into `out` (interleaved, `channels` wide),
    /// dropping voices that run out.
    fn mix_into(&mut self, out: &mut [f32], channels: usize) {
        out.iter_mut().for_each(|s| *s = 0.0);
        let channels = channels.max(1);

        for frame in out.chunks_mut(channels) {
            for voice in self.voices.iter_mut() {
                if voice.finished() { continue; }
                for (ch, s) in frame.iter_mut().enumerate() {
                    *s += voice.sample(ch);
                }
                voice.position += voice.step;
            }
        }
        self.voices.retain(|v| !v.finished());

        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CpalOutput
// ════════════════════════════════════════════════════════════════════════════

/// The default output device.  Dropping this stops the stream.
pub struct CpalOutput {
    mixer:   Arc<Mutex<Mixer>>,
    _stream: cpal::Stream,
}

impl CpalOutput {
    /// Open the host's default output device, mixing at most `max_voices`
    /// overlapping samples.
    pub fn open_default(max_voices: usize) -> Result<Self, OutputError> {
        let host   = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        let config = device.default_output_config()
            .map_err(|e| OutputError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels    = config.channels() as usize;
        info!(
            host = ?host.id(),
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate, channels, "audio output opened"
        );

        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate, max_voices)));
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), mixer.clone(), channels),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), mixer.clone(), channels),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), mixer.clone(), channels),
            other => return Err(OutputError::Config(format!("unsupported sample format {:?}", other))),
        }?;
        stream.play().map_err(|e| OutputError::Play(e.to_string()))?;

        Ok(CpalOutput { mixer, _stream: stream })
    }
}

fn build_stream<T>(
    device:   &cpal::Device,
    config:   &cpal::StreamConfig,
    mixer:    Arc<Mutex<Mixer>>,
    channels: usize,
) -> Result<cpal::Stream, OutputError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            match mixer.try_lock() {
                Some(mut m) => m.mix_into(&mut scratch, channels),
                // Contended by a start(): emit silence for this period.
                None => scratch.iter_mut().for_each(|s| *s = 0.0),
            }
            for (out, s) in data.iter_mut().zip(&scratch) {
                *out = T::from_sample(*s);
            }
        },
        |err| error!("audio stream error: {}", err),
        None,
    )
    .map_err(|e| OutputError::Build(e.to_string()))
}

impl AudioOutput for CpalOutput {
    fn start(&mut self, buffer: Arc<SampleBuffer>) {
        self.mixer.lock().start(buffer);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(samples: Vec<f32>, channels: u16, rate: u32) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::from_interleaved(samples, channels, rate))
    }

    #[test]
    fn same_rate_voice_copies_through() {
        let mut m = Mixer::new(48_000, 8);
        m.start(buf(vec![0.1, 0.2, 0.3], 1, 48_000));
        let mut out = vec![9.0; 4];
        m.mix_into(&mut out, 1);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.0]);
        assert!(m.voices.is_empty());
    }

    #[test]
    fn mono_voice_fills_both_channels() {
        let mut m = Mixer::new(48_000, 8);
        m.start(buf(vec![0.5, 0.25], 1, 48_000));
        let mut out = vec![0.0; 4];
        m.mix_into(&mut out, 2);
        assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn overlapping_voices_sum_and_clip() {
        let mut m = Mixer::new(48_000, 8);
        m.start(buf(vec![0.25; 4], 1, 48_000));
        m.start(buf(vec![0.25; 4], 1, 48_000));
        m.start(buf(vec![0.75; 2], 1, 48_000));
        let mut out = vec![0.0; 4];
        m.mix_into(&mut out, 1);
        assert_eq!(out, vec![1.0, 1.0, 0.5, 0.5]);
    }

    #[test]
    fn half_rate_buffer_is_interpolated() {
        let mut m = Mixer::new(48_000, 8);
        m.start(buf(vec![0.0, 1.0], 1, 24_000));
        let mut out = vec![0.0; 4];
        m.mix_into(&mut out, 1);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn voice_cap_drops_oldest() {
        let mut m = Mixer::new(48_000, 2);
        m.start(buf(vec![0.1; 8], 1, 48_000));
        m.start(buf(vec![0.2; 8], 1, 48_000));
        m.start(buf(vec![0.4; 8], 1, 48_000));
        assert_eq!(m.voices.len(), 2);
        let mut out = vec![0.0; 1];
        m.mix_into(&mut out, 1);
        assert!((out[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn voice_survives_across_callbacks() {
        let mut m = Mixer::new(48_000, 8);
        m.start(buf(vec![0.1, 0.2, 0.3, 0.4], 1, 48_000));
        let mut out = vec![0.0; 2];
        m.mix_into(&mut out, 1);
        assert_eq!(m.voices.len(), 1);
        m.mix_into(&mut out, 1);
        assert_eq!(out, vec![0.3, 0.4]);
        assert!(m.voices.is_empty());
    }
}
