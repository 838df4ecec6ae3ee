//! Decoded sample buffers.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{trace, warn};

// ════════════════════════════════════════════════════════════════════════════
// SampleError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum SampleError {
    Io(io::Error),
    /// The container or codec could not be read.
    Decode(String),
    /// The file holds no decodable audio track.
    NoTrack,
    /// Decoding succeeded but produced zero frames.
    Empty,
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Io(e)     => write!(f, "I/O error: {}", e),
            SampleError::Decode(m) => write!(f, "decode error: {}", m),
            SampleError::NoTrack   => write!(f, "no audio track"),
            SampleError::Empty     => write!(f, "no audio frames"),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SampleError {
    fn from(e: io::Error) -> Self { SampleError::Io(e) }
}

impl From<SymphoniaError> for SampleError {
    fn from(e: SymphoniaError) -> Self {
        match e {
            SymphoniaError::IoError(e) => SampleError::Io(e),
            other => SampleError::Decode(other.to_string()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SampleBuffer
// ════════════════════════════════════════════════════════════════════════════

/// Interleaved `f32` audio at the file's own rate.  Never mutated after
/// decoding; shared between the cache and playing voices via `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    samples:     Vec<f32>,
    channels:    u16,
    sample_rate: u32,
}

impl SampleBuffer {
    /// `samples` is interleaved; a trailing partial frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() / channels as usize * channels as usize;
        samples.truncate(whole);
        SampleBuffer { samples, channels, sample_rate: sample_rate.max(1) }
    }

    /// Decode a WAV or MP3 file.  The extension is only a format hint; the
    /// container is sniffed from its contents.
    pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Self, SampleError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let ext  = path.extension().and_then(|e| e.to_str());
        decode_source(Box::new(file), ext)
    }

    pub fn channels(&self) -> u16 { self.channels }

    pub fn sample_rate(&self) -> u32 { self.sample_rate }

    pub fn frames(&self) -> usize { self.samples.len() / self.channels as usize }

    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.frames() as u64 * 1_000_000_000 / self.sample_rate as u64)
    }

    pub fn interleaved(&self) -> &[f32] { &self.samples }

    /// One sample.  Channels past the buffer's last are folded onto it, so a
    /// mono buffer feeds every output channel.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let ch = channel.min(self.channels as usize - 1);
        self.samples.get(frame * self.channels as usize + ch).copied().unwrap_or(0.0)
    }
}

fn decode_source(source: Box<dyn MediaSource>, ext: Option<&str>) -> Result<SampleBuffer, SampleError> {
    let mss = MediaSourceStream::new(source, Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(SampleError::NoTrack)?
        .clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let mut channels    = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            // End of stream surfaces as an I/O error.
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track.id { continue; }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels    = spec.channels.count() as u16;
                let mut buf = DecodeBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("skipping corrupt packet: {}", msg);
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if samples.is_empty() {
        return Err(SampleError::Empty);
    }
    trace!(frames = samples.len() / channels.max(1) as usize, sample_rate, channels, "decoded");
    Ok(SampleBuffer::from_interleaved(samples, channels, sample_rate))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
