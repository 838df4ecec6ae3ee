//! The boundary to the outside world: a source of video frames and a hand
//! detector that turns a frame into landmarks.
//!
//! Neither is implemented here for a real webcam; see [`crate::sim`],
//! [`crate::replay`], and (with the `leap` feature) `crate::leap` for the
//! sources this crate ships.

use std::fmt;
use std::time::Duration;

use hand_landmarks::{Hand, RecordingError};

// ════════════════════════════════════════════════════════════════════════════
// VideoFrame
// ════════════════════════════════════════════════════════════════════════════

/// What the frame loop needs to know about a captured frame.  Pixel data
/// and size are the detector's business: landmarks come back normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    /// Capture time, monotonic within one session.
    pub timestamp: Duration,
}

impl VideoFrame {
    pub fn at(timestamp: Duration) -> Self {
        VideoFrame { timestamp }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Traits
// ════════════════════════════════════════════════════════════════════════════

/// A live video source.
pub trait FrameSource {
    /// Acquire the device.  The frame loop does not start if this fails.
    fn open(&mut self) -> Result<(), SourceError>;

    /// False before `open` and once the session has ended.
    fn is_active(&self) -> bool;

    /// The most recent frame, or `None` if nothing has been captured yet.
    /// May return the same frame on consecutive calls.
    fn latest_frame(&mut self) -> Option<VideoFrame>;
}

/// A hand-landmark detector.  Called synchronously once per new frame, so
/// frame N's landmarks always precede frame N's evaluation.
pub trait HandDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Hand>, DetectError>;
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum SourceError {
    /// No device, or the device refused access.
    Unavailable(String),
    Recording(RecordingError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable(m) => write!(f, "video source unavailable: {}", m),
            SourceError::Recording(e)   => write!(f, "recording: {}", e),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Recording(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RecordingError> for SourceError {
    fn from(e: RecordingError) -> Self { SourceError::Recording(e) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// The model or device has not finished initializing.
    NotReady,
    /// The detector has no result for this frame.
    NoResult(Duration),
    Backend(String),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::NotReady    => write!(f, "detector not ready"),
            DetectError::NoResult(t) => write!(f, "no detection for frame at {:?}", t),
            DetectError::Backend(m)  => write!(f, "detector backend: {}", m),
        }
    }
}

impl std::error::Error for DetectError {}
