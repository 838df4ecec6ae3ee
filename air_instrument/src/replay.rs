//! Replay a recorded detector session.
//!
//! [`split`] turns a [`Recording`] into a camera that yields the recorded
//! timestamps in order and a detector that answers with the hands recorded
//! at each timestamp.  Duplicate timestamps in the recording reach the frame
//! loop as duplicate frames and are skipped there, the same as redundant
//! scheduler ticks on a live camera.

use std::collections::BTreeMap;
use std::time::Duration;

use hand_landmarks::{Hand, Recording};

use crate::camera::{DetectError, FrameSource, HandDetector, SourceError, VideoFrame};

/// Split a recording into its two halves.
pub fn split(recording: Recording) -> (ReplayCamera, ReplayDetector) {
    let mut timestamps = Vec::with_capacity(recording.len());
    let mut hands      = BTreeMap::new();
    for frame in recording.into_frames() {
        timestamps.push(frame.timestamp);
        // First entry wins for a repeated timestamp.
        hands.entry(frame.timestamp).or_insert(frame.hands);
    }
    (ReplayCamera::new(timestamps), ReplayDetector { hands })
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayCamera
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ReplayCamera {
    timestamps: Vec<Duration>,
    next:       usize,
    opened:     bool,
}

impl ReplayCamera {
    pub fn new(timestamps: Vec<Duration>) -> Self {
        ReplayCamera { timestamps, next: 0, opened: false }
    }

    pub fn remaining(&self) -> usize { self.timestamps.len() - self.next }
}

impl FrameSource for ReplayCamera {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.timestamps.is_empty() {
            return Err(SourceError::Unavailable("recording holds no frames".into()));
        }
        self.opened = true;
        Ok(())
    }

    fn is_active(&self) -> bool { self.opened && self.next < self.timestamps.len() }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        if !self.opened { return None; }
        let t = *self.timestamps.get(self.next)?;
        self.next += 1;
        Some(VideoFrame::at(t))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ReplayDetector {
    hands: BTreeMap<Duration, Vec<Hand>>,
}

impl HandDetector for ReplayDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Hand>, DetectError> {
        self.hands
            .get(&frame.timestamp)
            .cloned()
            .ok_or(DetectError::NoResult(frame.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand_landmarks::{HandFrame, Landmark, LANDMARK_COUNT};

    fn ms(v: u64) -> Duration { Duration::from_millis(v) }

    fn hand(y: f32) -> Hand { Hand::new([Landmark::xy(0.5, y); LANDMARK_COUNT]) }

    fn recording() -> Recording {
        Recording::new(vec![
            HandFrame::new(ms(0), vec![hand(0.1)]),
            HandFrame::empty(ms(16)),
            HandFrame::new(ms(33), vec![hand(0.2), hand(0.3)]),
        ])
    }

    #[test]
    fn camera_yields_each_timestamp_once() {
        let (mut cam, _) = split(recording());
        assert!(!cam.is_active());
        cam.open().unwrap();

        let seen: Vec<_> = std::iter::from_fn(|| cam.latest_frame()).map(|f| f.timestamp).collect();
        assert_eq!(seen, vec![ms(0), ms(16), ms(33)]);
        assert!(!cam.is_active());
        assert_eq!(cam.remaining(), 0);
    }

    #[test]
    fn detector_answers_by_timestamp() {
        let (_, mut det) = split(recording());
        assert_eq!(det.detect(&VideoFrame::at(ms(33))).unwrap().len(), 2);
        assert!(det.detect(&VideoFrame::at(ms(16))).unwrap().is_empty());
        assert_eq!(det.detect(&VideoFrame::at(ms(5))), Err(DetectError::NoResult(ms(5))));
    }

    #[test]
    fn empty_recording_refuses_to_open() {
        let (mut cam, _) = split(Recording::default());
        assert!(matches!(cam.open(), Err(SourceError::Unavailable(_))));
        assert!(!cam.is_active());
    }
}
