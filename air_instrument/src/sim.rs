//! Keyboard simulation: no camera or model needed.
//!
//! [`ClockCamera`] stands in for the webcam: every call yields a frame
//! stamped with the time since `open`.  [`SimDetector`] reports one
//! synthetic right hand whose fingers curl while keys `1`–`5` are held.
//! The visualizer sends [`SimInput`] events over a channel; the detector
//! drains them at the start of each `detect`.
//!
//! The neutral pose has every finger extended upward and the thumb out to
//! the side, which reads as "not pressing" for piano and drums.  The
//! synthesizer test fires on an *extended* index finger, so in synthesizer
//! mode the neutral pose plays and holding `2` releases.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use hand_landmarks::{Finger, Hand, Handedness, Landmark, LANDMARK_COUNT};
use tracing::debug;

use crate::camera::{DetectError, FrameSource, HandDetector, SourceError, VideoFrame};

// ════════════════════════════════════════════════════════════════════════════
// ClockCamera
// ════════════════════════════════════════════════════════════════════════════

/// Frames stamped from a monotonic clock.
#[derive(Debug, Default)]
pub struct ClockCamera {
    started: Option<Instant>,
}

impl ClockCamera {
    pub fn new() -> Self { ClockCamera::default() }
}

impl FrameSource for ClockCamera {
    fn open(&mut self) -> Result<(), SourceError> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn is_active(&self) -> bool { self.started.is_some() }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        self.started.map(|t| VideoFrame::at(t.elapsed()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimInput
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    /// Which of keys 1–5 (thumb..pinky) are currently held.
    Held([bool; 5]),
    /// Show or hide the hand (H).
    ToggleVisible,
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic pose
// ════════════════════════════════════════════════════════════════════════════

const WRIST: Landmark = Landmark::xy(0.50, 0.85);

/// Extended joints per finger: [MCP/CMC, PIP/MCP, DIP/IP, tip].
const EXTENDED: [[Landmark; 4]; 5] = [
    [Landmark::xy(0.58, 0.80), Landmark::xy(0.64, 0.72), Landmark::xy(0.69, 0.65),  Landmark::xy(0.73, 0.59)],
    [Landmark::xy(0.56, 0.60), Landmark::xy(0.57, 0.48), Landmark::xy(0.575, 0.40), Landmark::xy(0.58, 0.33)],
    [Landmark::xy(0.50, 0.58), Landmark::xy(0.50, 0.45), Landmark::xy(0.50, 0.37),  Landmark::xy(0.50, 0.30)],
    [Landmark::xy(0.44, 0.60), Landmark::xy(0.43, 0.48), Landmark::xy(0.425, 0.41), Landmark::xy(0.42, 0.35)],
    [Landmark::xy(0.39, 0.64), Landmark::xy(0.37, 0.55), Landmark::xy(0.36, 0.49),  Landmark::xy(0.355, 0.44)],
];

/// Thumb folded across the palm: IP and tip move left of the MCP.
const THUMB_CURLED: [Landmark; 2] = [Landmark::xy(0.60, 0.68), Landmark::xy(0.55, 0.66)];

/// Fingertip height when a finger is folded down.
const CURLED_TIP_Y: f32 = 0.68;

/// Build the synthetic hand with the given fingers curled.
pub fn posed_hand(curled: [bool; 5]) -> Hand {
    let mut points = [WRIST; LANDMARK_COUNT];
    for (f, finger) in Finger::ALL.iter().enumerate() {
        let mut joints = EXTENDED[f];
        if curled[f] {
            if *finger == Finger::Thumb {
                joints[2] = THUMB_CURLED[0];
                joints[3] = THUMB_CURLED[1];
            } else {
                let mcp_x = joints[0].x;
                joints[2] = Landmark::xy(mcp_x, joints[1].y + 0.08);
                joints[3] = Landmark::xy(mcp_x, CURLED_TIP_Y);
            }
        }
        // Joints of finger f occupy indices 1 + 4f .. 4 + 4f.
        for (j, joint) in joints.iter().enumerate() {
            points[1 + 4 * f + j] = *joint;
        }
    }
    Hand::new(points).with_handedness(Handedness::Right)
}

// ════════════════════════════════════════════════════════════════════════════
// SimDetector
// ════════════════════════════════════════════════════════════════════════════

pub struct SimDetector {
    rx:      Receiver<SimInput>,
    curled:  [bool; 5],
    visible: bool,
}

impl SimDetector {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimDetector { rx, curled: [false; 5], visible: true }
    }

    fn drain_input(&mut self) {
        while let Ok(input) = self.rx.try_recv() {
            match input {
                SimInput::Held(keys) => self.curled = keys,
                SimInput::ToggleVisible => {
                    self.visible = !self.visible;
                    debug!(visible = self.visible, "simulated hand toggled");
                }
            }
        }
    }
}

impl HandDetector for SimDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Hand>, DetectError> {
        self.drain_input();
        if !self.visible {
            return Ok(Vec::new());
        }
        Ok(vec![posed_hand(self.curled)])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use air_gesture::{GestureEvaluator, Instrument};
    use std::sync::mpsc;

    fn curl(slot: usize) -> [bool; 5] {
        let mut c = [false; 5];
        c[slot] = true;
        c
    }

    #[test]
    fn neutral_pose_presses_nothing_on_piano_or_drums() {
        let eval = GestureEvaluator::default();
        let hand = posed_hand([false; 5]);
        for i in [Instrument::Piano, Instrument::Drums] {
            assert!(!eval.evaluate(&hand, i).any(), "{}", i);
        }
    }

    #[test]
    fn each_key_presses_exactly_its_slot() {
        let eval = GestureEvaluator::default();
        for i in [Instrument::Piano, Instrument::Drums] {
            for slot in 0..5 {
                let s = eval.evaluate(&posed_hand(curl(slot)), i);
                let expected: Vec<bool> = (0..5).map(|k| k == slot).collect();
                assert_eq!(s.as_slice(), expected.as_slice(), "{} slot {}", i, slot);
            }
        }
    }

    #[test]
    fn synthesizer_plays_on_the_extended_index() {
        let eval = GestureEvaluator::default();
        assert_eq!(eval.evaluate(&posed_hand([false; 5]), Instrument::Synthesizer).get(0), Some(true));
        assert_eq!(eval.evaluate(&posed_hand(curl(1)), Instrument::Synthesizer).get(0), Some(false));
    }

    #[test]
    fn detector_follows_input() {
        let (tx, rx) = mpsc::channel();
        let mut det = SimDetector::new(rx);
        let frame = VideoFrame::at(Default::default());

        assert_eq!(det.detect(&frame).unwrap(), vec![posed_hand([false; 5])]);
        tx.send(SimInput::Held(curl(3))).unwrap();
        assert_eq!(det.detect(&frame).unwrap(), vec![posed_hand(curl(3))]);
        tx.send(SimInput::ToggleVisible).unwrap();
        assert!(det.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn clock_camera_is_inactive_until_opened() {
        let mut cam = ClockCamera::new();
        assert!(!cam.is_active());
        assert!(cam.latest_frame().is_none());
        cam.open().unwrap();
        assert!(cam.is_active());
        let a = cam.latest_frame().unwrap();
        let b = cam.latest_frame().unwrap();
        assert!(b.timestamp >= a.timestamp);
    }
}
