//! Per-frame finger tests.
//!
//! Each test is a single comparison with one margin baked in.  There is no
//! smoothing, hysteresis band, or confidence weighting; the trigger state
//! machine downstream is the only thing that looks across frames.

use hand_landmarks::{Finger, Hand, HandLandmark};
use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;

/// Widest instrument, in finger slots.
pub const MAX_SLOTS: usize = 5;

// ════════════════════════════════════════════════════════════════════════════
// GestureThresholds
// ════════════════════════════════════════════════════════════════════════════

/// Empirically tuned margins, in normalized image units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// ε for the thumb: tip must sit this far left of the thumb MCP.
    pub thumb_curl_x:  f32,
    /// δ for drum fingers: tip must sit this far below the PIP joint.
    pub drum_curl_y:   f32,
    /// δ for the synthesizer index finger: tip must sit this far above the PIP.
    pub synth_lift_y:  f32,
    /// Piano press rows per slot.  Slot 0 (thumb) is not consulted; the
    /// thumb always uses the curl test.
    pub piano_rows:    [f32; MAX_SLOTS],
}

impl Default for GestureThresholds {
    fn default() -> Self {
        GestureThresholds {
            thumb_curl_x: 0.02,
            drum_curl_y:  0.05,
            synth_lift_y: 0.05,
            piano_rows:   [0.5, 0.6, 0.6, 0.6, 0.55],
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerStates
// ════════════════════════════════════════════════════════════════════════════

/// "Pressing" flags for one hand, one per tracked finger slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerStates {
    pressed: [bool; MAX_SLOTS],
    len:     usize,
}

impl FingerStates {
    /// All-released states for `len` slots (capped at [`MAX_SLOTS`]).
    pub fn released(len: usize) -> Self {
        FingerStates { pressed: [false; MAX_SLOTS], len: len.min(MAX_SLOTS) }
    }

    pub fn from_slice(flags: &[bool]) -> Self {
        let mut s = Self::released(flags.len());
        s.pressed[..s.len].copy_from_slice(&flags[..s.len]);
        s
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn get(&self, slot: usize) -> Option<bool> {
        self.as_slice().get(slot).copied()
    }

    pub fn as_slice(&self) -> &[bool] { &self.pressed[..self.len] }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn any(&self) -> bool { self.iter().any(|p| p) }

    fn set(&mut self, slot: usize, pressing: bool) {
        if slot < self.len { self.pressed[slot] = pressing; }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureEvaluator
// ════════════════════════════════════════════════════════════════════════════

/// Stateless mapping from one hand's landmarks to per-finger pressing flags.
#[derive(Clone, Debug, Default)]
pub struct GestureEvaluator {
    thresholds: GestureThresholds,
}

impl GestureEvaluator {
    pub fn new(thresholds: GestureThresholds) -> Self {
        GestureEvaluator { thresholds }
    }

    pub fn thresholds(&self) -> &GestureThresholds { &self.thresholds }

    /// Evaluate every finger slot `instrument` tracks.
    pub fn evaluate(&self, hand: &Hand, instrument: Instrument) -> FingerStates {
        let mut states = FingerStates::released(instrument.slot_count());
        for (slot, &finger) in instrument.fingers().iter().enumerate() {
            states.set(slot, self.finger_pressing(hand, instrument, slot, finger));
        }
        states
    }

    fn finger_pressing(&self, hand: &Hand, instrument: Instrument, slot: usize, finger: Finger) -> bool {
        match (instrument, finger) {
            (Instrument::Synthesizer, _)    => self.synth_lifted(hand),
            (_, Finger::Thumb)              => self.thumb_curled(hand),
            (Instrument::Piano, _)          => self.piano_pressed(hand, slot, finger),
            (Instrument::Drums, _)          => self.finger_curled(hand, finger),
        }
    }

    /// Thumb folds inward across the palm: the tip moves left of its MCP.
    /// The thumb's motion is mostly horizontal, hence the x-axis test.
    pub fn thumb_curled(&self, hand: &Hand) -> bool {
        let tip  = hand[HandLandmark::ThumbTip];
        let base = hand[HandLandmark::ThumbMcp];
        tip.x < base.x - self.thresholds.thumb_curl_x
    }

    /// Fingertip drops below its PIP joint (image y grows downward).
    pub fn finger_curled(&self, hand: &Hand, finger: Finger) -> bool {
        let tip = hand[finger.tip()];
        let pip = hand[finger.pip()];
        tip.y > pip.y + self.thresholds.drum_curl_y
    }

    /// Fingertip crosses the slot's horizontal press row.
    pub fn piano_pressed(&self, hand: &Hand, slot: usize, finger: Finger) -> bool {
        let row = self.thresholds.piano_rows.get(slot).copied().unwrap_or(1.0);
        hand[finger.tip()].y > row
    }

    /// Index tip rises above its PIP joint.  Note the comparison runs the
    /// opposite way to [`finger_curled`](Self::finger_curled).
    pub fn synth_lifted(&self, hand: &Hand) -> bool {
        let tip = hand[HandLandmark::IndexTip];
        let pip = hand[HandLandmark::IndexPip];
        tip.y < pip.y - self.thresholds.synth_lift_y
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_landmarks::{Landmark, LANDMARK_COUNT};

    /// Every point at (0.5, 0.5): no test fires except the synth lift, which
    /// needs the tip strictly above the PIP.
    fn flat_hand() -> Hand {
        Hand::new([Landmark::xy(0.5, 0.5); LANDMARK_COUNT])
    }

    fn with(mut hand: Hand, point: HandLandmark, x: f32, y: f32) -> Hand {
        hand.set(point, Landmark::xy(x, y));
        hand
    }

    fn eval() -> GestureEvaluator { GestureEvaluator::default() }

    // ── thumb ────────────────────────────────────────────────────────────
    #[test]
    fn thumb_curl_past_margin() {
        let hand = with(flat_hand(), HandLandmark::ThumbTip, 0.5 - 0.03, 0.5);
        assert!(eval().thumb_curled(&hand));
    }

    #[test]
    fn thumb_curl_inside_margin() {
        let hand = with(flat_hand(), HandLandmark::ThumbTip, 0.5 - 0.01, 0.5);
        assert!(!eval().thumb_curled(&hand));
    }

    #[test]
    fn thumb_test_ignores_vertical_position() {
        let hand = with(flat_hand(), HandLandmark::ThumbTip, 0.5, 0.95);
        assert!(!eval().thumb_curled(&hand));
    }

    // ── piano ────────────────────────────────────────────────────────────
    #[test]
    fn piano_rows_per_finger() {
        let t = GestureThresholds::default();
        for (slot, finger) in Finger::ALL.iter().enumerate().skip(1) {
            let row = t.piano_rows[slot];
            let below = with(flat_hand(), finger.tip(), 0.5, row + 0.01);
            let above = with(flat_hand(), finger.tip(), 0.5, row - 0.01);
            assert!(eval().piano_pressed(&below, slot, *finger), "{}", finger.name());
            assert!(!eval().piano_pressed(&above, slot, *finger), "{}", finger.name());
        }
    }

    #[test]
    fn piano_evaluate_slot_layout() {
        let hand = with(flat_hand(), HandLandmark::MiddleTip, 0.5, 0.7);
        let hand = with(hand, HandLandmark::ThumbTip, 0.4, 0.5);
        let s = eval().evaluate(&hand, Instrument::Piano);
        assert_eq!(s.as_slice(), &[true, false, true, false, false]);
    }

    #[test]
    fn piano_pinky_row_is_lower() {
        // 0.57 is past the pinky row (0.55) but not the ring row (0.6).
        let hand = with(flat_hand(), HandLandmark::PinkyTip, 0.5, 0.57);
        let hand = with(hand, HandLandmark::RingTip, 0.5, 0.57);
        let s = eval().evaluate(&hand, Instrument::Piano);
        assert_eq!(s.get(4), Some(true));
        assert_eq!(s.get(3), Some(false));
    }

    // ── drums ────────────────────────────────────────────────────────────
    #[test]
    fn drum_curl_past_margin() {
        let hand = with(flat_hand(), HandLandmark::RingTip, 0.5, 0.5 + 0.06);
        assert!(eval().finger_curled(&hand, Finger::Ring));
    }

    #[test]
    fn drum_curl_inside_margin() {
        let hand = with(flat_hand(), HandLandmark::RingTip, 0.5, 0.5 + 0.04);
        assert!(!eval().finger_curled(&hand, Finger::Ring));
    }

    #[test]
    fn drums_use_thumb_curl_and_pip_curl() {
        let hand = with(flat_hand(), HandLandmark::ThumbTip, 0.45, 0.5);
        let hand = with(hand, HandLandmark::IndexTip, 0.5, 0.6);
        let s = eval().evaluate(&hand, Instrument::Drums);
        assert_eq!(s.as_slice(), &[true, true, false, false, false]);
    }

    // ── synthesizer ──────────────────────────────────────────────────────
    #[test]
    fn synth_has_one_slot() {
        let s = eval().evaluate(&flat_hand(), Instrument::Synthesizer);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(0), Some(false));
    }

    #[test]
    fn synth_direction_is_opposite_of_drum_curl() {
        let lifted = with(flat_hand(), HandLandmark::IndexTip, 0.5, 0.5 - 0.06);
        let curled = with(flat_hand(), HandLandmark::IndexTip, 0.5, 0.5 + 0.06);

        assert_eq!(eval().evaluate(&lifted, Instrument::Synthesizer).get(0), Some(true));
        assert_eq!(eval().evaluate(&curled, Instrument::Synthesizer).get(0), Some(false));
        assert!(eval().finger_curled(&curled, Finger::Index));
    }

    #[test]
    fn custom_thresholds_apply() {
        let t = GestureThresholds { thumb_curl_x: 0.1, ..GestureThresholds::default() };
        let hand = with(flat_hand(), HandLandmark::ThumbTip, 0.45, 0.5);
        assert!(!GestureEvaluator::new(t).thumb_curled(&hand));
        assert!(eval().thumb_curled(&hand));
    }

    #[test]
    fn thresholds_from_partial_toml() {
        let t: GestureThresholds = toml::from_str("drum_curl_y = 0.08").unwrap();
        assert_eq!(t.drum_curl_y, 0.08);
        assert_eq!(t.piano_rows, GestureThresholds::default().piano_rows);
    }

    #[test]
    fn finger_states_slice() {
        let s = FingerStates::from_slice(&[false, true]);
        assert_eq!(s.len(), 2);
        assert!(s.any());
        assert_eq!(s.get(2), None);
        assert!(FingerStates::released(1).iter().all(|p| !p));
    }
}
