//! Landmarks, hands, and per-frame detector output.

use std::fmt;
use std::ops::Index;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Keypoints reported per hand.
pub const LANDMARK_COUNT: usize = 21;

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// A normalized keypoint.  `x`/`y` are image-relative in `[0, 1]`, `y` grows
/// downward.  `z` is relative depth (wrist ≈ 0) and is optional on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    pub const fn xy(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandLandmark: semantic indices
// ════════════════════════════════════════════════════════════════════════════

/// The 21 semantic landmark positions, in detector order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum HandLandmark {
    Wrist     = 0,
    ThumbCmc  = 1,
    ThumbMcp  = 2,
    ThumbIp   = 3,
    ThumbTip  = 4,
    IndexMcp  = 5,
    IndexPip  = 6,
    IndexDip  = 7,
    IndexTip  = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp   = 13,
    RingPip   = 14,
    RingDip   = 15,
    RingTip   = 16,
    PinkyMcp  = 17,
    PinkyPip  = 18,
    PinkyDip  = 19,
    PinkyTip  = 20,
}

impl HandLandmark {
    pub const ALL: [HandLandmark; LANDMARK_COUNT] = [
        HandLandmark::Wrist,
        HandLandmark::ThumbCmc,  HandLandmark::ThumbMcp,  HandLandmark::ThumbIp,   HandLandmark::ThumbTip,
        HandLandmark::IndexMcp,  HandLandmark::IndexPip,  HandLandmark::IndexDip,  HandLandmark::IndexTip,
        HandLandmark::MiddleMcp, HandLandmark::MiddlePip, HandLandmark::MiddleDip, HandLandmark::MiddleTip,
        HandLandmark::RingMcp,   HandLandmark::RingPip,   HandLandmark::RingDip,   HandLandmark::RingTip,
        HandLandmark::PinkyMcp,  HandLandmark::PinkyPip,  HandLandmark::PinkyDip,  HandLandmark::PinkyTip,
    ];

    /// Position in the detector's 21-element array.
    pub fn index(self) -> usize { self as usize }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            HandLandmark::Wrist     => "wrist",
            HandLandmark::ThumbCmc  => "thumb-cmc",
            HandLandmark::ThumbMcp  => "thumb-mcp",
            HandLandmark::ThumbIp   => "thumb-ip",
            HandLandmark::ThumbTip  => "thumb-tip",
            HandLandmark::IndexMcp  => "index-mcp",
            HandLandmark::IndexPip  => "index-pip",
            HandLandmark::IndexDip  => "index-dip",
            HandLandmark::IndexTip  => "index-tip",
            HandLandmark::MiddleMcp => "middle-mcp",
            HandLandmark::MiddlePip => "middle-pip",
            HandLandmark::MiddleDip => "middle-dip",
            HandLandmark::MiddleTip => "middle-tip",
            HandLandmark::RingMcp   => "ring-mcp",
            HandLandmark::RingPip   => "ring-pip",
            HandLandmark::RingDip   => "ring-dip",
            HandLandmark::RingTip   => "ring-tip",
            HandLandmark::PinkyMcp  => "pinky-mcp",
            HandLandmark::PinkyPip  => "pinky-pip",
            HandLandmark::PinkyDip  => "pinky-dip",
            HandLandmark::PinkyTip  => "pinky-tip",
        }
    }

    /// True for the five fingertip points.
    pub fn is_tip(self) -> bool {
        Finger::ALL.iter().any(|f| f.tip() == self)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// A digit, thumb first.  The order matches the per-finger slot order used
/// by the gesture evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    pub fn tip(self) -> HandLandmark {
        match self {
            Finger::Thumb  => HandLandmark::ThumbTip,
            Finger::Index  => HandLandmark::IndexTip,
            Finger::Middle => HandLandmark::MiddleTip,
            Finger::Ring   => HandLandmark::RingTip,
            Finger::Pinky  => HandLandmark::PinkyTip,
        }
    }

    /// The middle knuckle.  The thumb has no PIP; its IP joint plays the
    /// same role.
    pub fn pip(self) -> HandLandmark {
        match self {
            Finger::Thumb  => HandLandmark::ThumbIp,
            Finger::Index  => HandLandmark::IndexPip,
            Finger::Middle => HandLandmark::MiddlePip,
            Finger::Ring   => HandLandmark::RingPip,
            Finger::Pinky  => HandLandmark::PinkyPip,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

/// Skeleton edges between landmark indices, for drawing.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),   (1, 2),   (2, 3),   (3, 4),
    (0, 5),   (5, 6),   (6, 7),   (7, 8),
    (5, 9),   (9, 10),  (10, 11), (11, 12),
    (9, 13),  (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17),  (17, 18), (18, 19), (19, 20),
];

// ════════════════════════════════════════════════════════════════════════════
// Handedness
// ════════════════════════════════════════════════════════════════════════════

/// Which hand the detector believes it saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(self) -> &'static str {
        match self {
            Handedness::Left  => "left",
            Handedness::Right => "right",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LandmarkError {
    /// A hand arrived with other than 21 points.
    WrongCount { expected: usize, found: usize },
}

impl fmt::Display for LandmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandmarkError::WrongCount { expected, found } => {
                write!(f, "expected {} landmarks per hand, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for LandmarkError {}

// ════════════════════════════════════════════════════════════════════════════
// Hand
// ════════════════════════════════════════════════════════════════════════════

/// One detected hand: exactly 21 landmarks plus the detector's metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHand", into = "RawHand")]
pub struct Hand {
    pub handedness: Option<Handedness>,
    /// Detector confidence, 0.0–1.0.
    pub score:      f32,
    landmarks:      [Landmark; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Hand { handedness: None, score: 1.0, landmarks }
    }

    pub fn from_slice(points: &[Landmark]) -> Result<Self, LandmarkError> {
        let landmarks: [Landmark; LANDMARK_COUNT] = points.try_into()
            .map_err(|_| LandmarkError::WrongCount {
                expected: LANDMARK_COUNT,
                found:    points.len(),
            })?;
        Ok(Hand::new(landmarks))
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn landmark(&self, point: HandLandmark) -> Landmark {
        self.landmarks[point.index()]
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    /// Overwrite one point, e.g. to pose a synthetic hand.
    pub fn set(&mut self, point: HandLandmark, value: Landmark) {
        self.landmarks[point.index()] = value;
    }
}

impl Index<HandLandmark> for Hand {
    type Output = Landmark;

    fn index(&self, point: HandLandmark) -> &Landmark {
        &self.landmarks[point.index()]
    }
}

/// Wire shape of a hand; the landmark count is checked on the way in.
#[derive(Serialize, Deserialize)]
struct RawHand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    handedness: Option<Handedness>,
    #[serde(default = "default_score")]
    score:      f32,
    landmarks:  Vec<Landmark>,
}

fn default_score() -> f32 { 1.0 }

impl TryFrom<RawHand> for Hand {
    type Error = LandmarkError;

    fn try_from(raw: RawHand) -> Result<Self, Self::Error> {
        let mut hand = Hand::from_slice(&raw.landmarks)?;
        hand.handedness = raw.handedness;
        hand.score = raw.score;
        Ok(hand)
    }
}

impl From<Hand> for RawHand {
    fn from(hand: Hand) -> Self {
        RawHand {
            handedness: hand.handedness,
            score:      hand.score,
            landmarks:  hand.landmarks.to_vec(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// Detector output for one processed video frame: 0–2 hands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    #[serde(rename = "timestamp_ms", with = "duration_ms")]
    pub timestamp: Duration,
    #[serde(default)]
    pub hands:     Vec<Hand>,
}

impl HandFrame {
    pub fn new(timestamp: Duration, hands: Vec<Hand>) -> Self {
        HandFrame { timestamp, hands }
    }

    pub fn empty(timestamp: Duration) -> Self {
        HandFrame { timestamp, hands: Vec::new() }
    }
}

/// Timestamps travel as fractional milliseconds, the unit video elements
/// and detectors use.
mod duration_ms {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(D::Error::custom(format!("invalid timestamp_ms {}", ms)));
        }
        Ok(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn open_hand() -> Hand {
        let mut pts = [Landmark::default(); LANDMARK_COUNT];
        for (i, p) in pts.iter_mut().enumerate() {
            *p = Landmark::xy(i as f32 / 40.0, 1.0 - i as f32 / 40.0);
        }
        Hand::new(pts)
    }

    #[test]
    fn indices_match_detector_order() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbMcp.index(), 2);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexPip.index(), 6);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        for (i, p) in HandLandmark::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
            assert_eq!(HandLandmark::from_index(i), Some(*p));
        }
        assert_eq!(HandLandmark::from_index(21), None);
    }

    #[test]
    fn finger_joints() {
        assert_eq!(Finger::Thumb.pip(), HandLandmark::ThumbIp);
        assert_eq!(Finger::Middle.pip(), HandLandmark::MiddlePip);
        assert_eq!(Finger::Pinky.tip().index(), 20);
        let tips: Vec<_> = HandLandmark::ALL.iter().filter(|p| p.is_tip()).collect();
        assert_eq!(tips.len(), 5);
    }

    #[test]
    fn connections_reference_valid_points() {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            assert!(a < LANDMARK_COUNT && b < LANDMARK_COUNT);
        }
        // Every tip hangs off exactly one edge.
        for f in Finger::ALL {
            let t = f.tip().index();
            let n = HAND_CONNECTIONS.iter().filter(|&&(a, b)| a == t || b == t).count();
            assert_eq!(n, 1, "{}", f.name());
        }
    }

    #[test]
    fn from_slice_rejects_wrong_count() {
        let err = Hand::from_slice(&[Landmark::default(); 20]).unwrap_err();
        assert_eq!(err, LandmarkError::WrongCount { expected: 21, found: 20 });
        assert!(Hand::from_slice(&[Landmark::default(); 21]).is_ok());
    }

    #[test]
    fn index_by_semantic_point() {
        let hand = open_hand();
        assert_eq!(hand[HandLandmark::IndexTip], hand.landmarks()[8]);
        assert_eq!(hand.landmark(HandLandmark::Wrist), hand.landmarks()[0]);
    }

    #[test]
    fn hand_json_shape() {
        let hand = open_hand().with_handedness(Handedness::Right).with_score(0.9);
        let json = serde_json::to_string(&hand).unwrap();
        assert!(json.contains("\"handedness\":\"Right\""));
        let back: Hand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hand);
    }

    #[test]
    fn hand_json_missing_optional_fields() {
        let pts: Vec<String> = (0..21).map(|_| r#"{"x":0.1,"y":0.2}"#.to_string()).collect();
        let json = format!(r#"{{"landmarks":[{}]}}"#, pts.join(","));
        let hand: Hand = serde_json::from_str(&json).unwrap();
        assert_eq!(hand.handedness, None);
        assert_eq!(hand.score, 1.0);
        assert_eq!(hand[HandLandmark::ThumbTip].z, 0.0);
    }

    #[test]
    fn hand_json_wrong_count_is_error() {
        let json = r#"{"landmarks":[{"x":0.1,"y":0.2}]}"#;
        let err = serde_json::from_str::<Hand>(json).unwrap_err();
        assert!(err.to_string().contains("expected 21 landmarks"));
    }

    #[test]
    fn frame_timestamp_in_millis() {
        let frame = HandFrame::empty(Duration::from_millis(250));
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"timestamp_ms\":250"));
        let back: HandFrame = serde_json::from_str(r#"{"timestamp_ms":33.5}"#).unwrap();
        assert_eq!(back.timestamp, Duration::from_micros(33_500));
        assert!(back.hands.is_empty());
    }

    #[test]
    fn negative_timestamp_rejected() {
        assert!(serde_json::from_str::<HandFrame>(r#"{"timestamp_ms":-1}"#).is_err());
    }
}
