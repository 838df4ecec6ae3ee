//! # hand_landmarks
//!
//! The data model shared by everything downstream of a hand-landmark
//! detector: 21 normalized keypoints per hand, 0–2 hands per processed
//! video frame.
//!
//! Coordinates are image-relative and normalized to `[0, 1]`; `y` grows
//! downward, exactly as the detector reports them.  Detectors may report
//! points slightly outside the unit square when a hand is partly off-frame,
//! so no range check is applied.
//!
//! ## Landmark indices
//!
//! | Index | Point | Index | Point |
//! |---|---|---|---|
//! | 0 | wrist | 1–4 | thumb CMC, MCP, IP, tip |
//! | 5–8 | index MCP, PIP, DIP, tip | 9–12 | middle MCP, PIP, DIP, tip |
//! | 13–16 | ring MCP, PIP, DIP, tip | 17–20 | pinky MCP, PIP, DIP, tip |
//!
//! ## Recordings
//!
//! A [`Recording`] is a JSON-lines stream of [`HandFrame`]s, one frame per
//! line, as emitted by a detector process:
//!
//! ```text
//! {"timestamp_ms":16.6,"hands":[{"handedness":"Right","score":0.97,"landmarks":[{"x":0.5,"y":0.8,"z":0.0}, …]}]}
//! ```

pub mod landmark;
pub mod recording;

pub use landmark::{
    Finger, Hand, HandFrame, HandLandmark, Handedness, Landmark, LandmarkError,
    HAND_CONNECTIONS, LANDMARK_COUNT,
};
pub use recording::{Recording, RecordingError};
