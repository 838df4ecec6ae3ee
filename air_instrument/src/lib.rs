//! # air_instrument
//!
//! Play piano, synthesizer, or drums by moving your fingers in front of a
//! hand tracker.  Every processed frame runs detect → evaluate → trigger →
//! play → draw; a note sounds once per press and never repeats while the
//! finger is held.
//!
//! ## Gesture → note mapping
//!
//! | Instrument | Fingers | Press | Notes |
//! |---|---|---|---|
//! | Piano | thumb…pinky | fingertip dips below its row (thumb: curls inward) | `piano_a`…`piano_e` |
//! | Synthesizer | index | fingertip rises above its middle knuckle | `note` |
//! | Drums | thumb…pinky | fingertip folds below its middle knuckle (thumb: curls inward) | `drum_a`…`drum_e` |
//!
//! ## Feature flags
//!
//! * (default) **Simulation mode**: one posed hand, fingers curled from the
//!   keyboard.
//! * `leap` **Hardware mode**: hands tracked by a LeapMotion controller via
//!   LeapC.
//!
//! `--replay <file>` drives the loop from a recorded JSON-lines landmark
//! session instead; add `--headless` to run it without a window.
//!
//! ### Keys
//!
//! | Key | Action |
//! |---|---|
//! | `P` / `S` / `D` | Piano / synthesizer / drums |
//! | `Tab` | Next instrument |
//! | `T` | Light / dark theme |
//! | `1`–`5` held | Curl thumb…pinky (simulation) |
//! | `H` | Hide / show the simulated hand |
//! | `Q`, `Esc` | Quit |

pub mod app;
pub mod camera;
pub mod config;
pub mod frame_loop;
pub mod midi;
pub mod replay;
pub mod sim;
pub mod visualizer;
#[cfg(feature = "leap")]
pub mod leap;
