//! # air_gesture
//!
//! Turns one frame of hand landmarks into note triggers.
//!
//! Two stages run once per processed video frame, per detected hand:
//!
//! 1. [`GestureEvaluator`]: a stateless threshold test per tracked finger,
//!    yielding [`FingerStates`] (5 slots for piano and drums, 1 for the
//!    synthesizer).
//! 2. [`TriggerStateMachine`]: edge detection per finger: a
//!    [`PlayAction`] fires on the `Released → Pressed` transition only, and
//!    the finger must be seen not-pressing before it can fire again.
//!
//! ## Finger tests
//!
//! | Instrument | Slot | Pressing when |
//! |---|---|---|
//! | piano, drums | thumb | `tip.x < mcp.x − ε` (inward curl, ε = 0.02) |
//! | piano | index…pinky | `tip.y > row[i]` (rows 0.6, 0.6, 0.6, 0.55) |
//! | drums | index…pinky | `tip.y > pip.y + δ` (δ = 0.05) |
//! | synthesizer | index | `tip.y < pip.y − δ` (δ = 0.05) |
//!
//! The synthesizer comparison runs the opposite way to the drum curl test.
//! That is how the instrument has always behaved, so it is kept as is
//! rather than unified.

pub mod instrument;
pub mod evaluator;
pub mod trigger;

pub use instrument::{Instrument, ParseInstrumentError};
pub use evaluator::{FingerStates, GestureEvaluator, GestureThresholds};
pub use trigger::{HandKey, MultiHandPolicy, PlayAction, TriggerState, TriggerStateMachine};
