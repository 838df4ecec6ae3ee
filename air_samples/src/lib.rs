//! # air_samples
//!
//! The sample store behind an air instrument: one decoded buffer per
//! (instrument, note), loaded from disk on demand and played without
//! blocking the caller.
//!
//! * [`SampleBuffer`]: decoded audio, immutable once loaded.
//! * [`SoundSet`]: which file backs which note.
//! * [`SampleStore`]: concurrent per-note loading, the cache, and `play`.
//! * [`AudioOutput`]: where playback goes: [`CpalOutput`] for the default
//!   device, [`NullOutput`] when there is none.
//!
//! Nothing here is fatal.  A note that fails to load leaves its slot empty
//! and the others keep loading; playing an empty slot logs a warning and
//! does nothing.

pub mod buffer;
pub mod sound_set;
pub mod store;
pub mod output;

pub use buffer::{SampleBuffer, SampleError};
pub use sound_set::{SoundEntry, SoundSet};
pub use store::{LoadReport, SampleStore};
pub use output::{AudioOutput, CpalOutput, NullOutput, OutputError};
