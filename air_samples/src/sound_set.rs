//! Which file backs which note.

use std::collections::BTreeMap;
use std::path::PathBuf;

use air_gesture::Instrument;
use serde::{Deserialize, Serialize};

/// One note's sample file, relative to the store's sample root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEntry {
    pub note: String,
    pub path: PathBuf,
}

impl SoundEntry {
    pub fn new(note: &str, path: &str) -> Self {
        SoundEntry { note: note.to_string(), path: PathBuf::from(path) }
    }
}

/// Per-instrument sound lists.
///
/// In TOML:
///
/// ```toml
/// [sounds]
/// drums = [
///     { note = "drum_a", path = "drums/kick.wav" },
///     { note = "drum_b", path = "drums/snare.wav" },
/// ]
/// ```
///
/// Instruments left out of a configured set fall back to the built-in
/// layout via [`SoundSet::with_defaults`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundSet {
    sets: BTreeMap<Instrument, Vec<SoundEntry>>,
}

impl Default for SoundSet {
    fn default() -> Self {
        let mut sets = BTreeMap::new();
        sets.insert(Instrument::Piano, vec![
            SoundEntry::new("piano_a", "piano/piano-a.wav"),
            SoundEntry::new("piano_b", "piano/piano-b.wav"),
            SoundEntry::new("piano_c", "piano/piano-c.wav"),
            SoundEntry::new("piano_d", "piano/piano-d.wav"),
            SoundEntry::new("piano_e", "piano/piano-e.wav"),
        ]);
        sets.insert(Instrument::Synthesizer, vec![
            SoundEntry::new("note", "synthesizer/note.wav"),
        ]);
        sets.insert(Instrument::Drums, vec![
            SoundEntry::new("drum_a", "drums/drum-a.mp3"),
            SoundEntry::new("drum_b", "drums/drum-b.mp3"),
            SoundEntry::new("drum_c", "drums/drum-c.mp3"),
            SoundEntry::new("drum_d", "drums/drum-d.mp3"),
            SoundEntry::new("drum_e", "drums/drum-e.mp3"),
        ]);
        SoundSet { sets }
    }
}

impl SoundSet {
    pub fn empty() -> Self {
        SoundSet { sets: BTreeMap::new() }
    }

    /// Fill in any instrument this set does not mention.
    pub fn with_defaults(mut self) -> Self {
        for (instrument, entries) in SoundSet::default().sets {
            self.sets.entry(instrument).or_insert(entries);
        }
        self
    }

    pub fn set(&mut self, instrument: Instrument, entries: Vec<SoundEntry>) {
        self.sets.insert(instrument, entries);
    }

    pub fn entries(&self, instrument: Instrument) -> &[SoundEntry] {
        self.sets.get(&instrument).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Notes in this set that `instrument` can never trigger.
    pub fn unreachable_notes(&self, instrument: Instrument) -> Vec<&str> {
        self.entries(instrument)
            .iter()
            .map(|e| e.note.as_str())
            .filter(|n| !instrument.notes().iter().any(|k| k == n))
            .collect()
    }
}
