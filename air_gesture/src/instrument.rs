//! The fixed instrument set and each instrument's note table.

use std::fmt;
use std::str::FromStr;

use hand_landmarks::Finger;
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Instrument
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    #[default]
    Piano,
    Synthesizer,
    Drums,
}

const PIANO_NOTES: [&str; 5] = ["piano_a", "piano_b", "piano_c", "piano_d", "piano_e"];
const SYNTH_NOTES: [&str; 1] = ["note"];
const DRUM_NOTES:  [&str; 5] = ["drum_a", "drum_b", "drum_c", "drum_d", "drum_e"];

const ALL_FINGERS: [Finger; 5] = Finger::ALL;
const INDEX_ONLY:  [Finger; 1] = [Finger::Index];

impl Instrument {
    pub const ALL: [Instrument; 3] = [Instrument::Piano, Instrument::Synthesizer, Instrument::Drums];

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Piano       => "piano",
            Instrument::Synthesizer => "synthesizer",
            Instrument::Drums       => "drums",
        }
    }

    /// Note identifiers in slot order.
    pub fn notes(self) -> &'static [&'static str] {
        match self {
            Instrument::Piano       => &PIANO_NOTES,
            Instrument::Synthesizer => &SYNTH_NOTES,
            Instrument::Drums       => &DRUM_NOTES,
        }
    }

    /// Fingers tracked by this instrument, in slot order.
    pub fn fingers(self) -> &'static [Finger] {
        match self {
            Instrument::Piano | Instrument::Drums => &ALL_FINGERS,
            Instrument::Synthesizer               => &INDEX_ONLY,
        }
    }

    pub fn slot_count(self) -> usize { self.notes().len() }

    pub fn note_for(self, slot: usize) -> Option<&'static str> {
        self.notes().get(slot).copied()
    }

    /// Cycle piano → synthesizer → drums → piano.
    pub fn next(self) -> Instrument {
        match self {
            Instrument::Piano       => Instrument::Synthesizer,
            Instrument::Synthesizer => Instrument::Drums,
            Instrument::Drums       => Instrument::Piano,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Parsing: the selection control emits plain names
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseInstrumentError(pub String);

impl fmt::Display for ParseInstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown instrument '{}' (expected piano, synthesizer, or drums)", self.0)
    }
}

impl std::error::Error for ParseInstrumentError {}

impl FromStr for Instrument {
    type Err = ParseInstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "piano"                => Ok(Instrument::Piano),
            "synthesizer" | "synth" => Ok(Instrument::Synthesizer),
            "drums" | "drum"       => Ok(Instrument::Drums),
            _ => Err(ParseInstrumentError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_counts() {
        assert_eq!(Instrument::Piano.slot_count(), 5);
        assert_eq!(Instrument::Drums.slot_count(), 5);
        assert_eq!(Instrument::Synthesizer.slot_count(), 1);
        for i in Instrument::ALL {
            assert_eq!(i.fingers().len(), i.slot_count());
        }
    }

    #[test]
    fn note_tables() {
        assert_eq!(Instrument::Piano.note_for(1), Some("piano_b"));
        assert_eq!(Instrument::Drums.note_for(2), Some("drum_c"));
        assert_eq!(Instrument::Synthesizer.note_for(0), Some("note"));
        assert_eq!(Instrument::Synthesizer.note_for(1), None);
        assert_eq!(Instrument::Synthesizer.fingers(), &[Finger::Index]);
    }

    #[test]
    fn parse_names() {
        assert_eq!("piano".parse::<Instrument>().unwrap(), Instrument::Piano);
        assert_eq!(" Drums ".parse::<Instrument>().unwrap(), Instrument::Drums);
        assert_eq!("SYNTHESIZER".parse::<Instrument>().unwrap(), Instrument::Synthesizer);
        let err = "kazoo".parse::<Instrument>().unwrap_err();
        assert!(err.to_string().contains("kazoo"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for i in Instrument::ALL {
            assert_eq!(i.to_string().parse::<Instrument>().unwrap(), i);
        }
    }

    #[test]
    fn next_cycles_all() {
        let mut i = Instrument::Piano;
        for _ in 0..3 { i = i.next(); }
        assert_eq!(i, Instrument::Piano);
    }
}
