//! MIDI mirror of triggered notes.
//!
//! Every [`PlayAction`] can be echoed to a MIDI port as a short note, so an
//! external synth or DAW can follow (or record) the performance.  Output
//! runs on its own thread: the frame loop only sends a command.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use air_gesture::{Instrument, PlayAction};
use tracing::{debug, info, warn};

/// How long each mirrored note sounds before its note-off.
const NOTE_LENGTH: Duration = Duration::from_millis(250);
const VELOCITY:    u8       = 100;

// ════════════════════════════════════════════════════════════════════════════
// Note mapping
// ════════════════════════════════════════════════════════════════════════════

/// General MIDI voice per instrument: (channel, program).  Channel 9 is the
/// GM percussion channel (channel 10 one-based) and takes no program.
pub fn voice_for(instrument: Instrument) -> (u8, Option<u8>) {
    match instrument {
        Instrument::Piano       => (0, Some(0)),   // Acoustic Grand Piano
        Instrument::Synthesizer => (1, Some(80)),  // Lead 1 (square)
        Instrument::Drums       => (9, None),
    }
}

/// MIDI key for one slot of one instrument.
pub fn key_for(instrument: Instrument, slot: usize) -> Option<u8> {
    const PIANO: [u8; 5] = [60, 62, 64, 65, 67];       // C D E F G
    const SYNTH: [u8; 1] = [72];                       // C5
    const DRUMS: [u8; 5] = [36, 38, 42, 46, 49];       // kick, snare, closed hat, open hat, crash
    match instrument {
        Instrument::Piano       => PIANO.get(slot).copied(),
        Instrument::Synthesizer => SYNTH.get(slot).copied(),
        Instrument::Drums       => DRUMS.get(slot).copied(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiMessage: the three channel messages the mirror emits
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MidiMessage {
    ProgramChange { channel: u8, program: u8 },
    NoteOn        { channel: u8, key: u8 },
    NoteOff       { channel: u8, key: u8 },
}

impl MidiMessage {
    /// Wire bytes.  Channel and data bytes are masked into range.
    fn to_bytes(self) -> Vec<u8> {
        match self {
            MidiMessage::ProgramChange { channel, program } => vec![0xC0 | (channel & 0x0F), program & 0x7F],
            MidiMessage::NoteOn { channel, key }  => vec![0x90 | (channel & 0x0F), key & 0x7F, VELOCITY],
            MidiMessage::NoteOff { channel, key } => vec![0x80 | (channel & 0x0F), key & 0x7F, 0],
        }
    }
}

/// Anything that accepts raw MIDI bytes.  `None` means no port was opened.
type Sink = Option<Box<dyn FnMut(&[u8]) + Send>>;

fn emit(sink: &mut Sink, msg: MidiMessage) {
    if let Some(send) = sink {
        send(&msg.to_bytes());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Port selection
// ════════════════════════════════════════════════════════════════════════════

/// Substrings of port names that belong to software synthesizers.
const SYNTH_HINTS: [&str; 4] = ["fluid", "timidity", "microsoft", "synth"];

/// Index of the port to use: the first software synth, else the first port.
fn choose_port<S: AsRef<str>>(names: &[S]) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let synth = names.iter().position(|n| {
        let n = n.as_ref().to_lowercase();
        SYNTH_HINTS.iter().any(|h| n.contains(h))
    });
    Some(synth.unwrap_or(0))
}

/// Connect to the chosen output port; `None` (with a warning) when there is
/// nothing to connect to.
fn open_port() -> Sink {
    let out = match midir::MidiOutput::new("air_instrument") {
        Ok(m)  => m,
        Err(e) => {
            warn!("MIDI init error: {}; notes will not be mirrored", e);
            return None;
        }
    };
    let ports = out.ports();
    let names: Vec<String> = ports.iter()
        .map(|p| out.port_name(p).unwrap_or_default())
        .collect();
    let Some(idx) = choose_port(&names) else {
        warn!("no MIDI output ports found; notes will not be mirrored");
        return None;
    };

    match out.connect(&ports[idx], "air-instrument-out") {
        Ok(mut conn) => {
            info!(port = %names[idx], "mirroring notes to MIDI");
            Some(Box::new(move |bytes: &[u8]| {
                if let Err(e) = conn.send(bytes) {
                    debug!("MIDI send failed: {}", e);
                }
            }))
        }
        Err(e) => {
            warn!(port = %names[idx], "MIDI connect failed: {}; notes will not be mirrored", e);
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiMirror: handle to the output thread
// ════════════════════════════════════════════════════════════════════════════

enum MidiCommand {
    Note { channel: u8, key: u8 },
    Quit,
}

pub struct MidiMirror {
    cmd_tx: Sender<MidiCommand>,
}

impl MidiMirror {
    /// Spawn the output thread on the first available port.
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("midi-mirror".into())
            .spawn(move || mirror_thread(open_port(), cmd_rx));
        if let Err(e) = spawned {
            warn!("could not start MIDI thread: {}; notes will not be mirrored", e);
        }
        MidiMirror { cmd_tx }
    }

    pub fn send(&self, action: &PlayAction) {
        let (channel, _) = voice_for(action.instrument);
        if let Some(key) = key_for(action.instrument, action.slot) {
            let _ = self.cmd_tx.send(MidiCommand::Note { channel, key });
        }
    }
}

impl Drop for MidiMirror {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(MidiCommand::Quit);
    }
}

fn mirror_thread(mut sink: Sink, cmd_rx: Receiver<MidiCommand>) {
    for instrument in Instrument::ALL {
        if let (channel, Some(program)) = voice_for(instrument) {
            emit(&mut sink, MidiMessage::ProgramChange { channel, program });
        }
    }

    // (due, channel, key)
    let mut sounding: Vec<(Instant, u8, u8)> = Vec::new();
    loop {
        let wait = sounding.iter()
            .map(|(due, _, _)| due.saturating_duration_since(Instant::now()))
            .min()
            .unwrap_or(Duration::from_millis(100));

        match cmd_rx.recv_timeout(wait) {
            Ok(MidiCommand::Note { channel, key }) => {
                // Retrigger: end any earlier instance of the same key first.
                if let Some(i) = sounding.iter().position(|&(_, c, k)| c == channel && k == key) {
                    sounding.swap_remove(i);
                    emit(&mut sink, MidiMessage::NoteOff { channel, key });
                }
                emit(&mut sink, MidiMessage::NoteOn { channel, key });
                sounding.push((Instant::now() + NOTE_LENGTH, channel, key));
            }
            Ok(MidiCommand::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        let (due, rest): (Vec<_>, Vec<_>) = sounding.into_iter().partition(|&(d, _, _)| d <= now);
        for (_, channel, key) in due {
            emit(&mut sink, MidiMessage::NoteOff { channel, key });
        }
        sounding = rest;
    }

    for (_, channel, key) in sounding {
        emit(&mut sink, MidiMessage::NoteOff { channel, key });
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
