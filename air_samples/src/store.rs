//! The per-(instrument, note) sample cache.
//!
//! `load` fans out one loader thread per note.  Each thread decodes its file
//! and sends the result back over an mpsc channel; nothing is written to the
//! cache until the owning thread calls [`SampleStore::pump`].  The cache is
//! therefore only ever touched from one thread and needs no lock.
//!
//! Reloading an instrument bumps its generation.  Results from a superseded
//! load are dropped when they arrive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use air_gesture::Instrument;
use tracing::{debug, error, info, warn};

use crate::buffer::{SampleBuffer, SampleError};
use crate::output::AudioOutput;
use crate::sound_set::SoundSet;

// ════════════════════════════════════════════════════════════════════════════
// LoadReport
// ════════════════════════════════════════════════════════════════════════════

/// The outcome of one note's load, as applied by [`SampleStore::pump`].
#[derive(Clone, Debug, PartialEq)]
pub enum LoadReport {
    Loaded { instrument: Instrument, note: String },
    Failed { instrument: Instrument, note: String, path: PathBuf, error: String },
}

impl LoadReport {
    pub fn is_failure(&self) -> bool { matches!(self, LoadReport::Failed { .. }) }

    pub fn note(&self) -> &str {
        match self {
            LoadReport::Loaded { note, .. } | LoadReport::Failed { note, .. } => note,
        }
    }
}

/// Sent from a loader thread back to the store.
struct LoadResult {
    instrument: Instrument,
    generation: u64,
    note:       String,
    path:       PathBuf,
    result:     Result<SampleBuffer, SampleError>,
}

// ════════════════════════════════════════════════════════════════════════════
// SampleStore
// ════════════════════════════════════════════════════════════════════════════

type NoteCache = HashMap<String, Arc<SampleBuffer>>;

pub struct SampleStore {
    root:       PathBuf,
    sounds:     SoundSet,
    cache:      HashMap<Instrument, NoteCache>,
    generation: HashMap<Instrument, u64>,
    /// Results sent but not yet received, stale ones included.
    in_flight:  usize,
    tx:         Sender<LoadResult>,
    rx:         Receiver<LoadResult>,
    output:     Box<dyn AudioOutput>,
}

impl SampleStore {
    /// `root` is joined onto every relative path in `sounds`.
    pub fn new<P: Into<PathBuf>>(root: P, sounds: SoundSet, output: Box<dyn AudioOutput>) -> Self {
        for instrument in Instrument::ALL {
            for note in sounds.unreachable_notes(instrument) {
                warn!(%instrument, note, "configured sound can never be triggered");
            }
        }
        let (tx, rx) = mpsc::channel();
        SampleStore {
            root: root.into(),
            sounds,
            cache: HashMap::new(),
            generation: HashMap::new(),
            in_flight: 0,
            tx,
            rx,
            output,
        }
    }

    /// Start loading every note of `instrument`.  The instrument's slot is
    /// emptied first; notes reappear as [`pump`](Self::pump) applies results.
    /// Returns the number of loads started.
    pub fn load(&mut self, instrument: Instrument) -> usize {
        self.cache.insert(instrument, HashMap::new());
        let generation = {
            let g = self.generation.entry(instrument).or_insert(0);
            *g += 1;
            *g
        };

        let entries = self.sounds.entries(instrument).to_vec();
        let count   = entries.len();
        info!(%instrument, notes = count, generation, "loading sounds");

        for entry in entries {
            let path = self.root.join(&entry.path);
            let tx   = self.tx.clone();
            let job  = (instrument, generation, entry.note.clone(), path.clone());

            let spawned = thread::Builder::new()
                .name(format!("load-{}-{}", instrument, entry.note))
                .spawn(move || {
                    let (instrument, generation, note, path) = job;
                    let result = SampleBuffer::decode_file(&path);
                    let _ = tx.send(LoadResult { instrument, generation, note, path, result });
                });

            if let Err(e) = spawned {
                // Report through the channel so pump() sees it like any other failure.
                let _ = self.tx.send(LoadResult {
                    instrument, generation, note: entry.note, path, result: Err(SampleError::Io(e)),
                });
            }
            self.in_flight += 1;
        }
        debug!(in_flight = self.in_flight, "sample loads outstanding");
        count
    }

    /// Apply every load result that has arrived.  Never blocks.
    pub fn pump(&mut self) -> Vec<LoadReport> {
        let mut reports = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if let Some(r) = self.apply(result) {
                reports.push(r);
            }
        }
        reports
    }

    /// Block until every outstanding load has resolved or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<LoadReport> {
        let deadline = Instant::now() + timeout;
        let mut reports = self.pump();

        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(result) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    reports.extend(self.apply(result));
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(in_flight = self.in_flight, "timed out waiting for sample loads");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        reports
    }

    fn apply(&mut self, r: LoadResult) -> Option<LoadReport> {
        let current = self.generation.get(&r.instrument).copied().unwrap_or(0);
        if r.generation != current {
            debug!(instrument = %r.instrument, note = %r.note, "discarding result of superseded load");
            return None;
        }

        match r.result {
            Ok(buffer) => {
                debug!(
                    instrument = %r.instrument, note = %r.note,
                    frames = buffer.frames(), sample_rate = buffer.sample_rate(),
                    "sample loaded"
                );
                self.cache.entry(r.instrument).or_default().insert(r.note.clone(), Arc::new(buffer));
                Some(LoadReport::Loaded { instrument: r.instrument, note: r.note })
            }
            Err(e) => {
                error!(
                    instrument = %r.instrument, note = %r.note,
                    path = %r.path.display(), error = %e,
                    "failed to load sample"
                );
                Some(LoadReport::Failed {
                    instrument: r.instrument,
                    note:       r.note,
                    path:       r.path,
                    error:      e.to_string(),
                })
            }
        }
    }

    /// Loads sent but not yet applied or discarded.
    pub fn pending(&self) -> usize { self.in_flight }

    pub fn is_loaded(&self, instrument: Instrument, note: &str) -> bool {
        self.get(instrument, note).is_some()
    }

    pub fn loaded_count(&self, instrument: Instrument) -> usize {
        self.cache.get(&instrument).map_or(0, HashMap::len)
    }

    pub fn get(&self, instrument: Instrument, note: &str) -> Option<Arc<SampleBuffer>> {
        self.cache.get(&instrument)?.get(note).cloned()
    }

    /// Put an already-decoded buffer in the cache.
    pub fn insert(&mut self, instrument: Instrument, note: &str, buffer: SampleBuffer) {
        self.cache.entry(instrument).or_default().insert(note.to_string(), Arc::new(buffer));
    }

    /// Fire-and-forget playback.  A note that is not loaded (missing, failed,
    /// or still in flight) is skipped with a warning.
    pub fn play(&mut self, instrument: Instrument, note: &str) {
        match self.get(instrument, note) {
            Some(buffer) => self.output.start(buffer),
            None => warn!(%instrument, note, "sound not loaded; skipping playback"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
