//! Top-level application state.
//!
//! `AppState` owns the current instrument, the gesture evaluator, the
//! trigger state machine, the sample store, and the optional MIDI mirror.
//! It is driven by the frame loop (hands in, notes out) and by [`UiEvent`]s
//! from the window.  [`run`] wires everything together for `main`.

use std::sync::mpsc;
use std::time::Duration;

use air_gesture::{
    FingerStates, GestureEvaluator, GestureThresholds, Instrument, MultiHandPolicy, PlayAction,
    TriggerStateMachine,
};
use air_samples::{AudioOutput, CpalOutput, LoadReport, NullOutput, SampleStore};
use anyhow::{bail, Context};
use hand_landmarks::{Hand, Recording};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::camera::{FrameSource, HandDetector};
use crate::config::AppConfig;
use crate::frame_loop::{FrameLoop, NullRenderer, Renderer};
use crate::midi::MidiMirror;
use crate::replay;
use crate::sim::{ClockCamera, SimInput};
#[cfg(not(feature = "leap"))]
use crate::sim::SimDetector;
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// UiEvent / Theme
// ════════════════════════════════════════════════════════════════════════════

/// Input from the UI controls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    SelectInstrument(Instrument),
    NextInstrument,
    /// Cosmetic only.
    ToggleTheme,
    Quit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Dark  => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── gesture → note ───────────────────────────────────────────────────
    instrument: Instrument,
    evaluator:  GestureEvaluator,
    triggers:   TriggerStateMachine,
    policy:     MultiHandPolicy,
    max_hands:  usize,
    /// Hands the detector is less sure of than this are dropped.
    min_score:  f32,
    /// Hands evaluated in the last processed frame, after the score filter
    /// and the `max_hands` cap.
    tracked:    Vec<Hand>,
    /// Evaluator output per hand, parallel to `tracked`.
    pressed:    Vec<FingerStates>,

    // ── sound ────────────────────────────────────────────────────────────
    store:      SampleStore,
    midi:       Option<MidiMirror>,

    // ── cosmetic ─────────────────────────────────────────────────────────
    theme:      Theme,
    status:     String,
}

impl AppState {
    /// Build the state and start loading the configured instrument's sounds.
    pub fn new(cfg: &AppConfig, store: SampleStore, midi: Option<MidiMirror>) -> Self {
        let mut app = AppState {
            instrument: cfg.instrument,
            evaluator:  GestureEvaluator::new(cfg.thresholds.clone()),
            triggers:   TriggerStateMachine::new(cfg.instrument),
            policy:     cfg.multi_hand,
            max_hands:  cfg.max_hands,
            min_score:  cfg.min_hand_score,
            tracked:    Vec::new(),
            pressed:    Vec::new(),
            store,
            midi,
            theme:      cfg.theme,
            status:     String::new(),
        };
        let n = app.store.load(app.instrument);
        app.status = format!("{}: loading {} sounds", app.instrument, n);
        app
    }

    // ── UI ───────────────────────────────────────────────────────────────

    /// Apply one UI event.  Returns false when the app should quit.
    pub fn handle_ui(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::SelectInstrument(i) => self.select_instrument(i),
            UiEvent::NextInstrument      => self.select_instrument(self.instrument.next()),
            UiEvent::ToggleTheme => {
                self.theme = self.theme.toggled();
                debug!(theme = ?self.theme, "theme toggled");
            }
            UiEvent::Quit => return false,
        }
        true
    }

    /// Switch instrument: every finger drops to released and the new
    /// instrument's sounds are reloaded.  Nothing plays as part of the switch.
    pub fn select_instrument(&mut self, instrument: Instrument) {
        info!(from = %self.instrument, to = %instrument, "instrument selected");
        self.instrument = instrument;
        self.triggers.switch_instrument(instrument);
        self.tracked.clear();
        self.pressed.clear();
        let n = self.store.load(instrument);
        self.status = format!("{}: loading {} sounds", instrument, n);
    }

    // ── per frame ────────────────────────────────────────────────────────

    /// Evaluate and trigger every confident detected hand (up to
    /// `max_hands`), play the resulting notes, and return them.
    pub fn process_hands(&mut self, hands: &[Hand]) -> Vec<PlayAction> {
        let min_score = self.min_score;
        let mut confident: Vec<Hand> = hands.iter()
            .filter(|h| {
                let keep = h.score >= min_score;
                if !keep {
                    debug!(score = h.score, min = min_score, "low-confidence hand dropped");
                }
                keep
            })
            .cloned()
            .collect();
        if confident.len() > self.max_hands {
            debug!(detected = confident.len(), max = self.max_hands, "extra hands ignored");
            confident.truncate(self.max_hands);
        }
        self.tracked = confident;
        self.pressed.clear();
        let mut actions = Vec::new();

        for (idx, hand) in self.tracked.iter().enumerate() {
            let key    = self.policy.key_for(hand, idx);
            let states = self.evaluator.evaluate(hand, self.instrument);
            actions.extend(self.triggers.update(key, &states));
            self.pressed.push(states);
        }

        for action in &actions {
            debug!(instrument = %action.instrument, note = action.note, slot = action.slot, "play");
            self.store.play(action.instrument, action.note);
            if let Some(midi) = &self.midi {
                midi.send(action);
            }
        }
        if let Some(last) = actions.last() {
            self.status = format!("{}: {}", self.instrument, last.note);
        }
        actions
    }

    /// Apply finished sample loads; a failure shows up in the status line.
    pub fn pump_samples(&mut self) -> Vec<LoadReport> {
        let reports = self.store.pump();
        self.note_reports(&reports);
        reports
    }

    /// Block until the current loads resolve (used before headless runs).
    pub fn wait_for_samples(&mut self, timeout: Duration) -> Vec<LoadReport> {
        let reports = self.store.wait_idle(timeout);
        self.note_reports(&reports);
        reports
    }

    fn note_reports(&mut self, reports: &[LoadReport]) {
        if let Some(LoadReport::Failed { note, error, .. }) = reports.iter().rev().find(|r| r.is_failure()) {
            self.status = format!("failed to load {}: {}", note, error);
        } else if !reports.is_empty() && self.store.pending() == 0 {
            self.status = format!(
                "{}: {} of {} sounds ready",
                self.instrument,
                self.store.loaded_count(self.instrument),
                self.instrument.slot_count(),
            );
        }
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn instrument(&self)  -> Instrument          { self.instrument }
    pub fn thresholds(&self)  -> &GestureThresholds  { self.evaluator.thresholds() }
    pub fn tracked(&self)     -> &[Hand]             { &self.tracked }
    pub fn pressed(&self)     -> &[FingerStates]     { &self.pressed }
    pub fn triggers(&self)    -> &TriggerStateMachine { &self.triggers }
    pub fn store(&self)       -> &SampleStore        { &self.store }
    pub fn theme(&self)       -> Theme               { self.theme }
    pub fn status(&self)      -> &str                { &self.status }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// How long a headless replay waits for its sounds before starting.
const HEADLESS_LOAD_WAIT: Duration = Duration::from_secs(10);

/// Run the full application.
///
/// Picks the frame source (a replayed recording, LeapMotion hardware with
/// the `leap` feature, or the keyboard simulation), opens the audio device,
/// and drives the frame loop until the window closes or the replay ends.
pub fn run(cfg: AppConfig) -> anyhow::Result<()> {
    if cfg.headless && cfg.replay.is_none() {
        bail!("--headless needs --replay: there is no window to drive the simulated hand");
    }

    let output: Box<dyn AudioOutput> = match CpalOutput::open_default(cfg.max_voices) {
        Ok(out) => Box::new(out),
        Err(e) => {
            warn!("{}; continuing without sound", e);
            Box::new(NullOutput)
        }
    };
    let store = SampleStore::new(&cfg.sample_root, cfg.sounds.clone(), output);
    let midi  = cfg.midi.then(MidiMirror::spawn);
    let mut app = AppState::new(&cfg, store, midi);

    let (ui_tx, ui_rx) = mpsc::channel();
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();

    let (camera, detector): (Box<dyn FrameSource>, Box<dyn HandDetector>) = match &cfg.replay {
        Some(path) => {
            let recording = Recording::open(path)
                .with_context(|| format!("reading landmark recording {}", path.display()))?;
            info!(path = %path.display(), frames = recording.len(), "replaying recording");
            let (cam, det) = replay::split(recording);
            (Box::new(cam), Box::new(det))
        }
        None => live_sources(sim_rx)?,
    };

    let renderer: Box<dyn Renderer> = if cfg.headless {
        app.wait_for_samples(HEADLESS_LOAD_WAIT);
        Box::new(NullRenderer::default())
    } else {
        Box::new(Visualizer::new(ui_tx, sim_keys(&cfg, sim_tx)).context("opening visualizer window")?)
    };

    let mut frame_loop = FrameLoop::new(camera, detector, renderer, app, ui_rx);
    let interval = if cfg.fps == 0 { Duration::ZERO } else { Duration::from_secs(1) / cfg.fps };
    frame_loop.run(interval).context("camera unavailable; frame loop not started")?;
    Ok(())
}

/// The window's finger keys drive the simulated hand only when it is the
/// live source.
#[cfg(not(feature = "leap"))]
fn sim_keys(cfg: &AppConfig, tx: mpsc::Sender<SimInput>) -> Option<mpsc::Sender<SimInput>> {
    cfg.replay.is_none().then_some(tx)
}

#[cfg(feature = "leap")]
fn sim_keys(_cfg: &AppConfig, _tx: mpsc::Sender<SimInput>) -> Option<mpsc::Sender<SimInput>> {
    None
}

#[cfg(not(feature = "leap"))]
fn live_sources(
    sim_rx: mpsc::Receiver<SimInput>,
) -> anyhow::Result<(Box<dyn FrameSource>, Box<dyn HandDetector>)> {
    info!("keyboard simulation: hold 1-5 to curl fingers (build with --features leap for hardware)");
    Ok((Box::new(ClockCamera::new()), Box::new(SimDetector::new(sim_rx))))
}

#[cfg(feature = "leap")]
fn live_sources(
    _sim_rx: mpsc::Receiver<SimInput>,
) -> anyhow::Result<(Box<dyn FrameSource>, Box<dyn HandDetector>)> {
    let leap = crate::leap::LeapDetector::open().context("opening LeapMotion controller")?;
    info!("LeapMotion hardware");
    Ok((Box::new(ClockCamera::new()), Box::new(leap)))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
