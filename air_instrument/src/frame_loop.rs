//! The per-frame driver.
//!
//! One [`FrameLoop::step`]:
//!
//! 1. poll the renderer's window input and drain queued [`UiEvent`]s
//! 2. apply finished sample loads
//! 3. take the camera's latest frame, skipping it if its timestamp has not
//!    advanced past the last processed one
//! 4. detect hands (synchronously), then evaluate, trigger, and play
//! 5. render
//!
//! A detector failure is logged and the frame is drawn without hand
//! annotations; the loop carries on.  [`FrameLoop::run`] repeats `step` at a
//! fixed interval until the camera stops or a [`StopHandle`] fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use air_gesture::{FingerStates, GestureThresholds, Instrument, PlayAction};
use hand_landmarks::Hand;
use tracing::{debug, info, trace, warn};

use crate::app::{AppState, Theme, UiEvent};
use crate::camera::{FrameSource, HandDetector, SourceError, VideoFrame};

// ════════════════════════════════════════════════════════════════════════════
// StopHandle
// ════════════════════════════════════════════════════════════════════════════

/// Tears down a running loop from anywhere.  Clones share one flag.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn is_stopped(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

// ════════════════════════════════════════════════════════════════════════════
// Rendering seam
// ════════════════════════════════════════════════════════════════════════════

/// Everything a renderer may draw for one frame.
pub struct FrameView<'a> {
    pub frame:      &'a VideoFrame,
    /// `None` when detection failed: draw the frame without annotations.
    pub hands:      Option<&'a [Hand]>,
    /// Evaluator output per hand, parallel to `hands`.
    pub pressed:    &'a [FingerStates],
    pub instrument: Instrument,
    pub thresholds: &'a GestureThresholds,
    pub theme:      Theme,
    pub status:     &'a str,
}

pub trait Renderer {
    /// Poll window input.  Returns false once the window is gone.
    fn poll_input(&mut self) -> bool { true }

    fn render(&mut self, view: &FrameView<'_>);
}

/// Draws nothing.  Used for `--headless` runs and tests.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, _view: &FrameView<'_>) {
        self.frames += 1;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// StepOutcome / LoopStats
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// A new frame went through detection; `played` lists the notes fired.
    Processed { hands: usize, played: Vec<PlayAction> },
    /// Timestamp had not advanced; nothing evaluated.
    Duplicate,
    /// The camera has not produced a frame yet.
    NoFrame,
    /// Detection failed; the frame was rendered without annotations.
    DetectFailed,
    /// The camera session ended.
    Ended,
    /// Quit was requested.
    Stopped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub processed:       u64,
    pub duplicates:      u64,
    pub detect_failures: u64,
    pub notes_played:    u64,
}

// ════════════════════════════════════════════════════════════════════════════
// FrameLoop
// ════════════════════════════════════════════════════════════════════════════

pub struct FrameLoop {
    camera:   Box<dyn FrameSource>,
    detector: Box<dyn HandDetector>,
    renderer: Box<dyn Renderer>,
    app:      AppState,
    ui_rx:    Receiver<UiEvent>,
    stop:     StopHandle,
    last_ts:  Option<Duration>,
    stats:    LoopStats,
}

impl FrameLoop {
    pub fn new(
        camera:   Box<dyn FrameSource>,
        detector: Box<dyn HandDetector>,
        renderer: Box<dyn Renderer>,
        app:      AppState,
        ui_rx:    Receiver<UiEvent>,
    ) -> Self {
        FrameLoop {
            camera, detector, renderer, app, ui_rx,
            stop:    StopHandle::default(),
            last_ts: None,
            stats:   LoopStats::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle { self.stop.clone() }

    pub fn app(&self) -> &AppState { &self.app }

    pub fn app_mut(&mut self) -> &mut AppState { &mut self.app }

    pub fn stats(&self) -> LoopStats { self.stats }

    /// Open the camera.  The loop must not step until this succeeds.
    pub fn start(&mut self) -> Result<(), SourceError> {
        self.camera.open()?;
        info!(instrument = %self.app.instrument(), "camera session started");
        Ok(())
    }

    /// Open the camera and step every `interval` until the session ends or
    /// the stop handle fires.  A zero interval runs unthrottled.
    pub fn run(&mut self, interval: Duration) -> Result<LoopStats, SourceError> {
        self.start()?;
        loop {
            let began = Instant::now();
            match self.step() {
                StepOutcome::Ended | StepOutcome::Stopped => break,
                _ => {}
            }
            if let Some(rest) = interval.checked_sub(began.elapsed()) {
                thread::sleep(rest);
            }
        }
        info!(
            processed = self.stats.processed,
            duplicates = self.stats.duplicates,
            detect_failures = self.stats.detect_failures,
            notes_played = self.stats.notes_played,
            "frame loop finished"
        );
        Ok(self.stats)
    }

    /// Run one iteration.
    pub fn step(&mut self) -> StepOutcome {
        if self.stop.is_stopped() || !self.renderer.poll_input() {
            return StepOutcome::Stopped;
        }
        loop {
            match self.ui_rx.try_recv() {
                Ok(ev) => {
                    if !self.app.handle_ui(ev) {
                        self.stop.stop();
                        return StepOutcome::Stopped;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        self.app.pump_samples();

        if !self.camera.is_active() {
            debug!("camera inactive; ending loop");
            return StepOutcome::Ended;
        }
        let frame = match self.camera.latest_frame() {
            Some(f) => f,
            None    => return StepOutcome::NoFrame,
        };
        if self.last_ts.is_some_and(|last| frame.timestamp <= last) {
            trace!(timestamp = ?frame.timestamp, "frame not advanced; skipped");
            self.stats.duplicates += 1;
            return StepOutcome::Duplicate;
        }
        self.last_ts = Some(frame.timestamp);

        match self.detector.detect(&frame) {
            Ok(hands) => {
                let played = self.app.process_hands(&hands);
                self.stats.processed    += 1;
                self.stats.notes_played += played.len() as u64;
                self.render(&frame, true);
                StepOutcome::Processed { hands: self.app.tracked().len(), played }
            }
            Err(e) => {
                warn!(timestamp = ?frame.timestamp, error = %e, "hand detection failed; drawing frame without annotations");
                self.stats.detect_failures += 1;
                self.render(&frame, false);
                StepOutcome::DetectFailed
            }
        }
    }

    /// Draw `frame`, annotated with the hands the app just evaluated when
    /// detection succeeded.
    fn render(&mut self, frame: &VideoFrame, detected: bool) {
        let app = &self.app;
        let (hands, pressed): (Option<&[Hand]>, &[FingerStates]) = if detected {
            (Some(app.tracked()), app.pressed())
        } else {
            (None, &[])
        };
        let view = FrameView {
            frame,
            hands,
            pressed,
            instrument: app.instrument(),
            thresholds: app.thresholds(),
            theme:      app.theme(),
            status:     app.status(),
        };
        self.renderer.render(&view);
    }
}
