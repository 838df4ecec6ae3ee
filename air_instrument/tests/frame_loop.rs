//! End-to-end frame loop behaviour with scripted sources.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use air_gesture::Instrument;
use air_instrument::app::{run, AppState, UiEvent};
use air_instrument::camera::{DetectError, FrameSource, HandDetector, SourceError, VideoFrame};
use air_instrument::config::AppConfig;
use air_instrument::frame_loop::{FrameLoop, FrameView, NullRenderer, Renderer, StepOutcome};
use air_instrument::replay;
use air_instrument::sim::ClockCamera;
use air_samples::{AudioOutput, NullOutput, SampleBuffer, SampleStore, SoundEntry, SoundSet};
use hand_landmarks::{Hand, HandFrame, HandLandmark, Landmark, Recording, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// Scripted sources
// ════════════════════════════════════════════════════════════════════════════

struct ScriptedCamera {
    frames:    VecDeque<Duration>,
    opened:    bool,
    fail_open: bool,
}

impl ScriptedCamera {
    fn new(ms: &[u64]) -> Self {
        ScriptedCamera {
            frames:    ms.iter().map(|&m| Duration::from_millis(m)).collect(),
            opened:    false,
            fail_open: false,
        }
    }
}

impl FrameSource for ScriptedCamera {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.fail_open {
            return Err(SourceError::Unavailable("permission denied".into()));
        }
        self.opened = true;
        Ok(())
    }

    fn is_active(&self) -> bool { self.opened && !self.frames.is_empty() }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        self.frames.pop_front().map(VideoFrame::at)
    }
}

/// Answers from a script (empty hands once it runs out) and counts calls.
struct ScriptedDetector {
    script: VecDeque<Result<Vec<Hand>, DetectError>>,
    calls:  Rc<Cell<usize>>,
}

impl ScriptedDetector {
    fn new(script: Vec<Result<Vec<Hand>, DetectError>>) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (ScriptedDetector { script: script.into(), calls: calls.clone() }, calls)
    }
}

impl HandDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Hand>, DetectError> {
        self.calls.set(self.calls.get() + 1);
        self.script.pop_front().unwrap_or(Ok(Vec::new()))
    }
}

/// Logs whether each rendered frame carried hand annotations.
#[derive(Clone, Default)]
struct AnnotationLog(Rc<RefCell<Vec<bool>>>);

impl Renderer for AnnotationLog {
    fn render(&mut self, view: &FrameView<'_>) {
        self.0.borrow_mut().push(view.hands.is_some());
    }
}

/// Logs how many hands each rendered frame drew.
#[derive(Clone, Default)]
struct DrawnHands(Rc<RefCell<Vec<usize>>>);

impl Renderer for DrawnHands {
    fn render(&mut self, view: &FrameView<'_>) {
        self.0.borrow_mut().push(view.hands.map_or(0, <[Hand]>::len));
    }
}

/// Records the frame count of every buffer played.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<usize>>>);

impl AudioOutput for Recorder {
    fn start(&mut self, buffer: Arc<SampleBuffer>) {
        self.0.lock().push(buffer.frames());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

fn index_at(y: f32) -> Hand {
    let mut hand = Hand::new([Landmark::xy(0.5, 0.3); LANDMARK_COUNT]);
    hand.set(HandLandmark::IndexTip, Landmark::xy(0.5, y));
    hand
}

fn silent_app(cfg: &AppConfig) -> AppState {
    let missing = std::env::temp_dir().join("air_instrument_loop_tests_missing");
    AppState::new(cfg, SampleStore::new(missing, SoundSet::default(), Box::new(NullOutput)), None)
}

fn frame_loop(
    camera:   ScriptedCamera,
    detector: ScriptedDetector,
    renderer: Box<dyn Renderer>,
    app:      AppState,
) -> (FrameLoop, Sender<UiEvent>) {
    let (ui_tx, ui_rx) = mpsc::channel();
    (FrameLoop::new(Box::new(camera), Box::new(detector), renderer, app, ui_rx), ui_tx)
}

fn write_wav(path: &Path, frames: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        w.write_sample(((i % 40) as i16 - 20) * 200).unwrap();
    }
    w.finalize().unwrap();
}

/// A piano kit in `dir`; note `i` is `100 * (i + 1)` frames long.
fn piano_kit(dir: &Path) -> SoundSet {
    let mut entries = Vec::new();
    for (i, note) in Instrument::Piano.notes().iter().enumerate() {
        let file = format!("{}.wav", note);
        write_wav(&dir.join(&file), 100 * (i + 1));
        entries.push(SoundEntry::new(note, &file));
    }
    let mut set = SoundSet::empty();
    set.set(Instrument::Piano, entries);
    set
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn repeated_timestamp_skips_detection() {
    let (detector, calls) = ScriptedDetector::new(vec![]);
    let (mut fl, _ui) = frame_loop(
        ScriptedCamera::new(&[0, 10, 10, 20]),
        detector,
        Box::new(NullRenderer::default()),
        silent_app(&AppConfig::default()),
    );
    fl.start().unwrap();

    let outcomes: Vec<_> = (0..5).map(|_| fl.step()).collect();
    assert!(matches!(outcomes[0], StepOutcome::Processed { .. }));
    assert!(matches!(outcomes[1], StepOutcome::Processed { .. }));
    assert_eq!(outcomes[2], StepOutcome::Duplicate);
    assert!(matches!(outcomes[3], StepOutcome::Processed { .. }));
    assert_eq!(outcomes[4], StepOutcome::Ended);

    assert_eq!(calls.get(), 3);
    assert_eq!(fl.stats().duplicates, 1);
    assert_eq!(fl.stats().processed, 3);
}

#[test]
fn piano_dip_plays_once_per_press() {
    let dir  = tempfile::tempdir().unwrap();
    let rec  = Recorder::default();
    let cfg  = AppConfig::default();
    let store = SampleStore::new(dir.path(), piano_kit(dir.path()), Box::new(rec.clone()));
    let mut app = AppState::new(&cfg, store, None);
    let reports = app.wait_for_samples(Duration::from_secs(10));
    assert!(reports.iter().all(|r| !r.is_failure()));

    let ys = [0.3, 0.65, 0.65, 0.65, 0.3, 0.65];
    let (detector, _) = ScriptedDetector::new(ys.iter().map(|&y| Ok(vec![index_at(y)])).collect());
    let (mut fl, _ui) = frame_loop(
        ScriptedCamera::new(&[0, 16, 33, 50, 66, 83]),
        detector,
        Box::new(NullRenderer::default()),
        app,
    );
    let stats = fl.run(Duration::ZERO).unwrap();

    assert_eq!(stats.processed, 6);
    assert_eq!(stats.notes_played, 2);
    // piano_b is the 200-frame sample.
    assert_eq!(*rec.0.lock(), vec![200, 200]);
    assert_eq!(fl.app().status(), "piano: piano_b");
}

#[test]
fn detection_failure_draws_bare_frame_and_continues() {
    let (detector, calls) = ScriptedDetector::new(vec![
        Ok(vec![index_at(0.3)]),
        Err(DetectError::Backend("model crashed".into())),
        Ok(vec![index_at(0.65)]),
    ]);
    let log = AnnotationLog::default();
    let (mut fl, _ui) = frame_loop(
        ScriptedCamera::new(&[0, 16, 33]),
        detector,
        Box::new(log.clone()),
        silent_app(&AppConfig::default()),
    );
    fl.start().unwrap();

    assert!(matches!(fl.step(), StepOutcome::Processed { .. }));
    assert_eq!(fl.step(), StepOutcome::DetectFailed);
    match fl.step() {
        StepOutcome::Processed { hands, played } => {
            assert_eq!(hands, 1);
            assert_eq!(played.len(), 1);
            assert_eq!(played[0].note, "piano_b");
        }
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(calls.get(), 3);
    assert_eq!(*log.0.borrow(), vec![true, false, true]);
    assert_eq!(fl.stats().detect_failures, 1);
}

#[test]
fn low_confidence_hand_is_neither_played_nor_drawn() {
    let faint = index_at(0.65).with_score(0.05);
    let sure  = index_at(0.65).with_score(0.9);
    let (detector, _) = ScriptedDetector::new(vec![
        Ok(vec![faint.clone()]),
        Ok(vec![faint, sure]),
    ]);
    let drawn = DrawnHands::default();
    let (mut fl, _ui) = frame_loop(
        ScriptedCamera::new(&[0, 16]),
        detector,
        Box::new(drawn.clone()),
        silent_app(&AppConfig::default()),
    );
    fl.start().unwrap();

    assert_eq!(fl.step(), StepOutcome::Processed { hands: 0, played: vec![] });
    match fl.step() {
        StepOutcome::Processed { hands, played } => {
            assert_eq!(hands, 1);
            assert_eq!(played.len(), 1);
            assert_eq!(played[0].note, "piano_b");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(*drawn.0.borrow(), vec![0, 1]);
}

#[test]
fn camera_failure_never_starts_the_loop() {
    let mut camera = ScriptedCamera::new(&[0, 16]);
    camera.fail_open = true;
    let (detector, calls) = ScriptedDetector::new(vec![]);
    let (mut fl, _ui) = frame_loop(
        camera,
        detector,
        Box::new(NullRenderer::default()),
        silent_app(&AppConfig::default()),
    );

    assert!(matches!(fl.run(Duration::ZERO), Err(SourceError::Unavailable(_))));
    assert_eq!(calls.get(), 0);
}

#[test]
fn instrument_switch_from_ui_resets_and_reloads() {
    let (detector, _) = ScriptedDetector::new(vec![
        Ok(vec![index_at(0.65)]),
        Ok(vec![index_at(0.65)]),
    ]);
    let (mut fl, ui) = frame_loop(
        ScriptedCamera::new(&[0, 16, 33]),
        detector,
        Box::new(NullRenderer::default()),
        silent_app(&AppConfig::default()),
    );
    fl.start().unwrap();

    assert!(matches!(fl.step(), StepOutcome::Processed { ref played, .. } if played.len() == 1));

    ui.send(UiEvent::SelectInstrument(Instrument::Drums)).unwrap();
    let outcome = fl.step();
    assert_eq!(fl.app().instrument(), Instrument::Drums);
    // Index dipped 0.35 below its PIP on a drum kit: a fresh press.
    match outcome {
        StepOutcome::Processed { played, .. } => assert_eq!(played[0].instrument, Instrument::Drums),
        other => panic!("unexpected {:?}", other),
    }

    ui.send(UiEvent::Quit).unwrap();
    assert_eq!(fl.step(), StepOutcome::Stopped);
    assert!(fl.stop_handle().is_stopped());
}

#[test]
fn stop_handle_ends_a_live_run() {
    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();
    let (detector, _) = ScriptedDetector::new(vec![]);
    let mut fl = FrameLoop::new(
        Box::new(ClockCamera::new()),
        Box::new(detector),
        Box::new(NullRenderer::default()),
        silent_app(&AppConfig::default()),
        ui_rx,
    );

    let stop = fl.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        stop.stop();
    });
    let stats = fl.run(Duration::from_millis(5)).unwrap();
    stopper.join().unwrap();
    drop(ui_tx);

    assert!(stats.processed > 0);
}

fn write_recording(path: &Path) {
    let ys = [0.3, 0.65, 0.3, 0.3, 0.65, 0.65];
    let ts = [0, 33, 33, 66, 100, 133];
    let frames = ys.iter().zip(ts).map(|(&y, t)| {
        HandFrame::new(Duration::from_millis(t), vec![index_at(y)])
    });
    Recording::new(frames.collect()).write_to(File::create(path).unwrap()).unwrap();
}

#[test]
fn replayed_recording_drives_the_loop() {
    let dir  = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_recording(&path);

    let (camera, detector) = replay::split(Recording::open(&path).unwrap());
    let (_ui_tx, ui_rx) = mpsc::channel();
    let mut fl = FrameLoop::new(
        Box::new(camera),
        Box::new(detector),
        Box::new(NullRenderer::default()),
        silent_app(&AppConfig::default()),
        ui_rx,
    );
    let stats = fl.run(Duration::ZERO).unwrap();

    // 33 appears twice and only the first counts; presses land at 33 and 100.
    assert_eq!(stats.processed, 5);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.notes_played, 2);
}

#[test]
fn headless_run_completes_a_replay() {
    let dir  = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_recording(&path);

    let cfg = AppConfig {
        headless:    true,
        replay:      Some(path),
        fps:         0,
        sample_root: dir.path().join("no-samples"),
        ..AppConfig::default()
    };
    run(cfg).unwrap();
}
