//! JSON-lines landmark recordings.
//!
//! One [`HandFrame`] per line.  Blank lines and lines starting with `#` are
//! skipped so recordings can be annotated by hand.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::landmark::HandFrame;

#[derive(Debug)]
pub enum RecordingError {
    Io(io::Error),
    /// `line` is 1-based.
    Parse { line: usize, source: serde_json::Error },
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::Io(e) => write!(f, "recording I/O error: {}", e),
            RecordingError::Parse { line, source } => {
                write!(f, "recording line {}: {}", line, source)
            }
        }
    }
}

impl std::error::Error for RecordingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordingError::Io(e) => Some(e),
            RecordingError::Parse { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for RecordingError {
    fn from(e: io::Error) -> Self { RecordingError::Io(e) }
}

/// An in-memory sequence of detector frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    frames: Vec<HandFrame>,
}

impl Recording {
    pub fn new(frames: Vec<HandFrame>) -> Self {
        Recording { frames }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecordingError> {
        let path = path.as_ref();
        let rec = Self::from_reader(BufReader::new(File::open(path)?))?;
        debug!(path = %path.display(), frames = rec.len(), "recording loaded");
        Ok(rec)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, RecordingError> {
        let mut frames: Vec<HandFrame> = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') { continue; }

            let frame: HandFrame = serde_json::from_str(trimmed)
                .map_err(|source| RecordingError::Parse { line: i + 1, source })?;

            if let Some(prev) = frames.last() {
                if frame.timestamp < prev.timestamp {
                    warn!(
                        line = i + 1,
                        "timestamp goes backwards ({:?} < {:?})",
                        frame.timestamp, prev.timestamp
                    );
                }
            }
            frames.push(frame);
        }
        Ok(Recording { frames })
    }

    pub fn parse_str(text: &str) -> Result<Self, RecordingError> {
        Self::from_reader(text.as_bytes())
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for frame in &self.frames {
            serde_json::to_writer(&mut out, frame)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn push(&mut self, frame: HandFrame) { self.frames.push(frame); }

    pub fn frames(&self) -> &[HandFrame] { &self.frames }

    pub fn into_frames(self) -> Vec<HandFrame> { self.frames }

    pub fn len(&self) -> usize { self.frames.len() }

    pub fn is_empty(&self) -> bool { self.frames.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Hand, Handedness, Landmark, LANDMARK_COUNT};
    use std::time::Duration;

    fn hand(y: f32) -> Hand {
        Hand::new([Landmark::xy(0.5, y); LANDMARK_COUNT]).with_handedness(Handedness::Left)
    }

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let text = "# captured at 30fps\n\n{\"timestamp_ms\":0}\n   \n{\"timestamp_ms\":33.3}\n";
        let rec = Recording::parse_str(text).unwrap();
        assert_eq!(rec.len(), 2);
        assert!(rec.frames()[0].hands.is_empty());
    }

    #[test]
    fn parse_error_reports_line() {
        let text = "{\"timestamp_ms\":0}\n# note\nnot json\n";
        match Recording::parse_str(text) {
            Err(RecordingError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn bad_landmark_count_is_parse_error() {
        let text = r#"{"timestamp_ms":0,"hands":[{"landmarks":[{"x":0,"y":0}]}]}"#;
        let err = Recording::parse_str(text).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn write_then_open_from_disk() {
        let mut rec = Recording::default();
        rec.push(HandFrame::new(Duration::from_millis(0),  vec![hand(0.5)]));
        rec.push(HandFrame::new(Duration::from_millis(16), vec![hand(0.65), hand(0.2)]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.jsonl");
        rec.write_to(File::create(&path).unwrap()).unwrap();

        let back = Recording::open(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.frames()[1].hands.len(), 2);
        assert_eq!(back.frames()[1].timestamp, Duration::from_millis(16));
        assert_eq!(back.frames()[0].hands[0].handedness, Some(Handedness::Left));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Recording::open(dir.path().join("absent.jsonl")).unwrap_err();
        assert!(matches!(err, RecordingError::Io(_)));
    }
}
