//! Configuration: an optional TOML file, then command-line overrides.
//!
//! ```toml
//! instrument  = "drums"
//! sample_root = "static/audio"
//! multi_hand  = "per-hand"
//! min_hand_score = 0.5
//! fps         = 60
//!
//! [thresholds]
//! drum_curl_y = 0.06
//!
//! [sounds]
//! drums = [ { note = "drum_a", path = "drums/kick.wav" } ]
//! ```
//!
//! Every key is optional; anything left out keeps its default.

use std::fs;
use std::path::{Path, PathBuf};

use air_gesture::{GestureThresholds, Instrument, MultiHandPolicy};
use air_samples::SoundSet;
use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::Theme;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub instrument:      Instrument,
    /// Sample paths in `sounds` are relative to this directory.
    pub sample_root:     PathBuf,
    pub sounds:          SoundSet,
    pub thresholds:      GestureThresholds,
    pub multi_hand:      MultiHandPolicy,
    /// Hands beyond this many per frame are ignored.
    pub max_hands:       usize,
    /// Detector confidence below which a hand is ignored.
    pub min_hand_score:  f32,
    /// Target frame rate; 0 runs unthrottled.
    pub fps:             u32,
    /// Mirror triggered notes to the first MIDI output port.
    pub midi:            bool,
    /// Overlapping sample voices before the oldest is cut.
    pub max_voices:      usize,
    pub headless:        bool,
    /// Replay this landmark recording instead of a live source.
    pub replay:          Option<PathBuf>,
    pub theme:           Theme,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            instrument:      Instrument::Piano,
            sample_root:     PathBuf::from("static/audio"),
            sounds:          SoundSet::default(),
            thresholds:      GestureThresholds::default(),
            multi_hand:      MultiHandPolicy::default(),
            max_hands:       2,
            min_hand_score:  0.5,
            fps:             60,
            midi:            false,
            max_voices:      16,
            headless:        false,
            replay:          None,
            theme:           Theme::Dark,
        }
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let mut cfg: AppConfig = toml::from_str(text).context("invalid configuration")?;
        cfg.sounds = cfg.sounds.with_defaults();
        Ok(cfg)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "air_instrument", about = "Play piano, synthesizer, or drums by moving your fingers in the air")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Starting instrument: piano, synthesizer, or drums
    #[arg(long)]
    pub instrument: Option<Instrument>,

    /// Directory the sample paths are relative to
    #[arg(long)]
    pub samples: Option<PathBuf>,

    /// Replay a JSON-lines landmark recording instead of a live source
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Run without a window (requires --replay)
    #[arg(long)]
    pub headless: bool,

    /// Mirror triggered notes to a MIDI output port
    #[arg(long)]
    pub midi: bool,

    /// Target frame rate (0 = unthrottled)
    #[arg(long)]
    pub fps: Option<u32>,

    /// How multiple detected hands share finger state
    #[arg(long, value_enum)]
    pub multi_hand: Option<MultiHandArg>,

    /// Skip the config file and start with built-in defaults
    #[arg(long)]
    pub quick: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MultiHandArg {
    Shared,
    PerHand,
}

impl From<MultiHandArg> for MultiHandPolicy {
    fn from(a: MultiHandArg) -> Self {
        match a {
            MultiHandArg::Shared  => MultiHandPolicy::Shared,
            MultiHandArg::PerHand => MultiHandPolicy::PerHand,
        }
    }
}

impl Cli {
    /// Resolve the final configuration: file (unless `--quick`), then flags.
    pub fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut cfg = match (&self.config, self.quick) {
            (Some(path), false) => AppConfig::load(path)?,
            _ => AppConfig::default(),
        };
        self.apply(&mut cfg);
        Ok(cfg)
    }

    fn apply(self, cfg: &mut AppConfig) {
        if let Some(i) = self.instrument  { cfg.instrument  = i; }
        if let Some(p) = self.samples     { cfg.sample_root = p; }
        if let Some(p) = self.replay      { cfg.replay      = Some(p); }
        if let Some(f) = self.fps         { cfg.fps         = f; }
        if let Some(m) = self.multi_hand  { cfg.multi_hand  = m.into(); }
        cfg.headless |= self.headless;
        cfg.midi     |= self.midi;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
