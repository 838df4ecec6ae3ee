//! Edge-triggered note firing.
//!
//! Per tracked finger:
//!
//! | current | pressing | action |
//! |---|---|---|
//! | `Released` | true  | emit [`PlayAction`]; → `Pressed` |
//! | `Released` | false | stay |
//! | `Pressed`  | true  | stay (no repeat) |
//! | `Pressed`  | false | → `Released` |
//!
//! The state map is owned here and mutated only through
//! [`TriggerStateMachine::update`]; nothing about it is global.

use std::collections::HashMap;

use hand_landmarks::{Hand, Handedness};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluator::FingerStates;
use crate::instrument::Instrument;

// ════════════════════════════════════════════════════════════════════════════
// TriggerState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TriggerState {
    #[default]
    Released,
    Pressed,
}

// ════════════════════════════════════════════════════════════════════════════
// Hand identity
// ════════════════════════════════════════════════════════════════════════════

/// Which trigger-state array a detected hand updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandKey {
    /// Every hand shares one array.
    Shared,
    /// Keyed by the detector's handedness label.
    Handed(Handedness),
    /// No label reported: keyed by position in the detector's output.
    Slot(usize),
}

/// How multiple detected hands map onto trigger state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiHandPolicy {
    /// Both hands write the same array, so one hand's release can re-arm a
    /// finger the other is still holding.
    Shared,
    /// Each hand gets its own array, keyed by its handedness label (or by
    /// detection order when unlabeled).  The key follows the label: if the
    /// detector flips a held hand from Left to Right, the hand lands on the
    /// other array and a finger held through the flip plays again.
    #[default]
    PerHand,
}

impl MultiHandPolicy {
    pub fn key_for(self, hand: &Hand, detection_index: usize) -> HandKey {
        match self {
            MultiHandPolicy::Shared => HandKey::Shared,
            MultiHandPolicy::PerHand => match hand.handedness {
                Some(h) => HandKey::Handed(h),
                None    => HandKey::Slot(detection_index),
            },
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlayAction
// ════════════════════════════════════════════════════════════════════════════

/// "Play this note now", emitted once per press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayAction {
    pub instrument: Instrument,
    pub note:       &'static str,
    pub slot:       usize,
    pub hand:       HandKey,
}

// ════════════════════════════════════════════════════════════════════════════
// TriggerStateMachine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct TriggerStateMachine {
    instrument: Instrument,
    states:     HashMap<(HandKey, usize), TriggerState>,
}

impl TriggerStateMachine {
    pub fn new(instrument: Instrument) -> Self {
        TriggerStateMachine { instrument, states: HashMap::new() }
    }

    pub fn instrument(&self) -> Instrument { self.instrument }

    /// Feed one hand's evaluation for the current frame.  Returns the notes
    /// to play, in slot order.
    pub fn update(&mut self, hand: HandKey, pressing: &FingerStates) -> Vec<PlayAction> {
        let mut actions = Vec::new();
        let slots = pressing.len().min(self.instrument.slot_count());

        for slot in 0..slots {
            let state = self.states.entry((hand, slot)).or_default();
            let now   = pressing.as_slice()[slot];

            match (*state, now) {
                (TriggerState::Released, true) => {
                    *state = TriggerState::Pressed;
                    if let Some(note) = self.instrument.note_for(slot) {
                        actions.push(PlayAction { instrument: self.instrument, note, slot, hand });
                    }
                }
                (TriggerState::Pressed, false) => *state = TriggerState::Released,
                _ => {}
            }
        }
        actions
    }

    /// Change instrument.  Every finger drops to `Released`; nothing fires
    /// as part of the switch itself.
    pub fn switch_instrument(&mut self, instrument: Instrument) {
        debug!(from = %self.instrument, to = %instrument, "trigger state reset on instrument switch");
        self.instrument = instrument;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn state(&self, hand: HandKey, slot: usize) -> TriggerState {
        self.states.get(&(hand, slot)).copied().unwrap_or_default()
    }

    /// True if any finger of any hand is currently held.
    pub fn any_pressed(&self) -> bool {
        self.states.values().any(|s| *s == TriggerState::Pressed)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
