//! LeapMotion hand tracking (`--features leap`).
//!
//! Requires the LeapC shared library.  Each tracked hand is mapped onto the
//! same 21-point layout a camera detector reports, projected onto the
//! controller's x/y plane:
//!
//! | Leap (mm) | Normalized |
//! |---|---|
//! | `x` (right of device) | `0.5 + x / 400` |
//! | `y` (height above device) | `1 − (y − 50) / 400` |
//!
//! so a hand held about 25 cm above the controller sits mid-frame.

use hand_landmarks::{Hand, Handedness, Landmark, LANDMARK_COUNT};
use leaprs::{Connection, ConnectionConfig, Event, HandType};
use tracing::{debug, info};

use crate::camera::{DetectError, HandDetector, VideoFrame};

const SPAN_MM:     f32 = 400.0;
const FLOOR_MM:    f32 = 50.0;
/// Upper bound on messages drained per frame.
const MAX_DRAIN:   usize = 64;

/// Project one Leap joint into normalized image coordinates.
fn normalize(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(0.5 + x / SPAN_MM, 1.0 - (y - FLOOR_MM) / SPAN_MM, z / SPAN_MM)
}

pub struct LeapDetector {
    connection: Connection,
    /// Hands from the newest tracking event; reused while none is pending.
    last:       Option<Vec<Hand>>,
}

impl LeapDetector {
    pub fn open() -> Result<Self, DetectError> {
        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| DetectError::Backend(format!("LeapC connection: {:?}", e)))?;
        connection.open()
            .map_err(|e| DetectError::Backend(format!("LeapMotion device: {:?}", e)))?;
        info!("LeapMotion connection open");
        Ok(LeapDetector { connection, last: None })
    }
}

impl HandDetector for LeapDetector {
    /// Drain pending tracking events and report the newest one.  The video
    /// frame only paces the call; Leap has its own clock.
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Hand>, DetectError> {
        for _ in 0..MAX_DRAIN {
            let msg = match self.connection.poll(0) {
                Ok(m)  => m,
                Err(_) => break,
            };
            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<Hand> = frame.hands().map(|h| convert(&h)).collect();
                self.last = Some(hands);
            }
        }
        match &self.last {
            Some(hands) => Ok(hands.clone()),
            None => {
                debug!("no tracking event yet");
                Err(DetectError::NotReady)
            }
        }
    }
}

fn convert(hand: &leaprs::Hand) -> Hand {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    let mut wrist  = (0.0, 0.0, 0.0);
    let mut count  = 0.0;

    for (f, digit) in hand.digits().enumerate().take(5) {
        let base = digit.metacarpal().prev_joint();
        wrist.0 += base.x;
        wrist.1 += base.y;
        wrist.2 += base.z;
        count   += 1.0;

        // MCP (thumb CMC), PIP (thumb MCP), DIP (thumb IP), tip.  The Leap
        // thumb has a zero-length metacarpal, so the same bones line up.
        let joints = [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ];
        for (j, p) in joints.iter().enumerate() {
            points[1 + f * 4 + j] = normalize(p.x, p.y, p.z);
        }
    }
    if count > 0.0 {
        points[0] = normalize(wrist.0 / count, wrist.1 / count, wrist.2 / count);
    }

    let handedness = if hand.hand_type() == HandType::Left { Handedness::Left } else { Handedness::Right };
    Hand::new(points).with_handedness(handedness)
}
