//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┬──────────────┐
//! │  [piano] [synthesizer] [drums]   tabs        │              │
//! ├──────────────────────────────────────────────┤  SLOTS       │
//! │                                              │              │
//! │  video panel: hand skeleton, landmarks,      │  [thumb ]    │
//! │  piano press rows                            │  [index ]    │
//! │                                              │  [middle]    │
//! │                                              │  ...         │
//! ├──────────────────────────────────────────────┴──────────────┤
//! │  status bar                                                 │
//! │  key legend                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All drawing goes to a [`Canvas`]; the window only presents it.

use std::sync::mpsc::Sender;
use std::time::Duration;

use air_gesture::Instrument;
use hand_landmarks::{Hand, Landmark, HAND_CONNECTIONS};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::app::{Theme, UiEvent};
use crate::frame_loop::{FrameView, Renderer};
use crate::sim::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:   usize = 900;
pub const WIN_H:   usize = 560;
const TAB_H:       usize = 32;
const VIDEO_X:     usize = 0;
const VIDEO_Y:     usize = TAB_H;
const VIDEO_W:     usize = 640;
const VIDEO_H:     usize = 480;
const SIDE_X:      usize = VIDEO_W;
const SIDE_W:      usize = WIN_W - VIDEO_W;
const STATUS_Y:    usize = VIDEO_Y + VIDEO_H;
const SLOT_H:      usize = 56;
const JOINT_R:     isize = 2;
const TIP_R:       isize = 4;
const DASH:        isize = 8;

// ════════════════════════════════════════════════════════════════════════════
// Palette
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: u32,
    pub video:      u32,
    pub side:       u32,
    pub bar:        u32,
    pub text:       u32,
    pub dim:        u32,
    pub accent:     u32,
    pub bone:       u32,
    pub joint:      u32,
    pub row:        u32,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Palette {
        match theme {
            Theme::Dark => Palette {
                background: 0xFF1A1A2E,
                video:      0xFF101018,
                side:       0xFF16213E,
                bar:        0xFF0F3460,
                text:       0xFFEEEEEE,
                dim:        0xFF888888,
                accent:     0xFFFFD700,
                bone:       0xFF55CCFF,
                joint:      0xFFFFFFFF,
                row:        0xFFFF6688,
            },
            Theme::Light => Palette {
                background: 0xFFF2F2F2,
                video:      0xFFDADDE2,
                side:       0xFFE6E9EF,
                bar:        0xFFC8D3E6,
                text:       0xFF202020,
                dim:        0xFF707070,
                accent:     0xFFE07000,
                bone:       0xFF1060C0,
                joint:      0xFF202020,
                row:        0xFFC02050,
            },
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// A fixed-size ARGB pixel buffer.  Writes outside it are clipped.
pub struct Canvas {
    buf: Vec<u32>,
    w:   usize,
    h:   usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![0xFF000000; w * h], w, h }
    }

    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn clear(&mut self, color: u32) { self.buf.fill(color); }

    pub fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.buf[y as usize * self.w + x as usize] = color;
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    pub fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        let (x, y, w, h) = (x as isize, y as isize, w as isize, h as isize);
        for col in x..x + w {
            self.set_pixel(col, y,         color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..y + h {
            self.set_pixel(x,         row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    /// Bresenham line, both endpoints inclusive.
    pub fn draw_line(&mut self, (x0, y0): (isize, isize), (x1, y1): (isize, isize), color: u32) {
        let dx  =  (x1 - x0).abs();
        let dy  = -(y1 - y0).abs();
        let sx  = if x0 < x1 { 1 } else { -1 };
        let sy  = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// Filled square of half-width `r` centred on (cx, cy).
    pub fn dot(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Minimal bitmap font: 3×5 glyphs on a 4-pixel advance.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            if cx + 4 > self.w { break; }
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel((cx + col) as isize, (y + row) as isize, color);
                    }
                }
            }
            cx += 4;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame painting
// ════════════════════════════════════════════════════════════════════════════

/// Map a normalized landmark into the video panel.
fn to_panel(p: Landmark) -> (isize, isize) {
    (
        VIDEO_X as isize + (p.x * VIDEO_W as f32).round() as isize,
        VIDEO_Y as isize + (p.y * VIDEO_H as f32).round() as isize,
    )
}

/// Is `slot` pressed by any hand this frame?
fn slot_pressed(view: &FrameView<'_>, slot: usize) -> bool {
    view.pressed.iter().any(|s| s.get(slot).unwrap_or(false))
}

/// Draw one whole frame.
pub fn paint(canvas: &mut Canvas, view: &FrameView<'_>) {
    let pal = Palette::for_theme(view.theme);
    canvas.clear(pal.background);

    paint_tabs(canvas, view.instrument, &pal);

    // ── Video panel ───────────────────────────────────────────────────────
    canvas.fill_rect(VIDEO_X, VIDEO_Y, VIDEO_W, VIDEO_H, pal.video);
    let stamp = format!("t={}ms", view.frame.timestamp.as_millis());
    canvas.draw_label(&stamp, VIDEO_X + 6, VIDEO_Y + 6, pal.dim);

    if view.instrument == Instrument::Piano {
        paint_piano_rows(canvas, view, &pal);
    }

    match view.hands {
        Some(hands) => {
            for (i, hand) in hands.iter().enumerate() {
                let pressed = view.pressed.get(i);
                paint_hand(canvas, hand, view.instrument, |slot| {
                    pressed.and_then(|p| p.get(slot)).unwrap_or(false)
                }, &pal);
            }
        }
        None => canvas.draw_label("no detection", VIDEO_X + 6, VIDEO_Y + 16, pal.row),
    }

    paint_slots(canvas, view, &pal);

    // ── Status bar ────────────────────────────────────────────────────────
    canvas.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, pal.bar);
    canvas.draw_label(view.status, 10, STATUS_Y + 10, pal.text);
    canvas.draw_label(
        "P/S/D=instrument  Tab=next  T=theme  1-5=curl  H=hide hand  Q=quit",
        10, WIN_H - 16, pal.dim,
    );
}

fn paint_tabs(canvas: &mut Canvas, current: Instrument, pal: &Palette) {
    let mut x = 8;
    for instrument in Instrument::ALL {
        let label = instrument.name();
        let w = label.len() * 4 + 12;
        if instrument == current {
            canvas.fill_rect(x, 6, w, TAB_H - 12, pal.bar);
            canvas.draw_border(x, 6, w, TAB_H - 12, pal.accent);
            canvas.draw_label(label, x + 6, 13, pal.accent);
        } else {
            canvas.draw_border(x, 6, w, TAB_H - 12, pal.dim);
            canvas.draw_label(label, x + 6, 13, pal.dim);
        }
        x += w + 8;
    }
}

/// One horizontal line per piano row, thumb excluded.
fn paint_piano_rows(canvas: &mut Canvas, view: &FrameView<'_>, pal: &Palette) {
    let fingers = Instrument::Piano.fingers();
    for (slot, finger) in fingers.iter().enumerate().skip(1) {
        let row = view.thresholds.piano_rows[slot];
        let (_, y) = to_panel(Landmark::xy(0.0, row));
        let color = if slot_pressed(view, slot) { pal.accent } else { pal.row };
        // Dashed and staggered: three rows share the default height.
        let mut x = VIDEO_X as isize + (slot as isize - 1) * DASH;
        while x < (VIDEO_X + VIDEO_W) as isize {
            canvas.draw_line((x, y), (x + DASH - 1, y), color);
            x += DASH * 4;
        }
        let label_x = VIDEO_X + VIDEO_W - 32 * slot;
        let label_y = (y - 8).max(VIDEO_Y as isize) as usize;
        canvas.draw_label(finger.name(), label_x, label_y, color);
    }
}

fn paint_hand(
    canvas:     &mut Canvas,
    hand:       &Hand,
    instrument: Instrument,
    pressed:    impl Fn(usize) -> bool,
    pal:        &Palette,
) {
    let pts = hand.landmarks();
    for &(a, b) in HAND_CONNECTIONS.iter() {
        canvas.draw_line(to_panel(pts[a]), to_panel(pts[b]), pal.bone);
    }
    for p in pts.iter() {
        let (x, y) = to_panel(*p);
        canvas.dot(x, y, JOINT_R, pal.joint);
    }
    for (slot, finger) in instrument.fingers().iter().enumerate() {
        let (x, y) = to_panel(hand.landmark(finger.tip()));
        let color = if pressed(slot) { pal.accent } else { pal.joint };
        canvas.dot(x, y, TIP_R, color);
    }
    if let Some(h) = hand.handedness {
        let (x, y) = to_panel(pts[0]);
        canvas.draw_label(h.as_str(), (x + 8).max(0) as usize, (y + 4).max(0) as usize, pal.dim);
    }
}

/// Side panel: one box per slot, lit while any hand presses it.
fn paint_slots(canvas: &mut Canvas, view: &FrameView<'_>, pal: &Palette) {
    canvas.fill_rect(SIDE_X, VIDEO_Y, SIDE_W, VIDEO_H, pal.side);
    canvas.draw_label("SLOTS", SIDE_X + 10, VIDEO_Y + 8, pal.accent);

    let fingers = view.instrument.fingers();
    for (slot, finger) in fingers.iter().enumerate() {
        let y  = VIDEO_Y + 24 + slot * (SLOT_H + 6);
        let on = slot_pressed(view, slot);
        if on {
            canvas.fill_rect(SIDE_X + 10, y, SIDE_W - 20, SLOT_H, blend(pal.side, pal.accent, 0.35));
        }
        canvas.draw_border(SIDE_X + 10, y, SIDE_W - 20, SLOT_H, if on { pal.accent } else { pal.dim });
        canvas.draw_label(finger.name(), SIDE_X + 18, y + 10, pal.text);
        let note = view.instrument.note_for(slot).unwrap_or("");
        canvas.draw_label(note, SIDE_X + 18, y + 24, pal.dim);
        if on {
            canvas.draw_label("on", SIDE_X + SIDE_W - 36, y + 10, pal.accent);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    ui_tx:  Sender<UiEvent>,
    /// Present only when the keyboard simulation drives the hand.
    sim_tx: Option<Sender<SimInput>>,
    held:   [bool; 5],
}

impl Visualizer {
    pub fn new(ui_tx: Sender<UiEvent>, sim_tx: Option<Sender<SimInput>>) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Air Instrument",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(WIN_W, WIN_H),
            ui_tx,
            sim_tx,
            held: [false; 5],
        })
    }

    fn send(&self, event: UiEvent) {
        let _ = self.ui_tx.send(event);
    }
}

impl Renderer for Visualizer {
    /// Translate keys into UI events and, in simulation, finger input.
    fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            self.send(UiEvent::Quit);
            return false;
        }
        if one_shot(Key::P)   { self.send(UiEvent::SelectInstrument(Instrument::Piano)); }
        if one_shot(Key::S)   { self.send(UiEvent::SelectInstrument(Instrument::Synthesizer)); }
        if one_shot(Key::D)   { self.send(UiEvent::SelectInstrument(Instrument::Drums)); }
        if one_shot(Key::Tab) { self.send(UiEvent::NextInstrument); }
        if one_shot(Key::T)   { self.send(UiEvent::ToggleTheme); }

        if let Some(sim_tx) = &self.sim_tx {
            if one_shot(Key::H) {
                let _ = sim_tx.send(SimInput::ToggleVisible);
            }
            let keys = [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5];
            let held = keys.map(|k| self.window.is_key_down(k));
            if held != self.held {
                self.held = held;
                let _ = sim_tx.send(SimInput::Held(held));
            }
        }

        true
    }

    fn render(&mut self, view: &FrameView<'_>) {
        paint(&mut self.canvas, view);
        self.window.update_with_buffer(self.canvas.pixels(), WIN_W, WIN_H).ok();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
