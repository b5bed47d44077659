/// Keyboard and mouse state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous horizontal movement while a key is held
///   - Edge-triggered jump (initial press) and stop-jump (release)
///   - Mouse presses on the on-screen controller (touch channel)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Keys that stopped being held during the last drain (explicit
    /// Release or timeout).
    fresh_releases: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,

    /// Cell under the held left mouse button.
    mouse_held: Option<(u16, u16)>,
    mouse_pressed: Option<(u16, u16)>,
    mouse_released: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            fresh_releases: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
            mouse_held: None,
            mouse_pressed: None,
            mouse_released: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.fresh_releases.clear();
        self.raw_events.clear();
        self.mouse_pressed = None;
        self.mouse_released = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.on_key(key),
                Ok(Event::Mouse(m)) => match m.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        self.mouse_held = Some((m.column, m.row));
                        self.mouse_pressed = Some((m.column, m.row));
                    }
                    MouseEventKind::Drag(MouseButton::Left) => {
                        self.mouse_held = Some((m.column, m.row));
                    }
                    MouseEventKind::Up(MouseButton::Left) => {
                        self.mouse_held = None;
                        self.mouse_released = true;
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        let releases = &mut self.fresh_releases;
        self.last_active.retain(|code, t| {
            let alive = now.duration_since(*t) < HOLD_TIMEOUT;
            if !alive {
                releases.push(*code);
            }
            alive
        });
    }

    fn on_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                if self.last_active.remove(&key.code).is_some() {
                    self.fresh_releases.push(key.code);
                }
            }
            KeyEventKind::Release => {
                // Not trusted without enhancement; timeout expiry handles it
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn any_released(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_releases.contains(c))
    }

    /// -1, 0 or 1 from held left/right keys. Both held cancel out.
    pub fn digital_axis(&self, left: &[KeyCode], right: &[KeyCode]) -> f32 {
        let l = self.any_held(left) || self.any_pressed(left);
        let r = self.any_held(right) || self.any_pressed(right);
        match (l, r) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn mouse_held(&self) -> Option<(u16, u16)> {
        self.mouse_held
    }

    /// Cell of a fresh left click this frame.
    pub fn mouse_pressed(&self) -> Option<(u16, u16)> {
        self.mouse_pressed
    }

    pub fn mouse_released(&self) -> bool {
        self.mouse_released
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
