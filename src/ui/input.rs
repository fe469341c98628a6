/// Keyboard state tracker and frame-input sampling.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement and variable-height jumps while a key is held
///   - Edge-triggered actions (jump, restart, toggles) on the initial press
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// support it; there a held jump key reads as held only while the terminal
/// keeps sending repeats. A Repeat event never counts as a fresh press, so
/// a key that expired during the OS repeat delay doesn't fire again.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;
use super::gamepad::GamepadState;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const LEFT: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const RIGHT: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const JUMP: [KeyCode; 4] = [KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char(' ')];
const CROUCH: [KeyCode; 5] = [
    KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S'), KeyCode::Char('c'), KeyCode::Char('C'),
];
const RESTART: [KeyCode; 2] = [KeyCode::Char('r'), KeyCode::Char('R')];
const WIN_SCREEN_RESTART: [KeyCode; 2] = [KeyCode::Char('q'), KeyCode::Char('Q')];
const DEBUG_TOGGLE: [KeyCode; 2] = [KeyCode::Char('g'), KeyCode::Char('G')];
const SKIP_LEVEL: [KeyCode; 2] = [KeyCode::Char('y'), KeyCode::Char('Y')];
const CLEAR_COLLECTIBLES: [KeyCode; 2] = [KeyCode::Char('p'), KeyCode::Char('P')];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for quit handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per poll, before sampling.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply_key(key, Instant::now());
            }
        }

        let now = Instant::now();
        if !self.honor_release {
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn apply_key(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, rely on timeout-based expiry instead.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, at);
                if !was_held && key.kind != KeyEventKind::Repeat {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        match self.last_active.get(&code) {
            Some(_) if self.honor_release => true,
            Some(t) => t.elapsed() < HOLD_TIMEOUT,
            None => false,
        }
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed during the last drain? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Esc or Ctrl+C during the last drain.
    pub fn quit_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.kind != KeyEventKind::Release
                && (k.code == KeyCode::Esc
                    || (k.modifiers.contains(KeyModifiers::CONTROL)
                        && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))))
        })
    }

    /// Merge keyboard and gamepad into one frame of input.
    /// `won` enables the win-screen restart key.
    pub fn sample(&self, pad: &GamepadState, won: bool) -> FrameInput {
        FrameInput {
            left: self.any_held(&LEFT) || pad.left_held(),
            right: self.any_held(&RIGHT) || pad.right_held(),
            jump_pressed: self.any_pressed(&JUMP) || pad.jump_pressed(),
            jump_held: self.any_held(&JUMP) || pad.jump_held(),
            crouch: self.any_held(&CROUCH) || pad.crouch_held(),
            restart_pressed: self.any_pressed(&RESTART)
                || (won && self.any_pressed(&WIN_SCREEN_RESTART))
                || pad.restart_pressed(),
            debug_toggle_pressed: self.any_pressed(&DEBUG_TOGGLE) || pad.debug_toggle_pressed(),
            skip_level_pressed: self.any_pressed(&SKIP_LEVEL),
            clear_collectibles_pressed: self.any_pressed(&CLEAR_COLLECTIBLES),
        }
    }
}

/// Edge presses seen between two simulation frames are latched here so a
/// tap shorter than one frame still reaches `step()`.
pub fn latch_edges(pending: &mut FrameInput, sampled: &FrameInput) {
    pending.jump_pressed |= sampled.jump_pressed;
    pending.restart_pressed |= sampled.restart_pressed;
    pending.debug_toggle_pressed |= sampled.debug_toggle_pressed;
    pending.skip_level_pressed |= sampled.skip_level_pressed;
    pending.clear_collectibles_pressed |= sampled.clear_collectibles_pressed;
}

/// Held state comes from the latest sample, edges from the latch.
pub fn take_frame(pending: &mut FrameInput, latest: &FrameInput) -> FrameInput {
    let edges = std::mem::take(pending);
    FrameInput {
        jump_pressed: edges.jump_pressed,
        jump_held: latest.jump_held || edges.jump_pressed,
        restart_pressed: edges.restart_pressed,
        debug_toggle_pressed: edges.debug_toggle_pressed,
        skip_level_pressed: edges.skip_level_pressed,
        clear_collectibles_pressed: edges.clear_collectibles_pressed,
        ..*latest
    }
}
