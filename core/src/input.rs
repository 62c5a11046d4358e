//! Pointer/keyboard/wheel handling.
//!
//! The window layer translates its native events into [`InputEvent`]s; the
//! controller turns them into [`Camera`] mutations. Two live states only:
//! idle and dragging. A quit event is terminal.

use crate::camera::Camera;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown { button: PointerButton, pos: (f64, f64) },
    PointerMove { pos: (f64, f64) },
    PointerUp { button: PointerButton, pos: (f64, f64) },
    /// Positive scrolls away from the user (zoom in).
    Wheel { delta: f64 },
    FloorUp,
    FloorDown,
    Quit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputState {
    #[default]
    Idle,
    Dragging,
    Quit,
}

/// What the session has to react to after an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputOutcome {
    pub floor_changed: bool,
    pub quit: bool,
}

#[derive(Debug, Default)]
pub struct InputController {
    state: InputState,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    pub fn handle(&mut self, event: InputEvent, camera: &mut Camera) -> InputOutcome {
        let mut outcome = InputOutcome::default();
        if self.state == InputState::Quit {
            outcome.quit = true;
            return outcome;
        }

        match event {
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                pos,
            } => {
                camera.begin_drag(pos);
                self.state = InputState::Dragging;
            }
            InputEvent::PointerMove { pos } => {
                if self.state == InputState::Dragging {
                    camera.drag_to(pos);
                }
            }
            InputEvent::PointerUp {
                button: PointerButton::Primary,
                ..
            } => {
                camera.end_drag();
                self.state = InputState::Idle;
            }
            InputEvent::PointerDown { .. } | InputEvent::PointerUp { .. } => {}
            InputEvent::Wheel { delta } => camera.scroll_zoom(delta),
            InputEvent::FloorUp => outcome.floor_changed = camera.change_floor(1),
            InputEvent::FloorDown => outcome.floor_changed = camera.change_floor(-1),
            InputEvent::Quit => {
                camera.end_drag();
                self.state = InputState::Quit;
                outcome.quit = true;
            }
        }

        outcome
    }
}
