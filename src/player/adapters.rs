//! Pointer adapters: mouse and single-finger touch both drive the same
//! press/move/release calls on a [`PressHandler`].

use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::engine::input::PressHandler;

/// The on-screen rectangle that receives pointer input, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

impl Canvas {
    fn contains_row(&self, row: u16) -> bool {
        row >= self.top && row < self.top + self.height
    }
}

/// Translate a crossterm mouse event. Returns `true` if it was consumed.
///
/// A press made with Ctrl held starts a fine drag at `reduced_speed`, when one
/// is configured.
pub fn handle_mouse(
    handler: &mut impl PressHandler,
    event: &MouseEvent,
    canvas: Canvas,
    reduced_speed: Option<f64>,
    now_ms: u64,
) -> bool {
    let x = event.column as f64;
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) if canvas.contains_row(event.row) => {
            let speed = match reduced_speed {
                Some(speed) if event.modifiers.contains(KeyModifiers::CONTROL) => speed,
                _ => 1.0,
            };
            handler.set_speed_multiplier(speed);
            let y = (event.row - canvas.top) as f64;
            handler.press_start(x, y, canvas.height as f64, now_ms);
            true
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            handler.press_move(x, canvas.width as f64, now_ms);
            true
        }
        MouseEventKind::Up(MouseButton::Left) => {
            handler.press_end();
            true
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    /// Touches currently on the surface; empty on release.
    pub touches: Vec<TouchPoint>,
}

/// Single-finger touch adapter. Multi-touch gestures are not interpreted:
/// they end any drag in progress and are otherwise ignored.
pub struct TouchAdapter {
    reduced_speed: Option<f64>,
}

impl TouchAdapter {
    pub fn new(reduced_speed: Option<f64>) -> Self {
        TouchAdapter { reduced_speed }
    }

    pub fn handle(
        &self,
        handler: &mut impl PressHandler,
        event: &TouchEvent,
        width: f64,
        height: f64,
        now_ms: u64,
    ) -> bool {
        if event.touches.len() > 1 {
            handler.press_end();
            return false;
        }
        match (event.phase, event.touches.first()) {
            (TouchPhase::Start, Some(touch)) => {
                handler.set_speed_multiplier(self.reduced_speed.unwrap_or(1.0));
                handler.press_start(touch.x, touch.y, height, now_ms);
                true
            }
            (TouchPhase::Move, Some(touch)) => {
                handler.press_move(touch.x, width, now_ms);
                true
            }
            (TouchPhase::End, _) => {
                handler.press_end();
                true
            }
            (_, None) => false,
        }
    }
}
