//! Input tracker — turns pointer motion and key presses into spin deltas.
//!
//! Pixel motion is scaled by the element width so that one full drag across
//! the element turns the ring roughly once, whatever the resolution.

use crate::config::ViewerConfig;
use crate::types::{Polarity, SpinKey};

/// Minimum interval and step clamp applied to drag deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub min_interval_ms: u64,
    pub max_step: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    pub frame_count: usize,
    pub axis_sensitivity_divisor: f64,
    pub drag_speed_scale: f64,
    pub polarity: Polarity,
    pub throttle: Option<Throttle>,
}

impl TrackerOptions {
    pub fn from_config(config: &ViewerConfig) -> Self {
        // Throttling only makes sense when every frame is being fetched at once.
        let throttle = (!config.loading.progressive).then_some(Throttle {
            min_interval_ms: config.loading.min_interval_ms,
            max_step: config.loading.max_step,
        });
        TrackerOptions {
            frame_count: config.ring.frame_count,
            axis_sensitivity_divisor: config.ring.axis_sensitivity_divisor,
            drag_speed_scale: config.ring.drag_speed_scale,
            polarity: config.input.polarity,
            throttle,
        }
    }

    /// Pixels of horizontal motion per frame step.
    fn xscale(&self, element_width: f64, speed_multiplier: f64) -> f64 {
        element_width
            / self.frame_count as f64
            / self.axis_sensitivity_divisor
            / (self.drag_speed_scale * speed_multiplier)
    }
}

/// State of one press-to-release gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub is_dragging: bool,
    pub last_pointer_x: f64,
    pub last_event_time_ms: u64,
    pub polarity: i32,
}

impl Default for DragSession {
    fn default() -> Self {
        DragSession {
            is_dragging: false,
            last_pointer_x: 0.0,
            last_event_time_ms: 0,
            polarity: -1,
        }
    }
}

impl DragSession {
    fn begin(&mut self, x: f64, timestamp_ms: u64, polarity: i32) {
        self.is_dragging = true;
        self.last_pointer_x = x;
        self.last_event_time_ms = timestamp_ms;
        self.polarity = polarity;
    }

    /// Advance the gesture to `x`. Returns the signed delta to emit, if any.
    /// A move that produces no delta (or is throttled) leaves the anchor
    /// point untouched so small motions accumulate.
    fn advance(
        &mut self,
        x: f64,
        xscale: f64,
        timestamp_ms: u64,
        throttle: Option<Throttle>,
    ) -> Option<i64> {
        if !self.is_dragging || !xscale.is_finite() || xscale <= 0.0 {
            return None;
        }

        let mut dx = round_half_up((x - self.last_pointer_x) / xscale);
        if dx == 0 {
            return None;
        }

        if let Some(throttle) = throttle {
            let elapsed = timestamp_ms.saturating_sub(self.last_event_time_ms);
            if elapsed < throttle.min_interval_ms {
                return None;
            }
            let cap = throttle.max_step.max(1);
            dx = dx.clamp(-cap, cap);
        }

        self.last_pointer_x = x;
        self.last_event_time_ms = timestamp_ms;
        Some(self.polarity as i64 * dx)
    }

    fn reset(&mut self) {
        self.is_dragging = false;
    }
}

// Ties round toward positive infinity, so -2.5 becomes -2.
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// The press/move/release capability shared by every pointer adapter.
pub trait PressHandler {
    fn press_start(&mut self, x: f64, y: f64, element_height: f64, timestamp_ms: u64);
    fn press_move(&mut self, x: f64, element_width: f64, timestamp_ms: u64);
    fn press_end(&mut self);
    fn set_speed_multiplier(&mut self, multiplier: f64);
}

pub struct InputTracker<F: FnMut(i64)> {
    options: TrackerOptions,
    session: DragSession,
    speed_multiplier: f64,
    emit: F,
}

impl<F: FnMut(i64)> InputTracker<F> {
    /// `emit` receives every spin delta, in the order gestures produce them.
    pub fn new(options: TrackerOptions, emit: F) -> Self {
        InputTracker {
            options,
            session: DragSession::default(),
            speed_multiplier: 1.0,
            emit,
        }
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn on_key(&mut self, key: SpinKey) {
        match key {
            SpinKey::StepLeft => self.emit_delta(1),
            SpinKey::StepRight => self.emit_delta(-1),
            SpinKey::Other => {}
        }
    }

    fn emit_delta(&mut self, delta: i64) {
        log::trace!("spin delta {delta}");
        (self.emit)(delta);
    }
}

impl<F: FnMut(i64)> PressHandler for InputTracker<F> {
    fn press_start(&mut self, x: f64, y: f64, element_height: f64, timestamp_ms: u64) {
        let polarity = self.options.polarity.sign_at(y, element_height);
        self.session.begin(x, timestamp_ms, polarity);
        log::debug!("drag started at x={x:.1} polarity={polarity}");
    }

    fn press_move(&mut self, x: f64, element_width: f64, timestamp_ms: u64) {
        let xscale = self.options.xscale(element_width, self.speed_multiplier);
        if let Some(delta) = self
            .session
            .advance(x, xscale, timestamp_ms, self.options.throttle)
        {
            self.emit_delta(delta);
        }
    }

    fn press_end(&mut self) {
        if self.session.is_dragging {
            log::debug!("drag ended");
        }
        self.session.reset();
    }

    /// Non-positive or non-finite multipliers fall back to full speed.
    fn set_speed_multiplier(&mut self, multiplier: f64) {
        self.speed_multiplier = if multiplier.is_finite() && multiplier > 0.0 {
            multiplier
        } else {
            1.0
        };
    }
}
