use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Polarity, SpinKey};

/// Largest ring a viewer accepts.
pub const MAX_FRAMES: usize = u16::MAX as usize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("frame_count must be greater than zero")]
    EmptyRing,
    #[error("frame_count {0} exceeds the maximum of {max}", max = MAX_FRAMES)]
    RingTooLarge(usize),
    #[error("axis_sensitivity_divisor must be positive and finite, got {0}")]
    InvalidDivisor(f64),
    #[error("speed multiplier must be positive and finite, got {0}")]
    InvalidSpeed(f64),
    #[error("batch_size must be greater than zero")]
    InvalidBatchSize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Directory (or URL prefix) holding the `snap_NNN.png` frames.
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub ring: RingConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub loading: LoadingConfig,
    #[serde(default)]
    pub key_bindings: KeyBindings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
    /// Compensates for the visible arc not spanning the full element width.
    #[serde(default = "default_axis_sensitivity_divisor")]
    pub axis_sensitivity_divisor: f64,
    #[serde(default = "default_speed")]
    pub drag_speed_scale: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub polarity: Polarity,
    /// Speed multiplier used by constrained input surfaces (touch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduced_speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingConfig {
    /// Stagger frame loads in batches. When off, every frame loads at once and
    /// drag input is throttled instead.
    #[serde(default = "default_true")]
    pub progressive: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    // Only applied when `progressive` is off.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_step")]
    pub max_step: i64,
    #[serde(default = "default_stage_radius")]
    pub stage_radius: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_step_left")]
    pub step_left: String,
    #[serde(default = "default_step_right")]
    pub step_right: String,
    #[serde(default = "default_quit")]
    pub quit: String,
}

fn default_frame_count() -> usize { 72 }
fn default_axis_sensitivity_divisor() -> f64 { 0.85 }
fn default_speed() -> f64 { 1.0 }
fn default_true() -> bool { true }
fn default_batch_size() -> usize { 24 }
fn default_lookahead() -> usize { 12 }
fn default_min_interval_ms() -> u64 { 100 }
fn default_max_step() -> i64 { 2 }
fn default_stage_radius() -> usize { 3 }
fn default_step_left() -> String { "Left".into() }
fn default_step_right() -> String { "Right".into() }
fn default_quit() -> String { "q".into() }

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            frame_count: default_frame_count(),
            axis_sensitivity_divisor: default_axis_sensitivity_divisor(),
            drag_speed_scale: default_speed(),
        }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        LoadingConfig {
            progressive: true,
            batch_size: default_batch_size(),
            lookahead: default_lookahead(),
            min_interval_ms: default_min_interval_ms(),
            max_step: default_max_step(),
            stage_radius: default_stage_radius(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            step_left: default_step_left(),
            step_right: default_step_right(),
            quit: default_quit(),
        }
    }
}

impl RingConfig {
    pub fn new(
        frame_count: usize,
        axis_sensitivity_divisor: f64,
        drag_speed_scale: f64,
    ) -> Result<Self, ConfigError> {
        let ring = RingConfig {
            frame_count,
            axis_sensitivity_divisor,
            drag_speed_scale,
        };
        ring.validate()?;
        Ok(ring)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_count == 0 {
            return Err(ConfigError::EmptyRing);
        }
        if self.frame_count > MAX_FRAMES {
            return Err(ConfigError::RingTooLarge(self.frame_count));
        }
        if !is_positive(self.axis_sensitivity_divisor) {
            return Err(ConfigError::InvalidDivisor(self.axis_sensitivity_divisor));
        }
        if !is_positive(self.drag_speed_scale) {
            return Err(ConfigError::InvalidSpeed(self.drag_speed_scale));
        }
        Ok(())
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ring.validate()?;
        if let Some(speed) = self.input.reduced_speed {
            if !is_positive(speed) {
                return Err(ConfigError::InvalidSpeed(speed));
            }
        }
        if self.loading.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }

    /// Load the user config, falling back to defaults when the file is
    /// missing or unreadable as JSON.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        let config = match std::fs::read_to_string(&config_path) {
            Ok(json) => match serde_json::from_str::<ViewerConfig>(&json) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!(
                        "invalid viewer config {} ({e}), using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        config
            .validate()
            .with_context(|| format!("Invalid config {}", config_path.display()))?;
        Ok(config)
    }

    /// Load an explicitly named config file. Unlike [`ViewerConfig::load`],
    /// a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("spin-viewer");
        path.push("viewer.json");
        path
    }
}

impl KeyBindings {
    pub fn translate(&self, event: &KeyEvent) -> SpinKey {
        if matches_binding(&self.step_left, event) {
            SpinKey::StepLeft
        } else if matches_binding(&self.step_right, event) {
            SpinKey::StepRight
        } else {
            SpinKey::Other
        }
    }

    pub fn is_quit(&self, event: &KeyEvent) -> bool {
        event.code == KeyCode::Esc || matches_binding(&self.quit, event)
    }
}

/// Check whether a crossterm `KeyEvent` matches a binding string such as
/// `"Left"`, `"h"` or `"Ctrl-q"`.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        return event.modifiers.contains(KeyModifiers::CONTROL) && matches_code(rest, event.code);
    }

    // Plain bindings never fire with Ctrl or Alt held.
    if event.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return false;
    }
    matches_code(binding, event.code)
}

fn matches_code(name: &str, code: KeyCode) -> bool {
    match name {
        "Right" => code == KeyCode::Right,
        "Left" => code == KeyCode::Left,
        "Up" => code == KeyCode::Up,
        "Down" => code == KeyCode::Down,
        "Enter" => code == KeyCode::Enter,
        "Esc" => code == KeyCode::Esc,
        "Space" => code == KeyCode::Char(' '),
        "Home" => code == KeyCode::Home,
        "End" => code == KeyCode::End,
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
                return code == KeyCode::F(n);
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}
