//! Shared boundary types for the spin viewer.
//!
//! This module defines the data contracts between the core and the front end:
//! - Input adapters → engine: `SpinKey`, `Polarity`
//! - Engine → render sink: `DisplayTier`, `RenderPlan`

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input primitives
// ---------------------------------------------------------------------------

/// A key press, already translated through the configured bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinKey {
    StepLeft,
    StepRight,
    Other,
}

/// How a drag session chooses the sign applied to horizontal motion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    FixedPositive,
    #[default]
    FixedNegative,
    /// `+1` when the press lands in the top quarter of the element, `-1` below.
    ByPressPosition,
}

impl Polarity {
    pub fn sign_at(self, y: f64, element_height: f64) -> i32 {
        match self {
            Polarity::FixedPositive => 1,
            Polarity::FixedNegative => -1,
            Polarity::ByPressPosition => {
                if y < element_height / 4.0 {
                    1
                } else {
                    -1
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine → render sink boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayTier {
    /// The one frame currently shown, composited on top.
    Active,
    /// Mounted beneath the active frame but not visible.
    Staged,
    /// Not rendered at all.
    Hidden,
}

/// Everything a render sink needs to draw one state of the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub active_index: usize,
    pub tiers: Vec<DisplayTier>,
    pub percent_loaded: u8,
    /// Whether the front end should show the loading overlay.
    pub show_progress: bool,
}

impl RenderPlan {
    /// Frame indices to composite, bottom first. Staged frames come before the
    /// active frame; hidden frames are omitted.
    pub fn stacking_order(&self) -> Vec<usize> {
        let staged = self
            .tiers
            .iter()
            .enumerate()
            .filter(|(_, tier)| **tier == DisplayTier::Staged)
            .map(|(i, _)| i);
        staged.chain(std::iter::once(self.active_index)).collect()
    }

    #[cfg(test)]
    pub fn staged_count(&self) -> usize {
        self.tiers.iter().filter(|t| **t == DisplayTier::Staged).count()
    }
}
