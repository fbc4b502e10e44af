//! Progressive loader — which frames have arrived, and which may be fetched
//! next.
//!
//! Frames are grouped into fixed-size batches. A batch opens once enough
//! frames have loaded that the previous one is within `lookahead` of done,
//! so fetches overlap without all being in flight at once.

use std::collections::HashSet;

use crate::config::LoadingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    pub progressive: bool,
    pub batch_size: usize,
    pub lookahead: usize,
}

impl LoadPolicy {
    pub fn from_config(loading: &LoadingConfig) -> Self {
        LoadPolicy {
            progressive: loading.progressive,
            batch_size: loading.batch_size.max(1),
            lookahead: loading.lookahead,
        }
    }

    pub fn batch_of(&self, frame_index: usize) -> usize {
        frame_index / self.batch_size
    }
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self::from_config(&LoadingConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct LoadState {
    frame_count: usize,
    loaded: HashSet<usize>,
    policy: LoadPolicy,
}

impl LoadState {
    pub fn new(frame_count: usize, policy: LoadPolicy) -> Self {
        LoadState {
            frame_count,
            loaded: HashSet::new(),
            policy,
        }
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    /// Record that `frame_index` finished loading. Returns `true` only the
    /// first time a given in-range frame is reported.
    pub fn mark_loaded(&mut self, frame_index: usize) -> bool {
        if frame_index >= self.frame_count {
            log::warn!("ignoring load of frame {frame_index} outside ring of {}", self.frame_count);
            return false;
        }
        let fresh = self.loaded.insert(frame_index);
        if fresh && self.is_complete() {
            log::info!("all {} frames loaded", self.frame_count);
        }
        fresh
    }

    #[cfg(test)]
    pub fn is_loaded(&self, frame_index: usize) -> bool {
        self.loaded.contains(&frame_index)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_complete(&self) -> bool {
        self.loaded.len() >= self.frame_count
    }

    /// `round(100 * loaded / N)`, with halves rounding up.
    pub fn percent_loaded(&self) -> u8 {
        let n = self.frame_count;
        ((200 * self.loaded.len() + n) / (2 * n)) as u8
    }

    pub fn is_eligible_to_start_loading(&self, frame_index: usize) -> bool {
        if frame_index >= self.frame_count {
            return false;
        }
        if !self.policy.progressive {
            return true;
        }
        let batch = self.policy.batch_of(frame_index);
        batch == 0 || self.loaded.len() + self.policy.lookahead >= self.policy.batch_size * batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> LoadState {
        LoadState::new(72, LoadPolicy::default())
    }

    #[test]
    fn duplicate_marks_count_once() {
        let mut load = state();
        assert!(load.mark_loaded(5));
        assert!(!load.mark_loaded(5));
        assert_eq!(load.loaded_count(), 1);
        assert!(load.is_loaded(5));
    }

    #[test]
    fn out_of_range_marks_are_ignored() {
        let mut load = state();
        assert!(!load.mark_loaded(72));
        assert_eq!(load.loaded_count(), 0);
    }

    #[test]
    fn percent_is_monotonic_and_reaches_100() {
        let mut load = state();
        assert_eq!(load.percent_loaded(), 0);
        let mut last = 0;
        for i in (0..72).rev() {
            load.mark_loaded(i);
            load.mark_loaded(i);
            let p = load.percent_loaded();
            assert!(p >= last);
            last = p;
        }
        assert_eq!(load.percent_loaded(), 100);
        assert!(load.is_complete());
    }

    #[test]
    fn percent_rounds_to_nearest() {
        let mut load = state();
        load.mark_loaded(0);
        // 100/72 = 1.39
        assert_eq!(load.percent_loaded(), 1);
        for i in 1..36 {
            load.mark_loaded(i);
        }
        assert_eq!(load.percent_loaded(), 50);

        let mut small = LoadState::new(8, LoadPolicy::default());
        small.mark_loaded(0);
        // 12.5 rounds up
        assert_eq!(small.percent_loaded(), 13);
    }

    #[test]
    fn batches_open_with_lookahead() {
        let mut load = state();
        assert!(load.is_eligible_to_start_loading(0));
        assert!(load.is_eligible_to_start_loading(23));
        assert!(!load.is_eligible_to_start_loading(24));

        for i in 0..11 {
            load.mark_loaded(i);
        }
        assert!(!load.is_eligible_to_start_loading(24));
        load.mark_loaded(11);
        assert!(load.is_eligible_to_start_loading(24));
        assert!(load.is_eligible_to_start_loading(47));
        assert!(!load.is_eligible_to_start_loading(48));

        for i in 12..36 {
            load.mark_loaded(i);
        }
        assert!(load.is_eligible_to_start_loading(48));
        assert!(load.is_eligible_to_start_loading(71));
        assert!(!load.is_eligible_to_start_loading(72));
    }

    #[test]
    fn eager_policy_allows_everything() {
        let policy = LoadPolicy {
            progressive: false,
            ..LoadPolicy::default()
        };
        let load = LoadState::new(72, policy);
        assert!((0..72).all(|i| load.is_eligible_to_start_loading(i)));
    }
}
