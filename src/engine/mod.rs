//! Engine — the interaction core of the spin viewer.
//!
//! Turns gestures into a frame index, tracks which frames have loaded, and
//! classifies every frame for the render sink.
//!
//! The engine never deals with terminals, files, or pixels.

pub mod classify;
pub mod input;
pub mod keys;
pub mod loader;
pub mod rotation;

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::config::{ConfigError, ViewerConfig};
use crate::types::{DisplayTier, RenderPlan, SpinKey};
use input::{InputTracker, PressHandler, TrackerOptions};
use keys::{KeyRouter, KeySubscription};
use loader::{LoadPolicy, LoadState};
use rotation::RotationState;

type DeltaSink = Box<dyn FnMut(i64)>;

pub struct SpinViewer {
    rotation: Rc<RefCell<RotationState>>,
    load: Rc<RefCell<LoadState>>,
    tracker: Rc<RefCell<InputTracker<DeltaSink>>>,
    requested: HashSet<usize>,
    stage_radius: Option<usize>,
    reduced_speed: Option<f64>,
    key_subscription: Option<KeySubscription>,
}

impl SpinViewer {
    pub fn new(config: &ViewerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let frame_count = config.ring.frame_count;

        let rotation = Rc::new(RefCell::new(RotationState::new(frame_count)));
        let load = Rc::new(RefCell::new(LoadState::new(
            frame_count,
            LoadPolicy::from_config(&config.loading),
        )));

        let target = Rc::clone(&rotation);
        let sink: DeltaSink = Box::new(move |delta| target.borrow_mut().apply_delta(delta));
        let tracker = InputTracker::new(TrackerOptions::from_config(config), sink);

        Ok(SpinViewer {
            rotation,
            load,
            tracker: Rc::new(RefCell::new(tracker)),
            requested: HashSet::new(),
            stage_radius: (!config.loading.progressive).then_some(config.loading.stage_radius),
            reduced_speed: config.input.reduced_speed,
            key_subscription: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.rotation.borrow().frame_count()
    }

    pub fn current_index(&self) -> usize {
        self.rotation.borrow().current_index()
    }

    pub fn apply_delta(&mut self, delta: i64) {
        self.rotation.borrow_mut().apply_delta(delta);
    }

    pub fn on_key(&mut self, key: SpinKey) {
        self.tracker.borrow_mut().on_key(key);
    }

    pub fn is_dragging(&self) -> bool {
        self.tracker.borrow().session().is_dragging
    }

    /// Speed multiplier for constrained surfaces such as touch, if configured.
    pub fn reduced_speed(&self) -> Option<f64> {
        self.reduced_speed
    }

    // -----------------------------------------------------------------------
    // Keyboard lifecycle
    // -----------------------------------------------------------------------

    /// Start receiving keys from `router`. Calling this again replaces the
    /// previous registration rather than adding a second one.
    pub fn activate_keys(&mut self, router: &KeyRouter) {
        let tracker = Rc::downgrade(&self.tracker);
        self.key_subscription = Some(router.subscribe(move |key| {
            if let Some(tracker) = tracker.upgrade() {
                tracker.borrow_mut().on_key(key);
            }
        }));
    }

    pub fn deactivate_keys(&mut self) {
        self.key_subscription = None;
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    pub fn mark_loaded(&mut self, frame_index: usize) -> bool {
        self.load.borrow_mut().mark_loaded(frame_index)
    }

    /// A completion handle that outlives nothing: once the viewer is dropped,
    /// marks through it are ignored.
    pub fn load_handle(&self) -> LoadHandle {
        LoadHandle {
            load: Rc::downgrade(&self.load),
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.load.borrow().loaded_count()
    }

    pub fn percent_loaded(&self) -> u8 {
        self.load.borrow().percent_loaded()
    }

    pub fn is_loading(&self) -> bool {
        !self.load.borrow().is_complete()
    }

    pub fn is_eligible_to_start_loading(&self, frame_index: usize) -> bool {
        self.load.borrow().is_eligible_to_start_loading(frame_index)
    }

    pub fn load_batch(&self, frame_index: usize) -> usize {
        self.load.borrow().policy().batch_of(frame_index)
    }

    /// Frames that may begin loading now and have not been handed out before.
    /// Each frame is returned at most once over the viewer's lifetime.
    pub fn frames_to_start(&mut self) -> Vec<usize> {
        let load = self.load.borrow();
        let ready: Vec<usize> = (0..self.frame_count())
            .filter(|i| !self.requested.contains(i) && load.is_eligible_to_start_loading(*i))
            .collect();
        drop(load);
        self.requested.extend(ready.iter().copied());
        if !ready.is_empty() {
            log::debug!("scheduling {} frame loads from {}", ready.len(), ready[0]);
        }
        ready
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    pub fn tier_of(&self, frame_index: usize) -> DisplayTier {
        self.tiers()[frame_index]
    }

    pub fn tiers(&self) -> Vec<DisplayTier> {
        classify::classify_ring(
            self.current_index(),
            self.frame_count(),
            self.is_loading(),
            self.stage_radius,
        )
    }

    pub fn render_plan(&self) -> RenderPlan {
        let progressive = self.load.borrow().policy().progressive;
        RenderPlan {
            active_index: self.current_index(),
            tiers: self.tiers(),
            percent_loaded: self.percent_loaded(),
            show_progress: progressive && self.is_loading(),
        }
    }
}

impl PressHandler for SpinViewer {
    fn press_start(&mut self, x: f64, y: f64, element_height: f64, timestamp_ms: u64) {
        self.tracker
            .borrow_mut()
            .press_start(x, y, element_height, timestamp_ms);
    }

    fn press_move(&mut self, x: f64, element_width: f64, timestamp_ms: u64) {
        self.tracker
            .borrow_mut()
            .press_move(x, element_width, timestamp_ms);
    }

    fn press_end(&mut self) {
        self.tracker.borrow_mut().press_end();
    }

    fn set_speed_multiplier(&mut self, multiplier: f64) {
        self.tracker.borrow_mut().set_speed_multiplier(multiplier);
    }
}

/// Weak handle for reporting load completions from the asset side.
#[derive(Clone)]
pub struct LoadHandle {
    load: Weak<RefCell<LoadState>>,
}

impl LoadHandle {
    /// Returns `true` if this was the first report for a live viewer.
    pub fn mark_loaded(&self, frame_index: usize) -> bool {
        match self.load.upgrade() {
            Some(load) => load.borrow_mut().mark_loaded(frame_index),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> SpinViewer {
        SpinViewer::new(&ViewerConfig::default()).unwrap()
    }

    #[test]
    fn rejects_empty_ring() {
        let mut config = ViewerConfig::default();
        config.ring.frame_count = 0;
        assert_eq!(SpinViewer::new(&config).err(), Some(ConfigError::EmptyRing));
    }

    #[test]
    fn rejects_oversized_ring_before_allocating() {
        let mut config = ViewerConfig::default();
        config.ring.frame_count = usize::MAX / 4;
        assert_eq!(
            SpinViewer::new(&config).err(),
            Some(ConfigError::RingTooLarge(usize::MAX / 4))
        );

        config.ring.frame_count = crate::config::MAX_FRAMES;
        let mut viewer = SpinViewer::new(&config).unwrap();
        viewer.apply_delta(-1);
        assert_eq!(viewer.current_index(), crate::config::MAX_FRAMES - 1);
        viewer.mark_loaded(0);
        assert_eq!(viewer.percent_loaded(), 0);
    }

    #[test]
    fn reactivation_keeps_a_single_listener() {
        let router = KeyRouter::new();
        let mut viewer = viewer();
        viewer.activate_keys(&router);
        viewer.activate_keys(&router);
        assert_eq!(router.listener_count(), 1);

        router.dispatch(SpinKey::StepRight);
        assert_eq!(viewer.current_index(), 71);

        viewer.deactivate_keys();
        assert_eq!(router.listener_count(), 0);
        router.dispatch(SpinKey::StepRight);
        assert_eq!(viewer.current_index(), 71);
    }

    #[test]
    fn dropping_viewer_releases_keys() {
        let router = KeyRouter::new();
        {
            let mut viewer = viewer();
            viewer.activate_keys(&router);
            assert_eq!(router.listener_count(), 1);
        }
        assert_eq!(router.listener_count(), 0);
    }

    #[test]
    fn load_handle_is_inert_after_teardown() {
        let viewer = viewer();
        let handle = viewer.load_handle();
        assert!(handle.mark_loaded(0));
        assert!(!handle.mark_loaded(0));
        assert_eq!(viewer.loaded_count(), 1);
        drop(viewer);
        assert!(!handle.mark_loaded(1));
    }

    #[test]
    fn frames_are_scheduled_batch_by_batch() {
        let mut viewer = viewer();
        let first = viewer.frames_to_start();
        assert_eq!(first, (0..24).collect::<Vec<_>>());
        assert!(viewer.frames_to_start().is_empty());

        for i in 0..12 {
            viewer.mark_loaded(i);
        }
        assert_eq!(viewer.frames_to_start(), (24..48).collect::<Vec<_>>());

        for i in 12..36 {
            viewer.mark_loaded(i);
        }
        assert_eq!(viewer.frames_to_start(), (48..72).collect::<Vec<_>>());
        assert!(viewer.frames_to_start().is_empty());
    }

    #[test]
    fn eager_mode_schedules_everything_and_stages_neighbours() {
        let mut config = ViewerConfig::default();
        config.loading.progressive = false;
        let mut viewer = SpinViewer::new(&config).unwrap();
        assert_eq!(viewer.frames_to_start().len(), 72);

        for i in 0..72 {
            viewer.mark_loaded(i);
        }
        let plan = viewer.render_plan();
        assert!(!plan.show_progress);
        assert_eq!(plan.staged_count(), 6);
        assert_eq!(viewer.tier_of(71), DisplayTier::Staged);
        assert_eq!(viewer.tier_of(36), DisplayTier::Hidden);
    }
}
