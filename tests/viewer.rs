use spin_viewer::{
    config::ViewerConfig,
    engine::{SpinViewer, classify::classify, input::PressHandler, keys::KeyRouter},
    types::{DisplayTier, Polarity, SpinKey},
};

fn viewer() -> SpinViewer {
    SpinViewer::new(&ViewerConfig::default()).expect("default config is valid")
}

#[test]
fn drag_scenario_spins_backwards_through_zero() {
    let mut config = ViewerConfig::default();
    config.input.polarity = Polarity::FixedNegative;
    let mut viewer = SpinViewer::new(&config).unwrap();

    viewer.press_start(100.0, 200.0, 405.0, 0);
    viewer.press_move(130.0, 720.0, 20);
    viewer.press_end();

    assert_eq!(viewer.current_index(), 69);
    assert!(!viewer.is_dragging());
}

#[test]
fn step_left_wraps_from_last_frame() {
    let mut viewer = viewer();
    viewer.apply_delta(71);
    viewer.on_key(SpinKey::StepLeft);
    assert_eq!(viewer.current_index(), 0);
}

#[test]
fn keys_reach_viewer_through_router() {
    let router = KeyRouter::new();
    let mut viewer = viewer();
    viewer.activate_keys(&router);
    router.dispatch(SpinKey::StepRight);
    router.dispatch(SpinKey::StepRight);
    router.dispatch(SpinKey::Other);
    assert_eq!(viewer.current_index(), 70);
}

#[test]
fn fresh_viewer_stages_every_other_frame() {
    let viewer = viewer();
    assert_eq!(viewer.percent_loaded(), 0);
    let tiers = viewer.tiers();
    assert_eq!(tiers[0], DisplayTier::Active);
    assert!(tiers[1..].iter().all(|t| *t == DisplayTier::Staged));

    let plan = viewer.render_plan();
    assert!(plan.show_progress);
    assert_eq!(plan.stacking_order().last(), Some(&0));
}

#[test]
fn fully_loaded_viewer_hides_inactive_frames() {
    let mut viewer = viewer();
    for i in 0..72 {
        viewer.mark_loaded(i);
    }
    viewer.apply_delta(-1);
    assert_eq!(viewer.percent_loaded(), 100);
    assert!(!viewer.is_loading());
    let tiers = viewer.tiers();
    assert_eq!(tiers[71], DisplayTier::Active);
    assert_eq!(tiers.iter().filter(|t| **t == DisplayTier::Hidden).count(), 71);
    assert!(!viewer.render_plan().show_progress);
}

#[test]
fn batch_eligibility_follows_loaded_count() {
    let mut viewer = viewer();
    assert!(viewer.is_eligible_to_start_loading(0));
    assert!(!viewer.is_eligible_to_start_loading(24));
    for i in 0..12 {
        viewer.mark_loaded(i);
    }
    assert!(viewer.is_eligible_to_start_loading(24));
    assert!(!viewer.is_eligible_to_start_loading(48));
    for i in 12..36 {
        viewer.mark_loaded(i);
    }
    assert!(viewer.is_eligible_to_start_loading(48));
}

#[test]
fn rotation_and_loading_interleave_freely() {
    let mut viewer = viewer();
    let handle = viewer.load_handle();
    for i in 0..72 {
        viewer.apply_delta(5);
        handle.mark_loaded((i * 7) % 72);
        handle.mark_loaded((i * 7) % 72);
        let active = viewer.current_index();
        assert_eq!(viewer.tier_of(active), DisplayTier::Active);
        assert_eq!(classify(active, active, viewer.is_loading()), DisplayTier::Active);
    }
    assert_eq!(viewer.loaded_count(), 72);
    assert_eq!(viewer.current_index(), (72 * 5) % 72);
}

#[test]
fn config_file_drives_viewer() -> anyhow::Result<()> {
    let json = r#"{ "ring": { "frame_count": 36 }, "loading": { "progressive": false } }"#;
    let config: ViewerConfig = serde_json::from_str(json)?;
    let mut viewer = SpinViewer::new(&config)?;
    assert_eq!(viewer.frame_count(), 36);
    assert_eq!(viewer.frames_to_start().len(), 36);
    viewer.on_key(SpinKey::StepRight);
    assert_eq!(viewer.current_index(), 35);
    Ok(())
}
