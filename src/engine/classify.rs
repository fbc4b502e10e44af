//! Display classifier — assigns every frame a render tier.

use crate::types::DisplayTier;

/// While any frame is still loading, every inactive frame stays staged so the
/// first time it becomes active it is already decoded and mounted.
pub fn classify(active_index: usize, frame_index: usize, still_loading: bool) -> DisplayTier {
    if frame_index == active_index {
        DisplayTier::Active
    } else if still_loading {
        DisplayTier::Staged
    } else {
        DisplayTier::Hidden
    }
}

/// Steps between two frames going the short way around the ring.
///
/// This wraps at the seam, so frame 0 and the last frame are neighbours. A
/// plain `|a - b|` would leave frames across the seam hidden even though one
/// drag step reaches them.
pub fn ring_distance(a: usize, b: usize, frame_count: usize) -> usize {
    let d = a.abs_diff(b) % frame_count;
    d.min(frame_count - d)
}

/// Tiers for the whole ring. With a `stage_radius`, frames that close to the
/// active one stay staged after loading completes.
pub fn classify_ring(
    active_index: usize,
    frame_count: usize,
    still_loading: bool,
    stage_radius: Option<usize>,
) -> Vec<DisplayTier> {
    (0..frame_count)
        .map(|i| match classify(active_index, i, still_loading) {
            DisplayTier::Hidden
                if stage_radius
                    .is_some_and(|r| ring_distance(active_index, i, frame_count) <= r) =>
            {
                DisplayTier::Staged
            }
            tier => tier,
        })
        .collect()
}
