//! Rotation state — which frame of the ring is currently shown.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationState {
    active_index: usize,
    frame_count: usize,
}

impl RotationState {
    /// A fresh rotation starting at frame 0. `frame_count` is expected to be
    /// validated (non-zero) by the caller.
    pub fn new(frame_count: usize) -> Self {
        debug_assert!(frame_count > 0);
        Self {
            active_index: 0,
            frame_count,
        }
    }

    pub fn current_index(&self) -> usize {
        self.active_index
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Step the ring by `delta` frames, wrapping in both directions.
    pub fn apply_delta(&mut self, delta: i64) {
        // rem_euclid keeps the intermediate non-negative for any delta magnitude.
        let n = self.frame_count as i64;
        let next = (self.active_index as i64 + delta.rem_euclid(n)).rem_euclid(n);
        self.active_index = next as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let state = RotationState::new(72);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.frame_count(), 72);
    }

    #[test]
    fn negative_delta_wraps_backwards() {
        let mut state = RotationState::new(72);
        state.apply_delta(-3);
        assert_eq!(state.current_index(), 69);
    }

    #[test]
    fn positive_delta_wraps_at_the_end() {
        let mut state = RotationState::new(72);
        state.apply_delta(71);
        assert_eq!(state.current_index(), 71);
        state.apply_delta(1);
        assert_eq!(state.current_index(), 0);
    }

    #[test]
    fn full_turn_and_zero_are_identity() {
        let mut state = RotationState::new(72);
        state.apply_delta(5);
        state.apply_delta(72);
        assert_eq!(state.current_index(), 5);
        state.apply_delta(0);
        assert_eq!(state.current_index(), 5);
        state.apply_delta(-72 * 1000);
        assert_eq!(state.current_index(), 5);
    }

    #[test]
    fn delta_and_inverse_restore_index() {
        for start in [0_i64, 1, 35, 71] {
            for d in [-1000_i64, -73, -72, -1, 1, 2, 71, 72, 145, i64::MAX / 2] {
                let mut state = RotationState::new(72);
                state.apply_delta(start);
                state.apply_delta(d);
                assert!(state.current_index() < 72);
                state.apply_delta(-d);
                assert_eq!(state.current_index() as i64, start, "delta {d}");
            }
        }
    }

    #[test]
    fn extreme_deltas_stay_in_range() {
        let mut state = RotationState::new(7);
        for d in [i64::MIN, i64::MAX, i64::MIN + 1, -1, 1] {
            state.apply_delta(d);
            assert!(state.current_index() < 7);
        }
    }

    #[test]
    fn single_frame_ring_never_moves() {
        let mut state = RotationState::new(1);
        state.apply_delta(-5);
        state.apply_delta(9);
        assert_eq!(state.current_index(), 0);
    }
}
