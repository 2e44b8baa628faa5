//! Frame timing for the simulation tick.

/// Default upper bound for a single simulation step (seconds).
pub const DEFAULT_MAX_STEP: f32 = 0.05;

/// Turns raw frame deltas into clamped simulation steps.
///
/// The presentation shell owns the real clock and hands us whatever delta it
/// measured; a frame hitch must not teleport entities, so every step is
/// clamped to `max_step`. There is no sub-stepping.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Largest step ever simulated in one tick.
    max_step: f32,
    /// Last clamped delta.
    delta: f32,
    /// Simulated seconds since the clock started.
    elapsed: f32,
    /// Ticks since the clock started.
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEP)
    }
}

impl FrameClock {
    pub fn new(max_step: f32) -> Self {
        Self {
            max_step: if max_step > 0.0 { max_step } else { DEFAULT_MAX_STEP },
            delta: 0.0,
            elapsed: 0.0,
            frame_count: 0,
        }
    }

    /// Clamp `raw_dt` and advance. Negative or NaN deltas become zero.
    pub fn advance(&mut self, raw_dt: f32) -> f32 {
        let dt = if raw_dt.is_nan() {
            0.0
        } else {
            raw_dt.clamp(0.0, self.max_step)
        };
        self.delta = dt;
        self.elapsed += dt;
        self.frame_count += 1;
        dt
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn max_step(&self) -> f32 {
        self.max_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hitch_is_clamped_to_max_step() {
        let mut clock = FrameClock::new(0.05);
        assert_eq!(clock.advance(0.5), 0.05);
        assert_eq!(clock.advance(0.016), 0.016);
        assert_eq!(clock.frame_count(), 2);
        assert!((clock.elapsed_seconds() - 0.066).abs() < 1e-6);
    }

    #[test]
    fn bad_deltas_do_not_move_time() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(-1.0), 0.0);
        assert_eq!(clock.advance(f32::NAN), 0.0);
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }
}
