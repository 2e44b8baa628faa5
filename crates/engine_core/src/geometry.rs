//! Playfield bounds and small 2D helpers.
//!
//! Coordinates are canvas pixels: x grows right, y grows down. The squad
//! holds a fixed row near the bottom; enemies and road objects come from the
//! top.

use glam::Vec2;

/// The visible playfield and the road strip inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
    pub road_left: f32,
    pub road_right: f32,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 700.0,
            road_left: 50.0,
            road_right: 350.0,
        }
    }
}

impl Playfield {
    pub fn road_center(&self) -> f32 {
        (self.road_left + self.road_right) * 0.5
    }

    pub fn road_width(&self) -> f32 {
        self.road_right - self.road_left
    }

    /// Clamp an x coordinate onto the road, keeping `margin` from each edge.
    pub fn clamp_to_road(&self, x: f32, margin: f32) -> f32 {
        let lo = self.road_left + margin;
        let hi = self.road_right - margin;
        if lo > hi {
            self.road_center()
        } else {
            x.clamp(lo, hi)
        }
    }

    /// True when `p` lies outside the playfield grown by `margin` on every side.
    pub fn is_outside(&self, p: Vec2, margin: f32) -> bool {
        p.x < -margin || p.x > self.width + margin || p.y < -margin || p.y > self.height + margin
    }
}

/// Circle-vs-point test on squared distance.
#[inline]
pub fn within(a: Vec2, b: Vec2, radius: f32) -> bool {
    a.distance_squared(b) <= radius * radius
}

/// Move `current` toward `target` by at most `max_delta`.
#[inline]
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    let d = target - current;
    if d.abs() <= max_delta {
        target
    } else {
        current + d.signum() * max_delta
    }
}

/// Exponential-ish easing used for smoothed positions (`rate` per second).
#[inline]
pub fn ease(current: Vec2, target: Vec2, rate: f32, dt: f32) -> Vec2 {
    let t = (rate * dt).clamp(0.0, 1.0);
    current + (target - current) * t
}

/// Unit vector for an angle measured from +x, y down.
#[inline]
pub fn from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_to_road_respects_margin() {
        let p = Playfield::default();
        assert_eq!(p.clamp_to_road(0.0, 10.0), 60.0);
        assert_eq!(p.clamp_to_road(999.0, 10.0), 340.0);
        assert_eq!(p.clamp_to_road(200.0, 10.0), 200.0);
    }

    #[test]
    fn outside_uses_inset_margin() {
        let p = Playfield::default();
        assert!(!p.is_outside(Vec2::new(-10.0, 10.0), 20.0));
        assert!(p.is_outside(Vec2::new(-21.0, 10.0), 20.0));
        assert!(p.is_outside(Vec2::new(100.0, 721.0), 20.0));
    }

    #[test]
    fn approach_never_overshoots() {
        assert_eq!(approach(0.0, 10.0, 3.0), 3.0);
        assert_eq!(approach(9.0, 10.0, 3.0), 10.0);
        assert_eq!(approach(10.0, 0.0, 4.0), 6.0);
    }
}
