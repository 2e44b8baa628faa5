//! Common components shared by every simulated entity.

/// Hit points for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = sanitize(max);
        Self { current: max, max }
    }

    /// Subtract `amount` and report whether this call emptied the pool.
    ///
    /// Negative and NaN amounts count as zero. A pool that is already empty
    /// (or was corrupted to NaN) reports `true` so the caller still runs its
    /// death transition.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let amount = sanitize(amount);
        self.current = sanitize(self.current - amount);
        self.is_dead()
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + sanitize(amount)).min(self.max);
    }

    /// Zero or NaN hp is dead.
    pub fn is_dead(&self) -> bool {
        !(self.current > 0.0)
    }

    pub fn percentage(&self) -> f32 {
        if self.max > 0.0 {
            (self.current / self.max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Clamp to a finite, non-negative value.
#[inline]
fn sanitize(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.max(0.0)
    }
}

/// Lifecycle shared by characters, enemies, bosses and pickups.
///
/// `Dying` keeps the entity in its collection (and visible) until the decay
/// timer runs out; only `Inactive` entities are pruned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LifeState {
    #[default]
    Alive,
    Dying { remaining: f32 },
    Inactive,
}

impl LifeState {
    pub fn is_alive(&self) -> bool {
        matches!(self, LifeState::Alive)
    }

    pub fn is_dying(&self) -> bool {
        matches!(self, LifeState::Dying { .. })
    }

    /// Alive or dying.
    pub fn is_active(&self) -> bool {
        !matches!(self, LifeState::Inactive)
    }

    /// Start the decay window. Returns false if the entity was not alive.
    pub fn begin_dying(&mut self, duration: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        *self = LifeState::Dying {
            remaining: duration.max(0.0),
        };
        true
    }

    /// Advance the decay timer. Returns true on the tick the entity goes inactive.
    pub fn tick(&mut self, dt: f32) -> bool {
        if let LifeState::Dying { remaining } = self {
            *remaining -= dt.max(0.0);
            if *remaining <= 0.0 {
                *self = LifeState::Inactive;
                return true;
            }
        }
        false
    }

    /// Leave without a death window (escaped off-screen, stolen, aborted).
    pub fn deactivate(&mut self) {
        *self = LifeState::Inactive;
    }
}

/// Countdown timer driven by the simulation tick.
///
/// Replaces wall-clock callbacks: a pending continuation is just a
/// `Countdown` that somebody ticks, and cancelling it is `clear()`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Countdown {
    remaining: Option<f32>,
}

impl Countdown {
    pub fn idle() -> Self {
        Self { remaining: None }
    }

    pub fn started(seconds: f32) -> Self {
        Self {
            remaining: Some(seconds.max(0.0)),
        }
    }

    pub fn start(&mut self, seconds: f32) {
        self.remaining = Some(seconds.max(0.0));
    }

    pub fn clear(&mut self) {
        self.remaining = None;
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> f32 {
        self.remaining.unwrap_or(0.0)
    }

    /// Tick down. Returns true exactly once, on the tick the countdown fires.
    pub fn tick(&mut self, dt: f32) -> bool {
        match self.remaining.as_mut() {
            Some(r) => {
                *r -= dt.max(0.0);
                if *r <= 0.0 {
                    self.remaining = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}

/// Non-negative cooldown that ticks toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cooldown(pub f32);

impl Cooldown {
    pub fn ready(&self) -> bool {
        self.0 <= 0.0
    }

    pub fn tick(&mut self, dt: f32) {
        self.0 = (self.0 - dt.max(0.0)).max(0.0);
    }

    pub fn set(&mut self, seconds: f32) {
        self.0 = seconds.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_ignores_negative_and_nan_damage() {
        let mut h = Health::new(50.0);
        assert!(!h.take_damage(-10.0));
        assert!(!h.take_damage(f32::NAN));
        assert_eq!(h.current, 50.0);
    }

    #[test]
    fn health_clamps_at_zero_and_reports_death() {
        let mut h = Health::new(10.0);
        assert!(h.take_damage(25.0));
        assert_eq!(h.current, 0.0);
        // Already empty: still dead, never negative.
        assert!(h.take_damage(5.0));
        assert_eq!(h.current, 0.0);
    }

    #[test]
    fn nan_hp_counts_as_dead() {
        let mut h = Health::new(10.0);
        h.current = f32::NAN;
        assert!(h.is_dead());
        assert!(h.take_damage(0.0));
    }

    #[test]
    fn life_state_goes_inactive_only_after_duration() {
        let mut s = LifeState::Alive;
        assert!(s.begin_dying(0.2));
        assert!(!s.begin_dying(0.2), "second death must be ignored");
        assert!(!s.tick(0.1));
        assert!(s.is_active());
        assert!(!s.tick(0.05));
        assert!(s.is_active());
        assert!(s.tick(0.06));
        assert!(!s.is_active());
    }

    #[test]
    fn countdown_fires_once_and_can_be_cancelled() {
        let mut c = Countdown::started(1.0);
        assert!(!c.tick(0.5));
        assert!(c.tick(0.6));
        assert!(!c.tick(1.0));

        let mut c = Countdown::started(1.0);
        c.clear();
        assert!(!c.tick(5.0));
    }
}
