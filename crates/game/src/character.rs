//! A single squad member.

use engine_core::{ease, Cooldown, Health, LifeState, Vec2};

use crate::balance::{CharacterKind, CharacterStats};

/// Seconds a member stays visible after its killing blow.
pub const DEATH_DURATION: f32 = 0.2;
/// Seconds of hit flash.
pub const FLASH_DURATION: f32 = 0.1;
/// Position easing toward the formation slot, per second.
const FOLLOW_RATE: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct Character {
    /// Stable id, unique within a run.
    pub id: u32,
    pub kind: CharacterKind,
    pub pos: Vec2,
    /// Formation slot the member eases toward.
    pub target: Vec2,
    /// Offset of that slot from the squad anchor.
    pub slot: Vec2,
    pub health: Health,
    /// Effective stats (balance table with upgrades folded in).
    pub stats: CharacterStats,
    fire_cooldown: Cooldown,
    pub flash: f32,
    pub life: LifeState,
}

impl Character {
    pub fn new(id: u32, kind: CharacterKind, stats: CharacterStats, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            target: pos,
            slot: Vec2::ZERO,
            health: Health::new(stats.hp),
            stats,
            // Stagger the first volley so a fresh squad doesn't fire in lockstep.
            fire_cooldown: Cooldown((id % 4) as f32 * 0.05),
            flash: 0.0,
            life: LifeState::Alive,
        }
    }

    pub fn update(&mut self, dt: f32) {
        if self.life.tick(dt) {
            return;
        }
        if !self.life.is_active() {
            return;
        }
        self.pos = ease(self.pos, self.target, FOLLOW_RATE, dt);
        self.fire_cooldown.tick(dt);
        self.flash = (self.flash - dt).max(0.0);
    }

    /// Apply damage. Returns true only on the killing blow.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.life.is_alive() {
            return false;
        }
        self.flash = FLASH_DURATION;
        if self.health.take_damage(amount) {
            self.life.begin_dying(DEATH_DURATION);
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        if self.life.is_alive() {
            self.health.heal(amount);
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life.is_alive()
    }

    pub fn is_active(&self) -> bool {
        self.life.is_active()
    }

    pub fn can_fire(&self) -> bool {
        self.life.is_alive() && self.fire_cooldown.ready()
    }

    /// Restart the fire cooldown. `rate_mult` > 1 fires faster.
    pub fn fire(&mut self, rate_mult: f32) {
        let mult = if rate_mult > 0.0 { rate_mult } else { 1.0 };
        self.fire_cooldown.set(self.stats.fire_interval / mult);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifleman() -> Character {
        let kind = CharacterKind::Rifleman;
        Character::new(0, kind, kind.default_stats(), Vec2::new(200.0, 600.0))
    }

    #[test]
    fn fire_respects_cooldown_and_rate_buff() {
        let mut c = rifleman();
        assert!(c.can_fire());
        c.fire(2.0);
        assert!(!c.can_fire());
        c.update(0.19);
        assert!(!c.can_fire());
        c.update(0.02);
        assert!(c.can_fire());
    }

    #[test]
    fn death_window_lasts_exactly_the_decay_duration() {
        let mut c = rifleman();
        assert!(c.take_damage(1000.0));
        assert!(!c.take_damage(10.0), "dying members take no further damage");
        assert!(!c.can_fire());
        c.update(0.15);
        assert!(c.is_active());
        c.update(0.1);
        assert!(!c.is_active());
    }

    #[test]
    fn position_eases_toward_target() {
        let mut c = rifleman();
        c.target = Vec2::new(300.0, 600.0);
        c.update(0.05);
        assert!(c.pos.x > 200.0 && c.pos.x < 300.0);
    }

    #[test]
    fn nan_damage_is_ignored() {
        let mut c = rifleman();
        assert!(!c.take_damage(f32::NAN));
        assert!(!c.take_damage(-5.0));
        assert_eq!(c.health.current, c.health.max);
    }
}
