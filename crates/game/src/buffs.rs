//! Temporary squad buffs: timed multipliers and shield charges.

use serde::{Deserialize, Serialize};

/// Timed multiplier families. One active instance per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffKind {
    /// Divides every member's fire interval.
    RapidFire,
    /// Multiplies outgoing bullet damage.
    DamageUp,
}

/// What an item or gate hands out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BuffGrant {
    Timed {
        kind: BuffKind,
        multiplier: f32,
        duration: f32,
    },
    /// Each charge absorbs one enemy bullet.
    Shield { charges: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedBuff {
    pub kind: BuffKind,
    pub multiplier: f32,
    pub remaining: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Buffs {
    timed: Vec<TimedBuff>,
    pub shield_charges: u32,
    /// Bullets absorbed by shield charges this run.
    pub shield_used: u32,
}

impl Buffs {
    pub fn with_shield(charges: u32) -> Self {
        Self {
            shield_charges: charges,
            ..Default::default()
        }
    }

    pub fn grant(&mut self, grant: BuffGrant) {
        match grant {
            BuffGrant::Timed {
                kind,
                multiplier,
                duration,
            } => {
                if !(multiplier > 0.0) || !(duration > 0.0) {
                    log::warn!("ignoring degenerate {:?} buff ({} for {}s)", kind, multiplier, duration);
                    return;
                }
                // Re-granting refreshes: keep the stronger multiplier and the longer tail.
                if let Some(active) = self.timed.iter_mut().find(|b| b.kind == kind) {
                    active.multiplier = active.multiplier.max(multiplier);
                    active.remaining = active.remaining.max(duration);
                } else {
                    self.timed.push(TimedBuff {
                        kind,
                        multiplier,
                        remaining: duration,
                    });
                }
            }
            BuffGrant::Shield { charges } => {
                self.shield_charges = self.shield_charges.saturating_add(charges);
            }
        }
    }

    pub fn update(&mut self, dt: f32) {
        for b in &mut self.timed {
            b.remaining -= dt;
        }
        self.timed.retain(|b| b.remaining > 0.0);
    }

    fn multiplier(&self, kind: BuffKind) -> f32 {
        self.timed
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.multiplier)
            .unwrap_or(1.0)
    }

    pub fn fire_rate_multiplier(&self) -> f32 {
        self.multiplier(BuffKind::RapidFire)
    }

    pub fn damage_multiplier(&self) -> f32 {
        self.multiplier(BuffKind::DamageUp)
    }

    /// Spend one shield charge if available.
    pub fn absorb_hit(&mut self) -> bool {
        if self.shield_charges > 0 {
            self.shield_charges -= 1;
            self.shield_used += 1;
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> &[TimedBuff] {
        &self.timed
    }

    pub fn clear(&mut self) {
        self.timed.clear();
        self.shield_charges = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_buff_expires() {
        let mut b = Buffs::default();
        b.grant(BuffGrant::Timed {
            kind: BuffKind::RapidFire,
            multiplier: 1.5,
            duration: 1.0,
        });
        assert_eq!(b.fire_rate_multiplier(), 1.5);
        b.update(0.6);
        assert_eq!(b.fire_rate_multiplier(), 1.5);
        b.update(0.6);
        assert_eq!(b.fire_rate_multiplier(), 1.0);
        assert!(b.active().is_empty());
    }

    #[test]
    fn regrant_refreshes_instead_of_stacking() {
        let mut b = Buffs::default();
        let g = BuffGrant::Timed {
            kind: BuffKind::DamageUp,
            multiplier: 1.5,
            duration: 2.0,
        };
        b.grant(g);
        b.update(1.5);
        b.grant(g);
        assert_eq!(b.active().len(), 1);
        assert_eq!(b.active()[0].remaining, 2.0);
        assert_eq!(b.damage_multiplier(), 1.5);
    }

    #[test]
    fn shield_charges_absorb_then_run_out() {
        let mut b = Buffs::with_shield(1);
        b.grant(BuffGrant::Shield { charges: 1 });
        assert!(b.absorb_hit());
        assert!(b.absorb_hit());
        assert!(!b.absorb_hit());
        assert_eq!(b.shield_used, 2);
    }
}
