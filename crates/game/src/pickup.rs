//! Road pickups: collectible items and traps.

use engine_core::{LifeState, Playfield, Vec2};

use crate::balance::{ItemKind, TrapKind};

/// Fade-out after collection or triggering.
pub const DECAY_DURATION: f32 = 0.3;
/// Collection radius around a pickup.
pub const PICKUP_RADIUS: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Item(ItemKind),
    Trap(TrapKind),
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub pos: Vec2,
    /// Set once when collected (items) or sprung (traps).
    pub triggered: bool,
    pub life: LifeState,
}

impl Pickup {
    pub fn new(id: u32, kind: PickupKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            triggered: false,
            life: LifeState::Alive,
        }
    }

    /// Scroll with the road. Pickups that leave the bottom are gone.
    pub fn update(&mut self, dt: f32, scroll_speed: f32, field: &Playfield) {
        if self.life.tick(dt) || !self.life.is_active() {
            return;
        }
        if !self.triggered {
            self.pos.y += scroll_speed * dt;
            if self.pos.y > field.height + PICKUP_RADIUS {
                self.life.deactivate();
            }
        }
    }

    /// Mark as collected/sprung and start the fade. Returns false if it
    /// already happened.
    pub fn trigger(&mut self) -> bool {
        if self.triggered || !self.life.begin_dying(DECAY_DURATION) {
            return false;
        }
        self.triggered = true;
        true
    }

    /// Taken by a thief: gone without a fade and without an effect.
    pub fn steal(&mut self) {
        self.triggered = true;
        self.life.deactivate();
    }

    /// An untouched item a thief may still go after.
    pub fn is_stealable(&self) -> bool {
        matches!(self.kind, PickupKind::Item(_)) && !self.triggered && self.life.is_alive()
    }

    pub fn is_active(&self) -> bool {
        self.life.is_active()
    }

    /// Decay progress in `0..=1` for fade rendering.
    pub fn fade(&self) -> f32 {
        match self.life {
            LifeState::Alive => 0.0,
            LifeState::Dying { remaining } => 1.0 - (remaining / DECAY_DURATION).clamp(0.0, 1.0),
            LifeState::Inactive => 1.0,
        }
    }
}
