//! Read-only view of a run for the presentation layer.
//!
//! Borrowed from the controller for one frame; nothing here can mutate the
//! simulation.

use engine_core::Playfield;

use crate::boss::Boss;
use crate::buffs::Buffs;
use crate::bullet::BulletPool;
use crate::config::RunMode;
use crate::difficulty::threat_label;
use crate::enemy::Enemy;
use crate::gate::Gate;
use crate::pickup::Pickup;
use crate::run::{RunPhase, RunStats, SegmentKind};
use crate::squad::{Rank, Squad};

pub struct RunSnapshot<'a> {
    pub mode: RunMode,
    /// Effective stage (raised by endless cycles).
    pub stage: u32,
    pub phase: RunPhase,
    pub segment: SegmentKind,
    pub segment_index: u32,
    /// Seconds left on the road/combat timer; zero once it expired.
    pub segment_remaining: f32,
    pub cycles: u32,
    pub elapsed: f32,
    pub field: &'a Playfield,
    pub squad: &'a Squad,
    pub enemies: &'a [Enemy],
    pub boss: Option<&'a Boss>,
    pub pickups: &'a [Pickup],
    pub gates: &'a [Gate],
    pub bullets: &'a BulletPool,
    pub buffs: &'a Buffs,
    pub stats: &'a RunStats,
}

impl<'a> RunSnapshot<'a> {
    pub fn squad_size(&self) -> usize {
        self.squad.size()
    }

    pub fn rank(&self) -> Rank {
        self.squad.rank()
    }

    pub fn threat(&self) -> &'static str {
        threat_label(self.stage)
    }

    /// Boss hp in `0..=1`, `None` outside a boss fight.
    pub fn boss_health(&self) -> Option<f32> {
        self.boss.map(|b| b.health.percentage())
    }

    pub fn alive_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }

    /// One-line HUD summary.
    pub fn hud_line(&self) -> String {
        format!(
            "stage {} ({}) | {:?} | {} {} | kills {} | gold {} | combo {}",
            self.stage,
            self.threat(),
            self.segment,
            self.rank().name(),
            self.squad_size(),
            self.stats.kills,
            self.stats.gold,
            self.stats.combo,
        )
    }
}
