//! Weighted-random spawn tables for enemies, waves, road pickups and gates.
//!
//! Stage number unlocks enemy kinds (`min_stage`) and sets the wave size and
//! per-segment wave cap. All randomness in a run flows through the one
//! seeded `StdRng` owned here.

use engine_core::{Playfield, Vec2};
use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::balance::{Balance, BossKind, EnemyKind, ItemKind, TrapKind};
use crate::difficulty::StageScaling;
use crate::enemy::Enemy;
use crate::gate::{Gate, GateOp};
use crate::pickup::{Pickup, PickupKind};

/// Seconds between waves at stage 1.
const BASE_WAVE_INTERVAL: f32 = 3.5;
/// Seconds between road pickups at stage 1.
const BASE_ITEM_INTERVAL: f32 = 2.5;
/// Seconds between gates on the road.
pub const GATE_INTERVAL: f32 = 5.0;
/// Seconds between sparse item drops during combat.
const COMBAT_ITEM_INTERVAL: f32 = 6.0;
/// Spawn row above the visible playfield.
const SPAWN_Y: f32 = -20.0;
const WAVE_ROW_GAP: f32 = 34.0;

/// Draw one entry from a weighted table. `None` when no weight is positive.
fn pick_weighted<T: Copy, R: Rng>(rng: &mut R, table: &[(T, f32)]) -> Option<T> {
    let dist = WeightedIndex::new(table.iter().map(|(_, w)| w.max(0.0))).ok()?;
    Some(table[dist.sample(rng)].0)
}

pub struct Spawner {
    rng: StdRng,
    pub scaling: StageScaling,
    next_id: u32,
}

impl Spawner {
    pub fn new(seed: Option<u64>, scaling: StageScaling) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            scaling,
            next_id: 0,
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Fresh id for an enemy, pickup or gate.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn stage(&self) -> u32 {
        self.scaling.stage
    }

    // ── Cadences ────────────────────────────────────────────────────────

    pub fn wave_interval(&self) -> f32 {
        BASE_WAVE_INTERVAL * self.scaling.spawn_interval
    }

    pub fn item_interval(&self) -> f32 {
        BASE_ITEM_INTERVAL * self.scaling.item_interval
    }

    pub fn combat_item_interval(&self) -> f32 {
        COMBAT_ITEM_INTERVAL * self.scaling.item_interval
    }

    /// Waves allowed per combat segment.
    pub fn wave_cap(&self) -> u32 {
        (4 + self.stage() / 2).min(8)
    }

    pub fn wave_size(&self, wave_index: u32) -> u32 {
        3 + self.stage() / 2 + wave_index
    }

    // ── Enemies ─────────────────────────────────────────────────────────

    /// Weighted draw among kinds unlocked at this stage.
    pub fn pick_enemy_kind(&mut self, balance: &Balance) -> Option<EnemyKind> {
        let stage = self.stage();
        let table: Vec<(EnemyKind, f32)> = EnemyKind::ALL
            .iter()
            .map(|&k| (k, balance.enemy(k)))
            .filter(|(_, s)| s.min_stage <= stage)
            .map(|(k, s)| (k, s.spawn_weight))
            .collect();
        pick_weighted(&mut self.rng, &table)
    }

    pub fn enemy(&mut self, balance: &Balance, kind: EnemyKind, pos: Vec2) -> Enemy {
        let id = self.next_id();
        log::debug!("spawn {} #{} at ({:.0}, {:.0})", kind.name(), id, pos.x, pos.y);
        Enemy::spawn(id, kind, &balance.enemy(kind), &self.scaling, pos)
    }

    /// One wave, laid out in rows across the road above the playfield.
    pub fn wave(&mut self, balance: &Balance, wave_index: u32, field: &Playfield) -> Vec<Enemy> {
        let count = self.wave_size(wave_index);
        let per_row = 5u32;
        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count {
            let Some(kind) = self.pick_enemy_kind(balance) else {
                log::warn!("no enemy kind unlocked for stage {}", self.stage());
                break;
            };
            let row = i / per_row;
            let col = i % per_row;
            let lane = (col as f32 + 0.5) / per_row as f32;
            let jitter = self.rng.gen_range(-8.0..=8.0);
            let x = field.clamp_to_road(field.road_left + lane * field.road_width() + jitter, 12.0);
            let y = SPAWN_Y - row as f32 * WAVE_ROW_GAP;
            out.push(self.enemy(balance, kind, Vec2::new(x, y)));
        }
        out
    }

    /// Minions summoned by a boss, dropped just below it.
    pub fn minion(&mut self, balance: &Balance, boss: BossKind, boss_pos: Vec2, field: &Playfield) -> Enemy {
        let kind = match boss {
            BossKind::Broodmother => EnemyKind::Rusher,
            BossKind::Colossus | BossKind::Juggernaut | BossKind::Overlord => {
                if self.rng.gen_bool(0.7) {
                    EnemyKind::Rusher
                } else {
                    EnemyKind::Flanker
                }
            }
        };
        let dx = self.rng.gen_range(-60.0..=60.0);
        let pos = Vec2::new(field.clamp_to_road(boss_pos.x + dx, 12.0), boss_pos.y + 40.0);
        self.enemy(balance, kind, pos)
    }

    // ── Road objects ────────────────────────────────────────────────────

    fn road_x(&mut self, field: &Playfield) -> f32 {
        let margin = 24.0;
        self.rng.gen_range(field.road_left + margin..=field.road_right - margin)
    }

    pub fn item(&mut self, balance: &Balance, field: &Playfield) -> Option<Pickup> {
        let table: Vec<(ItemKind, f32)> = ItemKind::ALL.iter().map(|&k| (k, balance.item(k).weight)).collect();
        let kind = pick_weighted(&mut self.rng, &table)?;
        let pos = Vec2::new(self.road_x(field), SPAWN_Y);
        Some(Pickup::new(self.next_id(), PickupKind::Item(kind), pos))
    }

    pub fn trap(&mut self, balance: &Balance, field: &Playfield) -> Option<Pickup> {
        let table: Vec<(TrapKind, f32)> = TrapKind::ALL.iter().map(|&k| (k, balance.trap(k).weight)).collect();
        let kind = pick_weighted(&mut self.rng, &table)?;
        let pos = Vec2::new(self.road_x(field), SPAWN_Y);
        Some(Pickup::new(self.next_id(), PickupKind::Trap(kind), pos))
    }

    /// Road pickup: traps appear from stage 2 on, one in four draws.
    pub fn road_pickup(&mut self, balance: &Balance, field: &Playfield) -> Option<Pickup> {
        if self.stage() >= 2 && self.rng.gen_bool(0.25) {
            self.trap(balance, field)
        } else {
            self.item(balance, field)
        }
    }

    /// A gate with two different options.
    pub fn gate(&mut self, balance: &Balance) -> Option<Gate> {
        let table: Vec<(GateOp, f32)> = balance.gates().iter().map(|g| (g.op, g.weight)).collect();
        let left = pick_weighted(&mut self.rng, &table)?;
        let mut right = left;
        for _ in 0..8 {
            right = pick_weighted(&mut self.rng, &table)?;
            if right != left {
                break;
            }
        }
        if right == left {
            if let Some((op, _)) = table.iter().find(|(op, w)| *op != left && *w > 0.0) {
                right = *op;
            }
        }
        Some(Gate::new(self.next_id(), left, right, SPAWN_Y))
    }
}
