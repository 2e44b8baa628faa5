//! Balance tables: every tunable number the simulation reads.
//!
//! Built-in defaults live in the per-kind `default_stats()` tables below. A
//! host can override any subset from RON; kinds missing from the override
//! keep their defaults, unknown kind names are rejected by the parser.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::buffs::{BuffGrant, BuffKind};
use crate::error::{parse_kind, SimError};
use crate::gate::GateOp;

// ── Squad members ───────────────────────────────────────────────────────

/// Kind of squad member (affects weapon archetype, stats and formation rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacterKind {
    /// Baseline single-shot trooper.
    Rifleman,
    /// Heavy armour, short range, front rank.
    Tanker,
    /// Long range, piercing rounds.
    Sniper,
    /// Explosive rounds with splash damage.
    Bomber,
    /// Short-range spread fan.
    Gunner,
}

impl CharacterKind {
    pub const ALL: [CharacterKind; 5] = [
        CharacterKind::Rifleman,
        CharacterKind::Tanker,
        CharacterKind::Sniper,
        CharacterKind::Bomber,
        CharacterKind::Gunner,
    ];

    const NAMES: [(&'static str, CharacterKind); 5] = [
        ("rifleman", CharacterKind::Rifleman),
        ("tanker", CharacterKind::Tanker),
        ("sniper", CharacterKind::Sniper),
        ("bomber", CharacterKind::Bomber),
        ("gunner", CharacterKind::Gunner),
    ];

    pub fn name(self) -> &'static str {
        match self {
            CharacterKind::Rifleman => "rifleman",
            CharacterKind::Tanker => "tanker",
            CharacterKind::Sniper => "sniper",
            CharacterKind::Bomber => "bomber",
            CharacterKind::Gunner => "gunner",
        }
    }

    /// Formation ordering: lower ranks stand closer to the front.
    pub fn formation_priority(self) -> u8 {
        match self {
            CharacterKind::Tanker => 0,
            CharacterKind::Bomber => 1,
            CharacterKind::Rifleman => 2,
            CharacterKind::Sniper => 3,
            CharacterKind::Gunner => 4,
        }
    }

    pub fn default_stats(self) -> CharacterStats {
        match self {
            CharacterKind::Rifleman => CharacterStats {
                damage: 10.0,
                range: 320.0,
                fire_interval: 0.4,
                hp: 30.0,
                size: 8.0,
                bullet_speed: 520.0,
                weapon: Weapon::Single,
            },
            CharacterKind::Tanker => CharacterStats {
                damage: 8.0,
                range: 220.0,
                fire_interval: 0.6,
                hp: 90.0,
                size: 11.0,
                bullet_speed: 480.0,
                weapon: Weapon::Single,
            },
            CharacterKind::Sniper => CharacterStats {
                damage: 30.0,
                range: 520.0,
                fire_interval: 1.2,
                hp: 20.0,
                size: 8.0,
                bullet_speed: 760.0,
                weapon: Weapon::Pierce,
            },
            CharacterKind::Bomber => CharacterStats {
                damage: 20.0,
                range: 280.0,
                fire_interval: 1.0,
                hp: 30.0,
                size: 9.0,
                bullet_speed: 380.0,
                weapon: Weapon::Aoe { radius: 40.0 },
            },
            CharacterKind::Gunner => CharacterStats {
                damage: 6.0,
                range: 240.0,
                fire_interval: 0.5,
                hp: 35.0,
                size: 9.0,
                bullet_speed: 500.0,
                weapon: Weapon::Spread { count: 3, arc: 0.35 },
            },
        }
    }
}

impl FromStr for CharacterKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind("character", s, &Self::NAMES)
    }
}

/// Weapon archetype fired by a squad member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Weapon {
    Single,
    /// Laser-like round that passes through up to four enemies.
    Pierce,
    /// Splash round: half damage (rounded up) to everything within `radius`.
    Aoe { radius: f32 },
    /// `count` rounds fanned across `arc` radians.
    Spread { count: u32, arc: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub damage: f32,
    pub range: f32,
    pub fire_interval: f32,
    pub hp: f32,
    /// Body radius in pixels.
    pub size: f32,
    pub bullet_speed: f32,
    pub weapon: Weapon,
}

// ── Enemies ─────────────────────────────────────────────────────────────

/// Types of enemies with different movement and attack policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Charges the squad and dies on contact.
    Rusher,
    /// Slow descent, ranged fire.
    Shooter,
    /// Holds at a fixed depth and lobs telegraphed shells.
    Mortar,
    /// Arms a fuse near the squad and explodes.
    Detonator,
    /// Steals road items.
    Thief,
    /// Bounces across the road.
    Flanker,
    /// Heavy melee, slow.
    Tank,
    /// Mid-weight melee.
    Brute,
    /// Shooter variant firing a three-round fan.
    Elite,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 9] = [
        EnemyKind::Rusher,
        EnemyKind::Shooter,
        EnemyKind::Mortar,
        EnemyKind::Detonator,
        EnemyKind::Thief,
        EnemyKind::Flanker,
        EnemyKind::Tank,
        EnemyKind::Brute,
        EnemyKind::Elite,
    ];

    const NAMES: [(&'static str, EnemyKind); 9] = [
        ("rusher", EnemyKind::Rusher),
        ("shooter", EnemyKind::Shooter),
        ("mortar", EnemyKind::Mortar),
        ("detonator", EnemyKind::Detonator),
        ("thief", EnemyKind::Thief),
        ("flanker", EnemyKind::Flanker),
        ("tank", EnemyKind::Tank),
        ("brute", EnemyKind::Brute),
        ("elite", EnemyKind::Elite),
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Rusher => "rusher",
            EnemyKind::Shooter => "shooter",
            EnemyKind::Mortar => "mortar",
            EnemyKind::Detonator => "detonator",
            EnemyKind::Thief => "thief",
            EnemyKind::Flanker => "flanker",
            EnemyKind::Tank => "tank",
            EnemyKind::Brute => "brute",
            EnemyKind::Elite => "elite",
        }
    }

    /// Contact-damage enemies resolved by the melee collision pass.
    pub fn is_melee(self) -> bool {
        matches!(self, EnemyKind::Rusher | EnemyKind::Tank | EnemyKind::Brute)
    }

    pub fn default_stats(self) -> EnemyStats {
        let base = EnemyStats {
            hp: 20.0,
            speed: 90.0,
            damage: 10.0,
            reward: 2,
            min_stage: 1,
            radius: 10.0,
            fire_interval: 0.0,
            contact_cooldown: 0.0,
            spawn_weight: 1.0,
        };
        match self {
            EnemyKind::Rusher => EnemyStats {
                spawn_weight: 5.0,
                ..base
            },
            EnemyKind::Shooter => EnemyStats {
                hp: 30.0,
                speed: 60.0,
                damage: 8.0,
                reward: 3,
                radius: 11.0,
                fire_interval: 2.0,
                spawn_weight: 3.0,
                ..base
            },
            EnemyKind::Mortar => EnemyStats {
                hp: 45.0,
                speed: 50.0,
                damage: 15.0,
                reward: 5,
                min_stage: 3,
                radius: 12.0,
                fire_interval: 3.5,
                spawn_weight: 1.5,
                ..base
            },
            EnemyKind::Detonator => EnemyStats {
                hp: 25.0,
                speed: 80.0,
                damage: 30.0,
                reward: 4,
                min_stage: 2,
                spawn_weight: 1.5,
                ..base
            },
            EnemyKind::Thief => EnemyStats {
                speed: 110.0,
                damage: 0.0,
                reward: 6,
                min_stage: 2,
                radius: 9.0,
                spawn_weight: 1.0,
                ..base
            },
            EnemyKind::Flanker => EnemyStats {
                hp: 25.0,
                speed: 100.0,
                reward: 3,
                min_stage: 2,
                spawn_weight: 2.0,
                ..base
            },
            EnemyKind::Tank => EnemyStats {
                hp: 150.0,
                speed: 35.0,
                damage: 20.0,
                reward: 10,
                min_stage: 4,
                radius: 16.0,
                contact_cooldown: 1.0,
                spawn_weight: 1.0,
                ..base
            },
            EnemyKind::Brute => EnemyStats {
                hp: 90.0,
                speed: 55.0,
                damage: 15.0,
                reward: 8,
                min_stage: 3,
                radius: 14.0,
                contact_cooldown: 0.8,
                spawn_weight: 1.2,
                ..base
            },
            EnemyKind::Elite => EnemyStats {
                hp: 120.0,
                speed: 45.0,
                damage: 10.0,
                reward: 15,
                min_stage: 5,
                radius: 14.0,
                fire_interval: 2.5,
                spawn_weight: 0.8,
                ..base
            },
        }
    }
}

impl FromStr for EnemyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind("enemy", s, &Self::NAMES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub hp: f32,
    /// Pixels per second.
    pub speed: f32,
    /// Bullet, contact or blast damage depending on kind.
    pub damage: f32,
    /// Gold on kill.
    pub reward: u32,
    /// First stage this kind can appear in.
    pub min_stage: u32,
    pub radius: f32,
    /// Seconds between shots; zero for kinds that never shoot.
    pub fire_interval: f32,
    /// Seconds between contact hits for melee kinds that survive contact.
    pub contact_cooldown: f32,
    /// Relative weight in wave composition.
    pub spawn_weight: f32,
}

// ── Bosses ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BossKind {
    Colossus,
    Juggernaut,
    Broodmother,
    Overlord,
}

impl BossKind {
    pub const ALL: [BossKind; 4] = [
        BossKind::Colossus,
        BossKind::Juggernaut,
        BossKind::Broodmother,
        BossKind::Overlord,
    ];

    const NAMES: [(&'static str, BossKind); 4] = [
        ("colossus", BossKind::Colossus),
        ("juggernaut", BossKind::Juggernaut),
        ("broodmother", BossKind::Broodmother),
        ("overlord", BossKind::Overlord),
    ];

    pub fn name(self) -> &'static str {
        match self {
            BossKind::Colossus => "colossus",
            BossKind::Juggernaut => "juggernaut",
            BossKind::Broodmother => "broodmother",
            BossKind::Overlord => "overlord",
        }
    }

    /// Boss rotation: stage 1 meets the Colossus, stage 5 meets it again.
    pub fn for_stage(stage: u32) -> Self {
        Self::ALL[(stage.max(1) as usize - 1) % Self::ALL.len()]
    }

    pub fn default_stats(self) -> BossStats {
        let phase = |threshold, attack, interval| PhaseDef {
            threshold,
            attack,
            interval,
        };
        match self {
            BossKind::Colossus => BossStats {
                hp: 2500.0,
                radius: 42.0,
                shot_damage: 10.0,
                contact_damage: 25.0,
                summon_count: 3,
                phases: vec![
                    phase(1.0, BossAttack::Shockwave, 3.0),
                    phase(0.6, BossAttack::Summon, 4.0),
                    phase(0.3, BossAttack::Shockwave, 2.0),
                ],
            },
            BossKind::Juggernaut => BossStats {
                hp: 3200.0,
                radius: 46.0,
                shot_damage: 12.0,
                contact_damage: 30.0,
                summon_count: 2,
                phases: vec![
                    phase(1.0, BossAttack::Spread, 2.5),
                    phase(0.5, BossAttack::Charge, 3.5),
                    phase(0.25, BossAttack::AreaDenial, 2.5),
                ],
            },
            BossKind::Broodmother => BossStats {
                hp: 2800.0,
                radius: 44.0,
                shot_damage: 10.0,
                contact_damage: 20.0,
                summon_count: 4,
                phases: vec![
                    phase(1.0, BossAttack::Summon, 4.0),
                    phase(0.6, BossAttack::AreaDenial, 3.0),
                    phase(0.3, BossAttack::Spread, 1.8),
                ],
            },
            BossKind::Overlord => BossStats {
                hp: 4000.0,
                radius: 50.0,
                shot_damage: 14.0,
                contact_damage: 35.0,
                summon_count: 4,
                phases: vec![
                    phase(1.0, BossAttack::Spread, 2.2),
                    phase(0.7, BossAttack::ShieldCharge, 4.0),
                    phase(0.4, BossAttack::AreaDenial, 2.5),
                    phase(0.2, BossAttack::Shockwave, 1.8),
                ],
            },
        }
    }
}

impl FromStr for BossKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind("boss", s, &Self::NAMES)
    }
}

/// Attack pattern a boss phase cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossAttack {
    Shockwave,
    Summon,
    Charge,
    Spread,
    AreaDenial,
    ShieldCharge,
}

/// One boss phase: active once hp% is at or below `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub threshold: f32,
    pub attack: BossAttack,
    /// Seconds between attacks.
    pub interval: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossStats {
    pub hp: f32,
    pub radius: f32,
    pub shot_damage: f32,
    pub contact_damage: f32,
    /// Minions per summon, before the phase bonus.
    pub summon_count: u32,
    /// Ordered by descending threshold, first threshold 1.0.
    pub phases: Vec<PhaseDef>,
}

// ── Items & traps ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    Recruit,
    Medkit,
    Shield,
    RapidFire,
    PowerUp,
    GoldBag,
}

impl ItemKind {
    pub const ALL: [ItemKind; 6] = [
        ItemKind::Recruit,
        ItemKind::Medkit,
        ItemKind::Shield,
        ItemKind::RapidFire,
        ItemKind::PowerUp,
        ItemKind::GoldBag,
    ];

    const NAMES: [(&'static str, ItemKind); 6] = [
        ("recruit", ItemKind::Recruit),
        ("medkit", ItemKind::Medkit),
        ("shield", ItemKind::Shield),
        ("rapidFire", ItemKind::RapidFire),
        ("powerUp", ItemKind::PowerUp),
        ("goldBag", ItemKind::GoldBag),
    ];

    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Recruit => "recruit",
            ItemKind::Medkit => "medkit",
            ItemKind::Shield => "shield",
            ItemKind::RapidFire => "rapidFire",
            ItemKind::PowerUp => "powerUp",
            ItemKind::GoldBag => "goldBag",
        }
    }

    pub fn default_stats(self) -> ItemStats {
        match self {
            ItemKind::Recruit => ItemStats {
                effect: ItemEffect::Recruit {
                    kind: CharacterKind::Rifleman,
                    count: 2,
                },
                weight: 4.0,
            },
            ItemKind::Medkit => ItemStats {
                effect: ItemEffect::Heal { fraction: 0.5 },
                weight: 2.0,
            },
            ItemKind::Shield => ItemStats {
                effect: ItemEffect::Buff(BuffGrant::Shield { charges: 3 }),
                weight: 1.5,
            },
            ItemKind::RapidFire => ItemStats {
                effect: ItemEffect::Buff(BuffGrant::Timed {
                    kind: BuffKind::RapidFire,
                    multiplier: 1.5,
                    duration: 8.0,
                }),
                weight: 1.5,
            },
            ItemKind::PowerUp => ItemStats {
                effect: ItemEffect::Buff(BuffGrant::Timed {
                    kind: BuffKind::DamageUp,
                    multiplier: 1.5,
                    duration: 8.0,
                }),
                weight: 1.5,
            },
            ItemKind::GoldBag => ItemStats {
                effect: ItemEffect::Gold { amount: 10 },
                weight: 2.5,
            },
        }
    }
}

impl FromStr for ItemKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind("item", s, &Self::NAMES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ItemEffect {
    Recruit { kind: CharacterKind, count: u32 },
    /// Heal every member by a fraction of max hp.
    Heal { fraction: f32 },
    Buff(BuffGrant),
    Gold { amount: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub effect: ItemEffect,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrapKind {
    Spikes,
    Mine,
}

impl TrapKind {
    pub const ALL: [TrapKind; 2] = [TrapKind::Spikes, TrapKind::Mine];

    const NAMES: [(&'static str, TrapKind); 2] = [("spikes", TrapKind::Spikes), ("mine", TrapKind::Mine)];

    pub fn name(self) -> &'static str {
        match self {
            TrapKind::Spikes => "spikes",
            TrapKind::Mine => "mine",
        }
    }

    pub fn default_stats(self) -> TrapStats {
        match self {
            TrapKind::Spikes => TrapStats {
                effect: TrapEffect::Cull { count: 2 },
                weight: 1.0,
            },
            TrapKind::Mine => TrapStats {
                effect: TrapEffect::Blast {
                    radius: 50.0,
                    damage: 25.0,
                },
                weight: 1.0,
            },
        }
    }
}

impl FromStr for TrapKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind("trap", s, &Self::NAMES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrapEffect {
    /// Kill the most recently recruited members.
    Cull { count: u32 },
    /// Damage every member within `radius` of the trap.
    Blast { radius: f32, damage: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrapStats {
    pub effect: TrapEffect,
    pub weight: f32,
}

// ── Gates ───────────────────────────────────────────────────────────────

/// One entry in the gate effect table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateOption {
    pub op: GateOp,
    pub weight: f32,
}

fn default_gates() -> Vec<GateOption> {
    let opt = |op, weight| GateOption { op, weight };
    vec![
        opt(GateOp::Add(3), 4.0),
        opt(GateOp::Add(5), 3.0),
        opt(GateOp::Add(-3), 2.0),
        opt(GateOp::Multiply(2.0), 2.0),
        opt(GateOp::Multiply(1.5), 2.5),
        opt(
            GateOp::Gamble {
                win_factor: 3.0,
                lose_factor: 0.5,
                chance: 0.5,
            },
            1.0,
        ),
        opt(
            GateOp::AddType {
                kind: CharacterKind::Tanker,
                count: 2,
            },
            1.5,
        ),
        opt(
            GateOp::AddType {
                kind: CharacterKind::Sniper,
                count: 2,
            },
            1.5,
        ),
        opt(
            GateOp::AddType {
                kind: CharacterKind::Bomber,
                count: 2,
            },
            1.5,
        ),
        opt(
            GateOp::AddType {
                kind: CharacterKind::Gunner,
                count: 2,
            },
            1.0,
        ),
        opt(
            GateOp::Buff(BuffGrant::Timed {
                kind: BuffKind::RapidFire,
                multiplier: 1.5,
                duration: 10.0,
            }),
            1.0,
        ),
        opt(GateOp::Buff(BuffGrant::Shield { charges: 5 }), 1.0),
    ]
}

// ── Upgrades ────────────────────────────────────────────────────────────

/// Permanent upgrades bought between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeKind {
    Damage,
    FireRate,
    Health,
    StartSquad,
    GoldBonus,
    Shield,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 6] = [
        UpgradeKind::Damage,
        UpgradeKind::FireRate,
        UpgradeKind::Health,
        UpgradeKind::StartSquad,
        UpgradeKind::GoldBonus,
        UpgradeKind::Shield,
    ];

    const NAMES: [(&'static str, UpgradeKind); 6] = [
        ("damage", UpgradeKind::Damage),
        ("fireRate", UpgradeKind::FireRate),
        ("health", UpgradeKind::Health),
        ("startSquad", UpgradeKind::StartSquad),
        ("goldBonus", UpgradeKind::GoldBonus),
        ("shield", UpgradeKind::Shield),
    ];

    pub fn default_curve(self) -> UpgradeCurve {
        let curve = |per_level, max_level, base_cost| UpgradeCurve {
            per_level,
            max_level,
            base_cost,
            cost_growth: 1.5,
        };
        match self {
            UpgradeKind::Damage => curve(0.10, 10, 50),
            UpgradeKind::FireRate => curve(0.08, 10, 60),
            UpgradeKind::Health => curve(0.15, 10, 40),
            UpgradeKind::StartSquad => curve(1.0, 10, 80),
            UpgradeKind::GoldBonus => curve(0.10, 10, 100),
            UpgradeKind::Shield => curve(1.0, 5, 120),
        }
    }
}

impl FromStr for UpgradeKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind("upgrade", s, &Self::NAMES)
    }
}

/// Linear effect per level, geometric cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpgradeCurve {
    pub per_level: f32,
    pub max_level: u32,
    pub base_cost: u64,
    pub cost_growth: f32,
}

impl UpgradeCurve {
    /// Price of going from `level` to `level + 1`.
    pub fn cost_at(&self, level: u32) -> u64 {
        (self.base_cost as f64 * (self.cost_growth as f64).powi(level as i32)).round() as u64
    }

    pub fn effect_at(&self, level: u32) -> f32 {
        self.per_level * level.min(self.max_level) as f32
    }
}

/// Effects of all purchased upgrades, applied at run start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeEffects {
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub hp_mult: f32,
    pub extra_members: u32,
    pub gold_mult: f32,
    pub start_shields: u32,
}

impl Default for UpgradeEffects {
    fn default() -> Self {
        Self {
            damage_mult: 1.0,
            fire_rate_mult: 1.0,
            hp_mult: 1.0,
            extra_members: 0,
            gold_mult: 1.0,
            start_shields: 0,
        }
    }
}

// ── Difficulty rates ────────────────────────────────────────────────────

/// Per-stage slopes for the linear difficulty model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingRates {
    pub enemy_hp: f32,
    pub enemy_speed: f32,
    pub spawn_interval: f32,
    pub spawn_interval_floor: f32,
    pub item_interval: f32,
    pub item_interval_floor: f32,
    pub reward: f32,
    pub boss_hp: f32,
}

impl Default for ScalingRates {
    fn default() -> Self {
        Self {
            enemy_hp: 0.15,
            enemy_speed: 0.05,
            spawn_interval: 0.06,
            spawn_interval_floor: 0.35,
            item_interval: 0.04,
            item_interval_floor: 0.5,
            reward: 0.10,
            boss_hp: 0.25,
        }
    }
}

// ── The table itself ────────────────────────────────────────────────────

/// Complete balance configuration consumed by the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    characters: BTreeMap<CharacterKind, CharacterStats>,
    enemies: BTreeMap<EnemyKind, EnemyStats>,
    bosses: BTreeMap<BossKind, BossStats>,
    items: BTreeMap<ItemKind, ItemStats>,
    traps: BTreeMap<TrapKind, TrapStats>,
    upgrades: BTreeMap<UpgradeKind, UpgradeCurve>,
    gates: Vec<GateOption>,
    pub scaling: ScalingRates,
}

impl Default for Balance {
    fn default() -> Self {
        Self {
            characters: CharacterKind::ALL.iter().map(|k| (*k, k.default_stats())).collect(),
            enemies: EnemyKind::ALL.iter().map(|k| (*k, k.default_stats())).collect(),
            bosses: BossKind::ALL.iter().map(|k| (*k, k.default_stats())).collect(),
            items: ItemKind::ALL.iter().map(|k| (*k, k.default_stats())).collect(),
            traps: TrapKind::ALL.iter().map(|k| (*k, k.default_stats())).collect(),
            upgrades: UpgradeKind::ALL.iter().map(|k| (*k, k.default_curve())).collect(),
            gates: default_gates(),
            scaling: ScalingRates::default(),
        }
    }
}

impl Balance {
    /// Parse a RON override. Kinds the override leaves out keep their
    /// defaults; the merged table is validated before it is returned.
    pub fn from_ron(text: &str) -> Result<Self, SimError> {
        let mut parsed: Balance = ron::from_str(text).map_err(|source| SimError::Parse {
            what: "balance table",
            source,
        })?;
        parsed.fill_missing();
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    fn fill_missing(&mut self) {
        for k in CharacterKind::ALL {
            self.characters.entry(k).or_insert_with(|| k.default_stats());
        }
        for k in EnemyKind::ALL {
            self.enemies.entry(k).or_insert_with(|| k.default_stats());
        }
        for k in BossKind::ALL {
            self.bosses.entry(k).or_insert_with(|| k.default_stats());
        }
        for k in ItemKind::ALL {
            self.items.entry(k).or_insert_with(|| k.default_stats());
        }
        for k in TrapKind::ALL {
            self.traps.entry(k).or_insert_with(|| k.default_stats());
        }
        for k in UpgradeKind::ALL {
            self.upgrades.entry(k).or_insert_with(|| k.default_curve());
        }
        if self.gates.is_empty() {
            self.gates = default_gates();
        }
    }

    /// Reject tables that would break simulation invariants.
    pub fn validate(&self) -> Result<(), SimError> {
        let bad = |msg: String| Err(SimError::InvalidBalance(msg));

        for (k, s) in &self.characters {
            if !(s.hp > 0.0) || !(s.fire_interval > 0.0) || !(s.bullet_speed > 0.0) || !(s.range > 0.0) {
                return bad(format!("{} needs positive hp, fire interval, range and bullet speed", k.name()));
            }
            if let Weapon::Spread { count, .. } = s.weapon {
                if count == 0 {
                    return bad(format!("{} spread weapon fires zero rounds", k.name()));
                }
            }
        }
        for (k, s) in &self.enemies {
            if !(s.hp > 0.0) || !(s.speed >= 0.0) || !(s.radius > 0.0) || !(s.fire_interval >= 0.0) {
                return bad(format!("{} has a non-positive hp/radius or negative speed", k.name()));
            }
            if !(s.spawn_weight >= 0.0) {
                return bad(format!("{} has a negative spawn weight", k.name()));
            }
        }
        for (k, s) in &self.bosses {
            if !(s.hp > 0.0) || s.phases.is_empty() {
                return bad(format!("boss {} needs hp and at least one phase", k.name()));
            }
            if (s.phases[0].threshold - 1.0).abs() > f32::EPSILON {
                return bad(format!("boss {} first phase must start at 1.0", k.name()));
            }
            for pair in s.phases.windows(2) {
                if !(pair[1].threshold < pair[0].threshold) {
                    return bad(format!("boss {} phase thresholds must strictly descend", k.name()));
                }
            }
            if s.phases.iter().any(|p| !(p.interval > 0.0)) {
                return bad(format!("boss {} has a non-positive attack interval", k.name()));
            }
        }
        if self.items.values().all(|i| !(i.weight > 0.0)) {
            return bad("no item has a positive weight".into());
        }
        if self.gates.iter().all(|g| !(g.weight > 0.0)) {
            return bad("no gate option has a positive weight".into());
        }
        for g in &self.gates {
            if !(g.weight >= 0.0) {
                return bad(format!("gate {} has a negative weight", g.op.label()));
            }
            let factors_ok = match g.op {
                GateOp::Multiply(f) => f.is_finite() && f >= 1.0,
                GateOp::Gamble {
                    win_factor,
                    lose_factor,
                    chance,
                } => {
                    win_factor.is_finite()
                        && win_factor >= 1.0
                        && lose_factor.is_finite()
                        && (0.0..=1.0).contains(&lose_factor)
                        && (0.0..=1.0).contains(&chance)
                }
                GateOp::Add(_) | GateOp::AddType { .. } | GateOp::Buff(_) => true,
            };
            if !factors_ok {
                return bad(format!("gate {} has an out-of-range factor or chance", g.op.label()));
            }
        }
        if !(self.scaling.spawn_interval_floor > 0.0) || !(self.scaling.item_interval_floor > 0.0) {
            return bad("interval floors must be positive".into());
        }
        Ok(())
    }

    pub fn character(&self, kind: CharacterKind) -> CharacterStats {
        self.characters
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_stats())
    }

    pub fn enemy(&self, kind: EnemyKind) -> EnemyStats {
        self.enemies.get(&kind).copied().unwrap_or_else(|| kind.default_stats())
    }

    pub fn boss(&self, kind: BossKind) -> BossStats {
        self.bosses.get(&kind).cloned().unwrap_or_else(|| kind.default_stats())
    }

    pub fn item(&self, kind: ItemKind) -> ItemStats {
        self.items.get(&kind).copied().unwrap_or_else(|| kind.default_stats())
    }

    pub fn trap(&self, kind: TrapKind) -> TrapStats {
        self.traps.get(&kind).copied().unwrap_or_else(|| kind.default_stats())
    }

    pub fn upgrade(&self, kind: UpgradeKind) -> UpgradeCurve {
        self.upgrades
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_curve())
    }

    pub fn gates(&self) -> &[GateOption] {
        &self.gates
    }

    /// Fold purchased upgrade levels into run-start modifiers.
    pub fn upgrade_effects(&self, level_of: impl Fn(UpgradeKind) -> u32) -> UpgradeEffects {
        let effect = |k: UpgradeKind| self.upgrade(k).effect_at(level_of(k));
        UpgradeEffects {
            damage_mult: 1.0 + effect(UpgradeKind::Damage),
            fire_rate_mult: 1.0 + effect(UpgradeKind::FireRate),
            hp_mult: 1.0 + effect(UpgradeKind::Health),
            extra_members: effect(UpgradeKind::StartSquad).round() as u32,
            gold_mult: 1.0 + effect(UpgradeKind::GoldBonus),
            start_shields: effect(UpgradeKind::Shield).round() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_balance_is_valid() {
        Balance::default().validate().unwrap();
    }

    #[test]
    fn unknown_names_fail_fast() {
        assert!(matches!(
            "grenadier".parse::<CharacterKind>(),
            Err(SimError::UnknownKind { category: "character", .. })
        ));
        assert!("zombie".parse::<EnemyKind>().is_err());
        assert!("".parse::<ItemKind>().is_err());
        assert_eq!("Rusher".parse::<EnemyKind>().unwrap(), EnemyKind::Rusher);
        assert_eq!("rapidfire".parse::<ItemKind>().unwrap(), ItemKind::RapidFire);
    }

    #[test]
    fn ron_override_merges_with_defaults() {
        let text = r#"(
            enemies: {
                Rusher: (hp: 99.0, speed: 90.0, damage: 10.0, reward: 2, min_stage: 1,
                         radius: 10.0, fire_interval: 0.0, contact_cooldown: 0.0, spawn_weight: 5.0),
            },
        )"#;
        let b = Balance::from_ron(text).unwrap();
        assert_eq!(b.enemy(EnemyKind::Rusher).hp, 99.0);
        assert_eq!(b.enemy(EnemyKind::Tank), EnemyKind::Tank.default_stats());
        assert_eq!(b.character(CharacterKind::Bomber), CharacterKind::Bomber.default_stats());
    }

    #[test]
    fn ron_override_rejects_unknown_kind() {
        let text = r#"(enemies: { Zombie: (hp: 1.0, speed: 1.0, damage: 1.0, reward: 1, min_stage: 1,
            radius: 1.0, fire_interval: 0.0, contact_cooldown: 0.0, spawn_weight: 1.0) })"#;
        assert!(matches!(Balance::from_ron(text), Err(SimError::Parse { .. })));
    }

    #[test]
    fn validate_rejects_ascending_boss_phases() {
        let mut b = Balance::default();
        let boss = b.bosses.get_mut(&BossKind::Colossus).unwrap();
        boss.phases[1].threshold = 1.0;
        assert!(matches!(b.validate(), Err(SimError::InvalidBalance(_))));
    }

    #[test]
    fn validate_rejects_broken_gate_factors() {
        let gamble = |lose_factor| GateOption {
            op: GateOp::Gamble {
                win_factor: 3.0,
                lose_factor,
                chance: 0.5,
            },
            weight: 1.0,
        };
        for lose in [f32::NAN, -0.5, f32::INFINITY] {
            let mut b = Balance::default();
            b.gates.push(gamble(lose));
            assert!(matches!(b.validate(), Err(SimError::InvalidBalance(_))), "lose factor {}", lose);
        }

        let mut b = Balance::default();
        b.gates.push(GateOption {
            op: GateOp::Multiply(f32::NAN),
            weight: 1.0,
        });
        assert!(b.validate().is_err());

        let mut b = Balance::default();
        b.gates.push(gamble(0.25));
        b.validate().unwrap();
    }

    #[test]
    fn upgrade_cost_grows_geometrically() {
        let c = UpgradeKind::Damage.default_curve();
        assert_eq!(c.cost_at(0), 50);
        assert_eq!(c.cost_at(1), 75);
        assert_eq!(c.cost_at(2), 113);
    }

    #[test]
    fn upgrade_effects_fold_levels() {
        let b = Balance::default();
        let fx = b.upgrade_effects(|k| match k {
            UpgradeKind::Damage => 3,
            UpgradeKind::StartSquad => 2,
            _ => 0,
        });
        assert!((fx.damage_mult - 1.3).abs() < 1e-5);
        assert_eq!(fx.extra_members, 2);
        assert_eq!(fx.fire_rate_mult, 1.0);
    }
}
