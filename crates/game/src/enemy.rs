//! Enemies: per-kind movement and attack policies.
//!
//! Every kind shares the same body (position, health, lifecycle); what
//! differs lives in [`EnemyBehavior`], one variant per policy family, and is
//! dispatched with exhaustive matches on [`EnemyKind`].

use engine_core::{approach, Cooldown, Countdown, Health, LifeState, Playfield, Vec2};

use crate::balance::{EnemyKind, EnemyStats};
use crate::difficulty::StageScaling;
use crate::pickup::Pickup;

/// Seconds an enemy stays visible after its killing blow.
pub const DEATH_DURATION: f32 = 0.2;
/// Detonator fuse length once armed.
pub const FUSE_SECONDS: f32 = 3.0;
/// Distance to the squad at which a detonator arms.
pub const FUSE_ARM_DISTANCE: f32 = 60.0;
/// Detonator blast radius.
pub const BLAST_RADIUS: f32 = 50.0;
/// Depth at which mortars stop and dig in.
pub const MORTAR_HOLD_DEPTH: f32 = 180.0;
/// Telegraph before each mortar shell.
pub const MORTAR_CHARGE: f32 = 1.0;
/// Shooters only fire between these depths.
pub const FIRING_BAND: (f32, f32) = (30.0, 420.0);
/// Horizontal alignment speed for shooters, elites and mortars.
const DRIFT_SPEED: f32 = 40.0;
/// Distance at which a thief grabs its target.
const STEAL_RADIUS: f32 = 14.0;
/// Scale on closing velocity used by lead prediction for chasers.
const CHASE_LEAD: f32 = 0.6;

/// Per-kind state.
#[derive(Debug, Clone, PartialEq)]
pub enum EnemyBehavior {
    /// Rusher: no state beyond the chase.
    Charge,
    /// Shooter and elite.
    Ranged { fire: Cooldown, in_band: bool },
    Mortar {
        fire: Cooldown,
        charge: Countdown,
        holding: bool,
        loaded: bool,
    },
    Detonator {
        fuse: Countdown,
        /// Set exactly once, when the fuse runs out.
        explode: bool,
        /// Set by the blast pass once damage has been dealt.
        blast_applied: bool,
    },
    Thief { target: Option<u32> },
    Flanker { dir: f32 },
    /// Tank and brute.
    Melee { contact: Cooldown },
}

impl EnemyBehavior {
    fn for_kind(kind: EnemyKind, stats: &EnemyStats, id: u32) -> Self {
        match kind {
            EnemyKind::Rusher => EnemyBehavior::Charge,
            EnemyKind::Shooter | EnemyKind::Elite => EnemyBehavior::Ranged {
                // Half an interval before the first shot.
                fire: Cooldown(stats.fire_interval * 0.5),
                in_band: false,
            },
            EnemyKind::Mortar => EnemyBehavior::Mortar {
                fire: Cooldown(stats.fire_interval * 0.5),
                charge: Countdown::idle(),
                holding: false,
                loaded: false,
            },
            EnemyKind::Detonator => EnemyBehavior::Detonator {
                fuse: Countdown::idle(),
                explode: false,
                blast_applied: false,
            },
            EnemyKind::Thief => EnemyBehavior::Thief { target: None },
            EnemyKind::Flanker => EnemyBehavior::Flanker {
                dir: if id % 2 == 0 { 1.0 } else { -1.0 },
            },
            EnemyKind::Tank | EnemyKind::Brute => EnemyBehavior::Melee {
                contact: Cooldown::default(),
            },
        }
    }
}

/// What happened to an enemy during its own update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyOutcome {
    None,
    /// A thief reached and took the item with this id.
    Stole(u32),
    /// Left the bottom of the playfield; no reward.
    Escaped,
    /// A detonator fuse ran out this tick.
    FuseBlown,
}

/// Read-only world view handed to [`Enemy::update`].
pub struct EnemyContext<'a> {
    pub squad_pos: Vec2,
    pub field: &'a Playfield,
    pub pickups: &'a [Pickup],
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
    /// Velocity applied on the last update.
    pub vel: Vec2,
    pub health: Health,
    pub speed: f32,
    pub damage: f32,
    pub reward: u32,
    pub radius: f32,
    fire_interval: f32,
    contact_interval: f32,
    pub behavior: EnemyBehavior,
    pub flash: f32,
    pub life: LifeState,
}

impl Enemy {
    /// Build an enemy with stage scaling applied to hp, speed and reward.
    pub fn spawn(id: u32, kind: EnemyKind, stats: &EnemyStats, scaling: &StageScaling, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            health: Health::new(stats.hp * scaling.enemy_hp),
            speed: stats.speed * scaling.enemy_speed,
            damage: stats.damage,
            reward: scaling.scaled_reward(stats.reward),
            radius: stats.radius,
            fire_interval: stats.fire_interval,
            contact_interval: stats.contact_cooldown,
            behavior: EnemyBehavior::for_kind(kind, stats, id),
            flash: 0.0,
            life: LifeState::Alive,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life.is_alive()
    }

    pub fn is_active(&self) -> bool {
        self.life.is_active()
    }

    /// Apply damage. Returns true only on the killing blow.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.life.is_alive() {
            return false;
        }
        self.flash = 0.1;
        if self.health.take_damage(amount) {
            self.life.begin_dying(DEATH_DURATION);
            return true;
        }
        false
    }

    /// Kill without reward bookkeeping (rusher contact).
    pub fn self_destruct(&mut self) -> bool {
        self.life.begin_dying(DEATH_DURATION)
    }

    pub fn update(&mut self, dt: f32, ctx: &EnemyContext) -> EnemyOutcome {
        if self.life.tick(dt) || !self.life.is_alive() {
            self.vel = Vec2::ZERO;
            return EnemyOutcome::None;
        }
        self.flash = (self.flash - dt).max(0.0);

        let mut outcome = EnemyOutcome::None;
        let to_squad = (ctx.squad_pos - self.pos).normalize_or_zero();
        let speed = self.speed;
        let field = ctx.field;

        let vel = match self.kind {
            EnemyKind::Rusher | EnemyKind::Tank | EnemyKind::Brute => to_squad * speed,
            EnemyKind::Shooter | EnemyKind::Elite => {
                let vx = approach(0.0, ctx.squad_pos.x - self.pos.x, DRIFT_SPEED);
                Vec2::new(vx, speed * 0.5)
            }
            EnemyKind::Mortar => {
                let vx = approach(0.0, ctx.squad_pos.x - self.pos.x, DRIFT_SPEED);
                let holding = self.pos.y >= MORTAR_HOLD_DEPTH;
                Vec2::new(vx, if holding { 0.0 } else { speed })
            }
            EnemyKind::Detonator => {
                let armed = matches!(&self.behavior, EnemyBehavior::Detonator { fuse, .. } if fuse.is_running());
                to_squad * if armed { speed * 0.5 } else { speed }
            }
            EnemyKind::Thief => self.thief_velocity(ctx, &mut outcome),
            EnemyKind::Flanker => {
                let dir = match &mut self.behavior {
                    EnemyBehavior::Flanker { dir } => {
                        if self.pos.x <= field.road_left + self.radius {
                            *dir = 1.0;
                        } else if self.pos.x >= field.road_right - self.radius {
                            *dir = -1.0;
                        }
                        *dir
                    }
                    _ => 1.0,
                };
                Vec2::new(dir * speed, speed * 0.8)
            }
        };
        self.vel = vel;
        self.pos += vel * dt;

        let (pos, fire_interval) = (self.pos, self.fire_interval);
        match &mut self.behavior {
            EnemyBehavior::Charge | EnemyBehavior::Thief { .. } | EnemyBehavior::Flanker { .. } => {}
            EnemyBehavior::Ranged { fire, in_band } => {
                fire.tick(dt);
                *in_band = pos.y >= FIRING_BAND.0 && pos.y <= FIRING_BAND.1;
            }
            EnemyBehavior::Mortar {
                fire,
                charge,
                holding,
                loaded,
            } => {
                *holding = pos.y >= MORTAR_HOLD_DEPTH;
                if *holding && !*loaded {
                    fire.tick(dt);
                    if fire.ready() && !charge.is_running() {
                        charge.start(MORTAR_CHARGE);
                    }
                    if charge.tick(dt) {
                        *loaded = true;
                        fire.set(fire_interval);
                    }
                }
            }
            EnemyBehavior::Detonator { fuse, explode, .. } => {
                if !fuse.is_running() && !*explode && pos.distance(ctx.squad_pos) <= FUSE_ARM_DISTANCE {
                    fuse.start(FUSE_SECONDS);
                    log::debug!("detonator {} armed", self.id);
                }
                if fuse.tick(dt) && self.life.begin_dying(DEATH_DURATION) {
                    *explode = true;
                    outcome = EnemyOutcome::FuseBlown;
                }
            }
            EnemyBehavior::Melee { contact } => contact.tick(dt),
        }

        if self.life.is_alive() && self.pos.y > field.height + self.radius + 20.0 {
            self.life.deactivate();
            return EnemyOutcome::Escaped;
        }
        outcome
    }

    fn thief_velocity(&mut self, ctx: &EnemyContext, outcome: &mut EnemyOutcome) -> Vec2 {
        let EnemyBehavior::Thief { target } = &mut self.behavior else {
            return Vec2::new(0.0, self.speed);
        };
        // Release targets that were collected, stolen or scrolled away.
        let current = target.and_then(|id| ctx.pickups.iter().find(|p| p.id == id && p.is_stealable()));
        let goal = match current {
            Some(p) => Some(p),
            None => {
                let nearest = ctx
                    .pickups
                    .iter()
                    .filter(|p| p.is_stealable())
                    .min_by(|a, b| a.pos.distance_squared(self.pos).total_cmp(&b.pos.distance_squared(self.pos)));
                *target = nearest.map(|p| p.id);
                nearest
            }
        };
        match goal {
            Some(item) if item.pos.distance(self.pos) <= STEAL_RADIUS => {
                *outcome = EnemyOutcome::Stole(item.id);
                *target = None;
                Vec2::ZERO
            }
            Some(item) => (item.pos - self.pos).normalize_or_zero() * self.speed,
            None => Vec2::new(0.0, self.speed),
        }
    }

    /// Kind-specific motion guess used to lead shots.
    pub fn lead_velocity(&self, squad_pos: Vec2) -> Vec2 {
        match self.kind {
            EnemyKind::Rusher | EnemyKind::Detonator | EnemyKind::Tank | EnemyKind::Brute => {
                (squad_pos - self.pos).normalize_or_zero() * self.speed * CHASE_LEAD
            }
            EnemyKind::Flanker => {
                let dir = match self.behavior {
                    EnemyBehavior::Flanker { dir } => dir,
                    _ => 0.0,
                };
                Vec2::new(dir * self.speed, self.speed * 0.8)
            }
            EnemyKind::Shooter | EnemyKind::Elite => {
                Vec2::new(approach(0.0, squad_pos.x - self.pos.x, DRIFT_SPEED), self.speed * 0.5)
            }
            EnemyKind::Mortar => match self.behavior {
                EnemyBehavior::Mortar { holding: true, .. } => Vec2::ZERO,
                _ => Vec2::new(0.0, self.speed),
            },
            EnemyKind::Thief => Vec2::new(0.0, self.speed),
        }
    }

    pub fn can_fire(&self) -> bool {
        if !self.life.is_alive() {
            return false;
        }
        match &self.behavior {
            EnemyBehavior::Ranged { fire, in_band } => *in_band && fire.ready(),
            EnemyBehavior::Mortar { loaded, .. } => *loaded,
            _ => false,
        }
    }

    pub fn fire(&mut self) {
        let interval = self.fire_interval;
        match &mut self.behavior {
            EnemyBehavior::Ranged { fire, .. } => fire.set(interval),
            EnemyBehavior::Mortar { loaded, .. } => *loaded = false,
            _ => {}
        }
    }

    /// Mortar telegraph progress in `0..=1`, if charging.
    pub fn charge_progress(&self) -> Option<f32> {
        match &self.behavior {
            EnemyBehavior::Mortar { charge, .. } if charge.is_running() => {
                Some(1.0 - (charge.remaining() / MORTAR_CHARGE).clamp(0.0, 1.0))
            }
            _ => None,
        }
    }

    /// Melee kinds that survive contact: true when a hit may land now.
    pub fn contact_ready(&self) -> bool {
        match &self.behavior {
            EnemyBehavior::Melee { contact } => self.life.is_alive() && contact.ready(),
            _ => false,
        }
    }

    pub fn start_contact_cooldown(&mut self) {
        let interval = self.contact_interval;
        if let EnemyBehavior::Melee { contact } = &mut self.behavior {
            contact.set(interval);
        }
    }

    /// A blown fuse whose blast has not been applied yet.
    pub fn pending_blast(&self) -> bool {
        matches!(
            self.behavior,
            EnemyBehavior::Detonator {
                explode: true,
                blast_applied: false,
                ..
            }
        )
    }

    pub fn mark_blast_applied(&mut self) {
        if let EnemyBehavior::Detonator { blast_applied, .. } = &mut self.behavior {
            *blast_applied = true;
        }
    }

    pub fn exploded(&self) -> bool {
        matches!(self.behavior, EnemyBehavior::Detonator { explode: true, .. })
    }
}
