//! Boss entity: phased attack cycle driven by hp thresholds.
//!
//! The phase index only moves forward. Attack follow-ups (summon drains,
//! spread volleys, telegraphed areas, charge legs) are countdown fields on
//! the boss, so everything stops the moment the boss dies or the run ends.

use std::collections::VecDeque;

use engine_core::{approach, from_angle, Cooldown, Countdown, Health, LifeState, Playfield, Vec2};

use crate::balance::{BossAttack, BossKind, BossStats, PhaseDef};
use crate::difficulty::StageScaling;

pub const DEATH_DURATION: f32 = 1.5;
/// Resting depth after the entry descent.
pub const ENTRY_Y: f32 = 120.0;
const ENTRY_SPEED: f32 = 70.0;
const SWAY_SPEED: f32 = 45.0;

pub const WEAK_SPOT_MULT: f32 = 2.0;
pub const WEAK_SPOT_DURATION: f32 = 2.0;
pub const SHIELD_DURATION: f32 = 2.0;

pub const SHOCKWAVE_SPEED: f32 = 250.0;
pub const SHOCKWAVE_MAX_RADIUS: f32 = 400.0;
/// Half-width of the damaging band around the ring.
pub const SHOCKWAVE_TOLERANCE: f32 = 10.0;

pub const SUMMON_INTERVAL: f32 = 0.3;

pub const CHARGE_WINDUP: f32 = 0.8;
const CHARGE_SPEED: f32 = 420.0;
const RETURN_SPEED: f32 = 180.0;

pub const SPREAD_SHOT_DELAY: f32 = 0.08;
const SPREAD_ARC: f32 = 1.2;

pub const AREA_WARNING_DELAY: f32 = 1.2;
pub const AREA_RADIUS: f32 = 40.0;
const AREA_OFFSETS: [(f32, f32); 3] = [(0.0, 0.0), (-70.0, -40.0), (70.0, -40.0)];

/// Expanding damage ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Shockwave {
    pub radius: f32,
    pub damage: f32,
    /// Members already hit by this pulse.
    pub hit_ids: Vec<u32>,
}

/// Telegraphed area that detonates after a delay.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaWarning {
    pub pos: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub timer: Countdown,
    /// Timer ran out; damage is due this tick.
    pub detonated: bool,
    /// Damage has been dealt; dropped on the next boss update.
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChargeState {
    #[default]
    Idle,
    /// Invulnerable wind-up before the dash.
    Windup(Countdown),
    Dash { target: Vec2, hit_ids: Vec<u32> },
    /// Heading back to the resting line; weak spot is open.
    Return,
}

#[derive(Debug, Clone, Copy)]
struct QueuedShot {
    delay: f32,
    dir: Vec2,
}

/// What the boss did on a tick, for cues and logging.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BossTick {
    pub phase_changed: bool,
    pub attack: Option<BossAttack>,
    pub died: bool,
}

#[derive(Debug, Clone)]
pub struct Boss {
    pub kind: BossKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: Health,
    pub radius: f32,
    pub shot_damage: f32,
    pub contact_damage: f32,
    phases: Vec<PhaseDef>,
    phase: usize,
    attack_timer: Cooldown,
    weak_spot: Countdown,
    shield: Countdown,
    charge_after_shield: bool,
    pub charge: ChargeState,
    entered: bool,
    sway_dir: f32,
    summon_count: u32,
    summon_queue: u32,
    summon_timer: Countdown,
    ready_summons: u32,
    shot_queue: VecDeque<QueuedShot>,
    ready_shots: Vec<Vec2>,
    pub warnings: Vec<AreaWarning>,
    pub shockwave: Option<Shockwave>,
    pub flash: f32,
    pub life: LifeState,
}

impl Boss {
    pub fn spawn(kind: BossKind, stats: &BossStats, scaling: &StageScaling, field: &Playfield) -> Self {
        let phases = if stats.phases.is_empty() {
            kind.default_stats().phases
        } else {
            stats.phases.clone()
        };
        let first_interval = phases.first().map(|p| p.interval).unwrap_or(3.0);
        Self {
            kind,
            pos: Vec2::new(field.road_center(), -stats.radius),
            vel: Vec2::ZERO,
            health: Health::new(stats.hp * scaling.boss_hp),
            radius: stats.radius,
            shot_damage: stats.shot_damage,
            contact_damage: stats.contact_damage,
            phases,
            phase: 0,
            attack_timer: Cooldown(first_interval),
            weak_spot: Countdown::idle(),
            shield: Countdown::idle(),
            charge_after_shield: false,
            charge: ChargeState::Idle,
            entered: false,
            sway_dir: 1.0,
            summon_count: stats.summon_count,
            summon_queue: 0,
            summon_timer: Countdown::idle(),
            ready_summons: 0,
            shot_queue: VecDeque::new(),
            ready_shots: Vec::new(),
            warnings: Vec::new(),
            shockwave: None,
            flash: 0.0,
            life: LifeState::Alive,
        }
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn current_attack(&self) -> BossAttack {
        self.phases[self.phase].attack
    }

    pub fn is_alive(&self) -> bool {
        self.life.is_alive()
    }

    pub fn is_active(&self) -> bool {
        self.life.is_active()
    }

    pub fn has_entered(&self) -> bool {
        self.entered
    }

    /// Damage is blocked while shielded or winding up a charge.
    pub fn is_shielded(&self) -> bool {
        self.shield.is_running() || matches!(self.charge, ChargeState::Windup(_))
    }

    pub fn weak_spot_open(&self) -> bool {
        self.weak_spot.is_running()
    }

    pub fn is_dashing(&self) -> bool {
        matches!(self.charge, ChargeState::Dash { .. })
    }

    /// Apply damage (doubled on an open weak spot). Returns true only on the
    /// killing blow.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.life.is_alive() || self.is_shielded() {
            return false;
        }
        let mult = if self.weak_spot_open() { WEAK_SPOT_MULT } else { 1.0 };
        self.flash = 0.1;
        if self.health.take_damage(amount * mult) {
            self.die();
            return true;
        }
        false
    }

    fn die(&mut self) {
        if self.life.begin_dying(DEATH_DURATION) {
            log::info!("boss {} defeated", self.kind.name());
            self.shot_queue.clear();
            self.ready_shots.clear();
            self.summon_queue = 0;
            self.ready_summons = 0;
            self.summon_timer.clear();
            self.warnings.clear();
            self.shockwave = None;
            self.charge = ChargeState::Idle;
            self.shield.clear();
            self.weak_spot.clear();
        }
    }

    /// Move forward through phases whose threshold has been crossed.
    fn advance_phase(&mut self) -> bool {
        let pct = self.health.percentage();
        let mut changed = false;
        while self.phase + 1 < self.phases.len() && pct <= self.phases[self.phase + 1].threshold {
            self.phase += 1;
            changed = true;
        }
        if changed {
            let interval = self.phases[self.phase].interval;
            self.attack_timer.set(self.attack_timer.0.min(interval));
            log::debug!(
                "boss {} entered phase {} ({:?})",
                self.kind.name(),
                self.phase,
                self.phases[self.phase].attack
            );
        }
        changed
    }

    pub fn update(&mut self, dt: f32, squad_pos: Vec2, field: &Playfield) -> BossTick {
        let mut tick = BossTick::default();
        if self.life.tick(dt) {
            tick.died = true;
            return tick;
        }
        if !self.life.is_alive() {
            self.vel = Vec2::ZERO;
            return tick;
        }
        self.flash = (self.flash - dt).max(0.0);
        self.warnings.retain(|w| !w.resolved);

        tick.phase_changed = self.advance_phase();

        self.weak_spot.tick(dt);
        if self.shield.tick(dt) && self.charge_after_shield {
            self.charge_after_shield = false;
            self.charge = ChargeState::Windup(Countdown::started(CHARGE_WINDUP));
        }

        self.update_movement(dt, squad_pos, field);
        self.update_payloads(dt);

        if self.entered && matches!(self.charge, ChargeState::Idle) && !self.shield.is_running() {
            self.attack_timer.tick(dt);
            if self.attack_timer.ready() {
                let attack = self.perform_attack(squad_pos, field);
                tick.attack = Some(attack);
            }
        }
        tick
    }

    fn update_movement(&mut self, dt: f32, squad_pos: Vec2, field: &Playfield) {
        let prev = self.pos;
        if !self.entered {
            self.pos.y = approach(self.pos.y, ENTRY_Y, ENTRY_SPEED * dt);
            self.entered = self.pos.y >= ENTRY_Y;
        } else {
            let charge = std::mem::take(&mut self.charge);
            self.charge = match charge {
                ChargeState::Idle => {
                    let lo = field.road_left + self.radius;
                    let hi = field.road_right - self.radius;
                    if self.pos.x <= lo {
                        self.sway_dir = 1.0;
                    } else if self.pos.x >= hi {
                        self.sway_dir = -1.0;
                    }
                    self.pos.x = field.clamp_to_road(self.pos.x + self.sway_dir * SWAY_SPEED * dt, self.radius);
                    ChargeState::Idle
                }
                ChargeState::Windup(mut timer) => {
                    if timer.tick(dt) {
                        let target = Vec2::new(field.clamp_to_road(squad_pos.x, self.radius), squad_pos.y - self.radius);
                        ChargeState::Dash {
                            target,
                            hit_ids: Vec::new(),
                        }
                    } else {
                        ChargeState::Windup(timer)
                    }
                }
                ChargeState::Dash { target, hit_ids } => {
                    let step = CHARGE_SPEED * dt;
                    let to = target - self.pos;
                    if to.length() <= step {
                        self.pos = target;
                        self.weak_spot.start(WEAK_SPOT_DURATION);
                        ChargeState::Return
                    } else {
                        self.pos += to.normalize_or_zero() * step;
                        ChargeState::Dash { target, hit_ids }
                    }
                }
                ChargeState::Return => {
                    let home = Vec2::new(self.pos.x, ENTRY_Y);
                    let to = home - self.pos;
                    let step = RETURN_SPEED * dt;
                    if to.length() <= step {
                        self.pos = home;
                        ChargeState::Idle
                    } else {
                        self.pos += to.normalize_or_zero() * step;
                        ChargeState::Return
                    }
                }
            };
        }
        self.vel = if dt > 0.0 { (self.pos - prev) / dt } else { Vec2::ZERO };
    }

    fn update_payloads(&mut self, dt: f32) {
        if let Some(ring) = &mut self.shockwave {
            ring.radius += SHOCKWAVE_SPEED * dt;
            if ring.radius > SHOCKWAVE_MAX_RADIUS {
                self.shockwave = None;
            }
        }

        if self.summon_timer.tick(dt) && self.summon_queue > 0 {
            self.summon_queue -= 1;
            self.ready_summons += 1;
            if self.summon_queue > 0 {
                self.summon_timer.start(SUMMON_INTERVAL);
            } else {
                self.weak_spot.start(WEAK_SPOT_DURATION);
            }
        }

        // Per-shot delays are relative to the previous shot.
        let mut budget = dt;
        while let Some(front) = self.shot_queue.front_mut() {
            if front.delay > budget {
                front.delay -= budget;
                break;
            }
            budget -= front.delay;
            let dir = front.dir;
            self.shot_queue.pop_front();
            self.ready_shots.push(dir);
        }

        for w in &mut self.warnings {
            if w.timer.tick(dt) {
                w.detonated = true;
            }
        }
    }

    /// Reset the attack timer and launch the current phase's attack.
    fn perform_attack(&mut self, squad_pos: Vec2, field: &Playfield) -> BossAttack {
        let phase = self.phases[self.phase];
        self.attack_timer.set(phase.interval);
        match phase.attack {
            BossAttack::Shockwave => {
                self.shockwave = Some(Shockwave {
                    radius: 0.0,
                    damage: self.shot_damage * 1.5,
                    hit_ids: Vec::new(),
                });
            }
            BossAttack::Summon => {
                self.summon_queue += self.summon_count + self.phase as u32;
                if !self.summon_timer.is_running() {
                    self.summon_timer.start(SUMMON_INTERVAL);
                }
            }
            BossAttack::Charge => {
                self.charge = ChargeState::Windup(Countdown::started(CHARGE_WINDUP));
            }
            BossAttack::Spread => {
                let count = 5 + 2 * self.phase;
                let aim = (squad_pos - self.pos).normalize_or_zero();
                let base = if aim == Vec2::ZERO {
                    std::f32::consts::FRAC_PI_2
                } else {
                    aim.y.atan2(aim.x)
                };
                for i in 0..count {
                    let t = if count > 1 { i as f32 / (count - 1) as f32 - 0.5 } else { 0.0 };
                    self.shot_queue.push_back(QueuedShot {
                        delay: if i == 0 { 0.0 } else { SPREAD_SHOT_DELAY },
                        dir: from_angle(base + t * SPREAD_ARC),
                    });
                }
            }
            BossAttack::AreaDenial => {
                for (dx, dy) in AREA_OFFSETS {
                    let pos = Vec2::new(field.clamp_to_road(squad_pos.x + dx, AREA_RADIUS * 0.5), squad_pos.y + dy);
                    self.warnings.push(AreaWarning {
                        pos,
                        radius: AREA_RADIUS,
                        damage: self.shot_damage * 2.0,
                        timer: Countdown::started(AREA_WARNING_DELAY),
                        detonated: false,
                        resolved: false,
                    });
                }
            }
            BossAttack::ShieldCharge => {
                self.shield.start(SHIELD_DURATION);
                self.charge_after_shield = true;
            }
        }
        log::debug!("boss {} attack {:?}", self.kind.name(), phase.attack);
        phase.attack
    }

    /// Minions whose summon delay elapsed since the last call.
    pub fn take_summons(&mut self) -> u32 {
        std::mem::take(&mut self.ready_summons)
    }

    /// Directions of spread shots whose delay elapsed since the last call.
    pub fn take_ready_shots(&mut self) -> Vec<Vec2> {
        std::mem::take(&mut self.ready_shots)
    }

    pub fn pending_shots(&self) -> usize {
        self.shot_queue.len() + self.ready_shots.len()
    }

    pub fn pending_summons(&self) -> u32 {
        self.summon_queue + self.ready_summons
    }
}
