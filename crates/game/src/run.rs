//! Run controller: the per-frame loop of a single run.
//!
//! Owns every live collection (squad, enemies, boss, pickups, gates, bullets)
//! and drives them through `Road → Combat` pairs and a closing `Boss`
//! segment. Endless runs loop the whole sequence, one stage harder per cycle,
//! until the squad is wiped.
//!
//! Tick order: timers and spawns → entity AI → weapon fire → bullet
//! movement → collisions, pickups and gates → pruning → segment transitions.

use audio::{Cue, CueSink};
use engine_core::{within, Cooldown, Countdown, FrameClock, Playfield, Vec2};

use crate::balance::{Balance, BossAttack, BossKind, CharacterKind, ItemEffect, TrapEffect, UpgradeEffects};
use crate::boss::Boss;
use crate::buffs::Buffs;
use crate::bullet::BulletPool;
use crate::combat::{self, CombatLog, MemberDeath};
use crate::config::{RunMode, RunSettings};
use crate::difficulty::StageScaling;
use crate::enemy::{Enemy, EnemyContext, EnemyOutcome};
use crate::error::SimError;
use crate::events::SimEvent;
use crate::gate::{gamble_size, roll_gamble, Gate, GateOp, Side};
use crate::pickup::{Pickup, PickupKind, PICKUP_RADIUS};
use crate::result::{star_rating, survival_rate, RunResult};
use crate::snapshot::RunSnapshot;
use crate::spawner::{Spawner, GATE_INTERVAL};
use crate::squad::Squad;

/// Road scroll speed for pickups and gates, px/s.
pub const ROAD_SCROLL_SPEED: f32 = 120.0;
/// Delay before the first wave of a combat segment.
const FIRST_WAVE_DELAY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Road,
    Combat,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Playing,
    /// Boss is down; waiting out the result delay.
    Victory,
    /// Squad wiped; the world is frozen until the sequence ends.
    Dying,
    Finished,
}

/// Running totals for the current run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub kills: u32,
    pub gold: u32,
    pub max_squad_size: usize,
    pub members_lost: u32,
    pub combo: u32,
    pub max_combo: u32,
}

pub struct RunController {
    settings: RunSettings,
    balance: Balance,
    upgrades: UpgradeEffects,
    cues: Box<dyn CueSink>,
    clock: FrameClock,
    field: Playfield,
    spawner: Spawner,

    squad: Squad,
    enemies: Vec<Enemy>,
    boss: Option<Boss>,
    pickups: Vec<Pickup>,
    gates: Vec<Gate>,
    bullets: BulletPool,
    buffs: Buffs,

    // ── Segment state ──
    segment: SegmentKind,
    segment_index: u32,
    /// Road/combat pairs finished in the current cycle.
    pairs_done: u32,
    segment_timer: Countdown,
    waves_spawned: u32,
    wave_timer: Cooldown,
    item_timer: Cooldown,
    gate_timer: Cooldown,

    phase: RunPhase,
    /// Result delay or death sequence, depending on `phase`.
    end_timer: Countdown,
    combo_timer: Countdown,
    stats: RunStats,
    cycles: u32,
    boss_defeated: bool,

    log: CombatLog,
    events: Vec<SimEvent>,
    result: Option<RunResult>,
}

impl RunController {
    /// Validate the tables, recruit the starting squad and open the first road.
    pub fn new(
        settings: RunSettings,
        balance: Balance,
        upgrades: UpgradeEffects,
        cues: Box<dyn CueSink>,
    ) -> Result<Self, SimError> {
        settings.validate()?;
        balance.validate()?;

        let field = Playfield::default();
        let scaling = StageScaling::for_stage(settings.stage, &balance.scaling);
        let spawner = Spawner::new(settings.seed, scaling);

        let mut squad = Squad::new(field, &balance, &upgrades);
        squad.add_member(
            settings.starting_kind,
            settings.starting_members.saturating_add(upgrades.extra_members),
        );
        for m in squad.members_mut() {
            m.pos = m.target;
        }

        let stats = RunStats {
            max_squad_size: squad.size(),
            ..Default::default()
        };

        let mut run = Self {
            clock: FrameClock::new(settings.max_dt),
            bullets: BulletPool::new(settings.bullet_capacity),
            buffs: Buffs::with_shield(upgrades.start_shields),
            settings,
            balance,
            upgrades,
            cues,
            field,
            spawner,
            squad,
            enemies: Vec::new(),
            boss: None,
            pickups: Vec::new(),
            gates: Vec::new(),
            segment: SegmentKind::Road,
            segment_index: 0,
            pairs_done: 0,
            segment_timer: Countdown::idle(),
            waves_spawned: 0,
            wave_timer: Cooldown::default(),
            item_timer: Cooldown::default(),
            gate_timer: Cooldown::default(),
            phase: RunPhase::Playing,
            end_timer: Countdown::idle(),
            combo_timer: Countdown::idle(),
            stats,
            cycles: 0,
            boss_defeated: false,
            log: CombatLog::default(),
            events: Vec::new(),
            result: None,
        };
        log::info!(
            "run started: {:?} mode, stage {}, {} members",
            run.settings.mode,
            run.settings.stage,
            run.squad.size()
        );
        run.enter_segment(SegmentKind::Road);
        Ok(run)
    }

    // ── Host interface ──────────────────────────────────────────────────

    /// Steer the squad toward `x` (canvas pixels).
    pub fn steer(&mut self, x: f32) {
        if self.phase == RunPhase::Playing {
            self.squad.steer(x);
        }
    }

    /// Advance the run by one frame. `raw_dt` is clamped to `max_dt`.
    pub fn tick(&mut self, raw_dt: f32) {
        if self.phase == RunPhase::Finished {
            return;
        }
        let dt = self.clock.advance(raw_dt);
        match self.phase {
            RunPhase::Playing => self.tick_playing(dt),
            RunPhase::Victory => {
                self.squad.update(dt);
                self.bullets.update(dt, &self.field);
                self.bullets.reclaim();
                if self.end_timer.tick(dt) {
                    self.finish(true);
                }
            }
            RunPhase::Dying => {
                if self.end_timer.tick(dt) {
                    self.finish(false);
                }
            }
            RunPhase::Finished => {}
        }
        self.cues.end_frame(dt);
    }

    /// End the run now as a loss. Pending timers, bullets and entities are
    /// dropped; later ticks do nothing.
    pub fn abort(&mut self) {
        if self.phase == RunPhase::Finished {
            return;
        }
        log::info!("run aborted at {:.1}s", self.clock.elapsed_seconds());
        self.finish(false);
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RunPhase::Finished
    }

    /// Summary of a finished run.
    pub fn result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> RunSnapshot<'_> {
        RunSnapshot {
            mode: self.settings.mode,
            stage: self.spawner.stage(),
            phase: self.phase,
            segment: self.segment,
            segment_index: self.segment_index.saturating_sub(1),
            segment_remaining: self.segment_timer.remaining(),
            cycles: self.cycles,
            elapsed: self.clock.elapsed_seconds(),
            field: &self.field,
            squad: &self.squad,
            enemies: &self.enemies,
            boss: self.boss.as_ref(),
            pickups: &self.pickups,
            gates: &self.gates,
            bullets: &self.bullets,
            buffs: &self.buffs,
            stats: &self.stats,
        }
    }

    // ── Segments ────────────────────────────────────────────────────────

    fn enter_segment(&mut self, kind: SegmentKind) {
        self.segment = kind;
        match kind {
            SegmentKind::Road => {
                self.segment_timer.start(self.settings.road_duration);
                self.item_timer.set(self.spawner.item_interval());
                self.gate_timer.set(GATE_INTERVAL);
            }
            SegmentKind::Combat => {
                self.segment_timer.start(self.settings.combat_duration);
                self.waves_spawned = 0;
                self.wave_timer.set(FIRST_WAVE_DELAY);
                self.item_timer.set(self.spawner.combat_item_interval());
            }
            SegmentKind::Boss => {
                self.segment_timer.clear();
                let kind = BossKind::for_stage(self.spawner.stage());
                let boss = Boss::spawn(kind, &self.balance.boss(kind), &self.spawner.scaling, &self.field);
                log::debug!("boss {} spawned with {:.0} hp", kind.name(), boss.health.max);
                self.boss = Some(boss);
                self.boss_defeated = false;
                self.events.push(SimEvent::BossSpawned { kind });
                self.cues.play(Cue::Warning);
            }
        }
        log::info!("segment {} ({:?}) at stage {}", self.segment_index, kind, self.spawner.stage());
        self.events.push(SimEvent::SegmentStarted {
            segment: kind,
            index: self.segment_index,
        });
        self.segment_index += 1;
    }

    /// Timer-driven spawning for the current segment.
    fn run_spawns(&mut self, dt: f32) {
        match self.segment {
            SegmentKind::Road => {
                if !self.segment_timer.is_running() {
                    return;
                }
                self.item_timer.tick(dt);
                if self.item_timer.ready() {
                    self.item_timer.set(self.spawner.item_interval());
                    if let Some(p) = self.spawner.road_pickup(&self.balance, &self.field) {
                        self.pickups.push(p);
                    }
                }
                self.gate_timer.tick(dt);
                if self.gate_timer.ready() {
                    self.gate_timer.set(GATE_INTERVAL);
                    if let Some(g) = self.spawner.gate(&self.balance) {
                        self.gates.push(g);
                    }
                }
            }
            SegmentKind::Combat => {
                if !self.segment_timer.is_running() {
                    return;
                }
                if self.waves_spawned < self.spawner.wave_cap() {
                    self.wave_timer.tick(dt);
                    if self.wave_timer.ready() {
                        self.wave_timer.set(self.spawner.wave_interval());
                        let wave = self.spawner.wave(&self.balance, self.waves_spawned, &self.field);
                        self.waves_spawned += 1;
                        for e in wave {
                            self.events.push(SimEvent::EnemySpawned { id: e.id, kind: e.kind });
                            self.enemies.push(e);
                        }
                    }
                }
                self.item_timer.tick(dt);
                if self.item_timer.ready() {
                    self.item_timer.set(self.spawner.combat_item_interval());
                    if let Some(p) = self.spawner.item(&self.balance, &self.field) {
                        self.pickups.push(p);
                    }
                }
            }
            SegmentKind::Boss => {}
        }
    }

    /// Move to the next segment once the current one is done.
    fn check_segment_end(&mut self) {
        match self.segment {
            SegmentKind::Road => {
                if !self.segment_timer.is_running() {
                    self.enter_segment(SegmentKind::Combat);
                }
            }
            SegmentKind::Combat => {
                if self.segment_timer.is_running() || !self.enemies.is_empty() {
                    return;
                }
                self.pairs_done += 1;
                if self.pairs_done < self.settings.road_pairs {
                    self.enter_segment(SegmentKind::Road);
                } else {
                    self.enter_segment(SegmentKind::Boss);
                }
            }
            SegmentKind::Boss => {
                if self.boss.as_ref().map_or(false, |b| b.is_active()) {
                    return;
                }
                self.boss = None;
                match self.settings.mode {
                    RunMode::Stage => {
                        self.phase = RunPhase::Victory;
                        self.end_timer.start(self.settings.result_delay);
                    }
                    RunMode::Endless => {
                        self.cycles += 1;
                        self.pairs_done = 0;
                        let stage = self.settings.stage + self.cycles;
                        self.spawner.scaling = StageScaling::for_stage(stage, &self.balance.scaling);
                        log::info!("endless cycle {} cleared, now stage {}", self.cycles, stage);
                        self.enter_segment(SegmentKind::Road);
                    }
                }
            }
        }
    }

    // ── Frame ───────────────────────────────────────────────────────────

    fn tick_playing(&mut self, dt: f32) {
        self.log.clear();

        // Timers and spawns.
        self.segment_timer.tick(dt);
        self.buffs.update(dt);
        if self.combo_timer.tick(dt) {
            self.stats.combo = 0;
        }
        self.run_spawns(dt);

        // Entity AI.
        self.squad.update(dt);
        for p in &mut self.pickups {
            p.update(dt, ROAD_SCROLL_SPEED, &self.field);
        }
        for g in &mut self.gates {
            g.update(dt, ROAD_SCROLL_SPEED, &self.field);
        }
        self.update_enemies(dt);
        self.update_boss(dt);

        // Fire.
        let boss_ref = self.boss.as_ref();
        combat::squad_fire(
            &mut self.squad,
            &self.enemies,
            boss_ref,
            &mut self.bullets,
            &self.buffs,
            self.spawner.rng(),
            self.cues.as_mut(),
        );
        combat::enemy_fire(&mut self.enemies, self.squad.centroid(), &mut self.bullets);
        if let Some(boss) = self.boss.as_mut() {
            combat::fire_boss_shots(boss, &mut self.bullets);
        }

        self.bullets.update(dt, &self.field);

        // Collisions.
        let cues = self.cues.as_mut();
        combat::check_bullet_hits(&mut self.bullets, &mut self.enemies, self.boss.as_mut(), cues, &mut self.log);
        combat::check_enemy_bullet_hits(&mut self.bullets, &mut self.squad, &mut self.buffs, cues, &mut self.log);
        combat::check_contact_collisions(&mut self.enemies, &mut self.squad, cues, &mut self.log);
        combat::check_detonations(&mut self.enemies, &mut self.squad, cues, &mut self.log);
        if let Some(boss) = self.boss.as_mut() {
            combat::check_boss_shockwave(boss, &mut self.squad, cues, &mut self.log);
            combat::check_boss_charge(boss, &mut self.squad, cues, &mut self.log);
            combat::check_area_warnings(boss, &mut self.squad, cues, &mut self.log);
        }
        self.collect_pickups();
        self.cross_gates();
        self.record_combat();

        // Prune.
        self.enemies.retain(|e| e.is_active());
        self.pickups.retain(|p| p.is_active());
        self.gates.retain(|g| g.is_active());
        self.squad.prune();
        self.bullets.reclaim();

        let size = self.squad.size();
        self.stats.max_squad_size = self.stats.max_squad_size.max(size);

        if size == 0 && !self.boss_defeated {
            log::info!("squad wiped at {:.1}s", self.clock.elapsed_seconds());
            self.phase = RunPhase::Dying;
            self.end_timer.start(self.settings.death_sequence);
            self.segment_timer.clear();
            self.combo_timer.clear();
            return;
        }
        self.check_segment_end();
    }

    fn update_enemies(&mut self, dt: f32) {
        let ctx = EnemyContext {
            squad_pos: self.squad.centroid(),
            field: &self.field,
            pickups: &self.pickups,
        };
        let mut stolen = Vec::new();
        for e in &mut self.enemies {
            match e.update(dt, &ctx) {
                EnemyOutcome::None | EnemyOutcome::FuseBlown => {}
                EnemyOutcome::Stole(item) => stolen.push(item),
                EnemyOutcome::Escaped => {
                    log::debug!("{} #{} escaped", e.kind.name(), e.id);
                    self.events.push(SimEvent::EnemyEscaped { id: e.id, kind: e.kind });
                }
            }
        }
        for id in stolen {
            if let Some(p) = self.pickups.iter_mut().find(|p| p.id == id && p.is_stealable()) {
                p.steal();
                self.events.push(SimEvent::ItemStolen { id, pos: p.pos });
            }
        }
    }

    fn update_boss(&mut self, dt: f32) {
        let Some(boss) = self.boss.as_mut() else {
            return;
        };
        let tick = boss.update(dt, self.squad.centroid(), &self.field);
        if tick.phase_changed {
            self.events.push(SimEvent::BossPhase { phase: boss.phase() });
            self.cues.play(Cue::BossPhase);
        }
        match tick.attack {
            Some(BossAttack::Shockwave) => self.cues.play(Cue::Explosion),
            Some(BossAttack::Summon) => self.cues.play(Cue::Summon),
            Some(BossAttack::Charge | BossAttack::ShieldCharge | BossAttack::AreaDenial) => {
                self.cues.play(Cue::Warning)
            }
            Some(BossAttack::Spread) | None => {}
        }

        let (kind, pos, summons) = (boss.kind, boss.pos, boss.take_summons());
        for _ in 0..summons {
            let e = self.spawner.minion(&self.balance, kind, pos, &self.field);
            self.events.push(SimEvent::EnemySpawned { id: e.id, kind: e.kind });
            self.enemies.push(e);
        }
    }

    // ── Pickups and gates ───────────────────────────────────────────────

    fn collect_pickups(&mut self) {
        let mut sprung = Vec::new();
        for p in self.pickups.iter_mut().filter(|p| p.life.is_alive() && !p.triggered) {
            let touched = self
                .squad
                .alive()
                .any(|m| within(m.pos, p.pos, PICKUP_RADIUS + m.stats.size));
            if touched && p.trigger() {
                sprung.push((p.kind, p.pos));
            }
        }
        for (kind, pos) in sprung {
            match kind {
                PickupKind::Item(item) => {
                    self.apply_item(self.balance.item(item).effect);
                    self.events.push(SimEvent::ItemCollected { kind: item, pos });
                    self.cues.play(Cue::ItemCollect);
                }
                PickupKind::Trap(trap) => {
                    self.spring_trap(self.balance.trap(trap).effect, pos);
                    self.events.push(SimEvent::TrapTriggered { kind: trap, pos });
                    self.cues.play(Cue::TrapTriggered);
                }
            }
        }
    }

    fn apply_item(&mut self, effect: ItemEffect) {
        match effect {
            ItemEffect::Recruit { kind, count } => {
                self.squad.add_member(kind, count);
            }
            ItemEffect::Heal { fraction } => self.squad.heal_all(fraction),
            ItemEffect::Buff(grant) => self.buffs.grant(grant),
            ItemEffect::Gold { amount } => self.award_gold(amount),
        }
    }

    fn spring_trap(&mut self, effect: TrapEffect, pos: Vec2) {
        match effect {
            TrapEffect::Cull { count } => self.cull(count as usize),
            TrapEffect::Blast { radius, damage } => {
                for m in self.squad.members_mut().iter_mut() {
                    if m.is_alive() && within(pos, m.pos, radius) && m.take_damage(damage) {
                        self.log.member_down(m, self.cues.as_mut());
                    }
                }
                self.log.explosions.push((pos, radius));
                self.cues.play(Cue::Explosion);
            }
        }
    }

    /// Kill the `count` newest members and log them as losses.
    fn cull(&mut self, count: usize) {
        let victims: Vec<MemberDeath> = self
            .squad
            .members()
            .iter()
            .rev()
            .filter(|m| m.is_alive())
            .take(count)
            .map(|m| MemberDeath {
                id: m.id,
                kind: m.kind,
                pos: m.pos,
            })
            .collect();
        self.squad.remove_member(count);
        for v in victims {
            self.cues.play(Cue::MemberLost);
            self.log.member_deaths.push(v);
        }
    }

    fn cross_gates(&mut self) {
        let anchor = self.squad.anchor();
        let mut crossed = Vec::new();
        for g in self.gates.iter_mut().filter(|g| g.reached(anchor)) {
            let side = g.side_for(anchor.x, &self.field);
            if let Some(op) = g.choose(side) {
                crossed.push((side, op));
            }
        }
        for (side, op) in crossed {
            self.apply_gate(side, op);
        }
    }

    fn apply_gate(&mut self, side: Side, op: GateOp) {
        let mut gamble = None;
        match op {
            GateOp::Add(n) if n >= 0 => {
                self.squad.add_member(CharacterKind::Rifleman, n as u32);
            }
            GateOp::Add(n) => self.cull(n.unsigned_abs() as usize),
            GateOp::Multiply(factor) => {
                self.squad.multiply_members(factor);
            }
            GateOp::Gamble {
                win_factor,
                lose_factor,
                chance,
            } => {
                let outcome = roll_gamble(self.spawner.rng(), chance);
                let size = self.squad.size();
                let target = gamble_size(size, outcome, win_factor, lose_factor);
                if target < size {
                    self.cull(size - target);
                } else {
                    self.squad.resize_to(target);
                }
                gamble = Some(outcome);
            }
            GateOp::AddType { kind, count } => {
                self.squad.add_member(kind, count);
            }
            GateOp::Buff(grant) => self.buffs.grant(grant),
        }
        log::debug!("gate {:?}: {} -> {} members", side, op.label(), self.squad.size());
        self.events.push(SimEvent::GatePassed { side, op, gamble });
        self.cues.play(Cue::GatePass);
    }

    // ── Scoring ─────────────────────────────────────────────────────────

    fn award_gold(&mut self, base: u32) {
        let gold = (base as f32 * self.upgrades.gold_mult).round().max(0.0) as u32;
        self.stats.gold = self.stats.gold.saturating_add(gold);
    }

    /// Fold this tick's combat log into stats and events.
    fn record_combat(&mut self) {
        let kills = std::mem::take(&mut self.log.kills);
        for k in &kills {
            self.stats.kills += 1;
            self.award_gold(k.reward);
            self.events.push(SimEvent::EnemyKilled {
                id: k.id,
                kind: k.kind,
                pos: k.pos,
                reward: k.reward,
            });

            self.stats.combo += 1;
            self.stats.max_combo = self.stats.max_combo.max(self.stats.combo);
            self.combo_timer.start(self.settings.combo_window);
            if self.settings.combo_bonus_every > 0 && self.stats.combo % self.settings.combo_bonus_every == 0 {
                let bonus = self.settings.combo_bonus_gold;
                self.award_gold(bonus);
                self.events.push(SimEvent::Combo {
                    count: self.stats.combo,
                    bonus_gold: bonus,
                });
                self.cues.play(Cue::Combo);
            }
        }
        self.log.kills = kills;

        for d in &self.log.member_deaths {
            self.stats.members_lost += 1;
            self.events.push(SimEvent::MemberLost {
                id: d.id,
                kind: d.kind,
                pos: d.pos,
            });
        }
        for &(pos, radius) in &self.log.explosions {
            self.events.push(SimEvent::Explosion { pos, radius });
        }
        for &pos in &self.log.shield_blocks {
            self.events.push(SimEvent::ShieldBlocked { pos });
        }

        if let Some(boss) = &self.boss {
            if !boss.is_alive() && !self.boss_defeated {
                self.boss_defeated = true;
                self.events.push(SimEvent::BossDefeated { kind: boss.kind });
            }
        }
    }

    fn finish(&mut self, cleared: bool) {
        let final_size = self.squad.size();
        let survival = survival_rate(final_size, self.stats.max_squad_size);
        let result = RunResult {
            mode: self.settings.mode,
            stage: self.settings.stage,
            cleared,
            kills: self.stats.kills,
            gold: self.stats.gold,
            max_squad_size: self.stats.max_squad_size,
            final_squad_size: final_size,
            boss_defeated: self.boss_defeated || self.cycles > 0,
            stars: star_rating(cleared, survival),
            survival_rate: survival,
            elapsed: self.clock.elapsed_seconds(),
            max_combo: self.stats.max_combo,
            members_lost: self.stats.members_lost,
            shield_used: self.buffs.shield_used,
            cycles: self.cycles,
        };
        log::info!(
            "run ended ({}): {} kills, {} gold, {} stars",
            if cleared { "cleared" } else { "lost" },
            result.kills,
            result.gold,
            result.stars
        );

        self.segment_timer.clear();
        self.end_timer.clear();
        self.combo_timer.clear();
        self.bullets.clear();
        self.enemies.clear();
        self.pickups.clear();
        self.gates.clear();
        self.boss = None;
        self.buffs.clear();
        self.squad.clear();

        self.cues.play(if cleared { Cue::Victory } else { Cue::GameOver });
        self.events.push(SimEvent::RunEnded { cleared });
        self.result = Some(result);
        self.phase = RunPhase::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{EnemyKind, ItemKind, ScalingRates, TrapKind};
    use crate::gate::GambleOutcome;
    use audio::{CueRecorder, NullSink};

    const DT: f32 = 1.0 / 60.0;

    fn settings() -> RunSettings {
        RunSettings {
            seed: Some(7),
            ..Default::default()
        }
    }

    fn run_with(settings: RunSettings) -> RunController {
        RunController::new(settings, Balance::default(), UpgradeEffects::default(), Box::new(NullSink)).unwrap()
    }

    fn run() -> RunController {
        run_with(settings())
    }

    fn enemy(run: &mut RunController, kind: EnemyKind, pos: Vec2) -> Enemy {
        let scaling = StageScaling::for_stage(1, &ScalingRates::default());
        Enemy::spawn(run.spawner.next_id(), kind, &kind.default_stats(), &scaling, pos)
    }

    fn tick_until(run: &mut RunController, max_ticks: usize, done: impl Fn(&RunController) -> bool) {
        for _ in 0..max_ticks {
            if done(run) {
                return;
            }
            run.tick(DT);
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad = RunSettings {
            stage: 0,
            ..settings()
        };
        assert!(RunController::new(bad, Balance::default(), UpgradeEffects::default(), Box::new(NullSink)).is_err());
    }

    #[test]
    fn upgrades_shape_the_starting_squad() {
        let fx = UpgradeEffects {
            extra_members: 3,
            start_shields: 2,
            ..Default::default()
        };
        let run = RunController::new(settings(), Balance::default(), fx, Box::new(NullSink)).unwrap();
        assert_eq!(run.squad.size(), 8);
        assert_eq!(run.buffs.shield_charges, 2);
    }

    #[test]
    fn opens_on_the_first_road() {
        let mut run = run();
        assert_eq!(run.segment, SegmentKind::Road);
        let events = run.drain_events();
        assert_eq!(
            events[0],
            SimEvent::SegmentStarted {
                segment: SegmentKind::Road,
                index: 0
            }
        );
        assert!(run.drain_events().is_empty());
    }

    #[test]
    fn road_advances_to_combat_on_timer() {
        let mut run = run();
        tick_until(&mut run, 2000, |r| r.segment != SegmentKind::Road);
        assert_eq!(run.segment, SegmentKind::Combat);
        assert!(run.clock.elapsed_seconds() >= run.settings.road_duration - 0.01);
    }

    #[test]
    fn combat_waits_for_the_last_enemy() {
        let mut run = run();
        run.enter_segment(SegmentKind::Combat);
        run.segment_timer.clear();
        let e = enemy(&mut run, EnemyKind::Tank, Vec2::new(200.0, 50.0));
        run.enemies.push(e);

        run.tick(DT);
        assert_eq!(run.segment, SegmentKind::Combat, "an enemy is still on the field");

        run.enemies[0].life.deactivate();
        run.tick(DT);
        assert_eq!(run.segment, SegmentKind::Road);
        assert_eq!(run.pairs_done, 1);
    }

    #[test]
    fn last_pair_leads_to_the_boss() {
        let mut run = run();
        run.pairs_done = run.settings.road_pairs - 1;
        run.enter_segment(SegmentKind::Combat);
        run.segment_timer.clear();
        run.tick(DT);
        assert_eq!(run.segment, SegmentKind::Boss);
        assert!(run.boss.is_some());
        assert!(run
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::BossSpawned { .. })));
    }

    #[test]
    fn multiply_gate_doubles_the_squad() {
        let mut run = run();
        assert_eq!(run.squad.size(), 5);
        let y = run.squad.y;
        let id = run.spawner.next_id();
        // Squad sits on the road centre, which counts as the right side.
        run.gates.push(Gate::new(id, GateOp::Add(1), GateOp::Multiply(2.0), y));
        run.tick(DT);
        assert_eq!(run.squad.size(), 10);
        assert!(run.drain_events().iter().any(|e| matches!(
            e,
            SimEvent::GatePassed {
                side: Side::Right,
                op: GateOp::Multiply(_),
                ..
            }
        )));
    }

    #[test]
    fn gamble_gate_branches() {
        let mut run = run_with(RunSettings {
            starting_members: 10,
            ..settings()
        });
        let lose = GateOp::Gamble {
            win_factor: 3.0,
            lose_factor: 0.5,
            chance: 0.0,
        };
        run.apply_gate(Side::Left, lose);
        assert_eq!(run.squad.size(), 5);
        assert_eq!(run.log.member_deaths.len(), 5);

        let mut run = run_with(RunSettings {
            starting_members: 10,
            ..settings()
        });
        let win = GateOp::Gamble {
            win_factor: 3.0,
            lose_factor: 0.5,
            chance: 1.0,
        };
        run.apply_gate(Side::Left, win);
        assert_eq!(run.squad.size(), 30);
        assert!(run.drain_events().iter().any(|e| matches!(
            e,
            SimEvent::GatePassed {
                gamble: Some(GambleOutcome::Win),
                ..
            }
        )));
    }

    #[test]
    fn negative_add_gate_culls_newest() {
        let mut run = run();
        let newest = run.squad.members().last().unwrap().id;
        run.apply_gate(Side::Left, GateOp::Add(-2));
        assert_eq!(run.squad.size(), 3);
        assert!(run.log.member_deaths.iter().any(|d| d.id == newest));
    }

    #[test]
    fn recruit_item_joins_on_touch() {
        let mut run = run();
        let at = run.squad.members()[0].pos;
        let id = run.spawner.next_id();
        run.pickups.push(Pickup::new(id, PickupKind::Item(ItemKind::Recruit), at));
        run.tick(DT);
        assert_eq!(run.squad.size(), 7);
        assert!(run.pickups[0].triggered);
    }

    #[test]
    fn spike_trap_costs_members() {
        let mut run = run();
        let at = run.squad.members()[0].pos;
        let id = run.spawner.next_id();
        run.pickups.push(Pickup::new(id, PickupKind::Trap(TrapKind::Spikes), at));
        run.tick(DT);
        assert_eq!(run.squad.size(), 3);
        assert_eq!(run.stats.members_lost, 2);
    }

    #[test]
    fn thief_steals_an_item_before_the_squad_gets_it() {
        let mut run = run();
        let item_pos = Vec2::new(200.0, 200.0);
        let id = run.spawner.next_id();
        run.pickups.push(Pickup::new(id, PickupKind::Item(ItemKind::GoldBag), item_pos));
        let thief = enemy(&mut run, EnemyKind::Thief, item_pos);
        run.enemies.push(thief);
        run.tick(DT);
        assert!(run.pickups.iter().all(|p| p.id != id));
        assert_eq!(run.stats.gold, 0);
        assert!(run
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::ItemStolen { id: stolen, .. } if *stolen == id)));
    }

    #[test]
    fn every_fifth_combo_kill_pays_a_bonus() {
        let mut run = run();
        for i in 0..5 {
            run.log.kills.push(combat::Kill {
                id: i,
                kind: EnemyKind::Rusher,
                pos: Vec2::ZERO,
                reward: 2,
            });
        }
        run.record_combat();
        assert_eq!(run.stats.kills, 5);
        assert_eq!(run.stats.max_combo, 5);
        assert_eq!(run.stats.gold, 5 * 2 + run.settings.combo_bonus_gold);
    }

    #[test]
    fn combo_decays_without_kills() {
        let mut run = run();
        run.log.kills.push(combat::Kill {
            id: 1,
            kind: EnemyKind::Rusher,
            pos: Vec2::ZERO,
            reward: 1,
        });
        run.record_combat();
        assert_eq!(run.stats.combo, 1);
        tick_until(&mut run, 200, |r| r.stats.combo == 0);
        assert_eq!(run.stats.combo, 0);
        assert_eq!(run.stats.max_combo, 1);
    }

    #[test]
    fn gold_upgrade_scales_rewards() {
        let fx = UpgradeEffects {
            gold_mult: 1.5,
            ..Default::default()
        };
        let mut run = RunController::new(settings(), Balance::default(), fx, Box::new(NullSink)).unwrap();
        run.award_gold(10);
        assert_eq!(run.stats.gold, 15);
    }

    #[test]
    fn wiped_squad_plays_the_death_sequence_then_loses() {
        let mut run = run();
        let n = run.squad.size();
        run.squad.remove_member(n);
        run.tick(DT);
        assert_eq!(run.phase, RunPhase::Dying);
        run.tick(1.0);
        assert!(!run.is_finished(), "max_dt clamps a long frame");
        tick_until(&mut run, 200, |r| r.is_finished());
        let result = run.result().unwrap();
        assert!(!result.cleared);
        assert_eq!(result.stars, 0);
    }

    #[test]
    fn beating_the_boss_clears_the_stage() {
        let recorder = CueRecorder::new();
        let mut run =
            RunController::new(settings(), Balance::default(), UpgradeEffects::default(), Box::new(recorder.clone()))
                .unwrap();
        run.enter_segment(SegmentKind::Boss);
        if let Some(boss) = run.boss.as_mut() {
            assert!(boss.take_damage(f32::MAX));
        }
        run.tick(DT);
        assert!(run.boss_defeated);
        tick_until(&mut run, 400, |r| r.is_finished());
        let result = run.result().unwrap();
        assert!(result.cleared);
        assert!(result.boss_defeated);
        assert!(result.stars >= 1);
        assert_eq!(recorder.count(Cue::Victory), 1);
        assert!(run
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::RunEnded { cleared: true })));
    }

    #[test]
    fn boss_segment_holds_through_the_death_window() {
        let mut run = run();
        run.enter_segment(SegmentKind::Boss);
        if let Some(boss) = run.boss.as_mut() {
            assert!(boss.take_damage(f32::MAX));
        }
        // 84 frames is 1.4 s of the 1.5 s window.
        for _ in 0..84 {
            run.tick(DT);
        }
        assert_eq!(run.phase, RunPhase::Playing);
        assert_eq!(run.segment, SegmentKind::Boss);
        assert!(run.boss.as_ref().map_or(false, |b| b.is_active()));

        for _ in 84..91 {
            run.tick(DT);
        }
        assert_eq!(run.phase, RunPhase::Victory);
        assert!(run.boss.is_none());
        assert!(!run.is_finished());
    }

    #[test]
    fn endless_boss_starts_a_harder_cycle() {
        let mut run = run_with(RunSettings {
            mode: RunMode::Endless,
            ..settings()
        });
        run.enter_segment(SegmentKind::Boss);
        if let Some(boss) = run.boss.as_mut() {
            boss.take_damage(f32::MAX);
        }
        tick_until(&mut run, 400, |r| r.segment == SegmentKind::Road);
        assert_eq!(run.cycles, 1);
        assert_eq!(run.spawner.stage(), 2);
        assert!(!run.is_finished());
        assert_eq!(run.phase, RunPhase::Playing);
    }

    #[test]
    fn ticks_after_abort_are_ignored() {
        let mut run = run();
        run.tick(DT);
        run.abort();
        let elapsed = run.clock.elapsed_seconds();
        let result = run.result().cloned();
        run.drain_events();

        run.tick(DT);
        run.abort();
        assert_eq!(run.clock.elapsed_seconds(), elapsed);
        assert_eq!(run.result().cloned(), result);
        assert!(run.drain_events().is_empty());
        assert_eq!(run.bullets.active_count(), 0);
        assert!(run.enemies.is_empty());
        assert_eq!(run.squad.size(), 0);
        assert_eq!(run.result().map(|r| r.final_squad_size), Some(5));
    }

    #[test]
    fn seeded_runs_repeat_exactly() {
        let mut a = run();
        let mut b = run();
        for i in 0..1200 {
            let x = 120.0 + (i % 240) as f32;
            a.steer(x);
            b.steer(x);
            a.tick(DT);
            b.tick(DT);
        }
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.squad.size(), b.squad.size());
        assert_eq!(a.segment_index, b.segment_index);
    }

    #[test]
    fn long_run_keeps_its_bounds() {
        let mut run = run_with(RunSettings {
            mode: RunMode::Endless,
            starting_members: 40,
            ..settings()
        });
        for _ in 0..3000 {
            run.tick(DT);
            assert!(run.bullets.active_count() <= run.bullets.capacity());
            assert!(run.squad.size() <= crate::squad::MAX_MEMBERS);
            if run.is_finished() {
                break;
            }
        }
    }
}
