//! Combat resolution: targeting, weapon fire and every collision pass.
//!
//! Free functions over the run's collections. Nothing here owns state; what
//! died or exploded is written to a [`CombatLog`] the run controller drains.

use audio::{Cue, CueSink};
use engine_core::{from_angle, within, Vec2};
use rand::Rng;

use crate::balance::{EnemyKind, Weapon};
use crate::boss::{Boss, ChargeState, SHOCKWAVE_TOLERANCE};
use crate::buffs::Buffs;
use crate::bullet::{BulletPool, BulletSpec};
use crate::character::Character;
use crate::enemy::{Enemy, BLAST_RADIUS};
use crate::squad::Squad;

/// Forgiving inflation of enemy hitboxes for player rounds.
pub const HIT_RADIUS_BONUS: f32 = 6.0;
/// Enemy rounds hit a member within this distance.
pub const ENEMY_BULLET_HIT_RADIUS: f32 = 12.0;
pub const ENEMY_BULLET_SPEED: f32 = 220.0;
pub const MORTAR_SHELL_SPEED: f32 = 170.0;
pub const MORTAR_SHELL_RADIUS: f32 = 30.0;
pub const BOSS_SHOT_SPEED: f32 = 200.0;
/// Elite fan offsets in radians.
const ELITE_FAN: [f32; 3] = [-0.2, 0.0, 0.2];
/// Jitter for untargeted fire.
const IDLE_SPREAD: f32 = 0.08;
/// Hit-list id reserved for the boss.
pub const BOSS_TARGET_ID: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kill {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub reward: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberDeath {
    pub id: u32,
    pub kind: crate::balance::CharacterKind,
    pub pos: Vec2,
}

/// Everything the collision passes decided this tick.
#[derive(Debug, Default)]
pub struct CombatLog {
    pub kills: Vec<Kill>,
    pub member_deaths: Vec<MemberDeath>,
    pub explosions: Vec<(Vec2, f32)>,
    pub shield_blocks: Vec<Vec2>,
}

impl CombatLog {
    fn kill(&mut self, e: &Enemy) {
        self.kills.push(Kill {
            id: e.id,
            kind: e.kind,
            pos: e.pos,
            reward: e.reward,
        });
    }

    pub(crate) fn member_down(&mut self, m: &Character, cues: &mut dyn CueSink) {
        self.member_deaths.push(MemberDeath {
            id: m.id,
            kind: m.kind,
            pos: m.pos,
        });
        cues.play(Cue::MemberLost);
    }

    pub fn clear(&mut self) {
        self.kills.clear();
        self.member_deaths.clear();
        self.explosions.clear();
        self.shield_blocks.clear();
    }
}

// ── Firing ──────────────────────────────────────────────────────────────

struct Target {
    pos: Vec2,
    vel: Vec2,
}

fn nearest_target(from: Vec2, range: f32, enemies: &[Enemy], boss: Option<&Boss>, squad_pos: Vec2) -> Option<Target> {
    let mut best: Option<(f32, Target)> = None;
    for e in enemies.iter().filter(|e| e.is_alive()) {
        let d = from.distance_squared(e.pos);
        if d <= range * range && best.as_ref().map_or(true, |(bd, _)| d < *bd) {
            best = Some((
                d,
                Target {
                    pos: e.pos,
                    vel: e.lead_velocity(squad_pos),
                },
            ));
        }
    }
    if let Some(b) = boss.filter(|b| b.is_alive() && b.has_entered()) {
        let d = from.distance_squared(b.pos);
        let reach = range + b.radius;
        if d <= reach * reach && best.as_ref().map_or(true, |(bd, _)| d < *bd) {
            best = Some((d, Target { pos: b.pos, vel: b.vel }));
        }
    }
    best.map(|(_, t)| t)
}

/// Aim point after the bullet's flight time.
fn lead(from: Vec2, target: &Target, bullet_speed: f32) -> Vec2 {
    let flight = from.distance(target.pos) / bullet_speed.max(1.0);
    target.pos + target.vel * flight
}

/// Every ready member fires: at the nearest target in range with lead, or
/// straight ahead with jitter when nothing is in range.
pub fn squad_fire<R: Rng>(
    squad: &mut Squad,
    enemies: &[Enemy],
    boss: Option<&Boss>,
    pool: &mut BulletPool,
    buffs: &Buffs,
    rng: &mut R,
    cues: &mut dyn CueSink,
) -> usize {
    let squad_pos = squad.anchor();
    let damage_mult = buffs.damage_multiplier();
    let rate_mult = buffs.fire_rate_multiplier();
    let mut fired = 0;

    for m in squad.members_mut().iter_mut().filter(|m| m.can_fire()) {
        let stats = m.stats;
        let aim = match nearest_target(m.pos, stats.range, enemies, boss, squad_pos) {
            Some(t) => {
                let dir = (lead(m.pos, &t, stats.bullet_speed) - m.pos).normalize_or_zero();
                if dir == Vec2::ZERO {
                    Vec2::NEG_Y
                } else {
                    dir
                }
            }
            None => from_angle(-std::f32::consts::FRAC_PI_2 + rng.gen_range(-IDLE_SPREAD..=IDLE_SPREAD)),
        };
        let base = BulletSpec::player(m.pos, aim * stats.bullet_speed, stats.damage * damage_mult);
        match stats.weapon {
            Weapon::Single => {
                pool.spawn(base);
            }
            Weapon::Pierce => {
                pool.spawn(BulletSpec { pierce: true, ..base });
            }
            Weapon::Aoe { radius } => {
                pool.spawn(BulletSpec {
                    aoe_radius: Some(radius),
                    ..base
                });
            }
            Weapon::Spread { count, arc } => {
                let heading = aim.y.atan2(aim.x);
                for i in 0..count {
                    let t = if count > 1 { i as f32 / (count - 1) as f32 - 0.5 } else { 0.0 };
                    let dir = from_angle(heading + t * arc);
                    pool.spawn(BulletSpec {
                        vel: dir * stats.bullet_speed,
                        ..base
                    });
                }
            }
        }
        m.fire(rate_mult);
        fired += 1;
    }
    if fired > 0 {
        cues.play(Cue::Shoot);
    }
    fired
}

/// Ranged enemies fire at the squad centroid.
pub fn enemy_fire(enemies: &mut [Enemy], squad_centroid: Vec2, pool: &mut BulletPool) -> usize {
    let mut fired = 0;
    for e in enemies.iter_mut().filter(|e| e.can_fire()) {
        let aim = (squad_centroid - e.pos).normalize_or_zero();
        let aim = if aim == Vec2::ZERO { Vec2::Y } else { aim };
        match e.kind {
            EnemyKind::Shooter => {
                pool.spawn(BulletSpec::enemy(e.pos, aim * ENEMY_BULLET_SPEED, e.damage));
            }
            EnemyKind::Elite => {
                let heading = aim.y.atan2(aim.x);
                for offset in ELITE_FAN {
                    let dir = from_angle(heading + offset);
                    pool.spawn(BulletSpec::enemy(e.pos, dir * ENEMY_BULLET_SPEED, e.damage));
                }
            }
            EnemyKind::Mortar => {
                pool.spawn(BulletSpec {
                    aoe_radius: Some(MORTAR_SHELL_RADIUS),
                    ..BulletSpec::enemy(e.pos, aim * MORTAR_SHELL_SPEED, e.damage)
                });
            }
            EnemyKind::Rusher
            | EnemyKind::Detonator
            | EnemyKind::Thief
            | EnemyKind::Flanker
            | EnemyKind::Tank
            | EnemyKind::Brute => continue,
        }
        e.fire();
        fired += 1;
    }
    fired
}

/// Move released spread shots from the boss queue into the pool.
pub fn fire_boss_shots(boss: &mut Boss, pool: &mut BulletPool) -> usize {
    let shots = boss.take_ready_shots();
    for dir in &shots {
        let origin = boss.pos + *dir * boss.radius;
        pool.spawn(BulletSpec::enemy(origin, *dir * BOSS_SHOT_SPEED, boss.shot_damage));
    }
    shots.len()
}

// ── Collisions ──────────────────────────────────────────────────────────

/// Player rounds against the boss, then enemies in spawn order.
pub fn check_bullet_hits(
    pool: &mut BulletPool,
    enemies: &mut [Enemy],
    mut boss: Option<&mut Boss>,
    cues: &mut dyn CueSink,
    log: &mut CombatLog,
) {
    for b in pool.iter_active_mut().filter(|b| !b.is_enemy) {
        if let Some(boss) = boss.as_deref_mut() {
            if boss.is_alive() && !b.has_hit(BOSS_TARGET_ID) && within(b.pos, boss.pos, boss.radius) {
                if boss.is_shielded() {
                    cues.play(Cue::ShieldBlock);
                    b.deactivate();
                    continue;
                }
                cues.play(Cue::BossHit);
                if boss.take_damage(b.damage) {
                    cues.play(Cue::BossDeath);
                }
                if let Some(radius) = b.aoe_radius {
                    splash(enemies, None, b.pos, radius, b.damage, cues, log);
                }
                if !b.register_hit(BOSS_TARGET_ID) {
                    continue;
                }
            }
        }

        for i in 0..enemies.len() {
            if !b.active {
                break;
            }
            let e = &enemies[i];
            if !e.is_alive() || b.has_hit(e.id) || !within(b.pos, e.pos, e.radius + HIT_RADIUS_BONUS) {
                continue;
            }
            let (id, damage) = (e.id, b.damage);
            if enemies[i].take_damage(damage) {
                log.kill(&enemies[i]);
                cues.play(Cue::EnemyDeath);
            } else {
                cues.play(Cue::EnemyHit);
            }

            if let Some(radius) = b.aoe_radius {
                splash(enemies, Some(i), b.pos, radius, damage, cues, log);
            }

            b.register_hit(id);
        }
    }
}

/// Half damage, rounded up, to every alive enemy in `radius` except `direct`.
fn splash(
    enemies: &mut [Enemy],
    direct: Option<usize>,
    at: Vec2,
    radius: f32,
    damage: f32,
    cues: &mut dyn CueSink,
    log: &mut CombatLog,
) {
    let amount = (damage * 0.5).ceil();
    for (j, other) in enemies.iter_mut().enumerate() {
        if Some(j) != direct && other.is_alive() && within(at, other.pos, radius) && other.take_damage(amount) {
            log.kill(other);
            cues.play(Cue::EnemyDeath);
        }
    }
    log.explosions.push((at, radius));
    cues.play(Cue::Explosion);
}

/// Enemy rounds against the first alive member in roster order.
pub fn check_enemy_bullet_hits(
    pool: &mut BulletPool,
    squad: &mut Squad,
    buffs: &mut Buffs,
    cues: &mut dyn CueSink,
    log: &mut CombatLog,
) {
    for b in pool.iter_active_mut().filter(|b| b.is_enemy) {
        let members = squad.members_mut();
        let Some(i) = members
            .iter()
            .position(|m| m.is_alive() && within(b.pos, m.pos, ENEMY_BULLET_HIT_RADIUS))
        else {
            continue;
        };
        b.deactivate();
        if buffs.absorb_hit() {
            log.shield_blocks.push(members[i].pos);
            cues.play(Cue::ShieldBlock);
            continue;
        }
        cues.play(Cue::PlayerHit);
        if members[i].take_damage(b.damage) {
            log.member_down(&members[i], cues);
        }
        if let Some(radius) = b.aoe_radius {
            let splash = (b.damage * 0.5).ceil();
            let center = b.pos;
            for (j, m) in members.iter_mut().enumerate() {
                if j != i && m.is_alive() && within(center, m.pos, radius) && m.take_damage(splash) {
                    log.member_down(m, cues);
                }
            }
            log.explosions.push((center, radius));
            cues.play(Cue::Explosion);
        }
    }
}

/// Melee contact: rushers trade themselves for one hit; tanks and brutes
/// hit on their own cooldown.
pub fn check_contact_collisions(enemies: &mut [Enemy], squad: &mut Squad, cues: &mut dyn CueSink, log: &mut CombatLog) {
    let members = squad.members_mut();
    for e in enemies.iter_mut().filter(|e| e.is_alive() && e.kind.is_melee()) {
        let Some(m) = members
            .iter_mut()
            .find(|m| m.is_alive() && within(e.pos, m.pos, e.radius + m.stats.size))
        else {
            continue;
        };
        match e.kind {
            EnemyKind::Rusher => {
                if m.take_damage(e.damage) {
                    log.member_down(m, cues);
                }
                e.self_destruct();
                cues.play(Cue::PlayerHit);
            }
            EnemyKind::Tank | EnemyKind::Brute => {
                if !e.contact_ready() {
                    continue;
                }
                if m.take_damage(e.damage) {
                    log.member_down(m, cues);
                }
                e.start_contact_cooldown();
                cues.play(Cue::PlayerHit);
            }
            EnemyKind::Shooter
            | EnemyKind::Mortar
            | EnemyKind::Detonator
            | EnemyKind::Thief
            | EnemyKind::Flanker
            | EnemyKind::Elite => {}
        }
    }
}

/// Apply each blown detonator's blast exactly once.
pub fn check_detonations(enemies: &mut [Enemy], squad: &mut Squad, cues: &mut dyn CueSink, log: &mut CombatLog) {
    for e in enemies.iter_mut().filter(|e| e.pending_blast()) {
        for m in squad.members_mut().iter_mut() {
            if m.is_alive() && within(e.pos, m.pos, BLAST_RADIUS) && m.take_damage(e.damage) {
                log.member_down(m, cues);
            }
        }
        e.mark_blast_applied();
        log.explosions.push((e.pos, BLAST_RADIUS));
        cues.play(Cue::Explosion);
    }
}

/// Ring band hit, once per member per pulse.
pub fn check_boss_shockwave(boss: &mut Boss, squad: &mut Squad, cues: &mut dyn CueSink, log: &mut CombatLog) {
    let center = boss.pos;
    let Some(ring) = boss.shockwave.as_mut() else {
        return;
    };
    for m in squad.members_mut().iter_mut().filter(|m| m.is_alive()) {
        let d = m.pos.distance(center);
        if (d - ring.radius).abs() <= SHOCKWAVE_TOLERANCE && !ring.hit_ids.contains(&m.id) {
            ring.hit_ids.push(m.id);
            cues.play(Cue::PlayerHit);
            if m.take_damage(ring.damage) {
                log.member_down(m, cues);
            }
        }
    }
}

/// Dash contact, once per member per dash.
pub fn check_boss_charge(boss: &mut Boss, squad: &mut Squad, cues: &mut dyn CueSink, log: &mut CombatLog) {
    let (center, radius, damage) = (boss.pos, boss.radius, boss.contact_damage);
    let ChargeState::Dash { hit_ids, .. } = &mut boss.charge else {
        return;
    };
    for m in squad.members_mut().iter_mut().filter(|m| m.is_alive()) {
        if within(center, m.pos, radius + m.stats.size) && !hit_ids.contains(&m.id) {
            hit_ids.push(m.id);
            cues.play(Cue::PlayerHit);
            if m.take_damage(damage) {
                log.member_down(m, cues);
            }
        }
    }
}

/// Detonated area warnings damage everyone inside, then resolve.
pub fn check_area_warnings(boss: &mut Boss, squad: &mut Squad, cues: &mut dyn CueSink, log: &mut CombatLog) {
    for w in boss.warnings.iter_mut().filter(|w| w.detonated && !w.resolved) {
        for m in squad.members_mut().iter_mut() {
            if m.is_alive() && within(w.pos, m.pos, w.radius) && m.take_damage(w.damage) {
                log.member_down(m, cues);
            }
        }
        w.resolved = true;
        log.explosions.push((w.pos, w.radius));
        cues.play(Cue::Explosion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{Balance, BossKind, CharacterKind, ScalingRates, UpgradeEffects};
    use crate::difficulty::StageScaling;
    use audio::CueRecorder;
    use engine_core::Playfield;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn enemy(id: u32, kind: EnemyKind, pos: Vec2) -> Enemy {
        let scaling = StageScaling::for_stage(1, &ScalingRates::default());
        Enemy::spawn(id, kind, &kind.default_stats(), &scaling, pos)
    }

    fn squad_of(kind: CharacterKind, n: u32) -> Squad {
        let mut s = Squad::new(Playfield::default(), &Balance::default(), &UpgradeEffects::default());
        s.add_member(kind, n);
        for m in s.members_mut() {
            m.pos = m.target;
        }
        s
    }

    #[test]
    fn aoe_splash_hits_every_other_enemy_in_radius() {
        let mut pool = BulletPool::new(10);
        let at = Vec2::new(200.0, 200.0);
        pool.spawn(BulletSpec {
            aoe_radius: Some(40.0),
            ..BulletSpec::player(at, Vec2::ZERO, 20.0)
        });
        let mut enemies = vec![
            enemy(1, EnemyKind::Tank, at),
            enemy(2, EnemyKind::Tank, at + Vec2::new(25.0, 0.0)),
            enemy(3, EnemyKind::Tank, at + Vec2::new(0.0, -30.0)),
            enemy(4, EnemyKind::Tank, at + Vec2::new(90.0, 0.0)),
        ];
        let max = enemies[0].health.max;
        let mut log = CombatLog::default();
        check_bullet_hits(&mut pool, &mut enemies, None, &mut audio::NullSink, &mut log);
        assert_eq!(enemies[0].health.current, max - 20.0);
        assert_eq!(enemies[1].health.current, max - 10.0);
        assert_eq!(enemies[2].health.current, max - 10.0);
        assert_eq!(enemies[3].health.current, max);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn aoe_round_on_the_boss_splashes_nearby_enemies() {
        let field = Playfield::default();
        let scaling = StageScaling::for_stage(1, &ScalingRates::default());
        let kind = BossKind::Overlord;
        let mut boss = Boss::spawn(kind, &kind.default_stats(), &scaling, &field);
        boss.pos = Vec2::new(200.0, 120.0);
        let mut pool = BulletPool::new(4);
        pool.spawn(BulletSpec {
            aoe_radius: Some(60.0),
            ..BulletSpec::player(boss.pos, Vec2::ZERO, 20.0)
        });
        let mut enemies = vec![
            enemy(1, EnemyKind::Tank, boss.pos + Vec2::new(35.0, 0.0)),
            enemy(2, EnemyKind::Tank, boss.pos + Vec2::new(150.0, 0.0)),
        ];
        let max = enemies[0].health.max;
        let recorder = CueRecorder::new();
        let mut cues = recorder.clone();
        let mut log = CombatLog::default();
        check_bullet_hits(&mut pool, &mut enemies, Some(&mut boss), &mut cues, &mut log);
        assert!(boss.health.current < boss.health.max);
        assert_eq!(enemies[0].health.current, max - 10.0);
        assert_eq!(enemies[1].health.current, max);
        assert_eq!(log.explosions.len(), 1);
        assert_eq!(recorder.count(Cue::Explosion), 1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn non_piercing_round_stops_at_first_enemy() {
        let mut pool = BulletPool::new(10);
        let at = Vec2::new(200.0, 200.0);
        pool.spawn(BulletSpec::player(at, Vec2::ZERO, 5.0));
        let mut enemies = vec![enemy(1, EnemyKind::Tank, at), enemy(2, EnemyKind::Tank, at)];
        let max = enemies[0].health.max;
        check_bullet_hits(&mut pool, &mut enemies, None, &mut audio::NullSink, &mut CombatLog::default());
        assert_eq!(enemies[0].health.current, max - 5.0);
        assert_eq!(enemies[1].health.current, max);
    }

    #[test]
    fn piercing_round_stops_after_four_hits() {
        let mut pool = BulletPool::new(10);
        let at = Vec2::new(200.0, 200.0);
        pool.spawn(BulletSpec {
            pierce: true,
            ..BulletSpec::player(at, Vec2::ZERO, 1.0)
        });
        let mut enemies: Vec<Enemy> = (0..6).map(|i| enemy(i, EnemyKind::Tank, at)).collect();
        let max = enemies[0].health.max;
        let mut log = CombatLog::default();
        check_bullet_hits(&mut pool, &mut enemies, None, &mut audio::NullSink, &mut log);
        let hit = enemies.iter().filter(|e| e.health.current < max).count();
        assert_eq!(hit, 4);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn piercing_round_never_hits_the_same_enemy_twice() {
        let mut pool = BulletPool::new(10);
        let at = Vec2::new(200.0, 200.0);
        pool.spawn(BulletSpec {
            pierce: true,
            ..BulletSpec::player(at, Vec2::ZERO, 1.0)
        });
        let mut enemies = vec![enemy(1, EnemyKind::Tank, at)];
        let max = enemies[0].health.max;
        for _ in 0..3 {
            check_bullet_hits(&mut pool, &mut enemies, None, &mut audio::NullSink, &mut CombatLog::default());
        }
        assert_eq!(enemies[0].health.current, max - 1.0);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn shield_absorbs_two_of_three_bullets() {
        let mut squad = squad_of(CharacterKind::Tanker, 3);
        let mut pool = BulletPool::new(10);
        for m in squad.members() {
            pool.spawn(BulletSpec::enemy(m.pos, Vec2::ZERO, 10.0));
        }
        let mut buffs = Buffs::with_shield(2);
        let mut log = CombatLog::default();
        check_enemy_bullet_hits(&mut pool, &mut squad, &mut buffs, &mut audio::NullSink, &mut log);
        assert_eq!(buffs.shield_used, 2);
        assert_eq!(buffs.shield_charges, 0);
        let damaged = squad
            .members()
            .iter()
            .filter(|m| m.health.current < m.health.max)
            .count();
        assert_eq!(damaged, 1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn enemy_round_hits_first_member_in_roster_order() {
        let mut squad = squad_of(CharacterKind::Rifleman, 2);
        let p = squad.members()[1].pos;
        for m in squad.members_mut() {
            m.pos = p;
        }
        let mut pool = BulletPool::new(4);
        pool.spawn(BulletSpec::enemy(p, Vec2::ZERO, 5.0));
        check_enemy_bullet_hits(
            &mut pool,
            &mut squad,
            &mut Buffs::default(),
            &mut audio::NullSink,
            &mut CombatLog::default(),
        );
        let m = squad.members();
        assert!(m[0].health.current < m[0].health.max);
        assert_eq!(m[1].health.current, m[1].health.max);
    }

    #[test]
    fn rusher_contact_trades_itself_for_a_hit() {
        let mut squad = squad_of(CharacterKind::Tanker, 1);
        let pos = squad.members()[0].pos;
        let mut enemies = vec![enemy(1, EnemyKind::Rusher, pos)];
        let mut log = CombatLog::default();
        check_contact_collisions(&mut enemies, &mut squad, &mut audio::NullSink, &mut log);
        assert!(enemies[0].life.is_dying());
        assert!(log.kills.is_empty(), "contact deaths pay no reward");
        let m = &squad.members()[0];
        assert_eq!(m.health.current, m.health.max - enemies[0].damage);
    }

    #[test]
    fn brute_contact_respects_cooldown() {
        let mut squad = squad_of(CharacterKind::Tanker, 1);
        let pos = squad.members()[0].pos;
        let mut enemies = vec![enemy(1, EnemyKind::Brute, pos)];
        let mut log = CombatLog::default();
        for _ in 0..5 {
            check_contact_collisions(&mut enemies, &mut squad, &mut audio::NullSink, &mut log);
        }
        let m = &squad.members()[0];
        assert_eq!(m.health.current, m.health.max - enemies[0].damage);
        assert!(enemies[0].is_alive());
    }

    #[test]
    fn detonation_applies_once() {
        let mut squad = squad_of(CharacterKind::Tanker, 1);
        let pos = squad.members()[0].pos;
        let mut e = enemy(1, EnemyKind::Detonator, pos);
        e.behavior = crate::enemy::EnemyBehavior::Detonator {
            fuse: engine_core::Countdown::idle(),
            explode: true,
            blast_applied: false,
        };
        let mut enemies = vec![e];
        let recorder = CueRecorder::new();
        let mut cues = recorder.clone();
        let mut log = CombatLog::default();
        check_detonations(&mut enemies, &mut squad, &mut cues, &mut log);
        check_detonations(&mut enemies, &mut squad, &mut cues, &mut log);
        assert_eq!(recorder.count(Cue::Explosion), 1);
        let m = &squad.members()[0];
        assert_eq!(m.health.current, m.health.max - 30.0);
    }

    #[test]
    fn squad_never_goes_silent() {
        let mut squad = squad_of(CharacterKind::Rifleman, 4);
        let mut pool = BulletPool::new(50);
        let mut rng = StdRng::seed_from_u64(3);
        let fired = squad_fire(
            &mut squad,
            &[],
            None,
            &mut pool,
            &Buffs::default(),
            &mut rng,
            &mut audio::NullSink,
        );
        assert!(fired > 0);
        assert!(pool.iter_active().all(|b| b.vel.y < 0.0));
    }

    #[test]
    fn gunner_fires_a_fan() {
        let mut squad = squad_of(CharacterKind::Gunner, 1);
        let mut pool = BulletPool::new(50);
        let mut rng = StdRng::seed_from_u64(3);
        squad_fire(
            &mut squad,
            &[],
            None,
            &mut pool,
            &Buffs::default(),
            &mut rng,
            &mut audio::NullSink,
        );
        assert_eq!(pool.active_count(), 3);
    }

    #[test]
    fn lead_prediction_aims_ahead_of_a_flanker() {
        let mut squad = squad_of(CharacterKind::Sniper, 1);
        let shooter_pos = squad.members()[0].pos;
        let mut f = enemy(1, EnemyKind::Flanker, shooter_pos - Vec2::new(0.0, 300.0));
        f.behavior = crate::enemy::EnemyBehavior::Flanker { dir: 1.0 };
        let mut pool = BulletPool::new(4);
        let mut rng = StdRng::seed_from_u64(3);
        squad_fire(
            &mut squad,
            &[f],
            None,
            &mut pool,
            &Buffs::default(),
            &mut rng,
            &mut audio::NullSink,
        );
        let b = pool.iter_active().next().unwrap();
        assert!(b.pierce);
        assert!(b.vel.x > 0.0, "leads toward the flanker's travel");
    }

    #[test]
    fn elite_fans_three_rounds() {
        let mut e = enemy(1, EnemyKind::Elite, Vec2::new(200.0, 200.0));
        e.behavior = crate::enemy::EnemyBehavior::Ranged {
            fire: engine_core::Cooldown(0.0),
            in_band: true,
        };
        let mut enemies = vec![e];
        let mut pool = BulletPool::new(10);
        assert_eq!(enemy_fire(&mut enemies, Vec2::new(200.0, 600.0), &mut pool), 1);
        assert_eq!(pool.active_count(), 3);
        assert!(pool.iter_active().all(|b| b.is_enemy));
        assert!(!enemies[0].can_fire());
    }

    #[test]
    fn shielded_boss_eats_the_round_without_damage() {
        let field = Playfield::default();
        let scaling = StageScaling::for_stage(1, &ScalingRates::default());
        let kind = BossKind::Overlord;
        let mut boss = Boss::spawn(kind, &kind.default_stats(), &scaling, &field);
        boss.pos = Vec2::new(200.0, 120.0);
        boss.charge = ChargeState::Windup(engine_core::Countdown::started(1.0));
        let mut pool = BulletPool::new(4);
        pool.spawn(BulletSpec::player(boss.pos, Vec2::ZERO, 50.0));
        check_bullet_hits(&mut pool, &mut [], Some(&mut boss), &mut audio::NullSink, &mut CombatLog::default());
        assert_eq!(boss.health.current, boss.health.max);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn shockwave_hits_each_member_once_per_pulse() {
        let field = Playfield::default();
        let scaling = StageScaling::for_stage(1, &ScalingRates::default());
        let kind = BossKind::Colossus;
        let mut boss = Boss::spawn(kind, &kind.default_stats(), &scaling, &field);
        let mut squad = squad_of(CharacterKind::Tanker, 1);
        let m_pos = squad.members()[0].pos;
        boss.pos = m_pos - Vec2::new(0.0, 100.0);
        boss.shockwave = Some(crate::boss::Shockwave {
            radius: 100.0,
            damage: 5.0,
            hit_ids: Vec::new(),
        });
        let mut log = CombatLog::default();
        check_boss_shockwave(&mut boss, &mut squad, &mut audio::NullSink, &mut log);
        check_boss_shockwave(&mut boss, &mut squad, &mut audio::NullSink, &mut log);
        let m = &squad.members()[0];
        assert_eq!(m.health.current, m.health.max - 5.0);
    }
}
