//! The player's squad: roster, formation packing, growth and losses.
//!
//! The roster keeps recruitment order (oldest first). Losses that pick
//! victims take the newest members first; formation ordering is derived on
//! demand and never reorders the roster itself.

use std::collections::BTreeMap;

use engine_core::{ease, Playfield, Vec2};

use crate::balance::{Balance, CharacterKind, CharacterStats, UpgradeEffects};
use crate::character::Character;

/// Hard cap on active members.
pub const MAX_MEMBERS: usize = 999;
/// Distance of the squad row from the bottom of the playfield.
const ROW_OFFSET: f32 = 100.0;
/// Squad anchor easing toward the steering target, per second.
const STEER_RATE: f32 = 8.0;
/// Keep the anchor this far inside the road edges.
const STEER_MARGIN: f32 = 20.0;

/// Display tier derived from squad size. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Fireteam,
    Squad,
    Platoon,
    Company,
    Battalion,
    Legion,
}

impl Rank {
    pub fn for_size(size: usize) -> Self {
        match size {
            0..=4 => Rank::Fireteam,
            5..=11 => Rank::Squad,
            12..=29 => Rank::Platoon,
            30..=59 => Rank::Company,
            60..=99 => Rank::Battalion,
            _ => Rank::Legion,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Fireteam => "Fireteam",
            Rank::Squad => "Squad",
            Rank::Platoon => "Platoon",
            Rank::Company => "Company",
            Rank::Battalion => "Battalion",
            Rank::Legion => "Legion",
        }
    }
}

/// Grid spacing between member centres; tighter for big squads.
pub fn formation_spacing(size: usize) -> f32 {
    if size > 50 {
        6.0
    } else if size > 20 {
        8.0
    } else {
        10.0
    }
}

pub fn formation_columns(size: usize) -> usize {
    ((size as f32 * 1.5).sqrt().ceil() as usize).max(1)
}

#[derive(Debug)]
pub struct Squad {
    members: Vec<Character>,
    /// Anchor x (eased).
    pub x: f32,
    /// Steering target for the anchor.
    pub target_x: f32,
    /// Front row y.
    pub y: f32,
    field: Playfield,
    stats: BTreeMap<CharacterKind, CharacterStats>,
    next_id: u32,
    laid_out_for: usize,
}

impl Squad {
    /// Empty squad with balance stats and upgrade multipliers folded in.
    pub fn new(field: Playfield, balance: &Balance, effects: &UpgradeEffects) -> Self {
        let stats = CharacterKind::ALL
            .iter()
            .map(|&k| {
                let mut s = balance.character(k);
                s.damage *= effects.damage_mult;
                s.hp *= effects.hp_mult;
                if effects.fire_rate_mult > 0.0 {
                    s.fire_interval /= effects.fire_rate_mult;
                }
                (k, s)
            })
            .collect();
        let x = field.road_center();
        Self {
            members: Vec::new(),
            x,
            target_x: x,
            y: field.height - ROW_OFFSET,
            field,
            stats,
            next_id: 0,
            laid_out_for: 0,
        }
    }

    pub fn anchor(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Non-dying member count.
    pub fn size(&self) -> usize {
        self.members.iter().filter(|m| m.is_alive()).count()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Character> {
        self.members.iter().filter(|m| m.is_alive())
    }

    pub fn members(&self) -> &[Character] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Character] {
        &mut self.members
    }

    pub fn stats_for(&self, kind: CharacterKind) -> CharacterStats {
        self.stats.get(&kind).copied().unwrap_or_else(|| kind.default_stats())
    }

    pub fn rank(&self) -> Rank {
        Rank::for_size(self.size())
    }

    /// Append up to `count` members without crossing the cap. Returns how
    /// many joined.
    pub fn add_member(&mut self, kind: CharacterKind, count: u32) -> usize {
        let active = self.members.iter().filter(|m| m.is_active()).count();
        let room = MAX_MEMBERS.saturating_sub(active);
        let n = (count as usize).min(room);
        let stats = self.stats_for(kind);
        for _ in 0..n {
            let id = self.next_id;
            self.next_id += 1;
            self.members.push(Character::new(id, kind, stats, self.anchor()));
        }
        if n > 0 {
            self.update_formation();
        }
        n
    }

    /// Kill the `count` most recently recruited alive members. Returns how
    /// many died.
    pub fn remove_member(&mut self, count: usize) -> usize {
        let mut removed = 0;
        for m in self.members.iter_mut().rev() {
            if removed == count {
                break;
            }
            if m.is_alive() && m.take_damage(f32::MAX) {
                removed += 1;
            }
        }
        if removed > 0 {
            self.update_formation();
        }
        removed
    }

    /// Grow to `floor(size * factor)` with riflemen. Never shrinks.
    pub fn multiply_members(&mut self, factor: f32) -> usize {
        let size = self.size();
        let target = (size as f32 * factor).floor();
        if !(target > size as f32) {
            return 0;
        }
        let delta = (target as usize - size).min(MAX_MEMBERS) as u32;
        self.add_member(CharacterKind::Rifleman, delta)
    }

    /// Grow or shrink to exactly `target` members (clamped to the cap).
    pub fn resize_to(&mut self, target: usize) {
        let size = self.size();
        if target < size {
            self.remove_member(size - target);
        } else if target > size {
            self.add_member(CharacterKind::Rifleman, (target - size).min(MAX_MEMBERS) as u32);
        }
    }

    /// Lay alive members out on a near-square grid, front ranks first.
    pub fn update_formation(&mut self) {
        let mut order: Vec<usize> = (0..self.members.len())
            .filter(|&i| self.members[i].is_alive())
            .collect();
        // Stable: equal kinds keep recruitment order.
        order.sort_by_key(|&i| self.members[i].kind.formation_priority());

        let n = order.len();
        self.laid_out_for = n;
        if n == 0 {
            return;
        }
        let cols = formation_columns(n);
        let spacing = formation_spacing(n);
        let anchor = self.anchor();
        for (slot_index, &i) in order.iter().enumerate() {
            let row = slot_index / cols;
            let col = slot_index % cols;
            let in_row = cols.min(n - row * cols);
            let offset = Vec2::new(
                (col as f32 - (in_row as f32 - 1.0) * 0.5) * spacing,
                row as f32 * spacing,
            );
            let m = &mut self.members[i];
            m.slot = offset;
            m.target = anchor + offset;
        }
    }

    /// Set the steering target, clamped onto the road.
    pub fn steer(&mut self, x: f32) {
        if x.is_finite() {
            self.target_x = self.field.clamp_to_road(x, STEER_MARGIN);
        }
    }

    pub fn heal_all(&mut self, fraction: f32) {
        for m in self.members.iter_mut().filter(|m| m.is_alive()) {
            let amount = m.health.max * fraction;
            m.heal(amount);
        }
    }

    /// Mean position of alive members, or the anchor when nobody is left.
    pub fn centroid(&self) -> Vec2 {
        let (sum, n) = self
            .alive()
            .fold((Vec2::ZERO, 0usize), |(s, n), m| (s + m.pos, n + 1));
        if n == 0 {
            self.anchor()
        } else {
            sum / n as f32
        }
    }

    pub fn update(&mut self, dt: f32) {
        let eased = ease(Vec2::new(self.x, 0.0), Vec2::new(self.target_x, 0.0), STEER_RATE, dt);
        self.x = eased.x;
        if self.size() != self.laid_out_for {
            self.update_formation();
        }
        let anchor = self.anchor();
        for m in &mut self.members {
            if m.is_alive() {
                m.target = anchor + m.slot;
            }
            m.update(dt);
        }
    }

    /// Drop members whose death window has ended. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let before = self.members.len();
        self.members.retain(|m| m.is_active());
        before - self.members.len()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.laid_out_for = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squad() -> Squad {
        Squad::new(Playfield::default(), &Balance::default(), &UpgradeEffects::default())
    }

    #[test]
    fn cap_holds_for_any_addition_sequence() {
        let mut s = squad();
        assert_eq!(s.add_member(CharacterKind::Rifleman, 900), 900);
        assert_eq!(s.add_member(CharacterKind::Tanker, 50), 50);
        assert_eq!(s.add_member(CharacterKind::Sniper, 500), 49);
        assert_eq!(s.add_member(CharacterKind::Gunner, 1), 0);
        assert_eq!(s.multiply_members(3.0), 0);
        assert_eq!(s.size(), MAX_MEMBERS);
    }

    #[test]
    fn multiply_by_two_doubles() {
        let mut s = squad();
        s.add_member(CharacterKind::Rifleman, 5);
        s.multiply_members(2.0);
        assert_eq!(s.size(), 10);
        assert_eq!(s.multiply_members(0.5), 0, "multiply never shrinks");
        assert_eq!(s.size(), 10);
    }

    #[test]
    fn remove_takes_newest_members_first() {
        let mut s = squad();
        s.add_member(CharacterKind::Tanker, 2);
        s.add_member(CharacterKind::Sniper, 2);
        assert_eq!(s.remove_member(3), 3);
        let alive: Vec<CharacterKind> = s.alive().map(|m| m.kind).collect();
        assert_eq!(alive, vec![CharacterKind::Tanker]);
        assert_eq!(s.remove_member(5), 1);
        assert_eq!(s.size(), 0);
    }

    #[test]
    fn formation_is_idempotent() {
        let mut s = squad();
        s.add_member(CharacterKind::Rifleman, 13);
        s.add_member(CharacterKind::Bomber, 4);
        s.add_member(CharacterKind::Tanker, 3);
        s.update_formation();
        let first: Vec<Vec2> = s.members().iter().map(|m| m.target).collect();
        s.update_formation();
        let second: Vec<Vec2> = s.members().iter().map(|m| m.target).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn tankers_hold_the_front_row() {
        let mut s = squad();
        s.add_member(CharacterKind::Sniper, 6);
        s.add_member(CharacterKind::Tanker, 2);
        let front = s.members().iter().filter(|m| m.slot.y == 0.0);
        assert!(front.clone().any(|m| m.kind == CharacterKind::Tanker));
        let tanker_rows: Vec<f32> = s
            .members()
            .iter()
            .filter(|m| m.kind == CharacterKind::Tanker)
            .map(|m| m.slot.y)
            .collect();
        assert!(tanker_rows.iter().all(|y| *y == 0.0));
    }

    #[test]
    fn grid_shape_and_spacing_follow_size() {
        assert_eq!(formation_columns(1), 2);
        assert_eq!(formation_columns(6), 3);
        assert_eq!(formation_columns(100), 13);
        assert_eq!(formation_spacing(20), 10.0);
        assert_eq!(formation_spacing(21), 8.0);
        assert_eq!(formation_spacing(51), 6.0);
    }

    #[test]
    fn rank_thresholds() {
        assert_eq!(Rank::for_size(4), Rank::Fireteam);
        assert_eq!(Rank::for_size(5), Rank::Squad);
        assert_eq!(Rank::for_size(12), Rank::Platoon);
        assert_eq!(Rank::for_size(30), Rank::Company);
        assert_eq!(Rank::for_size(60), Rank::Battalion);
        assert_eq!(Rank::for_size(100), Rank::Legion);
    }

    #[test]
    fn steer_clamps_to_road() {
        let mut s = squad();
        s.steer(-500.0);
        assert_eq!(s.target_x, 70.0);
        s.steer(f32::NAN);
        assert_eq!(s.target_x, 70.0);
    }

    #[test]
    fn dead_members_are_pruned_after_their_window() {
        let mut s = squad();
        s.add_member(CharacterKind::Rifleman, 3);
        s.remove_member(1);
        s.update(0.1);
        assert_eq!(s.prune(), 0);
        s.update(0.15);
        assert_eq!(s.prune(), 1);
        assert_eq!(s.members().len(), 2);
    }

    #[test]
    fn upgrades_fold_into_member_stats() {
        let fx = UpgradeEffects {
            damage_mult: 2.0,
            hp_mult: 1.5,
            ..Default::default()
        };
        let s = Squad::new(Playfield::default(), &Balance::default(), &fx);
        let base = CharacterKind::Rifleman.default_stats();
        let got = s.stats_for(CharacterKind::Rifleman);
        assert_eq!(got.damage, base.damage * 2.0);
        assert_eq!(got.hp, base.hp * 1.5);
    }
}
