//! Projectiles and the fixed-capacity pool that recycles them.

use std::collections::VecDeque;

use engine_core::{Playfield, Vec2};

/// A piercing round is consumed on its fourth hit.
pub const MAX_PIERCE_HITS: u32 = 4;
/// Bullets this far outside the playfield are retired.
pub const BOUNDS_MARGIN: f32 = 20.0;
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct Bullet {
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub is_enemy: bool,
    pub aoe_radius: Option<f32>,
    pub pierce: bool,
    pub pierce_hits: u32,
    /// Spawn stamp; orders bullets by age.
    pub serial: u64,
    /// Enemies already struck by this round.
    pub hit_ids: Vec<u32>,
    pub active: bool,
    in_free_list: bool,
}

impl Bullet {
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Record a hit on `enemy_id`. Returns true if the bullet survives it.
    pub fn register_hit(&mut self, enemy_id: u32) -> bool {
        self.hit_ids.push(enemy_id);
        if self.pierce {
            self.pierce_hits += 1;
            if self.pierce_hits < MAX_PIERCE_HITS {
                return true;
            }
        }
        self.active = false;
        false
    }

    pub fn has_hit(&self, enemy_id: u32) -> bool {
        self.hit_ids.contains(&enemy_id)
    }
}

/// Spawn parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletSpec {
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub is_enemy: bool,
    pub aoe_radius: Option<f32>,
    pub pierce: bool,
}

impl BulletSpec {
    pub fn player(pos: Vec2, vel: Vec2, damage: f32) -> Self {
        Self {
            pos,
            vel,
            damage,
            is_enemy: false,
            aoe_radius: None,
            pierce: false,
        }
    }

    pub fn enemy(pos: Vec2, vel: Vec2, damage: f32) -> Self {
        Self {
            is_enemy: true,
            ..Self::player(pos, vel, damage)
        }
    }
}

/// Recycling projectile pool.
///
/// Slots are never freed. Spawning reuses a reclaimed slot, grows below
/// capacity, and at capacity overwrites the oldest live bullet.
#[derive(Debug)]
pub struct BulletPool {
    bullets: Vec<Bullet>,
    free: Vec<usize>,
    /// Spawn order as (slot, serial); stale entries are skipped lazily.
    order: VecDeque<(usize, u64)>,
    capacity: usize,
    next_serial: u64,
}

impl BulletPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bullets: Vec::with_capacity(capacity),
            free: Vec::new(),
            order: VecDeque::with_capacity(capacity),
            capacity,
            next_serial: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn spawn(&mut self, spec: BulletSpec) -> usize {
        let slot = if let Some(i) = self.free.pop() {
            self.bullets[i].in_free_list = false;
            i
        } else if self.bullets.len() < self.capacity {
            self.bullets.push(Bullet::default());
            self.bullets.len() - 1
        } else {
            self.take_oldest()
        };

        let serial = self.next_serial;
        self.next_serial += 1;
        let b = &mut self.bullets[slot];
        b.pos = spec.pos;
        b.vel = spec.vel;
        b.damage = spec.damage;
        b.is_enemy = spec.is_enemy;
        b.aoe_radius = spec.aoe_radius;
        b.pierce = spec.pierce;
        b.pierce_hits = 0;
        b.serial = serial;
        b.hit_ids.clear();
        b.active = true;
        b.in_free_list = false;

        self.order.push_back((slot, serial));
        if self.order.len() > self.capacity * 2 {
            let bullets = &self.bullets;
            self.order.retain(|&(i, s)| bullets[i].serial == s);
        }
        slot
    }

    /// Oldest slot still carrying its spawn serial. Only called with no
    /// free slots and the pool at capacity, so every slot has exactly one
    /// live entry in `order`.
    fn take_oldest(&mut self) -> usize {
        while let Some((i, serial)) = self.order.pop_front() {
            if self.bullets[i].serial == serial {
                if self.bullets[i].active {
                    log::trace!("bullet pool full, recycling serial {}", serial);
                }
                return i;
            }
        }
        0
    }

    /// Move active bullets and retire those that left the playfield.
    pub fn update(&mut self, dt: f32, field: &Playfield) {
        for b in self.bullets.iter_mut().filter(|b| b.active) {
            b.pos += b.vel * dt;
            if field.is_outside(b.pos, BOUNDS_MARGIN) {
                b.active = false;
            }
        }
    }

    /// Return inactive slots to the free list.
    pub fn reclaim(&mut self) {
        for (i, b) in self.bullets.iter_mut().enumerate() {
            if !b.active && !b.in_free_list {
                b.in_free_list = true;
                self.free.push(i);
            }
        }
    }

    pub fn clear(&mut self) {
        self.bullets.clear();
        self.free.clear();
        self.order.clear();
    }

    pub fn active_count(&self) -> usize {
        self.bullets.iter().filter(|b| b.active).count()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.iter().filter(|b| b.active)
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut Bullet> {
        self.bullets.iter_mut().filter(|b| b.active)
    }

    pub fn get(&self, slot: usize) -> Option<&Bullet> {
        self.bullets.get(slot)
    }
}

impl Default for BulletPool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(y: f32) -> BulletSpec {
        BulletSpec::player(Vec2::new(200.0, y), Vec2::new(0.0, -100.0), 10.0)
    }

    #[test]
    fn active_count_never_exceeds_capacity() {
        let mut pool = BulletPool::new(10);
        for i in 0..35 {
            pool.spawn(shot(i as f32));
            assert!(pool.active_count() <= 10);
        }
        assert_eq!(pool.active_count(), 10);
    }

    #[test]
    fn overflow_recycles_the_oldest_bullet() {
        let mut pool = BulletPool::new(3);
        let a = pool.spawn(shot(1.0));
        pool.spawn(shot(2.0));
        pool.spawn(shot(3.0));
        let d = pool.spawn(shot(4.0));
        assert_eq!(a, d, "oldest slot reused");
        let ys: Vec<f32> = pool.iter_active().map(|b| b.pos.y).collect();
        assert!(!ys.contains(&1.0));
        assert!(ys.contains(&4.0));
        // Next overflow takes the second-oldest.
        pool.spawn(shot(5.0));
        let ys: Vec<f32> = pool.iter_active().map(|b| b.pos.y).collect();
        assert!(!ys.contains(&2.0));
    }

    #[test]
    fn spawn_resets_recycled_state() {
        let mut pool = BulletPool::new(1);
        let slot = pool.spawn(BulletSpec {
            pierce: true,
            aoe_radius: Some(40.0),
            ..shot(1.0)
        });
        {
            let b = pool.iter_active_mut().next().unwrap();
            b.register_hit(3);
        }
        assert_eq!(pool.get(slot).unwrap().pierce_hits, 1);
        pool.spawn(shot(2.0));
        let b = pool.get(slot).unwrap();
        assert_eq!(b.pierce_hits, 0);
        assert!(b.hit_ids.is_empty());
        assert!(!b.pierce);
        assert_eq!(b.aoe_radius, None);
    }

    #[test]
    fn pierce_round_survives_exactly_three_hits() {
        let mut b = Bullet {
            pierce: true,
            active: true,
            ..Default::default()
        };
        assert!(b.register_hit(1));
        assert!(b.register_hit(2));
        assert!(b.register_hit(3));
        assert!(!b.register_hit(4));
        assert!(!b.active);
        assert_eq!(b.pierce_hits, MAX_PIERCE_HITS);
    }

    #[test]
    fn out_of_bounds_bullets_retire_and_are_reclaimed() {
        let field = Playfield::default();
        let mut pool = BulletPool::new(4);
        let slot = pool.spawn(shot(5.0));
        pool.update(0.5, &field);
        assert_eq!(pool.active_count(), 0);
        pool.reclaim();
        pool.reclaim();
        assert_eq!(pool.free.len(), 1, "reclaim must not double-list a slot");
        assert_eq!(pool.spawn(shot(100.0)), slot);
    }

    #[test]
    fn order_queue_stays_bounded() {
        let field = Playfield::default();
        let mut pool = BulletPool::new(5);
        for i in 0..1000 {
            pool.spawn(shot(i as f32 % 600.0));
            if i % 3 == 0 {
                pool.update(10.0, &field);
                pool.reclaim();
            }
        }
        assert!(pool.order.len() <= 10);
    }

    #[test]
    fn clear_empties_everything() {
        let mut pool = BulletPool::new(5);
        pool.spawn(shot(1.0));
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.iter_active().count(), 0);
    }
}
