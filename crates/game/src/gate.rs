//! Gates: paired left/right choices that reshape the squad.

use engine_core::{Playfield, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::balance::CharacterKind;
use crate::buffs::BuffGrant;

/// Seconds a gate lingers after it is crossed.
pub const DECAY_DURATION: f32 = 0.5;
/// Vertical extent of the gate band the squad must cross.
pub const GATE_DEPTH: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GateOp {
    /// Recruit riflemen (positive) or lose members (negative).
    Add(i32),
    /// Grow to `floor(size * factor)`; never shrinks.
    Multiply(f32),
    /// Coin flip between multiplying by `win_factor` and shrinking to
    /// `floor(size * lose_factor)`.
    Gamble { win_factor: f32, lose_factor: f32, chance: f32 },
    AddType { kind: CharacterKind, count: u32 },
    Buff(BuffGrant),
}

impl GateOp {
    /// Rough desirability used by the autopilot; higher is better.
    pub fn score(&self, size: usize) -> f32 {
        let s = size as f32;
        match *self {
            GateOp::Add(n) => n as f32,
            GateOp::Multiply(f) => (s * f).floor() - s,
            GateOp::Gamble {
                win_factor,
                lose_factor,
                chance,
            } => chance * (s * win_factor - s) + (1.0 - chance) * ((s * lose_factor).floor() - s),
            GateOp::AddType { count, .. } => count as f32 * 1.5,
            GateOp::Buff(_) => 3.0,
        }
    }

    pub fn label(&self) -> String {
        match *self {
            GateOp::Add(n) if n >= 0 => format!("+{}", n),
            GateOp::Add(n) => format!("{}", n),
            GateOp::Multiply(f) => format!("x{}", f),
            GateOp::Gamble { win_factor, .. } => format!("x{}?", win_factor),
            GateOp::AddType { kind, count } => format!("+{} {}", count, kind.name()),
            GateOp::Buff(BuffGrant::Shield { charges }) => format!("shield {}", charges),
            GateOp::Buff(BuffGrant::Timed { kind, .. }) => format!("{:?}", kind),
        }
    }
}

/// Result of resolving a gamble. Drawn once, when the gate is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GambleOutcome {
    Win,
    Lose,
}

pub fn roll_gamble<R: Rng>(rng: &mut R, chance: f32) -> GambleOutcome {
    if rng.gen::<f32>() < chance.clamp(0.0, 1.0) {
        GambleOutcome::Win
    } else {
        GambleOutcome::Lose
    }
}

/// Target squad size after a gamble.
pub fn gamble_size(size: usize, outcome: GambleOutcome, win_factor: f32, lose_factor: f32) -> usize {
    let factor = match outcome {
        GambleOutcome::Win => win_factor,
        GambleOutcome::Lose => lose_factor,
    };
    (size as f32 * factor).floor().max(0.0) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Gate {
    pub id: u32,
    /// Centre of the gate band.
    pub y: f32,
    pub left: GateOp,
    pub right: GateOp,
    pub chosen: Option<Side>,
    decay: f32,
    active: bool,
}

impl Gate {
    pub fn new(id: u32, left: GateOp, right: GateOp, y: f32) -> Self {
        Self {
            id,
            y,
            left,
            right,
            chosen: None,
            decay: DECAY_DURATION,
            active: true,
        }
    }

    pub fn update(&mut self, dt: f32, scroll_speed: f32, field: &Playfield) {
        if !self.active {
            return;
        }
        if self.chosen.is_some() {
            self.decay -= dt;
            if self.decay <= 0.0 {
                self.active = false;
            }
        } else {
            self.y += scroll_speed * dt;
            if self.y > field.height + GATE_DEPTH {
                self.active = false;
            }
        }
    }

    /// The side the squad is standing in when it reaches the gate band.
    pub fn side_for(&self, squad_x: f32, field: &Playfield) -> Side {
        if squad_x < field.road_center() {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// True while unchosen and overlapping the squad row.
    pub fn reached(&self, squad_pos: Vec2) -> bool {
        self.chosen.is_none() && self.active && (self.y - squad_pos.y).abs() <= GATE_DEPTH * 0.5
    }

    /// Lock in a side and return its op. Returns `None` if already chosen.
    pub fn choose(&mut self, side: Side) -> Option<GateOp> {
        if self.chosen.is_some() {
            return None;
        }
        self.chosen = Some(side);
        Some(match side {
            Side::Left => self.left,
            Side::Right => self.right,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn gamble_branches() {
        assert_eq!(gamble_size(10, GambleOutcome::Lose, 3.0, 0.5), 5);
        assert_eq!(gamble_size(10, GambleOutcome::Win, 3.0, 0.5), 30);
        assert_eq!(gamble_size(7, GambleOutcome::Lose, 3.0, 0.5), 3);
    }

    #[test]
    fn gamble_roll_honours_extreme_chances() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(roll_gamble(&mut rng, 1.0), GambleOutcome::Win);
        assert_eq!(roll_gamble(&mut rng, 0.0), GambleOutcome::Lose);
    }

    #[test]
    fn gate_can_only_be_chosen_once_then_decays() {
        let field = Playfield::default();
        let mut g = Gate::new(1, GateOp::Add(3), GateOp::Multiply(2.0), 600.0);
        assert!(g.reached(Vec2::new(100.0, 600.0)));
        assert_eq!(g.choose(Side::Right), Some(GateOp::Multiply(2.0)));
        assert_eq!(g.choose(Side::Left), None);
        assert!(!g.reached(Vec2::new(100.0, 600.0)));
        g.update(0.3, 100.0, &field);
        assert!(g.is_active());
        g.update(0.25, 100.0, &field);
        assert!(!g.is_active());
    }

    #[test]
    fn side_follows_road_centre() {
        let field = Playfield::default();
        let g = Gate::new(1, GateOp::Add(1), GateOp::Add(2), 0.0);
        assert_eq!(g.side_for(120.0, &field), Side::Left);
        assert_eq!(g.side_for(260.0, &field), Side::Right);
    }

    #[test]
    fn autopilot_score_prefers_growth() {
        assert!(GateOp::Multiply(2.0).score(10) > GateOp::Add(3).score(10));
        assert!(GateOp::Add(-3).score(10) < 0.0);
    }
}
