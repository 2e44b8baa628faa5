//! Immutable run summary handed to the progression merge.

use serde::{Deserialize, Serialize};

use crate::config::RunMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub mode: RunMode,
    /// Stage the run started at.
    pub stage: u32,
    pub cleared: bool,
    pub kills: u32,
    pub gold: u32,
    pub max_squad_size: usize,
    pub final_squad_size: usize,
    pub boss_defeated: bool,
    /// 0..=3.
    pub stars: u8,
    /// Final size over peak size, `0..=1`.
    pub survival_rate: f32,
    pub elapsed: f32,
    pub max_combo: u32,
    pub members_lost: u32,
    pub shield_used: u32,
    /// Bosses beaten in endless mode.
    pub cycles: u32,
}

/// Final size over peak size; zero for an empty run.
pub fn survival_rate(final_size: usize, max_size: usize) -> f32 {
    if max_size == 0 {
        0.0
    } else {
        (final_size as f32 / max_size as f32).clamp(0.0, 1.0)
    }
}

/// One star for clearing, one more each at 50% and 80% survival.
pub fn star_rating(cleared: bool, survival: f32) -> u8 {
    if !cleared {
        return 0;
    }
    let mut stars = 1;
    if survival >= 0.5 {
        stars += 1;
    }
    if survival >= 0.8 {
        stars += 1;
    }
    stars
}
