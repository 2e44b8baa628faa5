//! Linear difficulty model: every multiplier derives from `1 + (stage - 1) * rate`.

use crate::balance::ScalingRates;

/// Multipliers applied to spawned entities and spawn cadences for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageScaling {
    pub stage: u32,
    pub enemy_hp: f32,
    pub enemy_speed: f32,
    /// Multiplies enemy spawn intervals (smaller = more frequent).
    pub spawn_interval: f32,
    /// Multiplies item spawn intervals.
    pub item_interval: f32,
    pub reward: f32,
    pub boss_hp: f32,
}

impl StageScaling {
    pub fn for_stage(stage: u32, rates: &ScalingRates) -> Self {
        let s = stage.max(1);
        let steps = (s - 1) as f32;
        Self {
            stage: s,
            enemy_hp: 1.0 + steps * rates.enemy_hp,
            enemy_speed: 1.0 + steps * rates.enemy_speed,
            spawn_interval: (1.0 - steps * rates.spawn_interval).max(rates.spawn_interval_floor),
            item_interval: (1.0 - steps * rates.item_interval).max(rates.item_interval_floor),
            reward: 1.0 + steps * rates.reward,
            boss_hp: 1.0 + steps * rates.boss_hp,
        }
    }

    /// Gold for a kill, scaled and rounded, never below one for paying kinds.
    pub fn scaled_reward(&self, base: u32) -> u32 {
        if base == 0 {
            0
        } else {
            ((base as f32 * self.reward).round() as u32).max(1)
        }
    }
}

/// Threat tier name shown by the HUD.
pub fn threat_label(stage: u32) -> &'static str {
    match stage {
        0..=2 => "Calm",
        3..=5 => "Rising",
        6..=9 => "Severe",
        _ => "Critical",
    }
}
