//! Run settings (stage, mode, segment timings, tick clamp). Loaded from config.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::balance::CharacterKind;
use crate::error::SimError;

/// Staged runs end after one boss; endless runs loop until the squad is wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    Stage,
    Endless,
}

/// Tunables for a single run. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Stage number (1-based); drives difficulty scaling and boss rotation.
    #[serde(default = "default_stage")]
    pub stage: u32,
    #[serde(default)]
    pub mode: RunMode,
    /// RNG seed. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Road/combat pairs before the boss.
    #[serde(default = "default_road_pairs")]
    pub road_pairs: u32,
    /// Seconds per road segment.
    #[serde(default = "default_road_duration")]
    pub road_duration: f32,
    /// Minimum seconds per combat segment.
    #[serde(default = "default_combat_duration")]
    pub combat_duration: f32,
    /// Largest simulated step; longer frames are clamped.
    #[serde(default = "default_max_dt")]
    pub max_dt: f32,
    #[serde(default = "default_bullet_capacity")]
    pub bullet_capacity: usize,
    /// Members recruited before upgrades are applied.
    #[serde(default = "default_starting_members")]
    pub starting_members: u32,
    #[serde(default = "default_starting_kind")]
    pub starting_kind: CharacterKind,
    /// Delay between boss death and the finished state.
    #[serde(default = "default_result_delay")]
    pub result_delay: f32,
    /// Frozen window after the squad is wiped.
    #[serde(default = "default_death_sequence")]
    pub death_sequence: f32,
    /// Seconds a combo survives without a kill.
    #[serde(default = "default_combo_window")]
    pub combo_window: f32,
    /// Every n-th combo kill pays `combo_bonus_gold`.
    #[serde(default = "default_combo_bonus_every")]
    pub combo_bonus_every: u32,
    #[serde(default = "default_combo_bonus_gold")]
    pub combo_bonus_gold: u32,
}

fn default_stage() -> u32 {
    1
}
fn default_road_pairs() -> u32 {
    3
}
fn default_road_duration() -> f32 {
    12.0
}
fn default_combat_duration() -> f32 {
    20.0
}
fn default_max_dt() -> f32 {
    engine_core::DEFAULT_MAX_STEP
}
fn default_bullet_capacity() -> usize {
    200
}
fn default_starting_members() -> u32 {
    5
}
fn default_starting_kind() -> CharacterKind {
    CharacterKind::Rifleman
}
fn default_result_delay() -> f32 {
    1.0
}
fn default_death_sequence() -> f32 {
    2.0
}
fn default_combo_window() -> f32 {
    2.0
}
fn default_combo_bonus_every() -> u32 {
    5
}
fn default_combo_bonus_gold() -> u32 {
    5
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            stage: default_stage(),
            mode: RunMode::default(),
            seed: None,
            road_pairs: default_road_pairs(),
            road_duration: default_road_duration(),
            combat_duration: default_combat_duration(),
            max_dt: default_max_dt(),
            bullet_capacity: default_bullet_capacity(),
            starting_members: default_starting_members(),
            starting_kind: default_starting_kind(),
            result_delay: default_result_delay(),
            death_sequence: default_death_sequence(),
            combo_window: default_combo_window(),
            combo_bonus_every: default_combo_bonus_every(),
            combo_bonus_gold: default_combo_bonus_gold(),
        }
    }
}

impl RunSettings {
    /// Load settings from `config.ron`. If the file is missing or invalid, returns defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match Self::from_ron(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    pub fn from_ron(text: &str) -> Result<Self, SimError> {
        let settings: RunSettings = ron::from_str(text).map_err(|source| SimError::Parse {
            what: "run settings",
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save current settings to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let bad = |msg: &str| Err(SimError::InvalidSettings(msg.to_string()));
        if self.stage == 0 {
            return bad("stage numbers start at 1");
        }
        if self.road_pairs == 0 {
            return bad("a run needs at least one road/combat pair");
        }
        if !(self.road_duration > 0.0) || !(self.combat_duration > 0.0) {
            return bad("segment durations must be positive");
        }
        if !(self.max_dt > 0.0) {
            return bad("max_dt must be positive");
        }
        if self.bullet_capacity == 0 {
            return bad("bullet pool needs a non-zero capacity");
        }
        if self.starting_members == 0 {
            return bad("the squad must start with at least one member");
        }
        if !(self.result_delay >= 0.0) || !(self.death_sequence >= 0.0) || !(self.combo_window > 0.0) {
            return bad("delays must be non-negative and the combo window positive");
        }
        Ok(())
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        RunSettings::default().validate().unwrap();
    }

    #[test]
    fn partial_ron_fills_defaults() {
        let s = RunSettings::from_ron("(stage: 4, mode: Endless, seed: Some(7))").unwrap();
        assert_eq!(s.stage, 4);
        assert_eq!(s.mode, RunMode::Endless);
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.road_pairs, 3);
        assert_eq!(s.bullet_capacity, 200);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            RunSettings::from_ron("(stage: 0)"),
            Err(SimError::InvalidSettings(_))
        ));
        assert!(matches!(
            RunSettings::from_ron("(max_dt: -1.0)"),
            Err(SimError::InvalidSettings(_))
        ));
        assert!(matches!(RunSettings::from_ron("(stage: \"x\")"), Err(SimError::Parse { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let s = RunSettings::load_from(Path::new("/nonexistent/squad-rush/config.ron"));
        assert_eq!(s, RunSettings::default());
    }
}
