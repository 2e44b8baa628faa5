//! Save record: currency, upgrade levels, stage progress and lifetime stats.
//!
//! The simulation never touches storage. A host loads a [`SaveData`] from a
//! [`SaveSlot`], folds each [`RunResult`] into it and stores it back.
//! Fields missing from an older save fall back to their defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balance::{Balance, UpgradeEffects, UpgradeKind};
use crate::config::RunMode;
use crate::result::RunResult;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("{kind:?} is already at max level {max}")]
    MaxLevel { kind: UpgradeKind, max: u32 },

    #[error("not enough gold: need {need}, have {have}")]
    InsufficientGold { need: u64, have: u64 },

    #[error("save storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("corrupt save: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("could not encode save: {0}")]
    Encode(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeStats {
    pub runs: u32,
    pub wins: u32,
    pub kills: u64,
    pub gold_earned: u64,
    pub bosses_defeated: u32,
    pub max_squad_size: usize,
    pub best_endless_cycles: u32,
    pub members_lost: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    pub sound: bool,
    pub volume: f32,
    pub language: String,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            sound: true,
            volume: 0.8,
            language: "en".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub version: u32,
    pub gold: u64,
    pub highest_stage_cleared: u32,
    /// Best star rating per stage.
    pub stage_stars: BTreeMap<u32, u8>,
    pub upgrades: BTreeMap<UpgradeKind, u32>,
    pub stats: LifetimeStats,
    pub settings: SaveSettings,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            gold: 0,
            highest_stage_cleared: 0,
            stage_stars: BTreeMap::new(),
            upgrades: BTreeMap::new(),
            stats: LifetimeStats::default(),
            settings: SaveSettings::default(),
        }
    }
}

impl SaveData {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        self.upgrades.get(&kind).copied().unwrap_or(0)
    }

    /// Highest stage the player may start.
    pub fn unlocked_stage(&self) -> u32 {
        self.highest_stage_cleared + 1
    }

    pub fn upgrade_effects(&self, balance: &Balance) -> UpgradeEffects {
        balance.upgrade_effects(|k| self.level(k))
    }

    /// Fold a finished run into the save. Returns true when it unlocked a new stage.
    pub fn apply_run_result(&mut self, result: &RunResult) -> bool {
        self.gold = self.gold.saturating_add(result.gold as u64);

        let stats = &mut self.stats;
        stats.runs += 1;
        stats.kills += result.kills as u64;
        stats.gold_earned += result.gold as u64;
        stats.members_lost += result.members_lost as u64;
        stats.max_squad_size = stats.max_squad_size.max(result.max_squad_size);
        if result.cleared {
            stats.wins += 1;
        }

        match result.mode {
            RunMode::Stage => {
                if result.boss_defeated {
                    self.stats.bosses_defeated += 1;
                }
                if !result.cleared {
                    return false;
                }
                let best = self.stage_stars.entry(result.stage).or_insert(0);
                *best = (*best).max(result.stars);
                if result.stage > self.highest_stage_cleared {
                    self.highest_stage_cleared = result.stage;
                    log::info!("stage {} cleared, stage {} unlocked", result.stage, result.stage + 1);
                    return true;
                }
                false
            }
            RunMode::Endless => {
                self.stats.bosses_defeated += result.cycles;
                self.stats.best_endless_cycles = self.stats.best_endless_cycles.max(result.cycles);
                false
            }
        }
    }

    /// Spend gold on the next level of `kind`. Returns the new level.
    pub fn purchase_upgrade(&mut self, kind: UpgradeKind, balance: &Balance) -> Result<u32, ProgressionError> {
        let curve = balance.upgrade(kind);
        let level = self.level(kind);
        if level >= curve.max_level {
            return Err(ProgressionError::MaxLevel {
                kind,
                max: curve.max_level,
            });
        }
        let cost = curve.cost_at(level);
        if cost > self.gold {
            return Err(ProgressionError::InsufficientGold {
                need: cost,
                have: self.gold,
            });
        }
        self.gold -= cost;
        self.upgrades.insert(kind, level + 1);
        log::debug!("bought {:?} level {} for {} gold", kind, level + 1, cost);
        Ok(level + 1)
    }

    pub fn from_ron(text: &str) -> Result<Self, ProgressionError> {
        let data: SaveData = ron::from_str(text)?;
        if data.version > SAVE_VERSION {
            log::warn!("save version {} is newer than {}, loading what we understand", data.version, SAVE_VERSION);
        }
        Ok(data)
    }

    pub fn to_ron(&self) -> Result<String, ProgressionError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a slot; an empty slot yields a fresh save.
    pub fn load(slot: &dyn SaveSlot) -> Result<Self, ProgressionError> {
        match slot.read()? {
            Some(text) => Self::from_ron(&text),
            None => Ok(Self::default()),
        }
    }

    pub fn store(&self, slot: &mut dyn SaveSlot) -> Result<(), ProgressionError> {
        let text = self.to_ron()?;
        slot.write(&text)
    }
}

/// Single storage slot for the save record.
pub trait SaveSlot {
    /// `None` when nothing has been saved yet.
    fn read(&self) -> Result<Option<String>, ProgressionError>;
    fn write(&mut self, text: &str) -> Result<(), ProgressionError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    text: Option<String>,
}

impl MemorySlot {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

impl SaveSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, ProgressionError> {
        Ok(self.text.clone())
    }

    fn write(&mut self, text: &str) -> Result<(), ProgressionError> {
        self.text = Some(text.to_string());
        Ok(())
    }
}

/// RON file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `squad_rush_save.ron` in the current directory.
    pub fn default_location() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("squad_rush_save.ron"))
    }
}

impl SaveSlot for FileSlot {
    fn read(&self) -> Result<Option<String>, ProgressionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, text: &str) -> Result<(), ProgressionError> {
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
