//! Squad Rush run simulation.
//!
//! A squad advances down a scrolling road, auto-fires at waves of enemies,
//! collects items, picks gate sides and fights a phased boss. The host owns
//! the frame clock, input and presentation; it feeds [`RunController::tick`]
//! and reads [`RunController::snapshot`] and [`RunController::drain_events`].

pub mod balance;
pub mod boss;
pub mod buffs;
pub mod bullet;
pub mod character;
pub mod combat;
pub mod config;
pub mod difficulty;
pub mod enemy;
pub mod error;
pub mod events;
pub mod gate;
pub mod pickup;
pub mod progression;
pub mod result;
pub mod run;
pub mod snapshot;
pub mod spawner;
pub mod squad;

pub use balance::Balance;
pub use config::{RunMode, RunSettings};
pub use error::SimError;
pub use events::SimEvent;
pub use progression::{FileSlot, MemorySlot, ProgressionError, SaveData, SaveSlot};
pub use result::RunResult;
pub use run::{RunController, RunPhase, SegmentKind};
pub use snapshot::RunSnapshot;
