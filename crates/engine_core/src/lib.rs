//! Core types shared by the Squad Rush simulation crates.
//!
//! This crate provides the foundational pieces every system builds on:
//! - Health and lifecycle (alive → dying → inactive)
//! - Tick-driven countdowns and cooldowns
//! - Frame timing with a clamped step
//! - Playfield geometry

pub mod components;
pub mod geometry;
pub mod time;

pub use components::*;
pub use geometry::*;
pub use time::*;

// Re-export commonly used types
pub use glam::Vec2;
