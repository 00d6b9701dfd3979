//! habitfuel-core - progression engine for a gamified habit tracker
//!
//! The library-level core behind the habitfuel web application: logging a
//! tracked event turns into updated experience, level, rank, and streak
//! state, and into quest progress with exactly-once reward claiming. The
//! HTTP layer, authentication, chat coaching, and payments live outside this
//! crate and talk to it through [`engine::HabitEngine`].
//!
//! ## Components
//!
//! - **Progression**: pure experience-to-level and (level, streak)-to-rank math
//! - **Streak**: whole-day streak lengths, reset on event, recomputed lazily on read
//! - **Quests**: per-category progress accrual with one-way completed/claimed transitions
//! - **Stores**: MongoDB-backed (and in-memory) implementations of the
//!   user record, quest catalog, quest progress, and event log interfaces

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod store;
pub mod types;

pub use config::Args;
pub use engine::{EngineConfig, HabitEngine};
pub use types::{EngineError, Result};
