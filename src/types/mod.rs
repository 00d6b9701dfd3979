//! Shared types for the progression core

mod error;

pub use error::{EngineError, Result};
