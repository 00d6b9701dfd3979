//! Configuration for the progression core
//!
//! CLI arguments and environment variable handling using clap. The embedding
//! service parses these and hands them to the store constructors; the core
//! itself keeps no ambient connection state.

use clap::Parser;

use crate::types::{EngineError, Result};

/// Habitfuel progression core configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "habitfuel")]
#[command(about = "Progression core for the habitfuel tracker")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "habitfuel")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Experience granted for logging an event
    #[arg(long, env = "EVENT_EXPERIENCE", default_value = "10")]
    pub event_experience: i64,

    /// Coins granted for logging an event
    #[arg(long, env = "EVENT_COINS", default_value = "1")]
    pub event_coins: i64,

    /// Divisor applied to a quest's experience reward to derive its coin
    /// grant at claim time (floor division)
    #[arg(long, env = "CLAIM_COIN_DIVISOR", default_value = "10")]
    pub claim_coin_divisor: i64,

    /// Events-per-month threshold for premium eligibility
    #[arg(long, env = "PREMIUM_EVENT_THRESHOLD", default_value = "100")]
    pub premium_event_threshold: i64,
}

impl Args {
    /// Load environment from `.env` (if present), parse, and validate.
    ///
    /// Convenience for embedding binaries; tests construct `Args` directly.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let args = Self::parse();
        args.validate()?;
        Ok(args)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.mongodb_uri.is_empty() {
            return Err(EngineError::Config("MONGODB_URI must not be empty".into()));
        }

        if self.mongodb_db.is_empty() {
            return Err(EngineError::Config("MONGODB_DB must not be empty".into()));
        }

        if self.event_experience < 0 || self.event_coins < 0 {
            return Err(EngineError::Config(
                "event rewards must be non-negative".into(),
            ));
        }

        if self.claim_coin_divisor <= 0 {
            return Err(EngineError::Config(
                "CLAIM_COIN_DIVISOR must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Engine tunables derived from the parsed arguments
    pub fn engine_config(&self) -> crate::engine::EngineConfig {
        crate::engine::EngineConfig {
            event_experience: self.event_experience,
            event_coins: self.event_coins,
            claim_coin_divisor: self.claim_coin_divisor,
            premium_event_threshold: self.premium_event_threshold,
        }
    }
}
