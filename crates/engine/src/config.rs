//! Session configuration
//!
//! Sources, lowest precedence first: built-in defaults, a JSON file,
//! `GOMOKU_MOVE_TIME`, then explicit CLI flags (applied by the binary).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::types::{BoardSize, DEFAULT_BOARD_SIDE, DEFAULT_MOVE_TIME_SECS};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    /// Per-turn budget in whole seconds
    pub move_time_secs: u32,
    pub bot_seed: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_SIDE,
            height: DEFAULT_BOARD_SIDE,
            move_time_secs: DEFAULT_MOVE_TIME_SECS,
            bot_seed: 1,
        }
    }
}

impl SessionConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(config)
    }

    /// Apply `GOMOKU_MOVE_TIME` on top of `self`.
    pub fn with_env(mut self) -> Self {
        if let Some(secs) = std::env::var("GOMOKU_MOVE_TIME")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&s| s > 0)
        {
            self.move_time_secs = secs;
        }
        self
    }

    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    pub fn board_size(&self) -> BoardSize {
        BoardSize::new(self.width, self.height)
    }
}
