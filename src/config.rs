use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::models::{Condition, ConditionKind};

pub const DEFAULT_CONFIG_FILE: &str = "matrixlab.json";

/// Constants fixed before a session starts. Nothing here changes mid-session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentConfig {
    pub block_duration_secs: u32,
    pub payout_per_correct: u64,
    pub total_blocks: usize,
    /// Grids are `grid_side x grid_side`.
    pub grid_side: usize,
    pub likert_max: u8,
    pub require_consent: bool,
    pub conditions: Vec<Condition>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            block_duration_secs: 10 * 60,
            payout_per_correct: 1000,
            total_blocks: 3,
            grid_side: 8,
            likert_max: 7,
            require_consent: true,
            conditions: Condition::default_set(),
        }
    }
}

impl ExperimentConfig {
    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_blocks == 0 {
            bail!("totalBlocks must be greater than zero");
        }
        if self.conditions.len() != self.total_blocks {
            bail!(
                "expected exactly {} conditions (one per block), found {}",
                self.total_blocks,
                self.conditions.len()
            );
        }
        if self.block_duration_secs == 0 {
            bail!("blockDurationSecs must be greater than zero");
        }
        if self.payout_per_correct == 0 {
            bail!("payoutPerCorrect must be greater than zero");
        }
        if self.grid_side == 0 {
            bail!("gridSide must be greater than zero");
        }
        if self.likert_max == 0 {
            bail!("likertMax must be greater than zero");
        }
        if self
            .conditions
            .iter()
            .any(|c| c.kind == ConditionKind::Control && !c.reference_text.is_empty())
        {
            bail!("Control conditions must not carry reference text");
        }
        Ok(())
    }
}
