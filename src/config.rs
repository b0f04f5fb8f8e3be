//! Hydra configuration: the scalar keys from the external interface, parsed
//! with `serde_json` rather than hand-rolled line parsing, since the values
//! are a flat set of scalars with defaults — exactly serde's sweet spot.

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_row_group_size() -> u32 {
    128
}

fn default_reset_period_ns() -> u64 {
    64_000_000
}

fn default_rcc_num_per_rank() -> u32 {
    4096
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RccPolicy {
    #[default]
    Random,
    MinCount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HydraConfig {
    pub tracking_threshold: u32,
    pub group_threshold: u32,
    #[serde(default = "default_row_group_size")]
    pub row_group_size: u32,
    #[serde(default = "default_reset_period_ns")]
    pub reset_period_ns: u64,
    #[serde(default = "default_rcc_num_per_rank")]
    pub rcc_num_per_rank: u32,
    #[serde(default)]
    pub rcc_policy: RccPolicy,
    #[serde(default)]
    pub debug: bool,
}

impl HydraConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: HydraConfig = serde_json::from_str(s)
            .map_err(|e| Error::Configuration(format!("invalid hydra config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rcc_num_per_rank % 16 != 0 {
            return Err(Error::Configuration(format!(
                "rcc_num_per_rank ({}) must be divisible by 16",
                self.rcc_num_per_rank
            )));
        }
        let rcc_set_num = self.rcc_num_per_rank / 16;
        if !rcc_set_num.is_power_of_two() {
            return Err(Error::Configuration(format!(
                "rcc_num_per_rank ({}) / 16 = {} must be a power of two",
                self.rcc_num_per_rank, rcc_set_num
            )));
        }
        if self.row_group_size == 0 {
            return Err(Error::Configuration("row_group_size must be nonzero".into()));
        }
        Ok(())
    }
}
