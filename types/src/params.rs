//! Engine parameters: epoch schedule, risk tables and eligibility thresholds.
//!
//! Every field is administrator-tunable. Serde defaults let a config file set
//! only the values it cares about.

use crate::amount::{Amount, AMOUNT_UNIT};
use crate::error::TypeError;
use crate::risk::RiskLevel;
use crate::{BasisPoints, MAX_PROBABILITY_BPS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Payout multiplier and base odds for one risk tier, both in basis points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// 5000 = 0.5x, 10000 = 1x, 20000 = 2x.
    pub multiplier_bps: BasisPoints,
    /// Win probability before any weight bonus.
    pub base_probability_bps: BasisPoints,
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.multiplier_bps == 0 {
            return Err(TypeError::InvalidParam(
                "risk multiplier must be non-zero".into(),
            ));
        }
        if self.base_probability_bps > MAX_PROBABILITY_BPS {
            return Err(TypeError::InvalidParam(format!(
                "base probability {} bps exceeds ceiling {} bps",
                self.base_probability_bps, MAX_PROBABILITY_BPS
            )));
        }
        Ok(())
    }
}

/// Risk configuration for all three tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTable {
    #[serde(default = "default_low")]
    pub low: RiskParams,
    #[serde(default = "default_medium")]
    pub medium: RiskParams,
    #[serde(default = "default_high")]
    pub high: RiskParams,
}

impl RiskTable {
    pub fn get(&self, level: RiskLevel) -> RiskParams {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }

    pub fn set(&mut self, level: RiskLevel, params: RiskParams) {
        match level {
            RiskLevel::Low => self.low = params,
            RiskLevel::Medium => self.medium = params,
            RiskLevel::High => self.high = params,
        }
    }
}

impl Default for RiskTable {
    fn default() -> Self {
        Self {
            low: default_low(),
            medium: default_medium(),
            high: default_high(),
        }
    }
}

/// All tunable engine parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Length of one epoch in seconds.
    #[serde(default = "default_epoch_duration")]
    pub epoch_duration_secs: u64,

    /// Factor applied to `balance × epochs` when accruing time weight.
    #[serde(default = "default_time_weight_multiplier")]
    pub time_weight_multiplier: u64,

    /// Balance (raw) a user must still hold to claim a draw.
    #[serde(default = "default_minimum_balance")]
    pub minimum_balance: Amount,

    /// Asset identifiers the vault may accept. Membership only; the engine
    /// never prices or holds them.
    #[serde(default)]
    pub supported_assets: BTreeSet<String>,

    /// Per-tier tables. Must stay the last field for TOML output.
    #[serde(default)]
    pub risk: RiskTable,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_epoch_duration() -> u64 {
    7 * 24 * 3600
}

fn default_time_weight_multiplier() -> u64 {
    1
}

fn default_minimum_balance() -> Amount {
    Amount::new(AMOUNT_UNIT)
}

fn default_low() -> RiskParams {
    RiskParams {
        multiplier_bps: 5_000,
        base_probability_bps: 2_000,
    }
}

fn default_medium() -> RiskParams {
    RiskParams {
        multiplier_bps: 10_000,
        base_probability_bps: 1_000,
    }
}

fn default_high() -> RiskParams {
    RiskParams {
        multiplier_bps: 20_000,
        base_probability_bps: 500,
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineParams {
    /// Reject parameter sets the engine cannot run with.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.epoch_duration_secs == 0 {
            return Err(TypeError::InvalidParam(
                "epoch duration must be non-zero".into(),
            ));
        }
        for level in RiskLevel::ALL {
            self.risk
                .get(level)
                .validate()
                .map_err(|e| TypeError::InvalidParam(format!("{level}: {e}")))?;
        }
        Ok(())
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            epoch_duration_secs: default_epoch_duration(),
            time_weight_multiplier: default_time_weight_multiplier(),
            minimum_balance: default_minimum_balance(),
            supported_assets: BTreeSet::new(),
            risk: RiskTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineParams::default().validate().is_ok());
    }

    #[test]
    fn zero_epoch_duration_rejected() {
        let params = EngineParams {
            epoch_duration_secs: 0,
            ..EngineParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn probability_above_ceiling_rejected() {
        let mut params = EngineParams::default();
        params.risk.set(
            RiskLevel::High,
            RiskParams {
                multiplier_bps: 20_000,
                base_probability_bps: MAX_PROBABILITY_BPS + 1,
            },
        );
        assert!(params.validate().is_err());
    }

    #[test]
    fn risk_table_lookup_matches_level() {
        let table = RiskTable::default();
        assert_eq!(table.get(RiskLevel::Low).multiplier_bps, 5_000);
        assert_eq!(table.get(RiskLevel::High).multiplier_bps, 20_000);
    }
}
