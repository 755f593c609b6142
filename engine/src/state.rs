//! Ledger records: epochs, user positions and global pool counters.

use crate::error::EngineError;
use drawpool_types::{Amount, EpochNumber, RiskLevel, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle stage of an epoch record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochPhase {
    /// Created ahead of time by eligibility registration; not yet opened.
    Pending,
    /// The current epoch.
    Open,
    /// Closed by an advance; frozen except for claim settlement.
    Finalized,
}

/// One accounting window.
///
/// `total_distributed <= total_yield_pool` always holds and
/// `participant_count` only grows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub number: EpochNumber,
    /// Set when the epoch is opened.
    pub start_time: Option<Timestamp>,
    /// Set when the epoch is finalized.
    pub end_time: Option<Timestamp>,
    /// Pool snapshot carried in at opening plus yield added while open.
    pub total_yield_pool: Amount,
    /// Payouts settled against this epoch's pool.
    pub total_distributed: Amount,
    pub participant_count: u64,
    pub finalized: bool,
    pub eligible_users: BTreeSet<UserId>,
}

impl Epoch {
    /// A record that exists only to collect eligibility registrations.
    pub fn pending(number: EpochNumber) -> Self {
        Self {
            number,
            start_time: None,
            end_time: None,
            total_yield_pool: Amount::ZERO,
            total_distributed: Amount::ZERO,
            participant_count: 0,
            finalized: false,
            eligible_users: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> EpochPhase {
        if self.finalized {
            EpochPhase::Finalized
        } else if self.start_time.is_some() {
            EpochPhase::Open
        } else {
            EpochPhase::Pending
        }
    }

    pub fn is_eligible(&self, user: &UserId) -> bool {
        self.eligible_users.contains(user)
    }

    /// Yield still available to this epoch's winners.
    pub fn available_yield(&self) -> Amount {
        self.total_yield_pool.saturating_sub(self.total_distributed)
    }

    /// Flag `user` eligible. Returns `false` if they already were.
    pub(crate) fn register(&mut self, user: &UserId) -> Result<bool, EngineError> {
        if self.eligible_users.contains(user) {
            return Ok(false);
        }
        let count = self
            .participant_count
            .checked_add(1)
            .ok_or(EngineError::Overflow)?;
        self.eligible_users.insert(user.clone());
        self.participant_count = count;
        Ok(true)
    }
}

/// A depositor's position, owned by the user ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub total_deposited: Amount,
    /// Never exceeds `total_deposited`.
    pub current_balance: Amount,
    pub first_deposit_epoch: EpochNumber,
    pub last_deposit_epoch: EpochNumber,
    pub last_update_epoch: EpochNumber,
    pub risk_level: RiskLevel,
    /// Accrued `balance × epochs × multiplier`; never decreases.
    pub time_weighted_balance: u128,
    /// Write-once per epoch.
    pub claimed_epochs: BTreeSet<EpochNumber>,
}

impl UserPosition {
    pub fn new(risk_level: RiskLevel, first_deposit_epoch: EpochNumber) -> Self {
        Self {
            total_deposited: Amount::ZERO,
            current_balance: Amount::ZERO,
            first_deposit_epoch,
            last_deposit_epoch: first_deposit_epoch,
            last_update_epoch: first_deposit_epoch,
            risk_level,
            time_weighted_balance: 0,
            claimed_epochs: BTreeSet::new(),
        }
    }

    pub fn has_claimed(&self, epoch: EpochNumber) -> bool {
        self.claimed_epochs.contains(&epoch)
    }

    /// Time weight after lazily accruing up to `current_epoch`.
    ///
    /// Only epochs since `last_update_epoch` are added, and only while a
    /// balance is held.
    pub fn accrued_time_weight(
        &self,
        current_epoch: EpochNumber,
        multiplier: u64,
    ) -> Result<u128, EngineError> {
        if self.current_balance.is_zero() || self.last_update_epoch >= current_epoch {
            return Ok(self.time_weighted_balance);
        }
        let elapsed = (current_epoch - self.last_update_epoch) as u128;
        let accrual = self
            .current_balance
            .raw()
            .checked_mul(elapsed)
            .and_then(|v| v.checked_mul(multiplier as u128))
            .ok_or(EngineError::Overflow)?;
        self.time_weighted_balance
            .checked_add(accrual)
            .ok_or(EngineError::Overflow)
    }
}

/// Process-wide pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTotals {
    /// Undistributed yield across all epochs.
    pub total_yield_pool: Amount,
    /// Cumulative payouts; never decreases.
    pub total_distributed_rewards: Amount,
}
