//! Per-user deposit and withdrawal recording with lazy time-weight accrual.

use crate::epoch::{EpochManager, EpochTransition};
use crate::error::EngineError;
use crate::state::UserPosition;
use drawpool_types::{Amount, EngineParams, RiskLevel, Timestamp, UserId, ELIGIBILITY_LAG};
use std::collections::HashMap;

/// Result of a recorded deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    /// Epoch the deposit was recorded in.
    pub epoch: u64,
    /// Epoch the deposit registered eligibility for.
    pub eligible_epoch: u64,
    /// Whether this deposit newly flagged the user for `eligible_epoch`.
    pub newly_registered: bool,
    pub transition: Option<EpochTransition>,
}

/// Owns every [`UserPosition`].
#[derive(Clone, Debug, Default)]
pub struct UserLedger {
    positions: HashMap<UserId, UserPosition>,
}

impl UserLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_positions(positions: HashMap<UserId, UserPosition>) -> Self {
        Self { positions }
    }

    pub fn position(&self, user: &UserId) -> Option<&UserPosition> {
        self.positions.get(user)
    }

    pub(crate) fn position_mut(&mut self, user: &UserId) -> Option<&mut UserPosition> {
        self.positions.get_mut(user)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&UserId, &UserPosition)> {
        self.positions.iter()
    }

    pub fn user_count(&self) -> usize {
        self.positions.len()
    }

    /// Record a deposit of `amount`, advancing the epoch first if it is due.
    ///
    /// `risk_level` only takes effect on the user's first deposit.
    #[allow(clippy::too_many_arguments)]
    pub fn record_deposit(
        &mut self,
        epochs: &mut EpochManager,
        params: &EngineParams,
        running_pool: Amount,
        user: &UserId,
        amount: Amount,
        risk_level: RiskLevel,
        now: Timestamp,
    ) -> Result<DepositReceipt, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument(
                "deposit amount must be positive".into(),
            ));
        }

        // Stage every fallible step against the epoch the deposit will land
        // in; the advance, registration and position write come last.
        let current = epochs.effective_number(now, params.epoch_duration_secs)?;

        let mut updated = match self.positions.get(user) {
            Some(existing) => {
                let mut position = existing.clone();
                position.time_weighted_balance =
                    position.accrued_time_weight(current, params.time_weight_multiplier)?;
                position
            }
            None => UserPosition::new(risk_level, current),
        };
        updated.total_deposited = updated
            .total_deposited
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        updated.current_balance = updated
            .current_balance
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        updated.last_deposit_epoch = current;
        updated.last_update_epoch = current;

        let eligible_epoch = current
            .checked_add(ELIGIBILITY_LAG)
            .ok_or(EngineError::Overflow)?;
        epochs.check_registration(eligible_epoch, user)?;

        let transition = epochs.advance_if_due(now, params.epoch_duration_secs, running_pool)?;
        let newly_registered = epochs.register_eligible(eligible_epoch, user)?;
        self.positions.insert(user.clone(), updated);

        tracing::debug!(
            %user,
            amount = %amount,
            epoch = current,
            eligible_epoch,
            newly_registered,
            "deposit recorded"
        );

        Ok(DepositReceipt {
            epoch: current,
            eligible_epoch,
            newly_registered,
            transition,
        })
    }

    /// Record a withdrawal of `amount`, advancing the epoch first if it is due.
    ///
    /// Accrued time weight and granted eligibility are never taken back.
    pub fn record_withdrawal(
        &mut self,
        epochs: &mut EpochManager,
        params: &EngineParams,
        running_pool: Amount,
        user: &UserId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Option<EpochTransition>, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument(
                "withdrawal amount must be positive".into(),
            ));
        }
        let existing = self
            .positions
            .get(user)
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))?;
        if amount > existing.current_balance {
            return Err(EngineError::InsufficientBalance {
                requested: amount.raw(),
                available: existing.current_balance.raw(),
            });
        }
        if amount > existing.total_deposited {
            return Err(EngineError::InsufficientBalance {
                requested: amount.raw(),
                available: existing.total_deposited.raw(),
            });
        }

        let current = epochs.effective_number(now, params.epoch_duration_secs)?;
        let mut updated = existing.clone();
        updated.time_weighted_balance =
            updated.accrued_time_weight(current, params.time_weight_multiplier)?;
        updated.last_update_epoch = current;
        updated.current_balance = updated.current_balance.saturating_sub(amount);

        let transition = epochs.advance_if_due(now, params.epoch_duration_secs, running_pool)?;
        self.positions.insert(user.clone(), updated);

        tracing::debug!(%user, amount = %amount, epoch = current, "withdrawal recorded");
        Ok(transition)
    }

    /// Change a known user's risk tier.
    pub fn update_risk_level(
        &mut self,
        user: &UserId,
        level: RiskLevel,
    ) -> Result<RiskLevel, EngineError> {
        let position = self
            .positions
            .get_mut(user)
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))?;
        let previous = position.risk_level;
        position.risk_level = level;
        Ok(previous)
    }
}
