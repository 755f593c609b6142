//! Claim resolution: eligibility, the draw, and settlement against the pool.
//!
//! A claim validates everything and draws randomness before it writes
//! anything. Marking the epoch claimed and settling the payout then happen
//! together, so a failed draw leaves no trace and a resolved claim (won or
//! lost) can never be replayed.

use crate::epoch::EpochManager;
use crate::error::EngineError;
use crate::ledger::UserLedger;
use crate::reward::{self, RewardCalculation};
use crate::state::{Epoch, PoolTotals, UserPosition};
use drawpool_random::RandomnessSource;
use drawpool_types::{Amount, EngineParams, EpochNumber, UserId, BASIS_POINTS, ELIGIBILITY_LAG};

/// How a claim resolved. The vault transfers `reward` if it is non-zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub epoch: EpochNumber,
    pub won: bool,
    pub reward: Amount,
    /// The draw reduced to basis points.
    pub normalized_random: u32,
    pub calculation: RewardCalculation,
}

/// Check whether `position` may claim `epoch`.
///
/// Eligibility needs a first deposit at least [`ELIGIBILITY_LAG`] epochs
/// earlier, a balance at or above the minimum, and a registration in the
/// epoch's eligible set.
pub fn check_eligibility(
    params: &EngineParams,
    position: &UserPosition,
    user: &UserId,
    epoch_number: EpochNumber,
    epoch: Option<&Epoch>,
) -> Result<(), EngineError> {
    let not_eligible = |reason: String| EngineError::NotEligible {
        epoch: epoch_number,
        reason,
    };
    if position.first_deposit_epoch == 0 {
        return Err(not_eligible("no deposit recorded".into()));
    }
    let latest_first_deposit = epoch_number.saturating_sub(ELIGIBILITY_LAG - 1);
    if position.first_deposit_epoch >= latest_first_deposit {
        return Err(not_eligible(format!(
            "first deposit in epoch {} is inside the {}-epoch lag",
            position.first_deposit_epoch, ELIGIBILITY_LAG
        )));
    }
    if position.current_balance < params.minimum_balance {
        return Err(not_eligible(format!(
            "balance {} below minimum {}",
            position.current_balance, params.minimum_balance
        )));
    }
    if !epoch.is_some_and(|e| e.is_eligible(user)) {
        return Err(not_eligible("never registered for this epoch".into()));
    }
    Ok(())
}

/// Resolve a win against what is left of the pool.
///
/// The payout is clamped to the epoch's remaining yield and to the global
/// undistributed pool, so neither can be over-distributed.
pub fn settle_amount(potential: Amount, epoch_available: Amount, global_pool: Amount) -> Amount {
    potential.min(epoch_available).min(global_pool)
}

/// Runs one claim against split borrows of the engine's state.
pub struct ClaimProcessor<'a> {
    pub(crate) params: &'a EngineParams,
    pub(crate) epochs: &'a mut EpochManager,
    pub(crate) ledger: &'a mut UserLedger,
    pub(crate) pool: &'a mut PoolTotals,
}

impl ClaimProcessor<'_> {
    /// Claim `epoch_number` for `user`, drawing once from `randomness`.
    pub fn claim(
        self,
        user: &UserId,
        epoch_number: EpochNumber,
        randomness: &dyn RandomnessSource,
    ) -> Result<ClaimOutcome, EngineError> {
        let current = self.epochs.current_number();
        if epoch_number >= current {
            return Err(EngineError::EpochNotCompleted {
                epoch: epoch_number,
                current,
            });
        }
        let position = self
            .ledger
            .position(user)
            .ok_or_else(|| EngineError::NotEligible {
                epoch: epoch_number,
                reason: "no deposit recorded".into(),
            })?;
        if position.has_claimed(epoch_number) {
            return Err(EngineError::AlreadyClaimed {
                epoch: epoch_number,
            });
        }
        let epoch = self.epochs.epoch(epoch_number);
        check_eligibility(self.params, position, user, epoch_number, epoch)?;

        let calculation = reward::calculate(self.params, position, epoch_number, epoch)?;

        let context = draw_context(user, epoch_number);
        let output = randomness.draw(&context).map_err(|e| {
            tracing::warn!(%user, epoch = epoch_number, source = randomness.name(), error = %e, "randomness draw failed");
            EngineError::from(e)
        })?;
        let normalized_random = output.reduce(BASIS_POINTS as u64) as u32;
        let won = normalized_random < calculation.win_probability;

        let (epoch_available, already_distributed) = epoch
            .map(|e| (e.available_yield(), e.total_distributed))
            .unwrap_or((Amount::ZERO, Amount::ZERO));
        let reward = if won {
            settle_amount(
                calculation.potential_payout,
                epoch_available,
                self.pool.total_yield_pool,
            )
        } else {
            Amount::ZERO
        };

        // Compute every new figure before writing any of them.
        let epoch_distributed = already_distributed
            .checked_add(reward)
            .ok_or(EngineError::Overflow)?;
        let total_distributed = self
            .pool
            .total_distributed_rewards
            .checked_add(reward)
            .ok_or(EngineError::Overflow)?;
        let remaining_pool = self
            .pool
            .total_yield_pool
            .checked_sub(reward)
            .ok_or(EngineError::Overflow)?;

        if let Some(position) = self.ledger.position_mut(user) {
            position.claimed_epochs.insert(epoch_number);
        }
        if !reward.is_zero() {
            if let Some(epoch) = self.epochs.epoch_mut(epoch_number) {
                epoch.total_distributed = epoch_distributed;
            }
            self.pool.total_distributed_rewards = total_distributed;
            self.pool.total_yield_pool = remaining_pool;
        }

        tracing::info!(
            %user,
            epoch = epoch_number,
            won,
            reward = %reward,
            roll = normalized_random,
            probability = calculation.win_probability,
            round = output.round,
            "claim resolved"
        );

        Ok(ClaimOutcome {
            epoch: epoch_number,
            won,
            reward,
            normalized_random,
            calculation,
        })
    }
}

/// Bytes binding a draw to its (user, epoch) pair.
fn draw_context(user: &UserId, epoch: EpochNumber) -> Vec<u8> {
    let mut context = Vec::with_capacity(user.as_bytes().len() + 9);
    context.extend_from_slice(user.as_bytes());
    context.push(b':');
    context.extend_from_slice(&epoch.to_be_bytes());
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawpool_types::RiskLevel;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn funded(balance: u128, first_epoch: u64) -> UserPosition {
        let mut p = UserPosition::new(RiskLevel::Low, first_epoch);
        p.total_deposited = Amount::new(balance);
        p.current_balance = Amount::new(balance);
        p
    }

    fn params() -> EngineParams {
        EngineParams {
            minimum_balance: Amount::new(10),
            ..EngineParams::default()
        }
    }

    #[test]
    fn eligibility_requires_two_epoch_lag() {
        let alice = user("alice");
        let mut epoch = Epoch::pending(3);
        epoch.register(&alice).unwrap();

        assert!(check_eligibility(&params(), &funded(100, 1), &alice, 3, Some(&epoch)).is_ok());
        let too_recent = check_eligibility(&params(), &funded(100, 2), &alice, 3, Some(&epoch));
        assert!(matches!(too_recent, Err(EngineError::NotEligible { epoch: 3, .. })));
    }

    #[test]
    fn eligibility_requires_minimum_balance_and_registration() {
        let alice = user("alice");
        let mut epoch = Epoch::pending(3);
        epoch.register(&alice).unwrap();

        assert!(check_eligibility(&params(), &funded(9, 1), &alice, 3, Some(&epoch)).is_err());
        assert!(check_eligibility(&params(), &funded(100, 1), &user("bob"), 3, Some(&epoch)).is_err());
        assert!(check_eligibility(&params(), &funded(100, 1), &alice, 3, None).is_err());
    }

    #[test]
    fn never_deposited_is_not_eligible() {
        let alice = user("alice");
        let mut epoch = Epoch::pending(5);
        epoch.register(&alice).unwrap();
        assert!(check_eligibility(&params(), &funded(100, 0), &alice, 5, Some(&epoch)).is_err());
    }

    #[test]
    fn small_epochs_never_underflow_the_lag() {
        let alice = user("alice");
        for n in 0..=2 {
            assert!(check_eligibility(&params(), &funded(100, 1), &alice, n, None).is_err());
        }
    }

    #[test]
    fn settlement_depletes_pool_in_claim_order() {
        // Pool of 10, two winners each entitled to 8.
        let mut epoch = Epoch::pending(5);
        epoch.total_yield_pool = Amount::new(10);
        let global = Amount::new(10);

        let first = settle_amount(Amount::new(8), epoch.available_yield(), global);
        assert_eq!(first, Amount::new(8));
        epoch.total_distributed = epoch.total_distributed.checked_add(first).unwrap();

        let second = settle_amount(
            Amount::new(8),
            epoch.available_yield(),
            global.saturating_sub(first),
        );
        assert_eq!(second, Amount::new(2));
    }

    #[test]
    fn settlement_respects_global_pool() {
        assert_eq!(
            settle_amount(Amount::new(8), Amount::new(10), Amount::new(3)),
            Amount::new(3)
        );
    }

    #[test]
    fn draw_context_separates_users_and_epochs() {
        assert_ne!(draw_context(&user("a"), 1), draw_context(&user("a"), 2));
        assert_ne!(draw_context(&user("a"), 1), draw_context(&user("b"), 1));
    }
}
