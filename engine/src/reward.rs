//! Risk-weighted win probability and payout for a (user, epoch) pair.
//!
//! ```text
//! base_weight   = current_balance
//! time_weight   = current_balance × max(0, epoch − first_deposit_epoch) × TIME_WEIGHT_MULTIPLIER
//! total_weight  = (base_weight + time_weight) × risk_multiplier / BASIS_POINTS
//! probability   = min(MAX_PROBABILITY, base_probability + total_weight / WEIGHT_SCALE)
//! payout        = (pool / participants) × risk_multiplier / BASIS_POINTS
//!                 × total_weight / (base_weight + 1)
//! ```
//!
//! The calculation reads the position as it stands when called. Preview and
//! claim share this code path, so a preview taken just before a claim matches
//! what the claim resolves against.

use crate::error::EngineError;
use crate::math::checked_mul_div;
use crate::state::{Epoch, UserPosition};
use drawpool_types::{
    Amount, BasisPoints, EngineParams, EpochNumber, BASIS_POINTS, MAX_PROBABILITY_BPS,
    WEIGHT_SCALE,
};
use serde::{Deserialize, Serialize};

/// Derived reward parameters. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCalculation {
    pub base_weight: u128,
    pub time_weight: u128,
    /// Basis points.
    pub risk_multiplier: BasisPoints,
    pub total_weight: u128,
    /// Basis points, at most [`MAX_PROBABILITY_BPS`].
    pub win_probability: BasisPoints,
    pub potential_payout: Amount,
}

/// Compute reward parameters for `position` in `epoch_number`.
///
/// `epoch` is the epoch's record if one exists; an epoch nobody registered
/// for has no participants and therefore no payout.
pub fn calculate(
    params: &EngineParams,
    position: &UserPosition,
    epoch_number: EpochNumber,
    epoch: Option<&Epoch>,
) -> Result<RewardCalculation, EngineError> {
    let risk = params.risk.get(position.risk_level);
    let multiplier = risk.multiplier_bps as u128;

    let base_weight = position.current_balance.raw();
    let time_in_vault = epoch_number.saturating_sub(position.first_deposit_epoch) as u128;
    let time_weight = base_weight
        .checked_mul(time_in_vault)
        .and_then(|v| v.checked_mul(params.time_weight_multiplier as u128))
        .ok_or(EngineError::Overflow)?;

    let weighted = base_weight
        .checked_add(time_weight)
        .ok_or(EngineError::Overflow)?;
    let total_weight = checked_mul_div(weighted, multiplier, BASIS_POINTS)?;

    let bonus = (total_weight / WEIGHT_SCALE).min(MAX_PROBABILITY_BPS as u128) as BasisPoints;
    let win_probability = risk
        .base_probability_bps
        .saturating_add(bonus)
        .min(MAX_PROBABILITY_BPS);

    let potential_payout = match epoch {
        Some(e) if e.participant_count > 0 => {
            let share = e.total_yield_pool.raw() / e.participant_count as u128;
            let risk_adjusted = checked_mul_div(share, multiplier, BASIS_POINTS)?;
            // `+ 1` keeps the divisor non-zero for emptied positions.
            let denominator = base_weight.checked_add(1).ok_or(EngineError::Overflow)?;
            Amount::new(checked_mul_div(risk_adjusted, total_weight, denominator)?)
        }
        _ => Amount::ZERO,
    };

    Ok(RewardCalculation {
        base_weight,
        time_weight,
        risk_multiplier: risk.multiplier_bps,
        total_weight,
        win_probability,
        potential_payout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawpool_types::{RiskLevel, UserId, AMOUNT_UNIT};

    fn position(balance: u128, first_epoch: u64, level: RiskLevel) -> UserPosition {
        let mut p = UserPosition::new(level, first_epoch);
        p.total_deposited = Amount::new(balance);
        p.current_balance = Amount::new(balance);
        p
    }

    fn epoch_with(pool: u128, participants: u64) -> Epoch {
        let mut e = Epoch::pending(3);
        e.total_yield_pool = Amount::new(pool);
        for i in 0..participants {
            e.register(&UserId::new(format!("user-{i}")).unwrap()).unwrap();
        }
        e
    }

    #[test]
    fn weights_follow_the_formula() {
        let params = EngineParams::default();
        let p = position(100 * AMOUNT_UNIT, 1, RiskLevel::Low);
        let calc = calculate(&params, &p, 3, None).unwrap();

        assert_eq!(calc.base_weight, 100 * AMOUNT_UNIT);
        assert_eq!(calc.time_weight, 200 * AMOUNT_UNIT);
        assert_eq!(calc.risk_multiplier, 5_000);
        // (100 + 200) × 0.5 = 150 tokens
        assert_eq!(calc.total_weight, 150 * AMOUNT_UNIT);
        // 2000 bps base + 150 bps bonus
        assert_eq!(calc.win_probability, 2_150);
        assert_eq!(calc.potential_payout, Amount::ZERO);
    }

    #[test]
    fn payout_scales_share_by_risk_and_weight() {
        let params = EngineParams::default();
        let p = position(100 * AMOUNT_UNIT, 1, RiskLevel::Medium);
        let e = epoch_with(10 * AMOUNT_UNIT, 2);
        let calc = calculate(&params, &p, 3, Some(&e)).unwrap();

        // share 5 tokens × 1.0 × (300 / (100 + 1 raw)), just under 15 tokens.
        let expected = checked_mul_div(5 * AMOUNT_UNIT, 300 * AMOUNT_UNIT, 100 * AMOUNT_UNIT + 1)
            .unwrap();
        assert_eq!(calc.potential_payout, Amount::new(expected));
        assert!(calc.potential_payout < Amount::new(15 * AMOUNT_UNIT));
        assert!(calc.potential_payout > Amount::new(14 * AMOUNT_UNIT));
    }

    #[test]
    fn probability_is_capped() {
        let params = EngineParams::default();
        let whale = position(1_000_000_000 * AMOUNT_UNIT, 1, RiskLevel::High);
        let calc = calculate(&params, &whale, 50, None).unwrap();
        assert_eq!(calc.win_probability, MAX_PROBABILITY_BPS);
    }

    #[test]
    fn empty_balance_has_zero_weight_and_payout() {
        let params = EngineParams::default();
        let p = position(0, 1, RiskLevel::High);
        let e = epoch_with(10 * AMOUNT_UNIT, 1);
        let calc = calculate(&params, &p, 3, Some(&e)).unwrap();
        assert_eq!(calc.total_weight, 0);
        assert_eq!(calc.potential_payout, Amount::ZERO);
        assert_eq!(calc.win_probability, 500);
    }

    #[test]
    fn epochs_before_first_deposit_have_no_time_weight() {
        let params = EngineParams::default();
        let p = position(AMOUNT_UNIT, 5, RiskLevel::Medium);
        let calc = calculate(&params, &p, 2, None).unwrap();
        assert_eq!(calc.time_weight, 0);
    }

    #[test]
    fn identical_state_gives_identical_output() {
        let params = EngineParams::default();
        let p = position(42 * AMOUNT_UNIT, 2, RiskLevel::High);
        let e = epoch_with(1_000 * AMOUNT_UNIT, 7);
        assert_eq!(
            calculate(&params, &p, 9, Some(&e)).unwrap(),
            calculate(&params, &p, 9, Some(&e)).unwrap()
        );
    }
}
