//! The reward engine facade called by the vault, the administrator and UIs.

use crate::claim::{self, ClaimOutcome, ClaimProcessor};
use crate::epoch::{EpochManager, EpochTransition};
use crate::error::EngineError;
use crate::ledger::{DepositReceipt, UserLedger};
use crate::reward::{self, RewardCalculation};
use crate::state::{Epoch, EpochPhase, PoolTotals, UserPosition};
use drawpool_random::RandomnessSource;
use drawpool_store::{LedgerStore, StoreError};
use drawpool_types::{
    Amount, EngineParams, EpochNumber, RiskLevel, RiskParams, Timestamp, UserId,
    ELIGIBILITY_LAG,
};
use drawpool_utils::format_duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

const META_PARAMS: &[u8] = b"params";
const META_POOL: &[u8] = b"pool_totals";
const META_EPOCH_CURSOR: &[u8] = b"epoch_cursor";

/// Read-only view of the current epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochStatus {
    pub number: EpochNumber,
    pub start_time: Timestamp,
    pub time_remaining_secs: u64,
    pub total_yield_pool: Amount,
    pub total_distributed: Amount,
    pub participant_count: u64,
    pub phase: EpochPhase,
}

impl fmt::Display for EpochStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {} ({:?}): pool {}, distributed {}, {} participants, {} remaining",
            self.number,
            self.phase,
            self.total_yield_pool,
            self.total_distributed,
            self.participant_count,
            format_duration(self.time_remaining_secs)
        )
    }
}

/// Read-only view of one user's deposits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub total_deposited: Amount,
    pub current_balance: Amount,
    pub first_deposit_epoch: EpochNumber,
    pub last_deposit_epoch: EpochNumber,
    pub risk_level: RiskLevel,
    pub time_weighted_balance: u128,
    pub claimed_count: usize,
}

impl From<&UserPosition> for UserSnapshot {
    fn from(p: &UserPosition) -> Self {
        Self {
            total_deposited: p.total_deposited,
            current_balance: p.current_balance,
            first_deposit_epoch: p.first_deposit_epoch,
            last_deposit_epoch: p.last_deposit_epoch,
            risk_level: p.risk_level,
            time_weighted_balance: p.time_weighted_balance,
            claimed_count: p.claimed_epochs.len(),
        }
    }
}

/// Epoch-based randomized yield distribution engine.
///
/// A single-writer ledger: every mutator takes `&mut self` and either fully
/// commits or returns an error with state untouched. Hosts that share one
/// engine between callers wrap it in [`crate::SharedEngine`].
pub struct YieldEngine {
    params: EngineParams,
    epochs: EpochManager,
    ledger: UserLedger,
    pool: PoolTotals,
}

impl YieldEngine {
    /// Start a fresh ledger with epoch 1 opened at `genesis`.
    pub fn new(params: EngineParams, genesis: Timestamp) -> Result<Self, EngineError> {
        params.validate()?;
        tracing::info!(
            genesis = genesis.as_secs(),
            epoch_duration = params.epoch_duration_secs,
            "reward engine initialized"
        );
        Ok(Self {
            params,
            epochs: EpochManager::new(genesis),
            ledger: UserLedger::new(),
            pool: PoolTotals::default(),
        })
    }

    // ── Vault entry points ─────────────────────────────────────────────

    pub fn record_deposit(
        &mut self,
        user: &UserId,
        amount: Amount,
        risk_level: RiskLevel,
        now: Timestamp,
    ) -> Result<DepositReceipt, EngineError> {
        self.ledger.record_deposit(
            &mut self.epochs,
            &self.params,
            self.pool.total_yield_pool,
            user,
            amount,
            risk_level,
            now,
        )
    }

    /// `Ok` means the withdrawal was accepted and the vault may release funds.
    pub fn record_withdrawal(
        &mut self,
        user: &UserId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        self.ledger
            .record_withdrawal(
                &mut self.epochs,
                &self.params,
                self.pool.total_yield_pool,
                user,
                amount,
                now,
            )
            .map(|_| ())
    }

    /// Resolve `user`'s draw for a closed epoch.
    pub fn claim_epoch_reward(
        &mut self,
        user: &UserId,
        epoch: EpochNumber,
        randomness: &dyn RandomnessSource,
    ) -> Result<ClaimOutcome, EngineError> {
        ClaimProcessor {
            params: &self.params,
            epochs: &mut self.epochs,
            ledger: &mut self.ledger,
            pool: &mut self.pool,
        }
        .claim(user, epoch, randomness)
    }

    pub fn update_user_risk_level(
        &mut self,
        user: &UserId,
        level: RiskLevel,
    ) -> Result<(), EngineError> {
        let previous = self.ledger.update_risk_level(user, level)?;
        tracing::info!(%user, from = %previous, to = %level, "risk level updated");
        Ok(())
    }

    // ── Epoch and pool management ──────────────────────────────────────

    pub fn advance_if_due(
        &mut self,
        now: Timestamp,
    ) -> Result<Option<EpochTransition>, EngineError> {
        self.epochs
            .advance_if_due(now, self.params.epoch_duration_secs, self.pool.total_yield_pool)
    }

    /// Administrative override of the epoch schedule.
    pub fn advance_manually(
        &mut self,
        now: Timestamp,
    ) -> Result<Option<EpochTransition>, EngineError> {
        self.epochs.advance_manually(now, self.pool.total_yield_pool)
    }

    /// Add yield to the global pool and the open epoch's snapshot.
    ///
    /// Finalized epochs keep their frozen figures.
    pub fn add_yield(&mut self, amount: Amount) -> Result<(), EngineError> {
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument(
                "yield amount must be positive".into(),
            ));
        }
        let total = self
            .pool
            .total_yield_pool
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        self.epochs.add_yield_to_current(amount)?;
        self.pool.total_yield_pool = total;
        tracing::info!(
            amount = %amount,
            epoch = self.epochs.current_number(),
            pool = %total,
            "yield added"
        );
        Ok(())
    }

    // ── Administration ─────────────────────────────────────────────────

    pub fn set_epoch_duration(&mut self, secs: u64) -> Result<(), EngineError> {
        if secs == 0 {
            return Err(EngineError::InvalidArgument(
                "epoch duration must be non-zero".into(),
            ));
        }
        self.params.epoch_duration_secs = secs;
        tracing::info!(secs, "epoch duration updated");
        Ok(())
    }

    pub fn set_risk_parameters(
        &mut self,
        level: RiskLevel,
        risk: RiskParams,
    ) -> Result<(), EngineError> {
        risk.validate()?;
        self.params.risk.set(level, risk);
        tracing::info!(
            %level,
            multiplier_bps = risk.multiplier_bps,
            base_probability_bps = risk.base_probability_bps,
            "risk parameters updated"
        );
        Ok(())
    }

    pub fn set_minimum_balance(&mut self, amount: Amount) {
        self.params.minimum_balance = amount;
        tracing::info!(amount = %amount, "minimum balance updated");
    }

    /// Returns `false` if the asset was already listed.
    pub fn add_supported_asset(&mut self, asset: &str) -> Result<bool, EngineError> {
        let asset = asset.trim();
        if asset.is_empty() {
            return Err(EngineError::InvalidArgument("asset id must be non-empty".into()));
        }
        let added = self.params.supported_assets.insert(asset.to_string());
        tracing::info!(asset, added, "supported asset listed");
        Ok(added)
    }

    /// Returns `false` if the asset was not listed.
    pub fn remove_supported_asset(&mut self, asset: &str) -> bool {
        let removed = self.params.supported_assets.remove(asset.trim());
        tracing::info!(asset, removed, "supported asset delisted");
        removed
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn current_epoch(&self) -> EpochNumber {
        self.epochs.current_number()
    }

    pub fn epoch(&self, number: EpochNumber) -> Option<&Epoch> {
        self.epochs.epoch(number)
    }

    pub fn epoch_status(&self, now: Timestamp) -> EpochStatus {
        let number = self.epochs.current_number();
        let current = self.epochs.current();
        EpochStatus {
            number,
            start_time: self.epochs.last_epoch_start(),
            time_remaining_secs: self
                .epochs
                .time_remaining(now, self.params.epoch_duration_secs),
            total_yield_pool: current.map(|e| e.total_yield_pool).unwrap_or_default(),
            total_distributed: current.map(|e| e.total_distributed).unwrap_or_default(),
            participant_count: current.map(|e| e.participant_count).unwrap_or(0),
            phase: current.map(|e| e.phase()).unwrap_or(EpochPhase::Open),
        }
    }

    pub fn pool_totals(&self) -> PoolTotals {
        self.pool
    }

    pub fn position(&self, user: &UserId) -> Option<&UserPosition> {
        self.ledger.position(user)
    }

    pub fn user_snapshot(&self, user: &UserId) -> Option<UserSnapshot> {
        self.ledger.position(user).map(UserSnapshot::from)
    }

    /// Reward parameters `user` would be resolved with for `epoch` right now.
    pub fn preview_reward(
        &self,
        user: &UserId,
        epoch: EpochNumber,
    ) -> Result<RewardCalculation, EngineError> {
        let position = self
            .ledger
            .position(user)
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))?;
        reward::calculate(&self.params, position, epoch, self.epochs.epoch(epoch))
    }

    pub fn is_claimed(&self, user: &UserId, epoch: EpochNumber) -> bool {
        self.ledger
            .position(user)
            .is_some_and(|p| p.has_claimed(epoch))
    }

    pub fn is_eligible(&self, user: &UserId, epoch: EpochNumber) -> bool {
        self.ledger.position(user).is_some_and(|p| {
            claim::check_eligibility(&self.params, p, user, epoch, self.epochs.epoch(epoch))
                .is_ok()
        })
    }

    /// Closed epochs `user` is eligible for and has not yet claimed.
    pub fn claimable_epochs(&self, user: &UserId) -> Vec<EpochNumber> {
        let Some(position) = self.ledger.position(user) else {
            return Vec::new();
        };
        let first = position.first_deposit_epoch.saturating_add(ELIGIBILITY_LAG);
        (first..self.epochs.current_number())
            .filter(|&n| !position.has_claimed(n))
            .filter(|&n| {
                claim::check_eligibility(&self.params, position, user, n, self.epochs.epoch(n))
                    .is_ok()
            })
            .collect()
    }

    pub fn is_supported_asset(&self, asset: &str) -> bool {
        self.params.supported_assets.contains(asset)
    }
}

impl YieldEngine {
    /// Persist all engine state to a ledger store.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), EngineError> {
        let encode = |e: bincode::Error| StoreError::Serialization(e.to_string());

        store.put_meta(META_PARAMS, &bincode::serialize(&self.params).map_err(encode)?)?;
        store.put_meta(META_POOL, &bincode::serialize(&self.pool).map_err(encode)?)?;
        let cursor = (self.epochs.current_number(), self.epochs.last_epoch_start());
        store.put_meta(META_EPOCH_CURSOR, &bincode::serialize(&cursor).map_err(encode)?)?;

        for epoch in self.epochs.epochs() {
            store.put_epoch(epoch.number, &bincode::serialize(epoch).map_err(encode)?)?;
        }
        for (user, position) in self.ledger.positions() {
            store.put_position(user, &bincode::serialize(position).map_err(encode)?)?;
        }
        tracing::debug!(
            epochs = self.epochs.current_number(),
            users = self.ledger.user_count(),
            "ledger saved"
        );
        Ok(())
    }

    /// Restore engine state from a ledger store.
    pub fn load_from_store(store: &dyn LedgerStore) -> Result<Self, EngineError> {
        let decode = |e: bincode::Error| StoreError::Serialization(e.to_string());

        let params: EngineParams = match store.get_meta(META_PARAMS)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(decode)?,
            None => EngineParams::default(),
        };
        let pool: PoolTotals = match store.get_meta(META_POOL)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(decode)?,
            None => PoolTotals::default(),
        };
        let (current, last_epoch_start): (EpochNumber, Timestamp) =
            match store.get_meta(META_EPOCH_CURSOR)? {
                Some(bytes) => bincode::deserialize(&bytes).map_err(decode)?,
                None => return Err(StoreError::NotFound("epoch cursor".into()).into()),
            };

        let mut epochs = BTreeMap::new();
        for (number, bytes) in store.iter_epochs()? {
            let epoch: Epoch = bincode::deserialize(&bytes).map_err(decode)?;
            epochs.insert(number, epoch);
        }
        if !epochs.contains_key(&current) {
            return Err(StoreError::Corruption(format!(
                "cursor points at epoch {current}, which has no record"
            ))
            .into());
        }

        let mut positions = HashMap::new();
        for (user, bytes) in store.iter_positions()? {
            let position: UserPosition = bincode::deserialize(&bytes).map_err(decode)?;
            positions.insert(user, position);
        }

        Ok(Self {
            params,
            epochs: EpochManager::from_parts(current, last_epoch_start, epochs),
            ledger: UserLedger::from_positions(positions),
            pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawpool_types::AMOUNT_UNIT;

    const DAY: u64 = 86_400;

    fn engine() -> YieldEngine {
        let params = EngineParams {
            epoch_duration_secs: DAY,
            ..EngineParams::default()
        };
        YieldEngine::new(params, Timestamp::new(0)).unwrap()
    }

    fn tokens(n: u128) -> Amount {
        Amount::new(n * AMOUNT_UNIT)
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = EngineParams {
            epoch_duration_secs: 0,
            ..EngineParams::default()
        };
        assert!(YieldEngine::new(params, Timestamp::new(0)).is_err());
    }

    #[test]
    fn add_yield_updates_global_and_current_epoch() {
        let mut engine = engine();
        engine.add_yield(tokens(50)).unwrap();
        assert_eq!(engine.pool_totals().total_yield_pool, tokens(50));
        let status = engine.epoch_status(Timestamp::new(0));
        assert_eq!(status.total_yield_pool, tokens(50));
        assert_eq!(status.total_distributed, Amount::ZERO);
        assert!(engine.add_yield(Amount::ZERO).is_err());
    }

    #[test]
    fn add_yield_leaves_finalized_epochs_alone() {
        let mut engine = engine();
        engine.add_yield(tokens(10)).unwrap();
        engine.advance_if_due(Timestamp::new(DAY)).unwrap();
        engine.add_yield(tokens(5)).unwrap();

        assert_eq!(engine.epoch(1).unwrap().total_yield_pool, tokens(10));
        assert_eq!(engine.epoch(2).unwrap().total_yield_pool, tokens(15));
    }

    #[test]
    fn epoch_status_reports_remaining_time() {
        let engine = engine();
        let status = engine.epoch_status(Timestamp::new(3_600));
        assert_eq!(status.number, 1);
        assert_eq!(status.time_remaining_secs, DAY - 3_600);
        assert_eq!(status.phase, EpochPhase::Open);
        assert!(status.to_string().contains("23h 0m remaining"));
    }

    #[test]
    fn admin_setters_validate_input() {
        let mut engine = engine();
        assert!(engine.set_epoch_duration(0).is_err());
        engine.set_epoch_duration(3_600).unwrap();
        assert_eq!(engine.params().epoch_duration_secs, 3_600);

        let too_generous = RiskParams {
            multiplier_bps: 10_000,
            base_probability_bps: 9_000,
        };
        assert!(engine.set_risk_parameters(RiskLevel::Low, too_generous).is_err());

        engine.set_minimum_balance(tokens(5));
        assert_eq!(engine.params().minimum_balance, tokens(5));
    }

    #[test]
    fn supported_assets_are_a_set() {
        let mut engine = engine();
        assert!(engine.add_supported_asset("USDC").unwrap());
        assert!(!engine.add_supported_asset("USDC").unwrap());
        assert!(engine.is_supported_asset("USDC"));
        assert!(engine.add_supported_asset("  ").is_err());
        assert!(engine.remove_supported_asset("USDC"));
        assert!(!engine.is_supported_asset("USDC"));
    }

    #[test]
    fn preview_requires_known_user() {
        let engine = engine();
        let ghost = UserId::new("ghost").unwrap();
        assert!(matches!(
            engine.preview_reward(&ghost, 3),
            Err(EngineError::UnknownUser(_))
        ));
        assert!(engine.claimable_epochs(&ghost).is_empty());
        assert!(!engine.is_claimed(&ghost, 1));
    }

    #[test]
    fn snapshot_reflects_deposits() {
        let mut engine = engine();
        let alice = UserId::new("alice").unwrap();
        engine
            .record_deposit(&alice, tokens(100), RiskLevel::High, Timestamp::new(0))
            .unwrap();
        let snapshot = engine.user_snapshot(&alice).unwrap();
        assert_eq!(snapshot.current_balance, tokens(100));
        assert_eq!(snapshot.first_deposit_epoch, 1);
        assert_eq!(snapshot.risk_level, RiskLevel::High);
        assert_eq!(snapshot.claimed_count, 0);
    }
}
