//! Epoch lifecycle: advance on schedule or by administrative override,
//! finalize the closing epoch and open the next one.

use crate::error::EngineError;
use crate::state::Epoch;
use drawpool_types::{Amount, EpochNumber, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a single advance did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochTransition {
    pub finalized: EpochNumber,
    pub opened: EpochNumber,
    pub at: Timestamp,
    /// Pool snapshot carried into the opened epoch.
    pub carried_pool: Amount,
}

/// Owns every epoch record and the current-epoch cursor.
///
/// Records are append-only: an epoch is created either when eligibility is
/// registered for it or when it is opened, and is never removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpochManager {
    current: EpochNumber,
    last_epoch_start: Timestamp,
    epochs: BTreeMap<EpochNumber, Epoch>,
}

impl EpochManager {
    /// Open epoch 1 at `genesis`.
    pub fn new(genesis: Timestamp) -> Self {
        let mut first = Epoch::pending(1);
        first.start_time = Some(genesis);
        let mut epochs = BTreeMap::new();
        epochs.insert(1, first);
        Self {
            current: 1,
            last_epoch_start: genesis,
            epochs,
        }
    }

    pub(crate) fn from_parts(
        current: EpochNumber,
        last_epoch_start: Timestamp,
        epochs: BTreeMap<EpochNumber, Epoch>,
    ) -> Self {
        Self {
            current,
            last_epoch_start,
            epochs,
        }
    }

    pub fn current_number(&self) -> EpochNumber {
        self.current
    }

    pub fn last_epoch_start(&self) -> Timestamp {
        self.last_epoch_start
    }

    pub fn epoch(&self, number: EpochNumber) -> Option<&Epoch> {
        self.epochs.get(&number)
    }

    pub(crate) fn epoch_mut(&mut self, number: EpochNumber) -> Option<&mut Epoch> {
        self.epochs.get_mut(&number)
    }

    pub fn epochs(&self) -> impl Iterator<Item = &Epoch> {
        self.epochs.values()
    }

    /// The open epoch. Always present after construction.
    pub fn current(&self) -> Option<&Epoch> {
        self.epochs.get(&self.current)
    }

    /// Whether the schedule says the current epoch has run its course.
    pub fn is_due(&self, now: Timestamp, duration_secs: u64) -> bool {
        self.last_epoch_start.window_closed(duration_secs, now)
    }

    /// Seconds left before the current epoch becomes due.
    pub fn time_remaining(&self, now: Timestamp, duration_secs: u64) -> u64 {
        self.last_epoch_start.remaining_in_window(duration_secs, now)
    }

    /// The epoch a ledger mutation at `now` lands in, without advancing.
    pub fn effective_number(
        &self,
        now: Timestamp,
        duration_secs: u64,
    ) -> Result<EpochNumber, EngineError> {
        if self.is_due(now, duration_secs) {
            self.current.checked_add(1).ok_or(EngineError::Overflow)
        } else {
            Ok(self.current)
        }
    }

    /// Advance once if the current epoch is due.
    ///
    /// However many durations have elapsed, at most one epoch is opened per
    /// call; the new epoch starts at `now`, so repeating the call at the same
    /// instant is a no-op.
    pub fn advance_if_due(
        &mut self,
        now: Timestamp,
        duration_secs: u64,
        running_pool: Amount,
    ) -> Result<Option<EpochTransition>, EngineError> {
        if !self.is_due(now, duration_secs) {
            return Ok(None);
        }
        self.advance(now, running_pool).map(Some)
    }

    /// Advance outside the schedule.
    ///
    /// A second override at the instant the current epoch was opened does
    /// nothing.
    pub fn advance_manually(
        &mut self,
        now: Timestamp,
        running_pool: Amount,
    ) -> Result<Option<EpochTransition>, EngineError> {
        let opened_now = self
            .current()
            .and_then(|e| e.start_time)
            .is_some_and(|start| start == now);
        if opened_now {
            return Ok(None);
        }
        self.advance(now, running_pool).map(Some)
    }

    fn advance(
        &mut self,
        now: Timestamp,
        running_pool: Amount,
    ) -> Result<EpochTransition, EngineError> {
        let finalized = self.current;
        let opened = finalized.checked_add(1).ok_or(EngineError::Overflow)?;

        if let Some(closing) = self.epochs.get_mut(&finalized) {
            closing.end_time = Some(now);
            closing.finalized = true;
        }

        // Keep any eligibility registered while the epoch was pending.
        let next = self
            .epochs
            .entry(opened)
            .or_insert_with(|| Epoch::pending(opened));
        next.start_time = Some(now);
        next.total_yield_pool = running_pool;

        self.current = opened;
        self.last_epoch_start = now;

        tracing::info!(
            finalized,
            opened,
            at = now.as_secs(),
            pool = %running_pool,
            "epoch advanced"
        );

        Ok(EpochTransition {
            finalized,
            opened,
            at: now,
            carried_pool: running_pool,
        })
    }

    /// Whether [`Self::register_eligible`] would newly flag `user`, or the
    /// error it would fail with. Touches nothing.
    pub(crate) fn check_registration(
        &self,
        epoch: EpochNumber,
        user: &UserId,
    ) -> Result<bool, EngineError> {
        match self.epochs.get(&epoch) {
            Some(record) if record.is_eligible(user) => Ok(false),
            Some(record) => record
                .participant_count
                .checked_add(1)
                .map(|_| true)
                .ok_or(EngineError::Overflow),
            None => Ok(true),
        }
    }

    /// Flag `user` eligible for `epoch`, creating a pending record if needed.
    /// Returns `false` if the user was already flagged.
    pub(crate) fn register_eligible(
        &mut self,
        epoch: EpochNumber,
        user: &UserId,
    ) -> Result<bool, EngineError> {
        let record = self
            .epochs
            .entry(epoch)
            .or_insert_with(|| Epoch::pending(epoch));
        record.register(user)
    }

    /// Add yield to the open epoch's pool snapshot.
    pub(crate) fn add_yield_to_current(&mut self, amount: Amount) -> Result<(), EngineError> {
        let current = self.current;
        let epoch = self
            .epochs
            .get_mut(&current)
            .ok_or_else(|| EngineError::InvalidArgument(format!("epoch {current} missing")))?;
        epoch.total_yield_pool = epoch
            .total_yield_pool
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EpochPhase;

    const DAY: u64 = 86_400;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[test]
    fn genesis_opens_epoch_one() {
        let manager = EpochManager::new(Timestamp::new(1_000));
        assert_eq!(manager.current_number(), 1);
        let first = manager.current().unwrap();
        assert_eq!(first.phase(), EpochPhase::Open);
        assert_eq!(first.start_time, Some(Timestamp::new(1_000)));
    }

    #[test]
    fn advance_if_due_waits_for_the_schedule() {
        let mut manager = EpochManager::new(Timestamp::new(0));
        let early = manager
            .advance_if_due(Timestamp::new(DAY - 1), DAY, Amount::ZERO)
            .unwrap();
        assert!(early.is_none());
        assert_eq!(manager.current_number(), 1);

        let due = manager
            .advance_if_due(Timestamp::new(DAY), DAY, Amount::new(50))
            .unwrap()
            .unwrap();
        assert_eq!((due.finalized, due.opened), (1, 2));
        assert_eq!(manager.current().unwrap().total_yield_pool, Amount::new(50));

        let closed = manager.epoch(1).unwrap();
        assert!(closed.finalized);
        assert_eq!(closed.end_time, Some(Timestamp::new(DAY)));
    }

    #[test]
    fn advance_if_due_is_idempotent_within_a_window() {
        let mut manager = EpochManager::new(Timestamp::new(0));
        let now = Timestamp::new(DAY);
        assert!(manager.advance_if_due(now, DAY, Amount::ZERO).unwrap().is_some());
        assert!(manager.advance_if_due(now, DAY, Amount::ZERO).unwrap().is_none());
        assert!(manager
            .advance_if_due(Timestamp::new(DAY + 10), DAY, Amount::ZERO)
            .unwrap()
            .is_none());
        assert_eq!(manager.current_number(), 2);
    }

    #[test]
    fn long_gaps_never_skip_epochs() {
        let mut manager = EpochManager::new(Timestamp::new(0));
        let t = manager
            .advance_if_due(Timestamp::new(10 * DAY), DAY, Amount::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(t.opened, 2);
        assert_eq!(manager.last_epoch_start(), Timestamp::new(10 * DAY));
    }

    #[test]
    fn manual_advance_ignores_schedule_once_per_instant() {
        let mut manager = EpochManager::new(Timestamp::new(0));
        let now = Timestamp::new(5);
        assert!(manager.advance_manually(now, Amount::ZERO).unwrap().is_some());
        assert!(manager.advance_manually(now, Amount::ZERO).unwrap().is_none());
        assert_eq!(manager.current_number(), 2);
        assert!(manager
            .advance_manually(Timestamp::new(6), Amount::ZERO)
            .unwrap()
            .is_some());
        assert_eq!(manager.current_number(), 3);
    }

    #[test]
    fn opening_keeps_pending_registrations() {
        let mut manager = EpochManager::new(Timestamp::new(0));
        assert!(manager.register_eligible(3, &user("alice")).unwrap());
        assert_eq!(manager.epoch(3).unwrap().phase(), EpochPhase::Pending);

        manager.advance_manually(Timestamp::new(1), Amount::ZERO).unwrap();
        manager.advance_manually(Timestamp::new(2), Amount::new(7)).unwrap();

        let third = manager.epoch(3).unwrap();
        assert_eq!(third.phase(), EpochPhase::Open);
        assert_eq!(third.participant_count, 1);
        assert_eq!(third.total_yield_pool, Amount::new(7));
    }

    #[test]
    fn time_remaining_counts_down_to_zero() {
        let manager = EpochManager::new(Timestamp::new(100));
        assert_eq!(manager.time_remaining(Timestamp::new(150), DAY), DAY - 50);
        assert_eq!(manager.time_remaining(Timestamp::new(100 + 2 * DAY), DAY), 0);
    }

    #[test]
    fn staging_helpers_do_not_mutate() {
        let mut manager = EpochManager::new(Timestamp::new(0));
        assert_eq!(manager.effective_number(Timestamp::new(DAY - 1), DAY).unwrap(), 1);
        assert_eq!(manager.effective_number(Timestamp::new(DAY), DAY).unwrap(), 2);
        assert_eq!(manager.current_number(), 1);

        let alice = user("alice");
        assert!(manager.check_registration(3, &alice).unwrap());
        assert!(manager.epoch(3).is_none());
        manager.register_eligible(3, &alice).unwrap();
        assert!(!manager.check_registration(3, &alice).unwrap());
        assert!(manager.check_registration(3, &user("bob")).unwrap());
        assert_eq!(manager.epoch(3).unwrap().participant_count, 1);
    }
}
