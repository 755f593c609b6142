use proptest::prelude::*;

use drawpool_types::{Amount, RiskLevel, Timestamp};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }

    /// A window is closed exactly when its remaining time reaches zero.
    #[test]
    fn window_closed_iff_nothing_remains(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start + offset);
        prop_assert_eq!(t.window_closed(duration, now), t.remaining_in_window(duration, now) == 0);
        prop_assert_eq!(t.window_closed(duration, now), offset >= duration);
    }

    /// checked_sub returns None exactly when b > a.
    #[test]
    fn amount_checked_sub_underflow(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = Amount::new(a).checked_sub(Amount::new(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(Amount::new(a - b)));
        }
    }

    /// Any u8 either maps to a level whose index round-trips or is rejected.
    #[test]
    fn risk_level_from_u8(v in 0u8..=255) {
        match RiskLevel::try_from(v) {
            Ok(level) => prop_assert_eq!(RiskLevel::ALL[v as usize], level),
            Err(_) => prop_assert!(v > 2),
        }
    }

    /// bincode keeps the amount bit-exact.
    #[test]
    fn amount_bincode_preserves_value(raw in 0u128..u128::MAX) {
        let encoded = bincode::serialize(&Amount::new(raw)).unwrap();
        let decoded: Amount = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.raw(), raw);
    }
}
