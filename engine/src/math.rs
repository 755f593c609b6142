//! Checked fixed-point helpers.
//!
//! Weights and payouts multiply two 18-decimal quantities before dividing, so
//! the product routinely exceeds `u128`. [`mul_div`] carries a 256-bit
//! intermediate and only fails when the final quotient does not fit.

use crate::EngineError;

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of two `u128`s as `(high, low)` words.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LOW_MASK);
    let (b1, b0) = (b >> 64, b & LOW_MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);
    let low = (p00 & LOW_MASK) | ((mid & LOW_MASK) << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (high, low)
}

/// `floor(a * b / denom)`, or `None` on a zero denominator or a quotient
/// wider than 128 bits.
pub fn mul_div(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Some(low / denom);
    }
    if high >= denom {
        return None;
    }

    // Restoring long division; `rem < denom` holds at the top of every step.
    let mut rem = high;
    let mut quot: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> i) & 1);
        quot <<= 1;
        if carry == 1 || rem >= denom {
            rem = rem.wrapping_sub(denom);
            quot |= 1;
        }
    }
    Some(quot)
}

/// [`mul_div`] mapped onto [`EngineError::Overflow`].
pub fn checked_mul_div(a: u128, b: u128, denom: u128) -> Result<u128, EngineError> {
    mul_div(a, b, denom).ok_or(EngineError::Overflow)
}
