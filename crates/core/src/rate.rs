//! Fixed-point present-value conversion for Comet principals.
//!
//! Present value is `principal * baseBorrowIndex / baseIndexScale`, truncated
//! toward zero, in 256-bit integer arithmetic. Floats never enter the path so
//! results agree with on-chain truncation.

use alloy::primitives::{I256, U256};
use comet_monitor_chain::RateSnapshot;

/// Signed present value of `principal`.
///
/// Computed on the magnitude and re-signed, which truncates toward zero for
/// both signs. Saturates at the I256 bounds and returns zero for a zero scale.
#[inline(always)]
pub fn present_value(principal: I256, base_borrow_index: U256, base_index_scale: U256) -> I256 {
    let magnitude = principal
        .unsigned_abs()
        .saturating_mul(base_borrow_index)
        .checked_div(base_index_scale)
        .unwrap_or_default();

    I256::checked_from_sign_and_abs(principal.sign(), magnitude).unwrap_or(if principal.is_negative() {
        I256::MIN
    } else {
        I256::MAX
    })
}

/// Borrow magnitude of `principal` at `rate`. Zero for a non-negative principal.
#[inline(always)]
pub fn borrow_present_value(principal: I256, rate: &RateSnapshot) -> U256 {
    if !principal.is_negative() {
        return U256::ZERO;
    }
    principal
        .unsigned_abs()
        .saturating_mul(rate.base_borrow_index)
        .checked_div(rate.base_index_scale)
        .unwrap_or_default()
}
