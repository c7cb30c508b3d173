//! Fixed-point arithmetic for claim percentages.
//!
//! Percentages are expressed in units of [`SCALE`] (`10^18` = 100%). All
//! amounts and credits are raw `u128` integers. Products are widened to 256
//! bits so that 18-decimal amounts times [`SCALE`] never overflow before the
//! division; only a quotient that does not fit `u128` is rejected.

use ruint::aliases::U256;

/// Fixed-point scale: `SCALE` represents a share of 100%.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// `a * b / denom`, rounded down. `None` on a zero denominator or when the
/// quotient does not fit `u128`.
pub fn mul_div(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denom);
    u128::try_from(quotient).ok()
}
