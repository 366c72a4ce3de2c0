//! Whole-share arithmetic for entries and exits.

/// Absorbs representation error so that e.g. 150 x (50/150) floors to 50, not 49.
const ROUNDING_SLACK: f64 = 1e-9;

/// Shares to buy: `floor(position_fraction x equity / price)`.
///
/// Returns zero for non-positive or non-finite inputs.
pub fn position_size(equity: f64, position_fraction: f64, price: f64) -> u64 {
    if !(equity.is_finite() && price.is_finite()) || equity <= 0.0 || price <= 0.0 {
        return 0;
    }
    let shares = (position_fraction * equity / price).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    }
}

/// Shares to sell for an exit of `fraction` of `current` shares.
///
/// `floor(current x fraction)`, except that a fraction >= 1 (or a count that
/// reaches `current`) closes exactly the remainder. Zero means "ignore".
pub fn shares_to_close(current: u64, fraction: f64) -> u64 {
    if fraction.is_nan() || fraction <= 0.0 {
        return 0;
    }
    if fraction >= 1.0 {
        return current;
    }
    let shares = (current as f64 * fraction + ROUNDING_SLACK).floor() as u64;
    shares.min(current)
}
