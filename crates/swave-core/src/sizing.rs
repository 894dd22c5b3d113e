//! Sizing primitives: value bound, modulus, level count, level capacity.
//!
//! Everything the engine stores is reduced modulo M, the smallest power of
//! two at least `2 * window * bound`. The number of levels and the
//! per-level queue capacity together determine the fast query's relative
//! error guarantee.

/// Fallback error target when a level capacity is requested for a zero
/// epsilon.
const FALLBACK_EPSILON: f64 = 0.01;

/// Largest exponent usable for the modulus; `2^62` keeps one sign bit and
/// one carry bit of headroom in `i64`.
const MAX_MODULUS_EXP: u32 = 62;

/// Largest per-item value whose window sum cannot overflow `i64`.
#[must_use]
pub fn max_increment(window: i64) -> i64 {
    assert!(window > 0, "window must be > 0");
    i64::MAX / window
}

/// Smallest power of two `>= 2 * window * bound`.
///
/// The exponent is capped at [`MAX_MODULUS_EXP`]; when the product does not
/// fit in `i64` at all the modulus degrades to `i64::MAX` and arithmetic
/// falls back to plain remainders.
#[must_use]
pub fn modulus(window: i64, bound: i64) -> i64 {
    if bound > 0 {
        let Some(double_bound) = bound.checked_mul(2) else {
            return i64::MAX;
        };
        if window > i64::MAX / double_bound {
            return i64::MAX;
        }
    }

    let target = 2 * window * bound;
    let mut m: i64 = 1;
    for _ in 0..MAX_MODULUS_EXP {
        if m >= target {
            break;
        }
        m <<= 1;
    }
    m
}

/// Number of levels: `1 + |ceil(log2(2 * epsilon * window * r))|` where `r`
/// falls back to [`max_increment`] when no positive bound is configured.
/// Clamped to `[1, 63]`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn num_levels(window: i64, epsilon: f64, bound: i64) -> usize {
    assert!(window > 0, "window must be > 0");

    let r = if bound > 0 {
        bound
    } else {
        max_increment(window)
    };

    let spread = 2.0 * epsilon * window as f64 * r as f64;
    let f = spread.log2().ceil().abs() as i64;

    if f > 62 { 63 } else { (1 + f) as usize }
}

/// Per-level queue capacity: `ceil(1 / epsilon) + 1`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::float_cmp)]
pub fn level_cap(epsilon: f64) -> usize {
    let e = if epsilon == 0.0 {
        FALLBACK_EPSILON
    } else {
        epsilon
    };
    ((1.0 / e) + 1.0).ceil() as usize
}
