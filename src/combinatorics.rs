//! Binomial coefficients used by the butterfly formulas and the normalizations.

/// `C(n, 2)` for any non-negative `n` (`0` for `n < 2`).
#[inline]
pub fn choose2(n: i128) -> i128 {
    if n < 2 { 0 } else { n * (n - 1) / 2 }
}

/// `C(n, k)` computed incrementally so intermediate values stay small.
///
/// Returns `0` when `k > n`.
///
/// # Example
/// ```
/// # use quartet_distances::combinatorics::choose;
/// assert_eq!(choose(4, 4), 1);
/// assert_eq!(choose(12, 4), 495);
/// ```
pub fn choose(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 1..=k as u128 {
        // result * (n - k + i) is always divisible by i at this point
        result = result * (n as u128 - k as u128 + i) / i;
    }
    result as u64
}
