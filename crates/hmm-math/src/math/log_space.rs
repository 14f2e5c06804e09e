//! Numerically stable log-domain arithmetic.
//!
//! Every probability the engine touches is stored as a natural logarithm.
//! [`LOG_ZERO`] stands in for `-infinity`: a finite sentinel rather than
//! `f64::NEG_INFINITY` so that it survives arithmetic performed by callers
//! that are not careful about infinities (formatting, serialization,
//! difference checks) without turning into `NaN`.

/// Sentinel representing log(0). Finite so it can be compared, serialized,
/// and round-tripped without producing `NaN` in the surrounding arithmetic.
pub const LOG_ZERO: f64 = -1.0e10;

/// Returns `true` if `x` should be treated as log(0).
///
/// Anything at or below [`LOG_ZERO`] counts: re-estimation can drive a
/// log-probability further negative than the sentinel itself (e.g. summing
/// several `LOG_ZERO` terms in log-space), and all of those must still
/// collapse to "no mass".
#[inline]
pub fn is_log_zero(x: f64) -> bool {
    x <= LOG_ZERO
}

/// Stable `log(exp(a) + exp(b))` over the `LOG_ZERO` convention.
///
/// `LOG_ZERO` is absorbing for the *other* operand: `lnsum(LOG_ZERO, x) ==
/// x`. This makes `LOG_ZERO` a valid starting accumulator for posterior
/// sums (`fold(LOG_ZERO, lnsum)`).
pub fn lnsum(a: f64, b: f64) -> f64 {
    if is_log_zero(a) {
        return b;
    }
    if is_log_zero(b) {
        return a;
    }
    let max = a.max(b);
    max + (-(a - b).abs()).exp().ln_1p()
}

/// Stable `log(sum(exp(values)))` over the `LOG_ZERO` convention.
///
/// Returns [`LOG_ZERO`] for an empty slice or when every entry is log(0).
pub fn lnsum_all(values: &[f64]) -> f64 {
    values.iter().fold(LOG_ZERO, |acc, &v| lnsum(acc, v))
}
