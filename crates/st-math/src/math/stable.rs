//! Numerically stable primitives for posterior weight maintenance.

use std::f64::consts::PI;

/// 1 / sqrt(2π), the Gaussian density normalization constant.
pub const GAUSS_NORM: f64 = 0.398_942_280_401_432_7;

/// Normalise a weight vector in place so it sums to 1.
///
/// Returns the pre-normalisation sum on success. Returns `None` when the
/// weights cannot be normalised: the vector is empty, any weight is NaN or
/// infinite, or the sum is zero or non-finite. Callers treat `None` as
/// arithmetic saturation.
pub fn normalise(weights: &mut [f64]) -> Option<f64> {
    if weights.is_empty() {
        return None;
    }
    if weights.iter().any(|w| !w.is_finite()) {
        return None;
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return None;
    }
    for w in weights.iter_mut() {
        *w /= sum;
    }
    Some(sum)
}

/// Gaussian probability density at `x` for the given mean and variance.
///
/// The variance must be strictly positive; callers floor it beforehand.
/// Always non-negative; underflows to 0.0 for far-tail arguments.
pub fn gaussian_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    let z = x - mean;
    (GAUSS_NORM / variance.sqrt()) * (-(z * z) / (2.0 * variance)).exp()
}

/// Self-check that the hand-written constant matches the formula.
#[allow(dead_code)]
fn gauss_norm_formula() -> f64 {
    1.0 / (2.0 * PI).sqrt()
}
