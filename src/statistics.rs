//! A simple statistics module with the goodness-of-fit helpers used by validation.
use statrs::statistics::Statistics;

/// Coefficient of determination of a least-squares line fitted through (x, y).
///
/// Equal to the squared Pearson correlation. Returns NaN when either series is constant
/// (no fit can be made), except when the two series are identical, where the fit is exact.
pub fn r_squared(x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 || x.len() != y.len() {
        return f64::NAN;
    }
    if x == y {
        return 1.;
    }
    let covariance = x.iter().copied().covariance(y.iter().copied());
    let variance_x = x.iter().copied().variance();
    let variance_y = y.iter().copied().variance();
    if variance_x == 0. || variance_y == 0. {
        return f64::NAN;
    }
    covariance.powi(2) / (variance_x * variance_y)
}

/// Root-mean-square error as a percentage of the mean of the reference series.
pub fn rmse_percent(estimate: &[f64], reference: &[f64]) -> f64 {
    if estimate.is_empty() || estimate.len() != reference.len() {
        return f64::NAN;
    }
    let mean_squared_error = estimate
        .iter()
        .zip(reference)
        .map(|(e, r)| (e - r).powi(2))
        .mean();
    mean_squared_error.sqrt() / reference.iter().mean() * 100.
}

/// Relative difference of the series totals, as a percentage of the reference total.
pub fn percent_difference(estimate: &[f64], reference: &[f64]) -> f64 {
    let estimate_total: f64 = estimate.iter().sum();
    let reference_total: f64 = reference.iter().sum();
    (estimate_total - reference_total) / reference_total * 100.
}

/// Round half away from zero to the given number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
