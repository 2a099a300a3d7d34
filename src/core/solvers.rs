use argmin::core::{CostFunction, Executor, State};
use argmin::solver::goldensectionsearch::GoldenSectionSearch;
use std::f64::consts::E;

const LAMBERT_W_TOLERANCE: f64 = 1e-12;
const LAMBERT_W_MAX_ITER: usize = 60;

/// Principal branch W0 of the Lambert W function for non-negative real arguments,
/// i.e. the w >= 0 satisfying w * e^w = x.
///
/// Uses Halley iteration from a logarithmic starting guess.
/// Returns +inf for an infinite argument and NaN for arguments below -1/e.
pub(crate) fn lambert_w0(x: f64) -> f64 {
    if x.is_nan() || x < -1. / E {
        return f64::NAN;
    }
    if x == 0. {
        return 0.;
    }
    if x.is_infinite() {
        return f64::INFINITY;
    }

    let mut w = if x < 1. {
        // series around zero
        x * (1. - x)
    } else {
        let l1 = x.ln();
        let l2 = l1.ln().max(0.);
        l1 - l2 + if l1 > 0. { l2 / l1 } else { 0. }
    };

    for _ in 0..LAMBERT_W_MAX_ITER {
        let ew = w.exp();
        let f = w * ew - x;
        let wp1 = w + 1.;
        let denominator = ew * wp1 - (w + 2.) * f / (2. * wp1);
        let step = f / denominator;
        w -= step;
        if step.abs() <= LAMBERT_W_TOLERANCE * (1. + w.abs()) {
            break;
        }
    }
    w
}

/// Lambert W0 evaluated at x = exp(log_x), for arguments too large to represent directly.
///
/// Solves w + ln(w) = log_x by Newton iteration, starting from w = log_x.
pub(crate) fn lambert_w0_of_exp(log_x: f64) -> f64 {
    if log_x < 700. {
        return lambert_w0(log_x.exp());
    }
    let mut w = log_x;
    for _ in 0..3 {
        w = w * (1. - w.ln() + log_x) / (1. + w);
    }
    w
}

/// Negated objective, so that argmin's minimising solvers find a maximum.
struct Negated<F: Fn(f64) -> f64> {
    func: F,
}

impl<F: Fn(f64) -> f64> CostFunction for Negated<F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(-(self.func)(*x))
    }
}

/// Maximise a unimodal function over [lower, upper] by golden-section search.
///
/// `tolerance` is relative to the magnitude of the bracketing points. Returns the abscissa of
/// the maximum and the function value there. An empty or inverted interval collapses to
/// `lower`.
pub(crate) fn golden_section_maximise(
    func: impl Fn(f64) -> f64,
    lower: f64,
    upper: f64,
    tolerance: f64,
    max_iter: u64,
) -> anyhow::Result<(f64, f64)> {
    if lower.is_nan() || upper.is_nan() || upper <= lower {
        return Ok((lower, func(lower)));
    }

    let solver = GoldenSectionSearch::new(lower, upper)?.with_tolerance(tolerance)?;
    let result = Executor::new(Negated { func }, solver)
        .configure(|state| state.param((lower + upper) / 2.).max_iters(max_iter))
        .run()?;

    let state = result.state();
    let x = *state
        .get_best_param()
        .ok_or_else(|| anyhow::anyhow!("golden-section search finished without a best point"))?;
    Ok((x, -state.get_best_cost()))
}
