pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Clamp a value into [lower, upper], mapping NaN to the given fallback.
pub(crate) fn clamp_or(value: f64, lower: f64, upper: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        max_of_2(lower, min_of_2(value, upper))
    }
}

/// Zero out non-finite values (NaN, +/-inf).
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    pub fn should_calc_2_as_min_of_4_and_2_floats() {
        assert_eq!(min_of_2(4., 2.), 2.);
    }

    #[rstest]
    pub fn should_calc_4_as_max_of_2_and_4_ints() {
        assert_eq!(max_of_2(2, 4), 4);
    }

    #[rstest]
    #[case(0.5, 0.5)]
    #[case(-0.2, 0.)]
    #[case(1.7, 1.)]
    #[case(f64::NAN, 0.)]
    pub fn should_clamp_factor_into_unit_interval(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(clamp_or(value, 0., 1., 0.), expected);
    }

    #[rstest]
    pub fn should_zero_out_non_finite_values() {
        assert_eq!(finite_or_zero(f64::INFINITY), 0.);
        assert_eq!(finite_or_zero(f64::NAN), 0.);
        assert_eq!(finite_or_zero(-3.5), -3.5);
    }
}
