pub const WATTS_PER_KILOWATT: u32 = 1_000;
pub const SQUARE_CENTIMETRES_PER_SQUARE_METRE: f64 = 10_000.;
pub const MILLIAMPS_PER_AMP: f64 = 1_000.;
pub const KELVIN_OFFSET: f64 = 273.15;

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.380_649e-23;
/// Elementary charge in C.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Thermal voltage k*T/q in volts for a cell temperature given in kelvin.
pub(crate) fn thermal_voltage(temp_k: f64) -> f64 {
    BOLTZMANN * temp_k / ELEMENTARY_CHARGE
}

/// Reduce an angle in degrees into [0, 360).
pub(crate) fn wrap_degrees_360(angle: f64) -> f64 {
    angle.rem_euclid(360.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn should_give_thermal_voltage_at_stc() {
        assert_relative_eq!(thermal_voltage(298.15), 0.025_693, max_relative = 1e-4);
    }

    #[rstest]
    #[case(-90., 270.)]
    #[case(360., 0.)]
    #[case(450., 90.)]
    fn should_wrap_degrees(#[case] angle: f64, #[case] expected: f64) {
        assert_relative_eq!(wrap_degrees_360(angle), expected);
    }
}
