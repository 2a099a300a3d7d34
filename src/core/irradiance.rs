use crate::compare_floats::max_of_2;
use crate::core::columns::{ALB_INC, AZ_SOL, BEAM_HOR, BEAM_INC, DIFF_HOR, DIF_S_INC, GLOB_HOR, GLOB_INC};
use crate::core::solar_geometry::{aoi_projection, cosd, sind, TrackerOrientation};
use crate::time_series::TimeSeriesTable;
use std::f64::consts::PI;

const SOLAR_CONSTANT: f64 = 1366.1; // W/m2
const SEA_LEVEL_PRESSURE: f64 = 101_325.; // Pa

// cos(zenith) below which the sun is too close to the horizon for a meaningful beam component
const MIN_COS_ZENITH_FOR_BEAM: f64 = 1e-6;

struct BrightnessCoefficientsRow {
    f11: f64,
    f12: f64,
    f13: f64,
    f21: f64,
    f22: f64,
    f23: f64,
}

// Perez et al. (1990) all-sites composite coefficients, one row per sky clearness bin
static BRIGHTNESS_COEFFICIENTS: [BrightnessCoefficientsRow; 8] = [
    BrightnessCoefficientsRow {
        f11: -0.0083117,
        f12: 0.5877285,
        f13: -0.0620636,
        f21: -0.0596012,
        f22: 0.0721249,
        f23: -0.0220216,
    },
    BrightnessCoefficientsRow {
        f11: 0.1299457,
        f12: 0.6825954,
        f13: -0.1513752,
        f21: -0.0189325,
        f22: 0.065965,
        f23: -0.0288748,
    },
    BrightnessCoefficientsRow {
        f11: 0.3296958,
        f12: 0.4868735,
        f13: -0.2210958,
        f21: 0.055414,
        f22: -0.0639588,
        f23: -0.0260542,
    },
    BrightnessCoefficientsRow {
        f11: 0.5682053,
        f12: 0.1874525,
        f13: -0.295129,
        f21: 0.1088631,
        f22: -0.1519229,
        f23: -0.0139754,
    },
    BrightnessCoefficientsRow {
        f11: 0.873028,
        f12: -0.3920403,
        f13: -0.3616149,
        f21: 0.2255647,
        f22: -0.4620442,
        f23: 0.0012448,
    },
    BrightnessCoefficientsRow {
        f11: 1.1326077,
        f12: -1.2367284,
        f13: -0.4118494,
        f21: 0.2877813,
        f22: -0.8230357,
        f23: 0.0558651,
    },
    BrightnessCoefficientsRow {
        f11: 1.0601591,
        f12: -1.5999137,
        f13: -0.3589221,
        f21: 0.2642124,
        f22: -1.127234,
        f23: 0.1310694,
    },
    BrightnessCoefficientsRow {
        f11: 0.677747,
        f12: -0.3272588,
        f13: -0.2504286,
        f21: 0.1561313,
        f22: -1.3765031,
        f23: 0.2506212,
    },
];

const CLEARNESS_FORMULA_K: f64 = 1.041;

fn brightness_coefficients(e: f64) -> Option<&'static BrightnessCoefficientsRow> {
    // """ returns the brightness coefficient row for a sky clearness, None where the
    // clearness is undefined (no diffuse light, or night) """
    if e.is_nan() || e < 0. {
        return None;
    }
    let row = if e < 1.065 {
        0usize
    } else if e < 1.23 {
        1usize
    } else if e < 1.5 {
        2usize
    } else if e < 1.95 {
        3usize
    } else if e < 2.8 {
        4usize
    } else if e < 4.5 {
        5usize
    } else if e < 6.2 {
        6usize
    } else {
        7usize
    };
    Some(&BRIGHTNESS_COEFFICIENTS[row])
}

fn dimensionless_clearness_parameter(dhi: f64, dni: f64, zenith_rad: f64) -> f64 {
    // returns the sky clearness, epsilon; NaN when there is no diffuse irradiance
    let zenith_term = CLEARNESS_FORMULA_K * zenith_rad.powi(3);
    ((dhi + dni) / dhi + zenith_term) / (1. + zenith_term)
}

/// Direct normal irradiance from global and diffuse horizontal irradiance.
///
/// Zero where the horizontal beam is not positive or the sun is at the horizon.
pub fn beam_normal(ghi: f64, dhi: f64, zenith: f64) -> f64 {
    let beam_horizontal = ghi - dhi;
    let cos_zenith = cosd(zenith);
    if beam_horizontal <= 0. || cos_zenith < MIN_COS_ZENITH_FOR_BEAM {
        0.
    } else {
        beam_horizontal / cos_zenith
    }
}

/// Irradiance outside the atmosphere on a plane normal to the sun (Spencer, 1971), in W/m2.
pub fn extraterrestrial_irradiance(day_of_year: u32) -> f64 {
    let b = 2. * PI * (day_of_year as f64 - 1.) / 365.;
    SOLAR_CONSTANT
        * (1.00011
            + 0.034221 * b.cos()
            + 0.00128 * b.sin()
            + 0.000719 * (2. * b).cos()
            + 0.000077 * (2. * b).sin())
}

/// Kasten and Young (1989) relative optical air mass; NaN with the sun below the horizon.
pub fn relative_air_mass(zenith: f64) -> f64 {
    if zenith > 90. {
        return f64::NAN;
    }
    1. / (cosd(zenith) + 0.50572 * (96.07995 - zenith).powf(-1.6364))
}

/// Relative air mass corrected to the given station pressure, in Pa.
pub fn absolute_air_mass(relative_air_mass: f64, pressure: f64) -> f64 {
    relative_air_mass * pressure / SEA_LEVEL_PRESSURE
}

/// Sky diffuse irradiance on a tilted plane by the Perez (1990) anisotropic model, in W/m2.
///
/// Arguments:
/// * `surface_tilt`, `surface_azimuth` - plane orientation, in degrees
/// * `dhi`, `dni` - diffuse horizontal and direct normal irradiance, in W/m2
/// * `dni_extra` - extraterrestrial irradiance, in W/m2
/// * `zenith`, `azimuth` - sun position, in degrees
/// * `air_mass` - absolute air mass
///
/// Returns 0 wherever the model is undefined.
pub fn perez_sky_diffuse(
    surface_tilt: f64,
    surface_azimuth: f64,
    dhi: f64,
    dni: f64,
    dni_extra: f64,
    zenith: f64,
    azimuth: f64,
    air_mass: f64,
) -> f64 {
    let zenith_rad = zenith.to_radians();
    let delta = dhi * air_mass / dni_extra;
    let epsilon = dimensionless_clearness_parameter(dhi, dni, zenith_rad);

    let Some(coefficients) = brightness_coefficients(epsilon) else {
        return 0.;
    };

    let f1 = max_of_2(
        coefficients.f11 + coefficients.f12 * delta + coefficients.f13 * zenith_rad,
        0.,
    );
    let f2 = coefficients.f21 + coefficients.f22 * delta + coefficients.f23 * zenith_rad;

    let a = max_of_2(aoi_projection(surface_tilt, surface_azimuth, zenith, azimuth), 0.);
    let b = max_of_2(cosd(zenith), cosd(85.));

    let isotropic = 0.5 * (1. - f1) * (1. + cosd(surface_tilt));
    let circumsolar = f1 * a / b;
    let horizon = f2 * sind(surface_tilt);
    let sky_diffuse = dhi * (isotropic + circumsolar + horizon);

    if sky_diffuse.is_nan() {
        0.
    } else {
        max_of_2(sky_diffuse, 0.)
    }
}

/// Ground-reflected irradiance on a tilted plane, isotropic view factor.
pub fn ground_reflected(ghi: f64, albedo: f64, surface_tilt: f64) -> f64 {
    ghi * albedo * (1. - cosd(surface_tilt)) * 0.5
}

/// Transpose horizontal irradiance onto the tracker plane, adding BeamHor, BeamInc, DifSInc,
/// Alb_Inc and GlobInc to the table.
///
/// Arguments:
/// * `table` - simulation table holding GlobHor, DiffHor and AzSol
/// * `orientation` - tracker plane orientation for each timestep
/// * `zenith` - sun zenith angles after the horizon correction, in degrees
/// * `albedo` - ground reflectance
pub fn transpose_to_plane(
    table: &mut TimeSeriesTable,
    orientation: &TrackerOrientation,
    zenith: &[f64],
    albedo: f64,
) -> anyhow::Result<()> {
    let ghi = table.column(GLOB_HOR)?;
    let dhi = table.column(DIFF_HOR)?;
    let azimuth = table.column(AZ_SOL)?;
    let days_of_year = table.time().days_of_year();

    let n = table.len();
    let mut beam_hor = Vec::with_capacity(n);
    let mut beam_inc = Vec::with_capacity(n);
    let mut dif_s_inc = Vec::with_capacity(n);
    let mut alb_inc = Vec::with_capacity(n);

    for i in 0..n {
        let tilt = orientation.surface_tilt[i];
        let surface_azimuth = orientation.surface_azimuth[i];

        let dni = beam_normal(ghi[i], dhi[i], zenith[i]);
        let projection = aoi_projection(tilt, surface_azimuth, zenith[i], azimuth[i]);
        let air_mass = absolute_air_mass(relative_air_mass(zenith[i]), SEA_LEVEL_PRESSURE);

        beam_hor.push(dni);
        beam_inc.push(max_of_2(dni * projection, 0.));
        dif_s_inc.push(perez_sky_diffuse(
            tilt,
            surface_azimuth,
            dhi[i],
            dni,
            extraterrestrial_irradiance(days_of_year[i]),
            zenith[i],
            azimuth[i],
            air_mass,
        ));
        alb_inc.push(ground_reflected(ghi[i], albedo, tilt));
    }

    let glob_inc = (0..n)
        .map(|i| beam_inc[i] + dif_s_inc[i] + alb_inc[i])
        .collect();

    table.insert(BEAM_HOR, beam_hor);
    table.insert(BEAM_INC, beam_inc);
    table.insert(DIF_S_INC, dif_s_inc);
    table.insert(ALB_INC, alb_inc);
    table.insert(GLOB_INC, glob_inc);

    Ok(())
}
