use crate::compare_floats::clamp_or;
use crate::core::columns::{
    ALB_INC, AZ_SOL, BEAM_INC, DIFF_HOR, DIF_S_INC, GLOB_SHD, H_SOL, PHI_ANG, SHD_A_LSS, SHD_B_LSS,
    SHD_D_LSS, SHD_LOSS,
};
use crate::core::solar_geometry::{cosd, sind, TrackerOrientation};
use crate::time_series::TimeSeriesTable;
use std::f64::consts::PI;

// Empirical coefficient of the albedo self-shading loss
const ALBEDO_SHADING_COEFFICIENT: f64 = 1.15;

/// Angle of the sun relative to the tracker's rotation plane, in radians.
///
/// Arguments:
/// * `elevation` - solar elevation, in degrees
/// * `azimuth` - solar azimuth, clockwise from north, in degrees
pub fn sun_angle_in_rotation_plane(elevation: f64, azimuth: f64) -> f64 {
    let sun_x = cosd(elevation) * sind(azimuth);
    let sun_z = sind(elevation);
    sun_x.atan2(sun_z)
}

/// Fraction of the plane's beam irradiance lost to the neighbouring row, in [0, 1].
///
/// Arguments:
/// * `psi` - sun angle in the rotation plane, in radians
/// * `theta` - tracker rotation, in radians
/// * `gcr` - ground coverage ratio
pub fn beam_shading_fraction(psi: f64, theta: f64, gcr: f64) -> f64 {
    let projection = psi.tan() * theta.tan() + 1.;
    let fraction = (projection - 1. / (gcr * theta.cos())) / projection;
    clamp_or(fraction, 0., 1., 0.)
}

/// Elevation angle, in degrees, of the next row's top edge seen from the bottom of the
/// collector (a zero slant height, so the whole row is taken as masked).
pub fn masking_angle(surface_tilt: f64, gcr: f64) -> f64 {
    let numerator = gcr * sind(surface_tilt);
    let denominator = 1. - gcr * cosd(surface_tilt);
    (numerator / denominator).atan().to_degrees()
}

/// Passias and Källbäck sky-diffuse loss factor for a masking angle in degrees.
pub fn sky_diffuse_shading_factor(masking_angle: f64) -> f64 {
    1. - cosd(masking_angle / 2.).powi(2)
}

/// Ground-reflected irradiance lost to self-shading.
///
/// The empirical coefficient can make the loss exceed the component for flat-lying trackers;
/// the result is not capped.
pub fn albedo_shading_loss(albedo_irradiance: f64, theta: f64, gcr: f64) -> f64 {
    ALBEDO_SHADING_COEFFICIENT * gcr * albedo_irradiance * (PI - theta.abs())
}

/// Row-to-row shading losses for each plane-of-array component.
///
/// The sky-diffuse loss is taken from the diffuse horizontal irradiance, so it is not bounded
/// by the plane's DifSInc. Adds ShdBLss, ShdDLss, ShdALss, ShdLoss and GlobShd to the table.
pub fn apply_near_shading(
    table: &mut TimeSeriesTable,
    orientation: &TrackerOrientation,
    gcr: f64,
) -> anyhow::Result<()> {
    let elevation = table.column(H_SOL)?;
    let azimuth = table.column(AZ_SOL)?;
    let phi = table.column(PHI_ANG)?;
    let beam_inc = table.column(BEAM_INC)?;
    let dif_s_inc = table.column(DIF_S_INC)?;
    let alb_inc = table.column(ALB_INC)?;
    let diff_hor = table.column(DIFF_HOR)?;

    let n = table.len();
    let mut shd_b = Vec::with_capacity(n);
    let mut shd_d = Vec::with_capacity(n);
    let mut shd_a = Vec::with_capacity(n);
    let mut glob_shd = Vec::with_capacity(n);

    for i in 0..n {
        let theta = phi[i].to_radians();
        let psi = sun_angle_in_rotation_plane(elevation[i], azimuth[i]);

        let beam_loss = beam_inc[i] * beam_shading_fraction(psi, theta, gcr);
        let diffuse_factor = sky_diffuse_shading_factor(masking_angle(orientation.surface_tilt[i], gcr));
        let diffuse_loss = diff_hor[i] * diffuse_factor;
        let albedo_loss = albedo_shading_loss(alb_inc[i], theta, gcr);

        shd_b.push(beam_loss);
        shd_d.push(diffuse_loss);
        shd_a.push(albedo_loss);
        glob_shd.push(
            (beam_inc[i] - beam_loss) + (dif_s_inc[i] - diffuse_loss) + (alb_inc[i] - albedo_loss),
        );
    }

    let shd_loss = (0..n).map(|i| shd_b[i] + shd_d[i] + shd_a[i]).collect();

    table.insert(SHD_B_LSS, shd_b);
    table.insert(SHD_D_LSS, shd_d);
    table.insert(SHD_A_LSS, shd_a);
    table.insert(SHD_LOSS, shd_loss);
    table.insert(GLOB_SHD, glob_shd);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::tests::hourly_table;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn test_sun_angle_in_rotation_plane() {
        assert_relative_eq!(sun_angle_in_rotation_plane(90., 180.), 0., epsilon = 1e-12);
        assert_relative_eq!(
            sun_angle_in_rotation_plane(30., 90.),
            60_f64.to_radians(),
            epsilon = 1e-12
        );
    }

    #[rstest]
    #[case(0., 0.)]
    #[case(0.3, 0.2)]
    #[case(-1.2, 0.9)]
    #[case(1.4, 0.95)]
    #[case(1.5, 1.5)]
    fn test_beam_shading_fraction_is_bounded(#[case] psi: f64, #[case] theta: f64) {
        let fraction = beam_shading_fraction(psi, theta, 0.35);
        assert!((0. ..=1.).contains(&fraction), "fraction {fraction} out of range");
    }

    #[rstest]
    fn test_low_sun_behind_tilted_row_is_partly_shaded() {
        // sun 10 degrees up in the east, tracker turned 60 degrees east
        let psi = sun_angle_in_rotation_plane(10., 90.);
        let fraction = beam_shading_fraction(psi, 60_f64.to_radians(), 0.5);
        let expected = {
            let p = psi.tan() * 60_f64.to_radians().tan() + 1.;
            (p - 1. / (0.5 * 60_f64.to_radians().cos())) / p
        };
        assert!(fraction > 0.);
        assert_relative_eq!(fraction, expected, epsilon = 1e-12);
    }

    #[rstest]
    fn test_flat_tracker_has_no_diffuse_masking() {
        assert_relative_eq!(masking_angle(0., 0.35), 0.);
        assert_relative_eq!(sky_diffuse_shading_factor(0.), 0.);
    }

    #[rstest]
    fn test_masking_angle_for_tilted_row() {
        let expected = (0.5 * sind(30.) / (1. - 0.5 * cosd(30.))).atan().to_degrees();
        assert_relative_eq!(masking_angle(30., 0.5), expected);
        assert!(sky_diffuse_shading_factor(expected) > 0.);
    }

    #[rstest]
    #[case(20., 0.2, 0.35)]
    #[case(20., 1.2, 0.2)]
    #[case(0., 0.5, 0.35)]
    fn test_albedo_shading_loss(#[case] albedo: f64, #[case] theta: f64, #[case] gcr: f64) {
        assert_relative_eq!(
            albedo_shading_loss(albedo, theta, gcr),
            1.15 * gcr * albedo * (PI - theta.abs())
        );
    }

    #[rstest]
    fn test_near_shading_of_tilted_row_follows_component_formulas() {
        let gcr = 0.35;
        let tilt = 30.;
        let orientation = TrackerOrientation {
            tracker_theta: vec![tilt],
            aoi: vec![20.],
            surface_tilt: vec![tilt],
            surface_azimuth: vec![90.],
        };
        let mut table = hourly_table("15/03/2021 08:00", 1);
        table.insert(H_SOL, vec![40.]);
        table.insert(AZ_SOL, vec![90.]);
        table.insert(PHI_ANG, vec![tilt]);
        table.insert(BEAM_INC, vec![500.]);
        // less plane diffuse than the row masks off the horizontal diffuse
        table.insert(DIF_S_INC, vec![1.]);
        table.insert(ALB_INC, vec![10.]);
        table.insert(DIFF_HOR, vec![150.]);

        apply_near_shading(&mut table, &orientation, gcr).unwrap();

        let theta = tilt.to_radians();
        let mask = (gcr * sind(tilt) / (1. - gcr * cosd(tilt))).atan().to_degrees();
        let expected_diffuse = 150. * (1. - cosd(mask / 2.).powi(2));
        let expected_albedo = 1.15 * gcr * 10. * (PI - theta);
        let expected_beam =
            500. * beam_shading_fraction(sun_angle_in_rotation_plane(40., 90.), theta, gcr);

        assert!(expected_diffuse > 1.);
        assert!(expected_albedo > 10.);
        assert_relative_eq!(table.column(SHD_D_LSS).unwrap()[0], expected_diffuse, epsilon = 1e-9);
        assert_relative_eq!(table.column(SHD_A_LSS).unwrap()[0], expected_albedo, epsilon = 1e-9);
        assert_relative_eq!(table.column(SHD_B_LSS).unwrap()[0], expected_beam, epsilon = 1e-9);
        assert_relative_eq!(
            table.column(SHD_LOSS).unwrap()[0],
            expected_beam + expected_diffuse + expected_albedo,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            table.column(GLOB_SHD).unwrap()[0],
            (500. - expected_beam) + (1. - expected_diffuse) + (10. - expected_albedo),
            epsilon = 1e-9
        );
    }
}
