use crate::compare_floats::{max_of_2, min_of_2};
use crate::core::units::wrap_degrees_360;
use chrono::{DateTime, FixedOffset};
use solar_positioning::time::DeltaT;
use solar_positioning::{spa, RefractionCorrection};

// Atmospheric conditions assumed for the refraction correction of the apparent elevation
const REFRACTION_PRESSURE_HPA: f64 = 1013.25;
const REFRACTION_TEMPERATURE_C: f64 = 12.;

// Apparent elevations inside (-LIMIT, LIMIT) are rescaled linearly, below are clamped to zero
const ELEVATION_RESCALE_LIMIT: f64 = 7.;

/// Apparent (refraction-corrected) solar elevation and azimuth, in degrees.
/// Azimuth is measured clockwise from north.
#[derive(Clone, Debug, PartialEq)]
pub struct SolarAngles {
    pub apparent_elevation: Vec<f64>,
    pub azimuth: Vec<f64>,
}

/// Orientation of a single-axis tracker and the sun's angle of incidence on it, in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerOrientation {
    /// rotation from horizontal; with the axis pointing north, positive tilts the panels east
    pub tracker_theta: Vec<f64>,
    pub aoi: Vec<f64>,
    pub surface_tilt: Vec<f64>,
    pub surface_azimuth: Vec<f64>,
}

/// Single-axis tracker geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SingleAxisTracker {
    pub axis_tilt: f64,
    pub axis_azimuth: f64,
    pub max_angle: f64,
    pub backtrack: bool,
    pub gcr: f64,
}

impl SingleAxisTracker {
    /// A horizontal north-south tracker with backtracking.
    ///
    /// Arguments:
    /// * `max_angle` - rotation limit either side of horizontal, in degrees
    /// * `gcr` - ground coverage ratio of the rows
    pub fn horizontal_north_south(max_angle: f64, gcr: f64) -> Self {
        Self {
            axis_tilt: 0.,
            axis_azimuth: 0.,
            max_angle,
            backtrack: true,
            gcr,
        }
    }

    /// Rotation and incidence angles for each timestep.
    ///
    /// Arguments:
    /// * `apparent_zenith` - sun zenith angles, in degrees
    /// * `apparent_azimuth` - sun azimuths, clockwise from north, in degrees
    pub fn orientation(&self, apparent_zenith: &[f64], apparent_azimuth: &[f64]) -> TrackerOrientation {
        let n = apparent_zenith.len();
        let mut orientation = TrackerOrientation {
            tracker_theta: Vec::with_capacity(n),
            aoi: Vec::with_capacity(n),
            surface_tilt: Vec::with_capacity(n),
            surface_azimuth: Vec::with_capacity(n),
        };

        for (&zenith, &azimuth) in apparent_zenith.iter().zip(apparent_azimuth) {
            let theta = self.tracker_theta(zenith, azimuth);
            let (surface_tilt, surface_azimuth) = self.surface_orientation(theta);
            orientation.tracker_theta.push(theta);
            orientation
                .aoi
                .push(angle_of_incidence(surface_tilt, surface_azimuth, zenith, azimuth));
            orientation.surface_tilt.push(surface_tilt);
            orientation.surface_azimuth.push(surface_azimuth);
        }

        orientation
    }

    fn tracker_theta(&self, zenith: f64, azimuth: f64) -> f64 {
        // sun vector in a frame with x east, y north, z up, then rotated into the axis frame
        let elevation = 90. - zenith;
        let az = azimuth - 180.;
        let x = cosd(elevation) * sind(az);
        let y = cosd(elevation) * cosd(az);
        let z = sind(elevation);

        let axis_azimuth_south = self.axis_azimuth - 180.;
        let xp = x * cosd(axis_azimuth_south) - y * sind(axis_azimuth_south);
        let zp = x * sind(axis_azimuth_south) * sind(self.axis_tilt)
            + y * sind(self.axis_tilt) * cosd(axis_azimuth_south)
            + z * cosd(self.axis_tilt);

        // ideal rotation, pointing the panel normal at the sun's projection
        let mut theta = xp.atan2(zp).to_degrees();

        if self.backtrack {
            let temp = (cosd(theta) / self.gcr).abs();
            if temp < 1. {
                theta += -theta.signum() * temp.acos().to_degrees();
            }
        }

        max_of_2(-self.max_angle, min_of_2(theta, self.max_angle))
    }

    fn surface_orientation(&self, theta: f64) -> (f64, f64) {
        let surface_tilt = (cosd(theta) * cosd(self.axis_tilt)).clamp(-1., 1.).acos().to_degrees();

        let azimuth_delta = if is_close!(sind(surface_tilt), 0., abs_tol = 1e-10) {
            90.
        } else {
            let delta = (sind(theta) / sind(surface_tilt)).clamp(-1., 1.).asin().to_degrees();
            if theta.abs() < 90. {
                delta
            } else {
                -delta + theta.signum() * 180.
            }
        };

        (surface_tilt, wrap_degrees_360(self.axis_azimuth + azimuth_delta))
    }
}

/// Cosine of the angle of incidence of the sun on a surface, unclipped.
pub fn aoi_projection(surface_tilt: f64, surface_azimuth: f64, zenith: f64, azimuth: f64) -> f64 {
    cosd(surface_tilt) * cosd(zenith)
        + sind(surface_tilt) * sind(zenith) * cosd(azimuth - surface_azimuth)
}

pub fn angle_of_incidence(surface_tilt: f64, surface_azimuth: f64, zenith: f64, azimuth: f64) -> f64 {
    aoi_projection(surface_tilt, surface_azimuth, zenith, azimuth)
        .clamp(-1., 1.)
        .acos()
        .to_degrees()
}

/// Apparent solar elevation and azimuth from NREL's SPA for each instant.
///
/// Arguments:
/// * `instants` - timezone-aware instants (interval centres)
/// * `latitude`, `longitude` - site coordinates, in degrees
/// * `altitude` - site altitude, in m
pub fn solar_angles(
    instants: &[DateTime<FixedOffset>],
    latitude: f64,
    longitude: f64,
    altitude: f64,
) -> anyhow::Result<SolarAngles> {
    let mut angles = SolarAngles {
        apparent_elevation: Vec::with_capacity(instants.len()),
        azimuth: Vec::with_capacity(instants.len()),
    };
    for instant in instants {
        let delta_t = DeltaT::estimate_from_date_like(*instant)
            .map_err(|e| anyhow::anyhow!("no delta T estimate for {instant}: {e:?}"))?;
        let position = spa::solar_position(
            *instant,
            latitude,
            longitude,
            altitude,
            delta_t,
            Some(refraction()?),
        )
        .map_err(|e| anyhow::anyhow!("solar position unavailable for {instant}: {e:?}"))?;
        angles.apparent_elevation.push(position.elevation_angle());
        angles.azimuth.push(position.azimuth());
    }

    Ok(angles)
}

fn refraction() -> anyhow::Result<RefractionCorrection> {
    RefractionCorrection::new(REFRACTION_PRESSURE_HPA, REFRACTION_TEMPERATURE_C)
        .map_err(|e| anyhow::anyhow!("invalid refraction conditions: {e:?}"))
}

/// Rescale apparent elevation near the horizon: unchanged from 7 degrees up, linearly mapped
/// onto (0, 7) between -7 and 7 degrees, and zero from -7 degrees down. Continuous at both limits.
pub fn corrected_elevation(apparent_elevation: f64) -> f64 {
    if apparent_elevation >= ELEVATION_RESCALE_LIMIT {
        apparent_elevation
    } else if apparent_elevation > -ELEVATION_RESCALE_LIMIT {
        0.5 * apparent_elevation + 0.5 * ELEVATION_RESCALE_LIMIT
    } else {
        0.
    }
}

pub(crate) fn sind(degrees: f64) -> f64 {
    degrees.to_radians().sin()
}

pub(crate) fn cosd(degrees: f64) -> f64 {
    degrees.to_radians().cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_time::{parse_local_timestamp, site_offset};
    use approx::assert_relative_eq;
    use rstest::*;

    #[fixture]
    fn tracker() -> SingleAxisTracker {
        SingleAxisTracker::horizontal_north_south(55., 0.35)
    }

    #[rstest]
    #[case(30., 30.)]
    #[case(7., 7.)]
    #[case(0., 3.5)]
    #[case(-6.9, 0.05)]
    #[case(-7., 0.)]
    #[case(-40., 0.)]
    fn test_corrected_elevation(#[case] apparent: f64, #[case] expected: f64) {
        assert_relative_eq!(corrected_elevation(apparent), expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(7.)]
    #[case(-7.)]
    fn test_corrected_elevation_is_continuous_at_limits(#[case] limit: f64) {
        let below = corrected_elevation(limit - 1e-9);
        let above = corrected_elevation(limit + 1e-9);
        assert!((above - below).abs() < 1e-8);
    }

    #[rstest]
    fn test_tracker_is_flat_with_sun_at_zenith(tracker: SingleAxisTracker) {
        let orientation = tracker.orientation(&[0.], &[180.]);
        assert_relative_eq!(orientation.tracker_theta[0], 0., epsilon = 1e-9);
        assert_relative_eq!(orientation.aoi[0], 0., epsilon = 1e-6);
        assert_relative_eq!(orientation.surface_tilt[0], 0., epsilon = 1e-9);
        assert_relative_eq!(orientation.surface_azimuth[0], 90.);
    }

    #[rstest]
    fn test_tracker_follows_morning_sun_without_backtracking() {
        let tracker = SingleAxisTracker {
            backtrack: false,
            ..SingleAxisTracker::horizontal_north_south(60., 0.35)
        };
        // sun due east, 40 degrees up: the panel tilts 50 degrees towards east
        let orientation = tracker.orientation(&[50.], &[90.]);
        assert_relative_eq!(orientation.tracker_theta[0], 50., epsilon = 1e-9);
        assert_relative_eq!(orientation.aoi[0], 0., epsilon = 1e-6);
        assert_relative_eq!(orientation.surface_azimuth[0], 90., epsilon = 1e-9);
    }

    #[rstest]
    fn test_backtracking_reduces_rotation_before_max_angle_limit(tracker: SingleAxisTracker) {
        // sun due east, 10 degrees up: the ideal angle of 80 would shade the next row
        let orientation = tracker.orientation(&[80.], &[90.]);
        let theta = orientation.tracker_theta[0];
        let expected = 80. - (cosd(80.) / 0.35).acos().to_degrees();
        assert_relative_eq!(theta, expected, epsilon = 1e-9);
        assert!(theta.abs() < 55.);
    }

    #[rstest]
    fn test_rotation_is_limited_to_max_angle() {
        let tracker = SingleAxisTracker {
            backtrack: false,
            ..SingleAxisTracker::horizontal_north_south(45., 0.35)
        };
        let orientation = tracker.orientation(&[70.], &[270.]);
        assert_relative_eq!(orientation.tracker_theta[0], -45.);
    }

    #[rstest]
    fn test_solar_angles_near_noon_in_the_tropics() {
        let offset = site_offset(3).unwrap();
        let noon = parse_local_timestamp("21/03/2021 11:30", offset).unwrap();
        let angles = solar_angles(&[noon], -5.52, -36.35, 520.).unwrap();
        assert!(angles.apparent_elevation[0] > 80.);
        assert!(angles.azimuth[0] >= 0. && angles.azimuth[0] < 360.);
    }
}
