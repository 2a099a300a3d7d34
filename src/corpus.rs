use crate::core::columns::{ANG_INC, AZ_SOL, H_SOL, PHI_ANG, WORKING_COLUMNS};
use crate::core::energy_supply::ac_losses::AcLosses;
use crate::core::energy_supply::clipping::{apply_clipping, ArrayWiring};
use crate::core::energy_supply::inverter::InverterBank;
use crate::core::energy_supply::pv::PhotovoltaicArray;
use crate::core::irradiance::transpose_to_plane;
use crate::core::optical_losses::apply_optical_losses;
use crate::core::shading::apply_near_shading;
use crate::core::solar_geometry::{corrected_elevation, solar_angles, SingleAxisTracker};
use crate::input::PlantConfiguration;
use crate::parameter_files::inverter_file::InverterParameters;
use crate::parameter_files::module_file::{IamCurve, ModuleParameters};
use crate::time_series::TimeSeriesTable;
use tracing::{debug, info};

/// The simulated table for one site, with the working columns removed.
#[derive(Clone, Debug, PartialEq)]
pub struct RunResults {
    pub table: TimeSeriesTable,
    /// timesteps at which the array output was limited by the inverters
    pub clipped_timesteps: usize,
}

/// The plant models of one site, built once and then run over a weather table.
#[derive(Debug)]
pub struct Corpus {
    site: PlantConfiguration,
    tracker: SingleAxisTracker,
    iam_curve: IamCurve,
    array: PhotovoltaicArray,
    inverters: InverterBank,
    wiring: ArrayWiring,
    ac_losses: AcLosses,
}

impl Corpus {
    pub fn from_inputs(
        site: &PlantConfiguration,
        module: &ModuleParameters,
        inverter: &InverterParameters,
    ) -> anyhow::Result<Self> {
        site.check()?;

        Ok(Self {
            site: site.clone(),
            tracker: SingleAxisTracker::horizontal_north_south(site.max_angle, site.gcr()),
            iam_curve: module.iam_curve.clone(),
            array: PhotovoltaicArray::new(module, site)?,
            inverters: InverterBank::new(inverter, site),
            wiring: ArrayWiring {
                modules_in_series: site.modules_in_series as f64,
                modules_in_parallel: site.modules_in_parallel as f64,
                mismatch_loss: site.mismatch_loss,
            },
            ac_losses: AcLosses::new(module, inverter, site),
        })
    }

    pub fn site(&self) -> &PlantConfiguration {
        &self.site
    }

    /// Run every stage of the pipeline over `weather`, which must hold GlobHor, DiffHor,
    /// T_Amb and WindVel. Each stage appends its columns to the table.
    pub fn run(&self, weather: TimeSeriesTable) -> anyhow::Result<RunResults> {
        let site = &self.site.site_name;
        let mut table = weather;
        info!(site, timesteps = table.len(), "Starting simulation");

        let angles = solar_angles(
            table.time().centres(),
            self.site.latitude,
            self.site.longitude,
            self.site.altitude,
        )?;
        let elevation: Vec<f64> = angles
            .apparent_elevation
            .iter()
            .map(|&e| corrected_elevation(e))
            .collect();
        let zenith: Vec<f64> = elevation.iter().map(|e| 90. - e).collect();
        let orientation = self.tracker.orientation(&zenith, &angles.azimuth);

        table.insert(H_SOL, elevation);
        table.insert(AZ_SOL, angles.azimuth);
        table.insert(PHI_ANG, orientation.tracker_theta.clone());
        table.insert(ANG_INC, orientation.aoi.clone());
        debug!(site, "Solar geometry complete");

        transpose_to_plane(&mut table, &orientation, &zenith, self.site.albedo)?;
        apply_near_shading(&mut table, &orientation, self.site.gcr())?;
        apply_optical_losses(&mut table, &self.iam_curve, self.site.soiling_loss)?;
        debug!(site, "Plane-of-array irradiance complete");

        self.array.apply(&mut table)?;
        self.inverters.apply(&mut table)?;
        let clipped_timesteps = apply_clipping(&mut table, &self.wiring)?;
        self.ac_losses.apply(&mut table)?;

        for column in WORKING_COLUMNS {
            table.remove(column);
        }

        info!(site, clipped_timesteps, "Simulation complete");

        Ok(RunResults {
            table,
            clipped_timesteps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::columns::{
        DIFF_HOR, E_GRID, GLOB_EFF, GLOB_HOR, GLOB_INC, I_ARRAY, T_AMB, U_ARRAY, WIND_VEL,
    };
    use crate::core::energy_supply::single_diode::tests::module;
    use crate::input::tests::plant_configuration;
    use crate::parameter_files::inverter_file::tests::ond_text;
    use crate::parameter_files::outline::Outline;
    use crate::time_series::tests::hourly_table;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::path::Path;

    #[fixture]
    fn corpus(module: ModuleParameters) -> Corpus {
        let inverter =
            InverterParameters::from_outline(&Outline::parse(&ond_text("Tri")).unwrap(), Path::new("EX.OND"))
                .unwrap();
        Corpus::from_inputs(&plant_configuration("Safira 1"), &module, &inverter).unwrap()
    }

    fn weather(ghi: [f64; 24], dhi: [f64; 24]) -> TimeSeriesTable {
        let mut table = hourly_table("15/03/2021 00:00", 24);
        table.insert(GLOB_HOR, ghi.to_vec());
        table.insert(DIFF_HOR, dhi.to_vec());
        table.insert(T_AMB, vec![26.; 24]);
        table.insert(WIND_VEL, vec![2.; 24]);
        table
    }

    #[rstest]
    fn test_working_columns_are_not_delivered(corpus: Corpus) {
        let results = corpus.run(weather([0.; 24], [0.; 24])).unwrap();
        for column in WORKING_COLUMNS {
            assert!(!results.table.contains(column), "{column} was delivered");
        }
        assert!(results.table.contains(E_GRID));
    }

    #[rstest]
    fn test_column_order_follows_pipeline(corpus: Corpus) {
        let results = corpus.run(weather([0.; 24], [0.; 24])).unwrap();
        let names: Vec<&str> = results.table.column_names().collect();
        assert_eq!(&names[..6], &[GLOB_HOR, DIFF_HOR, T_AMB, WIND_VEL, H_SOL, AZ_SOL]);
        assert_eq!(names.last(), Some(&E_GRID));
    }

    #[rstest]
    fn test_daytime_produces_energy(corpus: Corpus) {
        let mut ghi = [0.; 24];
        let mut dhi = [0.; 24];
        // local daylight hours at the site are roughly 06:00 to 18:00
        for hour in 8..16 {
            ghi[hour] = 800.;
            dhi[hour] = 120.;
        }
        let results = corpus.run(weather(ghi, dhi)).unwrap();
        let table = &results.table;

        let e_grid = table.column(E_GRID).unwrap();
        assert!(e_grid[12] > 0.);
        assert!(table.column(GLOB_INC).unwrap()[12] > 0.);
        assert!(table.column(GLOB_EFF).unwrap()[12] <= table.column(GLOB_INC).unwrap()[12]);
        assert_eq!(e_grid[2], 0.);
        assert_eq!(table.column(U_ARRAY).unwrap()[2], 0.);
        assert_eq!(table.column(I_ARRAY).unwrap()[2], 0.);
    }
}
