mod test_pipeline {
    use crate::core::columns::*;
    use crate::core::energy_supply::single_diode::tests::module;
    use crate::core::irradiance::transpose_to_plane;
    use crate::core::shading::apply_near_shading;
    use crate::core::solar_geometry::SingleAxisTracker;
    use crate::corpus::Corpus;
    use crate::input::tests::plant_configuration;
    use crate::input::PlantConfiguration;
    use crate::parameter_files::inverter_file::tests::ond_text;
    use crate::parameter_files::inverter_file::InverterParameters;
    use crate::parameter_files::module_file::ModuleParameters;
    use crate::parameter_files::outline::Outline;
    use crate::time_series::tests::hourly_table;
    use crate::time_series::TimeSeriesTable;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::f64::consts::PI;
    use std::path::Path;

    #[fixture]
    fn inverter() -> InverterParameters {
        InverterParameters::from_outline(&Outline::parse(&ond_text("Tri")).unwrap(), Path::new("EX.OND"))
            .unwrap()
    }

    /// A clear-sky-like day: irradiance on a half sine between 07:00 and 17:00 local time.
    fn sunny_days(first: &str, days: usize) -> TimeSeriesTable {
        let hours = 24 * days;
        let ghi: Vec<f64> = (0..hours)
            .map(|h| {
                let hour = (h % 24) as f64;
                if (7. ..17.).contains(&hour) {
                    1000. * (PI * (hour - 6.) / 12.).sin()
                } else {
                    0.
                }
            })
            .collect();
        let mut table = hourly_table(first, hours);
        table.insert(DIFF_HOR, ghi.iter().map(|g| 0.15 * g).collect());
        table.insert(GLOB_HOR, ghi);
        table.insert(T_AMB, vec![30.; hours]);
        table.insert(WIND_VEL, vec![2.; hours]);
        table
    }

    fn run(
        site: &PlantConfiguration,
        module: &ModuleParameters,
        inverter: &InverterParameters,
        weather: TimeSeriesTable,
    ) -> crate::corpus::RunResults {
        Corpus::from_inputs(site, module, inverter)
            .unwrap()
            .run(weather)
            .unwrap()
    }

    #[rstest]
    fn test_polar_night_delivers_nothing(module: ModuleParameters, inverter: InverterParameters) {
        // the sun stays more than 7 degrees below the horizon all day
        let mut site = plant_configuration("Longyearbyen");
        site.latitude = 78.2;
        site.longitude = 15.6;
        site.fuso = -1;
        let mut weather = hourly_table("21/12/2021 00:00", 24);
        weather.insert(GLOB_HOR, vec![0.; 24]);
        weather.insert(DIFF_HOR, vec![0.; 24]);
        weather.insert(T_AMB, vec![-12.; 24]);
        weather.insert(WIND_VEL, vec![4.; 24]);

        let results = run(&site, &module, &inverter, weather);
        let table = &results.table;

        assert_eq!(results.clipped_timesteps, 0);
        assert!(table.column(H_SOL).unwrap().iter().all(|&h| h == 0.));
        for column in [GLOB_EFF, OHM_LOSS, MIS_LOSS, U_ARRAY, I_ARRAY, E_OUT_INV, E_GRID] {
            assert_eq!(table.column(column).unwrap(), &[0.; 24], "{column}");
        }
    }

    #[rstest]
    fn test_sun_at_zenith_casts_no_row_shadows() {
        let gcr = 0.35;
        let tracker = SingleAxisTracker::horizontal_north_south(55., gcr);
        let orientation = tracker.orientation(&[0.], &[0.]);

        let mut table = hourly_table("15/03/2021 12:00", 1);
        table.insert(GLOB_HOR, vec![1000.]);
        table.insert(DIFF_HOR, vec![100.]);
        table.insert(H_SOL, vec![90.]);
        table.insert(AZ_SOL, vec![0.]);
        table.insert(PHI_ANG, orientation.tracker_theta.clone());
        transpose_to_plane(&mut table, &orientation, &[0.], 0.2).unwrap();
        apply_near_shading(&mut table, &orientation, gcr).unwrap();

        for column in [SHD_B_LSS, SHD_D_LSS, SHD_A_LSS, SHD_LOSS] {
            assert_relative_eq!(table.column(column).unwrap()[0], 0., epsilon = 1e-9);
        }
        assert_relative_eq!(
            table.column(GLOB_SHD).unwrap()[0],
            table.column(GLOB_INC).unwrap()[0],
            epsilon = 1e-9
        );
        assert_relative_eq!(table.column(GLOB_INC).unwrap()[0], 1000., max_relative = 1e-6);
    }

    #[rstest]
    fn test_energies_are_never_negative(module: ModuleParameters, inverter: InverterParameters) {
        let results = run(
            &plant_configuration("Safira 1"),
            &module,
            &inverter,
            sunny_days("01/01/2021 00:00", 2),
        );
        let table = &results.table;

        for column in [GLOB_EFF, E_ARR_MPP, E_ARRAY, E_OUT_INV, E_GRID] {
            let values = table.column(column).unwrap();
            assert!(values.iter().all(|&v| v >= 0.), "{column} has a negative value");
        }
        assert!(table.column(E_GRID).unwrap().iter().any(|&e| e > 0.));
    }

    #[rstest]
    fn test_zero_irradiance_has_no_array_operating_point(
        module: ModuleParameters,
        inverter: InverterParameters,
    ) {
        let results = run(
            &plant_configuration("Safira 1"),
            &module,
            &inverter,
            sunny_days("01/01/2021 00:00", 1),
        );
        let table = &results.table;
        let glob_eff = table.column(GLOB_EFF).unwrap();

        let dark_rows: Vec<usize> = (0..table.len()).filter(|&i| glob_eff[i] == 0.).collect();
        assert!(!dark_rows.is_empty());
        for column in [OHM_LOSS, MIS_LOSS, U_ARRAY, I_ARRAY] {
            let values = table.column(column).unwrap();
            for &i in &dark_rows {
                assert_eq!(values[i], 0., "{column} at row {i}");
            }
        }
    }

    #[rstest]
    fn test_midday_output_is_clipped_at_inverter_limit(
        module: ModuleParameters,
        inverter: InverterParameters,
    ) {
        // about 5 MWp of modules on a single 2.5 MW inverter
        let results = run(
            &plant_configuration("Safira 1"),
            &module,
            &inverter,
            sunny_days("01/01/2021 00:00", 1),
        );
        let table = &results.table;

        assert!(results.clipped_timesteps > 0);
        let e_arr_mpp = table.column(E_ARR_MPP).unwrap();
        let e_array = table.column(E_ARRAY).unwrap();
        let u_array = table.column(U_ARRAY).unwrap();
        let i_array = table.column(I_ARRAY).unwrap();
        for i in 0..table.len() {
            assert!(e_array[i] <= e_arr_mpp[i]);
            assert!(table.column(E_OUT_INV).unwrap()[i] <= 2_750_000. * (1. + 1e-9));
            if u_array[i] > 0. {
                assert_relative_eq!(u_array[i] * i_array[i], e_array[i], max_relative = 1e-9);
            }
        }
    }
}
