use crate::compare_floats::max_of_2;
use crate::core::columns::{E_AC_OHM_L, E_GRID, E_MV_OHM_L, E_MV_TRF_L, E_OUT_INV};
use crate::input::PlantConfiguration;
use crate::parameter_files::inverter_file::InverterParameters;
use crate::parameter_files::module_file::ModuleParameters;
use crate::time_series::TimeSeriesTable;
use itertools::izip;

/// Losses between the inverter output and the grid connection: AC wiring, the medium
/// voltage transformer and the medium voltage line.
#[derive(Clone, Debug, PartialEq)]
pub struct AcLosses {
    phase_count: f64,
    /// line-to-line output voltage, in V
    output_voltage: f64,
    /// AC output at standard test conditions, in W
    p_ac_stc: f64,
    /// equivalent resistances, in ohm
    r_ac: f64,
    r_transformer: f64,
    r_mv_line: f64,
    /// transformer no-load loss, in W
    iron_loss: f64,
}

impl AcLosses {
    /// Arguments:
    /// * `module` - module parameters, for the plant's nominal DC power
    /// * `inverter` - inverter parameters, for peak efficiency, output voltage and phases
    /// * `site` - plant configuration with the loss fractions at standard test conditions
    ///
    /// Each resistance is calibrated so that at the plant's STC output its loss is the
    /// configured fraction of that output.
    pub fn new(module: &ModuleParameters, inverter: &InverterParameters, site: &PlantConfiguration) -> Self {
        let p_ac_stc = module.nominal_power
            * site.modules_in_series as f64
            * site.modules_in_parallel as f64
            * (inverter.effic_max / 100.);
        let phase_count = inverter.phases.phase_count();
        let output_voltage = inverter.v_out_conv * phase_count.sqrt();
        let i_ac_stc = p_ac_stc / output_voltage;

        Self {
            phase_count,
            output_voltage,
            p_ac_stc,
            r_ac: site.stc_ohm_loss_ac * output_voltage / i_ac_stc,
            r_transformer: p_ac_stc * site.mv_copper_loss / i_ac_stc.powi(2),
            r_mv_line: p_ac_stc * site.mv_loss_stc / i_ac_stc.powi(2),
            iron_loss: p_ac_stc * site.mv_iron_loss,
        }
    }

    pub fn p_ac_stc(&self) -> f64 {
        self.p_ac_stc
    }

    fn output_current(&self, e_out_inv: f64) -> f64 {
        e_out_inv / self.output_voltage
    }

    pub fn ac_ohmic_loss(&self, e_out_inv: f64) -> f64 {
        self.phase_count.sqrt() * self.output_current(e_out_inv).powi(2) * self.r_ac / 3.
    }

    /// Copper loss under load plus the constant iron loss
    pub fn transformer_loss(&self, e_out_inv: f64) -> f64 {
        self.output_current(e_out_inv).powi(2) * self.r_transformer + self.iron_loss
    }

    pub fn mv_ohmic_loss(&self, e_out_inv: f64) -> f64 {
        self.output_current(e_out_inv).powi(2) * self.r_mv_line
    }

    /// Adds EACOhmL, EMVTrfL, EMVOhmL and E_Grid, the energy delivered to the grid, which
    /// is never negative.
    pub fn apply(&self, table: &mut TimeSeriesTable) -> anyhow::Result<()> {
        let e_out_inv = table.column(E_OUT_INV)?.to_vec();

        let ac_ohmic: Vec<f64> = e_out_inv.iter().map(|&e| self.ac_ohmic_loss(e)).collect();
        let transformer: Vec<f64> = e_out_inv.iter().map(|&e| self.transformer_loss(e)).collect();
        let mv_ohmic: Vec<f64> = e_out_inv.iter().map(|&e| self.mv_ohmic_loss(e)).collect();
        let e_grid = izip!(&e_out_inv, &ac_ohmic, &transformer, &mv_ohmic)
            .map(|(e, ac, trf, mv)| max_of_2(e - ac - trf - mv, 0.))
            .collect();

        table.insert(E_AC_OHM_L, ac_ohmic);
        table.insert(E_MV_TRF_L, transformer);
        table.insert(E_MV_OHM_L, mv_ohmic);
        table.insert(E_GRID, e_grid);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::energy_supply::single_diode::tests::module;
    use crate::input::tests::plant_configuration;
    use crate::parameter_files::inverter_file::tests::ond_text;
    use crate::parameter_files::outline::Outline;
    use crate::time_series::tests::hourly_table;
    use approx::assert_relative_eq;
    use rstest::*;
    use std::path::Path;

    #[fixture]
    fn losses(module: ModuleParameters) -> AcLosses {
        let inverter =
            InverterParameters::from_outline(&Outline::parse(&ond_text("Tri")).unwrap(), Path::new("EX.OND"))
                .unwrap();
        AcLosses::new(&module, &inverter, &plant_configuration("Safira 1"))
    }

    #[rstest]
    fn test_losses_at_stc_output_match_configured_fractions(losses: AcLosses) {
        let p = losses.p_ac_stc();
        // STC_OHM_LOSS_AC = 0.01, MV_COPPER_LOSS = 0.01, MV_IRON_LOSS = 0.001, MV_LOSS_STC = 0.002
        assert_relative_eq!(losses.ac_ohmic_loss(p), 3f64.sqrt() * 0.01 * p / 3., max_relative = 1e-12);
        assert_relative_eq!(losses.transformer_loss(p), 0.011 * p, max_relative = 1e-12);
        assert_relative_eq!(losses.mv_ohmic_loss(p), 0.002 * p, max_relative = 1e-12);
    }

    #[rstest]
    fn test_grid_energy_is_never_negative(losses: AcLosses) {
        let mut table = hourly_table("01/01/2021 02:00", 2);
        table.insert(E_OUT_INV, vec![0., 2_000_000.]);
        losses.apply(&mut table).unwrap();

        let e_grid = table.column(E_GRID).unwrap();
        assert_eq!(e_grid[0], 0.);
        // the iron loss is drawn even without output
        assert!(table.column(E_MV_TRF_L).unwrap()[0] > 0.);
        assert!(e_grid[1] > 0. && e_grid[1] < 2_000_000.);
    }
}
