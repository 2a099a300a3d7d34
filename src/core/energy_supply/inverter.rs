use crate::compare_floats::{clamp_or, max_of_2};
use crate::core::columns::{EFF_INVERTER, E_ARRAY, E_ARR_MPP, E_OUT_INV, GLOB_EFF, P_MAX_IN, T_AMB};
use crate::core::units::WATTS_PER_KILOWATT;
use crate::input::PlantConfiguration;
use crate::parameter_files::inverter_file::InverterParameters;
use crate::time_series::TimeSeriesTable;

// Reference efficiency of the PVWatts inverter model
const ETA_INV_REF: f64 = 0.9637;

/// An object to represent the plant's inverters, all of one model and sharing the array's
/// output equally.
#[derive(Clone, Debug)]
pub struct InverterBank {
    parameters: InverterParameters,
    inverters: f64,
    /// combined maximum AC output, in W
    max_output_power: f64,
    /// slope and intercept of the thermal derating line, in kW/degC and kW
    derating_slope: f64,
    derating_intercept: f64,
    ghi_min_threshold: f64,
}

impl InverterBank {
    /// Construct an InverterBank
    ///
    /// Arguments:
    /// * `parameters` - electrical parameters of one inverter
    /// * `site` - plant configuration supplying the inverter count, an optional override of
    ///            the maximum AC power (PMAX_OUT, kW, 0 to use the inverter's) and the
    ///            irradiance below which no thermal derating is applied
    pub fn new(parameters: &InverterParameters, site: &PlantConfiguration) -> Self {
        let inverters = site.inverters as f64;
        let p_max_out = if site.pmax_out == 0. {
            parameters.p_max_out
        } else {
            site.pmax_out
        };

        // line through (TPMax, PMaxOUT) and (TPNom, PNomConv)
        let derating_slope =
            (parameters.p_max_out - parameters.p_nom_conv) / (parameters.tp_max - parameters.tp_nom);
        let derating_intercept = parameters.p_max_out - parameters.tp_max * derating_slope;

        Self {
            parameters: parameters.clone(),
            inverters,
            max_output_power: p_max_out * WATTS_PER_KILOWATT as f64 * inverters,
            derating_slope,
            derating_intercept,
            ghi_min_threshold: site.ghi_min_threshold,
        }
    }

    pub fn parameters(&self) -> &InverterParameters {
        &self.parameters
    }

    /// Conversion efficiency of each inverter when the bank receives `array_power` (W)
    pub fn efficiency(&self, array_power: f64) -> f64 {
        self.parameters
            .curves
            .v_nom
            .efficiency_at(array_power / self.inverters)
    }

    /// Maximum DC power the bank accepts, in W.
    ///
    /// Arguments:
    /// * `efficiency` - conversion efficiency at the current input
    /// * `temp_ambient` - ambient temperature, in degC
    /// * `glob_eff` - effective plane-of-array irradiance, in W/m2
    ///
    /// Above TPMax, and only while GlobEff is at least the site's threshold, the available
    /// AC power follows the derating line instead of the rated maximum.
    pub fn max_input_power(&self, efficiency: f64, temp_ambient: f64, glob_eff: f64) -> f64 {
        if temp_ambient <= self.parameters.tp_max || glob_eff < self.ghi_min_threshold {
            self.max_output_power / efficiency
        } else {
            (self.derating_slope * temp_ambient + self.derating_intercept) / efficiency
                * WATTS_PER_KILOWATT as f64
                * self.inverters
        }
    }

    /// Apply the inverter model for every timestep.
    ///
    /// Adds eff_inverter and PMaxIN (working columns), EOutInv and EArray, the array output
    /// after clipping at the inverters' input limit.
    pub fn apply(&self, table: &mut TimeSeriesTable) -> anyhow::Result<()> {
        let e_arr_mpp = table.column(E_ARR_MPP)?;
        let t_amb = table.column(T_AMB)?;
        let glob_eff = table.column(GLOB_EFF)?;

        let efficiency: Vec<f64> = e_arr_mpp.iter().map(|&p| self.efficiency(p)).collect();
        let p_max_in: Vec<f64> = (0..table.len())
            .map(|i| self.max_input_power(efficiency[i], t_amb[i], glob_eff[i]))
            .collect();
        let e_out_inv: Vec<f64> = (0..table.len())
            .map(|i| pvwatts_ac(e_arr_mpp[i], p_max_in[i], efficiency[i]))
            .collect();
        let e_array: Vec<f64> = (0..table.len())
            .map(|i| {
                if p_max_in[i] > e_arr_mpp[i] {
                    e_arr_mpp[i]
                } else {
                    p_max_in[i]
                }
            })
            .collect();

        table.insert(EFF_INVERTER, efficiency);
        table.insert(P_MAX_IN, p_max_in);
        table.insert(E_OUT_INV, e_out_inv);
        table.insert(E_ARRAY, e_array);

        Ok(())
    }
}

/// AC output of an inverter by the PVWatts model, in W.
///
/// Arguments:
/// * `pdc` - DC input power, in W
/// * `pdc0` - DC input limit, in W
/// * `eta_inv_nom` - nominal efficiency
///
/// The output is bounded by 0 and `eta_inv_nom * pdc0`; wherever the model is undefined
/// (no efficiency, an unbounded input limit) it is 0.
pub fn pvwatts_ac(pdc: f64, pdc0: f64, eta_inv_nom: f64) -> f64 {
    if eta_inv_nom <= 0. || !pdc0.is_finite() || pdc0 <= 0. {
        return 0.;
    }
    let pac0 = eta_inv_nom * pdc0;
    let zeta = pdc / pdc0;
    let eta = if pdc == 0. {
        0.
    } else {
        eta_inv_nom / ETA_INV_REF * (-0.0162 * zeta - 0.0059 / zeta + 0.9858)
    };
    clamp_or(eta * pdc, 0., max_of_2(pac0, 0.), 0.)
}
