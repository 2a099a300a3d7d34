use crate::core::solvers::{golden_section_maximise, lambert_w0_of_exp};
use crate::core::units::{thermal_voltage, BOLTZMANN, ELEMENTARY_CHARGE, KELVIN_OFFSET};
use crate::parameter_files::module_file::ModuleParameters;

// Exponent of the irradiance dependence of the shunt resistance
const R_SH_EXP: f64 = 5.5;

// Search window for the maximum power point, as a multiple of the open-circuit voltage
const MPP_SEARCH_UPPER_FACTOR: f64 = 1.14;
const MPP_VOLTAGE_TOLERANCE: f64 = 1e-8;
const MPP_MAX_ITERATIONS: u64 = 200;

/// The five parameters of the single-diode equation
/// I = IL - I0 * (exp((V + I * Rs) / nNsVth) - 1) - (V + I * Rs) / Rsh
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SingleDiodeParameters {
    /// light-generated current IL, in A
    pub photocurrent: f64,
    /// diode reverse saturation current I0, in A
    pub saturation_current: f64,
    /// Rs, in ohm
    pub resistance_series: f64,
    /// Rsh, in ohm
    pub resistance_shunt: f64,
    /// product of ideality factor, cells in series and thermal voltage, in V
    pub n_ns_vth: f64,
}

/// A point on an I-V curve together with the curve's open-circuit voltage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OperatingPoint {
    pub v_oc: f64,
    pub i_mp: f64,
    pub v_mp: f64,
    pub p_mp: f64,
}

impl OperatingPoint {
    /// Scale a module's operating point to an array of identical modules.
    pub fn scaled(&self, modules_in_series: f64, modules_in_parallel: f64) -> Self {
        Self {
            v_oc: self.v_oc * modules_in_series,
            i_mp: self.i_mp * modules_in_parallel,
            v_mp: self.v_mp * modules_in_series,
            p_mp: self.p_mp * modules_in_series * modules_in_parallel,
        }
    }
}

impl SingleDiodeParameters {
    /// Parameters at the module's reference conditions, with the saturation current and
    /// photocurrent solved from the short-circuit and open-circuit points of the datasheet.
    pub fn at_reference(module: &ModuleParameters) -> Self {
        let n_ns_vth = module.gamma_ref * module.cells_in_series * thermal_voltage(module.temp_ref);

        let saturation_current = (module.i_sc_ref
            - (module.v_oc_ref - module.i_sc_ref * module.r_s) / module.r_sh_ref)
            * (-module.v_oc_ref / n_ns_vth).exp();
        let photocurrent = saturation_current * (module.v_oc_ref / n_ns_vth).exp()
            + module.v_oc_ref / module.r_sh_ref;

        Self {
            photocurrent,
            saturation_current,
            resistance_series: module.r_s,
            resistance_shunt: module.r_sh_ref,
            n_ns_vth,
        }
    }

    /// PVsyst temperature and irradiance dependence of the single-diode parameters.
    ///
    /// Arguments:
    /// * `module` - datasheet parameters
    /// * `reference` - parameters at reference conditions, from `at_reference`
    /// * `effective_irradiance` - irradiance converted to photocurrent, in W/m2
    /// * `temp_cell` - cell temperature, in degC
    pub fn at_conditions(
        module: &ModuleParameters,
        reference: &SingleDiodeParameters,
        effective_irradiance: f64,
        temp_cell: f64,
    ) -> Self {
        let temp_ref_k = module.temp_ref;
        let temp_cell_k = temp_cell + KELVIN_OFFSET;

        let gamma = module.gamma_ref + module.mu_gamma * (temp_cell_k - temp_ref_k);
        let n_ns_vth = gamma * BOLTZMANN / ELEMENTARY_CHARGE * module.cells_in_series * temp_cell_k;

        let photocurrent = effective_irradiance / module.irrad_ref
            * (reference.photocurrent + module.alpha_sc * (temp_cell_k - temp_ref_k));

        let saturation_current = reference.saturation_current
            * (temp_cell_k / temp_ref_k).powi(3)
            * ((ELEMENTARY_CHARGE * module.eg_ref) / (BOLTZMANN * gamma)
                * (1. / temp_ref_k - 1. / temp_cell_k))
                .exp();

        let decay = (-R_SH_EXP).exp();
        let r_sh_base = ((module.r_sh_ref - module.r_sh_0 * decay) / (1. - decay)).max(0.);
        let resistance_shunt = r_sh_base
            + (module.r_sh_0 - r_sh_base) * (-R_SH_EXP * effective_irradiance / module.irrad_ref).exp();

        Self {
            photocurrent,
            saturation_current,
            resistance_series: module.r_s,
            resistance_shunt,
            n_ns_vth,
        }
    }

    /// Current at a given voltage, from the explicit Lambert W solution (Jain and Kapoor, 2004).
    pub fn i_from_v(&self, voltage: f64) -> f64 {
        let Self {
            photocurrent,
            saturation_current,
            resistance_series,
            resistance_shunt,
            n_ns_vth,
        } = *self;
        let g_sh = 1. / resistance_shunt;

        if resistance_series == 0. {
            return photocurrent - saturation_current * (voltage / n_ns_vth).exp_m1() - g_sh * voltage;
        }

        let scaled_vth = n_ns_vth * (resistance_series * g_sh + 1.);
        let log_arg = (resistance_series * saturation_current / scaled_vth).ln()
            + (resistance_series * (photocurrent + saturation_current) + voltage) / scaled_vth;
        let lambert_term = lambert_w0_of_exp(log_arg);

        (photocurrent + saturation_current - voltage * g_sh) / (resistance_series * g_sh + 1.)
            - (n_ns_vth / resistance_series) * lambert_term
    }

    /// Voltage at a given current, from the explicit Lambert W solution.
    pub fn v_from_i(&self, current: f64) -> f64 {
        let Self {
            photocurrent,
            saturation_current,
            resistance_series,
            resistance_shunt,
            n_ns_vth,
        } = *self;
        let g_sh = 1. / resistance_shunt;

        let log_arg = saturation_current.ln() - g_sh.ln() - n_ns_vth.ln()
            + (-current + photocurrent + saturation_current) / (g_sh * n_ns_vth);
        let lambert_term = lambert_w0_of_exp(log_arg);

        (photocurrent + saturation_current - current) / g_sh
            - current * resistance_series
            - n_ns_vth * lambert_term
    }

    /// Maximum power point, located by golden-section search of P(V) between 0 and
    /// 1.14 times the open-circuit voltage.
    pub fn max_power_point(&self) -> anyhow::Result<OperatingPoint> {
        let mut v_oc = self.v_from_i(0.);
        if v_oc < 0. && v_oc > -1e-12 {
            v_oc = 0.;
        }

        let (v_mp, p_mp) = golden_section_maximise(
            |v| v * self.i_from_v(v),
            0.,
            v_oc * MPP_SEARCH_UPPER_FACTOR,
            MPP_VOLTAGE_TOLERANCE,
            MPP_MAX_ITERATIONS,
        )?;

        Ok(OperatingPoint {
            v_oc,
            i_mp: self.i_from_v(v_mp),
            v_mp,
            p_mp,
        })
    }
}

/// Cell temperature by the PVsyst steady-state heat balance, in degC.
///
/// Arguments:
/// * `poa_global` - irradiance reaching the cells, in W/m2
/// * `temp_air` - ambient temperature, in degC
/// * `wind_speed` - in m/s
/// * `u_c`, `u_v` - constant and wind-dependent heat loss coefficients
/// * `module_efficiency` - electrical efficiency at standard conditions
/// * `alpha_absorption` - fraction of the irradiance absorbed
pub fn pvsyst_cell_temperature(
    poa_global: f64,
    temp_air: f64,
    wind_speed: f64,
    u_c: f64,
    u_v: f64,
    module_efficiency: f64,
    alpha_absorption: f64,
) -> f64 {
    let total_loss_factor = u_c + u_v * wind_speed;
    let heat_input = poa_global * alpha_absorption * (1. - module_efficiency);
    temp_air + heat_input / total_loss_factor
}
