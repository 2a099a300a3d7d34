use crate::compare_floats::{finite_or_zero, max_of_2};
use crate::core::columns::{
    E_ARR_MPP, E_ARR_NOM, F_OHM_LOSS, GLOB_EFF, I_ARRAY, MIS_LOSS, N_NS_VTH, OHM_LOSS, PHOTOCURRENT,
    RESISTANCE_SERIES, RESISTANCE_SHUNT, SATURATION_CURRENT, T_AMB, T_ARRAY, U_ARRAY, VOC_ARRAY,
    WIND_VEL,
};
use crate::core::energy_supply::single_diode::{
    pvsyst_cell_temperature, OperatingPoint, SingleDiodeParameters,
};
use crate::input::PlantConfiguration;
use crate::parameter_files::module_file::ModuleParameters;
use crate::time_series::TimeSeriesTable;
use rayon::prelude::*;
use tracing::debug;

// Fraction of plane-of-array irradiance absorbed as heat by the modules
const ALPHA_ABSORPTION: f64 = 0.9;

/// An array of identical modules wired in `modules_in_series` x `modules_in_parallel`.
#[derive(Clone, Debug)]
pub struct PhotovoltaicArray {
    module: ModuleParameters,
    reference: SingleDiodeParameters,
    modules_in_series: f64,
    modules_in_parallel: f64,
    stc_efficiency: f64,
    /// equivalent DC wiring resistance, in ohm
    r_equiv_dc: f64,
    lid_loss: f64,
    quality_loss: f64,
    mismatch_loss: f64,
    u_c: f64,
    u_v: f64,
}

impl PhotovoltaicArray {
    /// Construct a PhotovoltaicArray
    ///
    /// Arguments:
    /// * `module` - single-diode parameters of the module
    /// * `site` - plant configuration supplying the wiring topology, thermal and loss coefficients
    ///
    /// The DC wiring resistance is calibrated so that at reference conditions the ohmic loss
    /// is the configured fraction STC_OHM_LOSS of the array's maximum power.
    pub fn new(module: &ModuleParameters, site: &PlantConfiguration) -> anyhow::Result<Self> {
        let reference = SingleDiodeParameters::at_reference(module);
        let modules_in_series = site.modules_in_series as f64;
        let modules_in_parallel = site.modules_in_parallel as f64;

        let stc_point = reference
            .max_power_point()?
            .scaled(modules_in_series, modules_in_parallel);
        let r_equiv_dc = site.stc_ohm_loss * stc_point.p_mp / stc_point.i_mp.powi(2);

        debug!(
            site = site.site_name,
            p_mp_stc = stc_point.p_mp,
            r_equiv_dc,
            "Calibrated DC wiring resistance"
        );

        Ok(Self {
            module: module.clone(),
            reference,
            modules_in_series,
            modules_in_parallel,
            stc_efficiency: module.nominal_power / (module.surface * module.irrad_ref),
            r_equiv_dc,
            lid_loss: site.lid_loss,
            quality_loss: site.quality_loss,
            mismatch_loss: site.mismatch_loss,
            u_c: site.u_c,
            u_v: site.u_v,
        })
    }

    /// Module efficiency at standard test conditions
    pub fn stc_efficiency(&self) -> f64 {
        self.stc_efficiency
    }

    pub fn r_equiv_dc(&self) -> f64 {
        self.r_equiv_dc
    }

    pub fn modules_in_series(&self) -> f64 {
        self.modules_in_series
    }

    pub fn modules_in_parallel(&self) -> f64 {
        self.modules_in_parallel
    }

    /// Nominal array output for a plane-of-array irradiance, at STC efficiency, in W
    fn nominal_energy(&self, glob_eff: f64) -> f64 {
        glob_eff * self.stc_efficiency * self.module.surface * self.modules_in_series * self.modules_in_parallel
    }

    /// Single-diode parameters of one module at the given irradiance and cell temperature.
    ///
    /// The irradiance is reduced by light-induced degradation and module quality losses
    /// before it is converted to photocurrent.
    pub fn diode_parameters(&self, glob_eff: f64, temp_cell: f64) -> SingleDiodeParameters {
        SingleDiodeParameters::at_conditions(
            &self.module,
            &self.reference,
            glob_eff * (1. - self.lid_loss - self.quality_loss),
            temp_cell,
        )
    }

    /// Unclipped operating point of the array at the given irradiance and cell temperature.
    pub fn max_power_point(&self, glob_eff: f64, temp_cell: f64) -> anyhow::Result<OperatingPoint> {
        Ok(self
            .diode_parameters(glob_eff, temp_cell)
            .max_power_point()?
            .scaled(self.modules_in_series, self.modules_in_parallel))
    }

    /// Compute the array's thermal and electrical behaviour for every timestep.
    ///
    /// Adds EArrNom, TArray, OhmLoss, FOhmLoss, MisLoss, EArrMPP, UArray, IArray and VocArray
    /// (the unclipped maximum power point) and the per-timestep single-diode parameters.
    /// Wherever GlobEff is zero there is no operating point and the losses and EArrMPP are zero.
    pub fn apply(&self, table: &mut TimeSeriesTable) -> anyhow::Result<()> {
        let glob_eff = table.column(GLOB_EFF)?;
        let t_amb = table.column(T_AMB)?;
        let wind_vel = table.column(WIND_VEL)?;

        let e_arr_nom: Vec<f64> = glob_eff.iter().map(|&g| self.nominal_energy(g)).collect();
        let t_array: Vec<f64> = (0..table.len())
            .map(|i| {
                pvsyst_cell_temperature(
                    glob_eff[i],
                    t_amb[i],
                    wind_vel[i],
                    self.u_c,
                    self.u_v,
                    self.stc_efficiency,
                    ALPHA_ABSORPTION,
                )
            })
            .collect();

        let diodes: Vec<SingleDiodeParameters> = glob_eff
            .iter()
            .zip(&t_array)
            .map(|(&g, &t)| self.diode_parameters(g, t))
            .collect();
        let points: Vec<OperatingPoint> = diodes
            .par_iter()
            .map(|diode| -> anyhow::Result<OperatingPoint> {
                Ok(diode
                    .max_power_point()?
                    .scaled(self.modules_in_series, self.modules_in_parallel))
            })
            .collect::<anyhow::Result<_>>()?;

        let mut ohm_loss = Vec::with_capacity(points.len());
        let mut f_ohm_loss = Vec::with_capacity(points.len());
        let mut mis_loss = Vec::with_capacity(points.len());
        let mut e_arr_mpp = Vec::with_capacity(points.len());
        for (point, &g) in points.iter().zip(glob_eff) {
            if g == 0. {
                ohm_loss.push(0.);
                f_ohm_loss.push(0.);
                mis_loss.push(0.);
                e_arr_mpp.push(0.);
                continue;
            }
            let ohm = self.r_equiv_dc * point.i_mp.powi(2);
            let mismatch = point.p_mp * self.mismatch_loss;
            ohm_loss.push(ohm);
            f_ohm_loss.push(finite_or_zero(ohm / point.p_mp));
            mis_loss.push(mismatch);
            e_arr_mpp.push(max_of_2(point.p_mp - ohm - mismatch, 0.));
        }

        table.insert(E_ARR_NOM, e_arr_nom);
        table.insert(T_ARRAY, t_array);
        table.insert(OHM_LOSS, ohm_loss);
        table.insert(F_OHM_LOSS, f_ohm_loss);
        table.insert(MIS_LOSS, mis_loss);
        table.insert(E_ARR_MPP, e_arr_mpp);
        table.insert(U_ARRAY, points.iter().map(|p| p.v_mp).collect());
        table.insert(I_ARRAY, points.iter().map(|p| p.i_mp).collect());
        table.insert(VOC_ARRAY, points.iter().map(|p| p.v_oc).collect());
        table.insert(RESISTANCE_SHUNT, diodes.iter().map(|d| d.resistance_shunt).collect());
        table.insert(SATURATION_CURRENT, diodes.iter().map(|d| d.saturation_current).collect());
        table.insert(PHOTOCURRENT, diodes.iter().map(|d| d.photocurrent).collect());
        table.insert(RESISTANCE_SERIES, diodes.iter().map(|d| d.resistance_series).collect());
        table.insert(N_NS_VTH, diodes.iter().map(|d| d.n_ns_vth).collect());

        Ok(())
    }
}

/// Single-diode parameters of row `row`, as stored in the table by `PhotovoltaicArray::apply`.
pub(crate) fn stored_diode_parameters(
    table: &TimeSeriesTable,
    row: usize,
) -> anyhow::Result<SingleDiodeParameters> {
    Ok(SingleDiodeParameters {
        photocurrent: table.column(PHOTOCURRENT)?[row],
        saturation_current: table.column(SATURATION_CURRENT)?[row],
        resistance_series: table.column(RESISTANCE_SERIES)?[row],
        resistance_shunt: table.column(RESISTANCE_SHUNT)?[row],
        n_ns_vth: table.column(N_NS_VTH)?[row],
    })
}
