use crate::compare_floats::finite_or_zero;
use crate::core::columns::{E_ARRAY, E_ARR_MPP, F_OHM_LOSS, GLOB_EFF, I_ARRAY, P_MAX_IN, U_ARRAY, VOC_ARRAY};
use crate::core::energy_supply::pv::stored_diode_parameters;
use crate::core::energy_supply::single_diode::SingleDiodeParameters;
use crate::time_series::TimeSeriesTable;
use rayon::prelude::*;
use tracing::debug;

// Step size and patience of the clipping search. Both are empirical and reproduce the
// reference tool's operating points; neither is derived from the I-V curve.
const VOLTAGE_STEP: f64 = 10.;
const PATIENCE: usize = 5;

/// Array wiring and DC derating used to turn a module current into an array current.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrayWiring {
    pub modules_in_series: f64,
    pub modules_in_parallel: f64,
    pub mismatch_loss: f64,
}

impl ArrayWiring {
    fn current_derating(&self, f_ohm_loss: f64) -> f64 {
        1. - self.mismatch_loss - f_ohm_loss
    }
}

/// Voltage and current at which a clipped array delivers `target_power`.
///
/// Candidate voltages start at the unclipped maximum power voltage and rise towards open
/// circuit in steps of 10 V. The candidate closest to the target is kept; the search stops
/// at open circuit or on the sixth candidate that does not improve on it, so the result is
/// the best point seen rather than a guaranteed optimum. Returns (0, 0) when no candidate
/// comes closer to the target than the target itself.
///
/// Arguments:
/// * `diode` - single-diode parameters of one module
/// * `start_voltage` - unclipped array voltage at maximum power, in V
/// * `open_circuit_voltage` - array open-circuit voltage, in V
/// * `target_power` - clipped array power, in W
/// * `wiring` - array topology and mismatch loss
/// * `f_ohm_loss` - DC ohmic loss as a fraction of array power
pub fn clipped_operating_point(
    diode: &SingleDiodeParameters,
    start_voltage: f64,
    open_circuit_voltage: f64,
    target_power: f64,
    wiring: &ArrayWiring,
    f_ohm_loss: f64,
) -> (f64, f64) {
    let mut best = (0., 0.);
    let mut diff_min = target_power;
    let mut misses = 0;

    let mut step = 0;
    let mut v = start_voltage;
    while v < open_circuit_voltage {
        let i = diode.i_from_v(v / wiring.modules_in_series)
            * wiring.modules_in_parallel
            * wiring.current_derating(f_ohm_loss);
        let diff = (i * v - target_power).abs();

        if diff < diff_min {
            diff_min = diff;
            best = (v, i);
        } else {
            misses += 1;
            if misses > PATIENCE {
                break;
            }
        }

        step += 1;
        v = start_voltage + VOLTAGE_STEP * step as f64;
    }

    best
}

/// Move the array operating point of clipped timesteps to the inverters' input limit, then
/// derate UArray for mismatch and wiring losses and derive IArray from EArray.
///
/// A timestep is clipped when EArrMPP exceeds PMaxIN; other timesteps keep the unclipped
/// maximum power point. Where GlobEff is zero, UArray and IArray are zero.
///
/// Returns the number of clipped timesteps.
pub fn apply_clipping(table: &mut TimeSeriesTable, wiring: &ArrayWiring) -> anyhow::Result<usize> {
    let glob_eff = table.column(GLOB_EFF)?;
    let e_arr_mpp = table.column(E_ARR_MPP)?;
    let p_max_in = table.column(P_MAX_IN)?;
    let e_array = table.column(E_ARRAY)?;
    let u_array = table.column(U_ARRAY)?;
    let i_array = table.column(I_ARRAY)?;
    let voc_array = table.column(VOC_ARRAY)?;
    let f_ohm_loss = table.column(F_OHM_LOSS)?;

    let clipped_rows: Vec<usize> = (0..table.len())
        .filter(|&i| e_arr_mpp[i] > p_max_in[i])
        .collect();
    let diodes = clipped_rows
        .iter()
        .map(|&i| stored_diode_parameters(table, i))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let clipped_points: Vec<(f64, f64)> = clipped_rows
        .par_iter()
        .zip(diodes.par_iter())
        .map(|(&i, diode)| {
            clipped_operating_point(
                diode,
                u_array[i],
                voc_array[i],
                e_array[i],
                wiring,
                f_ohm_loss[i],
            )
        })
        .collect();

    let mut voltage = u_array.to_vec();
    let mut current = i_array.to_vec();
    for (&i, &(v, c)) in clipped_rows.iter().zip(&clipped_points) {
        voltage[i] = v;
        current[i] = c;
    }

    for i in 0..table.len() {
        if glob_eff[i] == 0. {
            voltage[i] = 0.;
            current[i] = 0.;
        } else {
            voltage[i] *= wiring.current_derating(f_ohm_loss[i]);
            current[i] = finite_or_zero(e_array[i] / voltage[i]);
        }
    }

    debug!(clipped = clipped_rows.len(), "Clipping search complete");

    table.insert(U_ARRAY, voltage);
    table.insert(I_ARRAY, current);

    Ok(clipped_rows.len())
}
