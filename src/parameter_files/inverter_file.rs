use crate::errors::CverError;
use crate::parameter_files::{missing, numeric_value};
use crate::parameter_files::outline::{parse_point, Outline, OutlineEntry};
use interp::{interp, InterpMode};
use std::path::Path;
use std::str::FromStr;
use strum::EnumString;
use tracing::debug;

const VOLTAGE_BIN_SECTIONS: [&str; 3] = ["ProfilPIOV1", "ProfilPIOV2", "ProfilPIOV3"];

#[derive(Clone, Copy, Debug, EnumString, PartialEq)]
pub enum PhaseConfiguration {
    #[strum(serialize = "Mono")]
    Single,
    #[strum(serialize = "Tri")]
    Three,
}

impl PhaseConfiguration {
    pub fn phase_count(&self) -> f64 {
        match self {
            PhaseConfiguration::Single => 1.,
            PhaseConfiguration::Three => 3.,
        }
    }
}

/// Conversion efficiency (P_ac / P_dc) as a function of DC input power (W) for one input voltage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EfficiencyCurve {
    pub p_dc: Vec<f64>,
    pub efficiency: Vec<f64>,
}

impl EfficiencyCurve {
    fn from_points(points: &[(f64, f64)]) -> Self {
        let mut points: Vec<(f64, f64)> = points
            .iter()
            .map(|&(p_dc, p_ac)| (p_dc, p_ac / p_dc))
            // the 0,0 origin point has no defined efficiency
            .filter(|(_, efficiency)| efficiency.is_finite())
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            p_dc: points.iter().map(|(p, _)| *p).collect(),
            efficiency: points.iter().map(|(_, e)| *e).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.p_dc.is_empty()
    }

    /// Efficiency at the given DC power, extrapolated beyond the curve and floored at zero.
    pub fn efficiency_at(&self, p_dc: f64) -> f64 {
        interp(&self.p_dc, &self.efficiency, p_dc, &InterpMode::Extrapolate).max(0.)
    }
}

/// Efficiency curves for the minimum, nominal and maximum MPPT input voltages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EfficiencyCurves {
    pub v_min: EfficiencyCurve,
    pub v_nom: EfficiencyCurve,
    pub v_max: EfficiencyCurve,
}

/// Electrical parameters of a grid-tied inverter, as read from an `.OND` file.
#[derive(Clone, Debug, PartialEq)]
pub struct InverterParameters {
    /// nominal AC power, in kW
    pub p_nom_conv: f64,
    /// maximum efficiency, in %
    pub effic_max: f64,
    /// maximum AC power, in kW
    pub p_max_out: f64,
    /// ambient temperature up to which nominal power is available, in degC
    pub tp_nom: f64,
    /// ambient temperature up to which maximum power is available, in degC
    pub tp_max: f64,
    /// AC output voltage, in V
    pub v_out_conv: f64,
    pub phases: PhaseConfiguration,
    /// input voltages of the three efficiency curves, in V
    pub v_nom_eff: Vec<f64>,
    pub curves: EfficiencyCurves,
}

impl InverterParameters {
    pub fn from_path(path: &Path) -> Result<Self, CverError> {
        let outline = Outline::from_path(path)?;
        Self::from_outline(&outline, path)
    }

    /// Arguments:
    /// * `outline` - parsed content of the `.OND` file
    /// * `path` - location the outline was read from, used for error reporting
    pub fn from_outline(outline: &Outline, path: &Path) -> Result<Self, CverError> {
        let number = |key: &str| numeric_value(outline, key, path);

        let phase_token = outline
            .first("MonoTri")
            .ok_or_else(|| missing(path, "MonoTri"))?;
        let phases = PhaseConfiguration::from_str(phase_token).map_err(|_| {
            CverError::MalformedParameterFile {
                path: path.to_path_buf(),
                reason: format!("MonoTri must be 'Mono' or 'Tri', found '{phase_token}'"),
            }
        })?;

        let v_nom_eff = outline
            .first("VNomEff")
            .map(|value| {
                value
                    .split(',')
                    .filter_map(|v| v.trim().parse::<f64>().ok())
                    .collect()
            })
            .unwrap_or_default();

        let parameters = Self {
            p_nom_conv: number("PNomConv")?,
            effic_max: number("EfficMax")?,
            p_max_out: number("PMaxOUT")?,
            tp_nom: number("TPNom")?,
            tp_max: number("TPMax")?,
            v_out_conv: number("VOutConv")?,
            phases,
            v_nom_eff,
            curves: read_efficiency_curves(outline, path)?,
        };

        debug!(
            ?path,
            p_nom_conv = parameters.p_nom_conv,
            p_max_out = parameters.p_max_out,
            "Loaded inverter parameters"
        );

        Ok(parameters)
    }
}

fn read_efficiency_curves(outline: &Outline, path: &Path) -> Result<EfficiencyCurves, CverError> {
    let is_point = |entry: &&OutlineEntry| entry.key.starts_with("Point_");

    let mut runs: Vec<Vec<&OutlineEntry>> = VOLTAGE_BIN_SECTIONS
        .iter()
        .map(|section| outline.section(section).into_iter().filter(is_point).collect())
        .collect();

    if runs.iter().all(|run| run.is_empty()) {
        // no voltage-bin sections: split every Point_n list into runs, starting at each Point_1,
        // and take the last three as the Vmin, Vnom and Vmax curves
        let mut all_runs: Vec<Vec<&OutlineEntry>> = vec![];
        for entry in outline.entries().iter().filter(|entry| is_point(entry)) {
            match all_runs.last_mut() {
                Some(run) if entry.key != "Point_1" => run.push(entry),
                _ => all_runs.push(vec![entry]),
            }
        }
        let skip = all_runs.len().saturating_sub(VOLTAGE_BIN_SECTIONS.len());
        runs = all_runs.into_iter().skip(skip).collect();
    }

    let mut curves = runs
        .into_iter()
        .map(|run| {
            let points = run
                .iter()
                .map(|entry| {
                    parse_point(&entry.value).ok_or_else(|| CverError::MalformedParameterFile {
                        path: path.to_path_buf(),
                        reason: format!(
                            "efficiency curve point '{}' is not a 'P_dc,P_ac' pair",
                            entry.value
                        ),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(EfficiencyCurve::from_points(&points))
        })
        .collect::<Result<Vec<_>, CverError>>()?
        .into_iter();

    let curves = EfficiencyCurves {
        v_min: curves.next().unwrap_or_default(),
        v_nom: curves.next().unwrap_or_default(),
        v_max: curves.next().unwrap_or_default(),
    };

    if curves.v_nom.is_empty() {
        return Err(missing(path, "ProfilPIOV2"));
    }

    Ok(curves)
}
