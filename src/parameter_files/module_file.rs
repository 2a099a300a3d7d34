use crate::core::units::{
    KELVIN_OFFSET, MILLIAMPS_PER_AMP, SQUARE_CENTIMETRES_PER_SQUARE_METRE,
};
use crate::errors::CverError;
use crate::parameter_files::outline::{parse_point, Outline};
use crate::parameter_files::{missing, numeric_value};
use std::path::Path;
use std::str::FromStr;
use strum::EnumString;
use tracing::debug;

const IAM_SECTION: &str = "IAMProfile";
const IAM_CURVE_POINTS: usize = 9;

/// Cell technologies with a known bandgap.
#[derive(Clone, Copy, Debug, EnumString, PartialEq)]
pub enum CellTechnology {
    #[strum(serialize = "mtSiMono")]
    MonocrystallineSilicon,
    #[strum(serialize = "mtSiPoly")]
    PolycrystallineSilicon,
    #[strum(serialize = "mtCdTe")]
    CadmiumTelluride,
}

impl CellTechnology {
    /// Bandgap energy at reference conditions, in eV.
    pub fn bandgap(&self) -> f64 {
        match self {
            CellTechnology::MonocrystallineSilicon | CellTechnology::PolycrystallineSilicon => 1.12,
            CellTechnology::CadmiumTelluride => 1.5,
        }
    }
}

/// Incidence angle modifier curve: factor as a function of angle of incidence (degrees).
#[derive(Clone, Debug, PartialEq)]
pub struct IamCurve {
    pub angles: Vec<f64>,
    pub factors: Vec<f64>,
}

/// Single-diode parameters of a PV module, as read from a `.PAN` file.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleParameters {
    /// temperature coefficient of short-circuit current, in A/degC
    pub alpha_sc: f64,
    /// diode ideality factor at reference conditions
    pub gamma_ref: f64,
    /// temperature coefficient of the ideality factor, in 1/K
    pub mu_gamma: f64,
    /// shunt resistance at reference irradiance, in ohm
    pub r_sh_ref: f64,
    /// shunt resistance at zero irradiance, in ohm
    pub r_sh_0: f64,
    /// series resistance, in ohm
    pub r_s: f64,
    pub cells_in_series: f64,
    pub cells_in_parallel: f64,
    pub r_sh_exp: f64,
    pub technology: CellTechnology,
    /// bandgap energy at reference temperature, in eV
    pub eg_ref: f64,
    /// reference irradiance, in W/m2
    pub irrad_ref: f64,
    /// reference cell temperature, in K
    pub temp_ref: f64,
    /// cell area, in m2
    pub cell_area: f64,
    /// Imp * Vmp, in W
    pub nominal_power: f64,
    pub i_mp: f64,
    pub v_mp: f64,
    pub i_sc_ref: f64,
    pub v_oc_ref: f64,
    /// module width, in m
    pub width: f64,
    /// module height, in m
    pub height: f64,
    /// module surface, in m2
    pub surface: f64,
    pub iam_curve: IamCurve,
}

impl ModuleParameters {
    pub fn from_path(path: &Path) -> Result<Self, CverError> {
        let outline = Outline::from_path(path)?;
        Self::from_outline(&outline, path)
    }

    /// Arguments:
    /// * `outline` - parsed content of the `.PAN` file
    /// * `path` - location the outline was read from, used for error reporting
    pub fn from_outline(outline: &Outline, path: &Path) -> Result<Self, CverError> {
        let number = |key: &str| numeric_value(outline, key, path);

        let technology_token = outline
            .first("Technol")
            .ok_or_else(|| missing(path, "Technol"))?;
        let technology = CellTechnology::from_str(technology_token)
            .map_err(|_| CverError::UnknownCellTechnology(technology_token.to_string()))?;

        let i_mp = number("Imp")?;
        let v_mp = number("Vmp")?;
        let width = number("Width")?;
        let height = number("Height")?;

        let parameters = Self {
            alpha_sc: number("muISC")? / MILLIAMPS_PER_AMP,
            gamma_ref: number("Gamma")?,
            mu_gamma: number("muGamma")?,
            r_sh_ref: number("RShunt")?,
            r_sh_0: number("Rp_0")?,
            r_s: number("RSerie")?,
            cells_in_series: number("NCelS")?,
            cells_in_parallel: number("NCelP")?,
            r_sh_exp: number("Rp_Exp")?,
            technology,
            eg_ref: technology.bandgap(),
            irrad_ref: number("GRef")?,
            temp_ref: number("TRef")? + KELVIN_OFFSET,
            cell_area: number("CellArea")? / SQUARE_CENTIMETRES_PER_SQUARE_METRE,
            nominal_power: i_mp * v_mp,
            i_mp,
            v_mp,
            i_sc_ref: number("Isc")?,
            v_oc_ref: number("Voc")?,
            width,
            height,
            surface: width * height,
            iam_curve: read_iam_curve(outline, path)?,
        };

        debug!(
            ?path,
            technology = ?parameters.technology,
            nominal_power = parameters.nominal_power,
            "Loaded module parameters"
        );

        Ok(parameters)
    }
}

fn read_iam_curve(outline: &Outline, path: &Path) -> Result<IamCurve, CverError> {
    let is_point = |key: &str| {
        key.strip_prefix("Point_")
            .and_then(|n| n.parse::<usize>().ok())
            .is_some_and(|n| (1..=IAM_CURVE_POINTS).contains(&n))
    };

    let mut values: Vec<&str> = outline
        .section(IAM_SECTION)
        .into_iter()
        .filter(|entry| is_point(&entry.key))
        .map(|entry| entry.value.as_str())
        .collect();
    if values.is_empty() {
        values = outline
            .entries()
            .iter()
            .filter(|entry| is_point(&entry.key))
            .map(|entry| entry.value.as_str())
            .take(IAM_CURVE_POINTS)
            .collect();
    }

    let mut points = values
        .into_iter()
        .map(|value| {
            parse_point(value).ok_or_else(|| CverError::MalformedParameterFile {
                path: path.to_path_buf(),
                reason: format!("IAM curve point '{value}' is not an 'angle,factor' pair"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(missing(path, IAM_SECTION));
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(IamCurve {
        angles: points.iter().map(|(angle, _)| *angle).collect(),
        factors: points.iter().map(|(_, factor)| *factor).collect(),
    })
}
