use crate::compare_floats::max_of_2;
use crate::core::columns::{
    ALB_INC, ANG_INC, BEAM_INC, DIF_S_INC, FIAM, GLOB_EFF, GLOB_IAM, GLOB_SLG, SHD_A_LSS, SHD_B_LSS,
    SHD_D_LSS, SLG_LOSS,
};
use crate::parameter_files::module_file::IamCurve;
use crate::time_series::TimeSeriesTable;
use interp::{interp, InterpMode};

impl IamCurve {
    /// Incidence angle modifier at an angle of incidence in degrees, extrapolated linearly
    /// beyond the tabulated angles.
    pub fn factor_at(&self, angle_of_incidence: f64) -> f64 {
        interp(&self.angles, &self.factors, angle_of_incidence, &InterpMode::Extrapolate)
    }
}

/// Apply the incidence angle modifier and soiling to the shaded plane-of-array irradiance.
///
/// Only the beam component is IAM-corrected; diffuse and ground-reflected light pass through.
/// Adds FIAM, GlobIAM, SlgLoss, GlobSlg and GlobEff to the table.
pub fn apply_optical_losses(
    table: &mut TimeSeriesTable,
    iam_curve: &IamCurve,
    soiling_loss: f64,
) -> anyhow::Result<()> {
    let angle_of_incidence = table.column(ANG_INC)?;
    let beam_inc = table.column(BEAM_INC)?;
    let dif_s_inc = table.column(DIF_S_INC)?;
    let alb_inc = table.column(ALB_INC)?;
    let shd_b = table.column(SHD_B_LSS)?;
    let shd_d = table.column(SHD_D_LSS)?;
    let shd_a = table.column(SHD_A_LSS)?;

    let fiam: Vec<f64> = angle_of_incidence
        .iter()
        .map(|&aoi| iam_curve.factor_at(aoi))
        .collect();

    let glob_iam: Vec<f64> = (0..table.len())
        .map(|i| {
            let beam = max_of_2((beam_inc[i] - shd_b[i]) * fiam[i], 0.);
            beam + (dif_s_inc[i] - shd_d[i]) + (alb_inc[i] - shd_a[i])
        })
        .collect();
    let slg_loss: Vec<f64> = glob_iam.iter().map(|g| g * soiling_loss).collect();
    let glob_slg: Vec<f64> = glob_iam.iter().zip(&slg_loss).map(|(g, s)| g - s).collect();

    table.insert(FIAM, fiam);
    table.insert(GLOB_IAM, glob_iam);
    table.insert(SLG_LOSS, slg_loss);
    table.insert(GLOB_SLG, glob_slg.clone());
    table.insert(GLOB_EFF, glob_slg);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[fixture]
    fn iam_curve() -> IamCurve {
        IamCurve {
            angles: vec![0., 30., 50., 60., 70., 75., 80., 85., 90.],
            factors: vec![1., 0.999, 0.987, 0.962, 0.892, 0.816, 0.681, 0.44, 0.],
        }
    }

    #[rstest]
    #[case(-30., 1.001)]
    #[case(0., 1.)]
    #[case(55., 0.9745)]
    #[case(90., 0.)]
    #[case(95., -0.44)]
    fn test_factor_at(iam_curve: IamCurve, #[case] angle: f64, #[case] expected: f64) {
        assert_relative_eq!(iam_curve.factor_at(angle), expected, epsilon = 1e-12);
    }
}
