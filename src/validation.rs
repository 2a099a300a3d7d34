use crate::core::columns::{AZ_SOL, CIRC_TRP, DIF_S_INC, GLOB_EFF, PHI_ANG};
use crate::errors::MissingReferenceFile;
use crate::input::PlantConfiguration;
use crate::read_reference_file::reference_file_to_table;
use crate::statistics::{percent_difference, r_squared, rmse_percent, round_to};
use crate::time_series::TimeSeriesTable;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const SITE_COLUMN: &str = "Site";

const METRIC_DECIMALS: i32 = 4;

/// Scores of one site against its reference simulation, keyed `<column>_<metric>`.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsRecord {
    pub site: String,
    pub scores: IndexMap<String, f64>,
}

impl MetricsRecord {
    /// Column headings of this record, the site column first.
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(SITE_COLUMN.to_string())
            .chain(self.scores.keys().cloned())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    Scored(MetricsRecord),
    Skipped(MissingReferenceFile),
}

/// Compare a site's simulated table with its reference simulation, if it has one.
///
/// A site without a reference file is not an error: the outcome explains that validation
/// was skipped and nothing is scored.
pub fn validate(
    site: &PlantConfiguration,
    reference_path: Option<&Path>,
    estimate: &TimeSeriesTable,
) -> anyhow::Result<ValidationOutcome> {
    let Some(reference_path) = reference_path else {
        info!(site = site.site_name, "No reference simulation, skipping validation");
        return Ok(ValidationOutcome::Skipped(MissingReferenceFile {
            site: site.site_name.clone(),
        }));
    };

    let mut reference = reference_file_to_table(reference_path, site.utc_offset()?)?;
    convert_reference_conventions(&mut reference)?;

    Ok(ValidationOutcome::Scored(score(
        &site.site_name,
        estimate,
        &reference,
        site.ghi_min_threshold,
    )?))
}

/// Bring the reference tool's columns onto the simulation's conventions: azimuth clockwise
/// from north, tracker angles of the opposite sign, and circumsolar diffuse folded into the
/// plane-of-array diffuse.
pub fn convert_reference_conventions(reference: &mut TimeSeriesTable) -> anyhow::Result<()> {
    if reference.contains(AZ_SOL) {
        reference.derive(AZ_SOL, [AZ_SOL], |[azimuth]| reference_azimuth(azimuth))?;
    }
    if reference.contains(PHI_ANG) {
        reference.derive(PHI_ANG, [PHI_ANG], |[phi]| -phi)?;
    }
    if reference.contains(DIF_S_INC) && reference.contains(CIRC_TRP) {
        reference.derive(DIF_S_INC, [DIF_S_INC, CIRC_TRP], |[diffuse, circumsolar]| {
            diffuse + circumsolar
        })?;
    }
    Ok(())
}

/// The reference tool measures azimuth from south, positive to the west.
fn reference_azimuth(azimuth: f64) -> f64 {
    if azimuth > 0. {
        360. - azimuth
    } else if azimuth < 0. {
        -azimuth
    } else {
        azimuth
    }
}

/// Score every column the two tables share.
///
/// Rows are paired by interval-centre instant. Only rows whose reference GlobEff exceeds
/// `threshold` are scored, and a pair with a missing value on either side is dropped from
/// that column only.
pub fn score(
    site: &str,
    estimate: &TimeSeriesTable,
    reference: &TimeSeriesTable,
    threshold: f64,
) -> anyhow::Result<MetricsRecord> {
    let reference_rows: HashMap<i64, usize> = reference
        .time()
        .centres()
        .iter()
        .enumerate()
        .map(|(row, instant)| (instant.timestamp(), row))
        .collect();
    let reference_glob_eff = reference.column(GLOB_EFF)?;

    let aligned: Vec<(usize, usize)> = estimate
        .time()
        .centres()
        .iter()
        .enumerate()
        .filter_map(|(row, instant)| {
            reference_rows
                .get(&instant.timestamp())
                .map(|&reference_row| (row, reference_row))
        })
        .filter(|&(_, reference_row)| reference_glob_eff[reference_row] > threshold)
        .collect();

    debug!(site, rows = aligned.len(), "Aligned estimate with reference");

    let mut scores = IndexMap::new();
    for column in estimate.column_names() {
        let Some(reference_values) = reference.get(column) else {
            continue;
        };
        let estimate_values = estimate.column(column)?;

        let (estimated, expected): (Vec<f64>, Vec<f64>) = aligned
            .iter()
            .map(|&(row, reference_row)| (estimate_values[row], reference_values[reference_row]))
            .filter(|(e, r)| !e.is_nan() && !r.is_nan())
            .unzip();

        let difference = percent_difference(&estimated, &expected);
        for (metric, value) in [
            ("r2", r_squared(&estimated, &expected)),
            ("RMSE", rmse_percent(&estimated, &expected)),
            ("diff_per_cent_signal", difference),
            ("diff_per_cent", difference.abs()),
        ] {
            scores.insert(format!("{column}_{metric}"), round_to(value, METRIC_DECIMALS));
        }
    }

    info!(site, columns = scores.len() / 4, "Validation complete");

    Ok(MetricsRecord {
        site: site.to_string(),
        scores,
    })
}
