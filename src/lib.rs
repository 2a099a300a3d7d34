#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod corpus;
pub mod errors;
pub mod input;
pub mod output;
pub mod output_writer;
pub mod parameter_files;
pub mod read_reference_file;
pub mod read_weather_file;
pub mod simulation_time;
mod statistics;
#[cfg(test)]
mod tests;
pub mod time_series;
pub mod validation;

#[macro_use]
extern crate is_close;
extern crate lazy_static;

pub use crate::corpus::RunResults;
use crate::corpus::Corpus;
use crate::errors::{AtStage, SiteFailure, Stage};
use crate::input::{PlantConfiguration, PlantDatabase, ProjectLayout};
use crate::output::Output;
use crate::output_writer::{append_metrics, write_detailed_file, write_result_file};
use crate::parameter_files::inverter_file::InverterParameters;
use crate::parameter_files::module_file::ModuleParameters;
use crate::read_weather_file::weather_file_to_table;
use crate::validation::{validate, ValidationOutcome};
use chrono::{DateTime, Local};
use rayon::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// File name template of the per-site result files, filled with the site name and extension.
pub const RESULT_FILE_TEMPLATE: &str = "{}{}";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunOptions {
    /// compare the simulation with the site's reference simulation, when it has one
    pub validation: bool,
    /// also write every simulated column to `<site>_detailed.csv`
    pub detailed_output: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            validation: true,
            detailed_output: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SiteRunReport {
    pub site: String,
    pub clipped_timesteps: usize,
    /// `None` when validation was switched off
    pub validation: Option<ValidationOutcome>,
    pub completed_at: DateTime<Local>,
}

/// Install the process-wide log subscriber. Call once, at process start.
pub fn init_logging(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {e}"))
}

/// Simulate one site, found by name or else by zero-based row in the plant database, and write
/// its result file.
pub fn run_site(
    layout: &ProjectLayout,
    database: &PlantDatabase,
    key: &str,
    options: &RunOptions,
    output: &impl Output,
) -> Result<SiteRunReport, SiteFailure> {
    let site = database.lookup(key).at_stage(key, Stage::Configuration)?;
    simulate_site(layout, site, options, output)
}

/// Simulate every site of the plant database in parallel. A failing site does not stop the
/// others; results are in database order.
pub fn run_batch(
    layout: &ProjectLayout,
    database: &PlantDatabase,
    options: &RunOptions,
    output: &impl Output,
) -> Vec<Result<SiteRunReport, SiteFailure>> {
    info!(sites = database.sites().len(), "Starting batch");
    database
        .sites()
        .par_iter()
        .map(|site| simulate_site(layout, site, options, output))
        .collect()
}

fn simulate_site(
    layout: &ProjectLayout,
    site: &PlantConfiguration,
    options: &RunOptions,
    output: &impl Output,
) -> Result<SiteRunReport, SiteFailure> {
    let name = site.site_name.as_str();
    site.check().at_stage(name, Stage::Configuration)?;
    let offset = site.utc_offset().at_stage(name, Stage::Configuration)?;

    let module =
        ModuleParameters::from_path(&layout.module_path(site)).at_stage(name, Stage::ModuleFile)?;
    let inverter = InverterParameters::from_path(&layout.inverter_path(site))
        .at_stage(name, Stage::InverterFile)?;
    let weather =
        weather_file_to_table(&layout.weather_path(site), offset).at_stage(name, Stage::Weather)?;

    let results = Corpus::from_inputs(site, &module, &inverter)
        .and_then(|corpus| corpus.run(weather))
        .at_stage(name, Stage::Simulation)?;

    write_result_file(output, site, &results.table).at_stage(name, Stage::Output)?;
    if options.detailed_output {
        write_detailed_file(output, name, &results.table).at_stage(name, Stage::Output)?;
    }

    let validation = if options.validation {
        let reference_path = layout.reference_path(site);
        Some(
            validate(site, reference_path.as_deref(), &results.table)
                .at_stage(name, Stage::Validation)?,
        )
    } else {
        None
    };

    Ok(SiteRunReport {
        site: name.to_string(),
        clipped_timesteps: results.clipped_timesteps,
        validation,
        completed_at: Local::now(),
    })
}

/// Append the scores of each validated site to the project's metrics file, one site at a
/// time. Sites without scores leave the file untouched. Returns the number of rows appended.
pub fn record_metrics<'a>(
    layout: &ProjectLayout,
    reports: impl IntoIterator<Item = &'a SiteRunReport>,
) -> anyhow::Result<usize> {
    let path = layout.metrics_path();
    let mut appended = 0;
    for report in reports {
        match &report.validation {
            Some(ValidationOutcome::Scored(record)) => {
                append_metrics(&path, record)?;
                appended += 1;
            }
            Some(ValidationOutcome::Skipped(skipped)) => info!("{skipped}"),
            None => {}
        }
    }
    Ok(appended)
}
