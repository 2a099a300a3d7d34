extern crate cver;

use clap::Parser;
use cver::input::{PlantDatabase, ProjectLayout};
use cver::output::FileOutput;
use cver::validation::ValidationOutcome;
use cver::{
    init_logging, record_metrics, run_batch, run_site, RunOptions, SiteRunReport,
    RESULT_FILE_TEMPLATE,
};
use std::path::PathBuf;
use tracing::{error, Level};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CverArgs {
    /// project directory holding `cver/` and `ts/`
    project_directory: PathBuf,
    /// site name, or zero-based row of the plant database; every site when omitted
    #[arg(long, short)]
    site: Option<String>,
    #[arg(long, default_value_t = false)]
    no_validation: bool,
    /// also write every simulated column to `<site>_detailed.csv`
    #[arg(long, short, default_value_t = false)]
    detailed: bool,
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> anyhow::Result<()> {
    let args = CverArgs::parse();
    init_logging(args.log_level)?;

    let layout = ProjectLayout::new(&args.project_directory);
    let database = PlantDatabase::from_path(&layout.database_path())?;
    let options = RunOptions {
        validation: !args.no_validation,
        detailed_output: args.detailed,
    };
    let output = FileOutput::new(layout.output_directory(), RESULT_FILE_TEMPLATE.to_string());

    let reports = match &args.site {
        Some(key) => vec![run_site(&layout, &database, key, &options, &output)],
        None => run_batch(&layout, &database, &options, &output),
    };

    let succeeded: Vec<&SiteRunReport> = reports.iter().flatten().collect();
    record_metrics(&layout, succeeded.iter().copied())?;

    for report in &succeeded {
        if let Some(ValidationOutcome::Skipped(skipped)) = &report.validation {
            println!("{skipped}");
        }
        println!(
            "File {} created at {}",
            report.site,
            report.completed_at.format("%d/%m/%Y %H:%M:%S")
        );
    }

    let failures: Vec<_> = reports.iter().filter_map(|report| report.as_ref().err()).collect();
    for failure in &failures {
        error!("{failure}");
    }
    if !failures.is_empty() {
        anyhow::bail!("{} of {} sites failed", failures.len(), reports.len());
    }

    Ok(())
}
