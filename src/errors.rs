use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CverError {
    #[error("No site found in the plant database with name or index '{key}'")]
    ConfigurationLookup { key: String },
    #[error("Invalid configuration for site '{site}': {reason}")]
    InvalidConfiguration { site: String, reason: String },
    #[error("Parameter file {path:?} could not be read: {reason}")]
    MalformedParameterFile { path: PathBuf, reason: String },
    #[error("Parameter '{key}' is missing or not numeric in {path:?}")]
    MissingParameter { path: PathBuf, key: String },
    #[error("Unknown cell technology '{0}' (expected one of mtSiMono, mtSiPoly, mtCdTe)")]
    UnknownCellTechnology(String),
    #[error("Time series {path:?} is malformed: {reason}")]
    MalformedTimeSeries { path: PathBuf, reason: String },
}

/// Informational outcome for a site without a configured reference simulation.
/// This is never returned as an `Err` from a run - it is carried inside
/// `ValidationOutcome::Skipped` so that the simulation output is still written.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("No reference simulation file is configured for site '{site}'; validation was skipped")]
pub struct MissingReferenceFile {
    pub site: String,
}

/// The pipeline stage in which a site failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Configuration,
    ModuleFile,
    InverterFile,
    Weather,
    Simulation,
    Output,
    Validation,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::Configuration => "configuration lookup",
                Stage::ModuleFile => "module parameter loading",
                Stage::InverterFile => "inverter parameter loading",
                Stage::Weather => "weather series loading",
                Stage::Simulation => "simulation",
                Stage::Output => "output writing",
                Stage::Validation => "validation",
            }
        )
    }
}

/// A failure isolated to a single site, carrying enough context to diagnose it
/// without halting the other sites of a batch.
#[derive(Debug, Error)]
#[error("Site '{site}' failed during {stage}: {source:#}")]
pub struct SiteFailure {
    pub site: String,
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl SiteFailure {
    pub(crate) fn new(site: impl Into<String>, stage: Stage, source: anyhow::Error) -> Self {
        Self {
            site: site.into(),
            stage,
            source,
        }
    }
}

/// Attach site/stage context to a fallible step.
pub(crate) trait AtStage<T> {
    fn at_stage(self, site: &str, stage: Stage) -> Result<T, SiteFailure>;
}

impl<T, E> AtStage<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn at_stage(self, site: &str, stage: Stage) -> Result<T, SiteFailure> {
        self.map_err(|e| SiteFailure::new(site, stage, e.into()))
    }
}
