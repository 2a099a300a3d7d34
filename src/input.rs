use crate::errors::CverError;
use crate::simulation_time::site_offset;
use chrono::FixedOffset;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const CVER_DIRECTORY: &str = "cver";
const DATABASE_FILE: &str = "DataBase.csv";
const WEATHER_DIRECTORY: &str = "ts";
const MODULE_DIRECTORY: &str = "module";
const INVERTER_DIRECTORY: &str = "inverter";
const REFERENCE_DIRECTORY: &str = "simulation_PVSyst";
const OUTPUT_DIRECTORY: &str = "simulation_CVER";
const METRICS_FILE: &str = "simulation_metrics.csv";

/// One site row of the plant database.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct PlantConfiguration {
    pub site_name: String,
    pub solar_series_file: String,
    pub pan_file: String,
    pub ond_file: String,
    #[serde(default)]
    pub pvsyst_file: Option<String>,
    #[serde(rename = "LAT")]
    pub latitude: f64,
    #[serde(rename = "LON")]
    pub longitude: f64,
    #[serde(rename = "ALTITUDE")]
    pub altitude: f64,
    /// collector width across the row, in m
    #[serde(rename = "L")]
    #[validate(exclusive_minimum = 0.)]
    pub collector_width: f64,
    /// row pitch, in m
    #[serde(rename = "D")]
    #[validate(exclusive_minimum = 0.)]
    pub pitch: f64,
    #[serde(rename = "MODULES_IN_SERIES")]
    #[validate(minimum = 1)]
    pub modules_in_series: u32,
    #[serde(rename = "MODULES_IN_PARALLEL")]
    #[validate(minimum = 1)]
    pub modules_in_parallel: u32,
    #[serde(rename = "INVERTERS")]
    #[validate(minimum = 1)]
    pub inverters: u32,
    #[serde(rename = "LID_LOSS")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub lid_loss: f64,
    /// module quality loss, negative for a quality gain
    #[serde(rename = "QUALITY_LOSS")]
    #[validate(maximum = 1.)]
    pub quality_loss: f64,
    #[serde(rename = "STC_OHM_LOSS")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub stc_ohm_loss: f64,
    #[serde(rename = "STC_OHM_LOSS_AC")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub stc_ohm_loss_ac: f64,
    #[serde(rename = "SOILING_LOSS")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub soiling_loss: f64,
    #[serde(rename = "MISMATCH_LOSS")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub mismatch_loss: f64,
    #[serde(rename = "ALBEDO")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub albedo: f64,
    /// effective irradiance below which thermal derating and validation ignore a timestep, in W/m2
    #[serde(rename = "GHI_MIN_THRESHOLD")]
    #[validate(minimum = 0.)]
    pub ghi_min_threshold: f64,
    #[serde(rename = "MAX_ANGLE")]
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 90.)]
    pub max_angle: f64,
    /// constant heat loss coefficient, in W/m2K
    #[serde(rename = "U_c")]
    #[validate(exclusive_minimum = 0.)]
    pub u_c: f64,
    /// wind-dependent heat loss coefficient, in W/m2K/(m/s)
    #[serde(rename = "U_v")]
    #[validate(minimum = 0.)]
    pub u_v: f64,
    /// hours the site's standard time is behind UTC
    #[serde(rename = "FUSO")]
    pub fuso: i32,
    #[serde(rename = "MV_IRON_LOSS")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub mv_iron_loss: f64,
    #[serde(rename = "MV_COPPER_LOSS")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub mv_copper_loss: f64,
    #[serde(rename = "MV_LOSS_STC")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub mv_loss_stc: f64,
    /// inverter maximum AC power override in kW, 0 to use the inverter file's value
    #[serde(rename = "PMAX_OUT")]
    #[validate(minimum = 0.)]
    pub pmax_out: f64,
}

impl PlantConfiguration {
    /// Ground coverage ratio, collector width over row pitch.
    pub fn gcr(&self) -> f64 {
        self.collector_width / self.pitch
    }

    /// Range-check the row and the relations between its columns.
    pub fn check(&self) -> Result<(), CverError> {
        self.validate()
            .map_err(|errors| CverError::InvalidConfiguration {
                site: self.site_name.clone(),
                reason: errors.to_string(),
            })?;
        let out_of_range = [
            ("LAT", self.latitude, -90., 90.),
            ("LON", self.longitude, -180., 180.),
            ("FUSO", self.fuso as f64, -14., 12.),
        ]
        .into_iter()
        .find(|&(_, value, min, max)| !(min..=max).contains(&value));
        if let Some((column, value, min, max)) = out_of_range {
            return Err(CverError::InvalidConfiguration {
                site: self.site_name.clone(),
                reason: format!("{column} = {value} is outside [{min}, {max}]"),
            });
        }
        if self.collector_width > self.pitch {
            return Err(CverError::InvalidConfiguration {
                site: self.site_name.clone(),
                reason: format!(
                    "collector width L ({}) exceeds row pitch D ({})",
                    self.collector_width, self.pitch
                ),
            });
        }
        if self.lid_loss + self.quality_loss >= 1. {
            return Err(CverError::InvalidConfiguration {
                site: self.site_name.clone(),
                reason: "LID_LOSS and QUALITY_LOSS together remove all irradiance".to_string(),
            });
        }
        Ok(())
    }

    /// The site's fixed offset from UTC, FUSO hours behind it.
    pub fn utc_offset(&self) -> Result<FixedOffset, CverError> {
        site_offset(self.fuso).ok_or_else(|| CverError::InvalidConfiguration {
            site: self.site_name.clone(),
            reason: format!("FUSO = {} is not a valid UTC offset", self.fuso),
        })
    }

    pub fn has_reference(&self) -> bool {
        self.pvsyst_file
            .as_deref()
            .is_some_and(|file| !file.trim().is_empty())
    }
}

/// All site rows of the plant database, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlantDatabase {
    sites: Vec<PlantConfiguration>,
}

impl PlantDatabase {
    pub fn from_path(path: &Path) -> Result<Self, CverError> {
        let file = std::fs::File::open(path).map_err(|e| CverError::InvalidConfiguration {
            site: String::new(),
            reason: format!("plant database {path:?} could not be opened: {e}"),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CverError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let sites = reader
            .deserialize::<PlantConfiguration>()
            .enumerate()
            .map(|(row, record)| {
                record.map_err(|e| CverError::InvalidConfiguration {
                    site: format!("row {row}"),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(sites = sites.len(), "Loaded plant database");

        Ok(Self { sites })
    }

    pub fn sites(&self) -> &[PlantConfiguration] {
        &self.sites
    }

    pub fn site_names(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|site| site.site_name.as_str())
    }

    /// Find a site by name, falling back to reading the key as a zero-based row index.
    pub fn lookup(&self, key: &str) -> Result<&PlantConfiguration, CverError> {
        self.sites
            .iter()
            .find(|site| site.site_name == key)
            .or_else(|| {
                key.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.sites.get(index))
            })
            .ok_or_else(|| CverError::ConfigurationLookup {
                key: key.to_string(),
            })
    }
}

/// Locations of a project's inputs and outputs, relative to its root directory.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cver_directory(&self) -> PathBuf {
        self.root.join(CVER_DIRECTORY)
    }

    pub fn database_path(&self) -> PathBuf {
        self.cver_directory().join(DATABASE_FILE)
    }

    pub fn weather_path(&self, site: &PlantConfiguration) -> PathBuf {
        self.root
            .join(WEATHER_DIRECTORY)
            .join(&site.solar_series_file)
    }

    pub fn module_path(&self, site: &PlantConfiguration) -> PathBuf {
        self.cver_directory()
            .join(MODULE_DIRECTORY)
            .join(&site.pan_file)
    }

    pub fn inverter_path(&self, site: &PlantConfiguration) -> PathBuf {
        self.cver_directory()
            .join(INVERTER_DIRECTORY)
            .join(&site.ond_file)
    }

    pub fn reference_path(&self, site: &PlantConfiguration) -> Option<PathBuf> {
        site.has_reference().then(|| {
            self.cver_directory()
                .join(REFERENCE_DIRECTORY)
                .join(site.pvsyst_file.as_deref().unwrap_or_default().trim())
        })
    }

    pub fn output_directory(&self) -> PathBuf {
        self.cver_directory().join(OUTPUT_DIRECTORY)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.cver_directory().join(METRICS_FILE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    pub(crate) const DATABASE_HEADER: &str = "site_name;solar_series_file;pan_file;ond_file;pvsyst_file;LAT;LON;ALTITUDE;L;D;MODULES_IN_SERIES;MODULES_IN_PARALLEL;INVERTERS;LID_LOSS;QUALITY_LOSS;STC_OHM_LOSS;STC_OHM_LOSS_AC;SOILING_LOSS;MISMATCH_LOSS;ALBEDO;GHI_MIN_THRESHOLD;MAX_ANGLE;U_c;U_v;FUSO;MV_IRON_LOSS;MV_COPPER_LOSS;MV_LOSS_STC;PMAX_OUT";

    pub(crate) fn database_row(site_name: &str, pvsyst_file: &str) -> String {
        format!(
            "{site_name};{site_name}.csv;EX-540M.PAN;EXI-2500.OND;{pvsyst_file};-5.52;-36.35;520;2.279;6.5;26;360;1;0.015;-0.005;0.015;0.01;0.02;0.01;0.2;50;55;29;0;3;0.001;0.01;0.002;0"
        )
    }

    pub(crate) fn plant_configuration(site_name: &str) -> PlantConfiguration {
        let text = format!("{DATABASE_HEADER}\n{}", database_row(site_name, ""));
        PlantDatabase::from_reader(text.as_bytes()).unwrap().sites()[0].clone()
    }

    #[fixture]
    fn database() -> PlantDatabase {
        let text = [
            DATABASE_HEADER.to_string(),
            database_row("Safira 1", "Safira 1_HourlyRes.CSV"),
            database_row("Safira 2", ""),
        ]
        .join("\n");
        PlantDatabase::from_reader(text.as_bytes()).unwrap()
    }

    #[rstest]
    fn test_lookup_by_name(database: PlantDatabase) {
        assert_eq!(database.lookup("Safira 2").unwrap().site_name, "Safira 2");
    }

    #[rstest]
    fn test_lookup_falls_back_to_index(database: PlantDatabase) {
        assert_eq!(database.lookup("1").unwrap().site_name, "Safira 2");
    }

    #[rstest]
    fn test_lookup_unknown_site(database: PlantDatabase) {
        assert!(matches!(
            database.lookup("Safira 9"),
            Err(CverError::ConfigurationLookup { key }) if key == "Safira 9"
        ));
    }

    #[rstest]
    fn test_site_values(database: PlantDatabase) {
        let site = database.lookup("Safira 1").unwrap();
        assert_relative_eq!(site.gcr(), 2.279 / 6.5);
        assert_eq!(site.fuso, 3);
        assert_eq!(site.modules_in_parallel, 360);
        assert!(site.check().is_ok());
    }

    #[rstest]
    fn test_empty_reference_column_means_no_reference(database: PlantDatabase) {
        let layout = ProjectLayout::new("/data/solar");
        assert_eq!(
            layout.reference_path(database.lookup("Safira 1").unwrap()),
            Some(PathBuf::from(
                "/data/solar/cver/simulation_PVSyst/Safira 1_HourlyRes.CSV"
            ))
        );
        assert_eq!(layout.reference_path(database.lookup("Safira 2").unwrap()), None);
    }

    #[rstest]
    fn test_check_rejects_out_of_range_loss(database: PlantDatabase) {
        let mut site = database.lookup("Safira 1").unwrap().clone();
        site.soiling_loss = 1.5;
        assert!(matches!(
            site.check(),
            Err(CverError::InvalidConfiguration { .. })
        ));
    }

    #[rstest]
    fn test_check_rejects_collector_wider_than_pitch(database: PlantDatabase) {
        let mut site = database.lookup("Safira 1").unwrap().clone();
        site.collector_width = 7.;
        assert!(site.check().is_err());
    }
}
