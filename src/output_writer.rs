use crate::core::columns::*;
use crate::input::PlantConfiguration;
use crate::output::Output;
use crate::simulation_time::format_timestamp;
use crate::time_series::TimeSeriesTable;
use crate::validation::{MetricsRecord, SITE_COLUMN};
use csv::{ReaderBuilder, WriterBuilder};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub const VERSION_TAG: &str = "CVER 1.0.0";
pub const RESULT_EXTENSION: &str = ".csv";
pub const DETAILED_SUFFIX: &str = "_detailed";

const BYTE_ORDER_MARK: &str = "\u{feff}";

lazy_static! {
    pub static ref UNITS_MAP: IndexMap<&'static str, &'static str> = IndexMap::from([
        (GLOB_HOR, "W/m²"),
        (DIFF_HOR, "W/m²"),
        (T_AMB, "°C"),
        (WIND_VEL, "m/s"),
        (H_SOL, "°"),
        (AZ_SOL, "°"),
        (PHI_ANG, "°"),
        (ANG_INC, "°"),
        (BEAM_HOR, "W/m²"),
        (BEAM_INC, "W/m²"),
        (DIF_S_INC, "W/m²"),
        (ALB_INC, "W/m²"),
        (GLOB_INC, "W/m²"),
        (SHD_B_LSS, "W/m²"),
        (SHD_D_LSS, "W/m²"),
        (SHD_A_LSS, "W/m²"),
        (SHD_LOSS, "W/m²"),
        (GLOB_SHD, "W/m²"),
        (FIAM, "-"),
        (GLOB_IAM, "W/m²"),
        (SLG_LOSS, "W/m²"),
        (GLOB_SLG, "W/m²"),
        (GLOB_EFF, "W/m²"),
        (E_ARR_NOM, "W"),
        (T_ARRAY, "°C"),
        (OHM_LOSS, "W"),
        (MIS_LOSS, "W"),
        (E_ARR_MPP, "W"),
        (U_ARRAY, "V"),
        (I_ARRAY, "A"),
        (E_OUT_INV, "W"),
        (E_ARRAY, "W"),
        (E_AC_OHM_L, "W"),
        (E_MV_TRF_L, "W"),
        (E_MV_OHM_L, "W"),
        (E_GRID, "W"),
    ]);
}

/// Configuration columns echoed in the result file header, in order.
const CONFIGURATION_NAMES: [&str; 23] = [
    "LAT",
    "LON",
    "ALTITUDE",
    "ALBEDO",
    "MAX_ANGLE",
    "D",
    "L",
    "INVERTERS",
    "MODULES_IN_SERIES",
    "MODULES_IN_PARALLEL",
    "U_c",
    "U_v",
    "STC_OHM_LOSS",
    "STC_OHM_LOSS_AC",
    "QUALITY_LOSS",
    "LID_LOSS",
    "MISMATCH_LOSS",
    "SOILING_LOSS",
    "GHI_MIN_THRESHOLD",
    "FUSO",
    "MV_IRON_LOSS",
    "MV_COPPER_LOSS",
    "PMAX_OUT",
];

fn configuration_values(site: &PlantConfiguration) -> [String; 23] {
    [
        site.latitude.to_string(),
        site.longitude.to_string(),
        site.altitude.to_string(),
        site.albedo.to_string(),
        site.max_angle.to_string(),
        site.pitch.to_string(),
        site.collector_width.to_string(),
        site.inverters.to_string(),
        site.modules_in_series.to_string(),
        site.modules_in_parallel.to_string(),
        site.u_c.to_string(),
        site.u_v.to_string(),
        site.stc_ohm_loss.to_string(),
        site.stc_ohm_loss_ac.to_string(),
        site.quality_loss.to_string(),
        site.lid_loss.to_string(),
        site.mismatch_loss.to_string(),
        site.soiling_loss.to_string(),
        site.ghi_min_threshold.to_string(),
        format!("-{}", site.fuso),
        site.mv_iron_loss.to_string(),
        site.mv_copper_loss.to_string(),
        site.pmax_out.to_string(),
    ]
}

/// Write the site's result file: a metadata header echoing the inputs, then the interval-start
/// time, GlobHor and E_Grid of every timestep.
pub fn write_result_file(
    output: &impl Output,
    site: &PlantConfiguration,
    table: &TimeSeriesTable,
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    debug!(site = site.site_name, "Writing result file");

    let mut writer = output.writer_for_location_key(&site.site_name, RESULT_EXTENSION)?;

    let reference = if site.has_reference() {
        site.pvsyst_file.as_deref().unwrap_or_default()
    } else {
        "None"
    };
    write!(writer, "{BYTE_ORDER_MARK}")?;
    writeln!(writer, "{VERSION_TAG}")?;
    writeln!(writer, ";File;")?;
    writeln!(writer, "Site_name;{}", site.site_name)?;
    writeln!(writer, "Pvsyst_file;{reference}")?;
    writeln!(writer, "Solar_series;{}", site.solar_series_file)?;
    writeln!(writer, "Pan_file;{}", site.pan_file)?;
    writeln!(writer, "Ond_file;{}", site.ond_file)?;
    writeln!(writer, "{}", CONFIGURATION_NAMES.join(";"))?;
    writeln!(writer, "{}", configuration_values(site).join(";"))?;
    writeln!(writer, "date; GlobHor; E_Grid")?;
    writeln!(writer, " ; {}; {}", UNITS_MAP[GLOB_HOR], UNITS_MAP[E_GRID])?;

    let glob_hor = table.column(GLOB_HOR)?;
    let e_grid = table.column(E_GRID)?;
    let mut rows = WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(writer);
    for (i, start) in table.time().starts().iter().enumerate() {
        rows.write_record([
            format_timestamp(start),
            glob_hor[i].to_string(),
            e_grid[i].to_string(),
        ])?;
    }
    rows.flush()?;

    Ok(())
}

/// Write every delivered column of the simulation table, with a units row under the headings.
pub fn write_detailed_file(
    output: &impl Output,
    site_name: &str,
    table: &TimeSeriesTable,
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    debug!(site = site_name, "Writing detailed file");

    let location_key = format!("{site_name}{DETAILED_SUFFIX}");
    let writer = output.writer_for_location_key(&location_key, RESULT_EXTENSION)?;
    let mut writer = WriterBuilder::new().delimiter(b';').from_writer(writer);

    let names: Vec<&str> = table.column_names().collect();
    let mut headings = vec!["date"];
    let mut units_row = vec![""];
    for &name in &names {
        headings.push(name);
        units_row.push(UNITS_MAP.get(name).copied().unwrap_or("Unit not defined"));
    }
    writer.write_record(&headings)?;
    writer.write_record(&units_row)?;

    let columns = names
        .iter()
        .map(|name| table.column(name))
        .collect::<anyhow::Result<Vec<_>>>()?;
    for (i, start) in table.time().starts().iter().enumerate() {
        let mut row = vec![format_timestamp(start)];
        row.extend(columns.iter().map(|column| column[i].to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Add one site's scores to the metrics accumulation file.
///
/// Prior rows are kept. The header becomes the prior columns followed by any new ones, and
/// cells a row has no value for are left empty. Missing scores are written as empty cells.
pub fn append_metrics(path: &Path, record: &MetricsRecord) -> anyhow::Result<()> {
    let (mut header, mut rows) = if path.exists() {
        read_metrics(std::fs::File::open(path)?)?
    } else {
        (vec![], vec![])
    };

    for column in record.columns() {
        if !header.contains(&column) {
            header.push(column);
        }
    }

    let mut new_row = IndexMap::from([(SITE_COLUMN.to_string(), record.site.clone())]);
    for (column, value) in &record.scores {
        let cell = if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        };
        new_row.insert(column.clone(), cell);
    }
    rows.push(new_row);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)?;
    writer.write_record(&header)?;
    for row in &rows {
        writer.write_record(
            header
                .iter()
                .map(|column| row.get(column).map(String::as_str).unwrap_or_default()),
        )?;
    }
    writer.flush()?;

    debug!(site = record.site, rows = rows.len(), "Appended metrics");

    Ok(())
}

type MetricsRows = Vec<IndexMap<String, String>>;

fn read_metrics(reader: impl std::io::Read) -> anyhow::Result<(Vec<String>, MetricsRows)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|record| {
            record.map(|record| {
                header
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_string))
                    .collect()
            })
        })
        .collect::<Result<MetricsRows, _>>()?;
    Ok((header, rows))
}
