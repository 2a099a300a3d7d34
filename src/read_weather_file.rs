use crate::core::columns::{DIFF_HOR, GLOB_HOR, T_AMB, WIND_VEL};
use crate::errors::CverError;
use crate::simulation_time::{parse_local_timestamp, SimulationTime};
use crate::time_series::TimeSeriesTable;
use chrono::FixedOffset;
use csv::ReaderBuilder as CsvReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const COLUMN_TIME: &str = "time";
const COLUMN_GHI: &str = "GHI"; // global horizontal irradiance in W/m2
const COLUMN_DIF: &str = "DIF"; // diffuse horizontal irradiance in W/m2
const COLUMN_TEMP: &str = "TEMP"; // ambient air temperature in degC
const COLUMN_WS: &str = "WS"; // wind speed in m/s

/// Hourly weather observations for one site, indexed at interval centres.
///
/// The columns are stored under the simulation's names: GlobHor, DiffHor, T_Amb, WindVel.
pub fn weather_file_to_table(path: &Path, offset: FixedOffset) -> Result<TimeSeriesTable, CverError> {
    let file = std::fs::File::open(path).map_err(|e| CverError::MalformedTimeSeries {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    weather_data_to_table(file, offset).map_err(|reason| CverError::MalformedTimeSeries {
        path: path.to_path_buf(),
        reason,
    })
}

pub fn weather_data_to_table(file: impl Read, offset: FixedOffset) -> Result<TimeSeriesTable, String> {
    let mut reader = CsvReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| format!("column '{name}' is missing"))
    };
    let time_index = position(COLUMN_TIME)?;
    let value_indices = [
        position(COLUMN_GHI)?,
        position(COLUMN_DIF)?,
        position(COLUMN_TEMP)?,
        position(COLUMN_WS)?,
    ];

    let mut starts = vec![];
    let mut values: [Vec<f64>; 4] = Default::default();

    for (i, result) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = result.map_err(|e| e.to_string())?;
        let time_text = record.get(time_index).unwrap_or_default();
        starts.push(
            parse_local_timestamp(time_text, offset)
                .ok_or_else(|| format!("line {line}: unreadable timestamp '{time_text}'"))?,
        );
        for (column, &index) in value_indices.iter().enumerate() {
            let text = record.get(index).unwrap_or_default();
            values[column].push(
                text.parse::<f64>()
                    .map_err(|_| format!("line {line}: '{text}' is not a number"))?,
            );
        }
    }

    let time = SimulationTime::from_interval_starts(starts);
    if let Some(row) = time.first_out_of_order() {
        return Err(format!(
            "timestamp {} does not come after the one before it",
            time.starts()[row]
        ));
    }

    debug!(rows = time.len(), "Read weather series");

    let [ghi, dif, temp, ws] = values;
    let mut table = TimeSeriesTable::new(time);
    table.insert(GLOB_HOR, ghi);
    table.insert(DIFF_HOR, dif);
    table.insert(T_AMB, temp);
    table.insert(WIND_VEL, ws);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_time::site_offset;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn weather_csv() -> &'static str {
        "time,GHI,DIF,TEMP,WS
01/01/2021 11:00,812.5,120.0,29.1,3.2
01/01/2021 12:00,905.0,110.5,30.4,3.8
"
    }

    #[rstest]
    fn test_weather_data_to_table(weather_csv: &str) {
        let table = weather_data_to_table(weather_csv.as_bytes(), site_offset(3).unwrap()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column(GLOB_HOR).unwrap(), &[812.5, 905.]);
        assert_eq!(table.column(WIND_VEL).unwrap(), &[3.2, 3.8]);
        assert_eq!(
            table.time().centres()[1].to_rfc3339(),
            "2021-01-01T12:30:00-03:00"
        );
    }

    #[rstest]
    fn test_missing_column_is_reported() {
        let result = weather_data_to_table(
            "time,GHI,DIF,TEMP\n01/01/2021 11:00,1,1,1\n".as_bytes(),
            site_offset(3).unwrap(),
        );
        assert_eq!(result.unwrap_err(), "column 'WS' is missing");
    }

    #[rstest]
    fn test_non_numeric_value_is_reported() {
        let result = weather_data_to_table(
            "time,GHI,DIF,TEMP,WS\n01/01/2021 11:00,n/a,1,1,1\n".as_bytes(),
            site_offset(3).unwrap(),
        );
        assert!(result.unwrap_err().contains("'n/a' is not a number"));
    }

    #[rstest]
    fn test_out_of_order_timestamps_are_rejected() {
        let result = weather_data_to_table(
            "time,GHI,DIF,TEMP,WS\n01/01/2021 12:00,1,1,1,1\n01/01/2021 11:00,1,1,1,1\n".as_bytes(),
            site_offset(3).unwrap(),
        );
        assert!(result.is_err());
    }
}
