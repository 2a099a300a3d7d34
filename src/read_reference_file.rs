use crate::errors::CverError;
use crate::parameter_files::outline::decode_text;
use crate::simulation_time::{parse_local_timestamp, SimulationTime};
use crate::time_series::TimeSeriesTable;
use chrono::FixedOffset;
use csv::ReaderBuilder as CsvReaderBuilder;
use std::path::Path;
use tracing::debug;

/// Lines of free-form project description before the column header of an hourly export.
const PREAMBLE_LINES: usize = 10;
const COLUMN_DATE: &str = "date";

/// Read a reference simulation's hourly export (`;`-delimited, ISO-8859-1).
///
/// After the preamble come a header line and a units line; every column but `date` is read as
/// a number, with blank or unreadable cells kept as NaN so they drop out of the comparison.
pub fn reference_file_to_table(path: &Path, offset: FixedOffset) -> Result<TimeSeriesTable, CverError> {
    let malformed = |reason: String| CverError::MalformedTimeSeries {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|e| malformed(e.to_string()))?;
    let text = decode_text(&bytes)
        .ok_or_else(|| malformed("content is neither valid UTF-8 nor ISO-8859-1 text".into()))?;
    reference_text_to_table(&text, offset).map_err(malformed)
}

pub fn reference_text_to_table(text: &str, offset: FixedOffset) -> Result<TimeSeriesTable, String> {
    let body = text
        .lines()
        .skip(PREAMBLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    let mut reader = CsvReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    let date_index = headers
        .iter()
        .position(|header| header == COLUMN_DATE)
        .ok_or_else(|| format!("column '{COLUMN_DATE}' is missing"))?;

    let mut starts = vec![];
    let mut columns: Vec<Vec<f64>> = vec![vec![]; headers.len()];

    // the first record holds units
    for (i, result) in reader.records().enumerate().skip(1) {
        let line = PREAMBLE_LINES + i + 2;
        let record = result.map_err(|e| e.to_string())?;
        let date_text = record.get(date_index).unwrap_or_default();
        if date_text.is_empty() {
            continue;
        }
        starts.push(
            parse_local_timestamp(date_text, offset)
                .ok_or_else(|| format!("line {line}: unreadable date '{date_text}'"))?,
        );
        for (index, column) in columns.iter_mut().enumerate() {
            column.push(
                record
                    .get(index)
                    .and_then(|cell| cell.parse::<f64>().ok())
                    .unwrap_or(f64::NAN),
            );
        }
    }

    debug!(rows = starts.len(), columns = headers.len(), "Read reference series");

    let mut table = TimeSeriesTable::new(SimulationTime::from_interval_starts(starts));
    for (index, (header, column)) in headers.iter().zip(columns).enumerate() {
        if index != date_index && !header.is_empty() {
            table.insert(header, column);
        }
    }
    Ok(table)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::simulation_time::site_offset;
    use pretty_assertions::assert_eq;
    use rstest::*;

    pub(crate) fn reference_text(rows: &[(&str, f64, f64, f64)]) -> String {
        let mut text = String::new();
        text.push_str("PVSYST V7.2.8;;;\n");
        text.push_str(";Libraries;Tracker;\n");
        for i in 0..7 {
            text.push_str(&format!("Preamble line {i};;;\n"));
        }
        text.push_str("\n");
        text.push_str("date;GlobEff;AzSol;E_Grid\n");
        text.push_str(";W/m²;°;W\n");
        for (date, glob_eff, az_sol, e_grid) in rows {
            text.push_str(&format!("{date};{glob_eff};{az_sol};{e_grid}\n"));
        }
        text
    }

    #[rstest]
    fn test_reference_text_to_table() {
        let text = reference_text(&[
            ("01/01/21 11:00", 780., -95., 1_500_000.),
            ("01/01/21 12:00", 850., 0., 1_600_000.),
        ]);
        let table = reference_text_to_table(&text, site_offset(3).unwrap()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("AzSol").unwrap(), &[-95., 0.]);
        assert_eq!(
            table.time().centres()[0].to_rfc3339(),
            "2021-01-01T11:30:00-03:00"
        );
        assert!(!table.contains("date"));
    }

    #[rstest]
    fn test_unreadable_cells_become_nan() {
        let text = reference_text(&[("01/01/21 11:00", 780., 10., 0.)]).replace(";0\n", ";\n");
        let table = reference_text_to_table(&text, site_offset(3).unwrap()).unwrap();
        assert!(table.column("E_Grid").unwrap()[0].is_nan());
    }

    #[rstest]
    fn test_latin1_units_line_is_decoded() {
        let text = reference_text(&[("01/01/21 11:00", 780., 10., 5.)]);
        let latin1: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
        let decoded = decode_text(&latin1).unwrap();
        assert_eq!(decoded, text);
    }
}
