use crate::simulation_time::SimulationTime;
use indexmap::IndexMap;

/// A column-wise simulation table: one shared hourly index and named `f64` columns in
/// insertion order. Each pipeline stage reads the columns it needs and appends its own.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesTable {
    time: SimulationTime,
    columns: IndexMap<String, Vec<f64>>,
}

impl TimeSeriesTable {
    pub fn new(time: SimulationTime) -> Self {
        Self {
            time,
            columns: Default::default(),
        }
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Add or replace a column. Panics in debug builds if the length differs from the index.
    pub fn insert(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len(), "column {name} has the wrong length");
        self.columns.insert(name.to_string(), values);
    }

    /// A column by name. The pipeline only reads columns written by earlier stages, so
    /// an absent column is reported as an error naming it.
    pub fn column(&self, name: &str) -> anyhow::Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow::anyhow!("column {name} is not present in the simulation table"))
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<f64>> {
        self.columns.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Apply `f` to each row of the named input columns and store the results as a new column.
    pub fn derive<const N: usize>(
        &mut self,
        name: &str,
        inputs: [&str; N],
        f: impl Fn([f64; N]) -> f64,
    ) -> anyhow::Result<()> {
        let values = {
            let sources = inputs
                .iter()
                .map(|input| self.column(input))
                .collect::<anyhow::Result<Vec<_>>>()?;
            (0..self.len())
                .map(|row| f(std::array::from_fn(|i| sources[i][row])))
                .collect()
        };
        self.insert(name, values);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::simulation_time::{parse_local_timestamp, site_offset};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rstest::*;

    /// An empty table of consecutive hours at UTC-3, starting at a day-first local stamp.
    pub(crate) fn hourly_table(first: &str, hours: usize) -> TimeSeriesTable {
        let start = parse_local_timestamp(first, site_offset(3).unwrap()).unwrap();
        let starts = (0..hours)
            .map(|hour| start + Duration::hours(hour as i64))
            .collect();
        TimeSeriesTable::new(SimulationTime::from_interval_starts(starts))
    }

    #[fixture]
    fn table() -> TimeSeriesTable {
        let offset = site_offset(3).unwrap();
        let starts = ["01/01/2021 10:00", "01/01/2021 11:00", "01/01/2021 12:00"]
            .iter()
            .map(|text| parse_local_timestamp(text, offset).unwrap())
            .collect();
        let mut table = TimeSeriesTable::new(SimulationTime::from_interval_starts(starts));
        table.insert("GlobHor", vec![400., 600., 800.]);
        table.insert("DiffHor", vec![100., 150., 300.]);
        table
    }

    #[rstest]
    fn test_derive_column(mut table: TimeSeriesTable) {
        table
            .derive("Direct", ["GlobHor", "DiffHor"], |[ghi, dhi]| ghi - dhi)
            .unwrap();
        assert_eq!(table.column("Direct").unwrap(), &[300., 450., 500.]);
    }

    #[rstest]
    fn test_column_order_is_insertion_order(mut table: TimeSeriesTable) {
        table.insert("A", vec![0.; 3]);
        table.remove("GlobHor");
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["DiffHor", "A"]);
    }

    #[rstest]
    fn test_missing_column_is_an_error(table: TimeSeriesTable) {
        assert!(table.column("EArray").is_err());
        assert_eq!(table.get("EArray"), None);
    }
}
