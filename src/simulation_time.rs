use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, TimeZone};

pub const MINUTES_TO_INTERVAL_CENTRE: i64 = 30;

// Day-first layouts seen in weather exports, followed by ISO layouts. `%Y` also accepts a
// two-digit year, so the `%y` layout has to be tried first.
const TIMESTAMP_FORMATS: [&str; 10] = [
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Fixed UTC offset of a site that is `fuso` hours behind UTC.
pub fn site_offset(fuso: i32) -> Option<FixedOffset> {
    FixedOffset::west_opt(fuso * 3_600)
}

/// Parse a day-first local timestamp, reading it as wall-clock time at the given offset.
pub fn parse_local_timestamp(text: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    let naive = TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())?;
    offset.from_local_datetime(&naive).single()
}

/// Short zone name for a whole-hour offset, matching the `Etc/GMT` zone abbreviations
/// (`-03`, `+05`, `GMT`).
pub fn zone_abbreviation(offset: &FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "GMT".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let hours = seconds.abs() / 3_600;
    let minutes = (seconds.abs() % 3_600) / 60;
    if minutes == 0 {
        format!("{sign}{hours:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}")
    }
}

/// `YYYY-mm-dd HH:MM:SS ZZ` rendering used in result files.
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    format!(
        "{} {}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        zone_abbreviation(timestamp.offset())
    )
}

/// The hourly index of a simulation: interval-start stamps as read from the input, and the
/// interval centres (start + 30 min) at which the sun position is evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationTime {
    starts: Vec<DateTime<FixedOffset>>,
    centres: Vec<DateTime<FixedOffset>>,
}

impl SimulationTime {
    pub fn from_interval_starts(starts: Vec<DateTime<FixedOffset>>) -> Self {
        let centres = starts
            .iter()
            .map(|start| *start + Duration::minutes(MINUTES_TO_INTERVAL_CENTRE))
            .collect();
        Self { starts, centres }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn starts(&self) -> &[DateTime<FixedOffset>] {
        &self.starts
    }

    pub fn centres(&self) -> &[DateTime<FixedOffset>] {
        &self.centres
    }

    /// Day of year of each interval centre, in local time.
    pub fn days_of_year(&self) -> Vec<u32> {
        self.centres.iter().map(|centre| centre.ordinal()).collect()
    }

    /// Position of the first stamp that does not come strictly after its predecessor.
    pub fn first_out_of_order(&self) -> Option<usize> {
        self.starts
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
            .map(|i| i + 1)
    }
}
